mod backoff;
mod collector;
mod config;
mod error;
mod registry;
mod sink;
mod source;
mod stats;
mod types;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::collector::{Collector, CollectorOptions};
use crate::config::Settings;
use crate::registry::Watchlist;
use crate::sink::SinkSpec;
use crate::source::{DexScreenerSource, GoPlusClient};
use crate::stats::{now_ms, Stats};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let s = Settings::from_env()?;

    let goplus = match s.goplus_key() {
        Some(key) => Some(GoPlusClient::new(
            s.goplus_api_url.clone(),
            s.goplus_chain_id.clone(),
            key.to_string(),
            s.request_timeout(),
        )?),
        None => None,
    };
    let profiling = goplus.is_some();
    let source = DexScreenerSource::new(s.source_api_url.clone(), goplus, s.request_timeout())?;
    let sink_spec = SinkSpec::parse(&s.output_sink)?;
    let sink = sink::build(&sink_spec, s.request_timeout())?;
    let watchlist = Watchlist::new(s.death_rules()?, s.max_tracked_pairs);
    let stats = Stats::new(now_ms());

    tracing::info!(
        source = %s.source_api_url,
        sink = %sink_spec,
        chain = %s.target_chain,
        interval_sec = s.poll_interval_seconds,
        max_retries = s.max_retries,
        profiling,
        "collector starting"
    );

    let opts = CollectorOptions {
        poll_interval: s.poll_interval(),
        max_retries: s.max_retries,
        backoff_base: s.backoff_base(),
        backoff_cap: s.backoff_cap(),
        target_chain: s.target_chain.clone(),
        max_pair_age: s.max_pair_age(),
        pair_fetch_delay: s.pair_fetch_delay(),
        stats_log_sec: s.stats_log_sec,
    };

    let collector = Collector::new(source, sink, watchlist, stats, opts);
    collector
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("collector stopped");
    Ok(())
}
