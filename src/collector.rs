use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::backoff;
use crate::error::{CollectorError, Result};
use crate::registry::Watchlist;
use crate::sink::SnapshotSink;
use crate::source::MarketDataSource;
use crate::stats::{now_ms, Stats};
use crate::types::{CycleOutcome, MarketSnapshot};

/// Loop parameters derived from `Settings` at startup.
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    pub poll_interval: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_cap: Duration,
    pub target_chain: String,
    pub max_pair_age: chrono::Duration,
    pub pair_fetch_delay: Duration,
    pub stats_log_sec: u64,
}

/// The collection loop. Generic over source and sink so tests can drive it
/// with deterministic fakes; one cycle runs to completion (including its
/// retries) before the next tick.
pub struct Collector<S, K> {
    source: S,
    sink: K,
    watchlist: Watchlist,
    stats: Arc<Stats>,
    opts: CollectorOptions,
}

impl<S: MarketDataSource, K: SnapshotSink> Collector<S, K> {
    pub fn new(
        source: S,
        sink: K,
        watchlist: Watchlist,
        stats: Arc<Stats>,
        opts: CollectorOptions,
    ) -> Self {
        Self {
            source,
            sink,
            watchlist,
            stats,
            opts,
        }
    }

    /// Run cycles until `shutdown` resolves or a fatal error surfaces.
    /// Ticks are measured from the start of the previous cycle; an
    /// overrunning cycle makes the next one start immediately.
    pub async fn run(mut self, shutdown: impl Future<Output = ()> + Send) -> Result<()> {
        let mut shutdown = pin!(shutdown);
        let mut ticker = tokio::time::interval(self.opts.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown signal received, stopping collector");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            let cycle_id = Uuid::new_v4();
            let started = tokio::time::Instant::now();

            let outcome = tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(cycle_id = %cycle_id, "shutdown signal received mid-cycle, stopping collector");
                    return Ok(());
                }
                res = self.run_cycle() => match res {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        tracing::error!(cycle_id = %cycle_id, error = %err, "fatal error, stopping collector");
                        return Err(err);
                    }
                },
            };

            self.stats.inc_cycles();
            self.stats.set_pairs_tracked(self.watchlist.len() as u64);
            let duration_ms = started.elapsed().as_millis() as u64;

            match &outcome {
                CycleOutcome::Persisted { records } => {
                    tracing::info!(cycle_id = %cycle_id, records, duration_ms, "cycle complete: snapshot persisted");
                }
                CycleOutcome::Empty => {
                    tracing::info!(cycle_id = %cycle_id, duration_ms, "cycle complete: no new data");
                }
                CycleOutcome::Skipped { reason } => {
                    tracing::warn!(cycle_id = %cycle_id, duration_ms, reason = %reason, "cycle yielded no records: response shape rejected");
                }
                CycleOutcome::FetchFailed { reason } => {
                    tracing::warn!(cycle_id = %cycle_id, duration_ms, reason = %reason, "cycle abandoned: fetch retries exhausted");
                }
                CycleOutcome::SinkFailed { records, reason } => {
                    tracing::warn!(cycle_id = %cycle_id, records, duration_ms, reason = %reason, "records dropped: sink retries exhausted");
                }
            }

            let t = now_ms();
            if self.stats.should_log(t, self.opts.stats_log_sec) {
                let ss = self.stats.snapshot(t);
                self.stats.mark_logged(t);
                tracing::info!(
                    up_sec = ss.up_sec,
                    cycles = ss.cycles,
                    snapshots_persisted = ss.snapshots_persisted,
                    records_written = ss.records_written,
                    pairs_tracked = ss.pairs_tracked,
                    pairs_discovered = ss.pairs_discovered,
                    pairs_dead = ss.pairs_dead,
                    retries = ss.retries,
                    shape_errors = ss.shape_errors,
                    fetch_failures = ss.fetch_failures,
                    sink_failures = ss.sink_failures,
                    "stats"
                );
            }
        }
    }

    /// One collection cycle: discover new pairs, fetch readings for the
    /// watchlist, apply death rules, persist. Only `Config` errors escape;
    /// everything else degrades to a `CycleOutcome`.
    async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let opts = &self.opts;
        let stats = &self.stats;
        let source = &self.source;
        let chain = opts.target_chain.as_str();

        let discovered = match with_retries("discover", opts, stats, || {
            source.discover_pairs(chain, opts.max_pair_age)
        })
        .await
        {
            Ok(pairs) => pairs,
            Err(CollectorError::DataShape(reason)) => {
                stats.inc_shape_errors();
                return Ok(CycleOutcome::Skipped { reason });
            }
            Err(err @ CollectorError::Config(_)) => return Err(err),
            Err(err) => {
                stats.inc_fetch_failures();
                return Ok(CycleOutcome::FetchFailed {
                    reason: err.to_string(),
                });
            }
        };

        for pair in discovered {
            if self.watchlist.contains(&pair.pair_address) {
                continue;
            }
            // Profiled once at discovery; a profiling failure never blocks
            // tracking.
            let profile = match source.profile_token(&pair.token_address).await {
                Ok(profile) => profile,
                Err(err) => {
                    tracing::warn!(token = %pair.token_address, error = %err, "token profiling failed, tracking unprofiled");
                    None
                }
            };
            let addr = pair.pair_address.clone();
            let symbol = pair.symbol.clone();
            let is_honeypot = profile.as_ref().and_then(|p| p.is_honeypot);
            if self.watchlist.track(pair, profile) {
                stats.inc_pairs_discovered();
                tracing::info!(pair = %addr, symbol = %symbol, is_honeypot = ?is_honeypot, "discovered new pair");
            }
        }

        let captured_at = Utc::now();
        let monitored = self.watchlist.monitored();
        let mut readings = Vec::with_capacity(monitored.len());
        let mut shape_skip: Option<String> = None;

        for (i, tracked) in monitored.iter().enumerate() {
            // Source rate limit: pace the per-pair calls.
            if i > 0 && !opts.pair_fetch_delay.is_zero() {
                tokio::time::sleep(opts.pair_fetch_delay).await;
            }
            let addr = tracked.pair_address.as_str();
            match with_retries("fetch_pair", opts, stats, || source.fetch_pair(chain, addr))
                .await
            {
                Ok(Some(reading)) => readings.push(reading),
                Ok(None) => {
                    tracing::debug!(pair = %addr, "no data for pair this tick");
                }
                Err(CollectorError::DataShape(reason)) => {
                    stats.inc_shape_errors();
                    tracing::warn!(pair = %addr, reason = %reason, "malformed pair payload, no reading this tick");
                    shape_skip = Some(reason);
                }
                Err(err @ CollectorError::Config(_)) => return Err(err),
                Err(err) => {
                    stats.inc_fetch_failures();
                    return Ok(CycleOutcome::FetchFailed {
                        reason: err.to_string(),
                    });
                }
            }
        }

        for reading in &readings {
            if let Some(reason) = self.watchlist.apply_reading(reading) {
                stats.inc_pairs_dead();
                tracing::info!(pair = %reading.pair_address, symbol = %reading.symbol, reason = %reason, "pair retired from watchlist");
            }
        }

        if readings.is_empty() {
            if let Some(reason) = shape_skip {
                return Ok(CycleOutcome::Skipped { reason });
            }
            return Ok(CycleOutcome::Empty);
        }

        let snapshot = MarketSnapshot::new(captured_at, source.source_id(), readings)?;
        let records = snapshot.readings.len();
        let sink = &self.sink;
        match with_retries("persist", opts, stats, || sink.append(&snapshot)).await {
            Ok(()) => {
                stats.inc_snapshots_persisted();
                stats.add_records_written(records as u64);
                Ok(CycleOutcome::Persisted { records })
            }
            Err(err @ CollectorError::Config(_)) => Err(err),
            Err(err) => {
                stats.inc_sink_failures();
                Ok(CycleOutcome::SinkFailed {
                    records,
                    reason: err.to_string(),
                })
            }
        }
    }
}

/// Retry transient failures with bounded exponential backoff. Non-transient
/// errors and an exhausted budget surface to the caller unchanged.
async fn with_retries<T, F, Fut>(
    op: &str,
    opts: &CollectorOptions,
    stats: &Stats,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match call().await {
            Ok(v) => return Ok(v),
            Err(err) if err.is_transient() && attempt < opts.max_retries => {
                let wait = backoff::delay(attempt, opts.backoff_base, opts.backoff_cap);
                stats.inc_retries();
                attempt += 1;
                tracing::warn!(
                    op,
                    attempt,
                    max_retries = opts.max_retries,
                    wait_ms = wait.as_millis() as u64,
                    error = %err,
                    "transient failure, backing off"
                );
                tokio::time::sleep(wait).await;
            }
            Err(err) => return Err(err),
        }
    }
}
