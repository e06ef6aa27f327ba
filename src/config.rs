use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{CollectorError, Result};
use crate::registry::DeathRules;

/// Process-wide settings, read once at startup and immutable afterwards.
/// Field names map 1:1 to environment variables (e.g. `POLL_INTERVAL_SECONDS`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub source_api_url: String,
    pub poll_interval_seconds: u64,
    pub output_sink: String,

    pub target_chain: String,
    pub max_retries: u32,

    // Token profiling (optional, off without a key)
    pub goplus_api_url: String,
    pub goplus_chain_id: String,
    pub goplus_api_key: Option<String>,

    pub request_timeout_seconds: u64,
    pub backoff_base_ms: u64,
    pub backoff_cap_ms: u64,
    pub pair_fetch_delay_ms: u64,

    // Watchlist rules
    pub max_pair_age_hours: i64,
    pub max_tracked_pairs: usize,
    pub death_liquidity_threshold_usd: String,
    pub death_volume_threshold_usd: String,

    // Stats
    pub stats_log_sec: u64,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let c = config::Config::builder()
            .set_default("source_api_url", "https://api.dexscreener.com")?
            .set_default("target_chain", "solana")?
            .set_default("max_retries", 3)?
            .set_default("goplus_api_url", "https://api.gopluslabs.io")?
            .set_default("goplus_chain_id", "solana_mainnet")?
            .set_default("request_timeout_seconds", 10)?
            .set_default("backoff_base_ms", 500)?
            .set_default("backoff_cap_ms", 8000)?
            .set_default("pair_fetch_delay_ms", 1000)?
            .set_default("max_pair_age_hours", 4)?
            .set_default("max_tracked_pairs", 200)?
            .set_default("death_liquidity_threshold_usd", "2000")?
            .set_default("death_volume_threshold_usd", "1000")?
            .set_default("stats_log_sec", 60)?
            .add_source(config::Environment::default())
            .build()?;
        let s: Settings = c.try_deserialize()?;
        s.validate()?;
        Ok(s)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_seconds == 0 {
            return Err(CollectorError::Config(
                "POLL_INTERVAL_SECONDS must be greater than zero".to_string(),
            ));
        }
        if self.output_sink.trim().is_empty() {
            return Err(CollectorError::Config(
                "OUTPUT_SINK must not be empty".to_string(),
            ));
        }
        if self.request_timeout_seconds == 0 {
            return Err(CollectorError::Config(
                "REQUEST_TIMEOUT_SECONDS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_cap(&self) -> Duration {
        Duration::from_millis(self.backoff_cap_ms)
    }

    pub fn pair_fetch_delay(&self) -> Duration {
        Duration::from_millis(self.pair_fetch_delay_ms)
    }

    pub fn max_pair_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.max_pair_age_hours)
    }

    /// Profiling key, if one is configured and non-blank.
    pub fn goplus_key(&self) -> Option<&str> {
        self.goplus_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    pub fn death_rules(&self) -> Result<DeathRules> {
        Ok(DeathRules {
            liquidity_floor: parse_usd(&self.death_liquidity_threshold_usd)?,
            volume_floor: parse_usd(&self.death_volume_threshold_usd)?,
        })
    }
}

fn parse_usd(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .map_err(|e| CollectorError::Config(format!("invalid USD threshold {s:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            source_api_url: "https://api.dexscreener.com".to_string(),
            poll_interval_seconds: 900,
            output_sink: "snapshots.jsonl".to_string(),
            target_chain: "solana".to_string(),
            max_retries: 3,
            goplus_api_url: "https://api.gopluslabs.io".to_string(),
            goplus_chain_id: "solana_mainnet".to_string(),
            goplus_api_key: None,
            request_timeout_seconds: 10,
            backoff_base_ms: 500,
            backoff_cap_ms: 8000,
            pair_fetch_delay_ms: 1000,
            max_pair_age_hours: 4,
            max_tracked_pairs: 200,
            death_liquidity_threshold_usd: "2000".to_string(),
            death_volume_threshold_usd: "1000".to_string(),
            stats_log_sec: 60,
        }
    }

    #[test]
    fn valid_settings_pass() {
        assert!(settings().validate().is_ok());
        assert!(settings().death_rules().is_ok());
    }

    #[test]
    fn zero_interval_is_fatal() {
        let mut s = settings();
        s.poll_interval_seconds = 0;
        assert!(matches!(s.validate(), Err(CollectorError::Config(_))));
    }

    #[test]
    fn blank_sink_is_fatal() {
        let mut s = settings();
        s.output_sink = "  ".to_string();
        assert!(matches!(s.validate(), Err(CollectorError::Config(_))));
    }

    #[test]
    fn blank_profiling_key_counts_as_absent() {
        let mut s = settings();
        assert_eq!(s.goplus_key(), None);
        s.goplus_api_key = Some("   ".to_string());
        assert_eq!(s.goplus_key(), None);
        s.goplus_api_key = Some(" key-1 ".to_string());
        assert_eq!(s.goplus_key(), Some("key-1"));
    }

    #[test]
    fn malformed_threshold_is_fatal() {
        let mut s = settings();
        s.death_liquidity_threshold_usd = "two thousand".to_string();
        assert!(matches!(s.death_rules(), Err(CollectorError::Config(_))));
    }
}
