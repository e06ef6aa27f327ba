use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CollectorError, Result};

/// One asset reading inside a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairReading {
    pub pair_address: String,
    pub symbol: String,
    pub price_usd: Decimal,
    pub liquidity_usd: Decimal,
    pub volume_h1: Decimal,
    pub buys_h1: u32,
    pub sells_h1: u32,
}

/// A timestamped set of asset readings produced by one collection cycle.
/// All readings share the capture timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub captured_at: DateTime<Utc>,
    pub ts_ms: i64,
    pub source: String,
    pub readings: Vec<PairReading>,
}

impl MarketSnapshot {
    /// A snapshot must carry at least one reading; an empty cycle is
    /// represented by `CycleOutcome::Empty`, never by an empty snapshot.
    pub fn new(
        captured_at: DateTime<Utc>,
        source: impl Into<String>,
        readings: Vec<PairReading>,
    ) -> Result<Self> {
        if readings.is_empty() {
            return Err(CollectorError::DataShape(
                "snapshot must carry at least one asset reading".to_string(),
            ));
        }
        Ok(Self {
            ts_ms: captured_at.timestamp_millis(),
            captured_at,
            source: source.into(),
            readings,
        })
    }
}

/// Terminal outcome of one collection cycle, logged once per tick.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A snapshot was appended to the sink.
    Persisted { records: usize },
    /// Nothing to report this tick.
    Empty,
    /// The response could not be mapped to the expected schema.
    Skipped { reason: String },
    /// Fetch retries exhausted; the cycle was abandoned.
    FetchFailed { reason: String },
    /// Sink retries exhausted; the cycle's records were dropped.
    SinkFailed { records: usize, reason: String },
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    pub(crate) fn reading(addr: &str, symbol: &str) -> PairReading {
        PairReading {
            pair_address: addr.to_string(),
            symbol: symbol.to_string(),
            price_usd: dec!(0.00001234),
            liquidity_usd: dec!(15000),
            volume_h1: dec!(4200),
            buys_h1: 12,
            sells_h1: 7,
        }
    }

    #[test]
    fn empty_snapshot_is_rejected() {
        let err = MarketSnapshot::new(Utc::now(), "dexscreener", vec![]).unwrap_err();
        assert!(matches!(err, CollectorError::DataShape(_)));
    }

    #[test]
    fn snapshot_carries_wall_clock_and_millis() {
        let at = Utc::now();
        let snap =
            MarketSnapshot::new(at, "dexscreener", vec![reading("Pair1", "WIF")]).unwrap();
        assert_eq!(snap.ts_ms, at.timestamp_millis());
        assert_eq!(snap.readings.len(), 1);
    }

    #[test]
    fn snapshot_round_trips_as_json() {
        let snap = MarketSnapshot::new(
            Utc::now(),
            "dexscreener",
            vec![reading("Pair1", "WIF"), reading("Pair2", "BONK")],
        )
        .unwrap();
        let line = serde_json::to_string(&snap).unwrap();
        let back: MarketSnapshot = serde_json::from_str(&line).unwrap();
        assert_eq!(back.readings.len(), 2);
        assert_eq!(back.ts_ms, snap.ts_ms);
        assert_eq!(back.readings[1].symbol, "BONK");
    }
}
