pub mod dexscreener;
pub mod goplus;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::types::PairReading;

/// A freshly listed pair found by discovery, before any readings exist.
#[derive(Debug, Clone)]
pub struct DiscoveredPair {
    pub pair_address: String,
    pub token_address: String,
    pub chain: String,
    pub symbol: String,
    pub created_at: DateTime<Utc>,
}

/// Security profile collected once per token at discovery time.
#[derive(Debug, Clone, Default)]
pub struct TokenProfile {
    pub is_honeypot: Option<bool>,
    pub buy_tax: Option<Decimal>,
    pub sell_tax: Option<Decimal>,
}

/// Abstraction for market data sources so the loop can run against
/// deterministic fakes in tests.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Short identifier stamped into every snapshot this source produces.
    fn source_id(&self) -> &str;

    /// Find pairs on `chain` created within the last `max_age`.
    async fn discover_pairs(
        &self,
        chain: &str,
        max_age: chrono::Duration,
    ) -> Result<Vec<DiscoveredPair>>;

    /// Fetch the current reading for one pair. `None` means the source has
    /// no data for the pair this tick.
    async fn fetch_pair(&self, chain: &str, pair_address: &str) -> Result<Option<PairReading>>;

    /// Security profile for a newly discovered token. `None` when the
    /// source has no profiling credentials configured or no data for the
    /// token.
    async fn profile_token(&self, token_address: &str) -> Result<Option<TokenProfile>>;
}

pub use dexscreener::DexScreenerSource;
pub use goplus::GoPlusClient;
