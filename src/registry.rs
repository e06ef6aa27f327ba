use std::collections::{HashMap, VecDeque};
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::source::{DiscoveredPair, TokenProfile};
use crate::types::PairReading;

/// Thresholds below which a tracked pair is considered dead.
#[derive(Debug, Clone)]
pub struct DeathRules {
    pub liquidity_floor: Decimal,
    pub volume_floor: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathReason {
    LiquidityCollapse,
    LowVolume,
}

impl fmt::Display for DeathReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LiquidityCollapse => write!(f, "liquidity_collapse"),
            Self::LowVolume => write!(f, "low_volume"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackedPair {
    pub pair_address: String,
    pub token_address: String,
    pub symbol: String,
    pub discovered_at: DateTime<Utc>,
    pub profile: Option<TokenProfile>,
}

/// In-memory watchlist of pairs under monitoring. Owned exclusively by the
/// collector loop; short-lived pairs leave it when the death rules fire.
pub struct Watchlist {
    rules: DeathRules,
    capacity: usize,
    order: VecDeque<String>,
    pairs: HashMap<String, TrackedPair>,
}

impl Watchlist {
    pub fn new(rules: DeathRules, capacity: usize) -> Self {
        Self {
            rules,
            capacity: capacity.max(1),
            order: VecDeque::new(),
            pairs: HashMap::new(),
        }
    }

    pub fn contains(&self, pair_address: &str) -> bool {
        self.pairs.contains_key(pair_address)
    }

    /// Start monitoring a discovered pair with the profile collected for its
    /// token. Returns false when it is already tracked. At capacity the
    /// oldest pair is retired first.
    pub fn track(&mut self, pair: DiscoveredPair, profile: Option<TokenProfile>) -> bool {
        if self.pairs.contains_key(&pair.pair_address) {
            return false;
        }
        while self.pairs.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.pairs.remove(&oldest);
                tracing::debug!(pair = %oldest, "watchlist full, retiring oldest pair");
            } else {
                break;
            }
        }
        self.order.push_back(pair.pair_address.clone());
        self.pairs.insert(
            pair.pair_address.clone(),
            TrackedPair {
                pair_address: pair.pair_address,
                token_address: pair.token_address,
                symbol: pair.symbol,
                discovered_at: pair.created_at,
                profile,
            },
        );
        true
    }

    /// Currently monitored pairs, oldest first.
    pub fn monitored(&self) -> Vec<TrackedPair> {
        self.order
            .iter()
            .filter_map(|addr| self.pairs.get(addr).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Apply the death rules to a fresh reading. A dead pair is removed from
    /// monitoring and the reason returned. Liquidity at or below 1 USD is
    /// treated as placeholder data from the feed, not a collapse.
    pub fn apply_reading(&mut self, reading: &PairReading) -> Option<DeathReason> {
        if !self.pairs.contains_key(&reading.pair_address) {
            return None;
        }
        let live_liquidity = reading.liquidity_usd > Decimal::ONE;
        let reason = if live_liquidity && reading.liquidity_usd < self.rules.liquidity_floor {
            Some(DeathReason::LiquidityCollapse)
        } else if live_liquidity && reading.volume_h1 < self.rules.volume_floor {
            Some(DeathReason::LowVolume)
        } else {
            None
        };
        if reason.is_some() {
            self.pairs.remove(&reading.pair_address);
            self.order.retain(|a| a != &reading.pair_address);
        }
        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rules() -> DeathRules {
        DeathRules {
            liquidity_floor: dec!(2000),
            volume_floor: dec!(1000),
        }
    }

    fn discovered(addr: &str) -> DiscoveredPair {
        DiscoveredPair {
            pair_address: addr.to_string(),
            token_address: format!("tok-{addr}"),
            chain: "solana".to_string(),
            symbol: "MEME".to_string(),
            created_at: Utc::now(),
        }
    }

    fn reading(addr: &str, liquidity: Decimal, volume: Decimal) -> PairReading {
        PairReading {
            pair_address: addr.to_string(),
            symbol: "MEME".to_string(),
            price_usd: dec!(0.001),
            liquidity_usd: liquidity,
            volume_h1: volume,
            buys_h1: 5,
            sells_h1: 5,
        }
    }

    #[test]
    fn tracking_dedups_by_pair_address() {
        let mut wl = Watchlist::new(rules(), 10);
        assert!(wl.track(discovered("A"), None));
        assert!(!wl.track(discovered("A"), None));
        assert_eq!(wl.len(), 1);
    }

    #[test]
    fn tracked_pair_keeps_its_profile() {
        let mut wl = Watchlist::new(rules(), 10);
        let profile = TokenProfile {
            is_honeypot: Some(true),
            buy_tax: Some(dec!(0.02)),
            sell_tax: Some(dec!(0.35)),
        };
        assert!(!wl.contains("A"));
        wl.track(discovered("A"), Some(profile));
        assert!(wl.contains("A"));
        let tracked = &wl.monitored()[0];
        let stored = tracked.profile.as_ref().unwrap();
        assert_eq!(stored.is_honeypot, Some(true));
        assert_eq!(stored.sell_tax, Some(dec!(0.35)));
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let mut wl = Watchlist::new(rules(), 2);
        wl.track(discovered("A"), None);
        wl.track(discovered("B"), None);
        wl.track(discovered("C"), None);
        let addrs: Vec<String> = wl.monitored().into_iter().map(|p| p.pair_address).collect();
        assert_eq!(addrs, vec!["B", "C"]);
    }

    #[test]
    fn liquidity_collapse_retires_the_pair() {
        let mut wl = Watchlist::new(rules(), 10);
        wl.track(discovered("A"), None);
        let reason = wl.apply_reading(&reading("A", dec!(500), dec!(5000)));
        assert_eq!(reason, Some(DeathReason::LiquidityCollapse));
        assert!(wl.is_empty());
    }

    #[test]
    fn low_volume_retires_the_pair() {
        let mut wl = Watchlist::new(rules(), 10);
        wl.track(discovered("A"), None);
        let reason = wl.apply_reading(&reading("A", dec!(9000), dec!(200)));
        assert_eq!(reason, Some(DeathReason::LowVolume));
        assert!(wl.is_empty());
    }

    #[test]
    fn healthy_pair_stays_monitored() {
        let mut wl = Watchlist::new(rules(), 10);
        wl.track(discovered("A"), None);
        assert_eq!(wl.apply_reading(&reading("A", dec!(9000), dec!(5000))), None);
        assert_eq!(wl.len(), 1);
    }

    #[test]
    fn placeholder_liquidity_is_not_a_collapse() {
        let mut wl = Watchlist::new(rules(), 10);
        wl.track(discovered("A"), None);
        // Feed reports ~0 liquidity while the pool is still indexing.
        assert_eq!(wl.apply_reading(&reading("A", dec!(0), dec!(0))), None);
        assert_eq!(wl.len(), 1);
    }
}
