use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{CollectorError, Result};
use crate::source::{DiscoveredPair, GoPlusClient, MarketDataSource, TokenProfile};
use crate::types::PairReading;

/// DexScreener public API source. Discovery walks the `new` search feed;
/// readings come from the per-pair endpoint. Token profiling goes through
/// an optional GoPlus client, absent when no key is configured.
pub struct DexScreenerSource {
    base_url: String,
    http: reqwest::Client,
    goplus: Option<GoPlusClient>,
}

impl DexScreenerSource {
    pub fn new(
        base_url: String,
        goplus: Option<GoPlusClient>,
        timeout: std::time::Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollectorError::Config(format!("build http client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            goplus,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(CollectorError::from_request)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CollectorError::from_status(status, url));
        }

        let body = resp.text().await.map_err(CollectorError::from_request)?;
        serde_json::from_str(&body).map_err(|e| {
            let snippet: String = body.chars().take(256).collect();
            CollectorError::DataShape(format!("decode {url}: {e} body_snippet={snippet}"))
        })
    }
}

#[async_trait]
impl MarketDataSource for DexScreenerSource {
    fn source_id(&self) -> &str {
        "dexscreener"
    }

    async fn discover_pairs(
        &self,
        chain: &str,
        max_age: chrono::Duration,
    ) -> Result<Vec<DiscoveredPair>> {
        let url = format!("{}/latest/dex/search?q=new", self.base_url);
        let resp: SearchResponse = self.get_json(&url).await?;
        Ok(filter_new_pairs(
            resp.pairs.unwrap_or_default(),
            chain,
            max_age,
            Utc::now(),
        ))
    }

    async fn fetch_pair(&self, chain: &str, pair_address: &str) -> Result<Option<PairReading>> {
        let url = format!("{}/latest/dex/pairs/{}/{}", self.base_url, chain, pair_address);
        let resp: PairResponse = self.get_json(&url).await?;
        match resp.pair {
            Some(p) => Ok(Some(reading_from_pair(p)?)),
            None => Ok(None),
        }
    }

    async fn profile_token(&self, token_address: &str) -> Result<Option<TokenProfile>> {
        match &self.goplus {
            Some(client) => client.token_security(token_address).await,
            None => Ok(None),
        }
    }
}

/// Keep only pairs on the target chain created within the freshness window.
fn filter_new_pairs(
    pairs: Vec<PairData>,
    chain: &str,
    max_age: chrono::Duration,
    now: DateTime<Utc>,
) -> Vec<DiscoveredPair> {
    pairs
        .into_iter()
        .filter(|p| p.chain_id == chain)
        .filter_map(|p| {
            let created_at = Utc.timestamp_millis_opt(p.pair_created_at?).single()?;
            if now.signed_duration_since(created_at) > max_age {
                return None;
            }
            let token_address = p.base_token.address.clone()?;
            Some(DiscoveredPair {
                pair_address: p.pair_address,
                token_address,
                chain: p.chain_id,
                symbol: p.base_token.symbol.unwrap_or_default(),
                created_at,
            })
        })
        .collect()
}

/// Map a raw pair payload to a reading. A missing price means the payload
/// cannot be trusted; secondary metrics default to zero like the feed does.
fn reading_from_pair(p: PairData) -> Result<PairReading> {
    let price_usd = p
        .price_usd
        .as_deref()
        .ok_or_else(|| {
            CollectorError::DataShape(format!("pair {}: missing priceUsd", p.pair_address))
        })?
        .parse::<Decimal>()
        .map_err(|e| {
            CollectorError::DataShape(format!("pair {}: bad priceUsd: {e}", p.pair_address))
        })?;

    let h1 = p.txns.and_then(|t| t.h1);
    Ok(PairReading {
        symbol: p.base_token.symbol.unwrap_or_default(),
        pair_address: p.pair_address,
        price_usd,
        liquidity_usd: p.liquidity.and_then(|l| l.usd).unwrap_or(Decimal::ZERO),
        volume_h1: p.volume.and_then(|v| v.h1).unwrap_or(Decimal::ZERO),
        buys_h1: h1.as_ref().and_then(|c| c.buys).unwrap_or(0),
        sells_h1: h1.and_then(|c| c.sells).unwrap_or(0),
    })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    pairs: Option<Vec<PairData>>,
}

#[derive(Debug, Deserialize)]
struct PairResponse {
    #[serde(default)]
    pair: Option<PairData>,
}

#[derive(Debug, Deserialize)]
struct PairData {
    #[serde(rename = "pairAddress")]
    pair_address: String,
    #[serde(rename = "chainId")]
    chain_id: String,
    #[serde(rename = "baseToken", default)]
    base_token: BaseToken,
    #[serde(rename = "priceUsd")]
    price_usd: Option<String>,
    #[serde(default)]
    liquidity: Option<LiquidityData>,
    #[serde(default)]
    volume: Option<VolumeData>,
    #[serde(default)]
    txns: Option<TxnsData>,
    #[serde(rename = "pairCreatedAt")]
    pair_created_at: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct BaseToken {
    address: Option<String>,
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LiquidityData {
    usd: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct VolumeData {
    h1: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
struct TxnsData {
    h1: Option<TxnCounts>,
}

#[derive(Debug, Deserialize)]
struct TxnCounts {
    buys: Option<u32>,
    sells: Option<u32>,
}
