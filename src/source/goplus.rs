use std::collections::HashMap;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{CollectorError, Result};
use crate::source::TokenProfile;

/// GoPlus token-security client, queried once per token at discovery.
pub struct GoPlusClient {
    base_url: String,
    chain_id: String,
    api_key: String,
    http: reqwest::Client,
}

impl GoPlusClient {
    pub fn new(
        base_url: String,
        chain_id: String,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollectorError::Config(format!("build goplus client: {e}")))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            chain_id,
            api_key,
            http,
        })
    }

    /// `None` when the API has no data for the token.
    pub async fn token_security(&self, token_address: &str) -> Result<Option<TokenProfile>> {
        let url = format!(
            "{}/api/v1/token_security/{}?contract_addresses={}",
            self.base_url, self.chain_id, token_address
        );

        let resp = self
            .http
            .get(&url)
            .header("X-API-KEY", &self.api_key)
            .send()
            .await
            .map_err(CollectorError::from_request)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CollectorError::from_status(status, &url));
        }

        let body = resp.text().await.map_err(CollectorError::from_request)?;
        let resp: SecurityResponse = serde_json::from_str(&body).map_err(|e| {
            let snippet: String = body.chars().take(256).collect();
            CollectorError::DataShape(format!("decode {url}: {e} body_snippet={snippet}"))
        })?;
        Ok(profile_from_response(resp, token_address))
    }
}

/// GoPlus keys results by lowercased address and reports the honeypot flag
/// and taxes as strings.
fn profile_from_response(resp: SecurityResponse, token_address: &str) -> Option<TokenProfile> {
    let mut result = resp.result?;
    let data = result.remove(&token_address.to_lowercase())?;
    Some(TokenProfile {
        is_honeypot: data.is_honeypot.as_deref().map(|v| v == "1"),
        buy_tax: data.buy_tax.and_then(|v| v.parse::<Decimal>().ok()),
        sell_tax: data.sell_tax.and_then(|v| v.parse::<Decimal>().ok()),
    })
}

#[derive(Debug, Deserialize)]
struct SecurityResponse {
    #[serde(default)]
    result: Option<HashMap<String, SecurityData>>,
}

#[derive(Debug, Deserialize)]
struct SecurityData {
    is_honeypot: Option<String>,
    buy_tax: Option<String>,
    sell_tax: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SECURITY_JSON: &str = r#"{
        "code": 1,
        "message": "ok",
        "result": {
            "tokaddr1": {
                "is_honeypot": "1",
                "buy_tax": "0.02",
                "sell_tax": "0.35"
            }
        }
    }"#;

    #[test]
    fn security_payload_maps_to_profile() {
        let resp: SecurityResponse = serde_json::from_str(SECURITY_JSON).unwrap();
        let profile = profile_from_response(resp, "TokAddr1").unwrap();
        assert_eq!(profile.is_honeypot, Some(true));
        assert_eq!(profile.buy_tax, Some(dec!(0.02)));
        assert_eq!(profile.sell_tax, Some(dec!(0.35)));
    }

    #[test]
    fn unknown_token_yields_none() {
        let resp: SecurityResponse = serde_json::from_str(SECURITY_JSON).unwrap();
        assert!(profile_from_response(resp, "OtherToken").is_none());
    }

    #[test]
    fn null_result_yields_none() {
        let resp: SecurityResponse =
            serde_json::from_str(r#"{"code": 0, "message": "rate limited", "result": null}"#)
                .unwrap();
        assert!(profile_from_response(resp, "TokAddr1").is_none());
    }

    #[test]
    fn unparsable_tax_degrades_to_none_field() {
        let resp: SecurityResponse = serde_json::from_str(
            r#"{"result": {"tokaddr1": {"is_honeypot": "0", "buy_tax": "n/a"}}}"#,
        )
        .unwrap();
        let profile = profile_from_response(resp, "tokaddr1").unwrap();
        assert_eq!(profile.is_honeypot, Some(false));
        assert_eq!(profile.buy_tax, None);
        assert_eq!(profile.sell_tax, None);
    }
}
