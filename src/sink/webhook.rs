use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CollectorError, Result};
use crate::sink::SnapshotSink;
use crate::types::MarketSnapshot;

/// Forwards each snapshot as a JSON POST. Transport failures and 429/5xx
/// responses are `Sink` errors so the retry policy applies; any other 4xx
/// means the URL or credentials are wrong and surfaces as fatal.
pub struct WebhookSink {
    url: String,
    http: reqwest::Client,
}

impl WebhookSink {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollectorError::Config(format!("build webhook client: {e}")))?;
        Ok(Self { url, http })
    }
}

#[async_trait]
impl SnapshotSink for WebhookSink {
    async fn append(&self, snapshot: &MarketSnapshot) -> Result<()> {
        let resp = self
            .http
            .post(&self.url)
            .json(snapshot)
            .send()
            .await
            .map_err(|e| CollectorError::Sink(format!("POST {}: {e}", self.url)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CollectorError::from_sink_status(status, &self.url));
        }
        Ok(())
    }
}
