pub mod jsonl;
pub mod stdout;
pub mod webhook;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CollectorError, Result};
use crate::types::MarketSnapshot;

/// Destination for collected snapshots. Append order is collection order;
/// each appended record is self-contained.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn append(&self, snapshot: &MarketSnapshot) -> Result<()>;
}

#[async_trait]
impl SnapshotSink for Box<dyn SnapshotSink + Send + Sync> {
    async fn append(&self, snapshot: &MarketSnapshot) -> Result<()> {
        (**self).append(snapshot).await
    }
}

/// Parsed form of the `OUTPUT_SINK` variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkSpec {
    Stdout,
    Jsonl(PathBuf),
    Webhook(String),
}

impl SinkSpec {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CollectorError::Config(
                "OUTPUT_SINK must not be empty".to_string(),
            ));
        }
        if raw == "stdout" || raw == "-" {
            return Ok(Self::Stdout);
        }
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Self::Webhook(raw.to_string()));
        }
        if let Some((scheme, _)) = raw.split_once("://") {
            return Err(CollectorError::Config(format!(
                "OUTPUT_SINK scheme {scheme:?} is not supported"
            )));
        }
        Ok(Self::Jsonl(PathBuf::from(raw)))
    }
}

impl fmt::Display for SinkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Jsonl(path) => write!(f, "jsonl:{}", path.display()),
            Self::Webhook(url) => write!(f, "webhook:{url}"),
        }
    }
}

/// Build the configured sink at startup.
pub fn build(spec: &SinkSpec, timeout: Duration) -> Result<Box<dyn SnapshotSink + Send + Sync>> {
    Ok(match spec {
        SinkSpec::Stdout => Box::new(stdout::StdoutSink::new()),
        SinkSpec::Jsonl(path) => Box::new(jsonl::JsonlSink::new(path.clone())),
        SinkSpec::Webhook(url) => Box::new(webhook::WebhookSink::new(url.clone(), timeout)?),
    })
}
