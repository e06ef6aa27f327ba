use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{CollectorError, Result};
use crate::sink::SnapshotSink;
use crate::types::MarketSnapshot;

/// Append-only JSONL file sink: one self-contained snapshot per line.
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SnapshotSink for JsonlSink {
    async fn append(&self, snapshot: &MarketSnapshot) -> Result<()> {
        let line = serde_json::to_string(snapshot)
            .map_err(|e| CollectorError::Sink(format!("encode snapshot: {e}")))?;

        let mut f = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                CollectorError::Sink(format!("open {}: {e}", self.path.display()))
            })?;

        f.write_all(line.as_bytes())
            .await
            .map_err(|e| CollectorError::Sink(format!("write {}: {e}", self.path.display())))?;
        f.write_all(b"\n")
            .await
            .map_err(|e| CollectorError::Sink(format!("write {}: {e}", self.path.display())))?;
        f.flush()
            .await
            .map_err(|e| CollectorError::Sink(format!("flush {}: {e}", self.path.display())))?;
        Ok(())
    }
}
