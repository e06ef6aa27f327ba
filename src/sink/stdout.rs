use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{CollectorError, Result};
use crate::sink::SnapshotSink;
use crate::types::MarketSnapshot;

/// Line-delimited JSON on standard output, flushed per record so the
/// hosting platform can stream it in real time.
pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SnapshotSink for StdoutSink {
    async fn append(&self, snapshot: &MarketSnapshot) -> Result<()> {
        let line = serde_json::to_string(snapshot)
            .map_err(|e| CollectorError::Sink(format!("encode snapshot: {e}")))?;

        let mut out = tokio::io::stdout();
        out.write_all(line.as_bytes())
            .await
            .map_err(|e| CollectorError::Sink(format!("write stdout: {e}")))?;
        out.write_all(b"\n")
            .await
            .map_err(|e| CollectorError::Sink(format!("write stdout: {e}")))?;
        out.flush()
            .await
            .map_err(|e| CollectorError::Sink(format!("flush stdout: {e}")))?;
        Ok(())
    }
}
