use reqwest::StatusCode;
use thiserror::Error;

/// Failure taxonomy for the collector.
///
/// `Config` is fatal: it stops the process at startup or terminates the loop
/// mid-flight. `TransientFetch` and `Sink` are retried with bounded backoff
/// inside one cycle and never escape it. `DataShape` is never retried; the
/// affected cycle degrades to zero records.
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transient fetch failure: {0}")]
    TransientFetch(String),

    #[error("unexpected response shape: {0}")]
    DataShape(String),

    #[error("sink failure: {0}")]
    Sink(String),
}

impl CollectorError {
    /// Whether the retry/backoff policy applies.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientFetch(_) | Self::Sink(_))
    }

    /// Classify a reqwest transport error from the fetch path.
    pub fn from_request(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::DataShape(err.to_string())
        } else {
            // Timeouts, connect failures and resets are all worth a retry.
            Self::TransientFetch(err.to_string())
        }
    }

    /// Classify a non-success HTTP status from the fetch path.
    ///
    /// 429 and 5xx are transient; any other client error means the endpoint
    /// or credentials are wrong and retrying cannot help.
    pub fn from_status(status: StatusCode, url: &str) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Self::TransientFetch(format!("GET {url}: status {status}"))
        } else {
            Self::Config(format!("GET {url}: rejected with status {status}"))
        }
    }

    /// Classify a non-success HTTP status from the persist path, with the
    /// same 429/5xx-vs-4xx split as the fetch side.
    pub fn from_sink_status(status: StatusCode, url: &str) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Self::Sink(format!("POST {url}: status {status}"))
        } else {
            Self::Config(format!("POST {url}: rejected with status {status}"))
        }
    }
}

impl From<config::ConfigError> for CollectorError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CollectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let e = CollectorError::from_status(StatusCode::SERVICE_UNAVAILABLE, "http://x/y");
        assert!(e.is_transient());
        let e = CollectorError::from_status(StatusCode::TOO_MANY_REQUESTS, "http://x/y");
        assert!(e.is_transient());
    }

    #[test]
    fn client_errors_are_fatal() {
        let e = CollectorError::from_status(StatusCode::UNAUTHORIZED, "http://x/y");
        assert!(matches!(e, CollectorError::Config(_)));
        let e = CollectorError::from_status(StatusCode::NOT_FOUND, "http://x/y");
        assert!(matches!(e, CollectorError::Config(_)));
    }

    #[test]
    fn sink_statuses_follow_the_same_split() {
        let e = CollectorError::from_sink_status(StatusCode::BAD_GATEWAY, "http://x/y");
        assert!(matches!(e, CollectorError::Sink(_)));
        let e = CollectorError::from_sink_status(StatusCode::TOO_MANY_REQUESTS, "http://x/y");
        assert!(e.is_transient());
        let e = CollectorError::from_sink_status(StatusCode::UNAUTHORIZED, "http://x/y");
        assert!(matches!(e, CollectorError::Config(_)));
        let e = CollectorError::from_sink_status(StatusCode::NOT_FOUND, "http://x/y");
        assert!(matches!(e, CollectorError::Config(_)));
    }

    #[test]
    fn shape_and_sink_classes() {
        assert!(!CollectorError::DataShape("x".into()).is_transient());
        assert!(CollectorError::Sink("x".into()).is_transient());
    }
}
