use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketSignalError {
    #[error("config error: {0}")]
    Config(String),
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
    #[error("{0} source unavailable")]
    SourceUnavailable(crate::core::types::SourceKind),
    #[error("wholesale index error: {0}")]
    Wholesale(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{what} timed out after {after_ms}ms")]
    Timeout { what: &'static str, after_ms: u64 },
}
pub type Result<T> = std::result::Result<T, MarketSignalError>;
