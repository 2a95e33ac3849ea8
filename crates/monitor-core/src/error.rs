use sources_api::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("need a PSK to run availability checks: set SOURCES_PSK")]
    MissingPsk,

    #[error("invalid sources API address '{0}': expected scheme://host:port")]
    InvalidBaseUrl(String),

    #[error("page size must be at least 1")]
    ZeroPageSize,

    #[error("max concurrency must be at least 1")]
    ZeroConcurrency,
}

/// A listing failure. Always fatal to the run: without an authoritative page
/// there is no way to tell whether the whole collection was covered.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to list internal sources: {0}")]
    Client(#[from] ClientError),

    #[error("sources listing stopped advancing at offset {offset}")]
    StalledPage { offset: u64 },
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to set up sources client: {0}")]
    Client(#[source] ClientError),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
