use std::time::Duration;

use reqwest::Url;
use sources_api::ClientOptions;

use crate::error::ConfigError;

pub const DEFAULT_PAGE_SIZE: u64 = 100;
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const SCHEME_VAR: &str = "SOURCES_SCHEME";
pub const HOST_VAR: &str = "SOURCES_HOST";
pub const PORT_VAR: &str = "SOURCES_PORT";
pub const PSK_VAR: &str = "SOURCES_PSK";
pub const SKIP_EMPTY_SOURCES_VAR: &str = "SKIP_EMPTY_SOURCES";

// ---------------------------------------------------------------------------
// MonitorConfig
// ---------------------------------------------------------------------------

/// Everything one run needs, built once at startup and passed down by
/// reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// `scheme://host:port` of the sources API.
    pub base_url: String,
    pub psk: String,
    /// Ask the API to leave out sources that need no check, on both the
    /// listing and the re-check calls.
    pub skip_empty_sources: bool,
    pub page_size: u64,
    /// Maximum number of re-check calls in flight at once.
    pub max_concurrency: usize,
    /// Per-request timeout for listing and re-check calls alike.
    pub request_timeout: Duration,
}

impl MonitorConfig {
    pub fn new(base_url: impl Into<String>, psk: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            psk: psk.into(),
            skip_empty_sources: false,
            page_size: DEFAULT_PAGE_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Read connection settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup. Missing variables read as
    /// empty strings; call [`MonitorConfig::validate`] before using the result.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).unwrap_or_default();

        let base_url = format!("{}://{}:{}", var(SCHEME_VAR), var(HOST_VAR), var(PORT_VAR));
        let mut config = Self::new(base_url, var(PSK_VAR));
        config.skip_empty_sources = var(SKIP_EMPTY_SOURCES_VAR).to_lowercase() == "true";
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.psk.is_empty() {
            return Err(ConfigError::MissingPsk);
        }
        if !is_valid_base_url(&self.base_url) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.base_url.clone(),
            psk: self.psk.clone(),
            timeout: self.request_timeout,
        }
    }
}

/// Absolute `http`/`https` URL with a host. Path and query are left for the
/// HTTP client to deal with.
fn is_valid_base_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| !host.is_empty())
                && !url.cannot_be_a_base()
        }
        Err(_) => false,
    }
}
