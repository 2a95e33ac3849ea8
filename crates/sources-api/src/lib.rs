//! `sources-api` — async client for the internal sources API.
//!
//! Covers the two endpoints the availability monitor talks to:
//!
//! ```text
//! GET  /internal/v2.0/sources?limit=L&offset=O               → 200 { data, meta }
//! POST /api/sources/v3.1/sources/{id}/check_availability      → 202 Accepted
//! ```
//!
//! Every request carries the pre-shared key header. Both calls share one
//! `reqwest::Client` configured with a fixed request timeout, so a hung
//! server surfaces as [`ClientError::Transport`] instead of blocking forever.

pub mod client;
pub mod error;
pub mod types;


pub use client::{
    ClientOptions, SourcesClient, ACCOUNT_NUMBER_HEADER, MONITOR_ACCOUNT, ORG_ID_HEADER,
    PSK_HEADER, SKIP_EMPTY_SOURCES_HEADER,
};
pub use error::ClientError;
pub use types::{Page, PageMeta, Record};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ClientError>;
