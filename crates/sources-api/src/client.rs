use std::time::Duration;

use reqwest::{StatusCode, Url};

use crate::types::Page;
use crate::{ClientError, Result};

/// Caller identity header; also carries the record's tenant on rechecks.
pub const ACCOUNT_NUMBER_HEADER: &str = "x-rh-sources-account-number";
pub const ORG_ID_HEADER: &str = "x-rh-sources-org-id";
pub const PSK_HEADER: &str = "x-rh-sources-psk";
/// Asks the API to leave out sources that have nothing to check.
pub const SKIP_EMPTY_SOURCES_HEADER: &str = "x-rh-sources-skip-empty-sources";

/// Static account number the monitor identifies itself with when listing.
pub const MONITOR_ACCOUNT: &str = "sources_monitor";

const LIST_SOURCES: &str = "GET /internal/v2.0/sources";
const CHECK_AVAILABILITY: &str = "POST /api/sources/v3.1/sources/{id}/check_availability";

// ─── ClientOptions ────────────────────────────────────────────────────────

/// Connection settings for [`SourcesClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// `scheme://host:port` of the sources API. A path prefix, if any, is kept
    /// in front of the endpoint paths.
    pub base_url: String,
    /// Pre-shared key sent on every request.
    pub psk: String,
    /// Applied to each request as a whole (connect + headers + body).
    pub timeout: Duration,
}

// ─── SourcesClient ────────────────────────────────────────────────────────

/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct SourcesClient {
    http: reqwest::Client,
    base_url: Url,
    psk: String,
}

impl SourcesClient {
    pub fn new(opts: ClientOptions) -> Result<Self> {
        let base_url = Url::parse(&opts.base_url).map_err(|e| ClientError::InvalidBaseUrl {
            url: opts.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl {
                url: opts.base_url,
                reason: "not a hierarchical URL".into(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(opts.timeout)
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self {
            http,
            base_url,
            psk: opts.psk,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Base URL with `segments` appended as individually percent-encoded
    /// path segments.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // `new` rejects cannot-be-a-base URLs, so the segments are always editable.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub(crate) fn list_sources_url(&self, limit: u64, offset: u64) -> Url {
        let mut url = self.endpoint(&["internal", "v2.0", "sources"]);
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        url
    }

    pub(crate) fn check_availability_url(&self, source_id: &str) -> Url {
        self.endpoint(&[
            "api",
            "sources",
            "v3.1",
            "sources",
            source_id,
            "check_availability",
        ])
    }

    /// `GET /internal/v2.0/sources?limit={limit}&offset={offset}`
    ///
    /// Anything but `200 OK` with a body that parses as a [`Page`] is an error.
    pub async fn list_sources(&self, limit: u64, offset: u64, skip_empty: bool) -> Result<Page> {
        tracing::info!(
            limit,
            offset,
            host = %self.base_url,
            skip_empty_sources = skip_empty,
            "requesting sources from internal API"
        );

        let mut req = self
            .http
            .get(self.list_sources_url(limit, offset))
            .header(ACCOUNT_NUMBER_HEADER, MONITOR_ACCOUNT)
            .header(PSK_HEADER, &self.psk);
        if skip_empty {
            req = req.header(SKIP_EMPTY_SOURCES_HEADER, "true");
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(ClientError::UnexpectedStatus {
                endpoint: LIST_SOURCES,
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().await?;
        serde_json::from_slice(&body).map_err(ClientError::Decode)
    }

    /// `POST /api/sources/v3.1/sources/{id}/check_availability`
    ///
    /// `source_id` is percent-encoded as a single path segment. Tenant and org
    /// headers are only sent when non-empty. Succeeds only on `202 Accepted`.
    pub async fn check_availability(
        &self,
        source_id: &str,
        account_number: &str,
        org_id: &str,
        skip_empty: bool,
    ) -> Result<()> {
        let mut req = self
            .http
            .post(self.check_availability_url(source_id))
            .header(PSK_HEADER, &self.psk);
        if !account_number.is_empty() {
            req = req.header(ACCOUNT_NUMBER_HEADER, account_number);
        }
        if !org_id.is_empty() {
            req = req.header(ORG_ID_HEADER, org_id);
        }
        if skip_empty {
            req = req.header(SKIP_EMPTY_SOURCES_HEADER, "true");
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status != StatusCode::ACCEPTED {
            return Err(ClientError::UnexpectedStatus {
                endpoint: CHECK_AVAILABILITY,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
