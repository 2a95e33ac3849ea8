use std::future::Future;
use std::sync::Arc;

use sources_api::{Record, SourcesClient};

// ---------------------------------------------------------------------------
// DispatchRequest
// ---------------------------------------------------------------------------

/// One re-check to perform. Built once per matching source and consumed by
/// a single [`ActionExecutor::execute`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub id: String,
    pub tenant_account: String,
    pub org_id: String,
    pub skip_empty_sources: bool,
}

impl DispatchRequest {
    pub fn new(record: Record, skip_empty_sources: bool) -> Self {
        Self {
            id: record.id,
            tenant_account: record.tenant_account,
            org_id: record.org_id,
            skip_empty_sources,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Accepted,
    Failed,
}

// ---------------------------------------------------------------------------
// ActionExecutor
// ---------------------------------------------------------------------------

/// Performs the re-check for one source.
///
/// Implementations never fail outward: every problem is logged and reported
/// as [`CheckOutcome::Failed`], and the call must always finish (bounded by
/// the HTTP timeout for the real client).
pub trait ActionExecutor {
    fn execute(&self, request: DispatchRequest) -> impl Future<Output = CheckOutcome> + Send;
}

impl ActionExecutor for SourcesClient {
    async fn execute(&self, request: DispatchRequest) -> CheckOutcome {
        tracing::info!(
            source_id = %request.id,
            account_number = %request.tenant_account,
            org_id = %request.org_id,
            skip_empty_sources = request.skip_empty_sources,
            "requesting availability status for source"
        );

        let result = self
            .check_availability(
                &request.id,
                &request.tenant_account,
                &request.org_id,
                request.skip_empty_sources,
            )
            .await;

        match result {
            Ok(()) => CheckOutcome::Accepted,
            Err(e) => {
                tracing::warn!(
                    source_id = %request.id,
                    account_number = %request.tenant_account,
                    org_id = %request.org_id,
                    skip_empty_sources = request.skip_empty_sources,
                    status = ?e.status(),
                    timed_out = e.is_timeout(),
                    error = %e,
                    "failed to request availability for source"
                );
                CheckOutcome::Failed
            }
        }
    }
}

impl<T: ActionExecutor + Send + Sync> ActionExecutor for Arc<T> {
    fn execute(&self, request: DispatchRequest) -> impl Future<Output = CheckOutcome> + Send {
        (**self).execute(request)
    }
}
