use sources_api::SourcesClient;

use crate::config::MonitorConfig;
use crate::dispatcher::{Dispatcher, RunSummary};
use crate::enumerator::SourceEnumerator;
use crate::error::{MonitorError, Result};

/// Request an availability re-check for every source whose status matches
/// `target_status`, then wait for all of them to finish.
///
/// Returns `Err` on invalid configuration or any listing failure. Failed
/// re-checks only show up in the summary's `failed` counter.
pub async fn run(config: &MonitorConfig, target_status: &str) -> Result<RunSummary> {
    config.validate()?;

    tracing::info!(
        host = %config.base_url,
        status = target_status,
        skip_empty_sources = config.skip_empty_sources,
        max_concurrency = config.max_concurrency,
        "checking sources"
    );

    let client = SourcesClient::new(config.client_options()).map_err(MonitorError::Client)?;
    let pages = SourceEnumerator::new(
        client.clone(),
        config.page_size,
        config.skip_empty_sources,
    );
    let dispatcher = Dispatcher::new(client, config.max_concurrency);

    let summary = dispatcher.run(pages, target_status).await?;

    tracing::info!(
        pages = summary.pages,
        dispatched = summary.dispatched,
        skipped = summary.skipped,
        succeeded = summary.succeeded,
        failed = summary.failed,
        "availability checks complete"
    );
    Ok(summary)
}
