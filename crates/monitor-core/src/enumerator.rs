use std::future::Future;
use std::sync::Arc;

use futures::Stream;
use sources_api::{Page, SourcesClient};

use crate::error::FetchError;

// ─── PageFetcher ──────────────────────────────────────────────────────────

/// Retrieves one page of the sources collection.
pub trait PageFetcher {
    fn fetch(
        &self,
        limit: u64,
        offset: u64,
        skip_empty: bool,
    ) -> impl Future<Output = Result<Page, FetchError>> + Send;
}

impl PageFetcher for SourcesClient {
    async fn fetch(&self, limit: u64, offset: u64, skip_empty: bool) -> Result<Page, FetchError> {
        Ok(self.list_sources(limit, offset, skip_empty).await?)
    }
}

impl<T: PageFetcher + Send + Sync> PageFetcher for Arc<T> {
    fn fetch(
        &self,
        limit: u64,
        offset: u64,
        skip_empty: bool,
    ) -> impl Future<Output = Result<Page, FetchError>> + Send {
        (**self).fetch(limit, offset, skip_empty)
    }
}

// ─── SourceEnumerator ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Cursor {
    limit: u64,
    offset: u64,
}

/// Walks the collection one page at a time, strictly in offset order.
///
/// The first request uses the configured page size at offset 0; every later
/// request uses the `limit` and `offset` the server reported on the previous
/// page, and the latest page's `count` decides when to stop: the walk ends
/// after the first page whose `offset + limit` exceeds `count`. That page is
/// always yielded, so an empty collection still produces one (empty) page,
/// and a collection whose size is an exact multiple of the page size ends
/// with an empty trailing page.
///
/// Single use: once exhausted, or after a fetch error, [`next_page`] keeps
/// returning `Ok(None)` without touching the network.
///
/// [`next_page`]: SourceEnumerator::next_page
pub struct SourceEnumerator<F> {
    fetcher: F,
    skip_empty: bool,
    cursor: Option<Cursor>,
    pages_fetched: u64,
}

impl<F: PageFetcher> SourceEnumerator<F> {
    pub fn new(fetcher: F, page_size: u64, skip_empty: bool) -> Self {
        Self {
            fetcher,
            skip_empty,
            cursor: Some(Cursor {
                limit: page_size,
                offset: 0,
            }),
            pages_fetched: 0,
        }
    }

    pub fn skip_empty(&self) -> bool {
        self.skip_empty
    }

    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_none()
    }

    pub async fn next_page(&mut self) -> Result<Option<Page>, FetchError> {
        let Some(cursor) = self.cursor.take() else {
            return Ok(None);
        };

        let page = self
            .fetcher
            .fetch(cursor.limit, cursor.offset, self.skip_empty)
            .await?;
        self.pages_fetched += 1;

        let meta = page.meta;
        let next_offset = meta.offset.saturating_add(meta.limit);
        if next_offset <= meta.count {
            // A window that does not move forward would refetch the same page forever.
            if next_offset <= cursor.offset {
                return Err(FetchError::StalledPage {
                    offset: cursor.offset,
                });
            }
            self.cursor = Some(Cursor {
                limit: meta.limit,
                offset: next_offset,
            });
        }

        Ok(Some(page))
    }

    /// Adapt into a [`Stream`] of pages that ends after the last page or the
    /// first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Page, FetchError>> {
        futures::stream::try_unfold(self, |mut pages| async move {
            let page = pages.next_page().await?;
            Ok::<_, FetchError>(page.map(|p| (p, pages)))
        })
    }
}
