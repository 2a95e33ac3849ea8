use std::pin::pin;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::TryStreamExt;
use serde::Serialize;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};

use crate::enumerator::{PageFetcher, SourceEnumerator};
use crate::error::FetchError;
use crate::executor::{ActionExecutor, CheckOutcome, DispatchRequest};
use crate::status;

// ─── RunSummary ───────────────────────────────────────────────────────────

/// Counters for one completed run.
///
/// After the barrier, `succeeded + failed == dispatched` and
/// `dispatched + skipped == considered`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub pages: u64,
    pub considered: u64,
    pub dispatched: u64,
    pub skipped: u64,
    pub succeeded: u64,
    pub failed: u64,
}

// ─── Outstanding work ─────────────────────────────────────────────────────

#[derive(Default)]
struct Outstanding {
    count: AtomicUsize,
    idle: Notify,
}

impl Outstanding {
    fn begin(self: &Arc<Self>) -> WorkTicket {
        self.count.fetch_add(1, Ordering::AcqRel);
        WorkTicket {
            outstanding: Arc::clone(self),
        }
    }

    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    fn current(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    async fn wait_idle(&self) {
        loop {
            // Register interest before reading the count so a finish() that
            // lands in between still wakes us.
            let mut notified = pin!(self.idle.notified());
            notified.as_mut().enable();
            if self.current() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// One unit of outstanding work. Dropping it decrements the counter, so every
/// exit path (including a panicking executor) is accounted for exactly once.
struct WorkTicket {
    outstanding: Arc<Outstanding>,
}

impl Drop for WorkTicket {
    fn drop(&mut self) {
        self.outstanding.finish();
    }
}

/// Held by a running re-check task.
struct InFlight {
    permit: Option<OwnedSemaphorePermit>,
    ticket: Option<WorkTicket>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        // Slot back to the pool first, then leave the barrier count.
        drop(self.permit.take());
        drop(self.ticket.take());
    }
}

// ─── Dispatcher ───────────────────────────────────────────────────────────

/// Runs re-checks as independent Tokio tasks, never more than `capacity` at
/// once, and can block until all of them are done.
///
/// Owns its slot pool and outstanding counter, so independent dispatchers
/// never interfere with each other.
pub struct Dispatcher<E> {
    executor: Arc<E>,
    capacity: usize,
    slots: Arc<Semaphore>,
    outstanding: Arc<Outstanding>,
    accepted: Arc<AtomicU64>,
}

impl<E> Dispatcher<E>
where
    E: ActionExecutor + Send + Sync + 'static,
{
    /// A capacity of zero is raised to one.
    pub fn new(executor: E, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            executor: Arc::new(executor),
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
            outstanding: Arc::new(Outstanding::default()),
            accepted: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    /// Re-checks dispatched but not yet finished.
    pub fn outstanding(&self) -> usize {
        self.outstanding.current()
    }

    /// Re-checks that finished with [`CheckOutcome::Accepted`].
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Acquire)
    }

    /// Start one re-check.
    ///
    /// Counts the work as outstanding, then waits for a free slot (this is the
    /// backpressure on the caller), then spawns the executor. Slots are handed
    /// out in FIFO order; completion order is unconstrained.
    pub async fn dispatch(&self, request: DispatchRequest) {
        let ticket = self.outstanding.begin();

        let permit = match Arc::clone(&self.slots).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                // Only reachable if the pool was closed; the ticket drop
                // balances the counter.
                tracing::error!(
                    source_id = %request.id,
                    "concurrency pool closed; re-check not started"
                );
                return;
            }
        };

        let executor = Arc::clone(&self.executor);
        let accepted = Arc::clone(&self.accepted);
        tokio::spawn(async move {
            let in_flight = InFlight {
                permit: Some(permit),
                ticket: Some(ticket),
            };
            if executor.execute(request).await == CheckOutcome::Accepted {
                accepted.fetch_add(1, Ordering::AcqRel);
            }
            drop(in_flight);
        });
    }

    /// Block until every dispatched re-check has finished.
    pub async fn wait(&self) {
        self.outstanding.wait_idle().await;
    }

    /// Walk every page, dispatch a re-check for each source matching
    /// `target_status`, then wait for all of them.
    ///
    /// A listing failure returns immediately with the error; re-checks that
    /// were already started are not awaited.
    pub async fn run<F: PageFetcher>(
        self,
        pages: SourceEnumerator<F>,
        target_status: &str,
    ) -> Result<RunSummary, FetchError> {
        let skip_empty = pages.skip_empty();
        let mut summary = RunSummary::default();

        let mut pages = pin!(pages.into_stream());
        while let Some(page) = pages.try_next().await? {
            summary.pages += 1;
            for record in page.records {
                summary.considered += 1;
                if !status::matches(&record.availability_status, target_status) {
                    summary.skipped += 1;
                    tracing::debug!(
                        source_id = %record.id,
                        account_number = %record.tenant_account,
                        org_id = %record.org_id,
                        availability_status = %record.availability_status,
                        requested_status = target_status,
                        "skipped source"
                    );
                    continue;
                }
                summary.dispatched += 1;
                self.dispatch(DispatchRequest::new(record, skip_empty)).await;
            }
        }

        tracing::info!(
            count = summary.dispatched,
            "requested availability for sources, waiting for all checks to complete"
        );
        self.wait().await;

        summary.succeeded = self.accepted();
        summary.failed = summary.dispatched.saturating_sub(summary.succeeded);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sources_api::{Page, PageMeta, Record};
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    // ─── Fakes ────────────────────────────────────────────────────────────

    /// Records how many executions overlap and which ids ran.
    #[derive(Default)]
    struct Probe {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        completed: AtomicUsize,
        ids: Mutex<Vec<String>>,
    }

    struct ProbeExecutor {
        probe: Arc<Probe>,
        delay: Duration,
        fail_ids: HashSet<String>,
    }

    impl ProbeExecutor {
        fn new(probe: Arc<Probe>, delay: Duration) -> Self {
            Self {
                probe,
                delay,
                fail_ids: HashSet::new(),
            }
        }
    }

    impl ActionExecutor for ProbeExecutor {
        async fn execute(&self, request: DispatchRequest) -> CheckOutcome {
            let now = self.probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.probe.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.probe.ids.lock().unwrap().push(request.id.clone());
            self.probe.completed.fetch_add(1, Ordering::SeqCst);
            if self.fail_ids.contains(&request.id) {
                CheckOutcome::Failed
            } else {
                CheckOutcome::Accepted
            }
        }
    }

    /// Serves a fixed list of records in pages of whatever limit is asked.
    struct VecFetcher {
        records: Vec<Record>,
        fail_at_offset: Option<u64>,
    }

    impl PageFetcher for VecFetcher {
        async fn fetch(&self, limit: u64, offset: u64, _: bool) -> Result<Page, FetchError> {
            if self.fail_at_offset == Some(offset) {
                return Err(FetchError::StalledPage { offset });
            }
            let start = (offset as usize).min(self.records.len());
            let end = (start + limit as usize).min(self.records.len());
            Ok(Page {
                records: self.records[start..end].to_vec(),
                meta: PageMeta {
                    count: self.records.len() as u64,
                    limit,
                    offset,
                },
            })
        }
    }

    fn record(id: usize, status: &str) -> Record {
        Record {
            id: id.to_string(),
            tenant_account: format!("acct-{id}"),
            org_id: format!("org-{id}"),
            availability_status: status.to_string(),
        }
    }

    /// 150 sources: 30 never checked, 10 in progress, 5 unavailable, the
    /// rest available, interleaved across both pages.
    fn mixed_collection() -> Vec<Record> {
        (0..150)
            .map(|i| {
                let status = if i % 5 == 0 {
                    ""
                } else if i % 15 == 1 {
                    status::IN_PROGRESS
                } else if i % 30 == 2 {
                    status::UNAVAILABLE
                } else {
                    status::AVAILABLE
                };
                record(i, status)
            })
            .collect()
    }

    fn probe_dispatcher(
        capacity: usize,
        delay: Duration,
    ) -> (Dispatcher<ProbeExecutor>, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let dispatcher = Dispatcher::new(ProbeExecutor::new(probe.clone(), delay), capacity);
        (dispatcher, probe)
    }

    // ─── Tests ────────────────────────────────────────────────────────────

    #[test]
    fn mixed_collection_has_expected_shape() {
        let records = mixed_collection();
        let count = |s: &str| {
            records
                .iter()
                .filter(|r| r.availability_status == s)
                .count()
        };
        assert_eq!(records.len(), 150);
        assert_eq!(count(""), 30);
        assert_eq!(count("in_progress"), 10);
        assert_eq!(count("unavailable"), 5);
        assert_eq!(count("available"), 105);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn mixed_scenario_dispatches_45_within_bound() {
        let (dispatcher, probe) = probe_dispatcher(3, Duration::from_millis(5));
        let fetcher = VecFetcher {
            records: mixed_collection(),
            fail_at_offset: None,
        };

        let summary = dispatcher
            .run(SourceEnumerator::new(fetcher, 100, false), "unavailable")
            .await
            .unwrap();

        assert_eq!(summary.pages, 2);
        assert_eq!(summary.considered, 150);
        assert_eq!(summary.dispatched, 45);
        assert_eq!(summary.skipped, 105);
        assert_eq!(summary.succeeded, 45);
        assert_eq!(summary.failed, 0);
        assert_eq!(probe.completed.load(Ordering::SeqCst), 45);
        assert!(probe.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_capacity() {
        for capacity in 1..=5 {
            let (dispatcher, probe) = probe_dispatcher(capacity, Duration::from_millis(2));
            for i in 0..25 {
                dispatcher
                    .dispatch(DispatchRequest::new(record(i, ""), false))
                    .await;
                assert!(dispatcher.available_slots() <= capacity);
            }
            dispatcher.wait().await;
            let peak = probe.peak.load(Ordering::SeqCst);
            assert!(
                (1..=capacity).contains(&peak),
                "capacity {capacity}, peak {peak}"
            );
            assert_eq!(probe.completed.load(Ordering::SeqCst), 25);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fills_every_slot_under_load() {
        let (dispatcher, probe) = probe_dispatcher(3, Duration::from_millis(50));
        for i in 0..9 {
            dispatcher
                .dispatch(DispatchRequest::new(record(i, ""), false))
                .await;
        }
        dispatcher.wait().await;
        assert_eq!(probe.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn wait_blocks_until_all_work_is_terminal() {
        let (dispatcher, probe) = probe_dispatcher(2, Duration::from_millis(20));
        for i in 0..6 {
            dispatcher
                .dispatch(DispatchRequest::new(record(i, ""), false))
                .await;
        }
        assert!(dispatcher.outstanding() > 0);

        dispatcher.wait().await;

        assert_eq!(dispatcher.outstanding(), 0);
        assert_eq!(dispatcher.available_slots(), 2);
        assert_eq!(probe.completed.load(Ordering::SeqCst), 6);
        let ids: HashSet<String> = probe.ids.lock().unwrap().iter().cloned().collect();
        assert_eq!(ids.len(), 6);
    }

    #[tokio::test]
    async fn wait_without_work_returns_immediately() {
        let (dispatcher, _probe) = probe_dispatcher(3, Duration::ZERO);
        dispatcher.wait().await;
        assert_eq!(dispatcher.outstanding(), 0);
    }

    #[tokio::test]
    async fn zero_capacity_is_raised_to_one() {
        let (dispatcher, _probe) = probe_dispatcher(0, Duration::ZERO);
        assert_eq!(dispatcher.capacity(), 1);
        assert_eq!(dispatcher.available_slots(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failed_checks_do_not_stop_the_run() {
        let probe = Arc::new(Probe::default());
        let mut executor = ProbeExecutor::new(probe.clone(), Duration::from_millis(1));
        executor.fail_ids = ["1", "4", "7"].iter().map(|s| s.to_string()).collect();
        let dispatcher = Dispatcher::new(executor, 3);
        let fetcher = VecFetcher {
            records: (0..10).map(|i| record(i, "available")).collect(),
            fail_at_offset: None,
        };

        let summary = dispatcher
            .run(SourceEnumerator::new(fetcher, 4, false), status::CHECK_ALL)
            .await
            .unwrap();

        assert_eq!(summary.pages, 3);
        assert_eq!(summary.dispatched, 10);
        assert_eq!(summary.succeeded, 7);
        assert_eq!(summary.failed, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panicking_executor_still_releases_slot_and_barrier() {
        struct Panics;
        impl ActionExecutor for Panics {
            async fn execute(&self, request: DispatchRequest) -> CheckOutcome {
                if request.id == "0" {
                    panic!("boom");
                }
                CheckOutcome::Accepted
            }
        }

        let dispatcher = Dispatcher::new(Panics, 1);
        for i in 0..3 {
            dispatcher
                .dispatch(DispatchRequest::new(record(i, ""), false))
                .await;
        }
        dispatcher.wait().await;
        assert_eq!(dispatcher.outstanding(), 0);
        assert_eq!(dispatcher.available_slots(), 1);
        assert_eq!(dispatcher.accepted(), 2);
    }

    #[tokio::test]
    async fn first_page_failure_dispatches_nothing() {
        let (dispatcher, probe) = probe_dispatcher(3, Duration::ZERO);
        let fetcher = VecFetcher {
            records: (0..10).map(|i| record(i, "")).collect(),
            fail_at_offset: Some(0),
        };

        let result = dispatcher
            .run(SourceEnumerator::new(fetcher, 100, false), status::CHECK_ALL)
            .await;

        assert!(result.is_err());
        assert_eq!(probe.completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn later_page_failure_is_fatal() {
        let (dispatcher, _probe) = probe_dispatcher(3, Duration::ZERO);
        let fetcher = VecFetcher {
            records: (0..150).map(|i| record(i, "")).collect(),
            fail_at_offset: Some(100),
        };

        let err = dispatcher
            .run(SourceEnumerator::new(fetcher, 100, false), status::CHECK_ALL)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::StalledPage { offset: 100 }));
    }

    #[tokio::test]
    async fn skip_flag_is_forwarded_to_requests() {
        struct Capture(Mutex<Vec<DispatchRequest>>);
        impl ActionExecutor for Capture {
            async fn execute(&self, request: DispatchRequest) -> CheckOutcome {
                self.0.lock().unwrap().push(request);
                CheckOutcome::Accepted
            }
        }

        let capture = Arc::new(Capture(Mutex::new(Vec::new())));
        let dispatcher = Dispatcher::new(capture.clone(), 3);
        let fetcher = VecFetcher {
            records: vec![record(1, "unavailable"), record(2, "available")],
            fail_at_offset: None,
        };

        dispatcher
            .run(SourceEnumerator::new(fetcher, 100, true), "unavailable")
            .await
            .unwrap();

        let seen = capture.0.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].id, "1");
        assert_eq!(seen[0].tenant_account, "acct-1");
        assert_eq!(seen[0].org_id, "org-1");
        assert!(seen[0].skip_empty_sources);
    }
}
