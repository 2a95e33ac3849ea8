//! `monitor-core` — walks the sources collection page by page and requests an
//! availability re-check for every source whose status matches the target.
//!
//! ```text
//! SourceEnumerator ──pages──▶ status::matches ──▶ Dispatcher ──spawn──▶ ActionExecutor
//!  (sequential GETs)          (per record)        (K slots +            (one POST per
//!                                                  outstanding count)    source)
//! ```
//!
//! A listing failure ends the run with [`FetchError`]; a failed re-check is
//! logged and counted but never stops the walk. [`run`] does not return
//! until every dispatched re-check has finished.

pub mod config;
pub mod dispatcher;
pub mod enumerator;
pub mod error;
pub mod executor;
pub mod run;
pub mod status;

pub use config::MonitorConfig;
pub use dispatcher::{Dispatcher, RunSummary};
pub use enumerator::{PageFetcher, SourceEnumerator};
pub use error::{ConfigError, FetchError, MonitorError, Result};
pub use executor::{ActionExecutor, CheckOutcome, DispatchRequest};
pub use run::run;
