mod output;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use monitor_core::config::{DEFAULT_MAX_CONCURRENCY, DEFAULT_PAGE_SIZE};
use monitor_core::status::CHECK_ALL;
use monitor_core::MonitorConfig;

#[derive(Parser)]
#[command(
    name = "sources-monitor",
    about = "Request availability re-checks for every source matching a status",
    long_about = "Lists all sources from the internal sources API and requests an availability \
                  re-check for each one whose availability_status matches --status.\n\n\
                  Connection settings come from SOURCES_SCHEME, SOURCES_HOST, SOURCES_PORT and \
                  SOURCES_PSK; set SKIP_EMPTY_SOURCES=true to skip sources with nothing to check.",
    version
)]
struct Cli {
    /// Which availability_status to check ("all" checks every source;
    /// "unavailable" also picks up unchecked and in-progress sources)
    #[arg(long, default_value = CHECK_ALL)]
    status: String,

    /// Sources requested per listing page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u64,

    /// Maximum re-check requests in flight at once
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    max_concurrency: usize,

    /// Timeout for each request to the sources API, in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Print the run summary as JSON
    #[arg(long, short = 'j')]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = MonitorConfig::from_env();
    config.page_size = cli.page_size;
    config.max_concurrency = cli.max_concurrency;
    config.request_timeout = Duration::from_secs(cli.timeout_secs);

    let rt = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    let summary = rt
        .block_on(monitor_core::run(&config, &cli.status))
        .context("availability check run failed")?;

    if cli.json {
        output::print_json(&summary)?;
    } else {
        output::print_summary(&cli.status, &summary);
    }
    Ok(())
}
