//! Ingest command implementation

use crate::cli::CliError;
use crate::fetcher::http::{DEFAULT_DATA_API_URL, DEFAULT_GAMMA_API_URL};
use crate::fetcher::HttpTradeSource;
use crate::ingest::{IngestConfig, IngestionOrchestrator, RunResult};
use crate::shutdown::SharedShutdown;
use crate::store::{MemoryTradeStore, SqliteTradeStore, TradeStore};
use chrono::{DateTime, NaiveDate};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Try to parse a datetime from RFC3339 format.
///
/// Handles both inputs with and without timezone designators:
/// - "2024-01-01T00:00:00Z" - explicit UTC
/// - "2024-01-01T00:00:00+01:00" - explicit offset
/// - "2024-01-01T00:00:00" - no timezone, assumed UTC
///
/// Returns a timestamp in seconds, or None if parsing fails.
fn try_parse_datetime_rfc3339(input: &str) -> Option<i64> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.timestamp());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{input}Z")) {
        return Some(dt.timestamp());
    }

    None
}

/// Parse a fallback start date from YYYY-MM-DD or RFC3339 datetime format.
///
/// For date-only format, uses start-of-day (00:00:00 UTC).
fn parse_start_time_flexible(input: &str) -> Result<i64, CliError> {
    if let Some(ts) = try_parse_datetime_rfc3339(input) {
        return Ok(ts);
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|e| CliError::InvalidArgument(format!("Invalid fallback start: {e}")))?;
    let datetime = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CliError::InvalidArgument("Invalid fallback start".to_string()))?;
    Ok(datetime.and_utc().timestamp())
}

/// Trade History Ingestor CLI
#[derive(Parser, Debug)]
#[command(name = "trade-history-ingestor")]
#[command(about = "Ingest complete market trade histories from paginated APIs", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Expose Prometheus metrics on this address (e.g. 0.0.0.0:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest the full trade history of one market
    Ingest(IngestArgs),
}

/// Ingest command arguments
#[derive(Parser, Debug)]
pub struct IngestArgs {
    /// Market identifier (condition id, e.g. 0x0576b194...)
    pub market_id: String,

    /// SQLite database path
    #[arg(long, default_value = "data/trades.db")]
    pub db: PathBuf,

    /// Fetch without persisting to disk (in-memory store)
    #[arg(long, default_value_t = false)]
    pub no_db: bool,

    /// Trade endpoint base URL
    #[arg(long, default_value = DEFAULT_DATA_API_URL)]
    pub data_url: String,

    /// Market metadata endpoint base URL
    #[arg(long, default_value = DEFAULT_GAMMA_API_URL)]
    pub gamma_url: String,

    /// Maximum sustained request rate (requests/second)
    #[arg(long, default_value_t = 10.0)]
    pub rate: f64,

    /// Maximum attempts per request, including the first (range: 1-10)
    #[arg(long, default_value = "3", value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: u32,

    /// Initial retry backoff in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub retry_base_ms: u64,

    /// Trades per persisted batch
    #[arg(long, default_value_t = 500)]
    pub batch_size: usize,

    /// Rows requested per page
    #[arg(long, default_value_t = 500)]
    pub page_limit: usize,

    /// Pagination depth cap per daily interval
    ///
    /// The upstream offset pagination is only reliable up to a cumulative
    /// offset of roughly 1000-1500 rows; raise this only if the upstream
    /// service fixes that.
    #[arg(long, default_value_t = 3)]
    pub max_pages: usize,

    /// Fallback start date (YYYY-MM-DD or RFC3339) when neither metadata
    /// nor the store yields a boundary
    #[arg(long, default_value = "2020-01-01")]
    pub fallback_start: String,
}

impl IngestArgs {
    /// Build the ingestion config from arguments.
    fn config(&self) -> Result<IngestConfig, CliError> {
        let config = IngestConfig {
            requests_per_second: self.rate,
            max_attempts: self.max_attempts,
            retry_base_delay: Duration::from_millis(self.retry_base_ms),
            batch_size: self.batch_size,
            page_limit: self.page_limit,
            max_pages_per_interval: self.max_pages,
            fallback_start: parse_start_time_flexible(&self.fallback_start)?,
        };
        config.validate().map_err(CliError::InvalidArgument)?;
        Ok(config)
    }

    /// Execute the ingest command.
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let config = self.config()?;

        let store: Arc<dyn TradeStore> = if self.no_db {
            info!("Running without persistence (--no-db): results are discarded on exit");
            Arc::new(MemoryTradeStore::new())
        } else {
            Arc::new(SqliteTradeStore::open(&self.db)?)
        };

        let source = Arc::new(HttpTradeSource::with_urls(
            self.data_url.clone(),
            self.gamma_url.clone(),
        ));

        let progress_bar = build_progress_bar();
        let pb = progress_bar.clone();

        let orchestrator = IngestionOrchestrator::new(source, store, config)
            .with_shutdown(shutdown)
            .with_progress(move |update| {
                if pb.length() != Some(update.total_intervals as u64) {
                    pb.set_length(update.total_intervals as u64);
                }
                pb.set_position(update.interval_index as u64 + 1);
                pb.set_message(format!(
                    "{} new, {} duplicates",
                    update.new_count, update.duplicate_count
                ));
            });

        let result = orchestrator.run(&self.market_id).await?;
        progress_bar.finish_and_clear();

        match cli.output_format {
            OutputFormat::Json => self.output_json(&result),
            OutputFormat::Human => self.output_human(&result),
        }

        Ok(())
    }

    fn output_human(&self, result: &RunResult) {
        println!("Ingestion {} for market {}",
            if result.completed { "complete" } else { "PARTIAL (cancelled)" },
            self.market_id,
        );
        println!("  New trades:       {}", result.new_count);
        println!("  Duplicates:       {}", result.duplicate_count);
        println!("  Intervals:        {}", result.total_intervals);

        if !result.truncated_intervals.is_empty() {
            println!(
                "  Possibly truncated ({}): counts above may undercount these days",
                result.truncated_intervals.len()
            );
            for interval in &result.truncated_intervals {
                println!("    {interval}");
            }
        }

        if !result.failed_intervals.is_empty() {
            println!(
                "  Failed ({}): re-run to retry these days",
                result.failed_intervals.len()
            );
            for interval in &result.failed_intervals {
                println!("    {interval}");
            }
        }

        if !result.completed {
            println!(
                "  Not processed:    {} intervals (re-run resumes via deduplication)",
                result.remaining_intervals.len()
            );
        }
    }

    fn output_json(&self, result: &RunResult) {
        let output = json!({
            "market_id": self.market_id,
            "completed": result.completed,
            "new_count": result.new_count,
            "duplicate_count": result.duplicate_count,
            "total_intervals": result.total_intervals,
            "truncated_intervals": result.truncated_intervals,
            "failed_intervals": result.failed_intervals,
            "remaining_intervals": result.remaining_intervals.len(),
        });
        match serde_json::to_string_pretty(&output) {
            Ok(text) => println!("{text}"),
            Err(e) => warn!(error = %e, "Failed to serialize JSON output"),
        }
    }
}

fn build_progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} days  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

/// Output format options
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}
