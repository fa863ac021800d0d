//! rank-dl - command-line entry point

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use chrono::NaiveDate;
use clap::Parser;
use rank_dl::{Config, DateRange, RankMode, RankingDownloader, RunSummary};
use tracing_subscriber::EnvFilter;

/// Download daily illustration rankings into per-day folders
#[derive(Debug, Parser)]
#[command(name = "rank-dl", version, about)]
struct Cli {
    /// First ranking day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    start: NaiveDate,

    /// Last ranking day, exclusive (YYYY-MM-DD)
    #[arg(long)]
    end: NaiveDate,

    /// JSON configuration file; flags below override it
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Ranked works to take per day
    #[arg(long)]
    rank_limit: Option<usize>,

    /// Concurrent download workers
    #[arg(long, short = 'j')]
    threads: Option<usize>,

    /// API access token
    #[arg(long, env = "RANK_DL_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Root folder for downloads
    #[arg(long)]
    save_root: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Attempts per image before giving up
    #[arg(long)]
    try_time: Option<u32>,

    /// Seconds to wait between attempts
    #[arg(long, value_name = "SECS")]
    try_interval: Option<u64>,

    /// Ranking mode
    #[arg(long, value_enum)]
    mode: Option<RankMode>,

    /// Snapshot file used to resume after a failed run
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> rank_dl::Result<(Config, DateRange)> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };

        if let Some(limit) = self.rank_limit {
            config.ranking.rank_limit = limit;
        }
        if let Some(mode) = self.mode {
            config.ranking.mode = mode;
        }
        if let Some(threads) = self.threads {
            config.download.thread_num = threads;
        }
        if let Some(root) = self.save_root {
            config.download.save_root = root;
        }
        if let Some(token) = self.access_token {
            config.api.access_token = token;
        }
        if let Some(secs) = self.timeout {
            config.api.request_timeout = Duration::from_secs(secs);
        }
        if let Some(tries) = self.try_time {
            config.retry.max_attempts = tries;
        }
        if let Some(secs) = self.try_interval {
            config.retry.initial_delay = Duration::from_secs(secs);
        }
        if let Some(path) = self.snapshot {
            config.snapshot.path = path;
        }

        let range = DateRange::new(self.start, self.end)?;
        Ok((config, range))
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "rank_dl=debug" } else { "rank_dl=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn execute(cli: Cli) -> rank_dl::Result<RunSummary> {
    let (config, range) = cli.into_config()?;
    let downloader = RankingDownloader::from_config(config).await?;
    downloader.run_with_snapshot(range).await
}

fn report(summary: &RunSummary) {
    for failed in &summary.failed {
        eprintln!(
            "cannot download image task: {} (after {} attempts: {})",
            failed.task, failed.attempts, failed.error
        );
    }
    println!(
        "downloaded {}, skipped {}, failed {}",
        summary.downloaded,
        summary.skipped,
        summary.failed.len()
    );
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match execute(cli).await {
        Ok(summary) => {
            report(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, code = e.error_code(), "Run failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
