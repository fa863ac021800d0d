//! # rank-dl
//!
//! Downloads the daily illustration rankings of a gallery service over a date range.
//!
//! The pipeline has three parts:
//! - [`RankEntryEnumerator`] walks each day of the range and pages through its ranking,
//!   producing one [`DownloadTask`] per image.
//! - [`RankingDownloader`] dispatches tasks to a fixed number of workers that fetch each
//!   image with bounded retry into `<save_root>/<YYYYMMDD>/`.
//! - [`SeenSet`] deduplicates tasks by URL fingerprint and is written to a snapshot file
//!   when the run fails, so the next run resumes where this one stopped.
//!
//! ## Quick Start
//!
//! ```no_run
//! use chrono::NaiveDate;
//! use rank_dl::{Config, DateRange, RankingDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.api.access_token = "your-access-token".to_string();
//!     config.ranking.rank_limit = 10;
//!
//!     let downloader = RankingDownloader::from_config(config).await?;
//!     let range = DateRange::new(
//!         NaiveDate::from_ymd_opt(2017, 1, 1).unwrap(),
//!         NaiveDate::from_ymd_opt(2017, 2, 1).unwrap(),
//!     )?;
//!
//!     let summary = downloader.run_with_snapshot(range).await?;
//!     println!("downloaded {} files", summary.downloaded);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Gallery API capability and its HTTP client
pub mod api;
/// Configuration types
pub mod config;
/// Seen-set deduplication and crash snapshot
pub mod dedup;
/// Orchestrator, per-task fetch and worker pool
pub mod downloader;
/// Ranking enumeration
pub mod enumerator;
/// Error types
pub mod error;
/// Bounded retry for binary fetches
pub mod retry;
/// Core types
pub mod types;

// Re-export commonly used types
pub use api::{GalleryApi, PixivClient};
pub use config::{ApiConfig, Config, DownloadConfig, RankingConfig, RetryConfig, SnapshotConfig};
pub use dedup::SeenSet;
pub use downloader::RankingDownloader;
pub use enumerator::RankEntryEnumerator;
pub use error::{Error, FetchError, Result};
pub use types::{
    DateRange, DownloadTask, FailedTask, RankMode, RankedWork, RankingPage, RankingQuery,
    RunSummary, SkipReason, TaskFingerprint, TaskOutcome,
};
