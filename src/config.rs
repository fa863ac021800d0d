//! Configuration types for rank-dl

use crate::error::{Error, Result};
use crate::types::RankMode;
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Ranking endpoint and credentials
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the app API (default: "https://app-api.pixiv.net")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// OAuth access token sent as a bearer token. Obtaining it is the caller's job.
    #[serde(default)]
    pub access_token: String,

    /// User-Agent header for every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Referer header required by the image host
    #[serde(default = "default_referer")]
    pub referer: String,

    /// Per-request timeout (default: 10 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            access_token: String::new(),
            user_agent: default_user_agent(),
            referer: default_referer(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Which ranking to walk and how deep
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Ranking mode (default: day)
    #[serde(default)]
    pub mode: RankMode,

    /// Number of ranked works to take per day (default: 1)
    #[serde(default = "default_rank_limit")]
    pub rank_limit: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            mode: RankMode::default(),
            rank_limit: default_rank_limit(),
        }
    }
}

/// Where files land and how many workers fetch them
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Root of the per-day folder hierarchy (default: "./download")
    #[serde(default = "default_save_root")]
    pub save_root: PathBuf,

    /// Number of concurrent fetch workers (default: 4)
    #[serde(default = "default_thread_num")]
    pub thread_num: usize,

    /// Treat a destination file that already exists as fetched (default: true)
    #[serde(default = "default_true")]
    pub skip_existing: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            save_root: default_save_root(),
            thread_num: default_thread_num(),
            skip_existing: true,
        }
    }
}

/// Retry configuration for binary fetches
///
/// The defaults give a fixed delay: `backoff_multiplier` 1.0 and no jitter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts per task, first one included (default: 5)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between attempts (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Upper bound for the delay once backoff kicks in (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each failure (default: 1.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Seen-set snapshot location and policy
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SnapshotConfig {
    /// Snapshot file (default: "./snapshot")
    #[serde(default = "default_snapshot_path")]
    pub path: PathBuf,

    /// Also write the snapshot after a clean run (default: false)
    #[serde(default)]
    pub persist_on_success: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: default_snapshot_path(),
            persist_on_success: false,
        }
    }
}

/// Main configuration for [`RankingDownloader`](crate::RankingDownloader)
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Ranking endpoint and credentials
    #[serde(default)]
    pub api: ApiConfig,

    /// Ranking mode and depth
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Output layout and worker count
    #[serde(default)]
    pub download: DownloadConfig,

    /// Per-task retry policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Crash snapshot
    #[serde(default)]
    pub snapshot: SnapshotConfig,
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Check the values the pipeline cannot run without
    pub fn validate(&self) -> Result<()> {
        if self.download.thread_num == 0 {
            return Err(Error::config("thread_num", "must be at least 1"));
        }
        if self.ranking.rank_limit == 0 {
            return Err(Error::config("rank_limit", "must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::config("max_attempts", "must be at least 1"));
        }
        let multiplier = self.retry.backoff_multiplier;
        if !multiplier.is_finite() || multiplier < 1.0 {
            return Err(Error::config(
                "backoff_multiplier",
                "must be a finite number >= 1.0",
            ));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://app-api.pixiv.net".to_string()
}

fn default_user_agent() -> String {
    "PixivIOSApp/7.13.3 (iOS 14.6; iPhone13,2)".to_string()
}

fn default_referer() -> String {
    "https://app-api.pixiv.net/".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_rank_limit() -> usize {
    1
}

fn default_save_root() -> PathBuf {
    PathBuf::from("./download")
}

fn default_thread_num() -> usize {
    4
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("./snapshot")
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
