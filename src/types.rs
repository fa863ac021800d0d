//! Core types for rank-dl

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Ranking list to walk
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum RankMode {
    /// Daily ranking (default)
    #[default]
    Day,
    /// Weekly ranking
    Week,
    /// Monthly ranking
    Month,
    /// Daily ranking, male audience
    DayMale,
    /// Daily ranking, female audience
    DayFemale,
    /// Weekly ranking of original works
    WeekOriginal,
    /// Weekly ranking of rookie artists
    WeekRookie,
    /// Daily manga ranking
    DayManga,
}

impl RankMode {
    /// Value of the `mode` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            RankMode::Day => "day",
            RankMode::Week => "week",
            RankMode::Month => "month",
            RankMode::DayMale => "day_male",
            RankMode::DayFemale => "day_female",
            RankMode::WeekOriginal => "week_original",
            RankMode::WeekRookie => "week_rookie",
            RankMode::DayManga => "day_manga",
        }
    }
}

impl std::fmt::Display for RankMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Half-open range of calendar days, `[start, end)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// First day, inclusive
    pub start: NaiveDate,
    /// Last day, exclusive
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `end < start`. `end == start` is an empty range.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::Config {
                message: format!("end date {end} is before start date {start}"),
                key: Some("end".to_string()),
            });
        }
        Ok(Self { start, end })
    }

    /// Iterate the days of the range in ascending order
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }

    /// Number of days covered
    pub fn len(&self) -> usize {
        (self.end - self.start).num_days().max(0) as usize
    }

    /// True if the range covers no day
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Query parameters for one ranking page request
///
/// The first page of a day is built from mode and date; later pages replay the
/// parameters carried by the previous page's continuation URL.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RankingQuery {
    /// Ordered `(key, value)` pairs
    pub params: Vec<(String, String)>,
}

impl RankingQuery {
    /// Query for the first ranking page of `date`
    pub fn first_page(date: NaiveDate, mode: RankMode) -> Self {
        Self {
            params: vec![
                ("mode".to_string(), mode.as_str().to_string()),
                ("date".to_string(), date.format("%Y-%m-%d").to_string()),
            ],
        }
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// One entry of a ranking page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedWork {
    /// Gallery-side identifier
    pub id: u64,
    /// Work title
    pub title: String,
    /// Number of pages the gallery reports for the work
    pub page_count: u32,
    /// Original-resolution image URLs, in page order. One entry for single-image works.
    pub image_urls: Vec<String>,
}

impl RankedWork {
    /// True if the gallery reports several pages, even when fewer URLs came back
    pub fn is_multi_page(&self) -> bool {
        self.page_count > 1
    }
}

/// One page of a day's ranking
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RankingPage {
    /// Ranked works in rank order
    pub works: Vec<RankedWork>,
    /// Continuation URL for the next page, if any
    pub next_url: Option<String>,
}

/// Deduplication key of a download: lowercase hex MD5 of the source URL
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskFingerprint(String);

impl TaskFingerprint {
    /// Fingerprint a URL
    pub fn of_url(url: &str) -> Self {
        Self(format!("{:x}", md5::compute(url.as_bytes())))
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One image to fetch
///
/// Built by the enumerator, consumed once by a fetch worker, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DownloadTask {
    source_url: String,
    title: String,
    rank_date: NaiveDate,
    rank: usize,
    page_index: Option<usize>,
}

impl DownloadTask {
    /// Create a task. The URL must be non-empty and its last path segment must carry an
    /// extension, which becomes the suffix of the saved file.
    pub fn new(
        source_url: impl Into<String>,
        title: impl Into<String>,
        rank_date: NaiveDate,
        rank: usize,
        page_index: Option<usize>,
    ) -> Result<Self> {
        let source_url = source_url.into();
        if source_url.is_empty() {
            return Err(Error::InvalidTask("empty source url".to_string()));
        }
        if url_suffix(&source_url).is_none() {
            return Err(Error::InvalidTask(format!(
                "no file extension in {source_url}"
            )));
        }
        Ok(Self {
            source_url,
            title: title.into(),
            rank_date,
            rank,
            page_index,
        })
    }

    /// URL of the image
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Title of the ranked work
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Ranking day
    pub fn rank_date(&self) -> NaiveDate {
        self.rank_date
    }

    /// Zero-based rank slot within the day
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Image position inside a multi-image work
    pub fn page_index(&self) -> Option<usize> {
        self.page_index
    }

    /// File suffix, dot included (e.g. ".png")
    pub fn suffix(&self) -> &str {
        // Checked in `new`.
        url_suffix(&self.source_url).unwrap_or_default()
    }

    /// Deduplication key. Depends on the URL only.
    pub fn fingerprint(&self) -> TaskFingerprint {
        TaskFingerprint::of_url(&self.source_url)
    }

    /// Sort key matching enumeration order: date, rank, then page (single-image first)
    pub fn order_key(&self) -> (NaiveDate, usize, Option<usize>) {
        (self.rank_date, self.rank, self.page_index)
    }
}

impl std::fmt::Display for DownloadTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{} #{} {}", self.rank_date, self.rank, self.source_url),
        }
    }
}

/// Suffix (".ext") of the URL's final path segment, ignoring query and fragment
pub(crate) fn url_suffix(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next().unwrap_or(path);
    let dot = segment.rfind('.')?;
    let suffix = &segment[dot..];
    if suffix.len() > 1 { Some(suffix) } else { None }
}

/// Why a task was not fetched
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Fingerprint already in the seen set
    Seen,
    /// Destination file already on disk
    Exists,
}

/// Result of running the per-task procedure
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// File written to `path`
    Downloaded {
        /// Final file location
        path: PathBuf,
        /// Attempts used, including the successful one
        attempts: u32,
    },
    /// Nothing fetched
    Skipped(SkipReason),
    /// Abandoned after exhausting (or being refused) retries
    Failed {
        /// Attempts made
        attempts: u32,
        /// Last error
        error: String,
    },
}

/// A task abandoned during a run, kept for manual retry
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailedTask {
    /// The task that failed
    pub task: DownloadTask,
    /// Attempts made
    pub attempts: u32,
    /// Last error
    pub error: String,
}

/// Totals of a pipeline run
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Files written
    pub downloaded: usize,
    /// Tasks skipped (seen or already on disk)
    pub skipped: usize,
    /// Tasks abandoned
    pub failed: Vec<FailedTask>,
}

impl RunSummary {
    /// Fold one task's outcome into the totals
    pub fn record(&mut self, task: DownloadTask, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Downloaded { .. } => self.downloaded += 1,
            TaskOutcome::Skipped(_) => self.skipped += 1,
            TaskOutcome::Failed { attempts, error } => self.failed.push(FailedTask {
                task,
                attempts,
                error,
            }),
        }
    }

    /// Number of tasks seen by the fetch stage
    pub fn total(&self) -> usize {
        self.downloaded + self.skipped + self.failed.len()
    }
}
