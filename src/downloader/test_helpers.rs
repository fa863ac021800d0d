//! In-memory gallery used by unit tests

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDate;

use crate::api::GalleryApi;
use crate::config::Config;
use crate::dedup::SeenSet;
use crate::downloader::RankingDownloader;
use crate::error::{Error, FetchError, Result};
use crate::types::{RankedWork, RankingPage, RankingQuery};

pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Ranked work with `images` PNG URLs derived from its id
pub(crate) fn work(id: u64, title: &str, images: usize) -> RankedWork {
    RankedWork {
        id,
        title: title.to_string(),
        page_count: images as u32,
        image_urls: (0..images)
            .map(|i| format!("https://img.mock/{id}_p{i}.png"))
            .collect(),
    }
}

/// Gallery with scripted ranking pages and binary fetch failures
#[derive(Default)]
pub(crate) struct MockGallery {
    rankings: HashMap<String, Vec<Vec<RankedWork>>>,
    failing_days: HashSet<String>,
    broken_continuations: HashSet<String>,
    missing_urls: HashSet<String>,
    /// url -> remaining transient failures
    flaky_urls: Mutex<HashMap<String, u32>>,
    fetch_delay: Duration,
    ranking_calls: Mutex<Vec<RankingQuery>>,
    binary_calls: Mutex<Vec<String>>,
}

impl MockGallery {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Ranking of `date`, one inner vec per page
    pub(crate) fn with_day(mut self, date: NaiveDate, pages: Vec<Vec<RankedWork>>) -> Self {
        self.rankings
            .insert(date.format("%Y-%m-%d").to_string(), pages);
        self
    }

    /// Ranking requests for `date` fail
    pub(crate) fn failing_day(mut self, date: NaiveDate) -> Self {
        self.failing_days
            .insert(date.format("%Y-%m-%d").to_string());
        self
    }

    /// Ranking pages of `date` advertise a continuation that is not a URL
    pub(crate) fn broken_continuation(mut self, date: NaiveDate) -> Self {
        self.broken_continuations
            .insert(date.format("%Y-%m-%d").to_string());
        self
    }

    /// `url` answers 404
    pub(crate) fn missing(mut self, url: &str) -> Self {
        self.missing_urls.insert(url.to_string());
        self
    }

    /// `url` times out `times` times before succeeding
    pub(crate) fn flaky(self, url: &str, times: u32) -> Self {
        self.flaky_urls
            .lock()
            .unwrap()
            .insert(url.to_string(), times);
        self
    }

    /// Every binary fetch sleeps this long first
    pub(crate) fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    pub(crate) fn ranking_calls(&self) -> Vec<RankingQuery> {
        self.ranking_calls.lock().unwrap().clone()
    }

    pub(crate) fn binary_calls(&self) -> Vec<String> {
        self.binary_calls.lock().unwrap().clone()
    }

    pub(crate) fn binary_calls_for(&self, url: &str) -> usize {
        self.binary_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|u| *u == url)
            .count()
    }
}

#[async_trait::async_trait]
impl GalleryApi for MockGallery {
    async fn fetch_ranking_page(&self, query: &RankingQuery) -> Result<RankingPage> {
        self.ranking_calls.lock().unwrap().push(query.clone());

        let date = query.get("date").unwrap_or_default().to_string();
        if self.failing_days.contains(&date) {
            return Err(Error::Api {
                status: 500,
                message: format!("ranking for {date} unavailable"),
            });
        }

        let index: usize = query
            .get("page")
            .and_then(|p| p.parse().ok())
            .unwrap_or(0);
        let Some(pages) = self.rankings.get(&date) else {
            return Ok(RankingPage::default());
        };
        let works = pages.get(index).cloned().unwrap_or_default();
        if self.broken_continuations.contains(&date) {
            return Ok(RankingPage {
                works,
                next_url: Some("not a url".to_string()),
            });
        }
        let next_url = (index + 1 < pages.len()).then(|| {
            format!(
                "https://mock.gallery/ranking?mode={}&date={}&page={}",
                query.get("mode").unwrap_or("day"),
                date,
                index + 1
            )
        });
        Ok(RankingPage { works, next_url })
    }

    async fn fetch_binary(
        &self,
        url: &str,
        folder: &Path,
        name: &str,
    ) -> std::result::Result<(), FetchError> {
        self.binary_calls.lock().unwrap().push(url.to_string());
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }

        if self.missing_urls.contains(url) {
            return Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            });
        }
        {
            let mut flaky = self.flaky_urls.lock().unwrap();
            if let Some(remaining) = flaky.get_mut(url) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(FetchError::Timeout(format!("{url} timed out")));
                }
            }
        }

        let path = folder.join(name);
        std::fs::write(&path, url.as_bytes()).map_err(|source| FetchError::Write { path, source })
    }
}

/// Config writing into `temp_dir` with fast retries and a single worker
pub(crate) fn test_config(temp_dir: &Path) -> Config {
    let mut config = Config::default();
    config.download.save_root = temp_dir.join("download");
    config.download.thread_num = 1;
    config.snapshot.path = temp_dir.join("snapshot");
    config.retry.max_attempts = 3;
    config.retry.initial_delay = Duration::from_millis(10);
    config
}

/// Downloader over `mock` with [`test_config`]. Keep the tempdir alive for the test.
pub(crate) fn create_test_downloader(
    mock: Arc<MockGallery>,
) -> (RankingDownloader, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let downloader = RankingDownloader::new(mock, config, SeenSet::new()).unwrap();
    (downloader, temp_dir)
}
