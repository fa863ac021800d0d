//! Ranking downloader split into focused submodules.
//!
//! - [`naming`] - Destination folder and file names
//! - [`fetch`] - Per-task procedure: dedup claim, directory, retrying fetch
//! - [`pool`] - Worker pool draining the enumerator
//!
//! [`RankingDownloader::run_with_snapshot`] is the error boundary of a run: when the
//! pipeline fails, the seen set is written to the snapshot path before the error is
//! returned, so the next run can resume.

mod fetch;
mod naming;
mod pool;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use naming::{file_name, folder_name, sanitize_title};

use std::sync::Arc;

use crate::api::{GalleryApi, PixivClient};
use crate::config::Config;
use crate::dedup::SeenSet;
use crate::enumerator::RankEntryEnumerator;
use crate::error::Result;
use crate::types::{DateRange, RunSummary};

/// Pipeline orchestrator (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct RankingDownloader {
    /// Gallery capability shared by the enumerator and every worker
    pub(crate) api: Arc<dyn GalleryApi>,
    /// Configuration (wrapped in Arc for sharing across workers)
    pub(crate) config: Arc<Config>,
    /// Fingerprints claimed so far, injected into every worker
    pub(crate) seen: SeenSet,
}

impl RankingDownloader {
    /// Create a downloader over an arbitrary gallery implementation
    pub fn new(api: Arc<dyn GalleryApi>, config: Config, seen: SeenSet) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            api,
            config: Arc::new(config),
            seen,
        })
    }

    /// Production setup: HTTP client from `config.api`, seen set restored from the snapshot
    pub async fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        let api: Arc<dyn GalleryApi> = Arc::new(PixivClient::new(&config.api)?);
        let seen = SeenSet::restore(&config.snapshot.path).await?;
        Self::new(api, config, seen)
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shared seen set
    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    /// Enumerator over `range` using the configured mode and rank limit
    pub fn enumerator(&self, range: DateRange) -> RankEntryEnumerator {
        RankEntryEnumerator::new(
            Arc::clone(&self.api),
            range,
            self.config.ranking.mode,
            self.config.ranking.rank_limit,
        )
    }

    /// Run the pipeline over `range`, writing the snapshot if it fails
    ///
    /// The snapshot write is best-effort: if it fails too, that failure is logged and the
    /// original pipeline error is returned.
    pub async fn run_with_snapshot(&self, range: DateRange) -> Result<RunSummary> {
        let path = &self.config.snapshot.path;
        match self.run(range).await {
            Ok(summary) => {
                if self.config.snapshot.persist_on_success
                    && let Err(e) = self.seen.persist(path).await
                {
                    tracing::warn!(error = %e, "Failed to write snapshot after clean run");
                }
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    code = e.error_code(),
                    snapshot = %path.display(),
                    "Pipeline failed, writing snapshot"
                );
                if let Err(persist_err) = self.seen.persist(path).await {
                    tracing::error!(
                        error = %persist_err,
                        "Snapshot write failed, next run will not resume"
                    );
                }
                Err(e)
            }
        }
    }
}
