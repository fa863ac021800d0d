//! Per-task procedure -- claim the fingerprint, prepare the day folder, fetch with retry.

use super::RankingDownloader;
use super::naming::{file_name, folder_name};
use crate::retry::fetch_with_retry;
use crate::types::{DownloadTask, SkipReason, TaskOutcome};

impl RankingDownloader {
    /// Materialize one task under the save root
    ///
    /// Never fails: a task that cannot be fetched is reported as [`TaskOutcome::Failed`]
    /// and logged with enough detail for a manual retry.
    pub async fn download(&self, task: &DownloadTask) -> TaskOutcome {
        let fingerprint = task.fingerprint();
        if self.seen.contains(&fingerprint).await {
            tracing::trace!(url = task.source_url(), "Already seen, skipping");
            return TaskOutcome::Skipped(SkipReason::Seen);
        }

        let folder = self
            .config
            .download
            .save_root
            .join(folder_name(task.rank_date()));
        // create_dir_all succeeds when the folder already exists, so racing workers are fine
        if let Err(e) = tokio::fs::create_dir_all(&folder).await {
            tracing::error!(
                folder = %folder.display(),
                error = %e,
                title = task.title(),
                date = %task.rank_date(),
                rank = task.rank(),
                "Cannot create day folder"
            );
            return TaskOutcome::Failed {
                attempts: 0,
                error: e.to_string(),
            };
        }

        let name = file_name(task);
        let target = folder.join(&name);

        if !self.seen.claim(&fingerprint).await {
            return TaskOutcome::Skipped(SkipReason::Seen);
        }

        if self.config.download.skip_existing
            && tokio::fs::try_exists(&target).await.unwrap_or(false)
        {
            self.seen.settle(&fingerprint).await;
            tracing::debug!(path = %target.display(), "File already on disk, skipping");
            return TaskOutcome::Skipped(SkipReason::Exists);
        }

        let result = fetch_with_retry(&self.config.retry, || {
            self.api.fetch_binary(task.source_url(), &folder, &name)
        })
        .await;
        self.seen.settle(&fingerprint).await;

        match result {
            Ok(((), attempts)) => {
                tracing::info!(
                    path = %target.display(),
                    rank = task.rank(),
                    attempts,
                    "Downloaded"
                );
                TaskOutcome::Downloaded {
                    path: target,
                    attempts,
                }
            }
            Err(failure) => {
                tracing::error!(
                    title = task.title(),
                    date = %task.rank_date(),
                    rank = task.rank(),
                    page = ?task.page_index(),
                    attempts = failure.attempts,
                    error = %failure.error,
                    task = %task,
                    "Cannot download image task"
                );
                TaskOutcome::Failed {
                    attempts: failure.attempts,
                    error: failure.error.to_string(),
                }
            }
        }
    }
}
