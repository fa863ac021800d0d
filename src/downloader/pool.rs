//! Worker pool -- drains the enumerator into at most `thread_num` concurrent fetches.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

use super::RankingDownloader;
use crate::error::{Error, Result};
use crate::types::{DateRange, DownloadTask, RunSummary, TaskOutcome};

impl RankingDownloader {
    /// Enumerate `range` and fetch every task
    ///
    /// The enumerator runs on the calling task and only asks for the next task once a
    /// worker slot is free. Per-task failures end up in the summary; an enumeration
    /// failure is returned after the workers already dispatched have finished.
    pub async fn run(&self, range: DateRange) -> Result<RunSummary> {
        let thread_num = self.config.download.thread_num;
        if thread_num == 0 {
            return Err(Error::WorkerPool("thread_num must be at least 1".to_string()));
        }

        tracing::info!(
            start = %range.start,
            end = %range.end,
            mode = %self.config.ranking.mode,
            rank_limit = self.config.ranking.rank_limit,
            thread_num,
            save_root = %self.config.download.save_root.display(),
            "Starting ranking download"
        );

        let mut tasks = self.enumerator(range);
        let slots = Arc::new(Semaphore::new(thread_num));
        let mut workers: JoinSet<(DownloadTask, TaskOutcome)> = JoinSet::new();
        let mut summary = RunSummary::default();

        let enumeration: Result<()> = loop {
            // Blocks while every worker is busy
            let permit = match Arc::clone(&slots).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break Err(Error::WorkerPool("worker slots closed".to_string())),
            };

            let task = match tasks.next_task().await {
                Ok(Some(task)) => task,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };

            let downloader = self.clone();
            workers.spawn(async move {
                let _permit = permit;
                let outcome = downloader.download(&task).await;
                (task, outcome)
            });

            while let Some(joined) = workers.try_join_next() {
                record(&mut summary, joined);
            }
        };

        while let Some(joined) = workers.join_next().await {
            record(&mut summary, joined);
        }

        enumeration?;

        tracing::info!(
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            failed = summary.failed.len(),
            "Ranking download finished"
        );
        Ok(summary)
    }
}

fn record(
    summary: &mut RunSummary,
    joined: std::result::Result<(DownloadTask, TaskOutcome), JoinError>,
) {
    match joined {
        Ok((task, outcome)) => summary.record(task, outcome),
        // The task's fingerprint stays in flight, so the snapshot leaves it out
        Err(e) => tracing::error!(error = %e, "Download worker aborted"),
    }
}
