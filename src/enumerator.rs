//! Ranking enumeration -- walks each day of a range and pages through its ranking.
//!
//! Tasks come out ordered by date, then rank, then page index. The enumerator is lazy:
//! a ranking page is only requested once every task of the previous page was handed out,
//! so a bounded consumer throttles the page requests as well.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::NaiveDate;
use futures::Stream;

use crate::api::GalleryApi;
use crate::error::{Error, Result};
use crate::types::{DateRange, DownloadTask, RankMode, RankedWork, RankingQuery};

/// Position inside the day currently being enumerated
#[derive(Debug)]
struct DayCursor {
    date: NaiveDate,
    /// Rank slots consumed so far (one per work, whatever its image count)
    rank: usize,
    /// Query for the next page; `None` once the day is exhausted
    next: Option<RankingQuery>,
}

/// Lazy, finite, single-pass producer of [`DownloadTask`]s
pub struct RankEntryEnumerator {
    api: Arc<dyn GalleryApi>,
    mode: RankMode,
    rank_limit: usize,
    days: Box<dyn Iterator<Item = NaiveDate> + Send>,
    day: Option<DayCursor>,
    pending: VecDeque<DownloadTask>,
    /// Continuation failure, held back until the tasks of its page are handed out
    deferred_error: Option<Error>,
    done: bool,
}

impl RankEntryEnumerator {
    /// Enumerate `range`, taking at most `rank_limit` ranked works per day
    pub fn new(
        api: Arc<dyn GalleryApi>,
        range: DateRange,
        mode: RankMode,
        rank_limit: usize,
    ) -> Self {
        Self {
            api,
            mode,
            rank_limit,
            days: Box::new(range.days()),
            day: None,
            pending: VecDeque::new(),
            deferred_error: None,
            done: false,
        }
    }

    /// Next task, `Ok(None)` at the end of the range
    ///
    /// A ranking failure is returned once and ends the enumeration; later calls yield `None`.
    pub async fn next_task(&mut self) -> Result<Option<DownloadTask>> {
        loop {
            if let Some(task) = self.pending.pop_front() {
                return Ok(Some(task));
            }
            if let Some(e) = self.deferred_error.take() {
                self.done = true;
                self.day = None;
                return Err(e);
            }
            if self.done {
                return Ok(None);
            }

            let query = match self.day.as_mut().and_then(|cursor| cursor.next.take()) {
                Some(query) => query,
                None => match self.days.next() {
                    Some(date) => {
                        tracing::debug!(%date, mode = %self.mode, "Enumerating ranking day");
                        self.day = Some(DayCursor {
                            date,
                            rank: 0,
                            next: None,
                        });
                        RankingQuery::first_page(date, self.mode)
                    }
                    None => {
                        self.day = None;
                        self.done = true;
                        return Ok(None);
                    }
                },
            };

            if let Err(e) = self.load_page(&query).await {
                self.done = true;
                self.day = None;
                return Err(e);
            }
        }
    }

    /// Consume the enumerator as a stream
    pub fn into_stream(self) -> impl Stream<Item = Result<DownloadTask>> + Send {
        futures::stream::try_unfold(self, |mut enumerator| async move {
            Ok(enumerator
                .next_task()
                .await?
                .map(|task| (task, enumerator)))
        })
    }

    async fn load_page(&mut self, query: &RankingQuery) -> Result<()> {
        let page = self.api.fetch_ranking_page(query).await?;

        let Some(cursor) = self.day.as_mut() else {
            return Ok(());
        };
        let remaining = self.rank_limit.saturating_sub(cursor.rank);
        let page_empty = page.works.is_empty();

        for work in page.works.into_iter().take(remaining) {
            self.pending
                .extend(tasks_for_work(&work, cursor.date, cursor.rank));
            cursor.rank += 1;
        }

        // An empty page ends the day even if it advertises a continuation
        if cursor.rank < self.rank_limit
            && !page_empty
            && let Some(next_url) = page.next_url
        {
            match self.api.parse_continuation(&next_url) {
                Ok(query) => cursor.next = Some(query),
                Err(e) => self.deferred_error = Some(e),
            }
        }

        tracing::debug!(
            date = %cursor.date,
            ranks = cursor.rank,
            queued = self.pending.len(),
            more = cursor.next.is_some(),
            "Ranking page enumerated"
        );
        Ok(())
    }
}

/// Tasks for one ranked work: one per image, page index only for multi-image works.
/// URLs that cannot back a task are skipped; the work still used its rank slot.
fn tasks_for_work(work: &RankedWork, date: NaiveDate, rank: usize) -> Vec<DownloadTask> {
    if work.image_urls.is_empty() {
        tracing::warn!(work_id = work.id, title = %work.title, %date, rank, "Ranked work has no images");
        return Vec::new();
    }

    let multi = work.is_multi_page();
    work.image_urls
        .iter()
        .enumerate()
        .filter_map(|(index, url)| {
            let page_index = multi.then_some(index);
            match DownloadTask::new(url.as_str(), work.title.as_str(), date, rank, page_index) {
                Ok(task) => Some(task),
                Err(e) => {
                    tracing::warn!(work_id = work.id, %date, rank, error = %e, "Skipping image");
                    None
                }
            }
        })
        .collect()
}
