//! Gallery API capability
//!
//! The pipeline only needs three things from the remote gallery: a ranking page for a
//! query, a way to turn a continuation URL back into a query, and a binary fetch into a
//! local file. [`GalleryApi`] captures exactly that so the enumerator and the fetch
//! workers can be driven by [`PixivClient`] in production and by a mock in tests.

mod pixiv;

pub use pixiv::PixivClient;

use std::path::Path;

use crate::error::{Error, FetchError, Result};
use crate::types::{RankingPage, RankingQuery};

/// Abstraction over the remote gallery, shared read-only by the enumerator and all workers.
#[async_trait::async_trait]
pub trait GalleryApi: Send + Sync {
    /// Fetch one ranking page. Errors are fatal to the enumeration.
    async fn fetch_ranking_page(&self, query: &RankingQuery) -> Result<RankingPage>;

    /// Turn a page's continuation URL into the query for the next page
    fn parse_continuation(&self, next_url: &str) -> Result<RankingQuery> {
        parse_query_params(next_url)
    }

    /// Fetch `url` and store it as `folder/name`. `folder` already exists.
    async fn fetch_binary(
        &self,
        url: &str,
        folder: &Path,
        name: &str,
    ) -> std::result::Result<(), FetchError>;
}

/// Extract the query parameters of a URL, in order
pub fn parse_query_params(url: &str) -> Result<RankingQuery> {
    let parsed = url::Url::parse(url)
        .map_err(|e| Error::InvalidContinuation(format!("{url}: {e}")))?;
    let params: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if params.is_empty() {
        return Err(Error::InvalidContinuation(format!(
            "{url}: no query parameters"
        )));
    }
    Ok(RankingQuery { params })
}
