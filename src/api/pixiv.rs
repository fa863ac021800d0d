//! HTTP implementation of [`GalleryApi`] against the Pixiv app API.

use std::path::Path;

use reqwest::header::REFERER;
use serde::Deserialize;

use super::GalleryApi;
use crate::config::ApiConfig;
use crate::error::{Error, FetchError, Result};
use crate::types::{RankedWork, RankingPage, RankingQuery};

/// Ranking client authenticated with a bearer token
pub struct PixivClient {
    http: reqwest::Client,
    ranking_url: url::Url,
    access_token: String,
    referer: String,
}

impl PixivClient {
    /// Build a client. Fails when the token is missing or the base URL does not parse.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        if config.access_token.trim().is_empty() {
            return Err(Error::config("access_token", "an access token is required"));
        }

        let ranking_url = url::Url::parse(&format!(
            "{}/v1/illust/ranking",
            config.base_url.trim_end_matches('/')
        ))
        .map_err(|e| Error::config("base_url", format!("invalid base url: {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            http,
            ranking_url,
            access_token: config.access_token.clone(),
            referer: config.referer.clone(),
        })
    }
}

#[async_trait::async_trait]
impl GalleryApi for PixivClient {
    async fn fetch_ranking_page(&self, query: &RankingQuery) -> Result<RankingPage> {
        let mut params = query.params.clone();
        if query.get("filter").is_none() {
            params.push(("filter".to_string(), "for_ios".to_string()));
        }

        let response = self
            .http
            .get(self.ranking_url.clone())
            .query(&params)
            .bearer_auth(&self.access_token)
            .header("App-OS", "ios")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| status.to_string());
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: RankingResponse = response.json().await?;
        tracing::debug!(
            works = body.illusts.len(),
            has_next = body.next_url.is_some(),
            "Fetched ranking page"
        );
        Ok(body.into_page())
    }

    async fn fetch_binary(
        &self,
        url: &str,
        folder: &Path,
        name: &str,
    ) -> std::result::Result<(), FetchError> {
        let response = self
            .http
            .get(url)
            .header(REFERER, &self.referer)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;

        // Write beside the target and rename so an interrupted fetch leaves no
        // truncated file under the final name.
        let target = folder.join(name);
        let partial = folder.join(format!("{name}.part"));
        let written = match tokio::fs::write(&partial, &bytes).await {
            Ok(()) => tokio::fs::rename(&partial, &target)
                .await
                .map_err(|source| FetchError::Write {
                    path: target.clone(),
                    source,
                }),
            Err(source) => Err(FetchError::Write {
                path: partial.clone(),
                source,
            }),
        };
        if written.is_err() {
            // Best-effort cleanup
            let _ = tokio::fs::remove_file(&partial).await;
        }
        written?;

        tracing::debug!(url, path = %target.display(), bytes = bytes.len(), "Image saved");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RankingResponse {
    #[serde(default)]
    illusts: Vec<Illust>,
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Illust {
    id: u64,
    title: String,
    page_count: u32,
    #[serde(default)]
    meta_single_page: MetaSinglePage,
    #[serde(default)]
    meta_pages: Vec<MetaPage>,
}

#[derive(Debug, Default, Deserialize)]
struct MetaSinglePage {
    original_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MetaPage {
    image_urls: ImageUrls,
}

#[derive(Debug, Deserialize)]
struct ImageUrls {
    original: String,
}

impl RankingResponse {
    fn into_page(self) -> RankingPage {
        RankingPage {
            works: self.illusts.into_iter().map(Illust::into_work).collect(),
            next_url: self.next_url,
        }
    }
}

impl Illust {
    fn into_work(self) -> RankedWork {
        let image_urls = if self.page_count <= 1 {
            self.meta_single_page
                .original_image_url
                .into_iter()
                .collect()
        } else {
            self.meta_pages
                .into_iter()
                .map(|p| p.image_urls.original)
                .collect()
        };
        RankedWork {
            id: self.id,
            title: self.title,
            page_count: self.page_count,
            image_urls,
        }
    }
}
