//! Common test utilities for rank-dl integration tests
//!
//! A wiremock server stands in for both the ranking API and the image host.

#![allow(dead_code)]

use std::path::Path;
use std::time::Duration;

use rank_dl::Config;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCESS_TOKEN: &str = "integration-token";

/// One ranked illustration as the API returns it
pub struct Illust {
    pub id: u64,
    pub title: &'static str,
    pub pages: u32,
}

impl Illust {
    pub fn new(id: u64, title: &'static str, pages: u32) -> Self {
        Self { id, title, pages }
    }

    fn image_url(&self, server: &MockServer, page: u32) -> String {
        format!("{}/img/{}_p{}.png", server.uri(), self.id, page)
    }

    fn to_json(&self, server: &MockServer) -> Value {
        if self.pages <= 1 {
            json!({
                "id": self.id,
                "title": self.title,
                "page_count": 1,
                "meta_single_page": {"original_image_url": self.image_url(server, 0)},
                "meta_pages": []
            })
        } else {
            let pages: Vec<Value> = (0..self.pages)
                .map(|p| json!({"image_urls": {"original": self.image_url(server, p)}}))
                .collect();
            json!({
                "id": self.id,
                "title": self.title,
                "page_count": self.pages,
                "meta_single_page": {},
                "meta_pages": pages
            })
        }
    }
}

/// Mount a ranking day split into pages of 30 (offset 0, 30, 60, ...)
///
/// Every image of every work is mounted too, serving its own path as the body.
pub async fn mount_day(server: &MockServer, date: &str, pages: Vec<Vec<Illust>>) {
    let page_count = pages.len();
    for (index, works) in pages.into_iter().enumerate() {
        let next_url = (index + 1 < page_count).then(|| {
            format!(
                "{}/v1/illust/ranking?mode=day&date={}&filter=for_ios&offset={}",
                server.uri(),
                date,
                (index + 1) * 30
            )
        });
        let body = json!({
            "illusts": works.iter().map(|w| w.to_json(server)).collect::<Vec<_>>(),
            "next_url": next_url
        });

        let mock = Mock::given(method("GET"))
            .and(path("/v1/illust/ranking"))
            .and(query_param("date", date));
        let mock = if index == 0 {
            mock.and(query_param_is_missing("offset"))
        } else {
            mock.and(query_param("offset", (index * 30).to_string()))
        };
        mock.respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;

        for work in &works {
            for page in 0..work.pages.max(1) {
                mount_image(server, work.id, page).await;
            }
        }
    }
}

/// Mount a ranking day that always answers with a server error
pub async fn mount_failing_day(server: &MockServer, date: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/illust/ranking"))
        .and(query_param("date", date))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(server)
        .await;
}

async fn mount_image(server: &MockServer, id: u64, page: u32) {
    let image_path = format!("/img/{id}_p{page}.png");
    Mock::given(method("GET"))
        .and(path(image_path.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(image_path.into_bytes()))
        .mount(server)
        .await;
}

/// Number of image requests the server has seen
pub async fn image_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path().starts_with("/img/"))
        .count()
}

/// Config pointed at the mock server with everything on disk under `temp_dir`
pub fn test_config(server: &MockServer, temp_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.api.access_token = ACCESS_TOKEN.to_string();
    config.api.request_timeout = Duration::from_secs(5);
    config.download.save_root = temp_dir.path().join("download");
    config.download.thread_num = 2;
    config.retry.max_attempts = 2;
    config.retry.initial_delay = Duration::from_millis(10);
    config.snapshot.path = temp_dir.path().join("snapshot");
    config
}

/// Sorted file names in `dir`
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
