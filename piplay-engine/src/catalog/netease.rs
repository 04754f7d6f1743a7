//! NetEase cloud music API client
//!
//! Two endpoints are used:
//! - `POST /api/search/get` (form `s`, `type=1`, `offset`, `limit`) for song search
//! - `GET /api/song/detail?ids=[..]` for full entries with stream URLs

use async_trait::async_trait;
use piplay_common::config::CatalogConfig;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{Catalog, CatalogError, CatalogSearchResult, CatalogSong};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux armv7l) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/60.0 Safari/537.36";
const REFERER: &str = "http://music.163.com/search/";
const COOKIE: &str = "appver=1.5.2";
const SONG_SEARCH_TYPE: &str = "1";
const CODE_OK: i64 = 200;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    code: i64,
    #[serde(default)]
    result: Option<SearchBody>,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    #[serde(default)]
    songs: Option<Vec<CatalogSong>>,
}

#[derive(Debug, Deserialize)]
struct DetailResponse {
    code: i64,
    #[serde(default)]
    songs: Option<Vec<CatalogSong>>,
}

/// Rate limiter enforcing a minimum spacing between requests
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with rate limit
    async fn wait(&self) {
        if self.min_interval.is_zero() {
            return;
        }

        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// NetEase catalog client
pub struct NeteaseClient {
    http_client: reqwest::Client,
    base_url: String,
    search_limit: u32,
    rate_limiter: Arc<RateLimiter>,
}

impl NeteaseClient {
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            search_limit: config.search_limit,
            rate_limiter: Arc::new(RateLimiter::new(config.min_request_interval_ms)),
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, CatalogError> {
        self.rate_limiter.wait().await;

        let response = request
            .header(reqwest::header::REFERER, REFERER)
            .header(reqwest::header::COOKIE, COOKIE)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Unavailable(format!(
                "catalog returned HTTP {}",
                status.as_u16()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))
    }
}

/// `[1,2,3]` for numeric ids, JSON strings otherwise
fn format_id_list(ids: &[String]) -> String {
    let items: Vec<String> = ids
        .iter()
        .map(|id| {
            if !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) {
                id.clone()
            } else {
                serde_json::Value::String(id.clone()).to_string()
            }
        })
        .collect();
    format!("[{}]", items.join(","))
}

fn check_code(code: i64) -> Result<(), CatalogError> {
    if code == CODE_OK {
        Ok(())
    } else {
        Err(CatalogError::Unavailable(format!("catalog returned code {}", code)))
    }
}

#[async_trait]
impl Catalog for NeteaseClient {
    async fn search(&self, query: &str) -> Result<CatalogSearchResult, CatalogError> {
        let url = format!("{}/api/search/get", self.base_url);
        let limit = self.search_limit.to_string();

        tracing::debug!(query = %query, url = %url, "Searching catalog");

        let body = self
            .send(self.http_client.post(&url).form(&[
                ("s", query),
                ("type", SONG_SEARCH_TYPE),
                ("offset", "0"),
                ("limit", limit.as_str()),
            ]))
            .await?;

        let response: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| CatalogError::BadResponse(format!("search: {}", e)))?;
        check_code(response.code)?;

        let songs = response.result.and_then(|r| r.songs).unwrap_or_default();
        let result = CatalogSearchResult::from_songs(songs);

        if result.is_empty() {
            tracing::info!(query = %query, "Catalog search found nothing");
        } else {
            tracing::info!(query = %query, results = result.len(), "Catalog search complete");
        }
        Ok(result)
    }

    async fn fetch_details(&self, ids: &[String]) -> Result<Vec<CatalogSong>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/song/detail", self.base_url);
        let id_list = format_id_list(ids);

        tracing::debug!(ids = %id_list, "Fetching song details");

        let body = self
            .send(self.http_client.get(&url).query(&[("ids", id_list.as_str())]))
            .await?;

        let response: DetailResponse = serde_json::from_str(&body)
            .map_err(|e| CatalogError::BadResponse(format!("song detail: {}", e)))?;
        check_code(response.code)?;

        response
            .songs
            .ok_or_else(|| CatalogError::BadResponse("song detail: missing songs".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_list_format() {
        assert_eq!(
            format_id_list(&["1".to_string(), "22".to_string()]),
            "[1,22]"
        );
        assert_eq!(
            format_id_list(&["a".to_string(), "7".to_string()]),
            r#"["a",7]"#
        );
    }

    #[test]
    fn test_client_creation() {
        let client = NeteaseClient::new(&CatalogConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = CatalogConfig {
            base_url: "http://localhost:1234/".to_string(),
            ..Default::default()
        };
        let client = NeteaseClient::new(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:1234");
    }

    #[tokio::test]
    async fn test_rate_limiter_timing() {
        let limiter = RateLimiter::new(200);

        let start = Instant::now();
        limiter.wait().await;
        let first_elapsed = start.elapsed();
        limiter.wait().await;
        let second_elapsed = start.elapsed();

        assert!(first_elapsed < Duration::from_millis(100));
        assert!(second_elapsed >= Duration::from_millis(180));
    }

    #[tokio::test]
    async fn test_zero_interval_disables_limiting() {
        let limiter = RateLimiter::new(0);

        let start = Instant::now();
        for _ in 0..5 {
            limiter.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
