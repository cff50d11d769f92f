use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::common::errors::LookupError;
use crate::common::types::TrackId;
use crate::config::SoundCloudConfig;
use crate::protocol::tracks::Track;

use super::TrackSource;

const BASE_URL: &str = "https://api.soundcloud.com";

/// SoundCloud track lookup over the public REST API.
pub struct SoundCloudSource {
    client: reqwest::Client,
    client_id: String,
    base_url: String,
    search_limit: usize,
}

impl SoundCloudSource {
    pub fn new(config: &SoundCloudConfig) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "User-Agent",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36"
                .parse()
                .unwrap(),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            client_id: config.client_id.clone(),
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| BASE_URL.to_string()),
            search_limit: config.search_limit,
        }
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/tracks?q={}&limit={}&client_id={}",
            self.base_url,
            urlencoding::encode(query),
            self.search_limit,
            self.client_id
        )
    }

    fn track_url(&self, id: TrackId) -> String {
        format!("{}/tracks/{}?client_id={}", self.base_url, id, self.client_id)
    }

    /// GET a URL and return the decoded body. A 404 yields `Value::Null`
    /// (the API's shape for an unknown id); any other non-success status
    /// is an error.
    async fn fetch_json(&self, url: &str) -> Result<Value, LookupError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();

        if status.as_u16() == 404 {
            return Ok(Value::Null);
        }
        if !status.is_success() {
            warn!("SoundCloud: request failed with status {}", status);
            return Err(LookupError::Status(status.as_u16()));
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Collect the track records out of a search response body.
///
/// The API returns a bare JSON array; items that do not decode as tracks
/// are skipped. An `{"errors": [...]}` body means no matches.
fn parse_search_results(json: &Value, limit: usize) -> Vec<Track> {
    if json.get("errors").is_some() {
        return Vec::new();
    }

    json.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<Track>(item.clone()).ok())
                .take(limit)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl TrackSource for SoundCloudSource {
    fn name(&self) -> &str {
        "soundcloud"
    }

    async fn search(&self, query: &str) -> Result<Vec<Track>, LookupError> {
        debug!("SoundCloud: searching for {:?}", query);

        let json = self.fetch_json(&self.search_url(query)).await?;
        let tracks = parse_search_results(&json, self.search_limit);

        debug!("SoundCloud: {} result(s) for {:?}", tracks.len(), query);
        Ok(tracks)
    }

    async fn track(&self, id: TrackId) -> Result<Option<Track>, LookupError> {
        debug!("SoundCloud: resolving track {}", id);

        let json = self.fetch_json(&self.track_url(id)).await?;
        if json.is_null() || json.get("errors").is_some() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_value(json)?))
    }
}
