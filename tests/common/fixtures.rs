//! Fixtures: in-memory catalog, fast configs and wiremock helpers

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use trackdl::config::{ProviderConfig, RetryConfig};
use trackdl::{Catalog, Config, Error, Result, Track, TrackResolver};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Catalog backed by a URL → track map
pub struct MapCatalog {
    tracks: HashMap<String, Track>,
}

impl MapCatalog {
    pub fn new(entries: &[(&str, Track)]) -> Self {
        Self {
            tracks: entries
                .iter()
                .map(|(url, track)| (url.to_string(), track.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl Catalog for MapCatalog {
    async fn track(&self, url: &str) -> Result<Track> {
        self.tracks.get(url).cloned().ok_or_else(|| Error::Catalog {
            url: url.to_string(),
            reason: "unknown track".into(),
        })
    }

    async fn collection(&self, _url: &str) -> Result<Vec<Track>> {
        Ok(self.tracks.values().cloned().collect())
    }
}

/// Default config with short retry delays
pub fn fast_config(workers: usize) -> Config {
    let mut config = Config::default();
    config.download.workers = workers;
    config.fetch.retry = RetryConfig {
        max_attempts: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        jitter: false,
    };
    config
}

/// Provider endpoints pointing at a mock server
pub fn provider_config(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        search_url: format!("{}/search", server.uri()),
        stream_url: format!("{}/stream", server.uri()),
        timeout: Duration::from_secs(5),
    }
}

/// Answer the query for `track` with a single exact result pointing at `id`
pub async fn mount_search_hit(server: &MockServer, track: &Track, id: &str) {
    let body = serde_json::json!({
        "tracks": [{
            "title": track.title,
            "artists": [{ "name": track.artist }],
            "album": { "name": track.album },
            "videoId": id,
        }]
    });
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", TrackResolver::query_for(track)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Answer the query for `track` with results that never pass ranking
pub async fn mount_search_miss(server: &MockServer, track: &Track) {
    let body = serde_json::json!({
        "tracks": [{ "title": null, "artists": [], "album": null, "videoId": "nothing" }]
    });
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", TrackResolver::query_for(track)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Serve `body` for stream `id`
pub async fn mount_stream(server: &MockServer, id: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(format!("/stream/{id}")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}
