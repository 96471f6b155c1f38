//! HTTP-backed search index and audio provider

use super::{AudioProvider, AudioStream, SearchIndex};
use crate::config::ProviderConfig;
use crate::error::{Error, FetchError, ResolutionError, Result};
use crate::types::{Candidate, ProviderId};
use async_trait::async_trait;
use futures::TryStreamExt;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::io::StreamReader;
use url::Url;

/// Search index reached over HTTP
///
/// Issues `GET <search_url>?q=<query>` and expects a body shaped like
/// `{"tracks": [{"title", "artists": [{"name"}], "album": {"name"}, "videoId"}]}`.
/// Missing or null fields become empty strings.
pub struct HttpSearchIndex {
    client: reqwest::Client,
    search_url: Url,
}

impl HttpSearchIndex {
    /// Build from the provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let search_url = Url::parse(&config.search_url)
            .map_err(|e| Error::config("providers.search_url", e.to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, search_url })
    }

    /// Build with an existing client
    pub fn with_client(client: reqwest::Client, search_url: Url) -> Self {
        Self { client, search_url }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    tracks: Vec<SearchTrack>,
}

#[derive(Debug, Deserialize)]
struct SearchTrack {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    artists: Option<Vec<NamedRef>>,
    #[serde(default)]
    album: Option<NamedRef>,
    #[serde(default, rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    #[serde(default)]
    name: Option<String>,
}

impl From<SearchTrack> for Candidate {
    fn from(track: SearchTrack) -> Self {
        let artist = track
            .artists
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| a.name)
            .collect::<Vec<_>>()
            .join(", ");
        Candidate {
            title: track.title.unwrap_or_default(),
            artist,
            album: track.album.and_then(|a| a.name).unwrap_or_default(),
            provider_id: ProviderId(track.video_id.unwrap_or_default()),
        }
    }
}

#[async_trait]
impl SearchIndex for HttpSearchIndex {
    async fn query(&self, text: &str) -> std::result::Result<Vec<Candidate>, ResolutionError> {
        let response = self
            .client
            .get(self.search_url.clone())
            .query(&[("q", text)])
            .send()
            .await
            .map_err(|e| ResolutionError::Query(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolutionError::Status {
                status: status.as_u16(),
            });
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ResolutionError::Parse(e.to_string()))?;

        Ok(body.tracks.into_iter().map(Candidate::from).collect())
    }

    fn name(&self) -> &'static str {
        "http-search"
    }
}

/// Audio provider reached over HTTP
///
/// Issues `GET <stream_url>/<id>` and streams the body without buffering it in memory.
/// The configured timeout bounds connecting and waiting for response headers only; a long
/// body keeps streaming for as long as the server keeps sending.
pub struct HttpAudioProvider {
    client: reqwest::Client,
    stream_url: String,
    response_timeout: Option<Duration>,
}

impl HttpAudioProvider {
    /// Build from the provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Url::parse(&config.stream_url)
            .map_err(|e| Error::config("providers.stream_url", e.to_string()))?;
        // No total `.timeout`: it would also cut off bodies that take longer to arrive
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()?;
        Ok(Self {
            response_timeout: Some(config.timeout),
            ..Self::with_client(client, &config.stream_url)
        })
    }

    /// Build with an existing client, leaving all timeouts to the client
    pub fn with_client(client: reqwest::Client, stream_url: &str) -> Self {
        Self {
            client,
            stream_url: stream_url.trim_end_matches('/').to_string(),
            response_timeout: None,
        }
    }

    fn stream_url_for(&self, provider_id: &ProviderId) -> String {
        format!(
            "{}/{}",
            self.stream_url,
            urlencoding::encode(provider_id.as_str())
        )
    }
}

#[async_trait]
impl AudioProvider for HttpAudioProvider {
    async fn open_stream(
        &self,
        provider_id: &ProviderId,
    ) -> std::result::Result<AudioStream, FetchError> {
        let url = self.stream_url_for(provider_id);
        let request = self.client.get(&url).send();
        let sent = match self.response_timeout {
            Some(limit) => tokio::time::timeout(limit, request).await.map_err(|_| {
                FetchError::Stream {
                    provider_id: provider_id.to_string(),
                    reason: format!("no response within {}ms", limit.as_millis()),
                }
            })?,
            None => request.await,
        };
        let response = sent.map_err(|e| FetchError::Stream {
            provider_id: provider_id.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Stream {
                provider_id: provider_id.to_string(),
                reason: format!("status {}", status.as_u16()),
            });
        }

        let body = response.bytes_stream().map_err(std::io::Error::other);
        Ok(Box::new(StreamReader::new(Box::pin(body))))
    }

    fn name(&self) -> &'static str {
        "http-stream"
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn search_index(server: &MockServer) -> HttpSearchIndex {
        let url = Url::parse(&format!("{}/search", server.uri())).unwrap();
        HttpSearchIndex::with_client(reqwest::Client::new(), url)
    }

    #[tokio::test]
    async fn search_parses_tracks_and_joins_artists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "'Under Pressure' Queen Hot Space"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "tracks": [
                    {
                        "title": "Under Pressure",
                        "artists": [{"name": "Queen"}, {"name": "David Bowie"}],
                        "album": {"name": "Hot Space"},
                        "videoId": "a01QQZyl-_I"
                    },
                    {
                        "title": "Under Pressure (Remastered)",
                        "artists": [],
                        "album": null,
                        "videoId": "xyz"
                    }
                ]
            })))
            .mount(&server)
            .await;

        let candidates = search_index(&server)
            .query("'Under Pressure' Queen Hot Space")
            .await
            .expect("query should succeed");

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].artist, "Queen, David Bowie");
        assert_eq!(candidates[0].album, "Hot Space");
        assert_eq!(candidates[0].provider_id.as_str(), "a01QQZyl-_I");
        assert_eq!(candidates[1].artist, "");
        assert_eq!(candidates[1].album, "");
    }

    #[tokio::test]
    async fn search_non_success_status_is_resolution_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = search_index(&server).query("anything").await.unwrap_err();
        assert!(matches!(err, ResolutionError::Status { status: 503 }));
    }

    #[tokio::test]
    async fn search_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = search_index(&server).query("anything").await.unwrap_err();
        assert!(matches!(err, ResolutionError::Parse(_)));
    }

    #[tokio::test]
    async fn search_missing_tracks_key_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let candidates = search_index(&server).query("anything").await.unwrap();
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn stream_body_is_readable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stream/abc%20123"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let provider = HttpAudioProvider::with_client(
            reqwest::Client::new(),
            &format!("{}/stream/", server.uri()),
        );
        let mut stream = provider
            .open_stream(&ProviderId::new("abc 123"))
            .await
            .expect("stream should open");

        let mut body = Vec::new();
        stream.read_to_end(&mut body).await.unwrap();
        assert_eq!(body.len(), 4096);
    }

    #[tokio::test]
    async fn stream_not_found_is_stream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let provider =
            HttpAudioProvider::with_client(reqwest::Client::new(), &format!("{}/stream", server.uri()));
        let result = provider.open_stream(&ProviderId::new("missing")).await;

        match result {
            Err(FetchError::Stream { provider_id, reason }) => {
                assert_eq!(provider_id, "missing");
                assert_eq!(reason, "status 404");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    fn provider_config(stream_url: String, timeout: Duration) -> ProviderConfig {
        ProviderConfig {
            stream_url,
            timeout,
            ..ProviderConfig::default()
        }
    }

    #[tokio::test]
    async fn slow_body_is_not_cut_off_by_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed before sending headers");
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 30\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
            // Three chunks spread well past the 200ms timeout
            for _ in 0..3 {
                tokio::time::sleep(Duration::from_millis(150)).await;
                socket.write_all(&[5u8; 10]).await.unwrap();
            }
        });

        let provider = HttpAudioProvider::new(&provider_config(
            format!("http://{addr}/stream"),
            Duration::from_millis(200),
        ))
        .unwrap();
        let mut stream = provider
            .open_stream(&ProviderId::new("long"))
            .await
            .expect("headers arrive immediately");

        let mut body = Vec::new();
        stream.read_to_end(&mut body).await.unwrap();
        assert_eq!(body, vec![5u8; 30]);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn silent_server_hits_response_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let provider = HttpAudioProvider::new(&provider_config(
            format!("{}/stream", server.uri()),
            Duration::from_millis(100),
        ))
        .unwrap();
        let started = std::time::Instant::now();
        let result = provider.open_stream(&ProviderId::new("stuck")).await;

        match result {
            Err(FetchError::Stream { reason, .. }) => {
                assert_eq!(reason, "no response within 100ms");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected a timeout"),
        }
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn invalid_search_url_is_config_error() {
        let config = ProviderConfig {
            search_url: "not a url".into(),
            ..ProviderConfig::default()
        };
        assert!(matches!(
            HttpSearchIndex::new(&config),
            Err(Error::Config { .. })
        ));
    }
}
