//! LRCLIB API client
//!
//! LRCLIB is a free lyrics API that provides synchronized (LRC format) lyrics.
//! API Documentation: https://lrclib.net/docs

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::source::{LyricsSource, RawLyricsRecord, SourceError};
use crate::context::RequestContext;

/// LRCLIB search result
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct LrclibResponse {
    id: i64,
    #[serde(default)]
    track_name: Option<String>,
    #[serde(default)]
    artist_name: Option<String>,
    #[serde(default)]
    album_name: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    instrumental: bool,
    #[serde(default)]
    plain_lyrics: Option<String>,
    #[serde(default)]
    synced_lyrics: Option<String>,
}

impl From<LrclibResponse> for RawLyricsRecord {
    fn from(r: LrclibResponse) -> Self {
        Self {
            track_id: r.id,
            track_name: r.track_name.unwrap_or_default(),
            artist_name: r.artist_name.unwrap_or_default(),
            album_name: r.album_name.unwrap_or_default(),
            duration: r.duration.map(|d| d as i64).unwrap_or_default(),
            instrumental: r.instrumental,
            synced_lyrics: r.synced_lyrics.unwrap_or_default(),
            plain_lyrics: r.plain_lyrics.unwrap_or_default(),
        }
    }
}

/// LRCLIB API client
#[derive(Debug, Clone)]
pub struct LrclibClient {
    client: reqwest::Client,
    base_url: String,
}

impl LrclibClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://lrclib.net";
    const USER_AGENT: &'static str = concat!("lyrics-analyzer/", env!("CARGO_PKG_VERSION"));

    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(Self::USER_AGENT)
            .timeout(timeout)
            .build()
            .context("build reqwest client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn search(&self, track_name: &str, artist_name: &str) -> Result<RawLyricsRecord, SourceError> {
        let url = format!(
            "{}/api/search?track_name={}&artist_name={}",
            self.base_url,
            urlencoding::encode(track_name),
            urlencoding::encode(artist_name)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(match status {
                reqwest::StatusCode::NOT_FOUND => SourceError::NotFound,
                reqwest::StatusCode::INTERNAL_SERVER_ERROR => SourceError::Server {
                    status: status.as_u16(),
                    message: "LRCLIB server error".to_string(),
                },
                reqwest::StatusCode::SERVICE_UNAVAILABLE => SourceError::Server {
                    status: status.as_u16(),
                    message: "LRCLIB service unavailable".to_string(),
                },
                _ => SourceError::Server {
                    status: status.as_u16(),
                    message: format!("unexpected status code: {}", status.as_u16()),
                },
            });
        }

        let results: Vec<LrclibResponse> = response
            .json()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        select_best(results)
            .map(RawLyricsRecord::from)
            .ok_or(SourceError::NotFound)
    }
}

/// The first result that has synced lyrics, or else the first result.
fn select_best(results: Vec<LrclibResponse>) -> Option<LrclibResponse> {
    let synced = results
        .iter()
        .position(|r| r.synced_lyrics.as_deref().is_some_and(|s| !s.is_empty()));
    results.into_iter().nth(synced.unwrap_or(0))
}

#[async_trait]
impl LyricsSource for LrclibClient {
    async fn get_lyrics(
        &self,
        ctx: &RequestContext,
        track: &str,
        artist: &str,
    ) -> Result<RawLyricsRecord, SourceError> {
        tokio::select! {
            biased;
            reason = ctx.done() => Err(SourceError::Context(reason)),
            result = self.search(track, artist) => result,
        }
    }
}
