//! The contract between the analyzer and whatever supplies raw lyrics.

use async_trait::async_trait;

use crate::context::{ContextError, RequestContext};

/// Raw lyrics as handed over by a source, before any parsing.
///
/// Either lyrics field may be empty; a source never uses `None` for "no text".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLyricsRecord {
    pub track_id: i64,
    pub track_name: String,
    pub artist_name: String,
    pub album_name: String,
    /// Track length in whole seconds.
    pub duration: i64,
    pub instrumental: bool,
    pub synced_lyrics: String,
    pub plain_lyrics: String,
}

/// Failures a lyrics source can report.
///
/// The set is closed so retry classification stays exhaustive; see
/// [`SourceError::is_retryable`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("no lyrics found for the given criteria")]
    NotFound,
    #[error("API error (status {status}): {message}")]
    Server { status: u16, message: String },
    #[error("request failed: {0}")]
    Request(String),
    #[error("failed to parse response: {0}")]
    Decode(String),
    #[error(transparent)]
    Context(#[from] ContextError),
}

impl SourceError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Server errors retry only for 5xx statuses. Unknown transport and decode
    /// failures lean towards retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            SourceError::NotFound => false,
            SourceError::Server { status, .. } => *status >= 500,
            SourceError::Context(_) => false,
            SourceError::Request(_) | SourceError::Decode(_) => true,
        }
    }

    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            SourceError::Context(e) => Some(*e),
            _ => None,
        }
    }
}

#[async_trait]
pub trait LyricsSource: Send + Sync {
    async fn get_lyrics(
        &self,
        ctx: &RequestContext,
        track: &str,
        artist: &str,
    ) -> Result<RawLyricsRecord, SourceError>;
}

#[async_trait]
impl<'a, S: LyricsSource + ?Sized> LyricsSource for &'a S {
    async fn get_lyrics(
        &self,
        ctx: &RequestContext,
        track: &str,
        artist: &str,
    ) -> Result<RawLyricsRecord, SourceError> {
        (**self).get_lyrics(ctx, track, artist).await
    }
}

#[async_trait]
impl<S: LyricsSource + ?Sized> LyricsSource for std::sync::Arc<S> {
    async fn get_lyrics(
        &self,
        ctx: &RequestContext,
        track: &str,
        artist: &str,
    ) -> Result<RawLyricsRecord, SourceError> {
        (**self).get_lyrics(ctx, track, artist).await
    }
}
