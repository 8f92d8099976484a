//! Lyrics module: fetching, parsing and chorus detection
//!
//! This module provides:
//! - The `LyricsSource` contract and an LRCLIB implementation
//! - A retry decorator with exponential backoff and full jitter
//! - Synced (LRC) and plain lyrics parsers
//! - Chorus detection over parsed lines

pub mod chorus;
pub mod lrclib;
pub mod parser;
pub mod retry;
pub mod source;

use std::fmt;

use serde::Serialize;

pub use chorus::{ChorusDetector, ChorusResult};
pub use lrclib::LrclibClient;
pub use parser::{LyricsParser, ParseError, StructuredLine};
pub use retry::{RetryPolicy, RetryingSource};
pub use source::{LyricsSource, RawLyricsRecord, SourceError};

/// Which raw encoding a lyrics text is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LyricsKind {
    Synced,
    Plain,
}

impl LyricsKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LyricsKind::Synced => "synced",
            LyricsKind::Plain => "plain",
        }
    }
}

impl fmt::Display for LyricsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the text to analyze: synced if present, else plain, else nothing.
pub fn choose_text(record: &RawLyricsRecord) -> Option<(LyricsKind, &str)> {
    if !record.synced_lyrics.is_empty() {
        return Some((LyricsKind::Synced, &record.synced_lyrics));
    }
    if !record.plain_lyrics.is_empty() {
        return Some((LyricsKind::Plain, &record.plain_lyrics));
    }
    None
}
