//! Response model for a song analysis, serialized as camelCase JSON.

use std::collections::HashSet;

use serde::Serialize;

use crate::lyrics::{ChorusResult, LyricsKind, RawLyricsRecord, StructuredLine};

pub const SOURCE_LRCLIB: &str = "lrclib";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub id: i64,
    pub name: String,
    pub artist: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub album: String,
    /// Whole seconds
    pub duration: i64,
    pub instrumental: bool,
}

impl From<&RawLyricsRecord> for TrackInfo {
    fn from(r: &RawLyricsRecord) -> Self {
        Self {
            id: r.track_id,
            name: r.track_name.clone(),
            artist: r.artist_name.clone(),
            album: r.album_name.clone(),
            duration: r.duration,
            instrumental: r.instrumental,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsPayload {
    #[serde(rename = "type")]
    pub kind: LyricsKind,
    pub has_timestamps: bool,
    pub total_lines: usize,
    pub lines: Vec<StructuredLine>,
}

impl LyricsPayload {
    pub fn new(kind: LyricsKind, lines: Vec<StructuredLine>) -> Self {
        Self {
            kind,
            has_timestamps: kind == LyricsKind::Synced,
            total_lines: lines.len(),
            lines,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Structure {
    pub chorus: ChorusResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_lines: usize,
    pub unique_lines: usize,
    pub total_words: usize,
    /// Case-insensitive
    pub unique_words: usize,
    pub average_words_per_line: f64,
    /// Share of lines that repeat an earlier line, in `[0, 1)`.
    pub repetition_ratio: f64,
}

impl Statistics {
    pub fn from_lines(lines: &[StructuredLine]) -> Self {
        let total_lines = lines.len();
        let unique_lines = lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<HashSet<_>>()
            .len();
        let total_words = lines.iter().map(|l| l.word_count).sum();
        let unique_words = lines
            .iter()
            .flat_map(|l| l.text.split_whitespace())
            .map(str::to_lowercase)
            .collect::<HashSet<_>>()
            .len();

        let (average_words_per_line, repetition_ratio) = if total_lines == 0 {
            (0.0, 0.0)
        } else {
            (
                total_words as f64 / total_lines as f64,
                1.0 - unique_lines as f64 / total_lines as f64,
            )
        };

        Self {
            total_lines,
            unique_lines,
            total_words,
            unique_words,
            average_words_per_line,
            repetition_ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub source: String,
    pub cached: bool,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub track: TrackInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<LyricsPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structure: Option<Structure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Statistics>,
    pub metadata: Metadata,
}
