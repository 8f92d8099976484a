//! LRC and plain-text lyrics parser
//!
//! Synced lyrics carry one timestamp prefix per line:
//! [mm:ss.xx] Lyrics line here
//!
//! Example:
//! [00:12.34] Hello world
//! [00:15.000] Another line
//!
//! Plain lyrics are one lyric per line with no timing. Both formats are
//! trimmed, blank lines dropped and the survivors numbered from 1.

use regex::Regex;
use serde::Serialize;

use super::LyricsKind;

/// A single retained line of lyrics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredLine {
    /// 1-based, gapless over retained lines
    pub line_number: usize,
    /// Seconds from the start of the track; only set for synced lyrics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    /// Trimmed, never empty
    pub text: String,
    pub word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("{kind} lyrics are empty")]
    EmptyInput { kind: LyricsKind },
    #[error("invalid timestamp {input:?}: {reason}")]
    Timestamp { input: String, reason: &'static str },
}

/// Parses raw lyrics text into [`StructuredLine`]s.
///
/// Holds the compiled timestamp-line pattern so it is built once per parser.
#[derive(Debug, Clone)]
pub struct LyricsParser {
    timestamp_line: Regex,
}

impl Default for LyricsParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LyricsParser {
    pub fn new() -> Self {
        Self {
            // [mm:ss.xx] or [mm:ss.xxx], minutes unbounded
            timestamp_line: Regex::new(r"^\[([0-9]+):([0-9]+\.[0-9]{2,3})\]\s*(.*)$")
                .expect("timestamp line pattern is valid"),
        }
    }

    /// Parse LRC-style synced lyrics.
    ///
    /// Lines without a leading timestamp, with an unconvertible timestamp, or
    /// with no text after it are skipped. Output keeps input order; it is not
    /// sorted by time.
    pub fn parse_synced(&self, text: &str) -> Result<Vec<StructuredLine>, ParseError> {
        if text.is_empty() {
            return Err(ParseError::EmptyInput {
                kind: LyricsKind::Synced,
            });
        }

        let mut lines = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let Some(caps) = self.timestamp_line.captures(line) else {
                continue;
            };

            let stamp = format!("{}:{}", &caps[1], &caps[2]);
            let seconds = match parse_timestamp(&stamp) {
                Ok(seconds) => seconds,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping line with bad timestamp");
                    continue;
                }
            };

            let lyric = caps[3].trim();
            if lyric.is_empty() {
                continue;
            }

            lines.push(StructuredLine {
                line_number: lines.len() + 1,
                timestamp: Some(seconds),
                text: lyric.to_string(),
                word_count: word_count(lyric),
            });
        }

        Ok(lines)
    }

    /// Parse untimed lyrics, one lyric per line.
    pub fn parse_plain(&self, text: &str) -> Result<Vec<StructuredLine>, ParseError> {
        if text.is_empty() {
            return Err(ParseError::EmptyInput {
                kind: LyricsKind::Plain,
            });
        }

        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(i, line)| StructuredLine {
                line_number: i + 1,
                timestamp: None,
                text: line.to_string(),
                word_count: word_count(line),
            })
            .collect())
    }

    pub fn parse(&self, kind: LyricsKind, text: &str) -> Result<Vec<StructuredLine>, ParseError> {
        match kind {
            LyricsKind::Synced => self.parse_synced(text),
            LyricsKind::Plain => self.parse_plain(text),
        }
    }
}

/// Convert `"minutes:seconds[.fraction]"` to seconds.
///
/// Minutes are an unbounded non-negative integer; seconds a non-negative
/// decimal. Signs, exponents and `inf`/`nan` spellings are rejected.
pub fn parse_timestamp(s: &str) -> Result<f64, ParseError> {
    let invalid = |reason| ParseError::Timestamp {
        input: s.to_string(),
        reason,
    };

    let mut parts = s.split(':');
    let (Some(minutes), Some(seconds), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid("expected exactly one ':'"));
    };

    if minutes.is_empty() || !minutes.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid("minutes are not a non-negative integer"));
    }
    let minutes: u64 = minutes
        .parse()
        .map_err(|_| invalid("minutes are out of range"))?;

    if !is_plain_decimal(seconds) {
        return Err(invalid("seconds are not a non-negative decimal"));
    }
    let seconds: f64 = seconds
        .parse()
        .map_err(|_| invalid("seconds are not a non-negative decimal"))?;

    Ok(minutes as f64 * 60.0 + seconds)
}

/// `123`, `12.5` or `.5`, but not `12.`, `+1`, `1e3` or an empty string.
fn is_plain_decimal(s: &str) -> bool {
    let (int, frac) = match s.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (s, None),
    };
    let digits = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    match frac {
        Some(frac) => !frac.is_empty() && digits(frac) && digits(int),
        None => !int.is_empty() && digits(int),
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
