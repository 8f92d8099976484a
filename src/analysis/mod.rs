//! Song analysis: fetch lyrics, parse them, detect the chorus.

pub mod model;

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::context::{ContextError, RequestContext};
use crate::lyrics::{
    ChorusDetector, ChorusResult, LyricsParser, LyricsSource, ParseError, SourceError, choose_text,
};
use model::{
    AnalysisResult, LyricsPayload, Metadata, SOURCE_LRCLIB, Statistics, Structure, TrackInfo,
};

pub const INSTRUMENTAL_MESSAGE: &str = "Instrumental track - no lyrics available";
pub const NO_LYRICS_MESSAGE: &str = "No lyrics available for this track";

#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("fetch failed: {0}")]
    Fetch(#[source] SourceError),
    #[error("parse failed: {0}")]
    Parse(#[source] ParseError),
}

impl AnalyzeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AnalyzeError::Fetch(SourceError::NotFound))
    }

    pub fn context_error(&self) -> Option<ContextError> {
        match self {
            AnalyzeError::Fetch(e) => e.context_error(),
            AnalyzeError::Parse(_) => None,
        }
    }

    /// HTTP status reported by the upstream provider, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            AnalyzeError::Fetch(SourceError::Server { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

/// Runs fetch → parse → chorus detection for one song.
///
/// Holds no per-request state, so one instance can serve concurrent requests.
pub struct Analyzer {
    source: Box<dyn LyricsSource>,
    parser: LyricsParser,
    chorus: Option<ChorusDetector>,
}

impl Analyzer {
    /// Without a chorus detector every result reports `detected: false`.
    pub fn new(
        source: Box<dyn LyricsSource>,
        parser: LyricsParser,
        chorus: Option<ChorusDetector>,
    ) -> Self {
        Self {
            source,
            parser,
            chorus,
        }
    }

    pub async fn analyze(
        &self,
        ctx: &RequestContext,
        track: &str,
        artist: &str,
    ) -> Result<AnalysisResult, AnalyzeError> {
        let started = Instant::now();
        if let Some(reason) = ctx.err() {
            return Err(AnalyzeError::Fetch(SourceError::Context(reason)));
        }

        let record = self
            .source
            .get_lyrics(ctx, track, artist)
            .await
            .map_err(AnalyzeError::Fetch)?;
        let track_info = TrackInfo::from(&record);

        if record.instrumental {
            info!(track, artist, "instrumental track, skipping lyrics analysis");
            return Ok(short_circuit(track_info, INSTRUMENTAL_MESSAGE, started.elapsed()));
        }

        let Some((kind, text)) = choose_text(&record) else {
            info!(track, artist, "provider returned no lyrics text");
            return Ok(short_circuit(track_info, NO_LYRICS_MESSAGE, started.elapsed()));
        };

        let lines = self.parser.parse(kind, text).map_err(AnalyzeError::Parse)?;
        if lines.is_empty() {
            info!(track, artist, %kind, "lyrics text has no usable lines");
            return Ok(short_circuit(track_info, NO_LYRICS_MESSAGE, started.elapsed()));
        }

        let chorus = match &self.chorus {
            Some(detector) => detector.detect(&lines),
            None => ChorusResult::not_detected(),
        };
        debug!(
            %kind,
            lines = lines.len(),
            chorus = chorus.detected,
            occurrences = chorus.occurrences,
            "lyrics analyzed"
        );

        let statistics = Statistics::from_lines(&lines);
        Ok(AnalysisResult {
            track: track_info,
            lyrics: Some(LyricsPayload::new(kind, lines)),
            structure: Some(Structure { chorus }),
            statistics: Some(statistics),
            metadata: metadata(started.elapsed(), None),
        })
    }
}

fn short_circuit(track: TrackInfo, message: &str, elapsed: Duration) -> AnalysisResult {
    AnalysisResult {
        track,
        lyrics: None,
        structure: None,
        statistics: None,
        metadata: metadata(elapsed, Some(message)),
    }
}

fn metadata(elapsed: Duration, message: Option<&str>) -> Metadata {
    Metadata {
        source: SOURCE_LRCLIB.to_string(),
        cached: false,
        processing_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        message: message.map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lyrics::{LyricsKind, RawLyricsRecord, RetryPolicy, RetryingSource};
    use async_trait::async_trait;
    use std::error::Error as _;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource {
        result: Result<RawLyricsRecord, SourceError>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn ok(record: RawLyricsRecord) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(record),
                calls: AtomicUsize::new(0),
            })
        }

        fn err(err: SourceError) -> Arc<Self> {
            Arc::new(Self {
                result: Err(err),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LyricsSource for StaticSource {
        async fn get_lyrics(
            &self,
            _ctx: &RequestContext,
            track: &str,
            artist: &str,
        ) -> Result<RawLyricsRecord, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map(|mut r| {
                r.track_name = track.to_string();
                r.artist_name = artist.to_string();
                r
            })
        }
    }

    fn record() -> RawLyricsRecord {
        RawLyricsRecord {
            track_id: 42,
            album_name: "TestAlbum".to_string(),
            duration: 180,
            ..Default::default()
        }
    }

    fn analyzer(source: Arc<StaticSource>) -> Analyzer {
        Analyzer::new(
            Box::new(source),
            LyricsParser::new(),
            Some(ChorusDetector::new()),
        )
    }

    #[tokio::test]
    async fn test_plain_lyrics_with_chorus() {
        let source = StaticSource::ok(RawLyricsRecord {
            plain_lyrics: "Hello world\nThis is a test\nHello world".to_string(),
            ..record()
        });
        let result = analyzer(source)
            .analyze(&RequestContext::new(), "MyTrack", "MyArtist")
            .await
            .unwrap();

        assert_eq!(result.track.id, 42);
        assert_eq!(result.track.name, "MyTrack");
        assert_eq!(result.track.artist, "MyArtist");

        let lyrics = result.lyrics.unwrap();
        assert_eq!(lyrics.kind, LyricsKind::Plain);
        assert!(!lyrics.has_timestamps);
        assert_eq!(lyrics.total_lines, 3);

        let chorus = result.structure.unwrap().chorus;
        assert!(chorus.detected);
        assert_eq!(chorus.text, "Hello world");
        assert_eq!(chorus.line_numbers, vec![1, 3]);

        assert_eq!(result.statistics.unwrap().unique_lines, 2);
        assert_eq!(result.metadata.source, "lrclib");
        assert!(!result.metadata.cached);
        assert!(result.metadata.message.is_none());
    }

    #[tokio::test]
    async fn test_prefers_synced_lyrics() {
        let source = StaticSource::ok(RawLyricsRecord {
            synced_lyrics: "[00:01.00] One\n[00:02.50] Two".to_string(),
            plain_lyrics: "One\nTwo\nThree".to_string(),
            ..record()
        });
        let result = analyzer(source)
            .analyze(&RequestContext::new(), "t", "a")
            .await
            .unwrap();

        let lyrics = result.lyrics.unwrap();
        assert_eq!(lyrics.kind, LyricsKind::Synced);
        assert!(lyrics.has_timestamps);
        assert_eq!(lyrics.total_lines, 2);
        assert_eq!(lyrics.lines[1].timestamp, Some(2.5));
    }

    #[tokio::test]
    async fn test_instrumental_short_circuits() {
        let source = StaticSource::ok(RawLyricsRecord {
            instrumental: true,
            synced_lyrics: "[00:00.00] Should not show".to_string(),
            ..record()
        });
        let result = analyzer(source)
            .analyze(&RequestContext::new(), "t", "a")
            .await
            .unwrap();

        assert!(result.track.instrumental);
        assert!(result.lyrics.is_none());
        assert!(result.structure.is_none());
        assert!(result.statistics.is_none());
        assert_eq!(result.metadata.message.as_deref(), Some(INSTRUMENTAL_MESSAGE));
    }

    #[tokio::test]
    async fn test_no_lyrics_short_circuits() {
        let result = analyzer(StaticSource::ok(record()))
            .analyze(&RequestContext::new(), "t", "a")
            .await
            .unwrap();

        assert!(result.lyrics.is_none());
        assert!(result.structure.is_none());
        assert_eq!(result.metadata.message.as_deref(), Some(NO_LYRICS_MESSAGE));
    }

    #[tokio::test]
    async fn test_tag_only_synced_lyrics_short_circuit() {
        let source = StaticSource::ok(RawLyricsRecord {
            synced_lyrics: "[ti:Song]\n[ar:Artist]".to_string(),
            plain_lyrics: "Hook\nVerse\nHook".to_string(),
            ..record()
        });
        let result = analyzer(source)
            .analyze(&RequestContext::new(), "t", "a")
            .await
            .unwrap();

        assert!(result.lyrics.is_none());
        assert!(result.structure.is_none());
        assert!(result.statistics.is_none());
        assert_eq!(result.metadata.message.as_deref(), Some(NO_LYRICS_MESSAGE));
    }

    #[tokio::test]
    async fn test_empty_timed_lines_short_circuit() {
        let source = StaticSource::ok(RawLyricsRecord {
            synced_lyrics: "[00:01.00]\n[00:02.00]   ".to_string(),
            ..record()
        });
        let result = analyzer(source)
            .analyze(&RequestContext::new(), "t", "a")
            .await
            .unwrap();

        assert!(result.lyrics.is_none());
        assert_eq!(result.metadata.message.as_deref(), Some(NO_LYRICS_MESSAGE));
    }

    #[tokio::test]
    async fn test_cancelled_context_skips_fetch() {
        let source = StaticSource::ok(RawLyricsRecord {
            plain_lyrics: "Hook".to_string(),
            ..record()
        });
        let ctx = RequestContext::new();
        ctx.cancel();

        let err = analyzer(source.clone())
            .analyze(&ctx, "t", "a")
            .await
            .unwrap_err();
        assert_eq!(err.context_error(), Some(ContextError::Cancelled));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_error_is_wrapped() {
        let err = analyzer(StaticSource::err(SourceError::NotFound))
            .analyze(&RequestContext::new(), "t", "a")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().starts_with("fetch failed: "));
        assert!(err.source().is_some());
    }

    #[tokio::test]
    async fn test_missing_detector_degrades_to_not_detected() {
        let source = StaticSource::ok(RawLyricsRecord {
            plain_lyrics: "Hook\nHook".to_string(),
            ..record()
        });
        let analyzer = Analyzer::new(Box::new(source), LyricsParser::new(), None);
        let result = analyzer
            .analyze(&RequestContext::new(), "t", "a")
            .await
            .unwrap();

        assert_eq!(result.structure.unwrap().chorus, ChorusResult::not_detected());
        assert_eq!(result.lyrics.unwrap().total_lines, 2);
    }

    #[tokio::test]
    async fn test_repeated_analysis_is_identical() {
        let source = StaticSource::ok(RawLyricsRecord {
            synced_lyrics: "[00:01.00] Hook\n[00:02.00] Verse\n[00:03.00] Hook".to_string(),
            ..record()
        });
        let analyzer = analyzer(source.clone());
        let ctx = RequestContext::new();

        let mut first = analyzer.analyze(&ctx, "t", "a").await.unwrap();
        let mut second = analyzer.analyze(&ctx, "t", "a").await.unwrap();
        first.metadata.processing_time_ms = 0;
        second.metadata.processing_time_ms = 0;

        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_surfaces_as_fetch_error() {
        let source = StaticSource::err(SourceError::Server {
            status: 503,
            message: "LRCLIB service unavailable".to_string(),
        });
        let retrying = RetryingSource::new(
            source.clone(),
            RetryPolicy {
                max_retries: 2,
                initial_backoff: Duration::from_millis(10),
                max_backoff: Duration::from_millis(50),
                multiplier: 2.0,
            },
        );
        let analyzer = Analyzer::new(
            Box::new(retrying),
            LyricsParser::new(),
            Some(ChorusDetector::new()),
        );

        let err = analyzer
            .analyze(&RequestContext::new(), "t", "a")
            .await
            .unwrap_err();
        assert_eq!(err.upstream_status(), Some(503));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_fetch_keeps_context_error() {
        let source = StaticSource::err(SourceError::Context(ContextError::DeadlineExceeded));
        let err = analyzer(source)
            .analyze(&RequestContext::new(), "t", "a")
            .await
            .unwrap_err();

        assert_eq!(err.context_error(), Some(ContextError::DeadlineExceeded));
        assert_eq!(err.to_string(), "fetch failed: context deadline exceeded");
    }

    #[test]
    fn test_parse_error_display() {
        let err = AnalyzeError::Parse(ParseError::EmptyInput {
            kind: LyricsKind::Plain,
        });
        assert_eq!(err.to_string(), "parse failed: plain lyrics are empty");
        assert!(err.context_error().is_none());
    }
}
