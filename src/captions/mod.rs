use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::extractors::VideoId;

pub mod ytdlp;

pub use ytdlp::YtDlpCaptionSource;

/// One timed caption fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionSnippet {
    pub text: String,

    /// Start offset in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

/// A caption track offered for a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionTrack {
    /// Language code as published (e.g. "en", "pt-BR")
    pub language: String,

    /// Download URL of the track
    pub url: String,

    /// True for auto-generated (speech recognition) tracks
    pub is_generated: bool,
}

/// All caption tracks available for a video
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackCatalog {
    pub tracks: Vec<CaptionTrack>,
}

impl TrackCatalog {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// First publisher-provided track matching one of `languages`, in preference order
    pub fn find_manual_transcript(&self, languages: &[String]) -> Option<&CaptionTrack> {
        self.find(languages, false)
    }

    /// First auto-generated track matching one of `languages`, in preference order
    pub fn find_generated_transcript(&self, languages: &[String]) -> Option<&CaptionTrack> {
        self.find(languages, true)
    }

    fn find(&self, languages: &[String], generated: bool) -> Option<&CaptionTrack> {
        languages.iter().find_map(|lang| {
            self.tracks
                .iter()
                .find(|t| t.is_generated == generated && &t.language == lang)
        })
    }
}

/// Distinguishable failure conditions of a caption source
#[derive(thiserror::Error, Debug)]
pub enum CaptionSourceError {
    #[error("No transcript found for languages {0:?}")]
    NoTranscriptFound(Vec<String>),

    #[error("Transcripts are disabled for this video")]
    TranscriptsDisabled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// External caption-retrieval service. Calls block.
#[cfg_attr(test, mockall::automock)]
pub trait CaptionSource: Send + Sync {
    /// Publisher captions in the first available of `languages`
    fn get_transcript(
        &self,
        video: &VideoId,
        languages: &[String],
    ) -> Result<Vec<CaptionSnippet>, CaptionSourceError>;

    /// Catalog of every track (publisher and auto-generated)
    fn list_transcripts(&self, video: &VideoId) -> Result<TrackCatalog, CaptionSourceError>;

    /// Download a single track from a catalog
    fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<CaptionSnippet>, CaptionSourceError>;
}

/// Retrieves captions for a video, degrading to an empty string when none exist
#[derive(Clone)]
pub struct CaptionFetcher {
    source: Arc<dyn CaptionSource>,
}

impl CaptionFetcher {
    pub fn new(source: Arc<dyn CaptionSource>) -> Self {
        Self { source }
    }

    /// Captions text for `video` in `language`, or `""` when unavailable.
    ///
    /// Tries publisher captions first, then an auto-generated track in the same
    /// language. Never fails: every source error resolves to an empty string.
    pub fn fetch_captions(&self, video: &VideoId, language: &str) -> String {
        let languages = vec![language.to_string()];

        match self.source.get_transcript(video, &languages) {
            Ok(snippets) => join_snippets(&snippets),
            Err(CaptionSourceError::NoTranscriptFound(_)) => {
                tracing::info!(
                    "No '{}' transcript found for {}, trying auto-generated",
                    language,
                    video
                );
                self.fetch_generated(video, &languages)
            }
            Err(CaptionSourceError::TranscriptsDisabled) => {
                tracing::info!("Captions disabled for {}", video);
                String::new()
            }
            Err(CaptionSourceError::Other(e)) => {
                tracing::warn!("Unexpected caption error for {}: {:#}", video, e);
                String::new()
            }
        }
    }

    fn fetch_generated(&self, video: &VideoId, languages: &[String]) -> String {
        let catalog = match self.source.list_transcripts(video) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!("Auto-generated transcript lookup failed for {}: {}", video, e);
                return String::new();
            }
        };

        let Some(track) = catalog.find_generated_transcript(languages) else {
            tracing::info!("No auto-generated {:?} transcript for {}", languages, video);
            return String::new();
        };

        match self.source.fetch_track(track) {
            Ok(snippets) => join_snippets(&snippets),
            Err(e) => {
                tracing::warn!("Auto-generated transcript failed for {}: {}", video, e);
                String::new()
            }
        }
    }
}

/// Join caption fragments with single spaces
pub fn join_snippets(snippets: &[CaptionSnippet]) -> String {
    snippets
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::extract_video_id;

    fn video() -> VideoId {
        extract_video_id("https://youtu.be/abc123").unwrap()
    }

    fn snippet(text: &str) -> CaptionSnippet {
        CaptionSnippet {
            text: text.to_string(),
            start: 0.0,
            duration: 1.0,
        }
    }

    fn generated_track(lang: &str) -> CaptionTrack {
        CaptionTrack {
            language: lang.to_string(),
            url: format!("https://captions.test/{}", lang),
            is_generated: true,
        }
    }

    #[test]
    fn test_manual_captions_are_joined() {
        let mut source = MockCaptionSource::new();
        source
            .expect_get_transcript()
            .withf(|_, langs| langs.len() == 1 && langs[0] == "en")
            .returning(|_, _| Ok(vec![snippet(" hello"), snippet("world ")]));
        source.expect_list_transcripts().times(0);

        let fetcher = CaptionFetcher::new(Arc::new(source));
        assert_eq!(fetcher.fetch_captions(&video(), "en"), "hello world");
    }

    #[test]
    fn test_falls_back_to_generated_track() {
        let mut source = MockCaptionSource::new();
        source
            .expect_get_transcript()
            .returning(|_, langs| Err(CaptionSourceError::NoTranscriptFound(langs.to_vec())));
        source.expect_list_transcripts().times(1).returning(|_| {
            Ok(TrackCatalog {
                tracks: vec![generated_track("de"), generated_track("en")],
            })
        });
        source
            .expect_fetch_track()
            .withf(|track| track.language == "en")
            .returning(|_| Ok(vec![snippet("auto"), snippet("captions")]));

        let fetcher = CaptionFetcher::new(Arc::new(source));
        assert_eq!(fetcher.fetch_captions(&video(), "en"), "auto captions");
    }

    #[test]
    fn test_no_generated_track_is_empty() {
        let mut source = MockCaptionSource::new();
        source
            .expect_get_transcript()
            .returning(|_, langs| Err(CaptionSourceError::NoTranscriptFound(langs.to_vec())));
        source.expect_list_transcripts().returning(|_| {
            Ok(TrackCatalog {
                tracks: vec![generated_track("fr")],
            })
        });
        source.expect_fetch_track().times(0);

        let fetcher = CaptionFetcher::new(Arc::new(source));
        assert_eq!(fetcher.fetch_captions(&video(), "en"), "");
    }

    #[test]
    fn test_disabled_and_unexpected_errors_are_empty() {
        let mut disabled = MockCaptionSource::new();
        disabled
            .expect_get_transcript()
            .returning(|_, _| Err(CaptionSourceError::TranscriptsDisabled));
        disabled.expect_list_transcripts().times(0);
        assert_eq!(CaptionFetcher::new(Arc::new(disabled)).fetch_captions(&video(), "en"), "");

        let mut broken = MockCaptionSource::new();
        broken
            .expect_get_transcript()
            .returning(|_, _| Err(anyhow::anyhow!("connection reset").into()));
        broken.expect_list_transcripts().times(0);
        assert_eq!(CaptionFetcher::new(Arc::new(broken)).fetch_captions(&video(), "en"), "");
    }

    #[test]
    fn test_catalog_lookup_respects_kind() {
        let catalog = TrackCatalog {
            tracks: vec![
                CaptionTrack {
                    language: "en".into(),
                    url: "manual".into(),
                    is_generated: false,
                },
                generated_track("en"),
            ],
        };
        let langs = vec!["en".to_string()];
        assert_eq!(catalog.find_manual_transcript(&langs).unwrap().url, "manual");
        assert!(catalog.find_generated_transcript(&langs).unwrap().is_generated);
        assert!(catalog.find_generated_transcript(&["es".to_string()]).is_none());
    }
}
