//! Vidscribe - turn a video link into a written article
//!
//! This library fetches publisher captions and downloads the audio of a video in
//! parallel, transcribes the audio locally, caches the transcript pair, and asks
//! Gemini to rewrite the merged transcripts as an article.

pub mod article;
pub mod audio;
pub mod cache;
pub mod captions;
pub mod cli;
pub mod config;
pub mod extractors;
pub mod output;
pub mod transcribe;
pub mod utils;

pub use article::{ArticleGenerator, GeminiClient, GenerativeService};
pub use cache::{CacheStore, FileCache, MemoryCache};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use extractors::extract_video_id;
pub use transcribe::{TranscriptPair, TranscriptionPipeline, WorkerPool};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Caller-facing error kinds of the transcription and article pipeline
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ScribeError {
    #[error("Invalid video reference: {0}")]
    InvalidReference(String),

    #[error("Audio download failed: {0}. Ensure FFmpeg and yt-dlp are installed and on PATH")]
    AudioDownloadFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Fetching transcriptions failed: {0}")]
    PipelineFailure(String),

    #[error("Article generation failed: {0}")]
    GenerationFailed(String),
}

impl ScribeError {
    /// True when the failure was caused by caller input rather than the system
    pub fn is_client_error(&self) -> bool {
        matches!(self, ScribeError::InvalidReference(_))
    }

    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            ScribeError::InvalidReference(_) => "invalid_reference",
            ScribeError::AudioDownloadFailed(_) => "audio_download_failed",
            ScribeError::TranscriptionFailed(_) => "transcription_failed",
            ScribeError::PipelineFailure(_) => "pipeline_failure",
            ScribeError::GenerationFailed(_) => "generation_failed",
        }
    }

    /// Wrap an anyhow chain into a single human-readable cause string
    pub(crate) fn cause(err: &anyhow::Error) -> String {
        format!("{:#}", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invalid_reference_is_client_error() {
        assert!(ScribeError::InvalidReference("x".into()).is_client_error());
        assert!(!ScribeError::PipelineFailure("x".into()).is_client_error());
        assert!(!ScribeError::GenerationFailed("x".into()).is_client_error());
    }

    #[test]
    fn kind_is_stable() {
        assert_eq!(ScribeError::InvalidReference("x".into()).kind(), "invalid_reference");
        assert_eq!(ScribeError::GenerationFailed("x".into()).kind(), "generation_failed");
    }

    #[test]
    fn cause_keeps_context_chain() {
        let err = anyhow::anyhow!("exit status 1").context("yt-dlp failed");
        assert_eq!(ScribeError::cause(&err), "yt-dlp failed: exit status 1");
    }
}
