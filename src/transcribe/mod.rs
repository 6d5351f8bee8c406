use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audio::AudioArtifact;
use crate::ScribeError;

pub mod backends;
pub mod pipeline;
pub mod pool;

pub use backends::{load_speech_model, WhisperCli};
pub use pipeline::TranscriptionPipeline;
pub use pool::WorkerPool;

/// Captions and speech-to-text output for one video.
///
/// Either side may be empty; a pair with both sides empty is never returned or cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptPair {
    /// Publisher or auto-generated captions
    pub captions_text: String,

    /// Local speech-to-text transcript
    pub whisper_text: String,
}

impl TranscriptPair {
    pub fn is_empty(&self) -> bool {
        self.captions_text.is_empty() && self.whisper_text.is_empty()
    }
}

/// A speech-to-text model. Inference blocks the calling thread.
///
/// Implementations are loaded once and shared for the life of the process;
/// `transcribe_file` may be called from several workers at once.
#[cfg_attr(test, mockall::automock)]
pub trait SpeechModel: Send + Sync {
    /// Raw transcript of the audio file at `audio`
    fn transcribe_file(&self, audio: &Path) -> anyhow::Result<String>;

    /// Short description for logs
    fn name(&self) -> String;
}

/// Runs the shared speech model over downloaded audio
#[derive(Clone)]
pub struct SpeechTranscriber {
    model: Arc<dyn SpeechModel>,
}

impl SpeechTranscriber {
    pub fn new(model: Arc<dyn SpeechModel>) -> Self {
        Self { model }
    }

    /// Transcript of `artifact`, trimmed of surrounding whitespace
    pub fn transcribe(&self, artifact: &AudioArtifact) -> Result<String, ScribeError> {
        tracing::info!(
            "Transcribing {} with {}",
            artifact.path().display(),
            self.model.name()
        );

        self.model
            .transcribe_file(artifact.path())
            .map(|text| text.trim().to_string())
            .map_err(|e| ScribeError::TranscriptionFailed(ScribeError::cause(&e)))
    }
}
