use std::sync::Arc;

use crate::config::{SpeechBackend, SpeechConfig};

use super::SpeechModel;

pub mod cli;
#[cfg(feature = "whisper")]
pub mod in_process;

pub use cli::WhisperCli;
#[cfg(feature = "whisper")]
pub use in_process::WhisperRsModel;

/// Load the configured speech model. Call once at startup and share the result.
pub fn load_speech_model(config: &SpeechConfig) -> anyhow::Result<Arc<dyn SpeechModel>> {
    match config.backend {
        SpeechBackend::WhisperCli => Ok(Arc::new(WhisperCli::new(&config.model))),
        SpeechBackend::WhisperRs => load_in_process(config),
    }
}

#[cfg(feature = "whisper")]
fn load_in_process(config: &SpeechConfig) -> anyhow::Result<Arc<dyn SpeechModel>> {
    let path = config
        .model_path
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("speech.model_path is required for the whisper-rs backend"))?;
    Ok(Arc::new(WhisperRsModel::load(path)?))
}

#[cfg(not(feature = "whisper"))]
fn load_in_process(_config: &SpeechConfig) -> anyhow::Result<Arc<dyn SpeechModel>> {
    anyhow::bail!("whisper-rs backend requested but vidscribe was built without the `whisper` feature")
}
