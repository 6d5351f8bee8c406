use anyhow::{anyhow, Context};
use std::path::Path;
use std::process::Command;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::transcribe::SpeechModel;

/// In-process whisper.cpp model, loaded once and shared by all workers.
///
/// Each call gets its own inference state; the context itself is read-only.
pub struct WhisperRsModel {
    ctx: WhisperContext,
    name: String,
}

impl WhisperRsModel {
    pub fn load(model_path: &Path) -> anyhow::Result<Self> {
        let path_str = model_path
            .to_str()
            .ok_or_else(|| anyhow!("Model path is not valid UTF-8: {}", model_path.display()))?;

        tracing::info!("Loading whisper model: {}", model_path.display());
        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| anyhow!("Failed to load whisper model {}: {}", model_path.display(), e))?;

        Ok(Self {
            ctx,
            name: format!("whisper-rs ({})", model_path.display()),
        })
    }

    /// Decode any ffmpeg-readable input to 16 kHz mono f32 samples
    fn decode(audio: &Path) -> anyhow::Result<Vec<f32>> {
        let wav = tempfile::Builder::new()
            .prefix("vidscribe_")
            .suffix(".wav")
            .tempfile()?;

        let output = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i")
            .arg(audio)
            .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"])
            .arg(wav.path())
            .output()
            .context("Failed to run ffmpeg")?;

        if !output.status.success() {
            anyhow::bail!(
                "ffmpeg could not decode {}: {}",
                audio.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let mut reader = hound::WavReader::open(wav.path()).context("Failed to open decoded audio")?;
        let samples = reader
            .samples::<i16>()
            .map(|s| s.map(|s| s as f32 / i16::MAX as f32))
            .collect::<Result<Vec<f32>, _>>()
            .context("Failed to read decoded audio")?;

        Ok(samples)
    }
}

impl SpeechModel for WhisperRsModel {
    fn transcribe_file(&self, audio: &Path) -> anyhow::Result<String> {
        let samples = Self::decode(audio)?;

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| anyhow!("Failed to create whisper state: {}", e))?;

        let params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        state
            .full(params, &samples)
            .map_err(|e| anyhow!("Whisper inference failed: {}", e))?;

        let mut text = String::new();
        for segment in state.as_iter() {
            match segment.to_str() {
                Ok(s) => text.push_str(s),
                Err(e) => tracing::debug!("Skipping undecodable segment: {}", e),
            }
        }

        Ok(text)
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}
