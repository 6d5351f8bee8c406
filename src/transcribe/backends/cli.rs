use anyhow::Context;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::transcribe::SpeechModel;

/// Speech model driven through the openai-whisper command line tool.
///
/// The tool loads its model on every invocation.
pub struct WhisperCli {
    command: String,
    model: String,
}

impl WhisperCli {
    pub fn new(model: &str) -> Self {
        Self {
            command: "whisper".to_string(),
            model: model.to_string(),
        }
    }

    /// Name of the executable, for dependency checks
    pub fn command(&self) -> &str {
        &self.command
    }

    /// whisper writes `<input stem>.txt` into the output directory
    fn transcript_path(audio: &Path, output_dir: &Path) -> PathBuf {
        let stem = audio
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        output_dir.join(format!("{}.txt", stem))
    }
}

impl SpeechModel for WhisperCli {
    fn transcribe_file(&self, audio: &Path) -> anyhow::Result<String> {
        let output_dir = tempfile::TempDir::new().context("Failed to create whisper output dir")?;

        let output = Command::new(&self.command)
            .arg(audio)
            .args(["--model", self.model.as_str()])
            .args(["--output_format", "txt"])
            .arg("--output_dir")
            .arg(output_dir.path())
            .args(["--verbose", "False"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to run {}", self.command))?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("whisper failed: {}", error.trim());
        }

        let transcript = Self::transcript_path(audio, output_dir.path());
        fs_err::read_to_string(&transcript).context("whisper produced no transcript")
    }

    fn name(&self) -> String {
        format!("whisper CLI ({})", self.model)
    }
}
