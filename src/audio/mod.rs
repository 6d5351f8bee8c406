use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::config::DeploymentMode;
use crate::utils::BestEffort;
use crate::ScribeError;

pub mod ytdlp;

pub use ytdlp::YtDlpDownloader;

/// yt-dlp format selector for the transcription input
pub const BEST_AUDIO_FORMAT: &str = "bestaudio/best";

/// Post-download transcoding request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcode {
    /// Target codec (e.g. "mp3")
    pub codec: String,

    /// Target quality (e.g. "192K")
    pub quality: String,
}

/// Options handed to the media-download service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Format selector
    pub format: String,

    /// Output path or template
    pub output: PathBuf,

    /// Optional transcoding of the downloaded audio
    pub transcode: Option<Transcode>,
}

/// External media-download service. Calls block.
#[cfg_attr(test, mockall::automock)]
pub trait MediaDownloader: Send + Sync {
    /// Download `reference` and return the path of the produced file
    fn download(&self, reference: &str, options: &DownloadOptions) -> anyhow::Result<PathBuf>;

    /// Human-readable title of the video
    fn fetch_title(&self, reference: &str) -> anyhow::Result<String>;
}

/// Temporary audio file owned by a single pipeline invocation.
///
/// Removed by [`AudioArtifact::discard`], or on drop if never discarded.
#[derive(Debug)]
pub struct AudioArtifact {
    path: Option<PathBuf>,
}

impl AudioArtifact {
    pub fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Delete the file. Errors are reported, never raised.
    pub fn discard(mut self) -> BestEffort<()> {
        match self.path.take() {
            Some(path) => remove_quietly(&path),
            None => BestEffort::Skipped,
        }
    }
}

impl Drop for AudioArtifact {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let _ = remove_quietly(&path);
        }
    }
}

fn remove_quietly(path: &Path) -> BestEffort<()> {
    if !path.exists() {
        return BestEffort::Skipped;
    }
    match fs_err::remove_file(path) {
        Ok(()) => {
            tracing::debug!("Removed temporary audio: {}", path.display());
            BestEffort::Done(())
        }
        Err(e) => {
            tracing::warn!("Failed to remove temporary audio {}: {}", path.display(), e);
            BestEffort::Failed(e.to_string())
        }
    }
}

/// Downloads a temporary audio artifact, plus a durable mp3 copy in development
#[derive(Clone)]
pub struct AudioAcquirer {
    downloader: Arc<dyn MediaDownloader>,
    temp_dir: PathBuf,
    media_root: PathBuf,
    mode: DeploymentMode,
}

impl AudioAcquirer {
    pub fn new(
        downloader: Arc<dyn MediaDownloader>,
        temp_dir: PathBuf,
        media_root: PathBuf,
        mode: DeploymentMode,
    ) -> Self {
        Self {
            downloader,
            temp_dir,
            media_root,
            mode,
        }
    }

    /// Download the best available audio of `reference` to a fresh temporary file
    pub fn download_audio(&self, reference: &str) -> Result<AudioArtifact, ScribeError> {
        let path = self
            .temp_dir
            .join(format!("audio_{}.webm", Uuid::new_v4().simple()));

        tracing::info!("Downloading audio to: {}", path.display());

        let options = DownloadOptions {
            format: BEST_AUDIO_FORMAT.to_string(),
            output: path.clone(),
            transcode: None,
        };

        let produced = match self.downloader.download(reference, &options) {
            Ok(produced) => produced,
            Err(e) => {
                tracing::error!("Audio download failed for {}: {:#}", reference, e);
                // yt-dlp may leave a partial file behind
                let _ = remove_quietly(&path);
                return Err(ScribeError::AudioDownloadFailed(ScribeError::cause(&e)));
            }
        };

        if !produced.is_file() {
            return Err(ScribeError::AudioDownloadFailed(format!(
                "no audio file at {}",
                produced.display()
            )));
        }

        let artifact = AudioArtifact::new(produced);

        if let BestEffort::Failed(reason) = self.durable_copy(reference) {
            tracing::warn!("Durable audio copy skipped: {}", reason);
        }

        Ok(artifact)
    }

    /// Second, independent mp3 download into the media root (development only)
    pub fn durable_copy(&self, reference: &str) -> BestEffort<PathBuf> {
        if self.mode != DeploymentMode::Development {
            return BestEffort::Skipped;
        }

        if let Err(e) = fs_err::create_dir_all(&self.media_root) {
            return BestEffort::Failed(e.to_string());
        }

        let options = DownloadOptions {
            format: BEST_AUDIO_FORMAT.to_string(),
            output: self
                .media_root
                .join(format!("audio_{}.%(ext)s", Uuid::new_v4().simple())),
            transcode: Some(Transcode {
                codec: "mp3".to_string(),
                quality: "192K".to_string(),
            }),
        };

        match self.downloader.download(reference, &options) {
            Ok(path) => {
                tracing::info!("Saved durable audio copy: {}", path.display());
                BestEffort::Done(path)
            }
            Err(e) => BestEffort::Failed(ScribeError::cause(&e)),
        }
    }

    /// Title of the video behind `reference`
    pub fn fetch_title(&self, reference: &str) -> anyhow::Result<String> {
        self.downloader.fetch_title(reference)
    }
}
