use anyhow::Context;
use serde_json::Value;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::{DownloadOptions, MediaDownloader};

const UNTITLED: &str = "Untitled Video";

/// Media downloader using yt-dlp (ffmpeg required for transcoding)
pub struct YtDlpDownloader {
    yt_dlp_path: String,
}

impl YtDlpDownloader {
    pub fn new() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
        }
    }

    fn build_args(reference: &str, options: &DownloadOptions) -> Vec<String> {
        let mut args = vec![
            "--no-playlist".to_string(),
            "--quiet".to_string(),
            "--no-progress".to_string(),
            "--format".to_string(),
            options.format.clone(),
            "--output".to_string(),
            options.output.to_string_lossy().into_owned(),
            // Final location after any post-processing
            "--print".to_string(),
            "after_move:filepath".to_string(),
        ];

        if let Some(transcode) = &options.transcode {
            args.extend([
                "--extract-audio".to_string(),
                "--audio-format".to_string(),
                transcode.codec.clone(),
                "--audio-quality".to_string(),
                transcode.quality.clone(),
            ]);
        }

        args.push(reference.to_string());
        args
    }
}

impl Default for YtDlpDownloader {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaDownloader for YtDlpDownloader {
    fn download(&self, reference: &str, options: &DownloadOptions) -> anyhow::Result<PathBuf> {
        tracing::debug!("yt-dlp download of {} -> {}", reference, options.output.display());

        let output = Command::new(&self.yt_dlp_path)
            .args(Self::build_args(reference, options))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .context("Failed to run yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let printed = stdout.lines().map(str::trim).filter(|l| !l.is_empty()).last();

        Ok(printed
            .map(PathBuf::from)
            .unwrap_or_else(|| options.output.clone()))
    }

    fn fetch_title(&self, reference: &str) -> anyhow::Result<String> {
        let output = Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--skip-download", "--no-playlist", reference])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .context("Failed to run yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to fetch video title: {}", error.trim());
        }

        let info: Value = serde_json::from_slice(&output.stdout)
            .context("yt-dlp returned invalid JSON")?;

        Ok(title_from_info(&info))
    }
}

fn title_from_info(info: &Value) -> String {
    info["title"]
        .as_str()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED)
        .to_string()
}
