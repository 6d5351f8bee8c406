use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::time::Duration;

use super::{CaptionSnippet, CaptionSource, CaptionSourceError, CaptionTrack, TrackCatalog};
use crate::extractors::VideoId;

/// Caption source backed by yt-dlp track metadata and YouTube's json3 caption format
pub struct YtDlpCaptionSource {
    yt_dlp_path: String,
    timeout: Duration,
    /// Catalog of the most recently listed video, reused by the generated-track fallback
    last_catalog: Mutex<Option<(VideoId, TrackCatalog)>>,
}

impl YtDlpCaptionSource {
    pub fn new() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            timeout: Duration::from_secs(30),
            last_catalog: Mutex::new(None),
        }
    }

    fn remembered_catalog(&self, video: &VideoId) -> Option<TrackCatalog> {
        let last = self.last_catalog.lock().unwrap_or_else(|e| e.into_inner());
        match last.as_ref() {
            Some((seen, catalog)) if seen == video => Some(catalog.clone()),
            _ => None,
        }
    }

    fn remember_catalog(&self, video: &VideoId, catalog: &TrackCatalog) {
        let mut last = self.last_catalog.lock().unwrap_or_else(|e| e.into_inner());
        *last = Some((video.clone(), catalog.clone()));
    }

    /// Get video information using yt-dlp
    fn get_video_info(&self, video: &VideoId) -> anyhow::Result<Value> {
        tracing::debug!("Listing caption tracks for: {}", video);

        let url = video.watch_url();
        let output = Command::new(&self.yt_dlp_path)
            .args([
                "--dump-json",
                "--skip-download",
                "--no-playlist",
                url.as_str(),
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .context("Failed to run yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", error.trim());
        }

        let info: Value = serde_json::from_slice(&output.stdout)
            .context("yt-dlp returned invalid JSON")?;

        Ok(info)
    }
}

impl Default for YtDlpCaptionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptionSource for YtDlpCaptionSource {
    fn get_transcript(
        &self,
        video: &VideoId,
        languages: &[String],
    ) -> Result<Vec<CaptionSnippet>, CaptionSourceError> {
        let catalog = self.list_transcripts(video)?;

        let track = catalog
            .find_manual_transcript(languages)
            .ok_or_else(|| CaptionSourceError::NoTranscriptFound(languages.to_vec()))?;

        self.fetch_track(track)
    }

    fn list_transcripts(&self, video: &VideoId) -> Result<TrackCatalog, CaptionSourceError> {
        let catalog = match self.remembered_catalog(video) {
            Some(catalog) => {
                tracing::debug!("Reusing caption track listing for: {}", video);
                catalog
            }
            None => {
                let catalog = parse_catalog(&self.get_video_info(video)?);
                self.remember_catalog(video, &catalog);
                catalog
            }
        };

        if catalog.is_empty() {
            return Err(CaptionSourceError::TranscriptsDisabled);
        }

        Ok(catalog)
    }

    fn fetch_track(&self, track: &CaptionTrack) -> Result<Vec<CaptionSnippet>, CaptionSourceError> {
        tracing::debug!(
            "Fetching {} caption track (generated: {})",
            track.language,
            track.is_generated
        );

        // Built per call: the blocking client must not be created or dropped on an async worker
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let response = client
            .get(&track.url)
            .send()
            .context("Caption request failed")?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Caption request failed: HTTP {}", response.status()).into());
        }

        let body = response.text().context("Failed to read caption body")?;
        Ok(parse_json3(&body)?)
    }
}

/// Build the track catalog from yt-dlp `subtitles` / `automatic_captions` maps
fn parse_catalog(info: &Value) -> TrackCatalog {
    let mut tracks = Vec::new();

    for (key, is_generated) in [("subtitles", false), ("automatic_captions", true)] {
        let Some(by_language) = info[key].as_object() else {
            continue;
        };

        for (language, formats) in by_language {
            // Chat replays are listed as subtitles but are not speech captions
            if language == "live_chat" {
                continue;
            }

            let json3_url = formats.as_array().and_then(|formats| {
                formats
                    .iter()
                    .find(|f| f["ext"].as_str() == Some("json3"))
                    .and_then(|f| f["url"].as_str())
            });

            if let Some(url) = json3_url {
                tracks.push(CaptionTrack {
                    language: language.clone(),
                    url: url.to_string(),
                    is_generated,
                });
            }
        }
    }

    TrackCatalog { tracks }
}

#[derive(Debug, Deserialize)]
struct Json3Captions {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
struct Json3Event {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: u64,
    #[serde(default)]
    segs: Vec<Json3Segment>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

/// Flatten a json3 caption document into snippets, skipping whitespace-only events
fn parse_json3(body: &str) -> anyhow::Result<Vec<CaptionSnippet>> {
    let captions: Json3Captions =
        serde_json::from_str(body).context("Failed to parse json3 captions")?;

    let snippets = captions
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.replace('\n', " ");
            if text.trim().is_empty() {
                return None;
            }
            Some(CaptionSnippet {
                text,
                start: event.start_ms as f64 / 1000.0,
                duration: event.duration_ms as f64 / 1000.0,
            })
        })
        .collect();

    Ok(snippets)
}
