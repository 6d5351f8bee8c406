use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cli::{OutputFormat, TranscriptFormat};
use crate::transcribe::TranscriptPair;

/// A generated article together with its source video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub video_title: String,
    pub video_link: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ArticleRecord {
    pub fn new(video_title: &str, video_link: &str, content: &str) -> Self {
        Self {
            video_title: video_title.to_string(),
            video_link: video_link.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }
}

pub fn format_as_text(record: &ArticleRecord) -> String {
    format!(
        "{}\n{}\n\n{}\n",
        record.video_title, record.video_link, record.content
    )
}

pub fn format_as_markdown(record: &ArticleRecord) -> String {
    format!(
        "# {}\n\n*Source: <{}> ({})*\n\n{}\n",
        record.video_title,
        record.video_link,
        record.created_at.format("%Y-%m-%d %H:%M UTC"),
        record.content
    )
}

pub fn format_as_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize output")
}

/// Render an article record in the requested format
pub fn render_article(record: &ArticleRecord, format: &OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => format_as_text(record),
        OutputFormat::Markdown => format_as_markdown(record),
        OutputFormat::Json => format_as_json(record)?,
    })
}

/// Render both transcripts, labelling an absent one
pub fn render_transcripts(pair: &TranscriptPair, format: &TranscriptFormat) -> Result<String> {
    match format {
        TranscriptFormat::Json => format_as_json(pair),
        TranscriptFormat::Text => {
            let section = |text: &str| {
                if text.is_empty() {
                    "(none)".to_string()
                } else {
                    text.to_string()
                }
            };
            Ok(format!(
                "== Captions ==\n{}\n\n== Speech recognition ==\n{}\n",
                section(&pair.captions_text),
                section(&pair.whisper_text)
            ))
        }
    }
}

/// Save rendered output to file
pub fn save_to_file(content: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(path, content)?;
    Ok(())
}

/// Print rendered output to console
pub fn print_to_console(content: &str) {
    println!("{}", content.trim_end());
}
