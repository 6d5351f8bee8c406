use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::{article_key, CacheStore, CachedValue, DEFAULT_TTL};
use crate::ScribeError;

pub mod gemini;

pub use gemini::GeminiClient;

/// Stand-in for a transcript that could not be obtained
pub const EMPTY_MARKER: &str = "[EMPTY]";

/// Response of a generateContent call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl GenerateResponse {
    /// Text segments of the first candidate, concatenated and trimmed
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<String>()
            .trim()
            .to_string();

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// External generative-language service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeService: Send + Sync {
    async fn generate_content(&self, model: &str, prompt: &str) -> anyhow::Result<GenerateResponse>;
}

/// Rewrites a transcript pair as an article, cached by transcript content
pub struct ArticleGenerator {
    service: Arc<dyn GenerativeService>,
    cache: Arc<dyn CacheStore>,
    model: String,
    ttl: Duration,
}

impl ArticleGenerator {
    pub fn new(service: Arc<dyn GenerativeService>, cache: Arc<dyn CacheStore>, model: &str) -> Self {
        Self {
            service,
            cache,
            model: model.to_string(),
            ttl: DEFAULT_TTL,
        }
    }

    /// Override the cache entry lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Article text for the given transcripts.
    ///
    /// Identical transcript content reuses the cached article regardless of which
    /// video it came from.
    pub async fn generate_article(
        &self,
        captions_text: &str,
        whisper_text: &str,
    ) -> Result<String, ScribeError> {
        let cache_key = article_key(captions_text, whisper_text);
        if let Some(CachedValue::Article(article)) = self.cache.get(&cache_key) {
            tracing::info!("Using cached article {}", cache_key);
            return Ok(article);
        }

        let prompt = build_prompt(captions_text, whisper_text);

        tracing::info!("Requesting article from {}", self.model);
        let response = self
            .service
            .generate_content(&self.model, &prompt)
            .await
            .map_err(|e| ScribeError::GenerationFailed(ScribeError::cause(&e)))?;

        let article = response.text().ok_or_else(|| {
            ScribeError::GenerationFailed("service returned no article content".to_string())
        })?;

        if let Err(e) = self
            .cache
            .set(&cache_key, CachedValue::Article(article.clone()), self.ttl)
        {
            tracing::warn!("Failed to cache article: {:#}", e);
        }

        Ok(article)
    }
}

/// Instruction template embedding both transcripts
pub fn build_prompt(captions_text: &str, whisper_text: &str) -> String {
    let or_marker = |text: &str| {
        if text.trim().is_empty() {
            EMPTY_MARKER.to_string()
        } else {
            text.to_string()
        }
    };

    format!(
        r#"You are a professional transcription editor and blog writer.
Below are two transcripts of the same video.

--- Captions Transcript ---
{captions}

--- Speech Recognition Transcript ---
{whisper}

As a transcription editor, merge them into one clean and accurate transcript:
- fix recognition mistakes
- remove repetitions
- keep it readable

As a blog writer, turn the merged transcript into a comprehensive article:
- engaging, well-structured and professional
- do not mention the video, the platform or that a transcript was used
- write it as a polished blog post

Output only the article. Do not include the transcript."#,
        captions = or_marker(captions_text),
        whisper = or_marker(whisper_text),
    )
}
