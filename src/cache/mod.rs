//! Time-limited store for transcript pairs and generated articles.
//!
//! Keys are deterministic: `transcriptions:{video}:{language}` for transcripts and
//! `article:{sha256(captions + whisper)}` for articles. Entries are written once per
//! successful computation and are never invalidated before they expire. Concurrent
//! writers of the same key race benignly; the last write wins.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::extractors::VideoId;
use crate::transcribe::TranscriptPair;

pub mod file;
pub mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

/// Lifetime of every cache entry
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Value stored under a cache key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CachedValue {
    Transcripts(TranscriptPair),
    Article(String),
}

/// Synchronous key/value store with per-entry expiry
#[cfg_attr(test, mockall::automock)]
pub trait CacheStore: Send + Sync {
    /// Live value for `key`; expired entries read as absent
    fn get(&self, key: &str) -> Option<CachedValue>;

    /// Store `value` under `key` for `ttl`
    fn set(&self, key: &str, value: CachedValue, ttl: Duration) -> anyhow::Result<()>;
}

pub fn transcript_key(video: &VideoId, language: &str) -> String {
    format!("transcriptions:{}:{}", video, language)
}

pub fn article_key(captions_text: &str, whisper_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(captions_text.as_bytes());
    hasher.update(whisper_text.as_bytes());
    format!("article:{}", hex::encode(hasher.finalize()))
}

/// Hex SHA-256 of arbitrary bytes
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::extract_video_id;

    #[test]
    fn test_transcript_key_layout() {
        let video = extract_video_id("https://youtu.be/abc123").unwrap();
        assert_eq!(transcript_key(&video, "en"), "transcriptions:abc123:en");
    }

    #[test]
    fn test_article_key_hashes_concatenation() {
        let key = article_key("hello ", "world");
        assert_eq!(key, format!("article:{}", sha256_hex(b"hello world")));
        // Only the concatenation matters
        assert_eq!(key, article_key("hello", " world"));
        assert_ne!(key, article_key("hello", "world"));
        assert_eq!(key.len(), "article:".len() + 64);
    }

    #[test]
    fn test_cached_value_json_shape() {
        let value = CachedValue::Article("text".into());
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(json["kind"], "article");
        assert_eq!(json["value"], "text");
    }
}
