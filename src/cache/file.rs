use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{sha256_hex, CacheStore, CachedValue};

/// On-disk representation of one entry
#[derive(Debug, Serialize, Deserialize)]
struct FileEntry {
    key: String,
    expires_at: DateTime<Utc>,
    value: CachedValue,
}

/// Cache persisted as one JSON file per key, shared by every process using the directory
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// Open (and create) a cache rooted at `dir`
    pub fn open(dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let dir = dir.into();
        fs_err::create_dir_all(&dir).context("Failed to create cache directory")?;
        tracing::debug!("Cache directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sha256_hex(key.as_bytes())))
    }

    fn read_entry(path: &Path) -> Option<FileEntry> {
        let content = fs_err::read_to_string(path).ok()?;
        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Files named like entries (`<sha256 hex>.json`); anything else in the directory is left alone
    fn entry_files(&self) -> anyhow::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs_err::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && is_entry_file(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Remove expired and unreadable entries, returning how many were deleted
    pub fn purge_expired(&self) -> anyhow::Result<usize> {
        let now = Utc::now();
        let mut removed = 0;

        for path in self.entry_files()? {
            let stale = Self::read_entry(&path).map_or(true, |entry| entry.expires_at <= now);
            if stale && fs_err::remove_file(&path).is_ok() {
                removed += 1;
            }
        }

        if removed > 0 {
            tracing::info!("Purged {} expired cache entries", removed);
        }
        Ok(removed)
    }

    /// Remove every entry
    pub fn clear(&self) -> anyhow::Result<usize> {
        let mut removed = 0;
        for path in self.entry_files()? {
            fs_err::remove_file(&path)?;
            removed += 1;
        }
        Ok(removed)
    }
}

fn is_entry_file(path: &Path) -> bool {
    let is_json = path.extension().map_or(false, |ext| ext == "json");
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    is_json
        && stem.len() == 64
        && stem.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl CacheStore for FileCache {
    fn get(&self, key: &str) -> Option<CachedValue> {
        let path = self.entry_path(key);
        let entry = Self::read_entry(&path)?;

        if entry.key != key {
            tracing::warn!("Cache key mismatch in {}", path.display());
            return None;
        }

        if entry.expires_at <= Utc::now() {
            tracing::debug!("Cache expired for key: {}", key);
            let _ = fs_err::remove_file(&path);
            return None;
        }

        tracing::debug!("Cache hit: {}", key);
        Some(entry.value)
    }

    fn set(&self, key: &str, value: CachedValue, ttl: Duration) -> anyhow::Result<()> {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .context("Cache TTL out of range")?;
        let entry = FileEntry {
            key: key.to_string(),
            expires_at,
            value,
        };

        // Write then rename so readers never see a partial file
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer(&mut tmp, &entry)?;
        tmp.flush()?;
        tmp.persist(self.entry_path(key))
            .context("Failed to persist cache entry")?;

        Ok(())
    }
}
