//! Durable, URL-keyed byte cache with a fixed time-to-live.
//!
//! Entries are opaque files named by the SHA-256 of the source URL. An entry's
//! age is taken from the file modification time. Expired entries are removed
//! lazily by the read that notices them. The cache is a pure performance layer:
//! losing the directory only costs a refetch.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const TMP_SUFFIX: &str = ".tmp";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub dir: String,
    pub entries: usize,
    pub expired: usize,
    pub total_bytes: u64,
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResult {
    pub dir: String,
    pub removed: usize,
}

pub struct ContentCache {
    dir: PathBuf,
    ttl: Duration,
    lock: Mutex<()>,
}

/// Cache key for a URL: lowercase hex SHA-256.
pub fn key_for(url: &str) -> String {
    format!("{:x}", Sha256::digest(url.as_bytes()))
}

fn is_key(name: &str) -> bool {
    name.len() == 64 && name.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Temp files are `<key>.<uuid>.tmp`.
fn is_temp(name: &str) -> bool {
    name.strip_suffix(TMP_SUFFIX)
        .and_then(|rest| rest.split_once('.'))
        .is_some_and(|(key, _)| is_key(key))
}

fn io_error(e: std::io::Error, context: String) -> Error {
    Error::internal_io(e.to_string(), Some(context))
}

impl ContentCache {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_ttl(dir, DEFAULT_TTL)
    }

    pub fn with_ttl(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| io_error(e, format!("create cache dir {}", dir.display())))?;
        tracing::debug!(dir = %dir.display(), "content cache ready");
        Ok(Self {
            dir,
            ttl,
            lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        self.dir.join(key_for(url))
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up `url`. Returns `None` when absent or expired.
    pub fn get(&self, url: &str) -> Result<Option<Vec<u8>>> {
        self.get_at(url, SystemTime::now())
    }

    pub(crate) fn get_at(&self, url: &str, now: SystemTime) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(url);
        let _guard = self.guard();

        let stored_at = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(url, "cache miss");
                return Ok(None);
            }
            Err(e) => return Err(io_error(e, format!("stat {}", path.display()))),
        };

        let age = now.duration_since(stored_at).unwrap_or(Duration::ZERO);
        if age > self.ttl {
            tracing::debug!(url, age_secs = age.as_secs(), "cache entry expired");
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(e, format!("remove {}", path.display()))),
            }
            return Ok(None);
        }

        match fs::read(&path) {
            Ok(content) => {
                tracing::debug!(url, bytes = content.len(), "cache hit");
                Ok(Some(content))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(e, format!("read {}", path.display()))),
        }
    }

    /// Store `content` for `url`, replacing any previous entry atomically.
    pub fn put(&self, url: &str, content: &[u8]) -> Result<()> {
        let path = self.entry_path(url);
        let tmp_path = self.dir.join(format!(
            "{}.{}{}",
            key_for(url),
            uuid::Uuid::new_v4().simple(),
            TMP_SUFFIX
        ));

        let _guard = self.guard();
        fs::create_dir_all(&self.dir)
            .map_err(|e| io_error(e, format!("create cache dir {}", self.dir.display())))?;
        fs::write(&tmp_path, content)
            .map_err(|e| io_error(e, format!("write {}", tmp_path.display())))?;
        if let Err(e) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_error(e, format!("rename into {}", path.display())));
        }

        tracing::debug!(url, bytes = content.len(), "cached content");
        Ok(())
    }

    /// Drop the entry for `url`, if any.
    pub fn remove(&self, url: &str) -> Result<()> {
        let path = self.entry_path(url);
        let _guard = self.guard();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e, format!("remove {}", path.display()))),
        }
    }

    /// Remove every entry and leftover temp file. Other files in the
    /// directory are left alone.
    pub fn clear(&self) -> Result<ClearResult> {
        let _guard = self.guard();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                fs::create_dir_all(&self.dir).map_err(|e| {
                    io_error(e, format!("create cache dir {}", self.dir.display()))
                })?;
                return Ok(ClearResult {
                    dir: self.dir.display().to_string(),
                    removed: 0,
                });
            }
            Err(e) => return Err(io_error(e, format!("list {}", self.dir.display()))),
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let is_file = entry.file_type().is_ok_and(|t| t.is_file());
            if !is_file || !(is_key(&name) || is_temp(&name)) {
                continue;
            }
            let path = entry.path();
            match fs::remove_file(&path) {
                Ok(()) => {
                    if is_key(&name) {
                        removed += 1;
                    }
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(e, format!("remove {}", path.display()))),
            }
        }

        tracing::info!(dir = %self.dir.display(), removed, "content cache cleared");
        Ok(ClearResult {
            dir: self.dir.display().to_string(),
            removed,
        })
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let _guard = self.guard();
        let now = SystemTime::now();
        let mut stats = CacheStats {
            dir: self.dir.display().to_string(),
            entries: 0,
            expired: 0,
            total_bytes: 0,
            ttl_secs: self.ttl.as_secs(),
        };

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(stats),
            Err(e) => return Err(io_error(e, format!("list {}", self.dir.display()))),
        };

        for entry in entries.flatten() {
            if !is_key(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let Ok(meta) = entry.metadata() else { continue };
            if !meta.is_file() {
                continue;
            }
            stats.entries += 1;
            stats.total_bytes += meta.len();
            let expired = meta
                .modified()
                .ok()
                .and_then(|t| now.duration_since(t).ok())
                .is_some_and(|age| age > self.ttl);
            if expired {
                stats.expired += 1;
            }
        }

        Ok(stats)
    }
}
