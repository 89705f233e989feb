//! File-backed JSON cache with per-entry TTL.
//!
//! Each key becomes one file under the cache directory, named by the xxh3
//! digest of the raw key so arbitrary strings (IP addresses included) are
//! always filesystem-safe. The stored envelope carries its own write
//! timestamp, so validity survives file copies and backup restores.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    cached_at: i64,
    value: T,
}

#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{:016x}.json", xxh3_64(key.as_bytes())))
    }

    /// Read the cached value for `key` if it exists and is younger than
    /// `ttl`. Expired entries are deleted on read; unreadable or corrupt
    /// entries count as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        let path = self.entry_path(key);
        let raw = std::fs::read_to_string(&path).ok()?;
        let envelope: Envelope<T> = match serde_json::from_str(&raw) {
            Ok(e) => e,
            Err(e) => {
                debug!(error = %e, path = %path.display(), "discarding corrupt cache entry");
                let _ = std::fs::remove_file(&path);
                return None;
            }
        };

        let age = Utc::now().timestamp().saturating_sub(envelope.cached_at);
        if age >= ttl.as_secs() as i64 {
            let _ = std::fs::remove_file(&path);
            return None;
        }
        Some(envelope.value)
    }

    /// Write `value` for `key`, stamped now. Failures are logged and
    /// dropped: the cache is an optimisation, never a required write.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) {
        let envelope = Envelope {
            cached_at: Utc::now().timestamp(),
            value,
        };
        let path = self.entry_path(key);
        match serde_json::to_string(&envelope) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    debug!(error = %e, path = %path.display(), "cache write failed");
                }
            }
            Err(e) => debug!(error = %e, "cache serialisation failed"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
