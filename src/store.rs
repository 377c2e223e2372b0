//! Durable key/value storage for cached languages and strings.
//!
//! Entries never expire; they are only replaced by newer writes. Every key
//! written by this crate lives under the `languagecenter.` prefix.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

pub const LANGUAGES_KEY: &str = "languagecenter.languages";
pub const LANGUAGES_TIMESTAMP_KEY: &str = "languagecenter.timestamp";
pub const STRINGS_KEY: &str = "languagecenter.strings";

/// Per-locale "last synced" timestamp key.
pub fn locale_timestamp_key(locale: &str) -> String {
    format!("languagecenter.language.{}.timestamp", locale)
}

/// A get / put-forever store. Each `put` replaces one key atomically.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn put(&self, key: &str, value: Value) -> Result<()>;
}

impl dyn CacheStore {
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    pub fn put_as<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.put(key, serde_json::to_value(value)?)
    }
}

/// Process-local store, mostly for tests and single-process hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// JSON file holding every key as one object.
///
/// Writes go to a sibling temp file that is renamed over the original, so a
/// reader never observes a half-written file. The parsed file is mirrored in
/// memory and only read again when its modification time or length changes.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    mirror: Mutex<Option<Mirror>>,
}

/// Modification time and length of the file, `None` when it does not exist.
type FileStamp = Option<(SystemTime, u64)>;

#[derive(Debug)]
struct Mirror {
    stamp: FileStamp,
    entries: Map<String, Value>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mirror: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn stamp(&self) -> Result<FileStamp> {
        match std::fs::metadata(&self.path) {
            Ok(meta) => Ok(Some((meta.modified()?, meta.len()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The entries as currently on disk, re-read only when the file changed.
    fn current<'a>(&self, mirror: &'a mut Option<Mirror>) -> Result<&'a mut Map<String, Value>> {
        let stamp = self.stamp()?;
        let entries = match mirror.take() {
            Some(cached) if cached.stamp == stamp => cached.entries,
            _ => self.read_all()?,
        };
        Ok(&mut mirror.insert(Mirror { stamp, entries }).entries)
    }

    fn read_all(&self) -> Result<Map<String, Value>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(Map::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CacheStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut mirror = self.mirror.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.current(&mut mirror)?.get(key).cloned())
    }

    fn put(&self, key: &str, value: Value) -> Result<()> {
        let mut mirror = self.mirror.lock().unwrap_or_else(|e| e.into_inner());
        let entries = self.current(&mut mirror)?;
        entries.insert(key.to_string(), value);

        if let Err(e) = self.write_all(entries) {
            // Drop the unwritten entry; the next read goes back to disk.
            *mirror = None;
            return Err(e);
        }

        match (self.stamp(), mirror.as_mut()) {
            (Ok(stamp), Some(cached)) => cached.stamp = stamp,
            _ => *mirror = None,
        }
        Ok(())
    }
}
