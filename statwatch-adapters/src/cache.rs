//! On-disk cache of locally computed statistics.
//!
//! One JSON file per record, named `<prefix>.<HEX-ID>.json`. Files are read
//! once when the cache is loaded and rewritten only when a record changes.
//! Missing or unparseable files simply mean "no cached value".

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use statwatch_types::{FcStats, LocalStats};

use crate::AdapterError;

/// A record that lives in its own cache file.
pub trait CachedRecord: Serialize + DeserializeOwned + Clone + PartialEq {
    /// File name prefix, `l` for local stats and `f` for FC stats.
    const FILE_PREFIX: &'static str;

    /// Content id the record is keyed by.
    fn content_id(&self) -> u64;
}

impl CachedRecord for LocalStats {
    const FILE_PREFIX: &'static str = "l";

    fn content_id(&self) -> u64 {
        self.content_id
    }
}

impl CachedRecord for FcStats {
    const FILE_PREFIX: &'static str = "f";

    fn content_id(&self) -> u64 {
        self.content_id
    }
}

/// Cache shared between the host feed and the aggregator.
pub type SharedStatsCache<T> = Arc<RwLock<StatsCache<T>>>;

/// In-memory map of cached records backed by a directory.
#[derive(Debug, Clone)]
pub struct StatsCache<T> {
    dir: PathBuf,
    entries: BTreeMap<u64, T>,
}

impl<T: CachedRecord> StatsCache<T> {
    /// Empty cache writing to `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Read every `<prefix>.*.json` file in `dir`.
    ///
    /// A missing directory yields an empty cache. Files that cannot be read or
    /// parsed are skipped with a warning.
    pub fn load(dir: impl Into<PathBuf>) -> Self {
        let mut cache = Self::new(dir);

        let read_dir = match fs::read_dir(&cache.dir) {
            Ok(read_dir) => read_dir,
            Err(e) => {
                debug!("No cache directory {}: {}", cache.dir.display(), e);
                return cache;
            }
        };

        let prefix = format!("{}.", T::FILE_PREFIX);
        for entry in read_dir.flatten() {
            let path = entry.path();
            let matches = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".json"));
            if !matches {
                continue;
            }

            match read_record::<T>(&path) {
                Ok(record) => {
                    cache.entries.insert(record.content_id(), record);
                }
                Err(e) => warn!("Could not parse file {}: {}", path.display(), e),
            }
        }

        debug!(
            "Loaded {} cached '{}' records from {}",
            cache.entries.len(),
            T::FILE_PREFIX,
            cache.dir.display()
        );
        cache
    }

    /// Wrap the cache for sharing.
    pub fn shared(self) -> SharedStatsCache<T> {
        Arc::new(RwLock::new(self))
    }

    /// Path of the file holding the record for `content_id`.
    pub fn file_path(&self, content_id: u64) -> PathBuf {
        self.dir
            .join(format!("{}.{:08X}.json", T::FILE_PREFIX, content_id))
    }

    /// Store `value`, writing its file only if it differs from the cached one.
    ///
    /// Returns `true` when the file was written. The in-memory value is
    /// updated even if the write fails.
    pub fn update(&mut self, value: T) -> Result<bool, AdapterError> {
        let content_id = value.content_id();
        if self.entries.get(&content_id) == Some(&value) {
            return Ok(false);
        }

        let json = serde_json::to_string(&value)?;
        self.entries.insert(content_id, value);

        fs::create_dir_all(&self.dir)?;
        fs::write(self.file_path(content_id), json)?;
        Ok(true)
    }

    /// Cached record for `content_id`.
    pub fn get(&self, content_id: u64) -> Option<&T> {
        self.entries.get(&content_id)
    }

    /// All cached records.
    pub fn entries(&self) -> &BTreeMap<u64, T> {
        &self.entries
    }
}

fn read_record<T: DeserializeOwned>(path: &Path) -> Result<T, AdapterError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
