//! File-based source.
//!
//! Polls a JSON export written by the game client host and serves every
//! source capability from the last successfully parsed document.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use statwatch_types::{Character, FcStats, InventoryEntry, LocalStats};

use crate::source::{
    CharacterSource, FcConfiguration, FcConfigurationSource, FilterSource, FleetSource,
    FleetVessel, Inventory, InventorySource, Session,
};
use crate::{AdapterError, Unavailable};

/// Everything the host exports in one document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HostExport {
    /// Logged in character, absent when logged out.
    pub local_content_id: Option<u64>,
    /// Set by the host while the character is logging out.
    pub logging_out: bool,
    pub characters: Vec<Character>,
    pub inventories: Vec<Inventory>,
    /// Filter name to matching stacks.
    pub filters: BTreeMap<String, Vec<InventoryEntry>>,
    /// `None` when the fleet tracker is not installed.
    pub fleet: Option<Vec<FleetVessel>>,
    /// FC settings keyed by the owning player's content id.
    pub fc_configurations: BTreeMap<u64, FcConfiguration>,
    /// Freshly computed progression, fed into the on-disk cache.
    pub local_stats: Vec<LocalStats>,
    /// Freshly computed FC credits, fed into the on-disk cache.
    pub fc_stats: Vec<FcStats>,
}

/// A source that reads host exports from a JSON file.
///
/// The source tracks the file's modification time and only re-reads it when
/// the file has been updated.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    description: String,
    export: RwLock<Option<HostExport>>,
    last_modified: Mutex<Option<SystemTime>>,
    last_error: RwLock<Option<String>>,
}

impl FileSource {
    /// Create a new file source for the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            path,
            description,
            export: RwLock::new(None),
            last_modified: Mutex::new(None),
            last_error: RwLock::new(None),
        }
    }

    /// Create a source serving a fixed export, without touching the disk.
    pub fn from_export(export: HostExport) -> Self {
        let source = Self::new("<memory>");
        *source.export.write() = Some(export);
        source
    }

    /// Returns the path being monitored.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Human-readable description of the source.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Error from the last poll, if any.
    pub fn error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Re-read the file if it changed since the last poll.
    ///
    /// Returns `true` if a new export was loaded. A read or parse failure
    /// keeps the previous export and is reported through [`FileSource::error`].
    pub fn poll(&self) -> bool {
        let current_modified = fs::metadata(&self.path)
            .ok()
            .and_then(|m| m.modified().ok());

        let file_changed = {
            let last = self.last_modified.lock();
            match (*last, current_modified) {
                (None, _) => true,
                (Some(_), None) => false,
                (Some(last), Some(current)) => current > last,
            }
        };

        if !file_changed {
            return false;
        }

        match self.read_file() {
            Ok(export) => {
                debug!(
                    "Loaded host export with {} characters from {}",
                    export.characters.len(),
                    self.path.display()
                );
                *self.export.write() = Some(export);
                *self.last_modified.lock() = current_modified;
                *self.last_error.write() = None;
                true
            }
            Err(e) => {
                warn!("Unable to load host export {}: {}", self.path.display(), e);
                *self.last_error.write() = Some(e.to_string());
                false
            }
        }
    }

    /// A copy of the current export.
    pub fn export(&self) -> Option<HostExport> {
        self.export.read().clone()
    }

    fn read_file(&self) -> Result<HostExport, AdapterError> {
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn with_export<T>(&self, f: impl FnOnce(&HostExport) -> T) -> Result<T, AdapterError> {
        match self.export.read().as_ref() {
            Some(export) => Ok(f(export)),
            None => Err(AdapterError::NotLoaded(self.description.clone())),
        }
    }
}

impl CharacterSource for FileSource {
    fn characters(&self) -> Result<Vec<Character>, AdapterError> {
        self.with_export(|e| e.characters.clone())
    }
}

impl InventorySource for FileSource {
    fn inventories(&self) -> Result<Vec<Inventory>, AdapterError> {
        self.with_export(|e| e.inventories.clone())
    }
}

impl FilterSource for FileSource {
    fn filter_names(&self) -> Result<Vec<String>, AdapterError> {
        self.with_export(|e| e.filters.keys().cloned().collect())
    }

    fn filter(&self, key_or_name: &str) -> Result<Option<Vec<InventoryEntry>>, AdapterError> {
        self.with_export(|e| e.filters.get(key_or_name).cloned())
    }
}

impl FleetSource for FileSource {
    fn vessels(&self) -> Result<Vec<FleetVessel>, AdapterError> {
        match self.with_export(|e| e.fleet.clone())? {
            Some(fleet) => Ok(fleet),
            None => Unavailable.vessels(),
        }
    }
}

impl FcConfigurationSource for FileSource {
    fn fc_configuration(&self, owner_id: u64) -> Result<FcConfiguration, AdapterError> {
        self.with_export(|e| {
            e.fc_configurations
                .get(&owner_id)
                .cloned()
                .unwrap_or_default()
        })
    }
}

impl Session for FileSource {
    fn local_content_id(&self) -> Option<u64> {
        self.export.read().as_ref().and_then(|e| e.local_content_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_json() -> &'static str {
        r#"{
            "local_content_id": 1001,
            "characters": [
                { "character_id": 1001, "character_type": "Player", "world_id": 33, "name": "Alpha", "free_company_id": 9001 },
                { "character_id": 2001, "character_type": "Retainer", "owner_id": 1001, "world_id": 33, "name": "Beta", "class_job": 16, "level": 85 }
            ],
            "inventories": [
                { "character_id": 1001, "items": [ { "category": 1, "item_id": 1, "quantity": 500 } ] }
            ],
            "filters": {
                "crystals": [ { "local_content_id": 1001, "item_id": 2, "quantity": 10 } ]
            },
            "fc_configurations": {
                "1001": { "enabled_submarines": ["Nautilus"], "free_slots": 1 }
            }
        }"#
    }

    #[test]
    fn test_file_source_new() {
        let source = FileSource::new("/tmp/export.json");
        assert_eq!(source.path(), Path::new("/tmp/export.json"));
        assert_eq!(source.description(), "file: /tmp/export.json");
        assert!(source.error().is_none());
    }

    #[test]
    fn test_file_source_poll_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", sample_json()).unwrap();

        let source = FileSource::new(file.path());

        // First poll loads the export
        assert!(source.poll());
        assert_eq!(source.local_content_id(), Some(1001));
        assert_eq!(source.characters().unwrap().len(), 2);
        assert_eq!(source.inventories().unwrap()[0].items[0].quantity, 500);
        assert_eq!(source.filter("crystals").unwrap().unwrap().len(), 1);
        assert!(source.filter("missing").unwrap().is_none());
        assert_eq!(source.filter_names().unwrap(), vec!["crystals".to_string()]);

        let fc = source.fc_configuration(1001).unwrap();
        assert!(fc.enabled_submarines.contains("Nautilus"));
        assert_eq!(fc.free_slots, 1);
        assert_eq!(source.fc_configuration(5).unwrap(), FcConfiguration::default());

        // Second poll without file change does nothing
        assert!(!source.poll());
    }

    #[test]
    fn test_file_source_missing_fleet_is_empty() {
        let source = FileSource::from_export(HostExport::default());
        assert!(source.vessels().unwrap().is_empty());
        assert!(!source.is_logged_in());
    }

    #[test]
    fn test_file_source_not_loaded() {
        let source = FileSource::new("/nonexistent/path/export.json");

        assert!(!source.poll());
        assert!(source.error().unwrap().contains("Read error"));
        assert!(matches!(
            source.characters(),
            Err(AdapterError::NotLoaded(_))
        ));
    }

    #[test]
    fn test_file_source_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid json").unwrap();

        let source = FileSource::new(file.path());

        assert!(!source.poll());
        assert!(source.error().unwrap().contains("Parse error"));
    }
}
