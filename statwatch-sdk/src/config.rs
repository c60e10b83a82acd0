//! Statistics configuration.
//!
//! The model is plain serde data; the host decides where it comes from.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Configuration shared between the manager, the clients and the scheduler.
pub type SharedConfiguration = Arc<RwLock<Configuration>>;

/// Which time-series backend to publish to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteType {
    #[default]
    InfluxDb,
    QuestDb,
}

/// Remote server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfiguration {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub remote_type: RemoteType,
    /// Endpoint URL.
    pub server: String,

    // InfluxDB
    pub token: String,
    pub organization: String,
    pub bucket: String,

    // QuestDB
    pub username: String,
    pub password: String,
    pub table_prefix: String,
}

impl Default for ServerConfiguration {
    fn default() -> Self {
        Self {
            enabled: false,
            remote_type: RemoteType::InfluxDb,
            server: "http://localhost:8086".to_string(),
            token: String::new(),
            organization: String::new(),
            bucket: String::new(),
            username: String::new(),
            password: String::new(),
            table_prefix: String::new(),
        }
    }
}

/// An allow-listed character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterInfo {
    pub local_content_id: u64,
    pub cached_player_name: Option<String>,
    pub cached_world_name: Option<String>,
    /// Also track the character's free company.
    pub include_free_company: bool,
}

impl Default for CharacterInfo {
    fn default() -> Self {
        Self {
            local_content_id: 0,
            cached_player_name: None,
            cached_world_name: None,
            include_free_company: true,
        }
    }
}

impl CharacterInfo {
    pub fn new(local_content_id: u64) -> Self {
        Self {
            local_content_id,
            ..Default::default()
        }
    }
}

/// A tracked inventory filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterInfo {
    pub name: String,
}

impl FilterInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Everything the statistics pipeline is configured with.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub server: ServerConfiguration,
    /// Allow-list characters automatically when they log in.
    pub auto_enroll_characters: bool,
    pub included_characters: Vec<CharacterInfo>,
    pub included_inventory_filters: Vec<FilterInfo>,
}

impl Configuration {
    /// Wrap the configuration for sharing.
    pub fn shared(self) -> SharedConfiguration {
        Arc::new(RwLock::new(self))
    }

    /// Allow-list entry for a character.
    pub fn character(&self, local_content_id: u64) -> Option<&CharacterInfo> {
        self.included_characters
            .iter()
            .find(|c| c.local_content_id == local_content_id)
    }

    /// Whether the character is allow-listed.
    pub fn is_included(&self, local_content_id: u64) -> bool {
        self.character(local_content_id).is_some()
    }

    /// Whether the character is allow-listed with its free company.
    pub fn includes_free_company(&self, local_content_id: u64) -> bool {
        self.included_characters
            .iter()
            .any(|c| c.local_content_id == local_content_id && c.include_free_company)
    }

    /// Distinct filter names, in configuration order.
    pub fn filter_names(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.included_inventory_filters
            .iter()
            .filter(|f| seen.insert(f.name.as_str()))
            .map(|f| f.name.clone())
            .collect()
    }

    /// Allow-list a character unless it already is.
    ///
    /// Returns `true` if the character was added.
    pub fn enroll(
        &mut self,
        local_content_id: u64,
        player_name: Option<String>,
        world_name: Option<String>,
    ) -> bool {
        if self.is_included(local_content_id) {
            return false;
        }

        self.included_characters.push(CharacterInfo {
            local_content_id,
            cached_player_name: Some(player_name.unwrap_or_else(|| "??".to_string())),
            cached_world_name: world_name,
            include_free_company: true,
        });
        true
    }
}
