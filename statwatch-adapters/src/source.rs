//! Source monitor capabilities.
//!
//! Each capability is an independent provider of raw facts. Any of them may
//! be unavailable on a given cycle; the [`Unavailable`](crate::Unavailable)
//! variant then stands in and returns empty data instead of failing.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use statwatch_types::{Character, InventoryEntry, SubmarineState};

use crate::AdapterError;

/// One item slot in a raw inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Sorted inventory category; 1 is the player's main bag.
    #[serde(default)]
    pub category: i32,
    #[serde(default)]
    pub container: i32,
    pub item_id: u32,
    pub quantity: u32,
}

/// All items held by one character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub character_id: u64,
    #[serde(default)]
    pub items: Vec<InventoryItem>,
}

/// Part identifiers of a submersible build.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VesselBuild {
    pub hull: String,
    pub stern: String,
    pub bow: String,
    pub bridge: String,
    /// Composite identifier, e.g. `SSUC`.
    pub full: String,
}

/// A submersible as reported by the fleet tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetVessel {
    pub free_company_id: u64,
    pub name: String,
    pub level: u16,
    /// Level after the active voyage, when the tracker could predict it.
    #[serde(default)]
    pub predicted_level: Option<u16>,
    #[serde(default)]
    pub build: VesselBuild,
    #[serde(default)]
    pub state: SubmarineState,
    pub return_time: DateTime<Utc>,
}

impl FleetVessel {
    /// Predicted level, falling back to the current level when docked or
    /// when no prediction is available.
    pub fn predicted_level(&self) -> u16 {
        match (self.state, self.predicted_level) {
            (SubmarineState::NoVoyage, _) | (_, None) => self.level,
            (_, Some(level)) => level,
        }
    }
}

/// Per free company automation settings, looked up by the owning player.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FcConfiguration {
    /// Names of the vessels enabled for automation.
    pub enabled_submarines: BTreeSet<String>,
    /// Unlocked slots without a vessel.
    pub free_slots: i32,
}

/// Known characters (players, retainers, FC chests).
pub trait CharacterSource: Send + Sync + Debug {
    fn characters(&self) -> Result<Vec<Character>, AdapterError>;
}

/// Raw inventories per character.
pub trait InventorySource: Send + Sync + Debug {
    fn inventories(&self) -> Result<Vec<Inventory>, AdapterError>;
}

/// Named inventory filters.
pub trait FilterSource: Send + Sync + Debug {
    /// Names of every filter the source knows about.
    fn filter_names(&self) -> Result<Vec<String>, AdapterError>;

    /// Matches of one filter, `None` if no such filter exists.
    fn filter(&self, key_or_name: &str) -> Result<Option<Vec<InventoryEntry>>, AdapterError>;
}

/// Submersibles of every known free company.
pub trait FleetSource: Send + Sync + Debug {
    fn vessels(&self) -> Result<Vec<FleetVessel>, AdapterError>;
}

/// Free company automation settings.
pub trait FcConfigurationSource: Send + Sync + Debug {
    /// Settings of the free company owned by `owner_id`.
    fn fc_configuration(&self, owner_id: u64) -> Result<FcConfiguration, AdapterError>;
}

/// Login state of the game client.
pub trait Session: Send + Sync + Debug {
    /// Content id of the logged in character.
    fn local_content_id(&self) -> Option<u64>;

    fn is_logged_in(&self) -> bool {
        self.local_content_id().is_some()
    }
}

/// The full capability set consumed by the aggregator.
#[derive(Debug, Clone)]
pub struct Sources {
    pub characters: Arc<dyn CharacterSource>,
    pub inventories: Arc<dyn InventorySource>,
    pub filters: Arc<dyn FilterSource>,
    pub fleet: Arc<dyn FleetSource>,
    pub fc_configuration: Arc<dyn FcConfigurationSource>,
}

impl Sources {
    /// Use one provider for every capability.
    pub fn from_provider<P>(provider: Arc<P>) -> Self
    where
        P: CharacterSource
            + InventorySource
            + FilterSource
            + FleetSource
            + FcConfigurationSource
            + 'static,
    {
        Self {
            characters: provider.clone(),
            inventories: provider.clone(),
            filters: provider.clone(),
            fleet: provider.clone(),
            fc_configuration: provider,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::Unavailable;

    fn vessel(state: SubmarineState, predicted: Option<u16>) -> FleetVessel {
        FleetVessel {
            free_company_id: 1,
            name: "Sub".into(),
            level: 50,
            predicted_level: predicted,
            build: VesselBuild::default(),
            state,
            return_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn predicted_level_uses_current_level_when_docked() {
        assert_eq!(vessel(SubmarineState::NoVoyage, Some(60)).predicted_level(), 50);
        assert_eq!(vessel(SubmarineState::Voyage, None).predicted_level(), 50);
        assert_eq!(vessel(SubmarineState::Voyage, Some(52)).predicted_level(), 52);
        assert_eq!(vessel(SubmarineState::Returned, Some(51)).predicted_level(), 51);
    }

    #[test]
    fn unavailable_sources_return_empty_data() {
        let sources = Sources::from_provider(Arc::new(Unavailable));
        assert!(sources.characters.characters().unwrap().is_empty());
        assert!(sources.inventories.inventories().unwrap().is_empty());
        assert!(sources.filters.filter("any").unwrap().is_none());
        assert!(sources.fleet.vessels().unwrap().is_empty());
        assert_eq!(
            sources.fc_configuration.fc_configuration(1).unwrap(),
            FcConfiguration::default()
        );
        assert!(!Unavailable.is_logged_in());
    }
}
