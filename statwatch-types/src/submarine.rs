//! Submersible fleet state per free company.

use chrono::{DateTime, Utc};

/// Voyage lifecycle of a submersible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SubmarineState {
    /// Docked, no voyage registered.
    #[default]
    NoVoyage = 0,
    /// Out on a voyage.
    Voyage = 1,
    /// Voyage finished, waiting to be collected.
    Returned = 2,
}

impl SubmarineState {
    /// Integer encoding used by the `state` field.
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// One submersible.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SingleSubmarineStats {
    pub name: String,
    /// Slot index within the fleet.
    pub id: i32,
    pub world_id: u32,
    /// Whether the owner has the vessel enabled for automation.
    pub enabled: bool,
    pub level: u16,
    /// Level expected once the current voyage completes.
    pub predicted_level: u16,
    pub hull: String,
    pub stern: String,
    pub bow: String,
    pub bridge: String,
    /// Composite build identifier.
    pub build: String,
    pub state: SubmarineState,
    pub return_time: DateTime<Utc>,
}

/// The submersible fleet of one free company.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubmarineStats {
    pub submarines: Vec<SingleSubmarineStats>,
    /// Unlocked slots without a vessel.
    pub free_slots: i32,
}
