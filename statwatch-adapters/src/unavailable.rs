//! Null-object source used when a provider is not loaded.

use tracing::warn;

use statwatch_types::{Character, InventoryEntry};

use crate::source::{
    CharacterSource, FcConfiguration, FcConfigurationSource, FilterSource, FleetSource,
    FleetVessel, Inventory, InventorySource, Session,
};
use crate::AdapterError;

/// A source that has nothing to report.
///
/// Every capability returns empty data and logs a warning, so a missing
/// provider degrades the snapshot instead of failing the cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl CharacterSource for Unavailable {
    fn characters(&self) -> Result<Vec<Character>, AdapterError> {
        warn!("Character monitor is unavailable");
        Ok(Vec::new())
    }
}

impl InventorySource for Unavailable {
    fn inventories(&self) -> Result<Vec<Inventory>, AdapterError> {
        warn!("Inventory monitor is unavailable");
        Ok(Vec::new())
    }
}

impl FilterSource for Unavailable {
    fn filter_names(&self) -> Result<Vec<String>, AdapterError> {
        warn!("Filter service is unavailable");
        Ok(Vec::new())
    }

    fn filter(&self, key_or_name: &str) -> Result<Option<Vec<InventoryEntry>>, AdapterError> {
        warn!("Filter service is unavailable, cannot resolve '{}'", key_or_name);
        Ok(None)
    }
}

impl FleetSource for Unavailable {
    fn vessels(&self) -> Result<Vec<FleetVessel>, AdapterError> {
        warn!("Fleet tracker is unavailable");
        Ok(Vec::new())
    }
}

impl FcConfigurationSource for Unavailable {
    fn fc_configuration(&self, _owner_id: u64) -> Result<FcConfiguration, AdapterError> {
        Ok(FcConfiguration::default())
    }
}

impl Session for Unavailable {
    fn local_content_id(&self) -> Option<u64> {
        None
    }
}
