//! StatisticsUpdate - the aggregated snapshot of one cycle.

use std::collections::BTreeMap;

use crate::{Character, Currencies, FcStats, InventoryEntry, LocalStats, SubmarineStats};

/// Everything known about the tracked characters at one point in time.
///
/// Built once per cycle by the aggregator, handed to the point generator and
/// then dropped. All maps only ever contain characters the configuration
/// includes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatisticsUpdate {
    /// Currency counts of every included character.
    pub currencies: BTreeMap<Character, Currencies>,
    /// Filter name to the matching item stacks.
    pub inventory_items: BTreeMap<String, Vec<InventoryEntry>>,
    /// Fleets keyed by their free company chest.
    pub submarines: BTreeMap<Character, SubmarineStats>,
    /// Progression of included players.
    pub local_stats: BTreeMap<Character, LocalStats>,
    /// Free company credits keyed by free company id.
    pub fc_stats: BTreeMap<u64, FcStats>,
}

impl StatisticsUpdate {
    /// Whether no source contributed anything.
    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
            && self.inventory_items.values().all(Vec::is_empty)
            && self.submarines.is_empty()
            && self.local_stats.is_empty()
            && self.fc_stats.is_empty()
    }

    /// Look up a character in the currency map by id.
    pub fn character(&self, character_id: u64) -> Option<&Character> {
        self.currencies
            .keys()
            .find(|c| c.character_id == character_id)
    }

    /// Every id used as a key (or entry owner) in any map.
    pub fn referenced_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .currencies
            .keys()
            .chain(self.submarines.keys())
            .chain(self.local_stats.keys())
            .map(|c| c.character_id)
            .chain(self.fc_stats.keys().copied())
            .chain(
                self.inventory_items
                    .values()
                    .flatten()
                    .map(|e| e.local_content_id),
            )
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
