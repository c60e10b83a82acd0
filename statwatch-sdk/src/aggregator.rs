//! Merges every source into one [`StatisticsUpdate`] per cycle.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{debug, warn};

use statwatch_adapters::{
    count_currencies, AdapterError, FleetVessel, SharedStatsCache, Sources,
};
use statwatch_types::{
    Character, CharacterType, Currencies, FcStats, InventoryEntry, LocalStats,
    SingleSubmarineStats, StatisticsUpdate, SubmarineStats,
};

use crate::config::{Configuration, SharedConfiguration};

/// Failure while building a snapshot. The cycle is aborted.
#[derive(Debug, Error)]
pub enum AggregationError {
    /// A source reported an error instead of data.
    #[error("source failed: {0}")]
    Source(#[from] AdapterError),
}

/// Builds snapshots from the sources and the local caches.
#[derive(Debug, Clone)]
pub struct StatisticsAggregator {
    sources: Sources,
    configuration: SharedConfiguration,
    local_stats: SharedStatsCache<LocalStats>,
    fc_stats: SharedStatsCache<FcStats>,
}

impl StatisticsAggregator {
    pub fn new(
        sources: Sources,
        configuration: SharedConfiguration,
        local_stats: SharedStatsCache<LocalStats>,
        fc_stats: SharedStatsCache<FcStats>,
    ) -> Self {
        Self {
            sources,
            configuration,
            local_stats,
            fc_stats,
        }
    }

    /// Build the snapshot for this cycle.
    ///
    /// Returns `Ok(None)` when no character has inventory data, in which case
    /// there is nothing to publish.
    pub fn build_update(&self) -> Result<Option<StatisticsUpdate>, AggregationError> {
        let config = self.configuration.read().clone();

        let known = self.sources.characters.characters()?;
        let inventories = self.sources.inventories.inventories()?;
        let currencies =
            clear_excluded_free_companies(count_currencies(&known, &inventories), &config);

        let characters: Vec<Character> = currencies.keys().cloned().collect();
        if characters.is_empty() {
            warn!("Found 0 characters with inventory data");
            return Ok(None);
        }

        let inclusion = Inclusion::new(&config, &characters);

        let mut inventory_items = BTreeMap::new();
        for name in config.filter_names() {
            let entries: Vec<InventoryEntry> = self
                .sources
                .filters
                .filter(&name)?
                .unwrap_or_default()
                .into_iter()
                .filter(|e| inclusion.ids.contains(&e.local_content_id))
                .collect();
            inventory_items.insert(name, entries);
        }

        let submarines = self
            .submarine_stats(&characters)?
            .into_iter()
            .filter(|(fc, _)| inclusion.includes(fc))
            .collect();

        let local_stats = {
            let cache = self.local_stats.read();
            characters
                .iter()
                .filter(|c| inclusion.includes(c))
                .filter_map(|c| {
                    cache
                        .get(c.character_id)
                        .map(|stats| (c.clone(), stats.clone()))
                })
                .collect()
        };

        let fc_stats = {
            let cache = self.fc_stats.read();
            cache
                .entries()
                .iter()
                .filter(|(id, _)| inclusion.free_companies.contains(id))
                .map(|(id, stats)| (*id, stats.clone()))
                .collect()
        };

        let update = StatisticsUpdate {
            currencies: currencies
                .into_iter()
                .filter(|(c, _)| inclusion.includes(c))
                .collect(),
            inventory_items,
            submarines,
            local_stats,
            fc_stats,
        };

        debug!(
            "Built statistics update with {} characters, {} fleets, {} local stats",
            update.currencies.len(),
            update.submarines.len(),
            update.local_stats.len()
        );
        Ok(Some(update))
    }

    /// Group fleet vessels by free company and apply the owner's settings.
    fn submarine_stats(
        &self,
        characters: &[Character],
    ) -> Result<BTreeMap<Character, SubmarineStats>, AggregationError> {
        let mut fleets: BTreeMap<u64, Vec<FleetVessel>> = BTreeMap::new();
        for vessel in self.sources.fleet.vessels()? {
            fleets.entry(vessel.free_company_id).or_default().push(vessel);
        }

        let mut result = BTreeMap::new();
        for (fc_id, vessels) in fleets {
            let Some(fc) = characters.iter().find(|c| {
                c.character_type == CharacterType::FreeCompanyChest && c.character_id == fc_id
            }) else {
                debug!("Skipping fleet of unknown free company {}", fc_id);
                continue;
            };

            let mut stats = SubmarineStats {
                submarines: vessels
                    .iter()
                    .enumerate()
                    .map(|(index, vessel)| to_submarine(fc, index, vessel))
                    .collect(),
                free_slots: 0,
            };

            if let Some(owner) = characters.iter().find(|c| c.free_company_id == fc_id) {
                let fc_config = self
                    .sources
                    .fc_configuration
                    .fc_configuration(owner.character_id)?;
                for sub in &mut stats.submarines {
                    sub.enabled = fc_config.enabled_submarines.contains(&sub.name);
                }
                stats.free_slots = fc_config.free_slots;
            }

            result.insert(fc.clone(), stats);
        }

        Ok(result)
    }
}

fn to_submarine(fc: &Character, index: usize, vessel: &FleetVessel) -> SingleSubmarineStats {
    SingleSubmarineStats {
        name: vessel.name.clone(),
        id: i32::try_from(index).unwrap_or(i32::MAX),
        world_id: fc.world_id,
        enabled: true,
        level: vessel.level,
        predicted_level: vessel.predicted_level(),
        hull: vessel.build.hull.clone(),
        stern: vessel.build.stern.clone(),
        bow: vessel.build.bow.clone(),
        bridge: vessel.build.bridge.clone(),
        build: vessel.build.full.clone(),
        state: vessel.state,
        return_time: vessel.return_time,
    }
}

/// Drop the free company of players that track it disabled.
///
/// Players without an allow-list entry keep their free company.
fn clear_excluded_free_companies(
    currencies: BTreeMap<Character, Currencies>,
    config: &Configuration,
) -> BTreeMap<Character, Currencies> {
    currencies
        .into_iter()
        .map(|(mut character, currencies)| {
            if character.is_player() && character.free_company_id != 0 {
                let include_fc = config
                    .character(character.character_id)
                    .map_or(true, |c| c.include_free_company);
                if !include_fc {
                    character.free_company_id = 0;
                }
            }
            (character, currencies)
        })
        .collect()
}

/// Which characters and free companies belong in this cycle's snapshot.
struct Inclusion {
    ids: BTreeSet<u64>,
    free_companies: BTreeSet<u64>,
}

impl Inclusion {
    fn new(config: &Configuration, characters: &[Character]) -> Self {
        let free_companies: BTreeSet<u64> = characters
            .iter()
            .filter(|c| c.is_player() && c.free_company_id != 0)
            .filter(|c| config.includes_free_company(c.character_id))
            .map(|c| c.free_company_id)
            .collect();

        let ids = characters
            .iter()
            .filter(|c| {
                config.is_included(c.character_id)
                    || (c.owner_id != 0 && config.is_included(c.owner_id))
                    || free_companies.contains(&c.character_id)
            })
            .map(|c| c.character_id)
            .collect();

        Self {
            ids,
            free_companies,
        }
    }

    fn includes(&self, character: &Character) -> bool {
        self.ids.contains(&character.character_id)
    }
}
