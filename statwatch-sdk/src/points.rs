//! Turns a [`StatisticsUpdate`] into measurements.
//!
//! Generation is pure: the same update, configuration and timestamp always
//! produce the same points in the same order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use statwatch_types::{
    Character, CharacterType, Currencies, Measurement, StatisticsUpdate, SubmarineStats,
};

use crate::config::Configuration;
use crate::game_data::GameData;

/// Item UI category of materia, which is only ever priced at the HQ tier.
pub const MATERIA_UI_CATEGORY: u32 = 58;

/// Seal cap for a grand company rank.
///
/// Ranks 1 to 11 map to 10k through 90k, anything else has no cap.
pub fn seal_cap(gc_rank: u8) -> u32 {
    match gc_rank {
        1 => 10_000,
        2 => 15_000,
        3 => 20_000,
        4 => 25_000,
        5 => 30_000,
        6 => 35_000,
        7 => 40_000,
        8 => 45_000,
        9 => 50_000,
        10 => 80_000,
        11 => 90_000,
        _ => 0,
    }
}

/// Generates measurements from snapshots.
#[derive(Debug, Clone)]
pub struct PointGenerator {
    game_data: Arc<GameData>,
}

impl PointGenerator {
    pub fn new(game_data: Arc<GameData>) -> Self {
        Self { game_data }
    }

    /// Generate every point of one cycle, all stamped with `time`.
    pub fn generate(
        &self,
        update: &StatisticsUpdate,
        config: &Configuration,
        time: DateTime<Utc>,
    ) -> Vec<Measurement> {
        let valid_fc_ids: BTreeSet<u64> = update
            .currencies
            .keys()
            .filter(|c| c.is_player() && config.includes_free_company(c.character_id))
            .map(|c| c.free_company_id)
            .collect();

        let mut points = Vec::new();
        for (character, currencies) in &update.currencies {
            match character.character_type {
                CharacterType::Player => {
                    self.player_points(character, currencies, update, config, time, &mut points)
                }
                CharacterType::Retainer => {
                    self.retainer_points(character, currencies, update, time, &mut points)
                }
                CharacterType::FreeCompanyChest
                    if valid_fc_ids.contains(&character.character_id) =>
                {
                    self.free_company_points(character, currencies, update, time, &mut points)
                }
                CharacterType::FreeCompanyChest => {}
            }
        }

        for (fc, subs) in &update.submarines {
            if valid_fc_ids.contains(&fc.character_id) {
                self.submarine_points(fc, subs, time, &mut points);
            }
        }

        points
    }

    fn player_points(
        &self,
        character: &Character,
        currencies: &Currencies,
        update: &StatisticsUpdate,
        config: &Configuration,
        time: DateTime<Utc>,
        points: &mut Vec<Measurement>,
    ) {
        let local_stats = update.local_stats.get(character);
        let include_fc = character.free_company_id > 0
            && config.includes_free_company(character.character_id);

        let template = Measurement::new("character")
            .tag("id", character.character_id.to_string())
            .tag("player_name", character.name.as_str())
            .tag("world", self.game_data.world_name(character.world_id))
            .tag("type", character.character_type.as_str())
            .optional_tag("fc_id", include_fc.then(|| character.free_company_id.to_string()))
            .timestamp(time);

        points.push(
            template
                .named("currency")
                .field("gil", local_stats.map_or(0, |s| s.gil))
                .field("mgp", local_stats.map_or(0, |s| s.mgp))
                .field("ventures", currencies.ventures)
                .field("ceruleum_tanks", currencies.ceruleum_tanks)
                .field("repair_kits", currencies.repair_kits)
                .field("free_inventory", currencies.free_slots),
        );

        if let Some(stats) = local_stats {
            points.push(
                template
                    .named("grandcompany")
                    .field("gc", stats.grand_company)
                    .field("gc_rank", stats.gc_rank)
                    .field("seals", currencies.seals_for(stats.grand_company))
                    .field("seal_cap", seal_cap(stats.gc_rank))
                    .field("squadron_unlocked", stats.squadron_unlocked),
            );

            if !stats.class_job_levels.is_empty() {
                for (exp_index, job) in self.game_data.exp_to_jobs() {
                    // Older records predate the newest jobs.
                    let Some(level) = stats.level_at(exp_index) else {
                        continue;
                    };
                    if level > 0 {
                        points.push(
                            template
                                .named("experience")
                                .tag("job", job.abbreviation.as_str())
                                .tag("job_type", job.job_type())
                                .field("level", level),
                        );
                    }
                }
            }

            if stats.has_msq_progress() {
                points.push(
                    template
                        .named("quests")
                        .optional_tag("msq_name", stats.msq_name.clone())
                        .field("msq_count", stats.msq_count)
                        .field("msq_genre", stats.msq_genre),
                );
            }
        }

        self.inventory_points(character.character_id, update, &template, points);
    }

    fn retainer_points(
        &self,
        character: &Character,
        currencies: &Currencies,
        update: &StatisticsUpdate,
        time: DateTime<Utc>,
        points: &mut Vec<Measurement>,
    ) {
        let owner = update
            .currencies
            .keys()
            .find(|c| c.character_id == character.owner_id);

        let template = Measurement::new("retainer")
            .tag("id", character.character_id.to_string())
            .optional_tag("player_name", owner.map(|o| o.name.clone()))
            .tag("player_id", character.owner_id.to_string())
            .tag("world", self.game_data.world_name(character.world_id))
            .tag("type", character.character_type.as_str())
            .tag("retainer_name", character.name.as_str())
            .timestamp(time);

        points.push(
            template
                .named("currency")
                .field("gil", currencies.gil)
                .field("ceruleum_tanks", currencies.ceruleum_tanks)
                .field("repair_kits", currencies.repair_kits),
        );

        let owner_stats = owner
            .and_then(|o| update.local_stats.get(o))
            .filter(|_| character.class_job != 0);
        if let Some(stats) = owner_stats {
            let recorded = self
                .game_data
                .exp_array_index(character.class_job)
                .and_then(|i| stats.level_at(i));
            let level = i64::from(character.level);
            let max_level = i64::from(stats.max_level);

            points.push(
                template
                    .named("retainer")
                    .tag("class", self.game_data.class_job_name(character.class_job))
                    .field("level", character.level)
                    .field("is_max_level", level == max_level)
                    .field(
                        "can_reach_max_level",
                        recorded.is_some_and(|r| i64::from(r) == max_level),
                    )
                    .field(
                        "levels_before_cap",
                        recorded.map_or(0, |r| i64::from(r) - level),
                    ),
            );
        }

        self.inventory_points(character.character_id, update, &template, points);
    }

    fn free_company_points(
        &self,
        character: &Character,
        currencies: &Currencies,
        update: &StatisticsUpdate,
        time: DateTime<Utc>,
        points: &mut Vec<Measurement>,
    ) {
        let fc_stats = update.fc_stats.get(&character.character_id);

        let template = Measurement::new("free_company")
            .tag("id", character.character_id.to_string())
            .tag("fc_name", character.name.as_str())
            .tag("world", self.game_data.world_name(character.world_id))
            .tag("type", character.character_type.as_str())
            .timestamp(time);

        points.push(
            template
                .named("currency")
                .field("gil", currencies.gil)
                .field("fccredit", fc_stats.map_or(0, |s| s.fc_credits))
                .field("ceruleum_tanks", currencies.ceruleum_tanks)
                .field("repair_kits", currencies.repair_kits),
        );

        self.inventory_points(character.character_id, update, &template, points);
    }

    /// One `items` point per (item, hq) stack group held by `local_content_id`.
    fn inventory_points(
        &self,
        local_content_id: u64,
        update: &StatisticsUpdate,
        template: &Measurement,
        points: &mut Vec<Measurement>,
    ) {
        for (filter_name, entries) in &update.inventory_items {
            let mut groups: BTreeMap<(u32, bool), i64> = BTreeMap::new();
            for entry in entries.iter().filter(|e| e.local_content_id == local_content_id) {
                *groups.entry((entry.item_id, entry.is_hq)).or_default() +=
                    i64::from(entry.quantity);
            }

            for ((item_id, is_hq), quantity) in groups {
                let price = self.game_data.price(item_id);
                let price_hq = is_hq || price.is_some_and(|p| p.ui_category == MATERIA_UI_CATEGORY);
                let unit_price = price.map_or(0, |p| if price_hq { p.hq() } else { p.normal });

                points.push(
                    template
                        .named("items")
                        .tag("filter_name", filter_name.as_str())
                        .tag("item_id", item_id.to_string())
                        .optional_tag("item_name", price.map(|p| p.name.clone()))
                        .tag("hq", if is_hq { "1" } else { "0" })
                        .field("quantity", quantity)
                        .field("total_gil", quantity.saturating_mul(i64::from(unit_price))),
                );
            }
        }
    }

    fn submarine_points(
        &self,
        fc: &Character,
        subs: &SubmarineStats,
        time: DateTime<Utc>,
        points: &mut Vec<Measurement>,
    ) {
        let template = Measurement::new("submersibles")
            .tag("id", fc.character_id.to_string())
            .tag("world", self.game_data.world_name(fc.world_id))
            .tag("fc_name", fc.name.as_str())
            .timestamp(time);

        for sub in &subs.submarines {
            points.push(
                template
                    .tag("sub_id", format!("{}_{}", fc.character_id, sub.id))
                    .tag("sub_name", sub.name.as_str())
                    .tag("part_hull", sub.hull.as_str())
                    .tag("part_stern", sub.stern.as_str())
                    .tag("part_bow", sub.bow.as_str())
                    .tag("part_bridge", sub.bridge.as_str())
                    .tag("build", sub.build.as_str())
                    .field("enabled", sub.enabled)
                    .field("level", sub.level)
                    .field("predicted_level", sub.predicted_level)
                    .field("state", sub.state.code())
                    .field("return_time", sub.return_time.timestamp()),
            );
        }

        points.push(
            template
                .named("unbuilt_submersibles")
                .field("free_slots", subs.free_slots),
        );
    }
}
