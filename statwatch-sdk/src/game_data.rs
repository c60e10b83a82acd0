//! Read-only lookup tables from numeric game ids to names and prices.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use statwatch_adapters::AdapterError;

/// Row id of Summoner, which shares its exp slot with Arcanist and Scholar.
const SUMMONER: u32 = 27;

/// One row of the class/job sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassJobRow {
    pub row_id: u32,
    #[serde(default)]
    pub name: String,
    pub abbreviation: String,
    /// Slot in the per-character level array, negative when none.
    pub exp_array_index: i8,
    #[serde(default)]
    pub job_index: u8,
    /// Index among crafters and gatherers, negative for combat classes.
    #[serde(default = "no_index")]
    pub doh_dol_job_index: i8,
}

fn no_index() -> i8 {
    -1
}

/// One row of the item sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRow {
    pub row_id: u32,
    pub name: String,
    /// Vendor sell price of the normal quality item.
    #[serde(default)]
    pub price_low: u32,
    #[serde(default)]
    pub ui_category: u32,
}

/// One row of the world sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldRow {
    pub row_id: u32,
    pub name: String,
    #[serde(default)]
    pub is_public: bool,
}

/// Raw sheets as exported from the game files.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSheets {
    pub class_jobs: Vec<ClassJobRow>,
    pub items: Vec<ItemRow>,
    pub worlds: Vec<WorldRow>,
}

/// Name and price tier of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceInfo {
    pub name: String,
    pub normal: u32,
    pub ui_category: u32,
}

impl PriceInfo {
    /// High quality price: normal plus a tenth, rounded up.
    pub fn hq(&self) -> u32 {
        self.normal.saturating_add(self.normal.div_ceil(10))
    }
}

/// A job with its own slot in the level array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassJobDetail {
    pub abbreviation: String,
    pub is_non_combat: bool,
}

impl ClassJobDetail {
    /// Value of the `job_type` tag.
    pub fn job_type(&self) -> &'static str {
        if self.is_non_combat {
            "doh_dol"
        } else {
            "combat"
        }
    }
}

/// Lookup tables used by the point generator.
#[derive(Debug, Clone, Default)]
pub struct GameData {
    class_job_to_array_index: HashMap<u8, i8>,
    class_job_names: HashMap<u8, String>,
    exp_to_jobs: BTreeMap<i8, ClassJobDetail>,
    prices: HashMap<u32, PriceInfo>,
    world_names: HashMap<u32, String>,
}

impl GameData {
    /// Build the lookup tables from raw sheets.
    pub fn from_sheets(sheets: &GameSheets) -> Self {
        let mut data = GameData::default();

        for row in sheets.class_jobs.iter().filter(|r| r.row_id > 0) {
            let Ok(class_job) = u8::try_from(row.row_id) else {
                continue;
            };
            data.class_job_to_array_index
                .insert(class_job, row.exp_array_index);
            data.class_job_names
                .insert(class_job, row.abbreviation.clone());

            let has_exp_slot = !row.name.is_empty()
                && (row.job_index > 0 || row.doh_dol_job_index >= 0)
                && row.row_id != SUMMONER;
            if has_exp_slot {
                data.exp_to_jobs
                    .entry(row.exp_array_index)
                    .or_insert_with(|| ClassJobDetail {
                        abbreviation: row.abbreviation.clone(),
                        is_non_combat: row.doh_dol_job_index >= 0,
                    });
            }
        }

        data.prices = sheets
            .items
            .iter()
            .map(|row| {
                let info = PriceInfo {
                    name: row.name.clone(),
                    normal: row.price_low,
                    ui_category: row.ui_category,
                };
                (row.row_id, info)
            })
            .collect();

        data.world_names = sheets
            .worlds
            .iter()
            .filter(|w| w.row_id > 0 && w.is_public)
            .map(|w| (w.row_id, w.name.clone()))
            .collect();

        data
    }

    /// Load sheets from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AdapterError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let sheets: GameSheets = serde_json::from_str(&content)?;
        debug!(
            "Loaded game data from {}: {} class jobs, {} items, {} worlds",
            path.display(),
            sheets.class_jobs.len(),
            sheets.items.len(),
            sheets.worlds.len()
        );
        Ok(Self::from_sheets(&sheets))
    }

    /// Level array slot of a class/job, `None` if it has none.
    pub fn exp_array_index(&self, class_job: u8) -> Option<usize> {
        self.class_job_to_array_index
            .get(&class_job)
            .and_then(|&i| usize::try_from(i).ok())
    }

    /// Class/job abbreviation, or the numeric id when unknown.
    pub fn class_job_name(&self, class_job: u8) -> String {
        self.class_job_names
            .get(&class_job)
            .cloned()
            .unwrap_or_else(|| class_job.to_string())
    }

    /// Jobs with a level slot, ordered by slot.
    pub fn exp_to_jobs(&self) -> impl Iterator<Item = (usize, &ClassJobDetail)> {
        self.exp_to_jobs
            .iter()
            .filter_map(|(&i, job)| usize::try_from(i).ok().map(|i| (i, job)))
    }

    pub fn price(&self, item_id: u32) -> Option<&PriceInfo> {
        self.prices.get(&item_id)
    }

    /// World name, or the numeric id when the world is unknown or not public.
    pub fn world_name(&self, world_id: u32) -> String {
        self.world_names
            .get(&world_id)
            .cloned()
            .unwrap_or_else(|| world_id.to_string())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn class_job(
        row_id: u32,
        name: &str,
        abbreviation: &str,
        exp_array_index: i8,
        job_index: u8,
        doh_dol_job_index: i8,
    ) -> ClassJobRow {
        ClassJobRow {
            row_id,
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            exp_array_index,
            job_index,
            doh_dol_job_index,
        }
    }

    /// A small but realistic slice of the game sheets.
    pub(crate) fn sample_sheets() -> GameSheets {
        GameSheets {
            class_jobs: vec![
                class_job(0, "adventurer", "ADV", -1, 0, -1),
                class_job(1, "gladiator", "GLA", 1, 0, -1),
                class_job(8, "carpenter", "CRP", 7, 0, 0),
                class_job(16, "miner", "MIN", 15, 0, 8),
                class_job(19, "paladin", "PLD", 1, 1, -1),
                class_job(26, "arcanist", "ACN", 18, 0, -1),
                class_job(27, "summoner", "SMN", 18, 2, -1),
                class_job(28, "scholar", "SCH", 18, 3, -1),
            ],
            items: vec![
                ItemRow {
                    row_id: 5111,
                    name: "Fire Crystal".to_string(),
                    price_low: 1,
                    ui_category: 59,
                },
                ItemRow {
                    row_id: 5604,
                    name: "Savage Aim Materia X".to_string(),
                    price_low: 95,
                    ui_category: 58,
                },
                ItemRow {
                    row_id: 4850,
                    name: "Honey".to_string(),
                    price_low: 10,
                    ui_category: 46,
                },
            ],
            worlds: vec![
                WorldRow {
                    row_id: 33,
                    name: "Twintania".to_string(),
                    is_public: true,
                },
                WorldRow {
                    row_id: 3,
                    name: "Test".to_string(),
                    is_public: false,
                },
            ],
        }
    }

    #[test]
    fn test_exp_to_jobs_skips_base_classes_and_summoner() {
        let data = GameData::from_sheets(&sample_sheets());
        let jobs: Vec<_> = data
            .exp_to_jobs()
            .map(|(i, j)| (i, j.abbreviation.as_str(), j.job_type()))
            .collect();

        assert_eq!(
            jobs,
            vec![
                (1, "PLD", "combat"),
                (7, "CRP", "doh_dol"),
                (15, "MIN", "doh_dol"),
                (18, "SCH", "combat"),
            ]
        );
    }

    #[test]
    fn test_class_job_lookups() {
        let data = GameData::from_sheets(&sample_sheets());
        assert_eq!(data.exp_array_index(16), Some(15));
        assert_eq!(data.exp_array_index(0), None);
        assert_eq!(data.class_job_name(1), "GLA");
        assert_eq!(data.class_job_name(99), "99");
    }

    #[test]
    fn test_hq_price_rounds_up() {
        let price = |normal| PriceInfo {
            name: String::new(),
            normal,
            ui_category: 0,
        };
        assert_eq!(price(0).hq(), 0);
        assert_eq!(price(1).hq(), 2);
        assert_eq!(price(10).hq(), 11);
        assert_eq!(price(95).hq(), 105);
    }

    #[test]
    fn test_only_public_worlds_have_names() {
        let data = GameData::from_sheets(&sample_sheets());
        assert_eq!(data.world_name(33), "Twintania");
        assert_eq!(data.world_name(3), "3");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sheets.json");
        fs::write(&path, serde_json::to_string(&sample_sheets()).unwrap()).unwrap();

        let data = GameData::load(&path).unwrap();
        assert_eq!(data.price(5111).unwrap().name, "Fire Crystal");
        assert!(GameData::load(dir.path().join("missing.json")).is_err());
    }
}
