//! Currency counting from raw inventories.

use std::collections::{BTreeMap, HashMap};

use statwatch_types::{Character, Currencies};

use crate::source::{Inventory, InventoryItem};

pub const GIL: u32 = 1;
pub const SEALS_MAELSTROM: u32 = 20;
pub const SEALS_TWIN_ADDERS: u32 = 21;
pub const SEALS_IMMORTAL_FLAMES: u32 = 22;
pub const VENTURES: u32 = 21072;
pub const CERULEUM_TANKS: u32 = 10155;
pub const REPAIR_KITS: u32 = 10373;

/// Slots in the four main bags.
pub const MAIN_INVENTORY_SLOTS: i32 = 140;

/// Sorted category of the player's main bags.
const MAIN_INVENTORY_CATEGORY: i32 = 1;

/// Count currencies for every character that has inventory data.
///
/// Inventories of unknown characters are ignored. Several inventories of the
/// same character are summed.
pub fn count_currencies(
    characters: &[Character],
    inventories: &[Inventory],
) -> BTreeMap<Character, Currencies> {
    let by_id: HashMap<u64, &Character> = characters.iter().map(|c| (c.character_id, c)).collect();

    let mut grouped: BTreeMap<Character, Vec<&InventoryItem>> = BTreeMap::new();
    for inventory in inventories {
        if let Some(character) = by_id.get(&inventory.character_id) {
            grouped
                .entry((*character).clone())
                .or_default()
                .extend(inventory.items.iter());
        }
    }

    grouped
        .into_iter()
        .map(|(character, items)| {
            let currencies = tally(&items);
            (character, currencies)
        })
        .collect()
}

fn tally(items: &[&InventoryItem]) -> Currencies {
    let sum = |item_id: u32| -> i64 {
        items
            .iter()
            .filter(|i| i.item_id == item_id)
            .map(|i| i64::from(i.quantity))
            .sum()
    };
    let used = items
        .iter()
        .filter(|i| i.category == MAIN_INVENTORY_CATEGORY && i.item_id != 0)
        .count();

    Currencies {
        gil: sum(GIL),
        gc_seals_maelstrom: sum(SEALS_MAELSTROM),
        gc_seals_twin_adders: sum(SEALS_TWIN_ADDERS),
        gc_seals_immortal_flames: sum(SEALS_IMMORTAL_FLAMES),
        fc_credits: 0,
        ventures: sum(VENTURES),
        ceruleum_tanks: sum(CERULEUM_TANKS),
        repair_kits: sum(REPAIR_KITS),
        free_slots: MAIN_INVENTORY_SLOTS - i32::try_from(used).unwrap_or(MAIN_INVENTORY_SLOTS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(category: i32, item_id: u32, quantity: u32) -> InventoryItem {
        InventoryItem {
            category,
            container: 0,
            item_id,
            quantity,
        }
    }

    #[test]
    fn counts_currency_items_and_free_slots() {
        let player = Character::player(1, "Alpha", 33);
        let inventory = Inventory {
            character_id: 1,
            items: vec![
                item(0, GIL, 500),
                item(0, SEALS_TWIN_ADDERS, 1200),
                item(1, VENTURES, 3),
                item(1, CERULEUM_TANKS, 40),
                item(1, 4711, 1),
                item(2, REPAIR_KITS, 7),
            ],
        };

        let counted = count_currencies(&[player.clone()], &[inventory]);
        let currencies = counted[&player];

        assert_eq!(currencies.gil, 500);
        assert_eq!(currencies.gc_seals_twin_adders, 1200);
        assert_eq!(currencies.gc_seals_maelstrom, 0);
        assert_eq!(currencies.ventures, 3);
        assert_eq!(currencies.ceruleum_tanks, 40);
        assert_eq!(currencies.repair_kits, 7);
        assert_eq!(currencies.free_slots, 137);
    }

    #[test]
    fn unknown_characters_are_skipped_and_duplicates_summed() {
        let player = Character::player(1, "Alpha", 33);
        let inventories = vec![
            Inventory {
                character_id: 1,
                items: vec![item(0, GIL, 100)],
            },
            Inventory {
                character_id: 1,
                items: vec![item(0, GIL, 50)],
            },
            Inventory {
                character_id: 99,
                items: vec![item(0, GIL, 1)],
            },
        ];

        let counted = count_currencies(&[player.clone()], &inventories);
        assert_eq!(counted.len(), 1);
        assert_eq!(counted[&player].gil, 150);
        assert_eq!(counted[&player].free_slots, MAIN_INVENTORY_SLOTS);
    }

    #[test]
    fn empty_bag_slots_are_free() {
        let player = Character::player(1, "Alpha", 33);
        let mut items: Vec<InventoryItem> = (0..137).map(|_| item(1, 0, 0)).collect();
        items.push(item(1, 4711, 1));
        items.push(item(1, 4712, 3));
        items.push(item(1, VENTURES, 12));

        let counted = count_currencies(&[player.clone()], &[Inventory { character_id: 1, items }]);
        assert_eq!(counted[&player].free_slots, 137);
        assert_eq!(counted[&player].ventures, 12);
    }

    #[test]
    fn all_empty_bag_slots_leave_every_slot_free() {
        let player = Character::player(1, "Alpha", 33);
        let items = (0..MAIN_INVENTORY_SLOTS).map(|_| item(1, 0, 0)).collect();

        let counted = count_currencies(&[player.clone()], &[Inventory { character_id: 1, items }]);
        assert_eq!(counted[&player].free_slots, MAIN_INVENTORY_SLOTS);
    }
}
