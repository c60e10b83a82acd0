//! Inventory filter results.

/// One item stack matched by a named inventory filter.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InventoryEntry {
    /// Character (player, retainer or FC chest) holding the stack.
    pub local_content_id: u64,
    pub item_id: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_hq: bool,
    pub quantity: i32,
}

impl InventoryEntry {
    pub fn new(local_content_id: u64, item_id: u32, is_hq: bool, quantity: i32) -> Self {
        Self {
            local_content_id,
            item_id,
            is_hq,
            quantity,
        }
    }
}
