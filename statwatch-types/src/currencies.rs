//! Per-character currency counts.

/// Currency and consumable counts for one character.
///
/// Always zero-filled for any character that has inventory data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Currencies {
    pub gil: i64,
    pub gc_seals_maelstrom: i64,
    pub gc_seals_twin_adders: i64,
    pub gc_seals_immortal_flames: i64,
    pub fc_credits: i64,
    pub ventures: i64,
    pub ceruleum_tanks: i64,
    pub repair_kits: i64,
    pub free_slots: i32,
}

impl Currencies {
    /// Seals held for a grand company id (1 Maelstrom, 2 Twin Adder,
    /// 3 Immortal Flames). Any other id has no seals.
    pub fn seals_for(&self, grand_company: u8) -> i64 {
        match grand_company {
            1 => self.gc_seals_maelstrom,
            2 => self.gc_seals_twin_adders,
            3 => self.gc_seals_immortal_flames,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seals_follow_grand_company() {
        let c = Currencies {
            gc_seals_maelstrom: 1,
            gc_seals_twin_adders: 2,
            gc_seals_immortal_flames: 3,
            ..Default::default()
        };
        assert_eq!(c.seals_for(0), 0);
        assert_eq!(c.seals_for(1), 1);
        assert_eq!(c.seals_for(2), 2);
        assert_eq!(c.seals_for(3), 3);
        assert_eq!(c.seals_for(4), 0);
    }
}
