//! Locally computed progression records, cached on disk between sessions.

/// Progression snapshot of one player character.
///
/// Serialized with PascalCase keys; this is the format of the `l.*.json`
/// cache files.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "PascalCase"))]
pub struct LocalStats {
    pub content_id: u64,
    pub grand_company: u8,
    pub gc_rank: u8,
    pub squadron_unlocked: bool,
    pub max_level: u8,
    /// Levels indexed by exp array slot.
    pub class_job_levels: Vec<i16>,
    pub starting_town: u8,
    /// Main scenario quests completed, -1 when unknown.
    pub msq_count: i32,
    pub msq_name: Option<String>,
    pub msq_genre: u32,
    pub gil: i32,
    #[cfg_attr(feature = "serde", serde(rename = "MGP"))]
    pub mgp: i32,
}

impl Default for LocalStats {
    fn default() -> Self {
        Self {
            content_id: 0,
            grand_company: 0,
            gc_rank: 0,
            squadron_unlocked: false,
            max_level: 90,
            class_job_levels: Vec::new(),
            starting_town: 0,
            msq_count: -1,
            msq_name: None,
            msq_genre: 0,
            gil: 0,
            mgp: 0,
        }
    }
}

impl LocalStats {
    /// Recorded level for an exp array slot.
    pub fn level_at(&self, exp_index: usize) -> Option<i16> {
        self.class_job_levels.get(exp_index).copied()
    }

    /// Whether main scenario progress is known.
    pub fn has_msq_progress(&self) -> bool {
        self.msq_count != -1
    }
}

/// Free company credit total, cached as `f.*.json`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "PascalCase"))]
pub struct FcStats {
    pub content_id: u64,
    pub fc_credits: i32,
}
