//! Tracked entities: players, retainers and free company chests.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// What kind of entity a [`Character`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CharacterType {
    /// A player character.
    Player,
    /// A retainer owned by a player.
    Retainer,
    /// The shared chest of a free company.
    FreeCompanyChest,
}

impl CharacterType {
    /// Value written to the `type` tag.
    ///
    /// Players are reported as `Character` so existing dashboards keep
    /// matching.
    pub fn as_str(&self) -> &'static str {
        match self {
            CharacterType::Player => "Character",
            CharacterType::Retainer => "Retainer",
            CharacterType::FreeCompanyChest => "FreeCompanyChest",
        }
    }
}

impl fmt::Display for CharacterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked entity.
///
/// Identity is the numeric id: equality, hashing and ordering ignore every
/// other field.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Character {
    /// Content id.
    pub character_id: u64,
    /// Discriminator.
    pub character_type: CharacterType,
    /// Owning player for retainers, 0 otherwise.
    #[cfg_attr(feature = "serde", serde(default))]
    pub owner_id: u64,
    /// Free company of a player, 0 when none or not tracked.
    #[cfg_attr(feature = "serde", serde(default))]
    pub free_company_id: u64,
    /// Home world id.
    pub world_id: u32,
    /// Display name.
    pub name: String,
    /// Current class/job row id, 0 when unknown.
    #[cfg_attr(feature = "serde", serde(default))]
    pub class_job: u8,
    /// Current level.
    #[cfg_attr(feature = "serde", serde(default))]
    pub level: u32,
}

impl Character {
    /// Create a player character.
    pub fn player(character_id: u64, name: impl Into<String>, world_id: u32) -> Self {
        Self {
            character_id,
            character_type: CharacterType::Player,
            owner_id: 0,
            free_company_id: 0,
            world_id,
            name: name.into(),
            class_job: 0,
            level: 0,
        }
    }

    /// Create a retainer owned by `owner_id`.
    pub fn retainer(
        character_id: u64,
        owner_id: u64,
        name: impl Into<String>,
        world_id: u32,
    ) -> Self {
        Self {
            owner_id,
            character_type: CharacterType::Retainer,
            ..Self::player(character_id, name, world_id)
        }
    }

    /// Create a free company chest.
    pub fn free_company(character_id: u64, name: impl Into<String>, world_id: u32) -> Self {
        Self {
            character_type: CharacterType::FreeCompanyChest,
            ..Self::player(character_id, name, world_id)
        }
    }

    /// Set the free company id.
    pub fn with_free_company(mut self, free_company_id: u64) -> Self {
        self.free_company_id = free_company_id;
        self
    }

    /// Set the class/job and level.
    pub fn with_class_job(mut self, class_job: u8, level: u32) -> Self {
        self.class_job = class_job;
        self.level = level;
        self
    }

    /// Whether this is a player character.
    pub fn is_player(&self) -> bool {
        self.character_type == CharacterType::Player
    }
}

impl PartialEq for Character {
    fn eq(&self, other: &Self) -> bool {
        self.character_id == other.character_id
    }
}

impl Eq for Character {}

impl Hash for Character {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.character_id.hash(state);
    }
}

impl PartialOrd for Character {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Character {
    fn cmp(&self, other: &Self) -> Ordering {
        self.character_id.cmp(&other.character_id)
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.character_type {
            CharacterType::FreeCompanyChest => "FC",
            other => other.as_str(),
        };
        write!(
            f,
            "Character[{}, {}, {}, {}]",
            self.character_id, kind, self.name, self.world_id
        )
    }
}
