//! # statwatch-adapters
//!
//! Source monitors and caches feeding the statwatch aggregator.
//!
//! Every provider of raw facts is modeled as a capability trait with two
//! kinds of implementation: a live one and [`Unavailable`], which returns
//! empty data so a missing provider degrades the snapshot instead of
//! failing it.
//!
//! ## Capabilities
//!
//! - [`CharacterSource`] - players, retainers and FC chests
//! - [`InventorySource`] - raw inventories, counted into currencies by [`count_currencies`]
//! - [`FilterSource`] - named inventory filters
//! - [`FleetSource`] - submersibles per free company
//! - [`FcConfigurationSource`] - per FC automation settings
//! - [`Session`] - who is logged in
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use statwatch_adapters::{CharacterSource, FileSource, Session, Sources};
//!
//! let source = Arc::new(FileSource::new("host-export.json"));
//! if source.poll() {
//!     println!("logged in: {}", source.is_logged_in());
//! }
//!
//! let sources = Sources::from_provider(source);
//! let characters = sources.characters.characters().unwrap();
//! println!("{} characters", characters.len());
//! ```

pub mod cache;
pub mod currencies;
pub mod error;
pub mod file;
pub mod source;
mod unavailable;

pub use cache::{CachedRecord, SharedStatsCache, StatsCache};
pub use currencies::count_currencies;
pub use error::AdapterError;
pub use file::{FileSource, HostExport};
pub use source::{
    CharacterSource, FcConfiguration, FcConfigurationSource, FilterSource, FleetSource,
    FleetVessel, Inventory, InventoryItem, InventorySource, Session, Sources, VesselBuild,
};
pub use unavailable::Unavailable;

// Re-export types for convenience
pub use statwatch_types::{Character, Currencies, FcStats, InventoryEntry, LocalStats};
