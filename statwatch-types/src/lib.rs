//! # statwatch-types
//!
//! Core types for character statistics telemetry. This crate defines the
//! per-cycle snapshot that the aggregator produces and the immutable
//! [`Measurement`] builder that every backend encodes.
//!
//! ## Design Goals
//!
//! - **Identity by id**: [`Character`] compares, hashes and orders by its numeric id only
//! - **Immutable points**: [`Measurement`] mutators return new values sharing unchanged maps
//! - **Backend agnostic**: nothing here knows about a wire protocol
//! - **Optional serialization**: enable the `serde` feature for the cached records
//!
//! ## Example
//!
//! ```rust
//! use statwatch_types::Measurement;
//!
//! let template = Measurement::new("currency")
//!     .tag("id", "1001")
//!     .tag("world", "Twintania");
//!
//! let player = template.field("gil", 500_i64).field("ventures", 3_u32);
//! let retainer = template.tag("type", "Retainer").field("gil", 20_i64);
//!
//! // The template is untouched by either branch.
//! assert_eq!(template.tags().count(), 2);
//! assert_eq!(player.int_field("gil"), Some(500));
//! assert_eq!(retainer.tag_value("type"), Some("Retainer"));
//! assert_eq!(player.tag_value("type"), None);
//! ```

mod character;
mod currencies;
mod inventory;
mod measurement;
mod stats;
mod submarine;
mod update;

pub use character::*;
pub use currencies::*;
pub use inventory::*;
pub use measurement::*;
pub use stats::*;
pub use submarine::*;
pub use update::*;
