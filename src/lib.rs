//! # statwatch
//!
//! Publishes character statistics to a time-series database.
//!
//! The binary polls a JSON export written by the game client host, keeps the
//! progression caches up to date and runs a statistics cycle on a fixed
//! interval. Everything is configured through a TOML file with environment
//! overrides, see [`settings`].
//!
//! ```text
//!  host export ──▶ FileSource ──▶ StatisticsAggregator ──▶ PointGenerator
//!                      │                   ▲                     │
//!                      ▼                   │                     ▼
//!                 StatsCache ──────────────┘              ClientManager ──▶ InfluxDB / QuestDB
//! ```
//!
//! ## Usage
//!
//! ```bash
//! STATWATCH_CONFIG=statwatch.toml \
//! STATWATCH__STATISTICS__SERVER__TOKEN=secret \
//! RUST_LOG=statwatch=debug statwatch
//! ```

pub mod app;
pub mod settings;

pub use app::App;
pub use settings::{HostSettings, Settings};
