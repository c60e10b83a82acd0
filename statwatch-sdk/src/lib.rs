//! # statwatch-sdk
//!
//! Turns character statistics into time-series points and ships them to
//! InfluxDB or QuestDB.
//!
//! Each cycle the [`StatisticsAggregator`] merges the sources into a
//! [`StatisticsUpdate`], the [`PointGenerator`] expands it into
//! [`Measurement`]s, and the [`ClientManager`] hands those to the active
//! [`StatisticsClient`] on a background task.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use statwatch_adapters::{FcStats, FileSource, LocalStats, Sources, StatsCache};
//! use statwatch_sdk::{
//!     ClientManager, Configuration, GameData, LogNotifier, PointGenerator,
//!     StatisticsAggregator, StatisticsService,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let configuration = Configuration::default().shared();
//!     let source = Arc::new(FileSource::new("host-export.json"));
//!     source.poll();
//!
//!     let aggregator = StatisticsAggregator::new(
//!         Sources::from_provider(source.clone()),
//!         configuration.clone(),
//!         StatsCache::<LocalStats>::load("cache").shared(),
//!         StatsCache::<FcStats>::load("cache").shared(),
//!     );
//!     let generator = PointGenerator::new(Arc::new(GameData::load("sheets.json")?));
//!     let manager = Arc::new(ClientManager::new(
//!         configuration.clone(),
//!         generator,
//!         Arc::new(LogNotifier),
//!     ));
//!
//!     let service = Arc::new(StatisticsService::new(aggregator, manager, source, configuration));
//!     let schedule = service.start(Duration::from_secs(60));
//!
//!     tokio::signal::ctrl_c().await?;
//!     schedule.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `influxdb` (default): InfluxDB v2 HTTP client
//! - `questdb` (default): QuestDB client over HTTP or TCP

pub mod aggregator;
pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
pub mod game_data;
pub mod line_protocol;
pub mod manager;
pub mod notifier;
pub mod points;
pub mod service;

#[cfg(feature = "influxdb")]
pub mod influxdb;

#[cfg(feature = "questdb")]
pub mod questdb;

#[cfg(test)]
mod testing;

pub use aggregator::{AggregationError, StatisticsAggregator};
pub use cancel::{CancellationSource, CancellationToken};
pub use client::{publish, StatisticsClient};
pub use config::{
    CharacterInfo, Configuration, FilterInfo, RemoteType, ServerConfiguration,
    SharedConfiguration,
};
pub use error::{BackendError, ConnectionStatus, TestError};
pub use game_data::{GameData, GameSheets, PriceInfo};
pub use line_protocol::{EncodeError, LineEncoder};
pub use manager::{create_client, ClientFactory, ClientManager};
pub use notifier::{LogNotifier, Notifier};
pub use points::PointGenerator;
pub use service::{ScheduleHandle, StatisticsService};

#[cfg(feature = "influxdb")]
pub use influxdb::InfluxDbClient;

#[cfg(feature = "questdb")]
pub use questdb::QuestDbClient;

// Re-export types for convenience
pub use statwatch_types::{Measurement, StatisticsUpdate};
