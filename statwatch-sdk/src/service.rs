//! Periodic statistics cycles.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! # use statwatch_sdk::StatisticsService;
//! # async fn run(service: Arc<StatisticsService>) {
//! let schedule = service.start(Duration::from_secs(60));
//! // ...
//! schedule.stop();
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace};

use statwatch_adapters::Session;
use statwatch_types::StatisticsUpdate;

use crate::aggregator::StatisticsAggregator;
use crate::config::SharedConfiguration;
use crate::manager::ClientManager;

/// Drives the aggregate, generate and publish cycle.
#[derive(Debug)]
pub struct StatisticsService {
    aggregator: StatisticsAggregator,
    manager: Arc<ClientManager>,
    session: Arc<dyn Session>,
    configuration: SharedConfiguration,
    cycle: Mutex<()>,
    latest: RwLock<Option<StatisticsUpdate>>,
}

impl StatisticsService {
    pub fn new(
        aggregator: StatisticsAggregator,
        manager: Arc<ClientManager>,
        session: Arc<dyn Session>,
        configuration: SharedConfiguration,
    ) -> Self {
        Self {
            aggregator,
            manager,
            session,
            configuration,
            cycle: Mutex::new(()),
            latest: RwLock::new(None),
        }
    }

    pub fn manager(&self) -> &Arc<ClientManager> {
        &self.manager
    }

    /// The snapshot built by the last successful cycle.
    pub fn latest_update(&self) -> Option<StatisticsUpdate> {
        self.latest.read().clone()
    }

    /// Run one cycle. Cycles never overlap.
    ///
    /// Returns the delivery task when something was published.
    pub fn run_cycle(&self) -> Option<JoinHandle<()>> {
        let _guard = self.cycle.lock();

        let Some(local_content_id) = self.session.local_content_id() else {
            trace!("Not logged in, skipping statistics cycle");
            return None;
        };
        if !self.configuration.read().is_included(local_content_id) {
            trace!("Character {} is not included, skipping statistics cycle", local_content_id);
            return None;
        }

        let update = match self.aggregator.build_update() {
            Ok(Some(update)) => update,
            Ok(None) => return None,
            Err(e) => {
                error!("Failed to update statistics: {}", e);
                return None;
            }
        };

        let delivery = if update.is_empty() {
            debug!("Statistics update is empty, nothing to publish");
            None
        } else {
            debug!(
                "Statistics update: {} characters, {} filters, {} fleets",
                update.currencies.len(),
                update.inventory_items.len(),
                update.submarines.len()
            );
            self.manager.on_statistics_update(&update, local_content_id)
        };
        *self.latest.write() = Some(update);
        delivery
    }

    /// Run cycles every `interval` on a background task.
    pub fn start(self: &Arc<Self>, interval: Duration) -> ScheduleHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let service = self.clone();

        let task = tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            let mut stop_rx = stop_rx;

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        service.run_cycle();
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            debug!("Statistics schedule stopped");
        });

        ScheduleHandle { stop_tx, task }
    }

    /// Allow-list the character that just logged in, if auto-enrollment is on.
    ///
    /// Returns `true` if the character was added.
    pub fn on_login(&self, player_name: Option<String>, world_name: Option<String>) -> bool {
        let Some(local_content_id) = self.session.local_content_id() else {
            return false;
        };

        let mut config = self.configuration.write();
        if !config.auto_enroll_characters {
            return false;
        }
        let enrolled = config.enroll(local_content_id, player_name, world_name);
        if enrolled {
            info!("Auto-enrolled character {}", local_content_id);
        }
        enrolled
    }

    /// Publish a final snapshot before the character logs out.
    pub fn on_logout(&self) -> Option<JoinHandle<()>> {
        debug!("Logging out, running final statistics cycle");
        self.run_cycle()
    }
}

/// Handle for the background schedule.
///
/// Dropping the handle also stops the schedule.
#[derive(Debug)]
pub struct ScheduleHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ScheduleHandle {
    /// Stop the schedule. A cycle in progress finishes first.
    pub fn stop(self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stop the schedule and wait for the loop to exit.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}
