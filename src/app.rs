//! Wires the host export, caches and statistics service together.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use statwatch_adapters::{
    FcStats, FileSource, HostExport, LocalStats, SharedStatsCache, Sources, StatsCache,
};
use statwatch_sdk::{
    ClientManager, ConnectionStatus, GameData, LogNotifier, PointGenerator, SharedConfiguration,
    StatisticsAggregator, StatisticsService,
};

use crate::settings::Settings;

/// How often the export file is checked for changes.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Session state seen on the previous poll.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct SessionState {
    logged_in: bool,
    logging_out: bool,
}

/// The running application.
#[derive(Debug)]
pub struct App {
    settings: Settings,
    source: Arc<FileSource>,
    game_data: Arc<GameData>,
    configuration: SharedConfiguration,
    local_stats: SharedStatsCache<LocalStats>,
    fc_stats: SharedStatsCache<FcStats>,
    service: Arc<StatisticsService>,
    session: SessionState,
}

impl App {
    pub fn new(settings: Settings) -> Result<Self> {
        let game_data = Arc::new(
            GameData::load(&settings.host.game_data_file).with_context(|| {
                format!(
                    "failed to load game data from {}",
                    settings.host.game_data_file.display()
                )
            })?,
        );

        let configuration = settings.statistics.clone().shared();
        let source = Arc::new(FileSource::new(&settings.host.export_file));
        let local_stats = StatsCache::<LocalStats>::load(&settings.host.cache_dir).shared();
        let fc_stats = StatsCache::<FcStats>::load(&settings.host.cache_dir).shared();

        let aggregator = StatisticsAggregator::new(
            Sources::from_provider(source.clone()),
            configuration.clone(),
            local_stats.clone(),
            fc_stats.clone(),
        );
        let manager = Arc::new(ClientManager::new(
            configuration.clone(),
            PointGenerator::new(game_data.clone()),
            Arc::new(LogNotifier),
        ));
        let service = Arc::new(StatisticsService::new(
            aggregator,
            manager,
            source.clone(),
            configuration.clone(),
        ));

        Ok(Self {
            settings,
            source,
            game_data,
            configuration,
            local_stats,
            fc_stats,
            service,
            session: SessionState::default(),
        })
    }

    pub fn service(&self) -> &Arc<StatisticsService> {
        &self.service
    }

    pub fn configuration(&self) -> &SharedConfiguration {
        &self.configuration
    }

    /// Re-read the export if it changed and react to login and logout.
    ///
    /// Returns the delivery task of a logout cycle, if one ran.
    pub fn refresh(&mut self) -> Option<JoinHandle<()>> {
        if !self.source.poll() {
            if let Some(e) = self.source.error() {
                debug!("Export not readable: {}", e);
            }
            return None;
        }
        let export = self.source.export()?;

        self.store_caches(&export);

        let previous = self.session;
        self.session = SessionState {
            logged_in: export.local_content_id.is_some(),
            logging_out: export.logging_out,
        };

        if self.session.logged_in && !previous.logged_in {
            let (name, world) = self.player_identity(&export);
            self.service.on_login(name, world);
        }
        if self.session.logging_out && !previous.logging_out {
            return self.service.on_logout();
        }
        None
    }

    /// Feed freshly computed stats into the on-disk caches.
    fn store_caches(&self, export: &HostExport) {
        for stats in &export.local_stats {
            if let Err(e) = self.local_stats.write().update(stats.clone()) {
                warn!("Failed to cache stats of {}: {}", stats.content_id, e);
            }
        }
        for stats in &export.fc_stats {
            if let Err(e) = self.fc_stats.write().update(stats.clone()) {
                warn!("Failed to cache FC stats of {}: {}", stats.content_id, e);
            }
        }
    }

    fn player_identity(&self, export: &HostExport) -> (Option<String>, Option<String>) {
        let player = export.local_content_id.and_then(|id| {
            export
                .characters
                .iter()
                .find(|c| c.is_player() && c.character_id == id)
        });
        match player {
            Some(p) => (
                Some(p.name.clone()),
                Some(self.game_data.world_name(p.world_id)),
            ),
            None => (None, None),
        }
    }

    /// Run until `shutdown` resolves.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        info!(
            "Watching {} every {:?}",
            self.source.description(),
            self.settings.interval()
        );

        if self.service.manager().client().is_some() {
            match self.service.manager().test_connection().await {
                ConnectionStatus::Ok => info!("Connection test passed"),
                status => warn!(
                    "Connection test: {}",
                    status.message().unwrap_or_default()
                ),
            }
        } else {
            warn!("No statistics backend configured, nothing will be published");
        }

        self.refresh();
        let schedule = self.service.start(self.settings.interval());
        let mut poll = tokio::time::interval(POLL_INTERVAL);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    self.refresh();
                }
                _ = &mut shutdown => break,
            }
        }

        info!("Shutting down");
        self.service.manager().cancel_connection_test();
        schedule.shutdown().await;
        Ok(())
    }
}
