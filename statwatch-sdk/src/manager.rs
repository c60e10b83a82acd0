//! Owns the active backend client and rebuilds it when configuration changes.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use statwatch_types::StatisticsUpdate;

use crate::cancel::CancellationSource;
use crate::client::{publish, StatisticsClient};
use crate::config::{RemoteType, ServerConfiguration, SharedConfiguration};
use crate::error::{BackendError, ConnectionStatus, TestError};
use crate::notifier::Notifier;
use crate::points::PointGenerator;

/// Builds a client for a server configuration.
pub type ClientFactory =
    Arc<dyn Fn(&ServerConfiguration) -> Option<Arc<dyn StatisticsClient>> + Send + Sync>;

/// Holds at most one enabled client.
///
/// Deliveries still running when the client is replaced or the manager is
/// dropped are cancelled.
pub struct ClientManager {
    configuration: SharedConfiguration,
    generator: PointGenerator,
    notifier: Arc<dyn Notifier>,
    factory: ClientFactory,
    client: RwLock<Option<Arc<dyn StatisticsClient>>>,
    deliveries: Mutex<CancellationSource>,
    test_source: Mutex<Option<CancellationSource>>,
}

impl fmt::Debug for ClientManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientManager")
            .field("client", &*self.client.read())
            .finish_non_exhaustive()
    }
}

impl ClientManager {
    /// Create a manager and build the configured client.
    pub fn new(
        configuration: SharedConfiguration,
        generator: PointGenerator,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self::with_factory(configuration, generator, notifier, Arc::new(create_client))
    }

    /// Create a manager with a custom client factory.
    pub fn with_factory(
        configuration: SharedConfiguration,
        generator: PointGenerator,
        notifier: Arc<dyn Notifier>,
        factory: ClientFactory,
    ) -> Self {
        let manager = Self {
            configuration,
            generator,
            notifier,
            factory,
            client: RwLock::new(None),
            deliveries: Mutex::new(CancellationSource::new()),
            test_source: Mutex::new(None),
        };
        manager.update_client();
        manager
    }

    /// Dispose the current client and build a new one from the current
    /// configuration. The new client is kept only if it is enabled.
    pub fn update_client(&self) {
        let server = self.configuration.read().server.clone();
        let mut slot = self.client.write();

        if let Some(old) = slot.take() {
            debug!("Disposing {} client", old.name());
            self.cancel_deliveries();
            old.dispose();
        }

        match (self.factory)(&server) {
            Some(client) if client.enabled() => {
                info!("Statistics client ready: {}", client.name());
                *slot = Some(client);
            }
            Some(client) => {
                debug!("{} client is not enabled", client.name());
                client.dispose();
            }
            None => {}
        }
    }

    /// The active client, if any.
    pub fn client(&self) -> Option<Arc<dyn StatisticsClient>> {
        self.client.read().clone()
    }

    /// Forward a snapshot to the active client.
    ///
    /// Must be called from within a tokio runtime; delivery runs on a spawned
    /// task which is returned.
    pub fn on_statistics_update(
        &self,
        update: &StatisticsUpdate,
        local_content_id: u64,
    ) -> Option<JoinHandle<()>> {
        let client = self.client()?;
        let token = self.deliveries.lock().token();

        let config = self.configuration.read().clone();
        publish(
            client,
            &self.generator,
            &config,
            update,
            local_content_id,
            self.notifier.clone(),
            token,
        )
    }

    /// Cancel every delivery started so far. Later deliveries are unaffected.
    fn cancel_deliveries(&self) {
        let mut deliveries = self.deliveries.lock();
        deliveries.cancel();
        *deliveries = CancellationSource::new();
    }

    /// Test the active client. A test already in flight is cancelled.
    pub async fn test_connection(&self) -> ConnectionStatus {
        let token = {
            let mut slot = self.test_source.lock();
            if let Some(previous) = slot.take() {
                previous.cancel();
            }
            let source = CancellationSource::new();
            let token = source.token();
            *slot = Some(source);
            token
        };

        match self.client() {
            Some(client) => client.test_connection(token).await,
            None => ConnectionStatus::Failed(TestError::NotConfigured),
        }
    }

    /// Cancel the in-flight connection test, if any.
    pub fn cancel_connection_test(&self) {
        if let Some(source) = self.test_source.lock().take() {
            source.cancel();
        }
    }
}

impl Drop for ClientManager {
    fn drop(&mut self) {
        self.cancel_connection_test();
        self.deliveries.lock().cancel();
        if let Some(client) = self.client.write().take() {
            client.dispose();
        }
    }
}

/// Build the client variant selected by `server.remote_type`.
pub fn create_client(server: &ServerConfiguration) -> Option<Arc<dyn StatisticsClient>> {
    let built: Result<Arc<dyn StatisticsClient>, BackendError> = match server.remote_type {
        #[cfg(feature = "influxdb")]
        RemoteType::InfluxDb => crate::influxdb::InfluxDbClient::new(server)
            .map(|c| Arc::new(c) as Arc<dyn StatisticsClient>),
        #[cfg(feature = "questdb")]
        RemoteType::QuestDb => crate::questdb::QuestDbClient::new(server)
            .map(|c| Arc::new(c) as Arc<dyn StatisticsClient>),
        #[allow(unreachable_patterns)]
        other => {
            warn!("Support for {:?} is not compiled in", other);
            return None;
        }
    };

    match built {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("Failed to create statistics client: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::aggregator::tests::PLAYER;
    use crate::client::tests::RecordingClient;
    use crate::config::{CharacterInfo, Configuration};
    use crate::game_data::{tests::sample_sheets, GameData};
    use crate::notifier::tests::RecordingNotifier;
    use crate::notifier::LogNotifier;
    use statwatch_types::{Character, Currencies};

    fn generator() -> PointGenerator {
        PointGenerator::new(Arc::new(GameData::from_sheets(&sample_sheets())))
    }

    fn update() -> StatisticsUpdate {
        let mut update = StatisticsUpdate::default();
        update
            .currencies
            .insert(Character::player(PLAYER, "Alpha", 33), Currencies::default());
        update
    }

    #[tokio::test]
    async fn test_disabled_backend_has_no_client() {
        let config = Configuration {
            included_characters: vec![CharacterInfo::new(PLAYER)],
            ..Default::default()
        };
        let manager = ClientManager::new(config.shared(), generator(), Arc::new(LogNotifier));

        assert!(manager.client().is_none());
        assert!(manager.on_statistics_update(&update(), PLAYER).is_none());
        assert_eq!(
            manager.test_connection().await,
            ConnectionStatus::Failed(TestError::NotConfigured)
        );
    }

    #[tokio::test]
    async fn test_influx_without_token_is_not_kept() {
        let mut config = Configuration::default();
        config.server.enabled = true;
        config.server.organization = "home".into();
        config.server.bucket = "game".into();

        let manager = ClientManager::new(config.shared(), generator(), Arc::new(LogNotifier));
        assert!(manager.client().is_none());
    }

    #[tokio::test]
    async fn test_update_client_disposes_previous() {
        let created: Arc<Mutex<Vec<Arc<RecordingClient>>>> = Arc::default();
        let factory: ClientFactory = {
            let created = created.clone();
            Arc::new(move |server: &ServerConfiguration| {
                let client = Arc::new(RecordingClient::new(server.enabled));
                created.lock().push(client.clone());
                Some(client as Arc<dyn StatisticsClient>)
            })
        };

        let mut config = Configuration::default();
        config.server.enabled = true;
        let shared = config.shared();
        let manager = ClientManager::with_factory(
            shared.clone(),
            generator(),
            Arc::new(LogNotifier),
            factory,
        );
        assert!(manager.client().is_some());

        shared.write().server.enabled = false;
        manager.update_client();
        assert!(manager.client().is_none());

        let created = created.lock();
        assert_eq!(created.len(), 2);
        assert!(*created[0].disposed.lock());
        assert!(*created[1].disposed.lock());
    }

    #[tokio::test]
    async fn test_statistics_update_reaches_client() {
        let client = Arc::new(RecordingClient::new(true));
        let factory: ClientFactory = {
            let client = client.clone();
            Arc::new(move |_: &ServerConfiguration| {
                Some(client.clone() as Arc<dyn StatisticsClient>)
            })
        };
        let config = Configuration {
            included_characters: vec![CharacterInfo::new(PLAYER)],
            ..Default::default()
        };
        let manager = ClientManager::with_factory(
            config.shared(),
            generator(),
            Arc::new(LogNotifier),
            factory,
        );

        manager
            .on_statistics_update(&update(), PLAYER)
            .unwrap()
            .await
            .unwrap();
        assert_eq!(client.batches.lock().len(), 1);
    }

    /// Client whose saves and tests never finish on their own.
    #[derive(Debug)]
    struct HangingClient;

    #[async_trait::async_trait]
    impl StatisticsClient for HangingClient {
        fn name(&self) -> &'static str {
            "hanging"
        }

        fn enabled(&self) -> bool {
            true
        }

        async fn save(
            &self,
            _points: Vec<statwatch_types::Measurement>,
        ) -> Result<(), BackendError> {
            std::future::pending().await
        }

        async fn test_connection(&self, token: crate::CancellationToken) -> ConnectionStatus {
            token.cancelled().await;
            ConnectionStatus::Cancelled
        }
    }

    fn hanging_factory() -> ClientFactory {
        Arc::new(|_: &ServerConfiguration| {
            Some(Arc::new(HangingClient) as Arc<dyn StatisticsClient>)
        })
    }

    #[tokio::test]
    async fn test_replacing_client_cancels_delivery() {
        let notifier = Arc::new(RecordingNotifier::default());
        let config = Configuration {
            included_characters: vec![CharacterInfo::new(PLAYER)],
            ..Default::default()
        };
        let manager = ClientManager::with_factory(
            config.shared(),
            generator(),
            notifier.clone(),
            hanging_factory(),
        );

        let stale = manager.on_statistics_update(&update(), PLAYER).unwrap();
        manager.update_client();
        tokio::time::timeout(Duration::from_secs(1), stale)
            .await
            .unwrap()
            .unwrap();

        let fresh = manager.on_statistics_update(&update(), PLAYER).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!fresh.is_finished());
        drop(manager);
        tokio::time::timeout(Duration::from_secs(1), fresh)
            .await
            .unwrap()
            .unwrap();

        assert!(notifier.messages.lock().is_empty());
    }

    #[tokio::test]
    async fn test_new_test_cancels_previous() {
        let manager = Arc::new(ClientManager::with_factory(
            Configuration::default().shared(),
            generator(),
            Arc::new(LogNotifier),
            hanging_factory(),
        ));

        let first = tokio::spawn({
            let manager = manager.clone();
            async move { manager.test_connection().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = tokio::spawn({
            let manager = manager.clone();
            async move { manager.test_connection().await }
        });
        let first = tokio::time::timeout(Duration::from_secs(1), first)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, ConnectionStatus::Cancelled);

        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.cancel_connection_test();
        let second = tokio::time::timeout(Duration::from_secs(1), second)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second, ConnectionStatus::Cancelled);
    }
}
