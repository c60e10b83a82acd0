//! The backend client seam and the fire-and-forget publish step.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use statwatch_types::{Measurement, StatisticsUpdate};

use crate::cancel::CancellationToken;
use crate::config::Configuration;
use crate::error::{BackendError, ConnectionStatus};
use crate::notifier::Notifier;
use crate::points::PointGenerator;

/// A time-series backend.
///
/// A disabled client performs no I/O: `save` returns immediately and
/// nothing is ever sent.
#[async_trait]
pub trait StatisticsClient: Send + Sync + Debug {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    /// Whether the configuration is complete enough to send anything.
    fn enabled(&self) -> bool;

    /// Write one cycle's points.
    async fn save(&self, points: Vec<Measurement>) -> Result<(), BackendError>;

    /// Check that the backend is reachable and usable.
    async fn test_connection(&self, token: CancellationToken) -> ConnectionStatus;

    /// Release the client. Called when it is replaced.
    fn dispose(&self) {}
}

/// Generate the points for `update` and hand them to `client` in the
/// background.
///
/// Nothing is spawned when the client is disabled or the local character is
/// not allow-listed, or when called outside a tokio runtime. Cancelling
/// `token` abandons the save. Delivery failures are logged and, unless
/// cancelled or timed out, reported through `notifier`.
pub fn publish(
    client: Arc<dyn StatisticsClient>,
    generator: &PointGenerator,
    config: &Configuration,
    update: &StatisticsUpdate,
    local_content_id: u64,
    notifier: Arc<dyn Notifier>,
    token: CancellationToken,
) -> Option<JoinHandle<()>> {
    if !client.enabled() {
        return None;
    }
    let handle = match Handle::try_current() {
        Ok(handle) => handle,
        Err(e) => {
            warn!("Cannot publish statistics outside a runtime: {}", e);
            return None;
        }
    };
    if !config.is_included(local_content_id) {
        debug!(
            "Local character {} is not included, skipping publish",
            local_content_id
        );
        return None;
    }

    let time = Utc::now().trunc_subsecs(0);
    let points = generator.generate(update, config, time);
    if points.is_empty() {
        return None;
    }

    debug!("Publishing {} points to {}", points.len(), client.name());
    Some(handle.spawn(async move {
        let count = points.len();
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(BackendError::Cancelled),
            result = client.save(points) => result,
        };
        match result {
            Ok(()) => debug!("Saved {} points to {}", count, client.name()),
            Err(e) if e.should_notify() => {
                error!("Failed to save statistics to {}: {}", client.name(), e);
                notifier.notify_error(&format!("Unable to save statistics: {}", e));
            }
            Err(e) if e.is_cancelled() => {
                debug!("Statistics delivery to {} cancelled", client.name())
            }
            Err(e) => warn!("Statistics delivery to {} aborted: {}", client.name(), e),
        }
    }))
}
