//! User-facing notifications for failed deliveries.

use std::fmt::Debug;

use tracing::error;

/// Sink for errors the user should see.
pub trait Notifier: Send + Sync + Debug {
    fn notify_error(&self, message: &str);
}

/// Notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_error(&self, message: &str) {
        error!(target: "statwatch::notify", "{}", message);
    }
}
