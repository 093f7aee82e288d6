pub mod in_memory;

use std::sync::Arc;
use tracing::{error, info};

/// Host-side surface for user feedback. Calls are fire-and-forget and must not panic.
pub trait NotificationSink: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    /// Ask the host to re-pull the balance summary and the activity feed.
    fn request_refresh(&self, scope: Option<&str>);
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn success(&self, message: &str) {
        (**self).success(message)
    }

    fn error(&self, message: &str) {
        (**self).error(message)
    }

    fn request_refresh(&self, scope: Option<&str>) {
        (**self).request_refresh(scope)
    }
}

/// Sink for headless hosts: everything goes to the tracing subscriber.
#[derive(Clone, Debug, Default)]
pub struct TracingNotifications;

impl NotificationSink for TracingNotifications {
    fn success(&self, message: &str) {
        info!(target: "settleup::notify", "{}", message);
    }

    fn error(&self, message: &str) {
        error!(target: "settleup::notify", "{}", message);
    }

    fn request_refresh(&self, scope: Option<&str>) {
        info!(target: "settleup::notify", scope = ?scope, "balance refresh requested");
    }
}
