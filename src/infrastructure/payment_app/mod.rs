use crate::core::upi::UpiDeepLink;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Hands a deep link to the external payment app. One-way: there is no completion signal.
pub trait PaymentLauncher: Send + Sync {
    fn launch(&self, link: &UpiDeepLink);
}

impl<T: PaymentLauncher + ?Sized> PaymentLauncher for Arc<T> {
    fn launch(&self, link: &UpiDeepLink) {
        (**self).launch(link)
    }
}

/// Prints the link through tracing so an operator can open it by hand.
#[derive(Clone, Debug, Default)]
pub struct LoggingLauncher;

impl PaymentLauncher for LoggingLauncher {
    fn launch(&self, link: &UpiDeepLink) {
        info!(uri = %link, "open payment app");
    }
}

/// Remembers launched links instead of opening anything.
#[derive(Clone, Default)]
pub struct RecordingLauncher {
    launched: Arc<Mutex<Vec<UpiDeepLink>>>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        RecordingLauncher::default()
    }

    pub fn launched(&self) -> Vec<UpiDeepLink> {
        self.launched.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn last_uri(&self) -> Option<String> {
        self.launched().last().map(UpiDeepLink::to_uri)
    }
}

impl PaymentLauncher for RecordingLauncher {
    fn launch(&self, link: &UpiDeepLink) {
        if let Ok(mut launched) = self.launched.lock() {
            launched.push(link.clone());
        }
    }
}
