use crate::infrastructure::notifications::NotificationSink;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Error(String),
    Refresh(Option<String>),
}

/// Keeps every notification in order; used by hosts that render a toast list and by tests.
#[derive(Clone, Default)]
pub struct InMemoryNotifications {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl InMemoryNotifications {
    pub fn new() -> Self {
        InMemoryNotifications::default()
    }

    pub fn events(&self) -> Vec<Notification> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn successes(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Success(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Error(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn refresh_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|n| matches!(n, Notification::Refresh(_)))
            .count()
    }

    fn push(&self, notification: Notification) {
        // A poisoned lock only loses the notification; the sink never panics.
        if let Ok(mut events) = self.events.lock() {
            events.push(notification);
        }
    }
}

impl NotificationSink for InMemoryNotifications {
    fn success(&self, message: &str) {
        self.push(Notification::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.push(Notification::Error(message.to_string()));
    }

    fn request_refresh(&self, scope: Option<&str>) {
        self.push(Notification::Refresh(scope.map(String::from)));
    }
}
