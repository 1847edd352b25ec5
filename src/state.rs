use crate::document::StateDocument;
use crate::fetcher::Fetched;
use crate::subscription::{
    StateReceiver, StateUpdate, SubscriberResult, SubscriptionId, SubscriptionRegistry,
};
use crate::types::Input;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// How long a notification should stay visible
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

/// Transient, auto-dismissing status message for the user
///
/// Stamped when created; renderers drop it once [`NOTIFICATION_TTL`] has
/// passed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    #[serde(skip)]
    issued_at: Instant,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            issued_at: Instant::now(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, message)
    }

    /// When the notification was created
    pub fn issued_at(&self) -> Instant {
        self.issued_at
    }

    /// When the notification should disappear
    pub fn expires_at(&self) -> Instant {
        self.issued_at + NOTIFICATION_TTL
    }

    /// Check if the notification should no longer be shown
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }
}

/// Installed document and the generation of the fetch that produced it
#[derive(Default)]
struct Installed {
    generation: u64,
    document: Option<Arc<StateDocument>>,
}

/// Holder of the current state document
///
/// Single writer (the refresh path installs documents), many readers.
/// Installing replaces the whole document and then notifies callbacks in
/// subscription order, followed by async receivers.
pub struct MixerState {
    current: RwLock<Installed>,
    registry: SubscriptionRegistry,
    update_tx: broadcast::Sender<StateUpdate>,
    notification_tx: broadcast::Sender<Notification>,
}

impl MixerState {
    /// Create an empty state with no document installed
    pub fn new() -> Self {
        let (update_tx, _) = broadcast::channel(16);
        let (notification_tx, _) = broadcast::channel(32);
        Self {
            current: RwLock::new(Installed::default()),
            registry: SubscriptionRegistry::new(),
            update_tx,
            notification_tx,
        }
    }

    /// The installed document, if any
    pub fn current(&self) -> Option<Arc<StateDocument>> {
        self.current.read().document.clone()
    }

    /// Inputs of the installed document, empty when there is none
    pub fn inputs(&self) -> Vec<Input> {
        self.current()
            .map(|doc| doc.inputs().to_vec())
            .unwrap_or_default()
    }

    /// Register a callback
    ///
    /// If a document is already installed the callback runs immediately,
    /// before this returns.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateDocument) -> SubscriberResult + Send + Sync + 'static,
    {
        let id = self.registry.subscribe(callback);
        if let Some(doc) = self.current() {
            self.registry.notify_one(id, &doc);
        }
        id
    }

    /// Remove a callback; returns false if the id was unknown
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.unsubscribe(id)
    }

    /// Async stream of installed documents
    pub fn subscribe_updates(&self) -> StateReceiver {
        StateReceiver::new(self.update_tx.subscribe())
    }

    /// Stream of user-facing notifications
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notification_tx.subscribe()
    }

    /// Publish a notification to every notification receiver
    pub fn notify_user(&self, notification: Notification) {
        // No receivers is fine
        let _ = self.notification_tx.send(notification);
    }

    /// Re-deliver the current document to every callback
    ///
    /// Returns the number of callbacks that succeeded, 0 without a document.
    pub fn notify_all(&self) -> usize {
        match self.current() {
            Some(doc) => self.registry.notify_all(&doc),
            None => 0,
        }
    }

    /// Replace the current document and notify
    pub fn install(&self, fetched: Fetched) {
        self.swap(None, fetched);
    }

    /// Install only if no later-started fetch has been installed already
    ///
    /// Returns false when the result is stale and was discarded.
    pub fn install_generation(&self, generation: u64, fetched: Fetched) -> bool {
        self.swap(Some(generation), fetched)
    }

    fn swap(&self, generation: Option<u64>, fetched: Fetched) -> bool {
        let Fetched { document, source } = fetched;

        // Compare and swap under one write lock, notify after release
        {
            let mut installed = self.current.write();
            if let Some(generation) = generation {
                if installed.generation > generation {
                    tracing::debug!(
                        "Discarding stale fetch {} (generation {} already installed)",
                        generation,
                        installed.generation
                    );
                    return false;
                }
                installed.generation = generation;
            }
            installed.document = Some(document.clone());
        }

        tracing::debug!(
            "Installed state document from {:?} ({} inputs)",
            source,
            document.inputs().len()
        );

        self.registry.notify_all(&document);
        let _ = self.update_tx.send(StateUpdate { document, source });
        true
    }

    /// Number of registered callbacks
    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }
}

impl Default for MixerState {
    fn default() -> Self {
        Self::new()
    }
}
