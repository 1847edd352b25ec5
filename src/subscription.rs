use crate::document::StateDocument;
use crate::error::{MixerError, Result};
use crate::fetcher::FetchSource;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Error a subscriber callback may return
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Return type of subscriber callbacks
pub type SubscriberResult = std::result::Result<(), SubscriberError>;

type Callback = Arc<dyn Fn(&StateDocument) -> SubscriberResult + Send + Sync>;

/// Handle identifying one registered callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

/// Ordered list of state callbacks
///
/// Callbacks are expected to be idempotent re-renderers: they run on every
/// installed document and may run again with the same one.
#[derive(Default)]
pub struct SubscriptionRegistry {
    callbacks: Mutex<Vec<(SubscriptionId, Callback)>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback; the same closure may be registered more than once
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateDocument) -> SubscriberResult + Send + Sync + 'static,
    {
        let id = SubscriptionId(Uuid::new_v4());
        self.callbacks.lock().push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.callbacks.lock();
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        callbacks.len() != before
    }

    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.lock().is_empty()
    }

    /// Run one callback, if still registered
    pub(crate) fn notify_one(&self, id: SubscriptionId, doc: &StateDocument) -> bool {
        let callback = self
            .callbacks
            .lock()
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, callback)| callback.clone());
        callback.is_some_and(|callback| invoke(id, &callback, doc))
    }

    /// Run every callback in subscription order
    ///
    /// Failures are logged and do not stop the remaining callbacks. Returns
    /// the number of callbacks that completed without error.
    pub fn notify_all(&self, doc: &StateDocument) -> usize {
        // Snapshot so callbacks can subscribe re-entrantly
        let callbacks: Vec<(SubscriptionId, Callback)> = self.callbacks.lock().clone();
        callbacks
            .iter()
            .filter(|(id, callback)| invoke(*id, callback, doc))
            .count()
    }
}

fn invoke(id: SubscriptionId, callback: &Callback, doc: &StateDocument) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| callback(doc))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::error!("State subscriber {:?} failed: {}", id, e);
            false
        }
        Err(_) => {
            tracing::error!("State subscriber {:?} panicked", id);
            false
        }
    }
}

/// New document installed
#[derive(Debug, Clone)]
pub struct StateUpdate {
    pub document: Arc<StateDocument>,
    pub source: FetchSource,
}

/// Receiver for state updates
pub struct StateReceiver {
    rx: broadcast::Receiver<StateUpdate>,
}

impl StateReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<StateUpdate>) -> Self {
        Self { rx }
    }

    /// Receive the next state update
    ///
    /// Fails with `ChannelClosed` once the owning state is dropped.
    pub async fn recv(&mut self) -> Result<StateUpdate> {
        loop {
            match self.rx.recv().await {
                Ok(update) => return Ok(update),
                Err(broadcast::error::RecvError::Closed) => return Err(MixerError::ChannelClosed),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("State receiver lagged by {} updates", n);
                }
            }
        }
    }

    /// Try to receive a state update without blocking
    ///
    /// Returns `None` if no update is pending. Skipped updates are dropped;
    /// only the newest document matters.
    pub fn try_recv(&mut self) -> Result<Option<StateUpdate>> {
        loop {
            match self.rx.try_recv() {
                Ok(update) => return Ok(Some(update)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(MixerError::ChannelClosed)
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            }
        }
    }
}
