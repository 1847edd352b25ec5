use crate::error::Result;
use crate::fetcher::{FetchSource, StateFetcher};
use crate::state::{MixerState, Notification};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

/// Fetches state and installs it into a [`MixerState`]
///
/// Refreshes may overlap (poll timer, post-command refresh, manual refresh).
/// By default whichever fetch completes last wins; with `discard_stale` only
/// the most recently started fetch may install.
pub struct RefreshOrchestrator {
    fetcher: StateFetcher,
    state: Arc<MixerState>,
    next_generation: AtomicU64,
    discard_stale: bool,
}

impl RefreshOrchestrator {
    /// Create a new orchestrator installing into `state`
    pub fn new(fetcher: StateFetcher, state: Arc<MixerState>, discard_stale: bool) -> Self {
        Self {
            fetcher,
            state,
            next_generation: AtomicU64::new(0),
            discard_stale,
        }
    }

    /// Get the state container documents are installed into
    pub fn state(&self) -> &Arc<MixerState> {
        &self.state
    }

    /// Re-notify with the current document, then fetch, install and notify
    ///
    /// Subscribers re-render from the known state before the network round
    /// trip. On failure the installed document stays as it was.
    pub async fn refresh(&self) -> Result<FetchSource> {
        self.state.notify_all();

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;

        match self.fetcher.fetch().await {
            Ok(fetched) => {
                let source = fetched.source;
                if self.discard_stale {
                    if !self.state.install_generation(generation, fetched) {
                        return Ok(source);
                    }
                } else {
                    self.state.install(fetched);
                }

                self.state.notify_user(match source {
                    FetchSource::Primary => Notification::success("Mixer state loaded"),
                    FetchSource::Fallback => {
                        Notification::info("Mixer unreachable, showing local snapshot")
                    }
                });
                Ok(source)
            }
            Err(e) => {
                tracing::error!("State refresh failed: {}", e);
                self.state
                    .notify_user(Notification::error("Failed to load mixer state"));
                Err(e)
            }
        }
    }

    /// Refresh on a fixed interval until the returned [`Poller`] is stopped
    pub fn start_polling(self: &Arc<Self>, interval: Duration) -> Poller {
        let (stop_tx, mut stop_rx) = broadcast::channel::<()>(1);
        let orchestrator = self.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = stop_rx.recv() => {
                        tracing::info!("State polling stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = orchestrator.refresh().await {
                            tracing::debug!("Poll failed, keeping last state: {}", e);
                        }
                    }
                }
            }
        });

        tracing::info!("Polling mixer state every {:?}", interval);
        Poller {
            stop_tx: Some(stop_tx),
            task_handle: Some(handle),
        }
    }
}

/// Handle to a background polling task
pub struct Poller {
    stop_tx: Option<broadcast::Sender<()>>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Poller {
    /// Check if the polling task is still alive
    pub fn is_running(&self) -> bool {
        self.task_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop polling; an in-flight refresh is allowed to finish briefly
    pub async fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(mut handle) = self.task_handle.take() {
            if tokio::time::timeout(Duration::from_millis(500), &mut handle)
                .await
                .is_err()
            {
                handle.abort();
            }
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}
