use crate::command::Command;
use crate::config::MixerConfig;
use crate::connection::Connection;
use crate::dispatcher::CommandDispatcher;
use crate::document::StateDocument;
use crate::error::Result;
use crate::fetcher::{FetchSource, StateFetcher};
use crate::refresh::{Poller, RefreshOrchestrator};
use crate::state::{MixerState, Notification};
use crate::subscription::{StateReceiver, SubscriberResult, SubscriptionId};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Client for a vMix instance
///
/// Owns the state container, the refresh path and the command dispatcher.
/// Several clients can run side by side against different mixers.
pub struct MixerClient {
    config: MixerConfig,
    state: Arc<MixerState>,
    refresher: Arc<RefreshOrchestrator>,
    dispatcher: CommandDispatcher,
}

impl MixerClient {
    /// Create a client; no request is made until the first refresh
    ///
    /// # Example
    ///
    /// ```no_run
    /// use vmix_control::{Command, MixerClient, MixerConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = MixerClient::new(MixerConfig::new("http://192.168.1.16:8088/api"))?;
    ///     client.refresh().await?;
    ///
    ///     if let Some(input) = client.state().inputs().first() {
    ///         client.execute(Command::SendToProgram { input: input.key.clone() }).await;
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub fn new(config: MixerConfig) -> Result<Self> {
        config.validate()?;

        let connection = Connection::new(&config.base_url, config.request_timeout())?;
        let state = Arc::new(MixerState::new());
        let fetcher = StateFetcher::new(connection.clone(), config.fallback.clone());
        let refresher = Arc::new(RefreshOrchestrator::new(
            fetcher,
            state.clone(),
            config.discard_stale_fetches,
        ));
        let dispatcher = CommandDispatcher::new(connection, refresher.clone());

        tracing::info!("Mixer client for {}", config.base_url);

        Ok(Self {
            config,
            state,
            refresher,
            dispatcher,
        })
    }

    /// Get the configuration this client was built with
    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    /// Get the shared state container
    pub fn state(&self) -> &Arc<MixerState> {
        &self.state
    }

    /// The installed document, if any
    pub fn current(&self) -> Option<Arc<StateDocument>> {
        self.state.current()
    }

    /// Re-render from known state, then fetch and install a fresh document
    pub async fn refresh(&self) -> Result<FetchSource> {
        self.refresher.refresh().await
    }

    /// Run a command and the refresh that follows it
    pub async fn execute(&self, command: Command) {
        self.dispatcher.execute(command).await
    }

    /// Dispatcher handle for running commands on other tasks
    pub fn dispatcher(&self) -> CommandDispatcher {
        self.dispatcher.clone()
    }

    /// Refresh handle for use on other tasks
    pub fn refresher(&self) -> Arc<RefreshOrchestrator> {
        self.refresher.clone()
    }

    /// Register a render callback; runs immediately if state is loaded
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&StateDocument) -> SubscriberResult + Send + Sync + 'static,
    {
        self.state.subscribe(callback)
    }

    /// Remove a callback; returns false if the id was unknown
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.unsubscribe(id)
    }

    /// Subscribe to installed documents as an async stream
    pub fn subscribe_updates(&self) -> StateReceiver {
        self.state.subscribe_updates()
    }

    /// Subscribe to user-facing notifications
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.state.notifications()
    }

    /// Start polling at the configured interval
    pub fn start_polling(&self) -> Poller {
        self.refresher.start_polling(self.config.poll_interval())
    }
}
