//! Rust library for controlling a vMix live production mixer
//!
//! vMix exposes its complete state as an XML document and accepts commands
//! as plain HTTP GET requests. This library provides an async API that:
//!
//! - Polls the state document, falling back to a static snapshot when the
//!   mixer is unreachable
//! - Parses it into typed structures (inputs, buses, overlays, mixes)
//! - Notifies subscribers whenever a new document is installed
//! - Builds render-ready view models (input rows, mix matrix, dashboard)
//! - Dispatches commands and re-reads state after a per-command settle delay
//!
//! # Quick Start
//!
//! ```no_run
//! use vmix_control::{view, Command, MixerClient, MixerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MixerClient::new(MixerConfig::new("http://192.168.1.16:8088/api"))?;
//!
//!     // Re-render on every new state
//!     client.subscribe(|doc| {
//!         for row in view::input_rows(Some(doc)) {
//!             println!("{:>3} {:<32} pgm={}", row.number, row.title, row.program_active);
//!         }
//!         Ok(())
//!     });
//!
//!     let mut poller = client.start_polling();
//!
//!     // Route the first input to program, then re-sync
//!     client.refresh().await?;
//!     if let Some(input) = client.state().inputs().first() {
//!         client.execute(Command::SendToProgram { input: input.key.clone() }).await;
//!     }
//!
//!     poller.stop().await;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Document**: typed read layer over the XML state (`StateDocument`)
//! - **Fetcher**: primary endpoint plus fallback source
//! - **State**: current-document container and subscriber registry
//! - **Refresh**: fetch-install-notify, on demand or on a timer
//! - **View**: pure projections for renderers
//! - **Command / Dispatcher**: command catalog and its execution
//! - **Connection / Protocol**: HTTP transport and function-call encoding

mod client;
mod command;
mod config;
mod connection;
mod dispatcher;
mod document;
mod error;
mod fetcher;
mod protocol;
mod refresh;
mod state;
mod subscription;
mod types;
pub mod view;

// Public exports
pub use client::MixerClient;
pub use command::{countdown_value, Command, CommandPlan, Step};
pub use config::{FallbackSource, MixerConfig, BASE_URL_ENV};
pub use connection::Connection;
pub use dispatcher::CommandDispatcher;
pub use document::StateDocument;
pub use error::{MixerError, Result};
pub use fetcher::{FetchSource, Fetched, StateFetcher};
pub use protocol::{Function, FunctionCall};
pub use refresh::{Poller, RefreshOrchestrator};
pub use state::{MixerState, Notification, NotificationLevel, NOTIFICATION_TTL};
pub use subscription::{
    StateReceiver, StateUpdate, SubscriberError, SubscriberResult, SubscriptionId,
    SubscriptionRegistry,
};
pub use types::{
    AudioBus, Input, InputKey, InputNumber, InputState, InputType, MasterAudio, MixerInfo,
    Playlist, Status, Transition, OVERLAY_SLOTS,
};
