use crate::config::FallbackSource;
use crate::connection::Connection;
use crate::document::{StateDocument, BUNDLED_SNAPSHOT};
use crate::error::{MixerError, Result};
use serde::Serialize;
use std::sync::Arc;

/// Which source produced a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FetchSource {
    /// Live mixer endpoint
    Primary,
    /// Fallback snapshot
    Fallback,
}

/// A freshly fetched, not yet installed document
#[derive(Debug, Clone)]
pub struct Fetched {
    pub document: Arc<StateDocument>,
    pub source: FetchSource,
}

/// Retrieves and parses the state document
///
/// Tries the live endpoint first; on any failure (transport, status, parse)
/// tries the fallback source once.
#[derive(Clone, Debug)]
pub struct StateFetcher {
    connection: Connection,
    fallback: FallbackSource,
}

impl StateFetcher {
    pub fn new(connection: Connection, fallback: FallbackSource) -> Self {
        Self {
            connection,
            fallback,
        }
    }

    pub async fn fetch(&self) -> Result<Fetched> {
        let primary = match self.fetch_primary().await {
            Ok(document) => {
                return Ok(Fetched {
                    document: Arc::new(document),
                    source: FetchSource::Primary,
                })
            }
            Err(e) => e,
        };

        tracing::warn!("Primary state fetch failed: {}", primary);

        match self.fetch_fallback().await {
            Ok(document) => {
                tracing::info!("Loaded fallback state ({:?})", self.fallback);
                Ok(Fetched {
                    document: Arc::new(document),
                    source: FetchSource::Fallback,
                })
            }
            Err(fallback) => {
                tracing::error!("Fallback state fetch failed: {}", fallback);
                Err(MixerError::Unavailable {
                    primary: Box::new(primary),
                    fallback: Box::new(fallback),
                })
            }
        }
    }

    async fn fetch_primary(&self) -> Result<StateDocument> {
        let xml = self.connection.fetch_state().await?;
        StateDocument::parse(&xml)
    }

    async fn fetch_fallback(&self) -> Result<StateDocument> {
        match &self.fallback {
            FallbackSource::Bundled => StateDocument::parse(BUNDLED_SNAPSHOT),
            FallbackSource::File(path) => {
                let xml = tokio::fs::read_to_string(path).await?;
                StateDocument::parse(&xml)
            }
            FallbackSource::Url(url) => {
                let xml = self.connection.get_text(url).await?;
                StateDocument::parse(&xml)
            }
            FallbackSource::Disabled => Err(MixerError::FallbackDisabled),
        }
    }
}
