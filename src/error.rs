use thiserror::Error;

/// Result type for mixer operations
pub type Result<T> = std::result::Result<T, MixerError>;

/// Errors that can occur when talking to the mixer
#[derive(Error, Debug)]
pub enum MixerError {
    /// HTTP transport error (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The mixer answered with a non-success status code
    #[error("HTTP status {status} from {url}")]
    Status {
        /// Status code returned
        status: u16,
        /// Requested URL
        url: String,
    },

    /// The state document is not well-formed XML
    #[error("XML parse error: {0}")]
    Parse(#[from] roxmltree::Error),

    /// I/O error (fallback snapshot on disk, config file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Both the live endpoint and the fallback source failed
    #[error("State unavailable: primary failed ({primary}), fallback failed ({fallback})")]
    Unavailable {
        /// Failure of the live endpoint
        primary: Box<MixerError>,
        /// Failure of the fallback source
        fallback: Box<MixerError>,
    },

    /// No fallback source is configured
    #[error("Fallback source disabled")]
    FallbackDisabled,

    /// A command call failed; remaining steps were skipped
    #[error("Command {function} failed: {source}")]
    Command {
        /// Mixer function name of the failed call
        function: String,
        #[source]
        source: Box<MixerError>,
    },

    /// The state owner was dropped while a receiver was waiting
    #[error("Update channel closed")]
    ChannelClosed,

    /// Configuration value is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
