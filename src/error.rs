//! Error types for the Ghalib controller driver

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Driver error types
#[derive(Debug, Error)]
pub enum Error {
    /// Endpoint could not be resolved or the network stack is unusable
    #[error("Transport initialization failed: {0}")]
    TransportInit(String),

    /// Socket could not be created
    #[error("Error creating socket: {0}")]
    SocketCreate(#[source] std::io::Error),

    /// Connection attempt to the data source failed
    #[error("Connection to {addr} failed: {source}")]
    Connect {
        /// Endpoint we tried to reach
        addr: String,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// Receive attempted on a session that is not connected
    #[error("Transport not connected")]
    NotConnected,

    /// Read timeout elapsed without data
    #[error("Receive timed out")]
    ReceiveTimeout,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Publisher was already started once
    #[error("Pose publisher already started")]
    AlreadyStarted,

    /// Worker thread panicked
    #[error("Worker thread panicked")]
    ThreadPanic,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
