use crate::http::protocol::HttpProtocolError;
use thiserror::Error;

/// Error types for the kvsrv library
#[derive(Error, Debug)]
pub enum KvError {
    /// Socket-level errors (accept, connect, read, write)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The listener could not be bound to the configured address
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// Malformed HTTP traffic
    #[error("HTTP error: {0}")]
    Http(String),

    /// UTF-8 encoding errors
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl From<HttpProtocolError> for KvError {
    fn from(err: HttpProtocolError) -> Self {
        match err {
            HttpProtocolError::Io(e) => KvError::Io(e),
            other => KvError::Http(other.to_string()),
        }
    }
}

/// Result type for the kvsrv library
pub type Result<T> = std::result::Result<T, KvError>;

pub mod common;
pub mod http;
pub mod network;
pub mod store;

// Re-export main types for convenience
pub use common::KvServerTrait;
pub use crate::http::{HttpConfig, KvClient, KvServer};
pub use network::ListenAddr;
pub use store::{KeyValueStore, Snapshot};
