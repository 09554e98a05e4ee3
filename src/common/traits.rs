use crate::Result;
use async_trait::async_trait;

/// Common interface for long-running servers
///
/// Implemented by [`KvServer`](crate::http::KvServer); lets callers drive a
/// server and stop it without knowing its configuration.
#[async_trait]
pub trait KvServerTrait {
    /// Binds the listener and serves until shutdown
    async fn run(&self) -> Result<()>;

    /// Returns a shutdown signal sender that can be used to gracefully shutdown the server
    fn shutdown_signal(&self) -> tokio::sync::broadcast::Sender<()>;
}
