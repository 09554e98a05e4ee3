use crate::common::KvServerTrait;
use crate::http::{HttpConfig, KvServer};
use crate::store::KeyValueStore;
use crate::{KvError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Handle to a server started by [`spawn_test_server`]
pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<KeyValueStore>,
    pub handle: JoinHandle<Result<()>>,
    shutdown: broadcast::Sender<()>,
}

impl TestServer {
    /// Stops the accept loop and waits for it to return
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.handle
            .await
            .map_err(|e| KvError::Config(format!("Server task failed: {e}")))?
    }
}

/// Starts a server with its own empty store on an ephemeral loopback port
pub async fn spawn_test_server() -> Result<TestServer> {
    let config = HttpConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)))
        .with_max_connections(100)
        .with_read_timeout(Duration::from_secs(5))
        .with_write_timeout(Duration::from_secs(5));
    spawn_test_server_with_config(config).await
}

/// Starts a server with the given configuration and its own empty store
///
/// The listener is bound before the server task is spawned, so the returned
/// address accepts connections immediately.
pub async fn spawn_test_server_with_config(config: HttpConfig) -> Result<TestServer> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| KvError::Config(format!("Failed to bind listener: {e}")))?;
    let addr = listener.local_addr()?;

    let store = Arc::new(KeyValueStore::new());
    let server = KvServer::with_store(config, Arc::clone(&store));
    let shutdown = server.shutdown_signal();
    let shutdown_rx = shutdown.subscribe();

    let handle =
        tokio::spawn(async move { server.serve_with_shutdown(listener, shutdown_rx).await });

    Ok(TestServer {
        addr,
        store,
        handle,
        shutdown,
    })
}
