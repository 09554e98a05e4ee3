use super::HttpConfig;
use super::gateway::Gateway;
use super::protocol::{HttpConnection, Response};
use crate::common::KvServerTrait;
use crate::store::KeyValueStore;
use crate::{KvError, Result};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio::{signal, time::timeout};
use tracing::{Instrument, error, info, warn};

/// HTTP front end for a [`KeyValueStore`]
///
/// Each accepted connection runs on its own task and may carry any number
/// of keep-alive requests. All connections share one store.
///
/// # Examples
///
/// ```no_run
/// use kvsrv::common::KvServerTrait;
/// use kvsrv::http::{HttpConfig, KvServer};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = KvServer::new(HttpConfig::new("127.0.0.1:8080".parse::<std::net::SocketAddr>()?));
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct KvServer {
    config: HttpConfig,
    gateway: Gateway,
    shutdown_signal: Arc<tokio::sync::broadcast::Sender<()>>,
}

impl KvServer {
    /// Creates a server backed by a fresh, empty store
    pub fn new(config: HttpConfig) -> Self {
        Self::with_store(config, Arc::new(KeyValueStore::new()))
    }

    /// Creates a server that serves an existing store
    pub fn with_store(config: HttpConfig, store: Arc<KeyValueStore>) -> Self {
        let (shutdown_signal, _) = tokio::sync::broadcast::channel(1);
        Self {
            config,
            gateway: Gateway::new(store),
            shutdown_signal: Arc::new(shutdown_signal),
        }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<KeyValueStore> {
        self.gateway.store()
    }

    /// Binds the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|source| KvError::Bind {
                addr: self.config.bind_addr,
                source,
            })
    }

    /// Accepts connections on an already bound listener until shutdown
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.serve_with_shutdown(listener, self.shutdown_signal.subscribe())
            .await
    }

    /// Like [`serve`](Self::serve), with a shutdown receiver subscribed by the
    /// caller so that no signal sent after this call is missed
    pub async fn serve_with_shutdown(
        &self,
        listener: TcpListener,
        mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
    ) -> Result<()> {
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "Key-value server listening");

        let connection_count = Arc::new(AtomicUsize::new(0));

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, addr)) => {
                            let current_count = connection_count.load(Ordering::SeqCst);
                            if current_count >= self.config.max_connections {
                                warn!(%addr, current = current_count, limit = self.config.max_connections, "Connection rejected: limit reached");
                                continue;
                            }

                            let new_count = connection_count.fetch_add(1, Ordering::SeqCst) + 1;
                            info!(%addr, current = new_count, "Accepted connection");

                            let config = self.config.clone();
                            let gateway = self.gateway.clone();
                            let connection_count = connection_count.clone();
                            let span = tracing::info_span!("connection", %addr);

                            tokio::spawn(async move {
                                let result = Self::handle_connection(stream, addr, gateway, config).instrument(span).await;
                                if let Err(e) = result {
                                    error!(%addr, error = %e, "Error handling connection");
                                }
                                let final_count = connection_count.fetch_sub(1, Ordering::SeqCst) - 1;
                                info!(%addr, current = final_count, "Connection closed");
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = signal::ctrl_c() => {
                    info!("Received shutdown signal, stopping server");
                    break;
                }
                _ = shutdown_rx.recv() => {
                    info!("Received internal shutdown signal, stopping server");
                    break;
                }
            }
        }

        info!("Key-value server stopped");
        Ok(())
    }

    /// Serves requests on one connection until it closes or fails
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        gateway: Gateway,
        config: HttpConfig,
    ) -> Result<()> {
        let server_name = config.server_name.as_deref();
        let mut conn = HttpConnection::new(stream, config.buffer_size, config.max_request_size);

        loop {
            let request = match timeout(config.read_timeout, conn.read_request()).await {
                Ok(Ok(Some(request))) => request,
                Ok(Ok(None)) => {
                    info!(%addr, "Client closed connection");
                    break;
                }
                Ok(Err(e)) => match e.status() {
                    Some(status) => {
                        warn!(%addr, error = %e, status = status.as_u16(), "Rejected malformed request");
                        let response = Response::error(status);
                        // Best effort; the connection is dropped either way
                        let _ = timeout(config.write_timeout, conn.write_response(&response, server_name)).await;
                        break;
                    }
                    None => return Err(e.into()),
                },
                Err(_) => {
                    warn!(%addr, "Read timeout");
                    break;
                }
            };

            let mut response = match gateway.handle(&request) {
                Ok(response) => response,
                Err(e) => {
                    warn!(%addr, error = %e, "Rejected request path");
                    Response::error(e.status().unwrap_or(::http::StatusCode::BAD_REQUEST))
                }
            };
            if !request.keep_alive {
                response.close = true;
            }

            match timeout(config.write_timeout, conn.write_response(&response, server_name)).await {
                Ok(Ok(())) => {
                    info!(
                        %addr,
                        method = %request.method,
                        target = %request.target,
                        status = response.status.as_u16(),
                        "Handled request"
                    );
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    warn!(%addr, "Write timeout");
                    break;
                }
            }

            if response.close {
                break;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl KvServerTrait for KvServer {
    /// Binds the configured address and serves until shutdown
    ///
    /// A bind failure is returned as [`KvError::Bind`] before any
    /// connection is accepted.
    async fn run(&self) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    fn shutdown_signal(&self) -> tokio::sync::broadcast::Sender<()> {
        self.shutdown_signal.as_ref().clone()
    }
}
