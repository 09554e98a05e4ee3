use crate::network::ListenAddr;
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the key-value HTTP server
///
/// # Examples
///
/// ```rust
/// use kvsrv::http::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig {
///     bind_addr: "127.0.0.1:8080".parse().unwrap(),
///     max_connections: 100,
///     buffer_size: 8192,
///     max_request_size: 16 * 1024,
///     read_timeout: Duration::from_secs(30),
///     write_timeout: Duration::from_secs(30),
///     server_name: Some("kvsrv/0.1".to_string()),
/// };
/// ```
///
/// Or starting from the defaults:
///
/// ```rust
/// use kvsrv::http::HttpConfig;
/// use std::time::Duration;
///
/// let config = HttpConfig::new("127.0.0.1:0".parse::<std::net::SocketAddr>().unwrap())
///     .with_max_connections(10)
///     .with_read_timeout(Duration::from_secs(5));
/// assert_eq!(config.max_connections, 10);
/// ```
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Network address to bind to
    pub bind_addr: SocketAddr,
    /// Maximum number of concurrent connections
    pub max_connections: usize,
    /// Size of each socket read
    pub buffer_size: usize,
    /// Largest request head accepted before answering 431
    pub max_request_size: usize,
    /// Time allowed to receive one full request, idle keep-alive included
    pub read_timeout: Duration,
    /// Time allowed to write one response
    pub write_timeout: Duration,
    /// Value of the `Server` response header (optional)
    pub server_name: Option<String>,
}

impl HttpConfig {
    pub fn new(bind_addr: impl Into<SocketAddr>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            ..Self::default()
        }
    }

    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_max_request_size(mut self, max_request_size: usize) -> Self {
        self.max_request_size = max_request_size;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_server_name(mut self, name: Option<String>) -> Self {
        self.server_name = name;
        self
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: ListenAddr::default().socket_addr(),
            max_connections: 1000,
            buffer_size: 8192,
            max_request_size: 16 * 1024,
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            server_name: Some(concat!("kvsrv/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

impl From<ListenAddr> for HttpConfig {
    fn from(addr: ListenAddr) -> Self {
        Self::new(addr)
    }
}
