use crate::{KvError, Result};
use ::http::{Method, StatusCode, header};
use bytes::{Buf, BytesMut};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Upper bound on the number of response headers accepted
const MAX_HEADERS: usize = 32;

/// Configuration for [`KvClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Read timeout for operations
    pub read_timeout: Duration,
    /// Write timeout for operations
    pub write_timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Buffer size for reading data
    pub buffer_size: usize,
    /// Maximum response size to prevent memory exhaustion
    pub max_response_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            buffer_size: 4096,
            max_response_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Minimal HTTP/1.1 client for the key-value server
///
/// Keeps one connection open and sends requests on it one at a time.
/// Keys and values are percent-encoded before they go into the path.
///
/// # Examples
///
/// ```no_run
/// use kvsrv::http::KvClient;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut client = KvClient::connect("127.0.0.1:8080".parse()?).await?;
///     client.put("color", "red").await?;
///     assert_eq!(client.get("color").await?, "Read entry: data[color] = red");
///     Ok(())
/// }
/// ```
pub struct KvClient {
    stream: TcpStream,
    addr: SocketAddr,
    buffer: BytesMut,
    config: ClientConfig,
}

impl KvClient {
    /// Connect with default configuration
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Self::connect_with_config(addr, ClientConfig::default()).await
    }

    /// Connect to a server with custom configuration
    pub async fn connect_with_config(addr: SocketAddr, config: ClientConfig) -> Result<Self> {
        let stream = timeout(config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| KvError::Timeout("Connection timeout".to_string()))??;

        Ok(Self {
            stream,
            addr,
            buffer: BytesMut::with_capacity(config.buffer_size),
            config,
        })
    }

    /// `GET /entry/:key`, returning the response body
    pub async fn get(&mut self, key: &str) -> Result<String> {
        let path = format!("/entry/{}", urlencoding::encode(key));
        self.expect_ok(Method::GET, &path).await
    }

    /// `GET /list`, returning the response body
    pub async fn list(&mut self) -> Result<String> {
        self.expect_ok(Method::GET, "/list").await
    }

    /// `PUT /entry/:key/:value`, returning the response body
    pub async fn put(&mut self, key: &str, value: &str) -> Result<String> {
        let path = format!(
            "/entry/{}/{}",
            urlencoding::encode(key),
            urlencoding::encode(value)
        );
        self.expect_ok(Method::PUT, &path).await
    }

    /// Sends a request with an empty body and returns status and body
    ///
    /// `target` is sent verbatim, so callers are responsible for encoding.
    pub async fn request(&mut self, method: Method, target: &str) -> Result<(StatusCode, String)> {
        let request = format!(
            "{method} {target} HTTP/1.1\r\n{}: {}\r\n{}: 0\r\n\r\n",
            header::HOST,
            self.addr,
            header::CONTENT_LENGTH,
        );

        timeout(self.config.write_timeout, async {
            self.stream.write_all(request.as_bytes()).await?;
            self.stream.flush().await
        })
        .await
        .map_err(|_| KvError::Timeout("Write timeout".to_string()))??;

        timeout(self.config.read_timeout, self.read_response())
            .await
            .map_err(|_| KvError::Timeout("Read timeout".to_string()))?
    }

    /// Get client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn expect_ok(&mut self, method: Method, target: &str) -> Result<String> {
        let (status, body) = self.request(method, target).await?;
        if status != StatusCode::OK {
            return Err(KvError::Http(format!("Unexpected status {status}: {body}")));
        }
        Ok(body)
    }

    async fn read_response(&mut self) -> Result<(StatusCode, String)> {
        let (status, head_len, body_len) = loop {
            if let Some(parsed) = self.parse_head()? {
                break parsed;
            }
            self.fill().await?;
        };
        self.buffer.advance(head_len);

        if body_len > self.config.max_response_size {
            return Err(KvError::Http(format!(
                "Response too large: {} bytes, max allowed: {}",
                body_len, self.config.max_response_size
            )));
        }
        while self.buffer.len() < body_len {
            self.fill().await?;
        }
        let body = self.buffer.split_to(body_len);
        let body = String::from_utf8(body.to_vec())?;

        Ok((status, body))
    }

    async fn fill(&mut self) -> Result<()> {
        if self.buffer.len() > self.config.max_response_size {
            return Err(KvError::Http("Response head too large".to_string()));
        }
        self.buffer.reserve(self.config.buffer_size);
        if self.stream.read_buf(&mut self.buffer).await? == 0 {
            return Err(KvError::Http("Connection closed mid-response".to_string()));
        }
        Ok(())
    }

    fn parse_head(&self) -> Result<Option<(StatusCode, usize, usize)>> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut res = httparse::Response::new(&mut headers);

        let head_len = match res.parse(&self.buffer) {
            Ok(httparse::Status::Complete(len)) => len,
            Ok(httparse::Status::Partial) => return Ok(None),
            Err(e) => return Err(KvError::Http(format!("Failed to parse response: {e}"))),
        };

        let status = res
            .code
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or_else(|| KvError::Http("Missing status code".to_string()))?;
        let body_len = res
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(header::CONTENT_LENGTH.as_str()))
            .and_then(|h| std::str::from_utf8(h.value).ok())
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| KvError::Http("Missing Content-Length".to_string()))?;

        Ok(Some((status, head_len, body_len)))
    }
}
