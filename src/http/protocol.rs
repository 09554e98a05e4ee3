use ::http::{Method, StatusCode, Version, header};
use bytes::{Buf, Bytes, BytesMut};
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Upper bound on the number of request headers accepted
const MAX_HEADERS: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum HttpProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("HTTP parsing error: {0}")]
    HttpParse(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Request head too large: {size} bytes, maximum allowed: {max} bytes")]
    HeadTooLarge { size: usize, max: usize },
    #[error("Incomplete request")]
    IncompleteRequest,
}

impl HttpProtocolError {
    /// Status to answer with before closing the connection, if the peer is
    /// still worth answering
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpProtocolError::HttpParse(_) | HttpProtocolError::InvalidRequest(_) => {
                Some(StatusCode::BAD_REQUEST)
            }
            HttpProtocolError::HeadTooLarge { .. } => {
                Some(StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE)
            }
            _ => None,
        }
    }
}

/// A parsed request head
///
/// Bodies are never kept; anything announced through `Content-Length` is
/// drained from the connection before the request is handed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    /// Request target exactly as sent, query string included
    pub target: String,
    pub version: Version,
    pub keep_alive: bool,
}

impl Request {
    /// Path part of the target, without the query string
    ///
    /// An absolute-form target (`http://host/list`) is reduced to its path;
    /// one with no path at all is `/`.
    pub fn path(&self) -> &str {
        let target = self
            .target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path);

        match target.split_once("://") {
            Some((scheme, rest)) if !scheme.is_empty() && !scheme.contains('/') => {
                rest.find('/').map_or("/", |i| &rest[i..])
            }
            _ => target,
        }
    }
}

/// A plain-text response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub body: String,
    /// Ask the peer to close the connection after this response
    pub close: bool,
}

impl Response {
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            close: false,
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::text(StatusCode::OK, body)
    }

    /// Default not-found page
    pub fn not_found() -> Self {
        Self::text(StatusCode::NOT_FOUND, "404 page not found")
    }

    /// Response sent for a request that could not be parsed
    pub fn error(status: StatusCode) -> Self {
        let reason = status.canonical_reason().unwrap_or("Error");
        Self::text(status, format!("{} {}", status.as_u16(), reason)).closing()
    }

    pub fn closing(mut self) -> Self {
        self.close = true;
        self
    }

    /// Serializes status line, headers and body
    pub fn encode(&self, server_name: Option<&str>) -> Bytes {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\n{}: text/plain; charset=utf-8\r\n{}: {}\r\n",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or(""),
            header::CONTENT_TYPE,
            header::CONTENT_LENGTH,
            self.body.len(),
        );
        if let Some(name) = server_name {
            head.push_str(&format!("{}: {}\r\n", header::SERVER, name));
        }
        if self.close {
            head.push_str(&format!("{}: close\r\n", header::CONNECTION));
        }
        head.push_str("\r\n");

        let mut out = BytesMut::with_capacity(head.len() + self.body.len());
        out.extend_from_slice(head.as_bytes());
        out.extend_from_slice(self.body.as_bytes());
        out.freeze()
    }
}

/// Server side of one HTTP/1.1 connection
///
/// Keeps the bytes read past the end of one request so pipelined requests
/// on a keep-alive connection are not lost.
pub struct HttpConnection {
    inner: TcpStream,
    buffer: BytesMut,
    read_size: usize,
    max_request_size: usize,
}

impl HttpConnection {
    pub fn new(stream: TcpStream, read_size: usize, max_request_size: usize) -> Self {
        Self {
            inner: stream,
            buffer: BytesMut::with_capacity(read_size),
            read_size: read_size.max(1),
            max_request_size,
        }
    }

    /// Reads the next request head, draining its body
    ///
    /// Returns `Ok(None)` when the peer closes the connection between
    /// requests.
    pub async fn read_request(&mut self) -> Result<Option<Request>, HttpProtocolError> {
        loop {
            if let Some((request, head_len, body_len)) = self.parse_head()? {
                self.buffer.advance(head_len);
                self.discard_body(body_len).await?;
                return Ok(Some(request));
            }

            if self.buffer.len() >= self.max_request_size {
                return Err(HttpProtocolError::HeadTooLarge {
                    size: self.buffer.len(),
                    max: self.max_request_size,
                });
            }

            if self.fill().await? == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(HttpProtocolError::IncompleteRequest);
            }
        }
    }

    pub async fn write_response(
        &mut self,
        response: &Response,
        server_name: Option<&str>,
    ) -> Result<(), HttpProtocolError> {
        self.inner.write_all(&response.encode(server_name)).await?;
        self.inner.flush().await?;
        Ok(())
    }

    async fn fill(&mut self) -> Result<usize, HttpProtocolError> {
        self.buffer.reserve(self.read_size);
        Ok(self.inner.read_buf(&mut self.buffer).await?)
    }

    fn parse_head(&self) -> Result<Option<(Request, usize, usize)>, HttpProtocolError> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);

        let head_len = match req.parse(&self.buffer) {
            Ok(httparse::Status::Complete(len)) => len,
            Ok(httparse::Status::Partial) => return Ok(None),
            Err(e) => {
                return Err(HttpProtocolError::HttpParse(format!(
                    "Failed to parse headers: {e}"
                )));
            }
        };
        if head_len > self.max_request_size {
            return Err(HttpProtocolError::HeadTooLarge {
                size: head_len,
                max: self.max_request_size,
            });
        }

        // Complete parses always carry method, path and version
        let method = req
            .method
            .ok_or_else(|| HttpProtocolError::HttpParse("Missing method".to_string()))?;
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| HttpProtocolError::InvalidRequest(format!("Bad method: {e}")))?;
        let target = req
            .path
            .ok_or_else(|| HttpProtocolError::HttpParse("Missing request target".to_string()))?
            .to_string();
        let version = match req.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            other => {
                return Err(HttpProtocolError::InvalidRequest(format!(
                    "Unsupported HTTP version: {other:?}"
                )));
            }
        };

        let mut content_length = 0usize;
        let mut connection = None;
        let mut chunked = false;
        for h in req.headers.iter() {
            if h.name.eq_ignore_ascii_case(header::CONTENT_LENGTH.as_str()) {
                content_length = std::str::from_utf8(h.value)
                    .ok()
                    .and_then(|v| v.trim().parse().ok())
                    .ok_or_else(|| {
                        HttpProtocolError::InvalidRequest("Bad Content-Length".to_string())
                    })?;
            } else if h.name.eq_ignore_ascii_case(header::CONNECTION.as_str()) {
                connection = Some(String::from_utf8_lossy(h.value).to_ascii_lowercase());
            } else if h.name.eq_ignore_ascii_case(header::TRANSFER_ENCODING.as_str()) {
                chunked = true;
            }
        }

        let mut keep_alive = match connection.as_deref() {
            Some(c) if c.contains("close") => false,
            Some(c) if c.contains("keep-alive") => true,
            _ => version == Version::HTTP_11,
        };
        // Body framing we do not decode makes the next request boundary unknown
        if chunked {
            keep_alive = false;
            content_length = 0;
        }

        let request = Request {
            method,
            target,
            version,
            keep_alive,
        };
        Ok(Some((request, head_len, content_length)))
    }

    async fn discard_body(&mut self, mut remaining: usize) -> Result<(), HttpProtocolError> {
        loop {
            let buffered = remaining.min(self.buffer.len());
            self.buffer.advance(buffered);
            remaining -= buffered;
            if remaining == 0 {
                return Ok(());
            }
            if self.fill().await? == 0 {
                return Err(HttpProtocolError::IncompleteRequest);
            }
        }
    }
}
