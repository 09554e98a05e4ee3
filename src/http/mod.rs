//! HTTP access layer for the key-value store
//!
//! Parses HTTP/1.1 requests off a TCP connection, routes the three
//! supported request shapes to [`KeyValueStore`](crate::store::KeyValueStore)
//! operations and answers with plain text.

pub mod client;
pub mod config;
pub mod gateway;
pub mod protocol;
pub mod router;
pub mod server;


pub use client::{ClientConfig, KvClient};
pub use config::HttpConfig;
pub use gateway::Gateway;
pub use protocol::{HttpConnection, Request, Response};
pub use router::Route;
pub use server::KvServer;
