//! Listen address parsing

pub mod address;

pub use address::{DEFAULT_LISTEN_ADDR, ListenAddr};
