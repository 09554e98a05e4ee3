//! Common traits and helpers used across the kvsrv library

pub mod test_utils;
pub mod traits;

pub use test_utils::{TestServer, spawn_test_server, spawn_test_server_with_config};
pub use traits::KvServerTrait;
