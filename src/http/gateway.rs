use super::protocol::{HttpProtocolError, Request, Response};
use super::router::Route;
use crate::store::{KeyValueStore, Snapshot};
use std::sync::Arc;
use tracing::debug;

/// Maps routed requests onto store operations and renders the results
///
/// Holds a shared reference to the store; cloning a gateway is cheap and
/// every clone sees the same entries.
#[derive(Debug, Clone)]
pub struct Gateway {
    store: Arc<KeyValueStore>,
}

impl Gateway {
    pub fn new(store: Arc<KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<KeyValueStore> {
        &self.store
    }

    /// Handles one request; only a path that is not valid UTF-8 after
    /// percent-decoding is an error
    pub fn handle(&self, request: &Request) -> Result<Response, HttpProtocolError> {
        let route = Route::resolve(&request.method, request.path())?;
        Ok(self.dispatch(route))
    }

    /// Runs the store operation behind a resolved route
    pub fn dispatch(&self, route: Route) -> Response {
        match route {
            Route::Entry { key } => {
                let value = self.store.get(&key);
                debug!(%key, found = value.is_some(), "Read entry");
                Response::ok(render_entry(&key, value.as_deref()))
            }
            Route::List => {
                let snapshot = self.store.list();
                debug!(entries = snapshot.len(), "Read list");
                Response::ok(render_list(&snapshot))
            }
            Route::Update { key, value } => {
                self.store.set(key.as_str(), value.as_str());
                debug!(%key, %value, "Updated entry");
                Response::ok(render_update(&key, &value))
            }
            Route::NotFound => Response::not_found(),
        }
    }
}

/// An absent key renders exactly like a key set to the empty string.
pub fn render_entry(key: &str, value: Option<&str>) -> String {
    format!("Read entry: data[{key}] = {}", value.unwrap_or_default())
}

pub fn render_list(snapshot: &Snapshot) -> String {
    format!("Read list: {snapshot}")
}

pub fn render_update(key: &str, value: &str) -> String {
    format!("Updated: data[{key}] = {value}")
}
