use super::protocol::HttpProtocolError;
use ::http::Method;

/// The three request shapes the gateway serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `GET /entry/:key`
    Entry { key: String },
    /// `GET /list`
    List,
    /// `PUT /entry/:key/:value`
    Update { key: String, value: String },
    NotFound,
}

impl Route {
    /// Matches a method and request path against the route table
    ///
    /// `path` carries no query string. It is percent-decoded before it is
    /// split, so an encoded `/` separates segments just like a literal one.
    /// Empty segments never bind a parameter. Fails when a `%` is not
    /// followed by two hex digits or the decoded path is not UTF-8.
    pub fn resolve(method: &Method, path: &str) -> Result<Route, HttpProtocolError> {
        check_escapes(path)?;
        let decoded = urlencoding::decode(path).map_err(|e| {
            HttpProtocolError::InvalidRequest(format!("Invalid UTF-8 in {path:?}: {e}"))
        })?;

        let Some(rest) = decoded.strip_prefix('/') else {
            return Ok(Route::NotFound);
        };
        let segments: Vec<&str> = rest.split('/').collect();

        let route = match segments.as_slice() {
            ["list"] if *method == Method::GET => Route::List,
            ["entry", key] if *method == Method::GET && !key.is_empty() => Route::Entry {
                key: key.to_string(),
            },
            ["entry", key, value]
                if *method == Method::PUT && !key.is_empty() && !value.is_empty() =>
            {
                Route::Update {
                    key: key.to_string(),
                    value: value.to_string(),
                }
            }
            _ => Route::NotFound,
        };
        Ok(route)
    }
}

fn check_escapes(path: &str) -> Result<(), HttpProtocolError> {
    let bytes = path.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let escape = bytes.get(i + 1..i + 3);
            if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                return Err(HttpProtocolError::InvalidRequest(format!(
                    "Invalid percent-encoding in {path:?} at byte {i}"
                )));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}
