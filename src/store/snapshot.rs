use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Owned copy of the store's entries, ordered by key
///
/// Produced by [`KeyValueStore::list`](super::KeyValueStore::list) while the
/// read lock is held, so it reflects one consistent point in time and is
/// unaffected by writes that start afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: BTreeMap<String, String>,
}

impl Snapshot {
    pub(crate) fn from_map(map: &HashMap<String, String>) -> Self {
        Self {
            entries: map
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Renders as `k1:v1, k2:v2`; an empty snapshot renders as nothing.
impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}:{value}")?;
        }
        Ok(())
    }
}
