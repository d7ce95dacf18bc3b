//! Cache key construction.

use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
};

/// Identifies one cached rendering: prefix, path, and the hashed query string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    prefix: String,
    path: String,
    query_hash: u64,
}

impl PageKey {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_hash(&self) -> u64 {
        self.query_hash
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{:016x}", self.prefix, self.path, self.query_hash)
    }
}

/// Build the key for `path` with the raw `query` string (without the leading `?`).
///
/// `/?page=2` and `/?page=02` get different keys; both render the same page
/// but are cached independently.
pub fn page_key(prefix: &str, path: &str, query: Option<&str>) -> PageKey {
    PageKey {
        prefix: prefix.to_string(),
        path: path.to_string(),
        query_hash: hash_query(query.unwrap_or("")),
    }
}

pub fn hash_query(query: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    hasher.finish()
}
