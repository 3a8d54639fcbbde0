//! Common test utilities

use http::HeaderMap;
use http::header::{COOKIE, HeaderValue, SET_COOKIE};
use std::sync::Arc;
use tablecache::{MemoryTableStore, TableCache};
use tablecache_sessions::TableCacheStore;

#[allow(dead_code)] // Used by other test modules
pub const HASH_KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

#[allow(dead_code)] // Used by other test modules
pub const BLOCK_KEY: &[u8] = b"fedcba9876543210";

/// Session store over an in-memory backend whose namespace already exists
#[allow(dead_code)] // Used by other test modules
pub async fn setup_test_store(namespace: &str) -> (TableCacheStore, Arc<MemoryTableStore>) {
    let backend = Arc::new(MemoryTableStore::new());
    let cache = TableCache::new(backend.clone(), namespace);
    cache.ensure_namespace_exists().await.unwrap();
    let store = TableCacheStore::new(cache, &[HASH_KEY, BLOCK_KEY]).unwrap();
    (store, backend)
}

/// Session store whose namespace was never created, so every backend call
/// fails
#[allow(dead_code)] // Used by other test modules
pub fn setup_broken_store(namespace: &str) -> (TableCacheStore, Arc<MemoryTableStore>) {
    let backend = Arc::new(MemoryTableStore::new());
    let cache = TableCache::new(backend.clone(), namespace);
    let store = TableCacheStore::new(cache, &[HASH_KEY, BLOCK_KEY]).unwrap();
    (store, backend)
}

/// Turn the `Set-Cookie` headers of a response into the `Cookie` header a
/// browser would send back
#[allow(dead_code)] // Used by other test modules
pub fn request_from_response(response: &HeaderMap) -> HeaderMap {
    let pairs: Vec<&str> = response
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .collect();

    let mut request = HeaderMap::new();
    if !pairs.is_empty() {
        request.insert(COOKIE, HeaderValue::from_str(&pairs.join("; ")).unwrap());
    }
    request
}

/// Request carrying a single raw cookie
#[allow(dead_code)] // Used by other test modules
pub fn request_with_cookie(name: &str, value: &str) -> HeaderMap {
    let mut request = HeaderMap::new();
    request.insert(
        COOKIE,
        HeaderValue::from_str(&format!("{}={}", name, value)).unwrap(),
    );
    request
}

/// Value of the first `Set-Cookie` header
#[allow(dead_code)] // Used by other test modules
pub fn set_cookie(response: &HeaderMap) -> String {
    response
        .get(SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
