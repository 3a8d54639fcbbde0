//! Common test utilities

use mockito::{Server, ServerGuard};
use tablecache::{TableCache, TableCacheConfig};

/// Create a mock table store server for testing
#[allow(dead_code)] // Used by other test modules
pub async fn create_mock_server() -> ServerGuard {
    Server::new_async().await
}

/// Setup a cache pointing to a mock server
#[allow(dead_code)] // Used by other test modules
pub async fn setup_test_cache(namespace: &str) -> (TableCache, ServerGuard) {
    let server = create_mock_server().await;
    let config = TableCacheConfig::new(server.url(), "test-instance", namespace)
        .with_credentials("test-id", "test-secret")
        .with_timeout(std::time::Duration::from_secs(5));
    let cache = TableCache::from_config(&config).unwrap();
    (cache, server)
}
