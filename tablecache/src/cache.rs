//! Key-value cache operations on top of a single table

use crate::backend::TableStore;
use crate::client::{HttpTableStore, TableCacheConfig};
use crate::error::{Result, TableCacheError};
use crate::types::{
    Column, ColumnValue, Condition, DeleteRowRequest, GetRowRequest, PrimaryKey, PutRowRequest,
};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Name of the single primary key column
pub const KEY_COLUMN: &str = "key";

/// Name of the attribute column holding the cached string
pub const VALUE_COLUMN: &str = "value";

/// String cache stored in one table ("namespace") of a table store.
///
/// Cloning is cheap and clones share the backend connection.
#[derive(Clone)]
pub struct TableCache {
    store: Arc<dyn TableStore>,
    namespace: String,
}

impl TableCache {
    /// Create a cache over an existing backend
    pub fn new(store: Arc<dyn TableStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    /// Create a cache talking to the HTTP service described by `config`
    pub fn from_config(config: &TableCacheConfig) -> Result<Self> {
        let store = HttpTableStore::new(config)?;
        Ok(Self::new(Arc::new(store), config.namespace.clone()))
    }

    /// Like [`TableCache::from_config`], then creates the namespace table
    /// if it does not exist yet
    pub async fn open(config: &TableCacheConfig) -> Result<Self> {
        let cache = Self::from_config(config)?;
        cache.ensure_namespace_exists().await?;
        Ok(cache)
    }

    /// Table name backing this cache
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub(crate) fn store(&self) -> &dyn TableStore {
        self.store.as_ref()
    }

    /// Get the string stored under `key`
    ///
    /// # Errors
    /// Backend errors are returned unchanged. Otherwise:
    /// * [`TableCacheError::KeyNotFound`] if no row exists,
    /// * [`TableCacheError::NoFieldNamedValue`] if the row has no `value` column,
    /// * [`TableCacheError::ValueNotString`] if `value` is not a string.
    ///
    /// # Example
    /// ```no_run
    /// # use tablecache::{TableCache, TableCacheConfig, TableCacheError};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// # let cache = TableCache::from_config(&TableCacheConfig::new("http://localhost:8800", "dev", "cache"))?;
    /// match cache.get("user:1").await {
    ///     Ok(value) => println!("{}", value),
    ///     Err(TableCacheError::KeyNotFound) => println!("miss"),
    ///     Err(e) => return Err(e.into()),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get(&self, key: &str) -> Result<String> {
        debug!(namespace = %self.namespace, key, "GET");

        let request = GetRowRequest {
            table_name: self.namespace.clone(),
            primary_key: primary_key(key),
            max_version: 1,
            columns_to_get: vec![VALUE_COLUMN.to_string()],
        };
        let response = self.store.get_row(request).await?;

        // A miss is a successful response with an empty primary key
        if response.primary_key.is_empty() {
            return Err(TableCacheError::KeyNotFound);
        }

        let column = response
            .column(VALUE_COLUMN)
            .ok_or(TableCacheError::NoFieldNamedValue)?;

        match &column.value {
            ColumnValue::String(value) => Ok(value.clone()),
            _ => Err(TableCacheError::ValueNotString),
        }
    }

    /// Store `value` under `key`, overwriting any existing row
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        debug!(namespace = %self.namespace, key, size = value.len(), "SET");

        let request = PutRowRequest {
            table_name: self.namespace.clone(),
            primary_key: primary_key(key),
            columns: vec![Column::string(VALUE_COLUMN, value)],
            condition: Condition::ignore(),
        };
        self.store.put_row(request).await
    }

    /// Delete `key`; deleting an absent key succeeds
    pub async fn delete(&self, key: &str) -> Result<()> {
        debug!(namespace = %self.namespace, key, "DELETE");

        let request = DeleteRowRequest {
            table_name: self.namespace.clone(),
            primary_key: primary_key(key),
            condition: Condition::ignore(),
        };
        self.store.delete_row(request).await
    }
}

impl fmt::Debug for TableCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableCache")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

fn primary_key(key: &str) -> PrimaryKey {
    PrimaryKey::new().with_string(KEY_COLUMN, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryTableStore;
    use crate::types::PrimaryKeyValue;

    async fn setup_cache() -> (TableCache, Arc<MemoryTableStore>) {
        let store = Arc::new(MemoryTableStore::new());
        let cache = TableCache::new(store.clone(), "cache");
        cache.ensure_namespace_exists().await.unwrap();
        (cache, store)
    }

    #[test]
    fn test_primary_key_shape() {
        let pk = primary_key("abc");
        assert_eq!(pk.columns.len(), 1);
        assert_eq!(pk.columns[0].name, KEY_COLUMN);
        assert_eq!(
            pk.columns[0].value,
            PrimaryKeyValue::String("abc".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let (cache, _) = setup_cache().await;
        let err = cache.get("never-written").await.unwrap_err();
        assert!(err.is_key_not_found());
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (cache, _) = setup_cache().await;
        cache.set("k", "v1").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), "v1");

        cache.set("k", "v2").await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), "v2");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (cache, _) = setup_cache().await;
        cache.set("k", "v").await.unwrap();
        cache.delete("k").await.unwrap();
        assert!(matches!(
            cache.get("k").await,
            Err(TableCacheError::KeyNotFound)
        ));

        cache.delete("k").await.unwrap();
        cache.delete("never-written").await.unwrap();
    }

    #[tokio::test]
    async fn test_row_without_value_column() {
        let (cache, store) = setup_cache().await;
        store.insert_raw_row(
            "cache",
            primary_key("k"),
            vec![Column {
                name: "other".to_string(),
                value: ColumnValue::String("x".to_string()),
                timestamp: None,
            }],
        );

        assert!(matches!(
            cache.get("k").await,
            Err(TableCacheError::NoFieldNamedValue)
        ));
    }

    #[tokio::test]
    async fn test_row_with_non_string_value() {
        let (cache, store) = setup_cache().await;
        store.insert_raw_row(
            "cache",
            primary_key("k"),
            vec![Column {
                name: VALUE_COLUMN.to_string(),
                value: ColumnValue::Integer(42),
                timestamp: None,
            }],
        );

        assert!(matches!(
            cache.get("k").await,
            Err(TableCacheError::ValueNotString)
        ));
    }

    #[tokio::test]
    async fn test_backend_error_takes_precedence() {
        // Table was never created, so the backend itself fails
        let store = Arc::new(MemoryTableStore::new());
        let cache = TableCache::new(store, "missing");

        let err = cache.get("k").await.unwrap_err();
        assert!(matches!(err, TableCacheError::ServerError { .. }));
        assert!(cache.set("k", "v").await.is_err());
        assert!(cache.delete("k").await.is_err());
    }

    #[test]
    fn test_debug_format() {
        let store = Arc::new(MemoryTableStore::new());
        let cache = TableCache::new(store, "sessions");
        let debug_str = format!("{:?}", cache);
        assert!(debug_str.contains("TableCache"));
        assert!(debug_str.contains("sessions"));
    }
}
