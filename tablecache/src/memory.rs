//! In-process table store backend
//!
//! Follows the service contract closely enough to run the cache and the
//! session store without a network: misses are empty successes, unknown
//! tables and duplicate creates are rejected with the service's error
//! codes, and table TTL expires rows. Expired rows are hidden from reads
//! and dropped on the next write to the table.

use crate::backend::TableStore;
use crate::error::{
    CODE_OBJECT_ALREADY_EXIST, CODE_OBJECT_NOT_EXIST, CODE_PARAMETER_INVALID, Result,
    TableCacheError,
};
use crate::namespace::{MIN_TTL_SECONDS, TTL_UNLIMITED};
use crate::types::{
    Column, CreateTableRequest, DeleteRowRequest, GetRowRequest, GetRowResponse, PrimaryKey,
    PutRowRequest, RowExistenceExpectation, TableMeta, TableOption, UpdateTableRequest,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use tracing::debug;

/// Backend error code for a failed row existence precondition
pub const CODE_CONDITION_CHECK_FAIL: &str = "OTSConditionCheckFail";

/// Per-operation call counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub get_row: u64,
    pub put_row: u64,
    pub delete_row: u64,
    pub list_table: u64,
    pub create_table: u64,
    pub update_table: u64,
}

#[derive(Debug, Clone)]
struct StoredRow {
    columns: Vec<Column>,
    written_at: i64,
}

#[derive(Debug)]
struct MemoryTable {
    meta: TableMeta,
    option: TableOption,
    rows: HashMap<PrimaryKey, StoredRow>,
}

fn row_expired(option: &TableOption, row: &StoredRow, now: i64) -> bool {
    option.time_to_live > 0 && now - row.written_at >= i64::from(option.time_to_live)
}

impl MemoryTable {
    fn is_expired(&self, row: &StoredRow, now: i64) -> bool {
        row_expired(&self.option, row, now)
    }

    /// Drop rows whose TTL has passed
    fn purge_expired(&mut self, now: i64) {
        let option = self.option;
        self.rows.retain(|_, row| !row_expired(&option, row, now));
    }

    fn check_primary_key(&self, primary_key: &PrimaryKey) -> Result<()> {
        let names_match = primary_key.columns.len() == self.meta.primary_key.len()
            && primary_key
                .columns
                .iter()
                .zip(&self.meta.primary_key)
                .all(|(column, schema)| column.name == schema.name);

        if names_match {
            Ok(())
        } else {
            Err(parameter_invalid(format!(
                "primary key does not match the schema of table {}",
                self.meta.table_name
            )))
        }
    }

    fn check_condition(
        &self,
        primary_key: &PrimaryKey,
        expectation: RowExistenceExpectation,
        now: i64,
    ) -> Result<()> {
        let exists = self
            .rows
            .get(primary_key)
            .is_some_and(|row| !self.is_expired(row, now));

        match (expectation, exists) {
            (RowExistenceExpectation::ExpectExist, false)
            | (RowExistenceExpectation::ExpectNotExist, true) => Err(TableCacheError::server(
                403,
                CODE_CONDITION_CHECK_FAIL,
                "Condition check failed.",
            )),
            _ => Ok(()),
        }
    }
}

/// Table store kept in memory
pub struct MemoryTableStore {
    tables: RwLock<HashMap<String, MemoryTable>>,
    stats: Mutex<StoreStats>,
    clock: fn() -> i64,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::with_clock(|| chrono::Utc::now().timestamp())
    }

    /// Create a store reading the current unix time from `clock`
    pub fn with_clock(clock: fn() -> i64) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            stats: Mutex::new(StoreStats::default()),
            clock,
        }
    }

    /// Call counters since creation
    pub fn stats(&self) -> StoreStats {
        *self.stats.lock()
    }

    /// Current options of a table
    pub fn table_option(&self, table_name: &str) -> Option<TableOption> {
        self.tables.read().get(table_name).map(|table| table.option)
    }

    /// Number of live rows in a table
    pub fn row_count(&self, table_name: &str) -> usize {
        let now = (self.clock)();
        self.tables.read().get(table_name).map_or(0, |table| {
            table
                .rows
                .values()
                .filter(|row| !table.is_expired(row, now))
                .count()
        })
    }

    /// Write a row without schema checks, for shaping data the cache
    /// itself would never write. No-op if the table does not exist.
    pub fn insert_raw_row(&self, table_name: &str, primary_key: PrimaryKey, columns: Vec<Column>) {
        let now = (self.clock)();
        if let Some(table) = self.tables.write().get_mut(table_name) {
            table.rows.insert(
                primary_key,
                StoredRow {
                    columns,
                    written_at: now,
                },
            );
        }
    }

    fn record(&self, op: impl FnOnce(&mut StoreStats)) {
        op(&mut self.stats.lock());
    }
}

impl Default for MemoryTableStore {
    fn default() -> Self {
        Self::new()
    }
}

fn table_not_found(table_name: &str) -> TableCacheError {
    TableCacheError::server(
        404,
        CODE_OBJECT_NOT_EXIST,
        format!("Requested table does not exist: {}", table_name),
    )
}

fn parameter_invalid(message: impl Into<String>) -> TableCacheError {
    TableCacheError::server(400, CODE_PARAMETER_INVALID, message)
}

fn check_ttl(ttl: i32) -> Result<()> {
    if ttl == TTL_UNLIMITED || ttl >= MIN_TTL_SECONDS {
        Ok(())
    } else {
        Err(parameter_invalid(format!(
            "TimeToLive must be -1 or at least {} seconds, got {}",
            MIN_TTL_SECONDS, ttl
        )))
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn get_row(&self, request: GetRowRequest) -> Result<GetRowResponse> {
        self.record(|s| s.get_row += 1);

        if request.max_version < 1 {
            return Err(parameter_invalid("MaxVersion must be set"));
        }

        let now = (self.clock)();
        let tables = self.tables.read();
        let table = tables
            .get(&request.table_name)
            .ok_or_else(|| table_not_found(&request.table_name))?;
        table.check_primary_key(&request.primary_key)?;

        let row = match table.rows.get(&request.primary_key) {
            Some(row) if !table.is_expired(row, now) => row,
            _ => {
                debug!(table = %request.table_name, "row not found");
                return Ok(GetRowResponse::default());
            }
        };

        let columns = if request.columns_to_get.is_empty() {
            row.columns.clone()
        } else {
            row.columns
                .iter()
                .filter(|c| request.columns_to_get.contains(&c.name))
                .cloned()
                .collect()
        };

        Ok(GetRowResponse {
            primary_key: request.primary_key,
            columns,
        })
    }

    async fn put_row(&self, request: PutRowRequest) -> Result<()> {
        self.record(|s| s.put_row += 1);

        let now = (self.clock)();
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(&request.table_name)
            .ok_or_else(|| table_not_found(&request.table_name))?;
        table.check_primary_key(&request.primary_key)?;
        table.purge_expired(now);
        table.check_condition(&request.primary_key, request.condition.row_existence, now)?;

        table.rows.insert(
            request.primary_key,
            StoredRow {
                columns: request.columns,
                written_at: now,
            },
        );
        Ok(())
    }

    async fn delete_row(&self, request: DeleteRowRequest) -> Result<()> {
        self.record(|s| s.delete_row += 1);

        let now = (self.clock)();
        let mut tables = self.tables.write();
        let table = tables
            .get_mut(&request.table_name)
            .ok_or_else(|| table_not_found(&request.table_name))?;
        table.check_primary_key(&request.primary_key)?;
        table.purge_expired(now);
        table.check_condition(&request.primary_key, request.condition.row_existence, now)?;

        table.rows.remove(&request.primary_key);
        Ok(())
    }

    async fn list_table(&self) -> Result<Vec<String>> {
        self.record(|s| s.list_table += 1);

        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_table(&self, request: CreateTableRequest) -> Result<()> {
        self.record(|s| s.create_table += 1);

        let table_name = request.table_meta.table_name.clone();
        if table_name.is_empty() {
            return Err(parameter_invalid("table name must not be empty"));
        }
        if request.table_meta.primary_key.is_empty() {
            return Err(parameter_invalid("table must have a primary key"));
        }
        check_ttl(request.table_option.time_to_live)?;

        let mut tables = self.tables.write();
        if tables.contains_key(&table_name) {
            return Err(TableCacheError::server(
                409,
                CODE_OBJECT_ALREADY_EXIST,
                format!("Requested table already exists: {}", table_name),
            ));
        }

        tables.insert(
            table_name,
            MemoryTable {
                meta: request.table_meta,
                option: request.table_option,
                rows: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn update_table(&self, request: UpdateTableRequest) -> Result<()> {
        self.record(|s| s.update_table += 1);

        check_ttl(request.table_option.time_to_live)?;

        let mut tables = self.tables.write();
        let table = tables
            .get_mut(&request.table_name)
            .ok_or_else(|| table_not_found(&request.table_name))?;
        table.option = request.table_option;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Condition, PrimaryKeySchema, PrimaryKeyType, ReservedThroughput};
    use std::sync::atomic::{AtomicI64, Ordering};

    static NOW: AtomicI64 = AtomicI64::new(1_700_000_000);

    fn test_clock() -> i64 {
        NOW.load(Ordering::SeqCst)
    }

    static PURGE_NOW: AtomicI64 = AtomicI64::new(1_700_000_000);

    fn purge_clock() -> i64 {
        PURGE_NOW.load(Ordering::SeqCst)
    }

    fn create_request(name: &str, ttl: i32) -> CreateTableRequest {
        CreateTableRequest {
            table_meta: TableMeta {
                table_name: name.to_string(),
                primary_key: vec![PrimaryKeySchema {
                    name: "key".to_string(),
                    key_type: PrimaryKeyType::String,
                }],
            },
            table_option: TableOption {
                time_to_live: ttl,
                max_versions: 1,
            },
            reserved_throughput: ReservedThroughput::default(),
        }
    }

    fn get_request(table: &str, key: &str) -> GetRowRequest {
        GetRowRequest {
            table_name: table.to_string(),
            primary_key: PrimaryKey::new().with_string("key", key),
            max_version: 1,
            columns_to_get: Vec::new(),
        }
    }

    fn put_request(table: &str, key: &str, value: &str, condition: Condition) -> PutRowRequest {
        PutRowRequest {
            table_name: table.to_string(),
            primary_key: PrimaryKey::new().with_string("key", key),
            columns: vec![Column::string("value", value)],
            condition,
        }
    }

    #[tokio::test]
    async fn test_missing_row_is_empty_success() {
        let store = MemoryTableStore::new();
        store.create_table(create_request("t", -1)).await.unwrap();

        let response = store.get_row(get_request("t", "nope")).await.unwrap();
        assert!(response.primary_key.is_empty());
        assert!(response.columns.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let store = MemoryTableStore::new();
        let err = store.get_row(get_request("t", "k")).await.unwrap_err();
        assert_eq!(err.code(), Some(CODE_OBJECT_NOT_EXIST));
    }

    #[tokio::test]
    async fn test_max_version_required() {
        let store = MemoryTableStore::new();
        store.create_table(create_request("t", -1)).await.unwrap();

        let mut request = get_request("t", "k");
        request.max_version = 0;
        let err = store.get_row(request).await.unwrap_err();
        assert_eq!(err.code(), Some(CODE_PARAMETER_INVALID));
    }

    #[tokio::test]
    async fn test_schema_mismatch() {
        let store = MemoryTableStore::new();
        store.create_table(create_request("t", -1)).await.unwrap();

        let mut request = get_request("t", "k");
        request.primary_key = PrimaryKey::new().with_string("id", "k");
        let err = store.get_row(request).await.unwrap_err();
        assert_eq!(err.code(), Some(CODE_PARAMETER_INVALID));
    }

    #[tokio::test]
    async fn test_duplicate_create() {
        let store = MemoryTableStore::new();
        store.create_table(create_request("t", -1)).await.unwrap();
        let err = store.create_table(create_request("t", -1)).await.unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(store.stats().create_table, 2);
    }

    #[tokio::test]
    async fn test_invalid_ttl_rejected() {
        let store = MemoryTableStore::new();
        assert!(store.create_table(create_request("t", 60)).await.is_err());
        assert!(store.create_table(create_request("t", 0)).await.is_err());
        store.create_table(create_request("t", 86400)).await.unwrap();
    }

    #[tokio::test]
    async fn test_row_conditions() {
        let store = MemoryTableStore::new();
        store.create_table(create_request("t", -1)).await.unwrap();

        let expect_exist = Condition {
            row_existence: RowExistenceExpectation::ExpectExist,
        };
        let expect_not_exist = Condition {
            row_existence: RowExistenceExpectation::ExpectNotExist,
        };

        let err = store
            .put_row(put_request("t", "k", "v", expect_exist))
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some(CODE_CONDITION_CHECK_FAIL));

        store
            .put_row(put_request("t", "k", "v", expect_not_exist))
            .await
            .unwrap();
        assert!(
            store
                .put_row(put_request("t", "k", "v", expect_not_exist))
                .await
                .is_err()
        );
        store
            .put_row(put_request("t", "k", "v2", Condition::ignore()))
            .await
            .unwrap();
        assert_eq!(store.row_count("t"), 1);
    }

    #[tokio::test]
    async fn test_columns_to_get_filter() {
        let store = MemoryTableStore::new();
        store.create_table(create_request("t", -1)).await.unwrap();
        store.insert_raw_row(
            "t",
            PrimaryKey::new().with_string("key", "k"),
            vec![Column::string("value", "v"), Column::string("extra", "x")],
        );

        let mut request = get_request("t", "k");
        request.columns_to_get = vec!["value".to_string()];
        let response = store.get_row(request).await.unwrap();
        assert_eq!(response.columns, vec![Column::string("value", "v")]);
    }

    #[tokio::test]
    async fn test_ttl_expires_rows() {
        let store = MemoryTableStore::with_clock(test_clock);
        store.create_table(create_request("t", -1)).await.unwrap();
        store
            .put_row(put_request("t", "k", "v", Condition::ignore()))
            .await
            .unwrap();

        store
            .update_table(UpdateTableRequest {
                table_name: "t".to_string(),
                table_option: TableOption {
                    time_to_live: 86400,
                    max_versions: 1,
                },
            })
            .await
            .unwrap();

        let response = store.get_row(get_request("t", "k")).await.unwrap();
        assert!(!response.primary_key.is_empty());

        NOW.fetch_add(86400, Ordering::SeqCst);
        let response = store.get_row(get_request("t", "k")).await.unwrap();
        assert!(response.primary_key.is_empty());
        assert_eq!(store.row_count("t"), 0);
    }

    #[tokio::test]
    async fn test_writes_drop_expired_rows() {
        let store = MemoryTableStore::with_clock(purge_clock);
        store.create_table(create_request("t", 86400)).await.unwrap();
        for key in ["a", "b"] {
            store
                .put_row(put_request("t", key, "v", Condition::ignore()))
                .await
                .unwrap();
        }

        PURGE_NOW.fetch_add(86400, Ordering::SeqCst);
        store
            .put_row(put_request("t", "c", "v", Condition::ignore()))
            .await
            .unwrap();

        let tables = store.tables.read();
        let rows = &tables.get("t").unwrap().rows;
        assert_eq!(rows.len(), 1);
        assert!(rows.contains_key(&PrimaryKey::new().with_string("key", "c")));
    }
}
