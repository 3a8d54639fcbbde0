//! Backend abstraction over the managed table store

use crate::error::Result;
use crate::types::{
    CreateTableRequest, DeleteRowRequest, GetRowRequest, GetRowResponse, PutRowRequest,
    UpdateTableRequest,
};
use async_trait::async_trait;

/// Operations the cache needs from a wide-column table store.
///
/// Implementations must answer a point lookup for an absent row with
/// `Ok` and an empty primary key, not with an error.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Point lookup by primary key
    async fn get_row(&self, request: GetRowRequest) -> Result<GetRowResponse>;

    /// Write a full row
    async fn put_row(&self, request: PutRowRequest) -> Result<()>;

    /// Remove a row
    async fn delete_row(&self, request: DeleteRowRequest) -> Result<()>;

    /// Names of every table in the instance
    async fn list_table(&self) -> Result<Vec<String>>;

    async fn create_table(&self, request: CreateTableRequest) -> Result<()>;

    /// Change table options such as TTL
    async fn update_table(&self, request: UpdateTableRequest) -> Result<()>;
}
