//! Namespace (backing table) provisioning

use crate::cache::{KEY_COLUMN, TableCache};
use crate::error::Result;
use crate::types::{
    CreateTableRequest, PrimaryKeySchema, PrimaryKeyType, ReservedThroughput, TableMeta,
    TableOption, UpdateTableRequest,
};
use tracing::{debug, info};

/// TTL value meaning rows never expire
pub const TTL_UNLIMITED: i32 = -1;

/// Smallest finite TTL the service accepts (one day)
pub const MIN_TTL_SECONDS: i32 = 86400;

impl TableCache {
    /// Check whether the namespace table exists
    pub async fn namespace_exists(&self) -> Result<bool> {
        let tables = self.store().list_table().await?;
        Ok(tables.iter().any(|table| table == self.namespace()))
    }

    /// Create the namespace table: primary key `key` (string), unlimited
    /// TTL, one retained version, no reserved throughput.
    pub async fn create_namespace(&self) -> Result<()> {
        let request = CreateTableRequest {
            table_meta: TableMeta {
                table_name: self.namespace().to_string(),
                primary_key: vec![PrimaryKeySchema {
                    name: KEY_COLUMN.to_string(),
                    key_type: PrimaryKeyType::String,
                }],
            },
            table_option: TableOption {
                time_to_live: TTL_UNLIMITED,
                max_versions: 1,
            },
            // Reserved capacity is billed hourly, stay on-demand
            reserved_throughput: ReservedThroughput { read: 0, write: 0 },
        };

        self.store().create_table(request).await?;
        info!(namespace = %self.namespace(), "created namespace table");
        Ok(())
    }

    /// Create the namespace table unless it already exists.
    ///
    /// Another process may create the table between the existence check
    /// and the create call; the backend's "already exists" rejection is
    /// then treated as success.
    pub async fn ensure_namespace_exists(&self) -> Result<()> {
        if self.namespace_exists().await? {
            debug!(namespace = %self.namespace(), "namespace table already exists");
            return Ok(());
        }

        match self.create_namespace().await {
            Err(e) if e.is_already_exists() => {
                debug!(namespace = %self.namespace(), "namespace table created concurrently");
                Ok(())
            }
            other => other,
        }
    }

    /// Set the lifetime of rows in the namespace.
    ///
    /// `ttl_seconds` must be [`TTL_UNLIMITED`] or at least
    /// [`MIN_TTL_SECONDS`]. This is not checked here; the backend rejects
    /// other values.
    pub async fn set_ttl(&self, ttl_seconds: i32) -> Result<()> {
        let request = UpdateTableRequest {
            table_name: self.namespace().to_string(),
            table_option: TableOption {
                time_to_live: ttl_seconds,
                max_versions: 1,
            },
        };

        self.store().update_table(request).await?;
        info!(namespace = %self.namespace(), ttl_seconds, "updated namespace TTL");
        Ok(())
    }
}
