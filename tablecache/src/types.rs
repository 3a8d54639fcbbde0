//! Wire types for the table store backend
//!
//! Field names follow the service's PascalCase JSON convention.

use serde::{Deserialize, Serialize};

/// Value of a primary key column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "Type", content = "Value")]
pub enum PrimaryKeyValue {
    String(String),
    Integer(i64),
    Binary(Vec<u8>),
}

/// One named column of a primary key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PrimaryKeyColumn {
    pub name: String,
    pub value: PrimaryKeyValue,
}

/// Ordered primary key of a row
///
/// The backend answers a point lookup for a missing row with an empty
/// primary key rather than an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrimaryKey {
    pub columns: Vec<PrimaryKeyColumn>,
}

impl PrimaryKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a string-typed key column
    pub fn add_string(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.columns.push(PrimaryKeyColumn {
            name: name.into(),
            value: PrimaryKeyValue::String(value.into()),
        });
    }

    /// Builder form of [`PrimaryKey::add_string`]
    pub fn with_string(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_string(name, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Value of an attribute column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type", content = "Value")]
pub enum ColumnValue {
    String(String),
    Integer(i64),
    Boolean(bool),
    Double(f64),
    Binary(Vec<u8>),
}

impl ColumnValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Attribute column of a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Column {
    pub name: String,
    pub value: ColumnValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl Column {
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: ColumnValue::String(value.into()),
            timestamp: None,
        }
    }
}

/// Precondition on the row's prior existence for a write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowExistenceExpectation {
    /// Write regardless of the current state
    #[default]
    Ignore,
    ExpectExist,
    ExpectNotExist,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Condition {
    pub row_existence: RowExistenceExpectation,
}

impl Condition {
    pub fn ignore() -> Self {
        Self {
            row_existence: RowExistenceExpectation::Ignore,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetRowRequest {
    pub table_name: String,
    pub primary_key: PrimaryKey,
    /// Must be set, the service rejects lookups without it
    pub max_version: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns_to_get: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetRowResponse {
    #[serde(default)]
    pub primary_key: PrimaryKey,
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl GetRowResponse {
    /// Find an attribute column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRowRequest {
    pub table_name: String,
    pub primary_key: PrimaryKey,
    pub columns: Vec<Column>,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteRowRequest {
    pub table_name: String,
    pub primary_key: PrimaryKey,
    pub condition: Condition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrimaryKeyType {
    String,
    Integer,
    Binary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PrimaryKeySchema {
    pub name: String,
    #[serde(rename = "Type")]
    pub key_type: PrimaryKeyType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableMeta {
    pub table_name: String,
    pub primary_key: Vec<PrimaryKeySchema>,
}

/// Table-level data lifecycle options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableOption {
    /// Row lifetime in seconds, -1 for unlimited
    pub time_to_live: i32,
    pub max_versions: i32,
}

/// Provisioned read/write capacity units; zero means on-demand billing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReservedThroughput {
    pub read: i32,
    pub write: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateTableRequest {
    pub table_meta: TableMeta,
    pub table_option: TableOption,
    pub reserved_throughput: ReservedThroughput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateTableRequest {
    pub table_name: String,
    pub table_option: TableOption,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListTableResponse {
    #[serde(default)]
    pub table_names: Vec<String>,
}
