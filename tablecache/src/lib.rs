//! # tablecache
//!
//! String key-value cache stored in a single table ("namespace") of a
//! managed wide-column table store.
//!
//! - **Get / Set / Delete** with explicit miss and corruption errors
//! - **Lazy provisioning**: the namespace table is created on first use
//! - **Pluggable backend**: HTTP service client or in-process store
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tablecache::{TableCache, TableCacheConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TableCacheConfig::new("http://localhost:8800", "dev", "cache")
//!         .with_credentials("access-key-id", "access-key-secret");
//!     let cache = TableCache::open(&config).await?;
//!
//!     cache.set("user:1", "John Doe").await?;
//!     let value = cache.get("user:1").await?;
//!     println!("Value: {}", value);
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cache;
pub mod client;
pub mod error;
pub mod memory;
pub mod namespace;
pub mod types;

pub use backend::TableStore;
pub use cache::{KEY_COLUMN, TableCache, VALUE_COLUMN};
pub use client::{HttpTableStore, TableCacheConfig};
pub use error::{Result, TableCacheError};
pub use memory::{MemoryTableStore, StoreStats};
pub use namespace::{MIN_TTL_SECONDS, TTL_UNLIMITED};
