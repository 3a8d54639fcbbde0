//! # tablecache-sessions
//!
//! HTTP sessions whose values live in a [`tablecache`] namespace while the
//! client only holds a signed (and optionally encrypted) session id cookie.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use http::HeaderMap;
//! use tablecache::{TableCache, TableCacheConfig};
//! use tablecache_sessions::{SessionRegistry, TableCacheStore};
//!
//! # async fn handle(request: HeaderMap) -> Result<HeaderMap, Box<dyn std::error::Error>> {
//! let config = TableCacheConfig::new("http://localhost:8800", "dev", "sessions");
//! let cache = TableCache::open(&config).await?;
//! let store = TableCacheStore::new(cache, &[b"a-32-byte-long-hash-key-for-hmac!"])?;
//!
//! let mut registry = SessionRegistry::new();
//! let session = store.get(&mut registry, &request, "session").await?;
//! session.insert("visits", 1);
//!
//! let mut response = HeaderMap::new();
//! registry.save_all(&store, &mut response).await?;
//! # Ok(response)
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod options;
pub mod registry;
pub mod session;
pub mod store;

pub use codec::{SecureCookie, generate_random_key};
pub use cookie::SameSite;
pub use error::{CodecError, Result, SessionError};
pub use options::CookieOptions;
pub use registry::SessionRegistry;
pub use session::{Session, Values};
pub use store::{TableCacheStore, generate_session_id};
