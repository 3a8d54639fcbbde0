//! Per-request session registry

use crate::error::Result;
use crate::session::Session;
use crate::store::TableCacheStore;
use http::HeaderMap;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Sessions resolved during one request, keyed by cookie name.
///
/// Create one per request and pass it to [`TableCacheStore::get`] so that
/// repeated lookups of the same session reuse the first result instead of
/// hitting the backend again. Failed loads are remembered too.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Result<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name` through `store` on first use, then from memory
    pub async fn get(
        &mut self,
        store: &TableCacheStore,
        request: &HeaderMap,
        name: &str,
    ) -> Result<&mut Session> {
        let entry = match self.sessions.entry(name.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(store.new_session(request, name).await),
        };

        match entry {
            Ok(session) => Ok(session),
            Err(e) => Err(e.clone()),
        }
    }

    /// Save every successfully resolved session, stopping at the first
    /// failure
    pub async fn save_all(&mut self, store: &TableCacheStore, response: &mut HeaderMap) -> Result<()> {
        for session in self.sessions.values_mut().filter_map(|entry| entry.as_mut().ok()) {
            store.save(response, session).await?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
