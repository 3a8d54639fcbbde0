//! Cookie session store persisted in a table cache

use crate::codec::{SecureCookie, codecs_from_pairs, decode_multi, encode_multi};
use crate::error::{Result, SessionError};
use crate::options::{CookieOptions, append_set_cookie, cookie_header, find_cookie, new_cookie};
use crate::registry::SessionRegistry;
use crate::session::{Session, Values};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use http::HeaderMap;
use rand::RngCore;
use tablecache::{TableCache, TableCacheError};
use tracing::{debug, warn};

/// Random bytes in a generated session id
const SESSION_ID_BYTES: usize = 32;

/// Session store keeping values in a [`TableCache`] and only a signed
/// session id in the cookie.
///
/// The id and the values are encoded separately with the store's codecs,
/// both bound to the cookie name. The backend row is keyed by the plain
/// id.
#[derive(Debug)]
pub struct TableCacheStore {
    codecs: Vec<SecureCookie>,
    options: CookieOptions,
    cache: TableCache,
}

impl TableCacheStore {
    /// Create a store.
    ///
    /// `key_pairs` alternate hash and block keys, see
    /// [`codecs_from_pairs`](crate::codec::codecs_from_pairs).
    pub fn new(cache: TableCache, key_pairs: &[&[u8]]) -> Result<Self> {
        let codecs = codecs_from_pairs(key_pairs)?;
        let mut store = Self {
            codecs,
            options: CookieOptions::default(),
            cache,
        };
        store.set_max_age(store.options.max_age);
        Ok(store)
    }

    /// Replace the default cookie options of new sessions
    pub fn with_options(mut self, options: CookieOptions) -> Self {
        let max_age = options.max_age;
        self.options = options;
        self.set_max_age(max_age);
        self
    }

    pub fn options(&self) -> &CookieOptions {
        &self.options
    }

    pub fn cache(&self) -> &TableCache {
        &self.cache
    }

    pub fn codecs(&self) -> &[SecureCookie] {
        &self.codecs
    }

    /// Set the default max age of sessions and of every codec, so that
    /// values expire in the codec when the cookie does
    pub fn set_max_age(&mut self, max_age: i64) {
        self.options.max_age = max_age;
        for codec in &mut self.codecs {
            codec.set_max_age(max_age);
        }
    }

    /// Set the maximum encoded length of ids and values for every codec;
    /// zero disables the limit
    pub fn set_max_length(&mut self, max_length: usize) {
        for codec in &mut self.codecs {
            codec.set_max_length(max_length);
        }
    }

    /// Session `name` for this request, resolved once per registry.
    ///
    /// Same as [`TableCacheStore::new_session`] except that the result is
    /// kept in `registry` and returned again on later calls.
    pub async fn get<'r>(
        &self,
        registry: &'r mut SessionRegistry,
        request: &HeaderMap,
        name: &str,
    ) -> Result<&'r mut Session> {
        registry.get(self, request, name).await
    }

    /// Load session `name` from the request cookie, without registering it.
    ///
    /// A missing or unverifiable cookie, or an id with no backend row,
    /// yields a new empty session. Any other backend or decode failure
    /// returns [`SessionError::Load`] holding a new session.
    pub async fn new_session(&self, request: &HeaderMap, name: &str) -> Result<Session> {
        let mut session = Session::new(name, self.options.clone());

        let Some(cookie_value) = find_cookie(request, name) else {
            return Ok(session);
        };

        session.id = match decode_multi::<String>(name, &cookie_value, &self.codecs) {
            Ok(id) => id,
            Err(e) => {
                debug!(cookie = name, error = %e, "session cookie rejected, starting new session");
                return Ok(session);
            }
        };

        let payload = match self.cache.get(&session.id).await {
            Ok(payload) => payload,
            Err(TableCacheError::KeyNotFound) => {
                // Expired or evicted on the backend
                debug!(cookie = name, "session not found in cache, starting new session");
                return Ok(session);
            }
            Err(e) => {
                warn!(cookie = name, error = %e, "failed to fetch session");
                return Err(SessionError::load(session, e));
            }
        };

        match decode_multi::<Values>(name, &payload, &self.codecs) {
            Ok(values) => {
                session.values = values;
                session.is_new = false;
                Ok(session)
            }
            Err(e) => {
                warn!(cookie = name, error = %e, "stored session failed to decode");
                Err(SessionError::load(session, e))
            }
        }
    }

    /// Persist `session` and add its cookie to `response`.
    ///
    /// With a max age of zero or less the backend row is deleted, the
    /// values are cleared and an expiring empty cookie is sent instead. On
    /// any failure no cookie is added.
    pub async fn save(&self, response: &mut HeaderMap, session: &mut Session) -> Result<()> {
        if session.options.max_age <= 0 {
            if !session.id.is_empty() {
                self.cache.delete(&session.id).await?;
            }
            session.clear();

            let header = cookie_header(&new_cookie(session.name(), "", &session.options))?;
            append_set_cookie(response, header);
            debug!(cookie = session.name(), "session deleted");
            return Ok(());
        }

        if session.id.is_empty() {
            session.id = generate_session_id();
        }

        let encoded_id = encode_multi(session.name(), &session.id, &self.codecs)?;
        let encoded_values = encode_multi(session.name(), &session.values, &self.codecs)?;
        let header = cookie_header(&new_cookie(session.name(), &encoded_id, &session.options))?;

        self.cache.set(&session.id, &encoded_values).await?;

        append_set_cookie(response, header);
        debug!(cookie = session.name(), "session saved");
        Ok(())
    }
}

/// New random session id, URL-safe base64 without padding
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
