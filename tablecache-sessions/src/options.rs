//! Cookie attributes and cookie header plumbing

use crate::codec::DEFAULT_MAX_AGE;
use crate::error::{Result, SessionError};
use cookie::{Cookie, SameSite};
use http::HeaderMap;
use http::header::{COOKIE, HeaderValue, SET_COOKIE};
use time::{Duration, OffsetDateTime};

/// Attributes of the session cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: String,
    pub domain: Option<String>,
    /// Lifetime in seconds. Zero or negative deletes the session on save.
    pub max_age: i64,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age: DEFAULT_MAX_AGE,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }
}

impl CookieOptions {
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }
}

/// Build a cookie carrying `value` with the given attributes.
///
/// A positive max age also sets `Expires` when the resulting date is
/// representable; otherwise the cookie is expired immediately
/// (`Max-Age=0` and an `Expires` in the past).
pub fn new_cookie(name: &str, value: &str, options: &CookieOptions) -> Cookie<'static> {
    let mut builder = Cookie::build((name.to_string(), value.to_string()))
        .path(options.path.clone())
        .secure(options.secure)
        .http_only(options.http_only);

    if let Some(domain) = &options.domain {
        builder = builder.domain(domain.clone());
    }
    if let Some(same_site) = options.same_site {
        builder = builder.same_site(same_site);
    }

    builder = if options.max_age > 0 {
        let max_age = Duration::seconds(options.max_age);
        builder = builder.max_age(max_age);
        // Past the representable date range only Max-Age is sent
        match OffsetDateTime::now_utc().checked_add(max_age) {
            Some(expires) => builder.expires(expires),
            None => builder,
        }
    } else {
        builder
            .max_age(Duration::ZERO)
            .expires(OffsetDateTime::UNIX_EPOCH + Duration::seconds(1))
    };

    builder.build()
}

/// Value of the first cookie called `name` in the request headers
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(|cookie| cookie.ok())
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

/// Render `cookie` for a `Set-Cookie` header
pub fn cookie_header(cookie: &Cookie<'_>) -> Result<HeaderValue> {
    HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| SessionError::InvalidHeader(e.to_string()))
}

/// Append a `Set-Cookie` header, keeping any already present
pub fn append_set_cookie(headers: &mut HeaderMap, value: HeaderValue) {
    headers.append(SET_COOKIE, value);
}
