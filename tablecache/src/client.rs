//! HTTP table store client implementation
//!
//! Speaks a JSON gateway in front of the table store: every action is a
//! JSON `POST {endpoint}/{Action}` signed with `x-ots-*` headers. The
//! managed service's native protobuf endpoint is not supported.

use crate::backend::TableStore;
use crate::error::{Result, TableCacheError};
use crate::types::{
    CreateTableRequest, DeleteRowRequest, GetRowRequest, GetRowResponse, ListTableResponse,
    PutRowRequest, UpdateTableRequest,
};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use hmac::{Hmac, Mac};
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha1::Sha1;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// API version sent with every request
pub const API_VERSION: &str = "2015-12-31";

const HEADER_DATE: &str = "x-ots-date";
const HEADER_API_VERSION: &str = "x-ots-apiversion";
const HEADER_ACCESS_KEY_ID: &str = "x-ots-accesskeyid";
const HEADER_INSTANCE_NAME: &str = "x-ots-instancename";
const HEADER_SIGNATURE: &str = "x-ots-signature";

/// Table cache client configuration
#[derive(Clone)]
pub struct TableCacheConfig {
    /// Base URL of the JSON gateway, e.g. `http://localhost:8800`
    pub endpoint: String,
    /// Instance the tables live in
    pub instance_name: String,
    /// Table that holds every cache record of this client
    pub namespace: String,
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
    /// Transport timeout for a single request
    pub timeout: Duration,
}

impl TableCacheConfig {
    /// Create a new configuration
    pub fn new(
        endpoint: impl Into<String>,
        instance_name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            instance_name: instance_name.into(),
            namespace: namespace.into(),
            access_key_id: None,
            access_key_secret: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the access key pair used to sign requests
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
    ) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self.access_key_secret = Some(access_key_secret.into());
        self
    }

    /// Set the timeout for requests
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for TableCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableCacheConfig")
            .field("endpoint", &self.endpoint)
            .field("instance_name", &self.instance_name)
            .field("namespace", &self.namespace)
            .field("access_key_id", &self.access_key_id)
            .field(
                "access_key_secret",
                &self.access_key_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Clone)]
struct Credentials {
    access_key_id: String,
    access_key_secret: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Table store backend reached through a JSON-over-HTTP gateway.
///
/// Request and response bodies are the PascalCase JSON shapes in
/// [`crate::types`]; the gateway is expected to translate them to the
/// store's native protocol.
#[derive(Clone)]
pub struct HttpTableStore {
    http_client: Client,
    base_url: Url,
    instance_name: String,
    credentials: Option<Arc<Credentials>>,
}

impl HttpTableStore {
    /// Create a new HTTP backend from the client configuration
    pub fn new(config: &TableCacheConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.endpoint)?;
        if base_url.cannot_be_a_base() {
            return Err(TableCacheError::InvalidConfig(format!(
                "endpoint cannot be used as a base URL: {}",
                config.endpoint
            )));
        }
        // Actions are joined onto the endpoint, so the path must end with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let credentials = match (&config.access_key_id, &config.access_key_secret) {
            (Some(id), Some(secret)) => Some(Arc::new(Credentials {
                access_key_id: id.clone(),
                access_key_secret: secret.clone(),
            })),
            (None, None) => None,
            _ => {
                return Err(TableCacheError::InvalidConfig(
                    "access key id and secret must be set together".to_string(),
                ));
            }
        };

        let http_client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http_client,
            base_url,
            instance_name: config.instance_name.clone(),
            credentials,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Send one action to the service.
    ///
    /// Every action is a `POST {endpoint}/{Action}` with a JSON body. A
    /// non-2xx status carries `{"Code": ..., "Message": ...}`.
    pub(crate) async fn send_action<B: Serialize + ?Sized>(
        &self,
        action: &str,
        body: &B,
    ) -> Result<Value> {
        let url = self.base_url.join(action)?;
        let headers = self.signed_headers(action, &now_rfc3339())?;

        debug!(action, %url, "sending table store request");

        let response = self
            .http_client
            .post(url)
            .headers(headers)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let (code, message) = match serde_json::from_str::<ErrorBody>(&error_text) {
                Ok(body) => (body.code, body.message),
                Err(_) => (String::new(), error_text),
            };
            warn!(action, status = status.as_u16(), %code, %message, "table store rejected request");
            return Err(TableCacheError::server(status.as_u16(), code, message));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn signed_headers(&self, action: &str, date: &str) -> Result<HeaderMap> {
        let mut ots_headers = BTreeMap::new();
        ots_headers.insert(HEADER_DATE, date.to_string());
        ots_headers.insert(HEADER_API_VERSION, API_VERSION.to_string());
        ots_headers.insert(HEADER_INSTANCE_NAME, self.instance_name.clone());

        if let Some(credentials) = &self.credentials {
            ots_headers.insert(HEADER_ACCESS_KEY_ID, credentials.access_key_id.clone());
            let signature = sign(&credentials.access_key_secret, action, &ots_headers)?;
            ots_headers.insert(HEADER_SIGNATURE, signature);
        }

        let mut headers = HeaderMap::new();
        for (name, value) in ots_headers {
            let value = HeaderValue::from_str(&value).map_err(|e| {
                TableCacheError::InvalidConfig(format!("invalid value for header {}: {}", name, e))
            })?;
            headers.insert(HeaderName::from_static(name), value);
        }
        Ok(headers)
    }
}

/// Request signature: base64(HMAC-SHA1(secret, canonical)) where the
/// canonical string is `/{action}\nPOST\n\n` followed by the sorted
/// `x-ots-*` headers as `name:value\n`.
pub fn sign(secret: &str, action: &str, ots_headers: &BTreeMap<&str, String>) -> Result<String> {
    let mut canonical = format!("/{}\nPOST\n\n", action);
    for (name, value) in ots_headers {
        if *name == HEADER_SIGNATURE {
            continue;
        }
        canonical.push_str(name);
        canonical.push(':');
        canonical.push_str(value.trim());
        canonical.push('\n');
    }

    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes())
        .map_err(|e| TableCacheError::InvalidConfig(format!("invalid signing key: {}", e)))?;
    mac.update(canonical.as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}

fn now_rfc3339() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

#[async_trait]
impl TableStore for HttpTableStore {
    async fn get_row(&self, request: GetRowRequest) -> Result<GetRowResponse> {
        let response = self.send_action("GetRow", &request).await?;

        // An absent row may come back as an empty body
        if response.is_null() {
            return Ok(GetRowResponse::default());
        }
        Ok(serde_json::from_value(response)?)
    }

    async fn put_row(&self, request: PutRowRequest) -> Result<()> {
        self.send_action("PutRow", &request).await?;
        Ok(())
    }

    async fn delete_row(&self, request: DeleteRowRequest) -> Result<()> {
        self.send_action("DeleteRow", &request).await?;
        Ok(())
    }

    async fn list_table(&self) -> Result<Vec<String>> {
        let response = self.send_action("ListTable", &serde_json::json!({})).await?;
        if response.is_null() {
            return Err(TableCacheError::InvalidResponse(
                "ListTable returned an empty body".to_string(),
            ));
        }
        let tables: ListTableResponse = serde_json::from_value(response)?;
        Ok(tables.table_names)
    }

    async fn create_table(&self, request: CreateTableRequest) -> Result<()> {
        self.send_action("CreateTable", &request).await?;
        Ok(())
    }

    async fn update_table(&self, request: UpdateTableRequest) -> Result<()> {
        self.send_action("UpdateTable", &request).await?;
        Ok(())
    }
}
