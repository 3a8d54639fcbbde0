use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tablecache::TableCacheConfig;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings read from a YAML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub endpoint: Option<String>,
    pub instance_name: Option<String>,
    pub namespace: Option<String>,
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            instance_name: None,
            namespace: None,
            access_key_id: None,
            access_key_secret: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Values given on the command line, applied over the file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub instance_name: Option<String>,
    pub namespace: Option<String>,
    pub access_key_id: Option<String>,
    pub access_key_secret: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl CliConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: CliConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if overrides.endpoint.is_some() {
            self.endpoint = overrides.endpoint;
        }
        if overrides.instance_name.is_some() {
            self.instance_name = overrides.instance_name;
        }
        if overrides.namespace.is_some() {
            self.namespace = overrides.namespace;
        }
        if overrides.access_key_id.is_some() {
            self.access_key_id = overrides.access_key_id;
        }
        if overrides.access_key_secret.is_some() {
            self.access_key_secret = overrides.access_key_secret;
        }
        if let Some(timeout_secs) = overrides.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
        self
    }

    /// Convert to a client configuration, failing on missing settings
    pub fn to_table_cache_config(&self) -> Result<TableCacheConfig> {
        let Some(endpoint) = &self.endpoint else {
            bail!("endpoint is not configured");
        };
        let Some(instance_name) = &self.instance_name else {
            bail!("instance_name is not configured");
        };
        let Some(namespace) = &self.namespace else {
            bail!("namespace is not configured");
        };

        let mut config = TableCacheConfig::new(endpoint, instance_name, namespace)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        match (&self.access_key_id, &self.access_key_secret) {
            (Some(id), Some(secret)) => config = config.with_credentials(id, secret),
            (None, None) => {}
            _ => bail!("access_key_id and access_key_secret must be set together"),
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "endpoint: http://localhost:8800\n\
             instance_name: dev\n\
             namespace: cache\n\
             access_key_id: id\n\
             access_key_secret: secret"
        )
        .unwrap();

        let config = CliConfig::from_file(file.path()).unwrap();
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:8800"));
        assert_eq!(config.namespace.as_deref(), Some("cache"));
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);

        let client = config.to_table_cache_config().unwrap();
        assert_eq!(client.instance_name, "dev");
        assert_eq!(client.access_key_secret.as_deref(), Some("secret"));
    }

    #[test]
    fn test_missing_file() {
        let err = CliConfig::from_file("/nonexistent/tablecache.yml").unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn test_overrides_win() {
        let config = CliConfig {
            endpoint: Some("http://file".to_string()),
            namespace: Some("file-ns".to_string()),
            ..Default::default()
        }
        .apply(Overrides {
            namespace: Some("flag-ns".to_string()),
            instance_name: Some("dev".to_string()),
            timeout_secs: Some(5),
            ..Default::default()
        });

        assert_eq!(config.endpoint.as_deref(), Some("http://file"));
        assert_eq!(config.namespace.as_deref(), Some("flag-ns"));

        let client = config.to_table_cache_config().unwrap();
        assert_eq!(client.timeout, Duration::from_secs(5));
        assert!(client.access_key_id.is_none());
    }

    #[test]
    fn test_incomplete_config() {
        let err = CliConfig::default().to_table_cache_config().unwrap_err();
        assert!(err.to_string().contains("endpoint"));

        let config = CliConfig {
            endpoint: Some("http://localhost".to_string()),
            instance_name: Some("dev".to_string()),
            namespace: Some("cache".to_string()),
            access_key_id: Some("id".to_string()),
            ..Default::default()
        };
        assert!(config.to_table_cache_config().is_err());
    }
}
