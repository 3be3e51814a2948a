use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub const ENV_API_BASE: &str = "FORMFLOW_API_BASE";
pub const ENV_TOKEN: &str = "FORMFLOW_TOKEN";
pub const ENV_TENANT: &str = "FORMFLOW_TENANT";

pub const DEFAULT_UPLOAD_DELAY_MS: u64 = 100;
pub const DEFAULT_LOGIN_PATH: &str = "/login";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid url in {key}: {source}")]
    InvalidUrl {
        key: String,
        #[source]
        source: url::ParseError,
    },
    #[error("no api base configured for tenant '{0}'")]
    UnknownTenant(String),
    #[error("no api base configured; set default_api_base or FORMFLOW_API_BASE")]
    MissingApiBase,
}

/// Client settings read from a TOML file and the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub default_api_base: Option<Url>,
    /// Tenant name (the leading subdomain) to its API base.
    pub tenants: BTreeMap<String, Url>,
    pub tenant: Option<String>,
    pub token: Option<String>,
    pub upload_delay_ms: u64,
    pub login_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_api_base: None,
            tenants: BTreeMap::new(),
            tenant: None,
            token: None,
            upload_delay_ms: DEFAULT_UPLOAD_DELAY_MS,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Reads `path` when given, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&raw)?
            }
            None => Self::default(),
        };
        config.apply_env_with(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_API_BASE).filter(|value| !value.is_empty()) {
            let url = Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl {
                key: ENV_API_BASE.into(),
                source,
            })?;
            self.default_api_base = Some(url);
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|value| !value.is_empty()) {
            self.token = Some(token);
        }
        if let Some(tenant) = lookup(ENV_TENANT).filter(|value| !value.is_empty()) {
            self.tenant = Some(tenant);
        }
        Ok(())
    }

    pub fn upload_delay(&self) -> Duration {
        Duration::from_millis(self.upload_delay_ms)
    }

    /// Base URL for the configured tenant, or the default one.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        match &self.tenant {
            Some(tenant) => self
                .tenants
                .get(tenant)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownTenant(tenant.clone())),
            None => self.default_api_base.clone().ok_or(ConfigError::MissingApiBase),
        }
    }

    /// Picks the API base from the host the form is served on. A host with at
    /// least three labels names its tenant in the first one; unknown tenants
    /// and bare hosts use the default base.
    pub fn resolve_base_url(&self, host: &str) -> Result<Url, ConfigError> {
        let hostname = host.split(':').next().unwrap_or_default().to_lowercase();
        let labels: Vec<&str> = hostname.split('.').filter(|label| !label.is_empty()).collect();
        if labels.len() >= 3
            && let Some(url) = self.tenants.get(labels[0])
        {
            return Ok(url.clone());
        }
        self.default_api_base.clone().ok_or(ConfigError::MissingApiBase)
    }
}
