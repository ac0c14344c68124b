//! Configuration loading and management

use crate::core::error::ConfigError;
use crate::core::filter::{SortDirection, SortState};
use serde::{Deserialize, Serialize};

/// Catalog used when no base URL is configured
pub const DEFAULT_BASE_URL: &str = "https://frontend-take-home-service.fetch.com";

/// Environment variable overriding [`ClientConfig::base_url`]
pub const ENV_BASE_URL: &str = "DOG_FINDER_BASE_URL";

/// Environment variable overriding [`ClientConfig::page_size`]
pub const ENV_PAGE_SIZE: &str = "DOG_FINDER_PAGE_SIZE";

/// Optional sign-in details, so the CLI can log in without prompting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginConfig {
    pub name: String,
    pub email: String,
}

/// Complete configuration for the catalog client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Scheme and host of the catalog; cursors are resolved against it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Results per page, sent as `size`; `None` leaves it to the service
    #[serde(default)]
    pub page_size: Option<u32>,

    /// Sort applied to the first search of a session
    #[serde(default)]
    pub default_sort: SortDirection,

    /// Buffer of the store's change-notification channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    #[serde(default)]
    pub login: Option<LoginConfig>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_event_capacity() -> usize {
    256
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: None,
            default_sort: SortDirection::Asc,
            event_capacity: default_event_capacity(),
            login: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.to_string()),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DOG_FINDER_*` environment overrides
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(
            std::env::var(ENV_BASE_URL).ok(),
            std::env::var(ENV_PAGE_SIZE).ok(),
        )
    }

    fn with_overrides(
        mut self,
        base_url: Option<String>,
        page_size: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        if let Some(raw) = page_size {
            let size = raw.trim().parse::<u32>().map_err(|e| ConfigError::InvalidValue {
                field: ENV_PAGE_SIZE.to_string(),
                value: raw.clone(),
                message: e.to_string(),
            })?;
            self.page_size = Some(size);
        }
        self.validate()?;
        Ok(self)
    }

    /// Merge several configurations, later ones winning field by field
    ///
    /// Fields still at their default value do not override earlier ones.
    pub fn merge(configs: Vec<ClientConfig>) -> ClientConfig {
        let defaults = ClientConfig::default();
        configs
            .into_iter()
            .fold(ClientConfig::default(), |mut merged, config| {
                if config.base_url != defaults.base_url {
                    merged.base_url = config.base_url;
                }
                if config.page_size.is_some() {
                    merged.page_size = config.page_size;
                }
                if config.default_sort != defaults.default_sort {
                    merged.default_sort = config.default_sort;
                }
                if config.event_capacity != defaults.event_capacity {
                    merged.event_capacity = config.event_capacity;
                }
                if config.login.is_some() {
                    merged.login = config.login;
                }
                merged
            })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "base_url".to_string(),
                value: self.base_url.clone(),
                message: "must start with http:// or https://".to_string(),
            });
        }
        if self.page_size == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "page_size".to_string(),
                value: "0".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn initial_sort(&self) -> SortState {
        SortState::breed(self.default_sort)
    }
}
