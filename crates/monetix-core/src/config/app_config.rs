use super::defaults;
use crate::catalog::ResourceKind;
use crate::error::{MonetixError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
///
/// Every section falls back to its defaults, so a config file only needs
/// the keys it overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub relay: RelayConfig,
    pub client: ClientConfig,
    pub bulk: BulkConfig,
}

impl AppConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            MonetixError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            MonetixError::ConfigError(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    pub fn with_relay_config(mut self, config: RelayConfig) -> Self {
        self.relay = config;
        self
    }

    pub fn with_client_config(mut self, config: ClientConfig) -> Self {
        self.client = config;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Listen address
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Host every relayed request is sent to
    pub upstream_url: String,
    /// Path prefix stripped before forwarding
    pub prefix: String,
    /// Maximum buffered request body (bytes)
    pub body_limit: usize,
    /// Built console frontend to serve next to the relay
    pub static_dir: Option<PathBuf>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: defaults::DEFAULT_RELAY_HOST.to_string(),
            port: defaults::DEFAULT_RELAY_PORT,
            upstream_url: defaults::DEFAULT_UPSTREAM_URL.to_string(),
            prefix: defaults::DEFAULT_RELAY_PREFIX.to_string(),
            body_limit: defaults::DEFAULT_RELAY_BODY_LIMIT,
            static_dir: None,
        }
    }
}

/// Inter-page and inter-batch delays for one resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingConfig {
    pub page_delay_ms: u64,
    pub icon_batch_delay_ms: u64,
}

impl PacingConfig {
    /// No delays at all
    pub fn none() -> Self {
        Self {
            page_delay_ms: 0,
            icon_batch_delay_ms: 0,
        }
    }

    pub fn for_kind(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::GamePass => Self {
                page_delay_ms: defaults::GAME_PASS_PAGE_DELAY_MS,
                icon_batch_delay_ms: defaults::GAME_PASS_ICON_BATCH_DELAY_MS,
            },
            ResourceKind::DeveloperProduct => Self {
                page_delay_ms: defaults::DEVELOPER_PRODUCT_PAGE_DELAY_MS,
                icon_batch_delay_ms: defaults::DEVELOPER_PRODUCT_ICON_BATCH_DELAY_MS,
            },
        }
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn icon_batch_delay(&self) -> Duration {
        Duration::from_millis(self.icon_batch_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Either the upstream host or a relay URL ending in its prefix
    pub base_url: String,
    pub page_size: u32,
    pub icon_batch_size: usize,
    pub game_pass: PacingConfig,
    pub developer_product: PacingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::DEFAULT_UPSTREAM_URL.to_string(),
            page_size: defaults::DEFAULT_PAGE_SIZE,
            icon_batch_size: defaults::DEFAULT_ICON_BATCH_SIZE,
            game_pass: PacingConfig::for_kind(ResourceKind::GamePass),
            developer_product: PacingConfig::for_kind(ResourceKind::DeveloperProduct),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Same pacing for both kinds
    pub fn with_pacing(mut self, pacing: PacingConfig) -> Self {
        self.game_pass = pacing;
        self.developer_product = pacing;
        self
    }

    pub fn pacing(&self, kind: ResourceKind) -> PacingConfig {
        match kind {
            ResourceKind::GamePass => self.game_pass,
            ResourceKind::DeveloperProduct => self.developer_product,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkConfig {
    pub row_delay_ms: u64,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            row_delay_ms: defaults::DEFAULT_BULK_ROW_DELAY_MS,
        }
    }
}

impl BulkConfig {
    pub fn row_delay(&self) -> Duration {
        Duration::from_millis(self.row_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::new();
        assert_eq!(config.relay.port, 3001);
        assert_eq!(config.relay.upstream_url, "https://apis.roblox.com");
        assert_eq!(config.client.page_size, 50);
        assert_eq!(config.client.icon_batch_size, 5);
        assert_eq!(config.client.pacing(ResourceKind::GamePass).page_delay_ms, 250);
        assert_eq!(
            config
                .client
                .pacing(ResourceKind::DeveloperProduct)
                .icon_batch_delay_ms,
            200
        );
        assert_eq!(config.bulk.row_delay(), Duration::from_millis(350));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"relay": {{"port": 8080}}, "bulk": {{"row_delay_ms": 0}}}}"#).unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.relay.port, 8080);
        assert_eq!(config.relay.prefix, "/api/relay");
        assert_eq!(config.bulk.row_delay_ms, 0);
        assert_eq!(config.client.page_size, 50);
    }

    #[test]
    fn test_bad_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = AppConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, MonetixError::ConfigError(_)));
    }
}
