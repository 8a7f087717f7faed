//! Startup configuration, read from a TOML file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use alloy_primitives::Address;
use serde::Deserialize;

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "WHITELIST_CONFIG";
/// Picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "whitelist.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// JSON-RPC endpoint the wallet serves.
    pub wallet_url: String,
    pub contract_address: Address,
    /// The only network the app operates against. 4 is Rinkeby.
    pub required_chain_id: u64,
    pub confirmation_poll_ms: u64,
    /// `0` waits for confirmation forever.
    pub confirmation_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            wallet_url: "http://127.0.0.1:1248".to_string(),
            contract_address: Address::ZERO,
            required_chain_id: 4,
            confirmation_poll_ms: 2_000,
            confirmation_timeout_secs: 300,
        }
    }
}

impl AppConfig {
    /// Load from `$WHITELIST_CONFIG`, else `./whitelist.toml`, else defaults.
    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Self::from_file(default_path);
        }
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wallet_url.trim().is_empty() {
            return Err(ConfigError::Invalid("wallet_url must not be empty".into()));
        }
        if self.contract_address == Address::ZERO {
            return Err(ConfigError::Invalid("contract_address must be set".into()));
        }
        if self.confirmation_poll_ms == 0 {
            return Err(ConfigError::Invalid(
                "confirmation_poll_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirmation_poll_ms)
    }

    pub fn confirmation_timeout(&self) -> Option<Duration> {
        (self.confirmation_timeout_secs > 0)
            .then(|| Duration::from_secs(self.confirmation_timeout_secs))
    }
}
