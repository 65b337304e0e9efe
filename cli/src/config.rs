//! Stakeholder configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use stakeline_client::ClientConfig;
use stakeline_types::{NetworkId, StakeHolder, StakingAddress, StakingParams};
use stakeline_utils::LogFormat;

use crate::error::ConfigError;

/// Configuration for one stakeholder.
///
/// Loaded from a TOML file via [`StakerConfig::from_toml_file`]; command
/// line flags override individual fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StakerConfig {
    /// Which network to talk to.
    #[serde(default = "default_network")]
    pub network: NetworkId,

    /// JSON-RPC endpoint. Defaults to the network's public provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_uri: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staking_address: Option<StakingAddress>,

    /// Set for preallocation-backed stakers; `staking_address` is then the
    /// preallocation contract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beneficiary_address: Option<StakingAddress>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keystore_path: Option<PathBuf>,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Bound on each transaction confirmation wait.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Overrides of the network's contract constants.
    #[serde(default)]
    pub staking: StakingOverrides,
}

/// Per-field overrides layered on the network's [`StakingParams`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_stake_duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_worker_periods: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_length_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch_secs: Option<u64>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> NetworkId {
    NetworkId::Dev
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_confirmation_timeout_secs() -> u64 {
    120
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

// ── Impl ───────────────────────────────────────────────────────────────

impl StakerConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Write the config to `path`, refusing to replace an existing file
    /// unless `overwrite` is set.
    pub fn save(&self, path: &Path, overwrite: bool) -> Result<(), ConfigError> {
        if path.exists() && !overwrite {
            return Err(ConfigError::Invalid(format!(
                "{} already exists",
                path.display()
            )));
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn provider(&self) -> &str {
        self.provider_uri
            .as_deref()
            .unwrap_or_else(|| self.network.default_provider())
    }

    /// Network defaults with the `[staking]` overrides applied.
    pub fn staking_params(&self) -> StakingParams {
        let mut params = match self.network {
            NetworkId::Mainnet => StakingParams::mainnet_defaults(),
            NetworkId::Testnet | NetworkId::Dev => StakingParams::testnet_defaults(),
        };
        let o = &self.staking;
        if let Some(v) = o.min_stake_duration {
            params.min_stake_duration = v;
        }
        if let Some(v) = o.min_worker_periods {
            params.min_worker_periods = v;
        }
        if let Some(v) = o.period_length_secs {
            params.period_length_secs = v;
        }
        if let Some(v) = o.epoch_secs {
            params.epoch_secs = v;
        }
        params
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            params: self.staking_params(),
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    /// The configured stakeholder.
    pub fn holder(&self) -> Result<StakeHolder, ConfigError> {
        let staking = self
            .staking_address
            .clone()
            .ok_or_else(|| ConfigError::Invalid("staking_address is not set".into()))?;
        Ok(match &self.beneficiary_address {
            Some(beneficiary) => StakeHolder::preallocation(staking, beneficiary.clone()),
            None => StakeHolder::direct(staking),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.confirmation_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "confirmation_timeout_secs must be positive".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive".into()));
        }
        if self.staking_params().period_length_secs == 0 {
            return Err(ConfigError::Invalid(
                "staking.period_length_secs must be positive".into(),
            ));
        }
        if self.beneficiary_address.is_some() && self.staking_address.is_none() {
            return Err(ConfigError::Invalid(
                "beneficiary_address requires staking_address (the preallocation contract)".into(),
            ));
        }
        Ok(())
    }
}

impl Default for StakerConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            provider_uri: None,
            staking_address: None,
            beneficiary_address: None,
            keystore_path: None,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            staking: StakingOverrides::default(),
        }
    }
}
