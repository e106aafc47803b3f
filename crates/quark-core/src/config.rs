//! VM configuration.
//!
//! Loaded from TOML. Every field has a default, so a partial file is valid.

use quark_types::{Address, Genesis};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// VM configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Chain parameters
    pub genesis: Genesis,
    /// Maximum pending transactions (0 = unbounded)
    pub mempool_max_size: usize,
    /// Maximum transactions per built block (0 = limited by cost only)
    pub build_block_max_txs: usize,
    /// Fee recipient, hex encoded
    pub beneficiary: Option<String>,
    /// Log filter directive
    pub log_level: String,
    /// Emit JSON logs
    pub log_json: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            genesis: Genesis::default(),
            mempool_max_size: 0,
            build_block_max_txs: 0,
            beneficiary: None,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl VmConfig {
    /// Load configuration from file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: VmConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|e| anyhow::anyhow!("Failed to write config file '{}': {}", path.display(), e))?;
        Ok(())
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.genesis
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid genesis: {}", e))?;
        self.beneficiary()?;
        if self.log_level.trim().is_empty() {
            anyhow::bail!("Log level cannot be empty");
        }
        Ok(())
    }

    /// Parsed beneficiary address, if configured.
    pub fn beneficiary(&self) -> anyhow::Result<Option<Address>> {
        self.beneficiary
            .as_deref()
            .map(|raw| {
                raw.parse::<Address>()
                    .map_err(|e| anyhow::anyhow!("Invalid beneficiary '{}': {}", raw, e))
            })
            .transpose()
    }
}
