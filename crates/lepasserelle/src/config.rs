// Recommender Configuration
//
// *La Configuration* (The Configuration) - Search, pricing, conflict and snapshot settings for LeRole

use crate::errors::LeRoleError;
use anyhow::{Context, Result};
use leconflit::ConflictRule;
use lecouverture::{DEFAULT_MAX_ALTERNATIVES, DEFAULT_TOP_K};
use lelicence::TierPrice;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "lerole.toml";

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "LEROLE_CONFIG";

/// LeRole configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RoleConfig {
    /// Search and ranking settings
    pub search: SearchConfig,

    /// License tier pricing
    pub pricing: PricingConfig,

    /// Duty-segregation rules
    pub conflicts: ConflictConfig,

    /// Capability snapshot source
    pub snapshot: SnapshotConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl RoleConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config_path = path.as_ref();

        if !config_path.exists() {
            return Ok(RoleConfig::default());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: RoleConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        Ok(config)
    }

    /// Save configuration as pretty TOML, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config_path = path.as_ref();
        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let toml_string =
            toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(config_path, toml_string)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Path of the configuration file to use: the explicit path, else
    /// `LEROLE_CONFIG`, else `lerole.toml` in the working directory
    pub fn locate(explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Load the located file and apply environment overrides
    pub fn from_env(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::load(Self::locate(explicit))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply `LEROLE_*` overrides from a variable lookup.
    ///
    /// Unparseable numbers are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(top_k) = lookup("LEROLE_TOP_K").and_then(|v| v.trim().parse().ok()) {
            self.search.top_k = top_k;
        }

        if let Some(max) = lookup("LEROLE_MAX_ALTERNATIVES").and_then(|v| v.trim().parse().ok()) {
            self.search.max_alternatives = max;
        }

        if let Some(records) = lookup("LEROLE_RECORDS").filter(|v| !v.trim().is_empty()) {
            self.snapshot.records_path = Some(PathBuf::from(records));
        }
    }

    /// Reject settings the recommender cannot run with
    pub fn validate(&self) -> crate::errors::Result<()> {
        if self.search.top_k == 0 {
            return Err(LeRoleError::config_error(
                "search.top_k must be at least 1",
                Some("Set top_k = 3 under [search]".to_string()),
            ));
        }
        if self.search.max_alternatives == 0 {
            return Err(LeRoleError::config_error(
                "search.max_alternatives must be at least 1",
                Some("Set max_alternatives = 5 under [search]".to_string()),
            ));
        }
        Ok(())
    }
}

/// Search and ranking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search attempts per request (primary + diversified reruns)
    pub max_alternatives: usize,

    /// Options returned per request
    pub top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_alternatives: DEFAULT_MAX_ALTERNATIVES,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Pricing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Start from the built-in tier table
    pub include_defaults: bool,

    /// Tiers added to (or replacing) the built-in table
    pub tiers: Vec<TierPrice>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            include_defaults: true,
            tiers: Vec::new(),
        }
    }
}

/// Conflict rule configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictConfig {
    /// Start from the built-in rule set
    pub include_defaults: bool,

    /// JSON file of additional rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_path: Option<PathBuf>,

    /// Rules written inline in the configuration
    pub rules: Vec<ConflictRule>,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            include_defaults: true,
            rules_path: None,
            rules: Vec::new(),
        }
    }
}

/// Snapshot source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SnapshotConfig {
    /// JSON file of capability records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter used when neither `--verbose` nor `LEROLE_LOG` / `RUST_LOG` is set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
