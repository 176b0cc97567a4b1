//! Configuration loading and types

use std::path::{Path, PathBuf};

use eyre::WrapErr;
use hostcfg_wua::UpdateSelector;
use serde::{Deserialize, Serialize};

/// Default search query: everything applicable that is not installed or hidden
pub const DEFAULT_SEARCH_QUERY: &str = "IsInstalled=0 and IsHidden=0";

/// Top-level configuration for the hostcfg agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Agent process settings
    #[serde(default)]
    pub agent: AgentConfig,
    /// Windows Update settings
    #[serde(default)]
    pub wua: WuaConfig,
}

/// Agent process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Windows Update settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WuaConfig {
    /// Query used when none is given on the command line
    #[serde(default = "default_search_query")]
    pub search_query: String,
    /// KB articles that are never installed
    #[serde(default)]
    pub exclude_kbs: Vec<String>,
    /// When non-empty, only updates in one of these categories are installed
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Default for WuaConfig {
    fn default() -> Self {
        Self {
            search_query: default_search_query(),
            exclude_kbs: Vec::new(),
            categories: Vec::new(),
        }
    }
}

fn default_search_query() -> String {
    DEFAULT_SEARCH_QUERY.to_string()
}

impl WuaConfig {
    /// Selector built from the configured filters
    #[must_use]
    pub fn selector(&self) -> UpdateSelector {
        UpdateSelector::new()
            .with_excluded_kbs(self.exclude_kbs.iter().cloned())
            .with_categories(self.categories.iter().cloned())
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        Self::parse(&content).wrap_err_with(|| format!("failed to parse {}", path.display()))
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    /// Returns error if the text is not a valid configuration
    pub fn parse(content: &str) -> eyre::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from an explicit path, the environment, or default paths
    ///
    /// # Errors
    /// Returns error if a config file exists but cannot be loaded
    pub fn load_default(explicit: Option<&Path>) -> eyre::Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(path) = std::env::var("HOSTCFG_CONFIG") {
            return Self::load(&PathBuf::from(path));
        }

        for path in default_paths() {
            if path.exists() {
                return Self::load(&path);
            }
        }

        tracing::debug!("no config file found, using defaults");
        Ok(Config::default())
    }
}

fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("hostcfg.toml")];
    if cfg!(windows) {
        paths.push(PathBuf::from(r"C:\ProgramData\hostcfg\hostcfg.toml"));
    } else {
        paths.push(PathBuf::from("/etc/hostcfg/hostcfg.toml"));
    }
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("hostcfg/hostcfg.toml"));
    }
    paths
}
