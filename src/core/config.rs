use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_REFRESH: f64 = 2.0;
pub const DEFAULT_HISTORY_SIZE: usize = 1200;
pub const DEFAULT_PEAK_TIME: f64 = 6.0;
pub const DEFAULT_MIN_INTERVAL: f64 = 6.0;
pub const DEFAULT_MAX_EVENTS: usize = 10;
pub const DEFAULT_CACHE_TIMEOUT: f64 = 60.0;
pub const DEFAULT_BROWSER_PORT: u16 = 61208;
pub const DEFAULT_BROWSER_COLUMNS: &str = "system:hostname,load:min5,cpu:total,mem:percent";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub processes: ProcessConfig,
    /// Per-plugin sections, keyed by plugin name
    #[serde(default)]
    pub plugins: BTreeMap<String, PluginSection>,
    #[serde(default)]
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Seconds between two refresh cycles
    pub refresh: f64,
    /// Points kept per history item
    pub history_size: usize,
    /// Cache interval for CPU percent reads (seconds)
    pub cpu_cache: f64,
    /// Plugins disabled regardless of their own section
    pub disable: Vec<String>,
    /// Plugins enabled regardless of their own section
    pub enable: Vec<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            refresh: DEFAULT_REFRESH,
            history_size: DEFAULT_HISTORY_SIZE,
            cpu_cache: DEFAULT_REFRESH,
            disable: Vec::new(),
            enable: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Episodes shorter than this (seconds) are discarded as noise
    pub peak_time: f64,
    /// A closed episode of the same type is reopened within this window (seconds)
    pub min_interval: f64,
    pub max_events: usize,
    /// Actions are suppressed for this long after startup (default: twice the refresh)
    pub action_start_delay: Option<f64>,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            peak_time: DEFAULT_PEAK_TIME,
            min_interval: DEFAULT_MIN_INTERVAL,
            max_events: DEFAULT_MAX_EVENTS,
            action_start_delay: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Regex, or `key:regex` to match a single field
    pub filter: Option<String>,
    /// Comma-separated patterns selecting exported processes
    pub export_filter: Option<String>,
    pub max_processes: Option<usize>,
    pub sort_key: String,
    pub tree: bool,
    /// Fetch fds, context switches and connections for the top-N
    pub extended: bool,
    /// Username and command line caches are flushed after this many seconds
    pub cache_timeout: f64,
    pub disable_kernel_threads: bool,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            filter: None,
            export_filter: None,
            max_processes: None,
            sort_key: "auto".to_string(),
            tree: false,
            extended: false,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            disable_kernel_threads: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSection {
    pub disable: Option<bool>,
    pub refresh: Option<f64>,
    /// Plugin-wide threshold triple
    pub careful: Option<f64>,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
    /// Per-stat triples, e.g. `thresholds.user`
    pub thresholds: BTreeMap<String, ThresholdConfig>,
    pub hide: Vec<String>,
    pub show: Vec<String>,
    /// Record alerts of this plugin in the alert log
    pub log: Option<bool>,
    /// Keyed by `<level>` or `<stat>_<level>`
    pub actions: BTreeMap<String, ActionConfig>,
}

impl PluginSection {
    /// The plugin-wide triple, if any of its values is set
    pub fn plugin_thresholds(&self) -> Option<ThresholdConfig> {
        if self.careful.is_none() && self.warning.is_none() && self.critical.is_none() {
            return None;
        }
        Some(ThresholdConfig {
            careful: self.careful,
            warning: self.warning,
            critical: self.critical,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub careful: Option<f64>,
    pub warning: Option<f64>,
    pub critical: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub command: String,
    #[serde(default)]
    pub repeat: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// `plugin:field[:key]` entries separated by commas
    pub columns: String,
    /// Per-request timeout (seconds)
    pub timeout: f64,
    pub servers: Vec<ServerEntry>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            columns: DEFAULT_BROWSER_COLUMNS.to_string(),
            timeout: 3.0,
            servers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerEntry {
    #[serde(default)]
    pub name: Option<String>,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    DEFAULT_BROWSER_PORT
}

impl Config {
    /// Load from the default location, or defaults when no file exists
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let data = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        if data.trim().is_empty() {
            return Ok(Config::default());
        }

        match toml::from_str(&data) {
            Ok(config) => Ok(config),
            Err(e) => {
                log::warn!(
                    "Ignoring unparsable config file {:?}, using defaults: {}",
                    config_path,
                    e
                );
                Ok(Config::default())
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let data = toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        fs::write(config_path, data)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().with_context(|| "Could not determine config directory")?;

        Ok(config_dir.join("hostwatch").join("hostwatch.toml"))
    }

    pub fn plugin(&self, name: &str) -> Option<&PluginSection> {
        self.plugins.get(name)
    }

    /// Global enable list wins, then global disable list, then the plugin section.
    pub fn is_plugin_enabled(&self, name: &str) -> bool {
        if self.global.enable.iter().any(|p| p == name) {
            return true;
        }
        if self.global.disable.iter().any(|p| p == name) {
            return false;
        }
        !self
            .plugin(name)
            .and_then(|section| section.disable)
            .unwrap_or(false)
    }

    pub fn plugin_refresh(&self, name: &str) -> f64 {
        self.plugin(name)
            .and_then(|section| section.refresh)
            .unwrap_or(self.global.refresh)
    }

    pub fn action_start_delay(&self) -> f64 {
        self.alerts
            .action_start_delay
            .unwrap_or(self.global.refresh * 2.0)
    }

    pub fn set_plugin_enabled(&mut self, name: &str, enabled: bool) {
        self.global.enable.retain(|p| p != name);
        self.global.disable.retain(|p| p != name);
        self.plugins.entry(name.to_string()).or_default().disable = Some(!enabled);
    }
}
