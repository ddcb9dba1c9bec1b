//! Threshold triples, per-plugin limits and the current-status board.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::core::config::{ActionConfig, PluginSection, ThresholdConfig};
use crate::error::{HostwatchError, Result};

/// Alert level of a metric value. Ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Careful,
    Warning,
    Critical,
}

impl Status {
    pub fn value(self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::Careful => 1,
            Status::Warning => 2,
            Status::Critical => 3,
        }
    }

    /// WARNING and CRITICAL open alert episodes
    pub fn is_alert(self) -> bool {
        matches!(self, Status::Warning | Status::Critical)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Careful => "CAREFUL",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
        }
    }

    /// Lowercase name used in configuration keys
    pub fn level(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Careful => "careful",
            Status::Warning => "warning",
            Status::Critical => "critical",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// (careful, warning, critical) limits, in percent of the stat's maximum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub careful: f64,
    pub warning: f64,
    pub critical: f64,
}

impl Threshold {
    pub fn new(careful: f64, warning: f64, critical: f64) -> Result<Self> {
        let values = [careful, warning, critical];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(HostwatchError::invalid_threshold(format!(
                "{}/{}/{} must be finite and positive",
                careful, warning, critical
            )));
        }
        if careful > warning || warning > critical {
            return Err(HostwatchError::invalid_threshold(format!(
                "{}/{}/{} must be ordered careful <= warning <= critical",
                careful, warning, critical
            )));
        }
        Ok(Self {
            careful,
            warning,
            critical,
        })
    }

    /// Build from a configured triple; missing values come from `fallback`.
    pub fn from_config(config: &ThresholdConfig, fallback: Option<Threshold>) -> Result<Self> {
        let pick = |value: Option<f64>, default: Option<f64>, level: &str| {
            value.or(default).ok_or_else(|| {
                HostwatchError::invalid_threshold(format!("missing {} value", level))
            })
        };
        Self::new(
            pick(config.careful, fallback.map(|t| t.careful), "careful")?,
            pick(config.warning, fallback.map(|t| t.warning), "warning")?,
            pick(config.critical, fallback.map(|t| t.critical), "critical")?,
        )
    }

    pub fn status(&self, value: f64) -> Status {
        if value >= self.critical {
            Status::Critical
        } else if value >= self.warning {
            Status::Warning
        } else if value >= self.careful {
            Status::Careful
        } else {
            Status::Ok
        }
    }
}

/// Case-insensitive full-match patterns
fn compile_patterns(plugin: &str, patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|pattern| {
            match RegexBuilder::new(&format!("^(?:{})$", pattern))
                .case_insensitive(true)
                .build()
            {
                Ok(re) => Some(re),
                Err(e) => {
                    log::warn!("Ignoring invalid {} pattern '{}': {}", plugin, pattern, e);
                    None
                }
            }
        })
        .collect()
}

/// Thresholds, hide/show lists, log flag and actions of one plugin.
#[derive(Debug, Clone, Default)]
pub struct Limits {
    plugin: String,
    plugin_wide: Option<Threshold>,
    per_stat: HashMap<String, Threshold>,
    hide: Vec<Regex>,
    show: Vec<Regex>,
    log: bool,
    actions: BTreeMap<String, ActionConfig>,
}

impl Limits {
    pub fn new(plugin: &str) -> Self {
        Self {
            plugin: plugin.to_string(),
            log: true,
            ..Default::default()
        }
    }

    /// Merge plugin defaults with the configuration section.
    ///
    /// `defaults` entries with an empty stat name are plugin-wide. An invalid
    /// configured triple keeps the default and is logged.
    pub fn from_config(
        plugin: &str,
        defaults: &[(&str, Threshold)],
        section: Option<&PluginSection>,
    ) -> Self {
        let mut limits = Self::new(plugin);
        for (stat, threshold) in defaults {
            limits.set_threshold(stat, *threshold);
        }

        let Some(section) = section else {
            return limits;
        };

        if let Some(config) = section.plugin_thresholds() {
            match Threshold::from_config(&config, limits.plugin_wide) {
                Ok(threshold) => limits.plugin_wide = Some(threshold),
                Err(e) => log::warn!("{}: keeping default thresholds ({})", plugin, e),
            }
        }

        for (stat, config) in &section.thresholds {
            let fallback = limits.threshold(stat);
            match Threshold::from_config(config, fallback) {
                Ok(threshold) => limits.set_threshold(stat, threshold),
                Err(e) => log::warn!("{}.{}: keeping default thresholds ({})", plugin, stat, e),
            }
        }

        limits.hide = compile_patterns(plugin, &section.hide);
        limits.show = compile_patterns(plugin, &section.show);
        limits.log = section.log.unwrap_or(true);
        limits.actions = section.actions.clone();
        limits
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn set_threshold(&mut self, stat: &str, threshold: Threshold) {
        if stat.is_empty() {
            self.plugin_wide = Some(threshold);
        } else {
            self.per_stat.insert(stat.to_string(), threshold);
        }
    }

    /// Stat-specific triple, then the plugin-wide one
    pub fn threshold(&self, stat: &str) -> Option<Threshold> {
        self.per_stat.get(stat).copied().or(self.plugin_wide)
    }

    /// Status of `current` relative to `maximum`; `None` when no threshold
    /// applies or the maximum is zero.
    pub fn status(&self, stat: &str, current: f64, maximum: f64) -> Option<Status> {
        if maximum == 0.0 || !current.is_finite() {
            return None;
        }
        let threshold = self.threshold(stat)?;
        Some(threshold.status(current * 100.0 / maximum))
    }

    /// With a show list, only matching names are displayed; otherwise names
    /// matching the hide list are not.
    pub fn is_display(&self, name: &str) -> bool {
        if !self.show.is_empty() {
            return self.show.iter().any(|re| re.is_match(name));
        }
        !self.hide.iter().any(|re| re.is_match(name))
    }

    pub fn log_enabled(&self) -> bool {
        self.log
    }

    pub fn set_log(&mut self, log: bool) {
        self.log = log;
    }

    /// `<stat>_<level>` first, then `<level>`
    pub fn action(&self, stat: &str, status: Status) -> Option<&ActionConfig> {
        self.actions
            .get(&format!("{}_{}", stat, status.level()))
            .or_else(|| self.actions.get(status.level()))
    }

    pub fn set_action(&mut self, key: &str, action: ActionConfig) {
        self.actions.insert(key.to_string(), action);
    }
}

/// Last status of every evaluated stat, keyed `<plugin>` or `<plugin>_<stat>`.
#[derive(Debug, Clone, Default)]
pub struct ThresholdBoard {
    statuses: BTreeMap<String, Status>,
}

struct MessageRule {
    message: &'static str,
    stats: &'static [&'static str],
    min_weight: u8,
}

const GLOBAL_MESSAGES: &[MessageRule] = &[
    MessageRule {
        message: "EVENTS history",
        stats: &[],
        min_weight: 0,
    },
    MessageRule {
        message: "High CPU user mode",
        stats: &["cpu_user"],
        min_weight: 2,
    },
    MessageRule {
        message: "High CPU kernel usage",
        stats: &["cpu_system"],
        min_weight: 2,
    },
    MessageRule {
        message: "High CPU I/O waiting",
        stats: &["cpu_iowait"],
        min_weight: 2,
    },
    MessageRule {
        message: "Large CPU stolen time. System running the hypervisor is too busy.",
        stats: &["cpu_steal"],
        min_weight: 2,
    },
    MessageRule {
        message: "High CPU niced value",
        stats: &["cpu_nice"],
        min_weight: 2,
    },
    MessageRule {
        message: "System overloaded in the last 5 minutes",
        stats: &["load"],
        min_weight: 2,
    },
    MessageRule {
        message: "High swap (paging) usage",
        stats: &["memswap"],
        min_weight: 2,
    },
    MessageRule {
        message: "High memory consumption",
        stats: &["mem"],
        min_weight: 2,
    },
];

impl ThresholdBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, stat_name: &str, status: Status) {
        self.statuses.insert(stat_name.to_string(), status);
    }

    pub fn get(&self, stat_name: &str) -> Option<Status> {
        self.statuses.get(stat_name).copied()
    }

    pub fn all(&self) -> &BTreeMap<String, Status> {
        &self.statuses
    }

    /// One-line summary of the heaviest current condition.
    pub fn global_message(&self) -> &'static str {
        let mut best = &GLOBAL_MESSAGES[0];
        let mut best_weight = 0u8;
        for rule in GLOBAL_MESSAGES {
            let weight: u8 = rule
                .stats
                .iter()
                .filter_map(|stat| self.get(stat))
                .map(Status::value)
                .sum();
            if weight > best_weight {
                best = rule;
                best_weight = weight;
            }
        }
        if best_weight >= best.min_weight {
            best.message
        } else {
            GLOBAL_MESSAGES[0].message
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_levels() {
        let t = Threshold::new(50.0, 70.0, 90.0).unwrap();
        assert_eq!(t.status(10.0), Status::Ok);
        assert_eq!(t.status(50.0), Status::Careful);
        assert_eq!(t.status(75.0), Status::Warning);
        assert_eq!(t.status(99.0), Status::Critical);
    }

    #[test]
    fn test_threshold_rejects_unordered() {
        assert!(Threshold::new(90.0, 70.0, 50.0).is_err());
        assert!(Threshold::new(-1.0, 70.0, 90.0).is_err());
        assert!(Threshold::new(f64::NAN, 70.0, 90.0).is_err());
    }

    #[test]
    fn test_invalid_config_keeps_default() {
        let section = PluginSection {
            careful: Some(80.0),
            warning: Some(20.0),
            critical: Some(10.0),
            ..Default::default()
        };
        let default = Threshold::new(50.0, 70.0, 90.0).unwrap();
        let limits = Limits::from_config("mem", &[("", default)], Some(&section));
        assert_eq!(limits.threshold(""), Some(default));
    }

    #[test]
    fn test_partial_config_merges_with_default() {
        let mut section = PluginSection::default();
        section.thresholds.insert(
            "user".to_string(),
            ThresholdConfig {
                critical: Some(95.0),
                ..Default::default()
            },
        );
        let default = Threshold::new(50.0, 70.0, 90.0).unwrap();
        let limits = Limits::from_config("cpu", &[("user", default)], Some(&section));
        let user = limits.threshold("user").unwrap();
        assert_eq!(user.warning, 70.0);
        assert_eq!(user.critical, 95.0);
    }

    #[test]
    fn test_status_relative_to_maximum() {
        let mut limits = Limits::new("load");
        limits.set_threshold("", Threshold::new(70.0, 100.0, 500.0).unwrap());
        // 4 cores, min15 = 4.2 -> 105% of capacity
        assert_eq!(limits.status("min15", 4.2, 400.0 / 100.0), Some(Status::Warning));
        assert_eq!(limits.status("min15", 1.0, 0.0), None);
        assert_eq!(Limits::new("x").status("y", 1.0, 1.0), None);
    }

    #[test]
    fn test_hide_and_show() {
        let section = PluginSection {
            hide: vec!["lo".to_string(), "docker.*".to_string(), "[bad".to_string()],
            ..Default::default()
        };
        let limits = Limits::from_config("network", &[], Some(&section));
        assert!(!limits.is_display("lo"));
        assert!(!limits.is_display("DOCKER0"));
        assert!(limits.is_display("eth0"));
        assert!(limits.is_display("lo0"));

        let section = PluginSection {
            show: vec!["eth.*".to_string()],
            ..Default::default()
        };
        let limits = Limits::from_config("network", &[], Some(&section));
        assert!(limits.is_display("eth1"));
        assert!(!limits.is_display("wlan0"));
    }

    #[test]
    fn test_action_lookup_order() {
        let mut limits = Limits::new("cpu");
        limits.set_action(
            "critical",
            ActionConfig {
                command: "plugin-wide".to_string(),
                repeat: false,
            },
        );
        limits.set_action(
            "user_critical",
            ActionConfig {
                command: "per-stat".to_string(),
                repeat: true,
            },
        );
        assert_eq!(limits.action("user", Status::Critical).unwrap().command, "per-stat");
        assert_eq!(limits.action("system", Status::Critical).unwrap().command, "plugin-wide");
        assert!(limits.action("user", Status::Warning).is_none());
    }

    #[test]
    fn test_global_message() {
        let mut board = ThresholdBoard::new();
        assert_eq!(board.global_message(), "EVENTS history");
        board.set("cpu_user", Status::Careful);
        assert_eq!(board.global_message(), "EVENTS history");
        board.set("mem", Status::Warning);
        assert_eq!(board.global_message(), "High memory consumption");
        board.set("load", Status::Critical);
        assert_eq!(board.global_message(), "System overloaded in the last 5 minutes");
    }
}
