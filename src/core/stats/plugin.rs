//! The contract every metrics plugin implements.

use std::collections::BTreeMap;
use std::time::Instant;

use crate::core::alerts::{ActionDispatcher, AlertLog, AlertSample, Limits, Status, Threshold, ThresholdBoard};
use crate::core::processes::{ProcessCollector, ProcessRecord};
use crate::core::source::MetricSource;
use crate::error::Result;

use super::cpu_cache::CpuPercentCache;
use super::snapshot::{PluginSnapshot, Record};

/// Description of one snapshot field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescription {
    pub name: &'static str,
    pub description: &'static str,
    pub unit: &'static str,
    /// Kept in the plugin history
    pub history: bool,
}

impl FieldDescription {
    pub const fn new(name: &'static str, description: &'static str, unit: &'static str) -> Self {
        Self {
            name,
            description,
            unit,
            history: false,
        }
    }

    pub const fn with_history(mut self) -> Self {
        self.history = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Flat,
    List,
}

/// Everything a plugin may read while updating.
pub struct UpdateContext<'a> {
    pub source: &'a mut dyn MetricSource,
    pub cpu: &'a mut CpuPercentCache,
    pub processes: &'a mut ProcessCollector,
    pub events: &'a AlertLog,
    /// Snapshots of the plugins already updated, this cycle or before
    pub snapshots: &'a BTreeMap<String, PluginSnapshot>,
    pub limits: &'a Limits,
    pub now: Instant,
}

impl UpdateContext<'_> {
    pub fn snapshot(&self, plugin: &str) -> Option<&PluginSnapshot> {
        self.snapshots.get(plugin)
    }
}

/// Threshold evaluation for one plugin, feeding the alert log, the status
/// board and the action dispatcher.
pub struct AlertContext<'a> {
    plugin: &'a str,
    limits: &'a Limits,
    events: &'a mut AlertLog,
    actions: &'a mut ActionDispatcher,
    board: &'a mut ThresholdBoard,
    processes: &'a [ProcessRecord],
}

impl<'a> AlertContext<'a> {
    pub fn new(
        plugin: &'a str,
        limits: &'a Limits,
        events: &'a mut AlertLog,
        actions: &'a mut ActionDispatcher,
        board: &'a mut ThresholdBoard,
        processes: &'a [ProcessRecord],
    ) -> Self {
        Self {
            plugin,
            limits,
            events,
            actions,
            board,
            processes,
        }
    }

    pub fn limits(&self) -> &Limits {
        self.limits
    }

    /// Evaluate `current` against the thresholds of `stat` (empty for the
    /// plugin-wide triple), as a percentage of `maximum`.
    ///
    /// The status is recorded on the board under `<plugin>_<stat>`, logged as
    /// event type `<PLUGIN>_<STAT>` when logging is enabled, and runs the
    /// matching action if one is configured.
    pub fn evaluate(
        &mut self,
        stat: &str,
        current: f64,
        maximum: f64,
        stats: &Record,
    ) -> Option<Status> {
        let limits = self.limits;
        let status = limits.status(stat, current, maximum)?;
        let stat_name = if stat.is_empty() {
            self.plugin.to_string()
        } else {
            format!("{}_{}", self.plugin, stat)
        };

        self.board.set(&stat_name, status);

        if limits.log_enabled() {
            let event_type = stat_name.to_uppercase();
            self.events.add(
                AlertSample {
                    state: status,
                    event_type: &event_type,
                    value: current * 100.0 / maximum,
                    desc: "",
                    global_msg: self.board.global_message(),
                },
                self.processes,
            );
        }

        match limits.action(stat, status) {
            Some(action) => {
                self.actions
                    .run(&stat_name, status, &action.command, action.repeat, stats);
            }
            None => self.actions.set(&stat_name, status),
        }

        Some(status)
    }
}

/// One independently updatable metrics category.
pub trait Plugin: Send {
    fn name(&self) -> &'static str;

    fn shape(&self) -> Shape {
        Shape::Flat
    }

    /// Field identifying the items of a list plugin
    fn get_key(&self) -> Option<&'static str> {
        None
    }

    fn fields(&self) -> &'static [FieldDescription] {
        &[]
    }

    /// `(stat, threshold)` pairs; an empty stat is plugin-wide.
    fn default_thresholds(&self) -> Vec<(&'static str, Threshold)> {
        Vec::new()
    }

    /// Reads the process table, which the registry collects before the
    /// plugin updates of a cycle
    fn needs_processes(&self) -> bool {
        false
    }

    /// Whether alerts are recorded in the log unless configured otherwise
    fn default_log(&self) -> bool {
        true
    }

    /// Compute a fresh snapshot.
    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot>;

    fn check_alerts(&self, _snapshot: &PluginSnapshot, _ctx: &mut AlertContext<'_>) {}

    /// Subset handed to exporters
    fn export(&self, snapshot: &PluginSnapshot) -> PluginSnapshot {
        snapshot.clone()
    }

    /// Snapshot reported when the plugin is disabled or unsupported
    fn empty(&self) -> PluginSnapshot {
        match self.shape() {
            Shape::Flat => PluginSnapshot::empty_flat(),
            Shape::List => PluginSnapshot::empty_list(),
        }
    }
}

/// Threshold triple for built-in defaults, which are always valid
pub(crate) fn threshold(careful: f64, warning: f64, critical: f64) -> Threshold {
    Threshold {
        careful,
        warning,
        critical,
    }
}
