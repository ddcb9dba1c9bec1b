//! The aggregator owning every plugin and the shared state they update.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::core::alerts::{ActionDispatcher, ActionRunner, AlertLog, Limits, ThresholdBoard};
use crate::core::config::Config;
use crate::core::processes::{ProcessCollector, SortKey};
use crate::core::source::{MetricSource, SystemSource};
use crate::core::timer::{duration_from_secs, Timer};
use crate::error::{HostwatchError, Result};

use super::cpu_cache::CpuPercentCache;
use super::dag::{default_graph, PluginGraph};
use super::history::History;
use super::plugin::{AlertContext, FieldDescription, Plugin, UpdateContext};
use super::plugins::default_plugins;
use super::snapshot::{value_label, PluginSnapshot};

/// Outcome of a plugin's last update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Not updated yet, or the last update succeeded
    Ok,
    /// The platform lacks the capability; the snapshot stays empty
    Unsupported,
    /// The last update failed; the previous snapshot is kept
    Failed,
}

struct PluginSlot {
    plugin: Box<dyn Plugin>,
    enabled: bool,
    history: History,
    limits: Limits,
    refresh: Timer,
    state: PluginState,
}

/// Owns the plugins, the metric source and the shared collectors.
///
/// One [`Stats::update_all`] call is one cycle: plugins are updated in
/// dependency order, then their alert checks run against the fresh snapshot.
pub struct Stats {
    source: Box<dyn MetricSource>,
    slots: BTreeMap<&'static str, PluginSlot>,
    snapshots: BTreeMap<String, PluginSnapshot>,
    graph: PluginGraph,
    cpu_cache: CpuPercentCache,
    processes: ProcessCollector,
    events: AlertLog,
    actions: ActionDispatcher,
    board: ThresholdBoard,
    cycles: u64,
}

impl Stats {
    /// Every built-in plugin, reading the live system
    pub fn new(config: &Config) -> Self {
        Self::with_source(config, Box::new(SystemSource::new()))
    }

    pub fn with_source(config: &Config, source: Box<dyn MetricSource>) -> Self {
        Self::with_plugins(config, source, default_plugins())
    }

    pub fn with_plugins(
        config: &Config,
        source: Box<dyn MetricSource>,
        plugins: Vec<Box<dyn Plugin>>,
    ) -> Self {
        let mut slots = BTreeMap::new();
        for plugin in plugins {
            let name = plugin.name();
            let section = config.plugin(name);
            let mut limits = Limits::from_config(name, &plugin.default_thresholds(), section);
            if section.and_then(|s| s.log).is_none() {
                limits.set_log(plugin.default_log());
            }

            slots.insert(
                name,
                PluginSlot {
                    enabled: config.is_plugin_enabled(name),
                    history: History::with_capacity(config.global.history_size),
                    limits,
                    refresh: Timer::expired_with(duration_from_secs(config.plugin_refresh(name))),
                    state: PluginState::Ok,
                    plugin,
                },
            );
        }

        let alerts = &config.alerts;
        Self {
            source,
            slots,
            snapshots: BTreeMap::new(),
            graph: default_graph(),
            cpu_cache: CpuPercentCache::new(duration_from_secs(config.global.cpu_cache)),
            processes: ProcessCollector::new(&config.processes),
            events: AlertLog::new(alerts.max_events, alerts.peak_time, alerts.min_interval),
            actions: ActionDispatcher::new(duration_from_secs(config.action_start_delay())),
            board: ThresholdBoard::new(),
            cycles: 0,
        }
    }

    /// Replace the command runner used by alert actions
    pub fn set_action_runner(&mut self, start_delay: Duration, runner: Box<dyn ActionRunner>) {
        self.actions = ActionDispatcher::with_runner(start_delay, runner);
    }

    /// Run one cycle.
    ///
    /// Plugin failures are logged and leave the previous snapshot in place.
    /// Only a process enumeration failure on the first cycle is returned.
    pub fn update_all(&mut self) -> Result<()> {
        let now = Instant::now();
        self.update_processes(now)?;
        let order = self.graph.update_order(self.slots.keys().copied());

        for name in &order {
            let Some(slot) = self.slots.get_mut(name.as_str()) else {
                continue;
            };
            if !slot.enabled || !slot.refresh.expired() {
                continue;
            }
            slot.refresh.rearm();

            let mut ctx = UpdateContext {
                source: self.source.as_mut(),
                cpu: &mut self.cpu_cache,
                processes: &mut self.processes,
                events: &self.events,
                snapshots: &self.snapshots,
                limits: &slot.limits,
                now,
            };

            match slot.plugin.update(&mut ctx) {
                Ok(snapshot) => {
                    record_history(slot, &snapshot);
                    slot.state = PluginState::Ok;
                    self.snapshots.insert(name.clone(), snapshot);
                }
                Err(HostwatchError::Unsupported(what)) => {
                    if slot.state != PluginState::Unsupported {
                        log::debug!("Plugin {} unsupported on this platform: {}", name, what);
                    }
                    slot.state = PluginState::Unsupported;
                    self.snapshots.insert(name.clone(), slot.plugin.empty());
                }
                Err(e @ HostwatchError::ProcessEnumeration(_)) => return Err(e),
                Err(e) => {
                    log::warn!("Plugin {} update failed: {}", name, e);
                    slot.state = PluginState::Failed;
                }
            }

            let Some(snapshot) = self.snapshots.get(name.as_str()) else {
                continue;
            };
            let mut alerts = AlertContext::new(
                name,
                &slot.limits,
                &mut self.events,
                &mut self.actions,
                &mut self.board,
                self.processes.all_processes(),
            );
            slot.plugin.check_alerts(snapshot, &mut alerts);
        }

        let hint = self.events.sort_key_hint().unwrap_or(SortKey::CpuPercent);
        self.processes.set_auto_sort_key(hint);
        self.cycles += 1;
        Ok(())
    }

    /// Collect the process table once for every enabled plugin reading it,
    /// whether or not `processcount` itself is enabled.
    fn update_processes(&mut self, now: Instant) -> Result<()> {
        let due = self
            .slots
            .values()
            .any(|slot| slot.enabled && slot.plugin.needs_processes() && slot.refresh.expired());
        if !due {
            return Ok(());
        }

        match self.processes.update_at(self.source.as_mut(), now) {
            Ok(()) => Ok(()),
            Err(e @ HostwatchError::ProcessEnumeration(_)) => Err(e),
            Err(e) => {
                log::debug!("Process table unavailable: {}", e);
                Ok(())
            }
        }
    }

    /// Completed cycles
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn slot(&self, name: &str) -> Result<&PluginSlot> {
        self.slots
            .get(name)
            .ok_or_else(|| HostwatchError::plugin_not_found(name))
    }

    fn slot_mut(&mut self, name: &str) -> Result<&mut PluginSlot> {
        self.slots
            .get_mut(name)
            .ok_or_else(|| HostwatchError::plugin_not_found(name))
    }

    /// Current snapshot of `name`; empty when the plugin is disabled.
    pub fn get_plugin(&self, name: &str) -> Result<PluginSnapshot> {
        let slot = self.slot(name)?;
        if !slot.enabled {
            return Ok(slot.plugin.empty());
        }
        Ok(self
            .snapshots
            .get(name)
            .cloned()
            .unwrap_or_else(|| slot.plugin.empty()))
    }

    /// Names of every registered plugin, sorted
    pub fn get_all_plugins(&self) -> Vec<&'static str> {
        self.slots.keys().copied().collect()
    }

    pub fn get_enabled_plugins(&self) -> Vec<&'static str> {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.enabled)
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn is_enabled(&self, name: &str) -> Result<bool> {
        Ok(self.slot(name)?.enabled)
    }

    pub fn enable_plugin(&mut self, name: &str) -> Result<()> {
        self.slot_mut(name)?.enabled = true;
        Ok(())
    }

    /// Disabled plugins keep their last snapshot but report an empty one.
    pub fn disable_plugin(&mut self, name: &str) -> Result<()> {
        self.slot_mut(name)?.enabled = false;
        Ok(())
    }

    /// Every plugin snapshot keyed by name, as JSON values
    pub fn get_all(&self) -> BTreeMap<&'static str, Value> {
        self.slots
            .keys()
            .map(|name| {
                let value = self
                    .get_plugin(name)
                    .map(|snapshot| snapshot.to_value())
                    .unwrap_or(Value::Null);
                (*name, value)
            })
            .collect()
    }

    /// What exporters should see of `name`
    pub fn get_export(&self, name: &str) -> Result<PluginSnapshot> {
        let slot = self.slot(name)?;
        if !slot.enabled {
            return Ok(slot.plugin.empty());
        }
        let snapshot = self.get_plugin(name)?;
        Ok(slot.plugin.export(&snapshot))
    }

    pub fn plugin_state(&self, name: &str) -> Result<PluginState> {
        Ok(self.slot(name)?.state)
    }

    pub fn history(&self, name: &str) -> Result<&History> {
        Ok(&self.slot(name)?.history)
    }

    pub fn fields(&self, name: &str) -> Result<&'static [FieldDescription]> {
        Ok(self.slot(name)?.plugin.fields())
    }

    /// Item key of a list plugin
    pub fn key(&self, name: &str) -> Result<Option<&'static str>> {
        Ok(self.slot(name)?.plugin.get_key())
    }

    pub fn limits(&self, name: &str) -> Result<&Limits> {
        Ok(&self.slot(name)?.limits)
    }

    /// Field of a plugin as display text. List plugins take `item` as the
    /// value of their key field.
    pub fn field_label(&self, name: &str, field: &str, item: Option<&str>) -> Result<Option<String>> {
        let snapshot = self.get_plugin(name)?;
        let value = match (item, self.key(name)?) {
            (Some(item), Some(key)) => snapshot.item(key, item).and_then(|r| r.get(field)).cloned(),
            _ => snapshot.get(field).cloned(),
        };
        Ok(value.map(|v| value_label(&v)))
    }

    pub fn events(&self) -> &AlertLog {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut AlertLog {
        &mut self.events
    }

    pub fn processes(&self) -> &ProcessCollector {
        &self.processes
    }

    pub fn processes_mut(&mut self) -> &mut ProcessCollector {
        &mut self.processes
    }

    pub fn board(&self) -> &ThresholdBoard {
        &self.board
    }
}

/// Append the history-flagged fields of a fresh snapshot
fn record_history(slot: &mut PluginSlot, snapshot: &PluginSnapshot) {
    let fields: Vec<&str> = slot
        .plugin
        .fields()
        .iter()
        .filter(|f| f.history)
        .map(|f| f.name)
        .collect();
    if fields.is_empty() {
        return;
    }
    let timestamp = chrono::Utc::now().timestamp();

    match (snapshot, slot.plugin.get_key()) {
        (PluginSnapshot::Flat(record), _) => {
            for field in fields {
                if let Some(value) = record.get(field).and_then(Value::as_f64) {
                    slot.history.add(field, timestamp, value);
                }
            }
        }
        (PluginSnapshot::List(items), Some(key)) => {
            for item in items {
                let Some(id) = item.get(key).map(value_label) else {
                    continue;
                };
                for field in &fields {
                    if let Some(value) = item.get(*field).and_then(Value::as_f64) {
                        slot.history
                            .add(&format!("{}_{}", id, field), timestamp, value);
                    }
                }
            }
        }
        (PluginSnapshot::List(_), None) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alerts::Status;
    use crate::core::config::{ActionConfig, PluginSection};
    use crate::core::source::testing::{FakeProcess, FakeSource};
    use parking_lot::Mutex;
    use std::io;
    use std::sync::Arc;

    fn quick_config() -> Config {
        let mut config = Config::default();
        config.global.refresh = 0.0;
        config.global.cpu_cache = 0.0;
        config
    }

    fn fake_source() -> FakeSource {
        let mut source = FakeSource::new();
        source.processes = vec![
            FakeProcess::new(1, None, "init", 1.0, 10),
            FakeProcess::new(2, Some(1), "worker", 20.0, 100),
        ];
        source
    }

    #[derive(Clone, Default)]
    struct RecordingRunner {
        commands: Arc<Mutex<Vec<String>>>,
    }

    impl ActionRunner for RecordingRunner {
        fn run(&mut self, command: &str) -> io::Result<String> {
            self.commands.lock().push(command.to_string());
            Ok(String::new())
        }
    }

    #[test]
    fn test_cpu_reads_are_cached_across_cycles() {
        let mut config = quick_config();
        config.global.cpu_cache = 3.0;
        let mut source = fake_source();
        source.cpu.total = 42.0;
        let mut stats = Stats::with_source(&config, Box::new(source));

        stats.update_all().unwrap();
        let first = stats.get_plugin("cpu").unwrap();
        stats.update_all().unwrap();
        let second = stats.get_plugin("cpu").unwrap();

        assert_eq!(first, second);
        assert_eq!(first.number("total"), Some(42.0));
    }

    #[test]
    fn test_disabled_and_unknown_plugins() {
        let mut config = quick_config();
        config.global.disable.push("mem".to_string());
        let mut stats = Stats::with_source(&config, Box::new(fake_source()));
        stats.update_all().unwrap();

        assert!(stats.get_plugin("mem").unwrap().is_empty());
        assert!(!stats.get_enabled_plugins().contains(&"mem"));
        assert!(matches!(
            stats.get_plugin("gpu"),
            Err(HostwatchError::PluginNotFound(_))
        ));

        stats.enable_plugin("mem").unwrap();
        stats.update_all().unwrap();
        assert_eq!(stats.get_plugin("mem").unwrap().number("percent"), Some(40.0));
    }

    #[test]
    fn test_unsupported_plugin_reports_empty_list() {
        let mut stats = Stats::with_source(&quick_config(), Box::new(fake_source()));
        stats.update_all().unwrap();

        let diskio = stats.get_plugin("diskio").unwrap();
        assert!(diskio.is_list());
        assert!(diskio.is_empty());
        assert_eq!(stats.plugin_state("diskio").unwrap(), PluginState::Unsupported);
        assert_eq!(stats.plugin_state("mem").unwrap(), PluginState::Ok);
    }

    #[test]
    fn test_first_cycle_enumeration_failure_propagates() {
        let mut source = fake_source();
        source.fail_processes = true;
        let mut stats = Stats::with_source(&quick_config(), Box::new(source));

        assert!(matches!(
            stats.update_all(),
            Err(HostwatchError::ProcessEnumeration(_))
        ));
    }

    #[test]
    fn test_dependent_plugins_see_fresh_snapshots() {
        let mut source = fake_source();
        source.load.min15 = 2.0;
        let mut stats = Stats::with_source(&quick_config(), Box::new(source));
        stats.update_all().unwrap();

        let load = stats.get_plugin("load").unwrap();
        assert_eq!(load.number("cpucore"), Some(1.0));
        let quicklook = stats.get_plugin("quicklook").unwrap();
        assert_eq!(quicklook.number("load"), Some(200.0));
        assert_eq!(stats.get_plugin("processcount").unwrap().number("total"), Some(2.0));
        assert_eq!(stats.get_plugin("processlist").unwrap().as_list().len(), 2);
    }

    #[test]
    fn test_alert_opens_from_config_threshold() {
        let mut config = quick_config();
        config.plugins.insert(
            "mem".to_string(),
            PluginSection {
                careful: Some(10.0),
                warning: Some(20.0),
                critical: Some(30.0),
                ..Default::default()
            },
        );
        let mut stats = Stats::with_source(&config, Box::new(fake_source()));
        stats.update_all().unwrap();

        assert_eq!(stats.board().get("mem"), Some(Status::Critical));
        let events = stats.events().get();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "MEM");
        assert!(events[0].is_ongoing());
        assert_eq!(stats.processes().sort_key(), SortKey::MemoryPercent);
    }

    #[test]
    fn test_action_fires_once_per_status() {
        let mut config = quick_config();
        let mut section = PluginSection {
            careful: Some(10.0),
            warning: Some(20.0),
            critical: Some(90.0),
            ..Default::default()
        };
        section.actions.insert(
            "warning".to_string(),
            ActionConfig {
                command: "notify mem {{percent}}".to_string(),
                repeat: false,
            },
        );
        config.plugins.insert("mem".to_string(), section);

        let runner = RecordingRunner::default();
        let commands = runner.commands.clone();
        let mut stats = Stats::with_source(&config, Box::new(fake_source()));
        stats.set_action_runner(Duration::ZERO, Box::new(runner));

        stats.update_all().unwrap();
        stats.update_all().unwrap();

        assert_eq!(commands.lock().as_slice(), ["notify mem 40.0"]);
    }

    #[test]
    fn test_history_records_flagged_fields() {
        let mut stats = Stats::with_source(&quick_config(), Box::new(fake_source()));
        stats.update_all().unwrap();
        stats.update_all().unwrap();

        assert_eq!(stats.history("mem").unwrap().values("percent"), vec![40.0, 40.0]);
        assert!(stats.history("mem").unwrap().get("total").is_none());
    }

    #[test]
    fn test_slow_plugin_refresh_keeps_snapshot() {
        let mut config = quick_config();
        config.plugins.insert(
            "uptime".to_string(),
            PluginSection {
                refresh: Some(3600.0),
                ..Default::default()
            },
        );
        let mut stats = Stats::with_source(&config, Box::new(fake_source()));
        stats.update_all().unwrap();
        stats.update_all().unwrap();

        assert_eq!(stats.get_plugin("uptime").unwrap().number("seconds"), Some(3723.0));
        assert_eq!(stats.history("mem").unwrap().values("percent").len(), 2);
    }
}
