use hostwatch::core::alerts::{Limits, Status, Threshold};
use hostwatch::core::config::Config;
use hostwatch::core::stats::Stats;
use std::fs;
use tempfile::TempDir;

use super::support::StaticSource;

const SAMPLE: &str = r#"
[global]
refresh = 0
cpu_cache = 0
disable = ["sensors"]

[alerts]
peak_time = 10
max_events = 5
action_start_delay = 3600

[processes]
filter = "name:postgres"
max_processes = 1
sort_key = "memory_percent"

[plugins.mem]
careful = 10
warning = 20
critical = 90

[plugins.mem.actions.warning]
command = "logger mem {{percent}}"

[plugins.fs]
hide = ["/boot.*"]

[plugins.cpu.thresholds.user]
careful = 5
warning = 4
critical = 3

[[browser.servers]]
name = "primary"
host = "10.0.0.10"
"#;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("hostwatch.toml");
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_missing_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load_from(&temp_dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.global.refresh, 2.0);
    assert_eq!(config.alerts.peak_time, 6.0);
    assert_eq!(config.processes.cache_timeout, 60.0);
}

#[test]
fn test_unparsable_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_config(&temp_dir, "[global\nrefresh = ");
    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.alerts.max_events, 10);
}

#[test]
fn test_sections_are_parsed() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load_from(&write_config(&temp_dir, SAMPLE)).unwrap();

    assert_eq!(config.global.refresh, 0.0);
    assert!(!config.is_plugin_enabled("sensors"));
    assert!(config.is_plugin_enabled("mem"));
    assert_eq!(config.alerts.peak_time, 10.0);
    assert_eq!(config.alerts.min_interval, 6.0);
    assert_eq!(config.processes.max_processes, Some(1));
    assert_eq!(config.browser.servers[0].port, 61208);
    assert_eq!(config.browser.servers[0].name.as_deref(), Some("primary"));
    assert_eq!(
        config.plugin("mem").unwrap().actions["warning"].command,
        "logger mem {{percent}}"
    );
}

#[test]
fn test_invalid_threshold_keeps_default() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load_from(&write_config(&temp_dir, SAMPLE)).unwrap();
    let default = Threshold::new(50.0, 70.0, 90.0).unwrap();

    let limits = Limits::from_config("cpu", &[("user", default)], config.plugin("cpu"));
    assert_eq!(limits.threshold("user"), Some(default));
    assert_eq!(limits.status("user", 75.0, 100.0), Some(Status::Warning));
}

#[test]
fn test_config_drives_the_registry() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::load_from(&write_config(&temp_dir, SAMPLE)).unwrap();
    let mut stats = Stats::with_source(&config, StaticSource::new().boxed());
    stats.update_all().unwrap();

    assert!(stats.get_plugin("sensors").unwrap().is_empty());
    let processes = stats.get_plugin("processlist").unwrap();
    assert_eq!(processes.as_list().len(), 1);
    assert_eq!(processes.as_list()[0]["pid"], 200);
    assert_eq!(stats.board().get("mem"), Some(Status::Warning));
    assert_eq!(stats.events().len(), 1);
}

#[test]
fn test_save_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("hostwatch.toml");

    let mut config = Config::default();
    config.set_plugin_enabled("network", false);
    config.processes.tree = true;
    config.save_to(&path).unwrap();

    let reloaded = Config::load_from(&path).unwrap();
    assert!(!reloaded.is_plugin_enabled("network"));
    assert!(reloaded.processes.tree);
}
