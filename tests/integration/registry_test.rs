use hostwatch::core::config::{Config, PluginSection};
use hostwatch::core::source::{CpuPercent, FsUsage, NetworkCounters};
use hostwatch::core::stats::{PluginState, Stats};
use hostwatch::HostwatchError;

use super::support::StaticSource;

fn fast_config() -> Config {
    let mut config = Config::default();
    config.global.refresh = 0.0;
    config.global.cpu_cache = 0.0;
    config
}

#[test]
fn test_cached_cpu_is_not_read_again_within_interval() {
    let mut config = fast_config();
    config.global.cpu_cache = 3.0;
    let source = StaticSource::new();
    source.host.lock().cpu = CpuPercent {
        total: 37.5,
        user: Some(30.0),
        system: Some(7.5),
        ..Default::default()
    };
    let mut stats = Stats::with_source(&config, source.boxed());

    stats.update_all().unwrap();
    source.host.lock().cpu.total = 99.0;
    stats.update_all().unwrap();

    assert_eq!(stats.get_plugin("cpu").unwrap().number("total"), Some(37.5));
    assert_eq!(source.host.lock().cpu_reads, 1);
}

#[test]
fn test_every_plugin_is_discoverable() {
    let stats = Stats::with_source(&fast_config(), StaticSource::new().boxed());
    let names = stats.get_all_plugins();
    for expected in [
        "alert",
        "core",
        "cpu",
        "diskio",
        "fs",
        "load",
        "mem",
        "memswap",
        "network",
        "percpu",
        "processcount",
        "processlist",
        "programlist",
        "quicklook",
        "sensors",
        "system",
        "uptime",
    ] {
        assert!(names.contains(&expected), "{} missing", expected);
    }
}

#[test]
fn test_lookup_error_differs_from_disabled() {
    let mut config = fast_config();
    config.plugins.insert(
        "network".to_string(),
        PluginSection {
            disable: Some(true),
            ..Default::default()
        },
    );
    let mut stats = Stats::with_source(&config, StaticSource::new().boxed());
    stats.update_all().unwrap();

    let network = stats.get_plugin("network").unwrap();
    assert!(network.is_empty());
    assert!(matches!(
        stats.get_plugin("nope"),
        Err(HostwatchError::PluginNotFound(_))
    ));
    assert!(matches!(
        stats.get_export("nope"),
        Err(HostwatchError::PluginNotFound(_))
    ));
}

#[test]
fn test_unsupported_capabilities_do_not_fail_the_cycle() {
    let mut stats = Stats::with_source(&fast_config(), StaticSource::new().boxed());
    stats.update_all().unwrap();

    assert_eq!(stats.plugin_state("diskio").unwrap(), PluginState::Unsupported);
    assert_eq!(stats.plugin_state("sensors").unwrap(), PluginState::Unsupported);
    assert!(stats.get_plugin("sensors").unwrap().is_list());
    assert_eq!(stats.get_plugin("mem").unwrap().number("percent"), Some(25.0));
}

#[test]
fn test_process_enumeration_failure_only_fatal_on_first_cycle() {
    let source = StaticSource::new();
    let mut stats = Stats::with_source(&fast_config(), source.boxed());
    stats.update_all().unwrap();
    assert_eq!(stats.get_plugin("processcount").unwrap().number("total"), Some(4.0));

    source.host.lock().fail_processes = true;
    stats.update_all().unwrap();
    assert_eq!(stats.get_plugin("processcount").unwrap().number("total"), Some(4.0));

    let failing = StaticSource::new();
    failing.host.lock().fail_processes = true;
    let mut fresh = Stats::with_source(&fast_config(), failing.boxed());
    assert!(matches!(
        fresh.update_all(),
        Err(HostwatchError::ProcessEnumeration(_))
    ));
}

#[test]
fn test_quicklook_reads_dependencies_of_the_same_cycle() {
    let source = StaticSource::new();
    {
        let mut host = source.host.lock();
        host.load.min15 = 2.0;
        host.file_systems = vec![
            FsUsage {
                mnt_point: "/".to_string(),
                size: 100,
                used: 20,
                free: 80,
                ..Default::default()
            },
            FsUsage {
                mnt_point: "/var".to_string(),
                size: 100,
                used: 75,
                free: 25,
                ..Default::default()
            },
        ];
    }
    let mut stats = Stats::with_source(&fast_config(), source.boxed());
    stats.update_all().unwrap();

    let quicklook = stats.get_plugin("quicklook").unwrap();
    assert_eq!(quicklook.number("load"), Some(50.0));
    assert_eq!(quicklook.number("fs"), Some(75.0));
    assert_eq!(quicklook.number("mem"), Some(25.0));
    assert_eq!(stats.get_plugin("load").unwrap().number("cpucore"), Some(4.0));
}

#[test]
fn test_network_rates_start_at_zero() {
    let source = StaticSource::new();
    source.host.lock().network = vec![NetworkCounters {
        interface_name: "eth0".to_string(),
        bytes_recv: 1_000,
        bytes_sent: 500,
        ..Default::default()
    }];
    let mut stats = Stats::with_source(&fast_config(), source.boxed());
    stats.update_all().unwrap();

    let network = stats.get_plugin("network").unwrap();
    let eth0 = network.item("interface_name", "eth0").unwrap();
    assert_eq!(eth0["bytes_recv_rate"], 0.0);
    assert_eq!(eth0["bytes_recv"], 1_000);
}

#[test]
fn test_export_filter_limits_processlist_export() {
    let mut config = fast_config();
    config.processes.export_filter = Some("postgres.*".to_string());
    let mut stats = Stats::with_source(&config, StaticSource::new().boxed());
    stats.update_all().unwrap();

    assert_eq!(stats.get_plugin("processlist").unwrap().as_list().len(), 4);
    let export = stats.get_export("processlist").unwrap();
    assert_eq!(export.as_list().len(), 2);
    assert!(export
        .as_list()
        .iter()
        .all(|p| p["name"] == "postgres"));
}

#[test]
fn test_get_all_serializes_every_plugin() {
    let mut stats = Stats::with_source(&fast_config(), StaticSource::new().boxed());
    stats.update_all().unwrap();

    let all = stats.get_all();
    assert_eq!(all.len(), stats.get_all_plugins().len());
    assert_eq!(all["system"]["hostname"], "db-1");
    assert_eq!(all["uptime"]["human"], "1 day, 1:01:01");
    let json = serde_json::to_string(&all).unwrap();
    assert!(json.contains("\"processcount\""));
}

#[test]
fn test_processlist_without_processcount() {
    let mut config = fast_config();
    config.global.disable.push("processcount".to_string());
    let mut stats = Stats::with_source(&config, StaticSource::new().boxed());

    stats.update_all().unwrap();
    stats.update_all().unwrap();

    assert!(stats.get_plugin("processcount").unwrap().is_empty());
    assert_eq!(stats.get_plugin("processlist").unwrap().as_list().len(), 4);
    assert!(!stats.get_plugin("programlist").unwrap().as_list().is_empty());
}

#[test]
fn test_huge_intervals_are_clamped() {
    let mut config = fast_config();
    config.global.cpu_cache = 1e30;
    config.processes.cache_timeout = 1e300;
    config.alerts.action_start_delay = Some(f64::MAX);
    config.plugins.insert(
        "mem".to_string(),
        PluginSection {
            refresh: Some(1e30),
            ..Default::default()
        },
    );
    let mut stats = Stats::with_source(&config, StaticSource::new().boxed());

    stats.update_all().unwrap();
    stats.update_all().unwrap();
    assert_eq!(stats.get_plugin("mem").unwrap().number("percent"), Some(25.0));
}
