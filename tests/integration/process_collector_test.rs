use hostwatch::core::config::ProcessConfig;
use hostwatch::core::processes::{
    build_process_tree, FilterList, ProcessCollector, ProcessTreeNode, SortKey,
};
use hostwatch::core::source::IoBytes;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::support::{proc, StaticSource};

fn collector(config: ProcessConfig) -> ProcessCollector {
    ProcessCollector::new(&config)
}

#[test]
fn test_io_rate_is_delta_over_elapsed() {
    let mut source = StaticSource::new();
    let mut collector = collector(ProcessConfig::default());
    let start = Instant::now();

    source.host.lock().processes[1].io = Some(IoBytes {
        read_bytes: 10_000,
        write_bytes: 0,
    });
    collector.update_at(&mut source, start).unwrap();
    let first = collector
        .processes()
        .iter()
        .find(|p| p.pid == 200)
        .and_then(|p| p.io_counters.clone())
        .unwrap();
    assert_eq!(first.read_rate, 0.0);
    assert!(first.available);

    source.host.lock().processes[1].io = Some(IoBytes {
        read_bytes: 30_000,
        write_bytes: 4_000,
    });
    collector
        .update_at(&mut source, start + Duration::from_secs(2))
        .unwrap();
    let second = collector
        .processes()
        .iter()
        .find(|p| p.pid == 200)
        .and_then(|p| p.io_counters.clone())
        .unwrap();
    assert_eq!(second.read_rate, 10_000.0);
    assert_eq!(second.write_rate, 2_000.0);
}

#[test]
fn test_unreadable_io_is_marked_unavailable() {
    let mut source = StaticSource::new();
    source.host.lock().processes[3].io = None;
    let mut collector = collector(ProcessConfig::default());
    collector.update(&mut source).unwrap();

    let nginx = collector
        .processes()
        .iter()
        .find(|p| p.name == "nginx")
        .unwrap();
    let io = nginx.io_counters.as_ref().unwrap();
    assert!(!io.available);
    assert_eq!(io.read_rate, 0.0);
}

#[test]
fn test_sort_and_cap() {
    let mut source = StaticSource::new();
    let mut collector = collector(ProcessConfig {
        max_processes: Some(2),
        sort_key: "cpu_percent".to_string(),
        ..Default::default()
    });
    collector.update(&mut source).unwrap();

    let pids: Vec<u32> = collector.processes().iter().map(|p| p.pid).collect();
    assert_eq!(pids, vec![200, 300]);
    assert_eq!(collector.all_processes().len(), 4);
    assert_eq!(collector.count().total, 4);
    assert!(collector.processes()[0].has_standard());
    assert!(!collector
        .all_processes()
        .iter()
        .find(|p| p.pid == 1)
        .unwrap()
        .has_standard());
}

#[test]
fn test_name_sort_is_ascending() {
    let mut source = StaticSource::new();
    let mut collector = collector(ProcessConfig {
        sort_key: "name".to_string(),
        ..Default::default()
    });
    collector.update(&mut source).unwrap();

    let names: Vec<&str> = collector
        .processes()
        .iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(names, vec!["init", "nginx", "postgres", "postgres"]);
}

#[test]
fn test_invalid_filter_means_no_filtering() {
    let mut source = StaticSource::new();
    let mut collector = collector(ProcessConfig {
        filter: Some("post(gres".to_string()),
        ..Default::default()
    });
    collector.update(&mut source).unwrap();
    assert_eq!(collector.processes().len(), 4);
    assert!(collector.filter().is_none());

    collector.set_filter(Some("cmdline:.*nginx.*"));
    collector.update(&mut source).unwrap();
    assert_eq!(collector.processes().len(), 1);
    assert_eq!(collector.processes()[0].pid, 300);
}

#[test]
fn test_filter_is_idempotent() {
    let mut source = StaticSource::new();
    let mut collector = collector(ProcessConfig::default());
    collector.update(&mut source).unwrap();

    let filters = FilterList::new(Some("postgres, user:root"));
    let once = filters.apply(collector.all_processes());
    let twice = filters.apply(&once);
    assert_eq!(once, twice);
}

#[test]
fn test_username_cache_survives_until_timeout() {
    let mut source = StaticSource::new();
    let mut collector = collector(ProcessConfig::default());
    collector.update(&mut source).unwrap();
    collector.update(&mut source).unwrap();
    assert_eq!(source.host.lock().username_reads, 4);

    let mut flushing = self::collector(ProcessConfig {
        cache_timeout: 0.0,
        ..Default::default()
    });
    flushing.update(&mut source).unwrap();
    flushing.update(&mut source).unwrap();
    assert_eq!(source.host.lock().username_reads, 12);
}

#[test]
fn test_tree_parent_walk_terminates() {
    let mut source = StaticSource::new();
    {
        let mut host = source.host.lock();
        // 500 and 501 are each other's parent; 600's parent never existed
        host.processes.push(proc(500, Some(501), "loop-a", 1.0, 10));
        host.processes.push(proc(501, Some(500), "loop-b", 1.0, 10));
        host.processes.push(proc(600, Some(9999), "orphan", 1.0, 10));
        host.processes.push(proc(700, Some(700), "selfish", 1.0, 10));
    }
    let mut collector = collector(ProcessConfig {
        tree: true,
        ..Default::default()
    });
    collector.update(&mut source).unwrap();
    let tree = collector.tree().unwrap();

    let mut parents = HashMap::new();
    fn index(node: &ProcessTreeNode, parent: Option<u32>, parents: &mut HashMap<u32, Option<u32>>) {
        if let Some(pid) = node.pid() {
            parents.insert(pid, parent);
        }
        for child in &node.children {
            index(child, node.pid(), parents);
        }
    }
    index(tree, None, &mut parents);

    assert_eq!(parents.len(), 8);
    for &start in parents.keys() {
        let mut current = Some(start);
        let mut steps = 0;
        while let Some(pid) = current {
            current = parents[&pid];
            steps += 1;
            assert!(steps <= parents.len(), "cycle reached from {}", start);
        }
    }
    assert_eq!(parents[&600], None);
    assert_eq!(parents[&201], Some(200));
}

#[test]
fn test_tree_weight_sums_subtree() {
    let mut source = StaticSource::new();
    let mut collector = collector(ProcessConfig::default());
    collector.update(&mut source).unwrap();

    let tree = build_process_tree(collector.all_processes(), SortKey::CpuPercent);
    let init = &tree.children[0];
    assert_eq!(init.pid(), Some(1));
    let postgres = &init.children[0];
    assert_eq!(postgres.pid(), Some(200));
    assert_eq!(postgres.weight, 40.0);
    assert_eq!(init.children[1].pid(), Some(300));
}

#[test]
fn test_programs_group_by_name() {
    let mut source = StaticSource::new();
    let mut collector = collector(ProcessConfig::default());
    collector.update(&mut source).unwrap();

    let programs = collector.programs();
    let postgres = programs.iter().find(|p| p.name == "postgres").unwrap();
    assert_eq!(postgres.nprocs, 2);
    assert_eq!(postgres.cpu_percent, 40.0);
    assert_eq!(programs[0].name, "postgres");
}
