use hostwatch::core::alerts::{
    ActionDispatcher, ActionRunner, AlertLog, AlertSample, Status,
};
use hostwatch::core::processes::SortKey;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::io;
use std::sync::Arc;
use std::time::Duration;

use super::support::StaticSource;

const SEQUENCE: [Status; 5] = [
    Status::Ok,
    Status::Warning,
    Status::Warning,
    Status::Critical,
    Status::Ok,
];

fn sample(state: Status, value: f64) -> AlertSample<'static> {
    AlertSample {
        state,
        event_type: "CPU_USER",
        value,
        desc: "",
        global_msg: "High CPU user mode",
    }
}

fn play(log: &mut AlertLog, step: i64) {
    for (i, state) in SEQUENCE.iter().enumerate() {
        let value = 50.0 + 10.0 * i as f64;
        log.add_at(1_000 + step * i as i64, sample(*state, value), &[]);
    }
}

#[test]
fn test_short_episode_is_discarded_as_noise() {
    let mut log = AlertLog::new(10, 6.0, 6.0);
    play(&mut log, 1);
    assert!(log.is_empty());
}

#[test]
fn test_long_episode_is_kept_and_escalated() {
    let mut log = AlertLog::new(10, 6.0, 6.0);
    play(&mut log, 10);

    let events = log.get();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.state, Status::Critical);
    assert_eq!(event.begin, 1_010);
    assert_eq!(event.end, 1_040);
    assert!(event.is_finished());
    assert_eq!(event.min, 60.0);
    assert_eq!(event.max, 80.0);
    assert_eq!(event.count, 3);
    assert_eq!(event.avg, 70.0);
}

#[test]
fn test_log_is_bounded_oldest_first() {
    let mut log = AlertLog::new(2, 0.0, 0.0);
    for (i, kind) in ["MEM", "LOAD", "FS_/"].iter().enumerate() {
        log.add_at(
            i as i64,
            AlertSample {
                state: Status::Warning,
                event_type: kind,
                value: 75.0,
                desc: "",
                global_msg: "",
            },
            &[],
        );
    }
    let kinds: Vec<String> = log.get().into_iter().map(|e| e.event_type).collect();
    assert_eq!(kinds, vec!["FS_/", "LOAD"]);
}

#[test]
fn test_critical_episode_records_top_offenders() {
    let mut source = StaticSource::new();
    let mut collector = hostwatch::core::processes::ProcessCollector::new(&Default::default());
    collector.update(&mut source).unwrap();

    let mut log = AlertLog::new(10, 6.0, 6.0);
    log.add_at(0, sample(Status::Warning, 75.0), collector.all_processes());
    log.add_at(1, sample(Status::Critical, 95.0), collector.all_processes());

    let event = &log.get()[0];
    assert_eq!(event.sort, SortKey::CpuPercent);
    assert_eq!(event.top, vec!["postgres", "nginx", "postgres"]);
    assert_eq!(log.sort_key_hint(), Some(SortKey::CpuPercent));
}

#[test]
fn test_clean_keeps_ongoing_and_critical() {
    let mut log = AlertLog::new(10, 0.0, 0.0);
    let mut add = |at: i64, kind: &str, state: Status| {
        log.add_at(
            at,
            AlertSample {
                state,
                event_type: kind,
                value: 90.0,
                desc: "",
                global_msg: "",
            },
            &[],
        )
    };
    add(0, "MEM", Status::Warning);
    add(5, "MEM", Status::Ok);
    add(0, "LOAD", Status::Critical);
    add(5, "LOAD", Status::Ok);
    add(6, "CPU_USER", Status::Warning);

    assert_eq!(log.clean(false), 2);
    assert_eq!(log.clean(true), 1);
    assert!(log.get()[0].is_ongoing());
}

#[derive(Clone, Default)]
struct CountingRunner {
    commands: Arc<Mutex<Vec<String>>>,
}

impl ActionRunner for CountingRunner {
    fn run(&mut self, command: &str) -> io::Result<String> {
        self.commands.lock().push(command.to_string());
        Ok(String::new())
    }
}

#[test]
fn test_action_deduplication() {
    let runner = CountingRunner::default();
    let commands = runner.commands.clone();
    let mut actions = ActionDispatcher::with_runner(Duration::ZERO, Box::new(runner));
    let stats: Map<String, Value> = json!({"user": 81.0}).as_object().unwrap().clone();

    assert!(actions.run("cpu_user", Status::Warning, "alert {{user}}", false, &stats));
    assert!(!actions.run("cpu_user", Status::Warning, "alert {{user}}", false, &stats));
    assert!(actions.run("cpu_user", Status::Critical, "alert {{user}}", false, &stats));
    assert!(actions.run("cpu_user", Status::Critical, "alert {{user}}", true, &stats));

    assert_eq!(commands.lock().len(), 3);
    assert_eq!(commands.lock()[0], "alert 81.0");
}

#[test]
fn test_actions_wait_for_start_delay() {
    let runner = CountingRunner::default();
    let commands = runner.commands.clone();
    let mut actions = ActionDispatcher::with_runner(Duration::from_secs(3600), Box::new(runner));

    assert!(!actions.run("mem", Status::Critical, "page", false, &Map::new()));
    assert!(commands.lock().is_empty());
}
