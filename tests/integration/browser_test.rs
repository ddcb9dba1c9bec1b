use hostwatch::core::config::{BrowserConfig, ServerEntry};
use hostwatch::core::remote::{RemoteTransport, ServerBrowser, ServerStatus};
use hostwatch::{HostwatchError, Result};
use serde_json::{json, Value};
use std::sync::Arc;

/// Answers for `alpha`, refuses everything else
struct OneServer;

impl RemoteTransport for OneServer {
    fn ping(&self, server: &ServerEntry) -> Result<()> {
        if server.host == "alpha" {
            Ok(())
        } else {
            Err(HostwatchError::remote("connection refused"))
        }
    }

    fn get_json(&self, _server: &ServerEntry, path: &str) -> Result<Value> {
        match path {
            "system/hostname" => Ok(json!({"hostname": "alpha.lan"})),
            "load/min5" => Ok(json!({"min5": 0.42})),
            "cpu/total" => Ok(json!({"total": 3.5})),
            "mem/percent" => Ok(json!({"percent": 61.2})),
            other => Err(HostwatchError::remote(format!("404 {}", other))),
        }
    }
}

fn entry(host: &str) -> ServerEntry {
    ServerEntry {
        name: None,
        host: host.to_string(),
        port: 61208,
    }
}

#[test]
fn test_default_columns_from_online_server() {
    let config = BrowserConfig {
        servers: vec![entry("alpha"), entry("beta")],
        ..Default::default()
    };
    let browser = ServerBrowser::with_transport(&config, Arc::new(OneServer)).unwrap();
    assert_eq!(browser.columns().len(), 4);

    browser.update().unwrap();
    let servers = browser.servers();

    let alpha = &servers[0];
    assert_eq!(alpha.name, "alpha");
    assert_eq!(alpha.status, ServerStatus::Online);
    assert_eq!(alpha.columns["system:hostname"], "alpha.lan");
    assert_eq!(alpha.columns["load:min5"], "0.42");
    assert_eq!(alpha.columns["mem:percent"], "61.2");

    let beta = &servers[1];
    assert_eq!(beta.status, ServerStatus::Offline);
    assert_eq!(beta.status.to_string(), "OFFLINE");
}

#[test]
fn test_server_going_down_turns_offline() {
    struct Flaky(parking_lot::Mutex<bool>);

    impl RemoteTransport for Flaky {
        fn ping(&self, _server: &ServerEntry) -> Result<()> {
            if *self.0.lock() {
                Ok(())
            } else {
                Err(HostwatchError::remote("timed out"))
            }
        }

        fn get_json(&self, _server: &ServerEntry, _path: &str) -> Result<Value> {
            Ok(json!(1))
        }
    }

    let transport = Arc::new(Flaky(parking_lot::Mutex::new(true)));
    let config = BrowserConfig {
        columns: "cpu:total".to_string(),
        servers: vec![entry("gamma")],
        ..Default::default()
    };
    let browser = ServerBrowser::with_transport(&config, transport.clone()).unwrap();

    browser.update().unwrap();
    assert_eq!(browser.servers()[0].status, ServerStatus::Online);
    assert_eq!(browser.servers()[0].columns["cpu:total"], "1");

    *transport.0.lock() = false;
    browser.update().unwrap();
    assert_eq!(browser.servers()[0].status, ServerStatus::Offline);
    assert!(browser.servers()[0].last_seen.is_some());
}
