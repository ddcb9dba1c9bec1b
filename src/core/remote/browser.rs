use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::core::config::{BrowserConfig, ServerEntry};
use crate::core::stats::snapshot::value_label;
use crate::core::timer::duration_from_secs;
use crate::error::{HostwatchError, Result};

use super::transport::{HttpTransport, RemoteTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServerStatus {
    Unknown,
    Online,
    Offline,
}

impl ServerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ServerStatus::Unknown => "UNKNOWN",
            ServerStatus::Online => "ONLINE",
            ServerStatus::Offline => "OFFLINE",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `plugin:field[:key]` column of the browser table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub plugin: String,
    pub field: String,
    /// Item of a list plugin (mount point, interface, ...)
    pub key: Option<String>,
}

impl Column {
    pub fn label(&self) -> String {
        match &self.key {
            Some(key) => format!("{}:{}:{}", self.plugin, self.field, key),
            None => format!("{}:{}", self.plugin, self.field),
        }
    }
}

/// Comma-separated column list; malformed entries are skipped.
pub fn parse_columns(columns: &str) -> Vec<Column> {
    columns
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let mut parts = entry.splitn(3, ':');
            let plugin = parts.next().filter(|p| !p.is_empty());
            let field = parts.next().filter(|f| !f.is_empty());
            match (plugin, field) {
                (Some(plugin), Some(field)) => Some(Column {
                    plugin: plugin.to_string(),
                    field: field.to_string(),
                    key: parts.next().map(str::to_string),
                }),
                _ => {
                    log::warn!("Ignoring browser column '{}', expected plugin:field", entry);
                    None
                }
            }
        })
        .collect()
}

/// Last known state of one remote server
#[derive(Debug, Clone, Serialize)]
pub struct ServerState {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub status: ServerStatus,
    /// Column label to display value
    pub columns: BTreeMap<String, String>,
    pub last_seen: Option<DateTime<Utc>>,
}

impl ServerState {
    fn new(entry: &ServerEntry) -> Self {
        Self {
            name: entry.name.clone().unwrap_or_else(|| entry.host.clone()),
            host: entry.host.clone(),
            port: entry.port,
            status: ServerStatus::Unknown,
            columns: BTreeMap::new(),
            last_seen: None,
        }
    }
}

/// Polls a static server list, every server concurrently, each probe bounded
/// by the configured timeout. Unreachable servers go OFFLINE.
pub struct ServerBrowser {
    entries: Vec<ServerEntry>,
    columns: Arc<Vec<Column>>,
    state: Arc<Mutex<Vec<ServerState>>>,
    transport: Arc<dyn RemoteTransport>,
    timeout: Duration,
    runtime: Option<tokio::runtime::Runtime>,
}

impl ServerBrowser {
    pub fn new(config: &BrowserConfig) -> Result<Self> {
        let timeout = duration_from_secs(config.timeout);
        let transport = HttpTransport::new(timeout)?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(
        config: &BrowserConfig,
        transport: Arc<dyn RemoteTransport>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .thread_name("browser-worker")
            .build()?;

        Ok(Self {
            state: Arc::new(Mutex::new(config.servers.iter().map(ServerState::new).collect())),
            entries: config.servers.clone(),
            columns: Arc::new(parse_columns(&config.columns)),
            transport,
            timeout: duration_from_secs(config.timeout),
            runtime: Some(runtime),
        })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Probe every server once and wait for all of them.
    pub fn update(&self) -> Result<()> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| HostwatchError::other("browser runtime already shut down"))?;

        let probes = self.entries.iter().enumerate().map(|(index, entry)| {
            let entry = entry.clone();
            let transport = Arc::clone(&self.transport);
            let columns = Arc::clone(&self.columns);
            let state = Arc::clone(&self.state);
            let timeout = self.timeout;
            async move {
                let task = tokio::task::spawn_blocking({
                    let entry = entry.clone();
                    move || probe(transport.as_ref(), &entry, &columns)
                });
                let result = match tokio::time::timeout(timeout, task).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => Err(HostwatchError::remote(format!("probe task failed: {}", e))),
                    Err(_) => Err(HostwatchError::remote(format!(
                        "no answer within {:?}",
                        timeout
                    ))),
                };

                let mut servers = state.lock();
                let Some(server) = servers.get_mut(index) else {
                    return;
                };
                match result {
                    Ok(columns) => {
                        server.status = ServerStatus::Online;
                        server.columns = columns;
                        server.last_seen = Some(Utc::now());
                    }
                    Err(e) => {
                        log::debug!("Server {}:{} offline: {}", entry.host, entry.port, e);
                        server.status = ServerStatus::Offline;
                        server.columns.clear();
                    }
                }
            }
        });

        runtime.block_on(join_all(probes));
        Ok(())
    }

    pub fn servers(&self) -> Vec<ServerState> {
        self.state.lock().clone()
    }
}

impl Drop for ServerBrowser {
    fn drop(&mut self) {
        // Probes past their timeout may still be blocked in I/O
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Status check plus one request per column. A column that cannot be read
/// shows `?` while the server stays online.
fn probe(
    transport: &dyn RemoteTransport,
    server: &ServerEntry,
    columns: &[Column],
) -> Result<BTreeMap<String, String>> {
    transport.ping(server)?;

    let mut values = BTreeMap::new();
    for column in columns {
        let value = match fetch_column(transport, server, column) {
            Ok(Some(value)) => value_label(&value),
            Ok(None) => "?".to_string(),
            Err(e) => {
                log::debug!("{}: cannot read {}: {}", server.host, column.label(), e);
                "?".to_string()
            }
        };
        values.insert(column.label(), value);
    }
    Ok(values)
}

fn fetch_column(
    transport: &dyn RemoteTransport,
    server: &ServerEntry,
    column: &Column,
) -> Result<Option<Value>> {
    let Some(key) = &column.key else {
        let value = transport.get_json(server, &format!("{}/{}", column.plugin, column.field))?;
        return Ok(match value {
            Value::Object(mut map) => map.remove(&column.field),
            other => Some(other),
        });
    };

    let items = transport.get_json(server, &column.plugin)?;
    let item = items.as_array().and_then(|items| {
        items.iter().find(|item| {
            item.as_object()
                .is_some_and(|record| record.values().any(|v| value_label(v) == *key))
        })
    });
    Ok(item.and_then(|item| item.get(&column.field)).cloned())
}
