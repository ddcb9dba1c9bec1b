//! Per-plugin snapshot model.
//!
//! Plugins build typed structs and convert them once per cycle into a
//! [`PluginSnapshot`], the uniform shape every consumer reads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// One flat mapping of field name to value
pub type Record = Map<String, Value>;

/// Either a list of records (one per disk, interface, process, ...) or a
/// single flat record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginSnapshot {
    List(Vec<Record>),
    Flat(Record),
}

impl Default for PluginSnapshot {
    fn default() -> Self {
        PluginSnapshot::Flat(Record::new())
    }
}

impl PluginSnapshot {
    pub fn empty_flat() -> Self {
        PluginSnapshot::Flat(Record::new())
    }

    pub fn empty_list() -> Self {
        PluginSnapshot::List(Vec::new())
    }

    /// Flat snapshot from a serializable struct
    pub fn flat<T: Serialize>(value: &T) -> Result<Self> {
        match serde_json::to_value(value)? {
            Value::Object(record) => Ok(PluginSnapshot::Flat(record)),
            other => Ok(PluginSnapshot::Flat(Record::from_iter([(
                "value".to_string(),
                other,
            )]))),
        }
    }

    /// List snapshot from serializable items; non-object items are skipped.
    pub fn list<T: Serialize>(items: &[T]) -> Result<Self> {
        let mut records = Vec::with_capacity(items.len());
        for item in items {
            if let Value::Object(record) = serde_json::to_value(item)? {
                records.push(record);
            }
        }
        Ok(PluginSnapshot::List(records))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, PluginSnapshot::List(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PluginSnapshot::List(items) => items.is_empty(),
            PluginSnapshot::Flat(record) => record.is_empty(),
        }
    }

    pub fn as_flat(&self) -> Option<&Record> {
        match self {
            PluginSnapshot::Flat(record) => Some(record),
            PluginSnapshot::List(_) => None,
        }
    }

    pub fn as_list(&self) -> &[Record] {
        match self {
            PluginSnapshot::List(items) => items,
            PluginSnapshot::Flat(_) => &[],
        }
    }

    /// Field of a flat snapshot
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_flat()?.get(field)
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }

    /// Item of a list snapshot whose `key` field renders as `value`
    pub fn item(&self, key: &str, value: &str) -> Option<&Record> {
        self.as_list()
            .iter()
            .find(|record| record.get(key).map(value_label).as_deref() == Some(value))
    }

    pub fn to_value(&self) -> Value {
        match self {
            PluginSnapshot::List(items) => {
                Value::Array(items.iter().cloned().map(Value::Object).collect())
            }
            PluginSnapshot::Flat(record) => Value::Object(record.clone()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Display form of a key value: strings unquoted, everything else as JSON
pub fn value_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
