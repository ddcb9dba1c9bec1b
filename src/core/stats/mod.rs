//! Plugin registry and the per-cycle snapshot model.

pub mod cpu_cache;
pub mod dag;
pub mod history;
pub mod plugin;
pub mod plugins;
pub mod rate;
mod registry;
pub mod snapshot;

pub use dag::{default_graph, PluginGraph};
pub use history::{History, HistoryPoint};
pub use plugin::{AlertContext, FieldDescription, Plugin, Shape, UpdateContext};
pub use registry::{PluginState, Stats};
pub use snapshot::{PluginSnapshot, Record};
