// Core metrics collection module

pub mod alerts;
pub mod config;
pub mod processes;
pub mod remote;
pub mod source;
pub mod stats;
pub mod timer;

// Re-export commonly used items
pub use config::Config;
pub use processes::{ProcessCollector, ProcessRecord, SortKey};
pub use source::{MetricSource, SystemSource};
pub use stats::{PluginSnapshot, Stats};
