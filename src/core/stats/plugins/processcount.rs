use crate::core::stats::plugin::{FieldDescription, Plugin, UpdateContext};
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::{HostwatchError, Result};

const FIELDS: &[FieldDescription] = &[
    FieldDescription::new("total", "Total number of processes", "number").with_history(),
    FieldDescription::new("running", "Number of running processes", "number"),
    FieldDescription::new("sleeping", "Number of sleeping processes", "number"),
    FieldDescription::new("thread", "Number of threads", "number"),
    FieldDescription::new("pid_max", "Maximum number of processes", "number"),
];

/// Process counts from the collector the registry updated this cycle.
pub struct ProcessCountPlugin;

impl Plugin for ProcessCountPlugin {
    fn name(&self) -> &'static str {
        "processcount"
    }

    fn fields(&self) -> &'static [FieldDescription] {
        FIELDS
    }

    fn needs_processes(&self) -> bool {
        true
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        if !ctx.processes.is_initialized() {
            return Err(HostwatchError::unsupported("process table"));
        }
        PluginSnapshot::flat(ctx.processes.count())
    }
}
