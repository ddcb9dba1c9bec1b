use crate::core::stats::plugin::{FieldDescription, Plugin, Shape, UpdateContext};
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::Result;

const FIELDS: &[FieldDescription] = &[
    FieldDescription::new("name", "Program name", "string"),
    FieldDescription::new("nprocs", "Number of processes running this program", "number"),
    FieldDescription::new("childrens", "PIDs of the processes", "list"),
    FieldDescription::new("cpu_percent", "Summed CPU consumption", "percent"),
    FieldDescription::new("memory_percent", "Summed memory consumption", "percent"),
    FieldDescription::new("num_threads", "Summed number of threads", "number"),
    FieldDescription::new("username", "Owner, or _ when mixed", "string"),
];

/// Processes grouped by program name.
pub struct ProgramListPlugin;

impl Plugin for ProgramListPlugin {
    fn name(&self) -> &'static str {
        "programlist"
    }

    fn shape(&self) -> Shape {
        Shape::List
    }

    fn get_key(&self) -> Option<&'static str> {
        Some("name")
    }

    fn fields(&self) -> &'static [FieldDescription] {
        FIELDS
    }

    fn needs_processes(&self) -> bool {
        true
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        let mut programs = ctx.processes.programs();
        if let Some(max) = ctx.processes.max_processes() {
            programs.truncate(max);
        }
        PluginSnapshot::list(&programs)
    }
}
