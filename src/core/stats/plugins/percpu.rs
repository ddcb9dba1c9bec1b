use crate::core::alerts::Threshold;
use crate::core::stats::plugin::{threshold, AlertContext, FieldDescription, Plugin, Shape, UpdateContext};
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::Result;

const FIELDS: &[FieldDescription] = &[
    FieldDescription::new("cpu_number", "CPU number", "number"),
    FieldDescription::new("total", "Sum of CPU percentages (except idle) for current CPU number", "percent"),
    FieldDescription::new("user", "Percent time spent in user space", "percent"),
    FieldDescription::new("system", "Percent time spent in kernel space", "percent"),
    FieldDescription::new("idle", "Percent of CPU used by any program", "percent"),
    FieldDescription::new("iowait", "Percent time spent waiting for I/O operations to complete", "percent"),
];

/// Per-core usage. Checked against thresholds but not logged by default.
pub struct PerCpuPlugin;

impl Plugin for PerCpuPlugin {
    fn name(&self) -> &'static str {
        "percpu"
    }

    fn shape(&self) -> Shape {
        Shape::List
    }

    fn get_key(&self) -> Option<&'static str> {
        Some("cpu_number")
    }

    fn fields(&self) -> &'static [FieldDescription] {
        FIELDS
    }

    fn default_thresholds(&self) -> Vec<(&'static str, Threshold)> {
        vec![("", threshold(50.0, 70.0, 90.0))]
    }

    fn default_log(&self) -> bool {
        false
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        let cores = ctx.cpu.per_cpu(ctx.source)?;
        PluginSnapshot::list(&cores)
    }

    fn check_alerts(&self, snapshot: &PluginSnapshot, ctx: &mut AlertContext<'_>) {
        for record in snapshot.as_list() {
            let (Some(number), Some(total)) = (
                record.get("cpu_number").and_then(|v| v.as_u64()),
                record.get("total").and_then(|v| v.as_f64()),
            ) else {
                continue;
            };
            ctx.evaluate(&number.to_string(), total, 100.0, record);
        }
    }
}
