use serde::Serialize;

use crate::core::alerts::Threshold;
use crate::core::stats::plugin::{threshold, AlertContext, FieldDescription, Plugin, UpdateContext};
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::Result;

const FIELDS: &[FieldDescription] = &[
    FieldDescription::new("min1", "Average sum of the number of processes waiting in the run-queue plus the number currently executing over 1 minute", "float").with_history(),
    FieldDescription::new("min5", "Average sum of the number of processes waiting in the run-queue plus the number currently executing over 5 minutes", "float").with_history(),
    FieldDescription::new("min15", "Average sum of the number of processes waiting in the run-queue plus the number currently executing over 15 minutes", "float").with_history(),
    FieldDescription::new("cpucore", "Total number of CPU cores", "number"),
];

#[derive(Serialize)]
struct LoadStats {
    min1: f64,
    min5: f64,
    min15: f64,
    cpucore: usize,
}

/// Load average. The 15 minute value is checked as a percentage of the core
/// count.
pub struct LoadPlugin;

impl Plugin for LoadPlugin {
    fn name(&self) -> &'static str {
        "load"
    }

    fn fields(&self) -> &'static [FieldDescription] {
        FIELDS
    }

    fn default_thresholds(&self) -> Vec<(&'static str, Threshold)> {
        vec![("", threshold(70.0, 100.0, 500.0))]
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        let load = ctx.source.load_average()?;
        let cpucore = match ctx.snapshot("core").and_then(|core| core.number("log")) {
            Some(log) => log as usize,
            None => ctx.cpu.info(ctx.source).map(|info| info.logical_cores).unwrap_or(1),
        };

        PluginSnapshot::flat(&LoadStats {
            min1: load.min1,
            min5: load.min5,
            min15: load.min15,
            cpucore: cpucore.max(1),
        })
    }

    fn check_alerts(&self, snapshot: &PluginSnapshot, ctx: &mut AlertContext<'_>) {
        let (Some(record), Some(min15), Some(cpucore)) = (
            snapshot.as_flat(),
            snapshot.number("min15"),
            snapshot.number("cpucore"),
        ) else {
            return;
        };
        ctx.evaluate("", min15, cpucore, record);
    }
}
