use serde::Serialize;

use crate::core::alerts::Threshold;
use crate::core::stats::plugin::{threshold, AlertContext, FieldDescription, Plugin, UpdateContext};
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::Result;

const FIELDS: &[FieldDescription] = &[
    FieldDescription::new("total", "Sum of all CPU percentages (except idle)", "percent").with_history(),
    FieldDescription::new("user", "Percent time spent in user space", "percent").with_history(),
    FieldDescription::new("system", "Percent time spent in kernel space", "percent").with_history(),
    FieldDescription::new("idle", "Percent of CPU used by any program", "percent"),
    FieldDescription::new("nice", "Percent time occupied by user level processes with a positive nice value", "percent"),
    FieldDescription::new("iowait", "Percent time spent waiting for I/O operations to complete", "percent"),
    FieldDescription::new("irq", "Percent time spent servicing hardware interrupts", "percent"),
    FieldDescription::new("steal", "Percent time in involuntary wait by the virtual CPU", "percent"),
    FieldDescription::new("cpucore", "Total number of CPU cores", "number"),
];

/// Stats checked against thresholds, in board/event naming order
const ALERT_STATS: [&str; 4] = ["user", "system", "iowait", "steal"];

#[derive(Serialize)]
struct CpuStats {
    total: f64,
    user: Option<f64>,
    system: Option<f64>,
    idle: Option<f64>,
    nice: Option<f64>,
    iowait: Option<f64>,
    irq: Option<f64>,
    steal: Option<f64>,
    cpucore: usize,
}

pub struct CpuPlugin;

impl Plugin for CpuPlugin {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn fields(&self) -> &'static [FieldDescription] {
        FIELDS
    }

    fn default_thresholds(&self) -> Vec<(&'static str, Threshold)> {
        vec![
            ("user", threshold(50.0, 70.0, 90.0)),
            ("system", threshold(50.0, 70.0, 90.0)),
            ("iowait", threshold(40.0, 60.0, 80.0)),
            ("steal", threshold(50.0, 70.0, 90.0)),
        ]
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        let cpu = ctx.cpu.total(ctx.source)?;
        let cpucore = match ctx.snapshot("core").and_then(|core| core.number("log")) {
            Some(log) => log as usize,
            None => ctx.cpu.info(ctx.source).map(|info| info.logical_cores).unwrap_or(1),
        };

        PluginSnapshot::flat(&CpuStats {
            total: cpu.total,
            user: cpu.user,
            system: cpu.system,
            idle: cpu.idle,
            nice: cpu.nice,
            iowait: cpu.iowait,
            irq: cpu.irq,
            steal: cpu.steal,
            cpucore,
        })
    }

    fn check_alerts(&self, snapshot: &PluginSnapshot, ctx: &mut AlertContext<'_>) {
        let Some(record) = snapshot.as_flat() else {
            return;
        };
        for stat in ALERT_STATS {
            if let Some(value) = snapshot.number(stat) {
                ctx.evaluate(stat, value, 100.0, record);
            }
        }
    }
}
