use serde::Serialize;

use crate::core::stats::plugin::{FieldDescription, Plugin, UpdateContext};
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::Result;

use super::percent;

const FIELDS: &[FieldDescription] = &[
    FieldDescription::new("cpu", "CPU percent usage", "percent").with_history(),
    FieldDescription::new("mem", "MEM percent usage", "percent").with_history(),
    FieldDescription::new("swap", "SWAP percent usage", "percent"),
    FieldDescription::new("load", "LOAD percent usage", "percent").with_history(),
    FieldDescription::new("fs", "Highest file system percent usage", "percent"),
    FieldDescription::new("cpu_name", "CPU name", "string"),
    FieldDescription::new("cpu_hz_current", "CPU current frequency", "hertz"),
    FieldDescription::new("cpu_hz", "CPU max frequency", "hertz"),
];

#[derive(Serialize)]
struct QuickLookStats {
    cpu: f64,
    mem: f64,
    swap: f64,
    load: Option<f64>,
    fs: Option<f64>,
    cpu_name: String,
    cpu_hz_current: Option<f64>,
    cpu_hz: Option<f64>,
}

/// One-line summary built from the load and fs snapshots plus cached CPU
/// readings.
pub struct QuickLookPlugin;

impl Plugin for QuickLookPlugin {
    fn name(&self) -> &'static str {
        "quicklook"
    }

    fn fields(&self) -> &'static [FieldDescription] {
        FIELDS
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        let cpu = ctx.cpu.total(ctx.source)?;
        let info = ctx.cpu.info(ctx.source)?;
        let memory = ctx.source.memory()?;
        let swap = ctx.source.swap().unwrap_or_default();

        let load = ctx.snapshot("load").and_then(|load| {
            let min15 = load.number("min15")?;
            let cpucore = load.number("cpucore").filter(|cores| *cores > 0.0)?;
            Some(min15 * 100.0 / cpucore)
        });
        let fs = ctx.snapshot("fs").and_then(|fs| {
            fs.as_list()
                .iter()
                .filter_map(|item| item.get("percent").and_then(|v| v.as_f64()))
                .reduce(f64::max)
        });

        PluginSnapshot::flat(&QuickLookStats {
            cpu: cpu.total,
            mem: percent(memory.used, memory.total),
            swap: percent(swap.used, swap.total),
            load,
            fs,
            cpu_name: info.name,
            cpu_hz_current: info.hz_current,
            cpu_hz: info.hz_max,
        })
    }
}
