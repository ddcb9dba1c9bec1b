use serde::Serialize;

use crate::core::alerts::Threshold;
use crate::core::stats::plugin::{threshold, AlertContext, FieldDescription, Plugin, UpdateContext};
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::Result;

use super::percent;

const FIELDS: &[FieldDescription] = &[
    FieldDescription::new("total", "Total physical memory available", "bytes"),
    FieldDescription::new("available", "The actual amount of available memory that can be given instantly to processes", "bytes"),
    FieldDescription::new("used", "Memory used, calculated differently depending on the platform", "bytes"),
    FieldDescription::new("free", "Memory not being used at all (zeroed) that is readily available", "bytes"),
    FieldDescription::new("percent", "The percentage usage calculated as (total - available) / total * 100", "percent").with_history(),
];

#[derive(Serialize)]
struct MemStats {
    total: u64,
    available: u64,
    used: u64,
    free: u64,
    percent: f64,
}

pub struct MemPlugin;

impl Plugin for MemPlugin {
    fn name(&self) -> &'static str {
        "mem"
    }

    fn fields(&self) -> &'static [FieldDescription] {
        FIELDS
    }

    fn default_thresholds(&self) -> Vec<(&'static str, Threshold)> {
        vec![("", threshold(50.0, 70.0, 90.0))]
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        let memory = ctx.source.memory()?;
        PluginSnapshot::flat(&MemStats {
            total: memory.total,
            available: memory.available,
            used: memory.used,
            free: memory.free,
            percent: percent(memory.used, memory.total),
        })
    }

    fn check_alerts(&self, snapshot: &PluginSnapshot, ctx: &mut AlertContext<'_>) {
        let (Some(record), Some(used), Some(total)) = (
            snapshot.as_flat(),
            snapshot.number("used"),
            snapshot.number("total"),
        ) else {
            return;
        };
        ctx.evaluate("", used, total, record);
    }
}
