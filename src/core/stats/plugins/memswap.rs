use serde::Serialize;

use crate::core::alerts::Threshold;
use crate::core::stats::plugin::{threshold, AlertContext, FieldDescription, Plugin, UpdateContext};
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::Result;

use super::percent;

const FIELDS: &[FieldDescription] = &[
    FieldDescription::new("total", "Total swap memory", "bytes"),
    FieldDescription::new("used", "Used swap memory", "bytes"),
    FieldDescription::new("free", "Free swap memory", "bytes"),
    FieldDescription::new("percent", "Used swap memory in percentage", "percent").with_history(),
];

#[derive(Serialize)]
struct SwapStats {
    total: u64,
    used: u64,
    free: u64,
    percent: f64,
}

pub struct MemSwapPlugin;

impl Plugin for MemSwapPlugin {
    fn name(&self) -> &'static str {
        "memswap"
    }

    fn fields(&self) -> &'static [FieldDescription] {
        FIELDS
    }

    fn default_thresholds(&self) -> Vec<(&'static str, Threshold)> {
        vec![("", threshold(50.0, 70.0, 90.0))]
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        let swap = ctx.source.swap()?;
        PluginSnapshot::flat(&SwapStats {
            total: swap.total,
            used: swap.used,
            free: swap.free,
            percent: percent(swap.used, swap.total),
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
