use serde::Serialize;

use crate::core::stats::plugin::{FieldDescription, Plugin, UpdateContext};
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::Result;

const FIELDS: &[FieldDescription] = &[
    FieldDescription::new("seconds", "Seconds since boot", "seconds"),
    FieldDescription::new("human", "Time since boot", "string"),
];

#[derive(Serialize)]
struct UptimeStats {
    seconds: u64,
    human: String,
}

/// `3 days, 4:05:06`, or `4:05:06` under a day
pub(crate) fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let rest = seconds % 86_400;
    let clock = format!("{}:{:02}:{:02}", rest / 3600, (rest % 3600) / 60, rest % 60);
    match days {
        0 => clock,
        1 => format!("1 day, {}", clock),
        n => format!("{} days, {}", n, clock),
    }
}

pub struct UptimePlugin;

impl Plugin for UptimePlugin {
    fn name(&self) -> &'static str {
        "uptime"
    }

    fn fields(&self) -> &'static [FieldDescription] {
        FIELDS
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        let seconds = ctx.source.uptime()?;
        PluginSnapshot::flat(&UptimeStats {
            seconds,
            human: format_uptime(seconds),
        })
    }
}
