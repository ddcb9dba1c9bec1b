use serde::Serialize;

use crate::core::stats::plugin::{FieldDescription, Plugin, UpdateContext};
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::Result;

const FIELDS: &[FieldDescription] = &[
    FieldDescription::new("phys", "Number of physical cores (hyper thread CPUs are excluded)", "number"),
    FieldDescription::new("log", "Number of logical CPUs", "number"),
];

#[derive(Serialize)]
struct CoreStats {
    phys: Option<usize>,
    log: usize,
}

pub struct CorePlugin;

impl Plugin for CorePlugin {
    fn name(&self) -> &'static str {
        "core"
    }

    fn fields(&self) -> &'static [FieldDescription] {
        FIELDS
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        let info = ctx.cpu.info(ctx.source)?;
        PluginSnapshot::flat(&CoreStats {
            phys: info.physical_cores,
            log: info.logical_cores,
        })
    }
}
