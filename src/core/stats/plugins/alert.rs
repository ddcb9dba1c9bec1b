use crate::core::stats::plugin::{Plugin, Shape, UpdateContext};
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::Result;

/// Exposes the alert log, newest episode first.
///
/// Every plugin depends on this one, so it is refreshed first and shows the
/// log as of the end of the previous cycle.
pub struct AlertPlugin;

impl Plugin for AlertPlugin {
    fn name(&self) -> &'static str {
        "alert"
    }

    fn shape(&self) -> Shape {
        Shape::List
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        PluginSnapshot::list(&ctx.events.get())
    }
}
