use crate::core::alerts::Threshold;
use crate::core::stats::plugin::{threshold, AlertContext, FieldDescription, Plugin, Shape, UpdateContext};
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::Result;

const FIELDS: &[FieldDescription] = &[
    FieldDescription::new("label", "Sensor label", "string"),
    FieldDescription::new("value", "Sensor value", "number").with_history(),
    FieldDescription::new("warning", "Warning threshold reported by the hardware", "number"),
    FieldDescription::new("critical", "Critical threshold reported by the hardware", "number"),
    FieldDescription::new("unit", "Sensor unit", "string"),
];

/// Hardware sensors. Temperatures are checked as a percentage of 100.
pub struct SensorsPlugin;

impl Plugin for SensorsPlugin {
    fn name(&self) -> &'static str {
        "sensors"
    }

    fn shape(&self) -> Shape {
        Shape::List
    }

    fn get_key(&self) -> Option<&'static str> {
        Some("label")
    }

    fn fields(&self) -> &'static [FieldDescription] {
        FIELDS
    }

    fn default_thresholds(&self) -> Vec<(&'static str, Threshold)> {
        vec![("", threshold(60.0, 70.0, 80.0))]
    }

    fn default_log(&self) -> bool {
        false
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        let sensors: Vec<_> = ctx
            .source
            .sensors()?
            .into_iter()
            .filter(|sensor| ctx.limits.is_display(&sensor.label))
            .collect();
        PluginSnapshot::list(&sensors)
    }

    fn check_alerts(&self, snapshot: &PluginSnapshot, ctx: &mut AlertContext<'_>) {
        for record in snapshot.as_list() {
            let (Some(label), Some(value)) = (
                record.get("label").and_then(|v| v.as_str()),
                record.get("value").and_then(|v| v.as_f64()),
            ) else {
                continue;
            };
            ctx.evaluate(label, value, 100.0, record);
        }
    }
}
