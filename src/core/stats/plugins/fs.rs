use serde::Serialize;

use crate::core::alerts::Threshold;
use crate::core::stats::plugin::{threshold, AlertContext, FieldDescription, Plugin, Shape, UpdateContext};
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::Result;

use super::percent;

const FIELDS: &[FieldDescription] = &[
    FieldDescription::new("device_name", "Device name", "string"),
    FieldDescription::new("fs_type", "File system type", "string"),
    FieldDescription::new("mnt_point", "Mount point", "string"),
    FieldDescription::new("size", "Total size", "bytes"),
    FieldDescription::new("used", "Used size", "bytes"),
    FieldDescription::new("free", "Free size", "bytes"),
    FieldDescription::new("percent", "File system usage in percent", "percent").with_history(),
];

#[derive(Serialize)]
struct FsStats {
    device_name: String,
    fs_type: String,
    mnt_point: String,
    size: u64,
    used: u64,
    free: u64,
    percent: f64,
}

/// Mounted file systems, one item per mount point.
pub struct FsPlugin;

impl Plugin for FsPlugin {
    fn name(&self) -> &'static str {
        "fs"
    }

    fn shape(&self) -> Shape {
        Shape::List
    }

    fn get_key(&self) -> Option<&'static str> {
        Some("mnt_point")
    }

    fn fields(&self) -> &'static [FieldDescription] {
        FIELDS
    }

    fn default_thresholds(&self) -> Vec<(&'static str, Threshold)> {
        vec![("", threshold(50.0, 70.0, 90.0))]
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        let stats: Vec<FsStats> = ctx
            .source
            .file_systems()?
            .into_iter()
            .filter(|fs| ctx.limits.is_display(&fs.mnt_point))
            .map(|fs| FsStats {
                percent: percent(fs.used, fs.size),
                device_name: fs.device_name,
                fs_type: fs.fs_type,
                mnt_point: fs.mnt_point,
                size: fs.size,
                used: fs.used,
                free: fs.free,
            })
            .collect();
        PluginSnapshot::list(&stats)
    }

    fn check_alerts(&self, snapshot: &PluginSnapshot, ctx: &mut AlertContext<'_>) {
        for record in snapshot.as_list() {
            let (Some(mnt_point), Some(used), Some(size)) = (
                record.get("mnt_point").and_then(|v| v.as_str()),
                record.get("used").and_then(|v| v.as_f64()),
                record.get("size").and_then(|v| v.as_f64()),
            ) else {
                continue;
            };
            ctx.evaluate(mnt_point, used, size, record);
        }
    }
}
