use serde::Serialize;

use crate::core::stats::plugin::{FieldDescription, Plugin, Shape, UpdateContext};
use crate::core::stats::rate::CounterRates;
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::Result;

const FIELDS: &[FieldDescription] = &[
    FieldDescription::new("disk_name", "Disk name", "string"),
    FieldDescription::new("read_bytes", "Bytes read since boot", "bytes"),
    FieldDescription::new("write_bytes", "Bytes written since boot", "bytes"),
    FieldDescription::new("read_bytes_rate", "Bytes read per second", "bytespersecond").with_history(),
    FieldDescription::new("write_bytes_rate", "Bytes written per second", "bytespersecond").with_history(),
    FieldDescription::new("read_count_rate", "Read operations per second", "number"),
    FieldDescription::new("write_count_rate", "Write operations per second", "number"),
    FieldDescription::new("time_since_update", "Seconds since the previous sample", "seconds"),
];

#[derive(Serialize)]
struct DiskIoStats {
    disk_name: String,
    read_bytes: u64,
    write_bytes: u64,
    read_bytes_rate: f64,
    write_bytes_rate: f64,
    read_count_rate: f64,
    write_count_rate: f64,
    time_since_update: f64,
}

/// Disk throughput, as rates over the previous sample of each disk.
#[derive(Default)]
pub struct DiskIoPlugin {
    rates: CounterRates,
}

impl Plugin for DiskIoPlugin {
    fn name(&self) -> &'static str {
        "diskio"
    }

    fn shape(&self) -> Shape {
        Shape::List
    }

    fn get_key(&self) -> Option<&'static str> {
        Some("disk_name")
    }

    fn fields(&self) -> &'static [FieldDescription] {
        FIELDS
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        let disks = ctx.source.disk_io()?;
        self.rates
            .retain(disks.iter().map(|disk| disk.disk_name.as_str()));

        let mut stats = Vec::with_capacity(disks.len());
        for disk in disks {
            if !ctx.limits.is_display(&disk.disk_name) {
                continue;
            }
            let rates = self.rates.update(
                &disk.disk_name,
                &[
                    disk.read_bytes,
                    disk.write_bytes,
                    disk.read_count,
                    disk.write_count,
                ],
                ctx.now,
            );
            stats.push(DiskIoStats {
                disk_name: disk.disk_name,
                read_bytes: disk.read_bytes,
                write_bytes: disk.write_bytes,
                read_bytes_rate: rates.values[0],
                write_bytes_rate: rates.values[1],
                read_count_rate: rates.values[2],
                write_count_rate: rates.values[3],
                time_since_update: rates.elapsed,
            });
        }
        PluginSnapshot::list(&stats)
    }
}
