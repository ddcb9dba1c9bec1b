use serde::Serialize;

use crate::core::stats::plugin::{FieldDescription, Plugin, Shape, UpdateContext};
use crate::core::stats::rate::CounterRates;
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::Result;

const FIELDS: &[FieldDescription] = &[
    FieldDescription::new("interface_name", "Interface name", "string"),
    FieldDescription::new("bytes_recv", "Bytes received since boot", "bytes"),
    FieldDescription::new("bytes_sent", "Bytes sent since boot", "bytes"),
    FieldDescription::new("bytes_recv_rate", "Bytes received per second", "bytespersecond").with_history(),
    FieldDescription::new("bytes_sent_rate", "Bytes sent per second", "bytespersecond").with_history(),
    FieldDescription::new("packets_recv_rate", "Packets received per second", "number"),
    FieldDescription::new("packets_sent_rate", "Packets sent per second", "number"),
    FieldDescription::new("errors_in", "Receive errors since boot", "number"),
    FieldDescription::new("errors_out", "Transmit errors since boot", "number"),
    FieldDescription::new("time_since_update", "Seconds since the previous sample", "seconds"),
];

#[derive(Serialize)]
struct NetworkStats {
    interface_name: String,
    bytes_recv: u64,
    bytes_sent: u64,
    bytes_recv_rate: f64,
    bytes_sent_rate: f64,
    packets_recv_rate: f64,
    packets_sent_rate: f64,
    errors_in: u64,
    errors_out: u64,
    time_since_update: f64,
}

#[derive(Default)]
pub struct NetworkPlugin {
    rates: CounterRates,
}

impl Plugin for NetworkPlugin {
    fn name(&self) -> &'static str {
        "network"
    }

    fn shape(&self) -> Shape {
        Shape::List
    }

    fn get_key(&self) -> Option<&'static str> {
        Some("interface_name")
    }

    fn fields(&self) -> &'static [FieldDescription] {
        FIELDS
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        let interfaces = ctx.source.network()?;
        self.rates
            .retain(interfaces.iter().map(|nic| nic.interface_name.as_str()));

        let mut stats = Vec::with_capacity(interfaces.len());
        for nic in interfaces {
            if !ctx.limits.is_display(&nic.interface_name) {
                continue;
            }
            let rates = self.rates.update(
                &nic.interface_name,
                &[
                    nic.bytes_recv,
                    nic.bytes_sent,
                    nic.packets_recv,
                    nic.packets_sent,
                ],
                ctx.now,
            );
            stats.push(NetworkStats {
                interface_name: nic.interface_name,
                bytes_recv: nic.bytes_recv,
                bytes_sent: nic.bytes_sent,
                bytes_recv_rate: rates.values[0],
                bytes_sent_rate: rates.values[1],
                packets_recv_rate: rates.values[2],
                packets_sent_rate: rates.values[3],
                errors_in: nic.errors_in,
                errors_out: nic.errors_out,
                time_since_update: rates.elapsed,
            });
        }
        PluginSnapshot::list(&stats)
    }
}
