use serde::Serialize;

use crate::core::source::HostInfo;
use crate::core::stats::plugin::{FieldDescription, Plugin, UpdateContext};
use crate::core::stats::snapshot::PluginSnapshot;
use crate::error::Result;

const FIELDS: &[FieldDescription] = &[
    FieldDescription::new("hostname", "Hostname", "string"),
    FieldDescription::new("os_name", "Operating system name", "string"),
    FieldDescription::new("os_version", "Operating system version", "string"),
    FieldDescription::new("kernel_version", "Kernel version", "string"),
    FieldDescription::new("platform", "Platform family", "string"),
    FieldDescription::new("arch", "CPU architecture", "string"),
    FieldDescription::new("hr_name", "Human readable operating system name", "string"),
];

#[derive(Serialize)]
struct SystemStats {
    #[serde(flatten)]
    host: HostInfo,
    hr_name: String,
}

/// "Ubuntu 24.04 64bit" style name
fn human_name(host: &HostInfo) -> String {
    let bits = if host.arch.contains("64") { " 64bit" } else { "" };
    let name = [host.os_name.as_str(), host.os_version.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    format!("{}{}", name, bits)
}

pub struct SystemPlugin;

impl Plugin for SystemPlugin {
    fn name(&self) -> &'static str {
        "system"
    }

    fn fields(&self) -> &'static [FieldDescription] {
        FIELDS
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<PluginSnapshot> {
        let host = ctx.source.host()?;
        PluginSnapshot::flat(&SystemStats {
            hr_name: human_name(&host),
            host,
        })
    }
}
