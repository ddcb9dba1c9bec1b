//! Built-in plugins.

mod alert;
mod cores;
mod cpu;
mod diskio;
mod fs;
mod load;
mod mem;
mod memswap;
mod network;
mod percpu;
mod processcount;
mod processlist;
mod programlist;
mod quicklook;
mod sensors;
mod system;
mod uptime;

pub use alert::AlertPlugin;
pub use cores::CorePlugin;
pub use cpu::CpuPlugin;
pub use diskio::DiskIoPlugin;
pub use fs::FsPlugin;
pub use load::LoadPlugin;
pub use mem::MemPlugin;
pub use memswap::MemSwapPlugin;
pub use network::NetworkPlugin;
pub use percpu::PerCpuPlugin;
pub use processcount::ProcessCountPlugin;
pub use processlist::ProcessListPlugin;
pub use programlist::ProgramListPlugin;
pub use quicklook::QuickLookPlugin;
pub use sensors::SensorsPlugin;
pub use system::SystemPlugin;
pub use uptime::UptimePlugin;

use super::plugin::Plugin;

/// One instance of every built-in plugin
pub fn default_plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(AlertPlugin),
        Box::new(CorePlugin),
        Box::new(CpuPlugin),
        Box::new(DiskIoPlugin::default()),
        Box::new(FsPlugin),
        Box::new(LoadPlugin),
        Box::new(MemPlugin),
        Box::new(MemSwapPlugin),
        Box::new(NetworkPlugin::default()),
        Box::new(PerCpuPlugin),
        Box::new(ProcessCountPlugin),
        Box::new(ProcessListPlugin::default()),
        Box::new(ProgramListPlugin),
        Box::new(QuickLookPlugin),
        Box::new(SensorsPlugin),
        Box::new(SystemPlugin),
        Box::new(UptimePlugin),
    ]
}

/// `used` as a percentage of `total`, 0 when the total is unknown
pub(crate) fn percent(used: u64, total: u64) -> f64 {
    if total > 0 {
        used as f64 * 100.0 / total as f64
    } else {
        0.0
    }
}
