use std::time::Duration;

use crate::core::source::{CoreUsage, CpuInfo, CpuPercent, MetricSource};
use crate::core::timer::Timer;
use crate::error::Result;

/// Timer-gated CPU readings shared by the cpu, percpu, core, load and
/// quicklook plugins. Frequency and core information is cached twice as long
/// as usage.
#[derive(Debug)]
pub struct CpuPercentCache {
    interval: Duration,
    total_timer: Timer,
    cores_timer: Timer,
    info_timer: Timer,
    total: Option<CpuPercent>,
    cores: Option<Vec<CoreUsage>>,
    info: Option<CpuInfo>,
}

impl CpuPercentCache {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            total_timer: Timer::expired_now(),
            cores_timer: Timer::expired_now(),
            info_timer: Timer::expired_now(),
            total: None,
            cores: None,
            info: None,
        }
    }

    pub fn total(&mut self, source: &mut dyn MetricSource) -> Result<CpuPercent> {
        match &self.total {
            Some(total) if !self.total_timer.expired() => Ok(total.clone()),
            _ => {
                let total = source.cpu()?;
                self.total = Some(total.clone());
                self.total_timer.arm(self.interval);
                Ok(total)
            }
        }
    }

    pub fn per_cpu(&mut self, source: &mut dyn MetricSource) -> Result<Vec<CoreUsage>> {
        match &self.cores {
            Some(cores) if !self.cores_timer.expired() => Ok(cores.clone()),
            _ => {
                let cores = source.per_cpu()?;
                self.cores = Some(cores.clone());
                self.cores_timer.arm(self.interval);
                Ok(cores)
            }
        }
    }

    pub fn info(&mut self, source: &mut dyn MetricSource) -> Result<CpuInfo> {
        match &self.info {
            Some(info) if !self.info_timer.expired() => Ok(info.clone()),
            _ => {
                let info = source.cpu_info()?;
                self.info = Some(info.clone());
                self.info_timer.arm(self.interval.saturating_mul(2));
                Ok(info)
            }
        }
    }
}
