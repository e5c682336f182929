//! Kernel-time delta tier over `/proc/stat`.

#[cfg(feature = "linux_procfs")]
pub use procstat::ProcStatStrategy;

#[cfg(feature = "linux_procfs")]
mod procstat {
    use crate::platform::{busy_percent, CpuStrategy};
    use crate::{error::Result, model::MonitoringMethod, source::SystemSource};
    use procfs::{CurrentSI, KernelStats};
    use std::thread;
    use std::time::Duration;

    /// Aggregate CPU ticks as `(idle, total)`
    fn read_ticks() -> Result<(u64, u64)> {
        let stat = KernelStats::current()?;
        let cpu = stat.total;

        let idle = cpu.idle + cpu.iowait.unwrap_or(0);
        let total = cpu.user
            + cpu.nice
            + cpu.system
            + cpu.idle
            + cpu.iowait.unwrap_or(0)
            + cpu.irq.unwrap_or(0)
            + cpu.softirq.unwrap_or(0)
            + cpu.steal.unwrap_or(0);

        Ok((idle, total))
    }

    pub struct ProcStatStrategy {
        window: Duration,
    }

    impl ProcStatStrategy {
        pub fn new(window: Duration) -> Self {
            Self { window }
        }
    }

    impl CpuStrategy for ProcStatStrategy {
        fn method(&self) -> MonitoringMethod {
            MonitoringMethod::PlatformKernelTimeDelta
        }

        fn name(&self) -> &'static str {
            "proc-stat"
        }

        fn measure(&mut self, _source: &mut dyn SystemSource) -> Result<f32> {
            let (idle_start, total_start) = read_ticks()?;
            thread::sleep(self.window);
            let (idle_end, total_end) = read_ticks()?;

            Ok(busy_percent(
                idle_end.saturating_sub(idle_start),
                total_end.saturating_sub(total_start),
            ))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::source::fake::FakeSystemSource;

        #[test]
        fn test_proc_stat_within_bounds() {
            let mut source = FakeSystemSource::new(1);
            let mut strategy = ProcStatStrategy::new(Duration::from_millis(50));
            let cpu = strategy.measure(&mut source).unwrap();
            assert!((0.0..=100.0).contains(&cpu));
        }
    }
}
