use crate::error::{CoreError, Result};
use std::thread;
use std::time::Duration;
use sysinfo::System;

/// Portable CPU sampling through sysinfo.
///
/// Interval sampling and per-core sampling each keep their own `System` so
/// that one does not shorten the other's measurement window.
pub struct CpuCollector {
    sampling: System,
    per_core: System,
}

impl CpuCollector {
    pub fn new() -> Result<Self> {
        let mut sampling = System::new();
        sampling.refresh_cpu();

        let mut per_core = System::new();
        per_core.refresh_cpu();

        Ok(Self { sampling, per_core })
    }

    pub fn core_count(&self) -> usize {
        self.per_core.cpus().len().max(1)
    }

    /// Overall usage across `window`; blocks for the whole window
    pub fn sample_overall(&mut self, window: Duration) -> Result<f32> {
        self.sampling.refresh_cpu_usage();
        thread::sleep(window);
        self.sampling.refresh_cpu_usage();

        if self.sampling.cpus().is_empty() {
            return Err(CoreError::counters("no CPUs reported"));
        }

        Ok(self.sampling.global_cpu_info().cpu_usage())
    }

    /// Per-core usage since the previous call
    pub fn sample_per_core(&mut self) -> Result<Vec<f32>> {
        self.per_core.refresh_cpu_usage();

        let cores: Vec<f32> = self.per_core.cpus().iter().map(|cpu| cpu.cpu_usage()).collect();
        if cores.is_empty() {
            return Err(CoreError::counters("no CPUs reported"));
        }

        Ok(cores)
    }
}
