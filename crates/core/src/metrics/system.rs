use super::{CpuCollector, MemoryCollector, ProcessCollector};
use crate::{
    error::Result,
    model::{MemoryUsage, ProcessUsage},
    source::SystemSource,
};
use std::time::Duration;

/// CPU, RAM and process figures read through sysinfo
pub struct SysinfoSystem {
    cpu: CpuCollector,
    memory: MemoryCollector,
    process: ProcessCollector,
}

impl SysinfoSystem {
    pub fn new() -> Result<Self> {
        Ok(Self {
            cpu: CpuCollector::new()?,
            memory: MemoryCollector::new()?,
            process: ProcessCollector::new()?,
        })
    }
}

impl SystemSource for SysinfoSystem {
    fn core_count(&self) -> usize {
        self.cpu.core_count()
    }

    fn cpu_percent(&mut self, window: Duration) -> Result<f32> {
        self.cpu.sample_overall(window)
    }

    fn cpu_per_core(&mut self) -> Result<Vec<f32>> {
        self.cpu.sample_per_core()
    }

    fn memory(&mut self) -> Result<MemoryUsage> {
        self.memory.collect()
    }

    fn prime_process_cpu(&mut self) -> Result<()> {
        self.process.prime()
    }

    fn process_cpu(&mut self) -> Result<Vec<Result<ProcessUsage>>> {
        self.process.collect()
    }
}
