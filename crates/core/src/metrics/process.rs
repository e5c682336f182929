use crate::{error::Result, model::ProcessUsage};
use sysinfo::System;

/// Per-process CPU accounting through sysinfo.
///
/// sysinfo computes each process's CPU share between two consecutive
/// refreshes, so a prime followed by a read gives the usage over the gap.
pub struct ProcessCollector {
    sys: System,
}

impl ProcessCollector {
    pub fn new() -> Result<Self> {
        let sys = System::new();

        Ok(Self { sys })
    }

    pub fn prime(&mut self) -> Result<()> {
        self.sys.refresh_processes();
        Ok(())
    }

    pub fn collect(&mut self) -> Result<Vec<Result<ProcessUsage>>> {
        // Exited processes are dropped by the refresh itself
        self.sys.refresh_processes();

        Ok(self
            .sys
            .processes()
            .iter()
            .map(|(pid, process)| {
                Ok(ProcessUsage {
                    pid: pid.as_u32(),
                    name: process.name().to_string(),
                    cpu_percent: process.cpu_usage(),
                })
            })
            .collect())
    }
}
