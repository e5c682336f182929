use crate::{error::{CoreError, Result}, model::MemoryUsage};
use sysinfo::System;

pub struct MemoryCollector {
    sys: System,
}

impl MemoryCollector {
    pub fn new() -> Result<Self> {
        let sys = System::new();

        Ok(Self { sys })
    }

    pub fn collect(&mut self) -> Result<MemoryUsage> {
        self.sys.refresh_memory();

        let total = self.sys.total_memory();
        if total == 0 {
            return Err(CoreError::counters("total memory reported as zero"));
        }

        Ok(MemoryUsage {
            used: self.sys.used_memory().min(total),
            total,
        })
    }
}
