use super::CpuStrategy;
use crate::{error::Result, model::MonitoringMethod, source::SystemSource};
use std::time::Duration;

/// Interval sampling through the counter source; available everywhere
pub struct PortableStrategy {
    window: Duration,
}

impl PortableStrategy {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }
}

impl CpuStrategy for PortableStrategy {
    fn method(&self) -> MonitoringMethod {
        MonitoringMethod::PortableSamplingFallback
    }

    fn name(&self) -> &'static str {
        "portable"
    }

    fn measure(&mut self, source: &mut dyn SystemSource) -> Result<f32> {
        source.cpu_percent(self.window)
    }
}
