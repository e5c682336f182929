//! System stats sampler: CPU, per-core CPU, RAM and top CPU consumers.

use crate::{
    config::SamplerConfig,
    model::{MonitoringMethod, ProcessUsage, SystemStats, TopProcess},
    platform::CpuStrategy,
    source::SystemSource,
    store::TelemetryStore,
};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Clamp a CPU figure to `[0, 100]`
pub fn clamp_percent(value: f32) -> f32 {
    value.clamp(0.0, 100.0)
}

/// Keep processes above `min_percent`, busiest first, at most `limit` of them.
///
/// Failed per-process readings are dropped: processes exit or deny access
/// between the two passes all the time.
pub fn select_top_processes(
    readings: Vec<crate::error::Result<ProcessUsage>>,
    min_percent: f32,
    limit: usize,
) -> Vec<TopProcess> {
    let mut top: Vec<TopProcess> = readings
        .into_iter()
        .filter_map(|reading| reading.ok())
        .filter(|usage| usage.cpu_percent > min_percent)
        .map(|usage| TopProcess {
            cpu_percent: usage.cpu_percent,
            name: usage.name,
        })
        .collect();

    top.sort_by(|a, b| {
        b.cpu_percent
            .total_cmp(&a.cpu_percent)
            .then_with(|| b.name.cmp(&a.name))
    });
    top.truncate(limit);
    top
}

pub struct SystemStatsSampler {
    strategies: Vec<Box<dyn CpuStrategy>>,
    warned: Vec<bool>,
    last_method: Option<MonitoringMethod>,
    process_settle: Duration,
    top_process_limit: usize,
    top_process_min_percent: f32,
}

impl SystemStatsSampler {
    pub fn new(strategies: Vec<Box<dyn CpuStrategy>>, config: &SamplerConfig) -> Self {
        let warned = vec![false; strategies.len()];
        Self {
            strategies,
            warned,
            last_method: None,
            process_settle: config.process_settle(),
            top_process_limit: config.top_process_limit,
            top_process_min_percent: config.top_process_min_percent,
        }
    }

    /// Try each tier in order; the first success wins. All failing yields 0.
    pub fn measure_cpu(&mut self, source: &mut dyn SystemSource) -> (f32, MonitoringMethod) {
        let mut result = (0.0, MonitoringMethod::Unavailable);

        for (index, strategy) in self.strategies.iter_mut().enumerate() {
            match strategy.measure(source) {
                Ok(value) if value.is_finite() => {
                    result = (clamp_percent(value), strategy.method());
                    break;
                }
                Ok(value) => {
                    debug!(tier = strategy.name(), value, "discarding non-finite CPU reading");
                }
                Err(e) if !self.warned[index] => {
                    warn!(
                        tier = strategy.name(),
                        error = %e,
                        "CPU measurement tier failed, falling back"
                    );
                    self.warned[index] = true;
                }
                Err(e) => {
                    debug!(tier = strategy.name(), error = %e, "CPU measurement tier failed");
                }
            }
        }

        if self.last_method != Some(result.1) {
            info!(method = %result.1, "CPU measurement method");
            self.last_method = Some(result.1);
        }

        result
    }

    /// Zero-wait per-core sample; a failure yields zeros sized to the core count
    pub fn measure_per_core(&self, source: &mut dyn SystemSource) -> Vec<f32> {
        match source.cpu_per_core() {
            Ok(cores) => cores.into_iter().map(clamp_percent).collect(),
            Err(e) => {
                error!(error = %e, "Error getting per-core CPU");
                vec![0.0; source.core_count()]
            }
        }
    }

    /// `(percent, used, total)`; a failure yields `(0, 0, 1)` so ratios stay defined
    pub fn measure_memory(&self, source: &mut dyn SystemSource) -> (f32, u64, u64) {
        match source.memory() {
            Ok(memory) if memory.total > 0 => {
                let percent = memory.used as f64 / memory.total as f64 * 100.0;
                (clamp_percent(percent as f32), memory.used, memory.total)
            }
            Ok(_) => {
                error!("Error getting memory info: total reported as zero");
                (0.0, 0, 1)
            }
            Err(e) => {
                error!(error = %e, "Error getting memory info");
                (0.0, 0, 1)
            }
        }
    }

    /// Two passes: prime every process's accounting, settle, then read
    pub fn measure_top_processes(&self, source: &mut dyn SystemSource) -> Vec<TopProcess> {
        if let Err(e) = source.prime_process_cpu() {
            error!(error = %e, "Error getting process info");
            return Vec::new();
        }

        thread::sleep(self.process_settle);

        match source.process_cpu() {
            Ok(readings) => select_top_processes(
                readings,
                self.top_process_min_percent,
                self.top_process_limit,
            ),
            Err(e) => {
                error!(error = %e, "Error getting process info");
                Vec::new()
            }
        }
    }

    /// One full cycle; each field degrades to its safe default on its own
    pub fn cycle(&mut self, source: &mut dyn SystemSource) -> SystemStats {
        let (cpu_percent, monitoring_method) = self.measure_cpu(source);
        let cpu_per_core = self.measure_per_core(source);
        let (ram_percent, ram_used_bytes, ram_total_bytes) = self.measure_memory(source);
        let top_processes = self.measure_top_processes(source);

        SystemStats {
            cpu_percent,
            cpu_per_core,
            ram_percent,
            ram_used_bytes,
            ram_total_bytes,
            top_processes,
            monitoring_method,
        }
    }

    /// Sample until `running` is cleared
    pub fn run(
        mut self,
        mut source: Box<dyn SystemSource>,
        store: Arc<TelemetryStore>,
        running: Arc<AtomicBool>,
        config: SamplerConfig,
    ) {
        info!(tiers = self.strategies.len(), "system stats sampler started");

        while running.load(Ordering::Acquire) {
            let cycle = panic::catch_unwind(AssertUnwindSafe(|| self.cycle(source.as_mut())));

            match cycle {
                Ok(stats) => {
                    store.write_system(stats);
                    thread::sleep(config.stats_yield());
                }
                Err(_) => {
                    error!("Error updating system stats: sampler cycle panicked");
                    thread::sleep(config.stats_error_backoff());
                }
            }
        }

        info!("system stats sampler stopped");
    }
}
