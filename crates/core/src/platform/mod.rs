//! Tiered CPU measurement.
//!
//! Each platform contributes an ordered list of [`CpuStrategy`] tiers, most
//! precise first. The system stats sampler tries them in order every cycle and
//! keeps the first success.

#[cfg(target_os = "linux")]
pub mod linux;
pub mod portable;
#[cfg(windows)]
pub mod windows;

pub use portable::PortableStrategy;

use crate::{config::SamplerConfig, error::Result, model::MonitoringMethod, source::SystemSource};

/// One way of measuring overall CPU utilisation over an interval
pub trait CpuStrategy: Send {
    /// Method reported when this tier produced the figure
    fn method(&self) -> MonitoringMethod;

    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Busy percentage over this tier's window; may block for the window
    fn measure(&mut self, source: &mut dyn SystemSource) -> Result<f32>;
}

/// Build the tier chain for the current platform.
///
/// A tier that cannot even be set up is logged and left out.
pub fn default_strategies(config: &SamplerConfig) -> Vec<Box<dyn CpuStrategy>> {
    let mut strategies: Vec<Box<dyn CpuStrategy>> = Vec::new();

    #[cfg(windows)]
    {
        match windows::PdhCounterStrategy::open(config.cpu_window()) {
            Ok(strategy) => strategies.push(Box::new(strategy)),
            Err(e) => tracing::warn!(error = %e, "Windows performance counters unavailable"),
        }
        strategies.push(Box::new(windows::KernelTimeStrategy::new(config.cpu_window())));
    }

    #[cfg(all(target_os = "linux", feature = "linux_procfs"))]
    {
        strategies.push(Box::new(linux::ProcStatStrategy::new(config.cpu_window())));
    }

    strategies.push(Box::new(PortableStrategy::new(config.fallback_cpu_window())));

    tracing::info!(
        platform = platform_name(),
        tiers = ?strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
        "CPU measurement tiers ready"
    );

    strategies
}

/// Get platform name
pub fn platform_name() -> &'static str {
    if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(windows) {
        "windows"
    } else {
        "generic"
    }
}

/// Busy percentage from kernel tick deltas: `100 * (1 - idle / total)`.
///
/// `total_delta` must include idle time. Returns 0 when no time elapsed.
pub fn busy_percent(idle_delta: u64, total_delta: u64) -> f32 {
    if total_delta == 0 {
        return 0.0;
    }
    (100.0 * (1.0 - idle_delta as f64 / total_delta as f64)) as f32
}
