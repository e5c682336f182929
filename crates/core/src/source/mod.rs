//! Counter source seams.
//!
//! The samplers never talk to the operating system directly. They read
//! cumulative network counters through [`NetworkSource`] and CPU, RAM and
//! process figures through [`SystemSource`]. The sysinfo-backed
//! implementations live in [`crate::metrics`]; scripted fakes live in
//! [`fake`].

pub mod fake;

use crate::{
    error::Result,
    model::{ByteCounters, MemoryUsage, ProcessUsage},
};
use std::collections::BTreeMap;
use std::time::Duration;

/// Cumulative byte counters per interface.
///
/// The all-interfaces figure is the sum of one reading, see
/// [`crate::InterfaceSelector::resolve`].
pub trait NetworkSource: Send + Sync {
    /// Counters of every interface currently known to the OS, keyed by name
    fn interface_counters(&self) -> Result<BTreeMap<String, ByteCounters>>;
}

/// Point-in-time CPU, RAM and process figures.
///
/// Owned by a single sampler thread, so methods take `&mut self`.
pub trait SystemSource: Send {
    /// Number of logical cores, at least 1
    fn core_count(&self) -> usize;

    /// Overall CPU busy percentage measured across `window`; blocks for that long
    fn cpu_percent(&mut self, window: Duration) -> Result<f32>;

    /// Per-core busy percentages since the previous call; never blocks
    fn cpu_per_core(&mut self) -> Result<Vec<f32>>;

    fn memory(&mut self) -> Result<MemoryUsage>;

    /// Open a per-process CPU accounting window; the readings are discarded
    fn prime_process_cpu(&mut self) -> Result<()>;

    /// Per-process CPU usage since the last prime. A process that exited or
    /// denied access in between shows up as an `Err` entry.
    fn process_cpu(&mut self) -> Result<Vec<Result<ProcessUsage>>>;
}
