//! Scripted counter sources for tests and demos.

use super::{NetworkSource, SystemSource};
use crate::{
    error::{CoreError, Result},
    model::{ByteCounters, MemoryUsage, ProcessUsage},
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Build an interface map from `(name, received, sent)` triples
pub fn interfaces(entries: &[(&str, u64, u64)]) -> BTreeMap<String, ByteCounters> {
    entries
        .iter()
        .map(|(name, rx, tx)| (name.to_string(), ByteCounters::new(*rx, *tx)))
        .collect()
}

#[derive(Default)]
struct FakeNetworkState {
    script: VecDeque<Result<BTreeMap<String, ByteCounters>>>,
    last: BTreeMap<String, ByteCounters>,
    reads: usize,
}

/// Network source that replays a script of counter readings.
///
/// Once the script runs out, the last successful reading is repeated.
#[derive(Default)]
pub struct FakeNetworkSource {
    state: Mutex<FakeNetworkState>,
}

impl FakeNetworkSource {
    pub fn new(script: Vec<Result<BTreeMap<String, ByteCounters>>>) -> Self {
        Self {
            state: Mutex::new(FakeNetworkState {
                script: script.into(),
                ..FakeNetworkState::default()
            }),
        }
    }

    /// A source that always reports the same counters
    pub fn steady(counters: BTreeMap<String, ByteCounters>) -> Self {
        Self::new(vec![Ok(counters)])
    }

    /// A source whose every read fails
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn push(&self, reading: Result<BTreeMap<String, ByteCounters>>) {
        self.lock().script.push_back(reading);
    }

    /// Number of reads served so far
    pub fn reads(&self) -> usize {
        self.lock().reads
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeNetworkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl NetworkSource for FakeNetworkSource {
    fn interface_counters(&self) -> Result<BTreeMap<String, ByteCounters>> {
        let mut state = self.lock();
        state.reads += 1;
        match state.script.pop_front() {
            Some(Ok(counters)) => {
                state.last = counters.clone();
                Ok(counters)
            }
            Some(Err(e)) => Err(e),
            None if state.last.is_empty() => Err(CoreError::counters("no network interfaces")),
            None => Ok(state.last.clone()),
        }
    }
}

/// A process as seen by [`FakeSystemSource`]
#[derive(Debug, Clone)]
pub struct FakeProcess {
    pub usage: ProcessUsage,
    /// Exits between the priming pass and the reading pass
    pub vanishes: bool,
}

impl FakeProcess {
    pub fn new(pid: u32, name: &str, cpu_percent: f32) -> Self {
        Self {
            usage: ProcessUsage {
                pid,
                name: name.to_string(),
                cpu_percent,
            },
            vanishes: false,
        }
    }

    pub fn vanishing(mut self) -> Self {
        self.vanishes = true;
        self
    }
}

/// System source with fixed readings; a `None` field makes that reading fail.
#[derive(Debug, Clone)]
pub struct FakeSystemSource {
    pub cores: usize,
    pub cpu: Option<f32>,
    pub per_core: Option<Vec<f32>>,
    pub memory: Option<MemoryUsage>,
    pub processes: Option<Vec<FakeProcess>>,
    pub cpu_windows: Vec<Duration>,
    pub primes: usize,
}

impl FakeSystemSource {
    pub fn new(cores: usize) -> Self {
        Self {
            cores,
            cpu: Some(0.0),
            per_core: Some(vec![0.0; cores]),
            memory: Some(MemoryUsage { used: 0, total: 1 }),
            processes: Some(Vec::new()),
            cpu_windows: Vec::new(),
            primes: 0,
        }
    }

    /// Every reading fails
    pub fn broken(cores: usize) -> Self {
        Self {
            cpu: None,
            per_core: None,
            memory: None,
            processes: None,
            ..Self::new(cores)
        }
    }

    pub fn with_cpu(mut self, cpu: f32) -> Self {
        self.cpu = Some(cpu);
        self
    }

    pub fn with_per_core(mut self, per_core: Vec<f32>) -> Self {
        self.per_core = Some(per_core);
        self
    }

    pub fn with_memory(mut self, used: u64, total: u64) -> Self {
        self.memory = Some(MemoryUsage { used, total });
        self
    }

    pub fn with_processes(mut self, processes: Vec<FakeProcess>) -> Self {
        self.processes = Some(processes);
        self
    }
}

impl SystemSource for FakeSystemSource {
    fn core_count(&self) -> usize {
        self.cores.max(1)
    }

    fn cpu_percent(&mut self, window: Duration) -> Result<f32> {
        self.cpu_windows.push(window);
        self.cpu
            .ok_or_else(|| CoreError::counters("cpu sampling unavailable"))
    }

    fn cpu_per_core(&mut self) -> Result<Vec<f32>> {
        self.per_core
            .clone()
            .ok_or_else(|| CoreError::counters("per-core sampling unavailable"))
    }

    fn memory(&mut self) -> Result<MemoryUsage> {
        self.memory
            .ok_or_else(|| CoreError::counters("memory figures unavailable"))
    }

    fn prime_process_cpu(&mut self) -> Result<()> {
        if self.processes.is_none() {
            return Err(CoreError::process_info("process enumeration denied"));
        }
        self.primes += 1;
        Ok(())
    }

    fn process_cpu(&mut self) -> Result<Vec<Result<ProcessUsage>>> {
        let processes = self
            .processes
            .as_ref()
            .ok_or_else(|| CoreError::process_info("process enumeration denied"))?;

        Ok(processes
            .iter()
            .map(|p| {
                if p.vanishes {
                    Err(CoreError::process_info(format!("process {} exited", p.usage.pid)))
                } else {
                    Ok(p.usage.clone())
                }
            })
            .collect())
    }
}
