use crate::model::{NetworkScope, SystemStats, TelemetrySnapshot, ThroughputSample};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Default)]
struct ThroughputState {
    sample: ThroughputSample,
    scope: NetworkScope,
    /// Interface names from the rate sampler's latest read
    interfaces: Vec<String>,
}

/// Latest throughput and system figures, shared by both samplers and the consumer.
///
/// Throughput and system stats sit behind separate locks so the fast rate
/// sampler never waits on the slower system stats sampler. Every write
/// replaces a whole group, so readers always see values from a single cycle.
#[derive(Debug, Default)]
pub struct TelemetryStore {
    throughput: Mutex<ThroughputState>,
    system: Mutex<SystemStats>,
}

// Groups are replaced wholesale, so a writer that panicked cannot leave a torn value behind
fn relock<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TelemetryStore {
    pub fn new(core_count: usize) -> Self {
        Self {
            throughput: Mutex::default(),
            system: Mutex::new(SystemStats::empty(core_count)),
        }
    }

    pub fn write_throughput(&self, sample: ThroughputSample, scope: NetworkScope) {
        let mut state = relock(&self.throughput);
        state.sample = sample;
        state.scope = scope;
    }

    /// Update the scope without touching the last published rate
    pub fn write_scope(&self, scope: NetworkScope) {
        relock(&self.throughput).scope = scope;
    }

    pub fn write_interfaces(&self, interfaces: Vec<String>) {
        relock(&self.throughput).interfaces = interfaces;
    }

    pub fn write_system(&self, stats: SystemStats) {
        *relock(&self.system) = stats;
    }

    pub fn throughput(&self) -> ThroughputSample {
        relock(&self.throughput).sample
    }

    pub fn scope(&self) -> NetworkScope {
        relock(&self.throughput).scope.clone()
    }

    /// Every interface seen by the last read, loopback included
    pub fn interfaces(&self) -> Vec<String> {
        relock(&self.throughput).interfaces.clone()
    }

    pub fn system(&self) -> SystemStats {
        relock(&self.system).clone()
    }

    /// Both groups; each is internally consistent, the two may be from different instants
    pub fn snapshot(&self) -> TelemetrySnapshot {
        let (throughput, scope) = {
            let state = relock(&self.throughput);
            (state.sample, state.scope.clone())
        };

        TelemetrySnapshot {
            throughput,
            scope,
            system: self.system(),
        }
    }
}
