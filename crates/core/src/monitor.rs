//! The sampler facade handed to the presentation layer.

use crate::{
    config::SamplerConfig,
    error::{CoreError, Result},
    metrics::{SysinfoNetworks, SysinfoSystem},
    model::{CounterSnapshot, SystemStats, TelemetrySnapshot, ThroughputSample},
    platform::{self, CpuStrategy},
    rate::RateSampler,
    selector::InterfaceSelector,
    source::{NetworkSource, SystemSource},
    stats::SystemStatsSampler,
    store::TelemetryStore,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Owns both sampler threads and the state they share.
///
/// Readers never wait on a sampler: every getter copies the latest value out
/// of the [`TelemetryStore`].
pub struct Monitor {
    config: SamplerConfig,
    network: Arc<dyn NetworkSource>,
    system: Option<(Box<dyn SystemSource>, Vec<Box<dyn CpuStrategy>>)>,
    store: Arc<TelemetryStore>,
    selector: Arc<InterfaceSelector>,
    running: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl Monitor {
    pub fn new(
        config: SamplerConfig,
        network: Arc<dyn NetworkSource>,
        system: Box<dyn SystemSource>,
        strategies: Vec<Box<dyn CpuStrategy>>,
    ) -> Self {
        let store = Arc::new(TelemetryStore::new(system.core_count()));
        let selector = Arc::new(InterfaceSelector::new(
            config.interface.clone(),
            config.loopback_prefix.clone(),
        ));

        Self {
            config,
            network,
            system: Some((system, strategies)),
            store,
            selector,
            running: Arc::new(AtomicBool::new(false)),
            threads: Vec::new(),
        }
    }

    /// Monitor backed by sysinfo and the platform's CPU tiers
    pub fn with_system_sources(config: SamplerConfig) -> Result<Self> {
        let network = Arc::new(SysinfoNetworks::new()?);
        let system = Box::new(SysinfoSystem::new()?);
        let strategies = platform::default_strategies(&config);

        Ok(Self::new(config, network, system, strategies))
    }

    /// Begin both sampling loops.
    ///
    /// Fails before any thread starts if the network counters cannot be read
    /// at all, or if the monitor was already started.
    pub fn start(&mut self) -> Result<()> {
        if self.system.is_none() {
            return Err(CoreError::startup("monitor was already started"));
        }

        let per_interface = self
            .network
            .interface_counters()
            .map_err(|e| {
                CoreError::startup(format!("Unable to access network interfaces: {}", e))
            })?;

        let (system, strategies) = self
            .system
            .take()
            .ok_or_else(|| CoreError::startup("monitor was already started"))?;

        let (scope, counters) = self.selector.resolve(&per_interface);
        self.store.write_scope(scope.clone());
        self.store.write_interfaces(per_interface.keys().cloned().collect());
        let rate = RateSampler::seeded(
            self.config.sanity_ceiling_bps,
            CounterSnapshot {
                counters,
                scope,
                taken_at: Instant::now(),
            },
        );
        let stats = SystemStatsSampler::new(strategies, &self.config);

        self.running.store(true, Ordering::Release);

        let rate_thread = {
            let source = Arc::clone(&self.network);
            let selector = Arc::clone(&self.selector);
            let store = Arc::clone(&self.store);
            let running = Arc::clone(&self.running);
            let config = self.config.clone();
            thread::Builder::new()
                .name("bitmeter-rate".to_string())
                .spawn(move || rate.run(source, selector, store, running, config))
        };
        match rate_thread {
            Ok(handle) => self.threads.push(handle),
            Err(e) => {
                self.running.store(false, Ordering::Release);
                return Err(CoreError::startup(format!("failed to spawn rate sampler: {}", e)));
            }
        }

        let stats_thread = {
            let store = Arc::clone(&self.store);
            let running = Arc::clone(&self.running);
            let config = self.config.clone();
            thread::Builder::new()
                .name("bitmeter-stats".to_string())
                .spawn(move || stats.run(system, store, running, config))
        };
        match stats_thread {
            Ok(handle) => self.threads.push(handle),
            Err(e) => {
                self.stop();
                return Err(CoreError::startup(format!(
                    "failed to spawn system stats sampler: {}",
                    e
                )));
            }
        }

        info!(
            interval_ms = self.config.rate_interval_ms,
            scope = %self.store.scope(),
            "monitor started"
        );
        Ok(())
    }

    /// Ask both loops to finish their current iteration, then join them.
    ///
    /// A thread still busy after `shutdown_timeout_ms` is detached.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);

        for handle in self.threads.drain(..) {
            let name = handle.thread().name().unwrap_or("sampler").to_string();
            match join_with_timeout(handle, self.config.shutdown_timeout()) {
                JoinResult::Finished => {}
                JoinResult::Panicked => error!(thread = %name, "sampler thread panicked"),
                JoinResult::TimedOut => {
                    warn!(thread = %name, "sampler thread did not stop in time, detaching")
                }
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn throughput(&self) -> ThroughputSample {
        self.store.throughput()
    }

    pub fn system_stats(&self) -> SystemStats {
        self.store.system()
    }

    /// "Monitoring all interfaces" or "Monitoring <name>"
    pub fn monitoring_method(&self) -> String {
        self.store.scope().to_string()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        self.store.snapshot()
    }

    /// Change the scope of subsequent rate cycles; `None` aggregates all interfaces
    pub fn set_interface(&self, interface: Option<String>) {
        info!(interface = ?interface, "interface selection changed");
        self.selector.select(interface);
    }

    pub fn selected_interface(&self) -> Option<String> {
        self.selector.selected()
    }

    /// Selectable interfaces, loopback excluded; empty when they cannot be listed.
    ///
    /// While running, answers from the rate sampler's latest read instead of
    /// querying the counter source.
    pub fn list_interfaces(&self) -> Vec<String> {
        if self.is_running() {
            let cached = self.store.interfaces();
            if !cached.is_empty() {
                return self.selector.selectable(cached);
            }
        }

        match self.selector.available(self.network.as_ref()) {
            Ok(interfaces) => interfaces,
            Err(e) => {
                error!(error = %e, "Error getting interfaces");
                Vec::new()
            }
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if !self.threads.is_empty() {
            self.stop();
        }
    }
}

enum JoinResult {
    Finished,
    Panicked,
    TimedOut,
}

fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> JoinResult {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return JoinResult::TimedOut;
        }
        thread::sleep(Duration::from_millis(10));
    }

    match handle.join() {
        Ok(()) => JoinResult::Finished,
        Err(_) => JoinResult::Panicked,
    }
}
