//! Rate sampler: cumulative byte counters in, bits per second out.

use crate::{
    config::SamplerConfig,
    error::Result,
    model::{ByteCounters, CounterSnapshot, NetworkScope, ThroughputSample},
    selector::InterfaceSelector,
    source::NetworkSource,
    store::TelemetryStore,
    units::{format_speed, SpeedUnit},
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Longest uninterrupted sleep of a sampler loop
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// What a single cycle did with the counters it read
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// A new rate was computed and published
    Updated(ThroughputSample),
    /// The baseline was replaced and no rate was published
    Reseeded,
    /// No time elapsed since the baseline; nothing changed
    Skipped,
}

/// `delta_bytes * 8 / elapsed_secs`
pub fn bits_per_second(delta_bytes: u64, elapsed_secs: f64) -> f64 {
    (delta_bytes as f64 * 8.0) / elapsed_secs
}

/// Converts successive counter readings into throughput.
///
/// Keeps exactly one prior reading. Counters that go backwards, or a change
/// of scope, replace that reading without publishing a rate.
#[derive(Debug, Clone)]
pub struct RateSampler {
    baseline: Option<CounterSnapshot>,
    ceiling_bps: f64,
}

impl RateSampler {
    pub fn new(ceiling_bps: f64) -> Self {
        Self {
            baseline: None,
            ceiling_bps,
        }
    }

    /// Start from a reading taken before the loop begins
    pub fn seeded(ceiling_bps: f64, baseline: CounterSnapshot) -> Self {
        Self {
            baseline: Some(baseline),
            ceiling_bps,
        }
    }

    pub fn baseline(&self) -> Option<&CounterSnapshot> {
        self.baseline.as_ref()
    }

    fn reseed(&mut self, scope: NetworkScope, counters: ByteCounters, now: Instant) {
        self.baseline = Some(CounterSnapshot {
            counters,
            scope,
            taken_at: now,
        });
    }

    /// Implausible or non-finite rates are discarded entirely, not saturated
    fn sanitize(&self, rate: f64, direction: &str) -> f64 {
        if !rate.is_finite() || rate > self.ceiling_bps {
            warn!(direction, rate_bps = rate, "Abnormally high {} speed detected", direction);
            return 0.0;
        }
        rate
    }

    /// Diff `counters` against the baseline
    pub fn observe(
        &mut self,
        scope: NetworkScope,
        counters: ByteCounters,
        now: Instant,
    ) -> CycleOutcome {
        let Some(baseline) = &self.baseline else {
            self.reseed(scope, counters, now);
            return CycleOutcome::Reseeded;
        };

        if baseline.scope != scope {
            debug!(
                from = %baseline.scope,
                to = %scope,
                "network scope changed, reseeding baseline"
            );
            self.reseed(scope, counters, now);
            return CycleOutcome::Reseeded;
        }

        let elapsed = now.saturating_duration_since(baseline.taken_at);
        if elapsed.is_zero() {
            return CycleOutcome::Skipped;
        }

        let previous = baseline.counters;
        if counters.is_reset_from(&previous) {
            warn!(
                previous_received = previous.bytes_received,
                previous_sent = previous.bytes_sent,
                received = counters.bytes_received,
                sent = counters.bytes_sent,
                "Network counter reset detected"
            );
            self.reseed(scope, counters, now);
            return CycleOutcome::Reseeded;
        }

        let delta_received = counters.bytes_received - previous.bytes_received;
        let delta_sent = counters.bytes_sent - previous.bytes_sent;
        let elapsed_secs = elapsed.as_secs_f64();

        debug!(elapsed_secs, delta_received, delta_sent, "counter deltas");

        let sample = ThroughputSample {
            download_bps: self.sanitize(bits_per_second(delta_received, elapsed_secs), "download"),
            upload_bps: self.sanitize(bits_per_second(delta_sent, elapsed_secs), "upload"),
        };

        if tracing::enabled!(tracing::Level::DEBUG) {
            let (down, down_unit) = format_speed(sample.download_bps, SpeedUnit::Auto);
            let (up, up_unit) = format_speed(sample.upload_bps, SpeedUnit::Auto);
            debug!("Download: {} {}, Upload: {} {}", down, down_unit, up, up_unit);
        }

        self.reseed(scope, counters, now);
        CycleOutcome::Updated(sample)
    }

    /// Read the source, resolve the selection, and publish the result
    pub fn cycle(
        &mut self,
        source: &dyn NetworkSource,
        selector: &InterfaceSelector,
        store: &TelemetryStore,
        now: Instant,
    ) -> Result<CycleOutcome> {
        let per_interface = source.interface_counters()?;
        let names: Vec<String> = per_interface.keys().cloned().collect();
        debug!(interfaces = ?names, "active interfaces");
        store.write_interfaces(names);

        let (scope, counters) = selector.resolve(&per_interface);
        let outcome = self.observe(scope.clone(), counters, now);

        match outcome {
            CycleOutcome::Updated(sample) => store.write_throughput(sample, scope),
            CycleOutcome::Reseeded | CycleOutcome::Skipped => store.write_scope(scope),
        }

        Ok(outcome)
    }

    /// Sample until `running` is cleared.
    ///
    /// Transient failures skip the cycle and back off; any other error ends the loop.
    pub fn run(
        mut self,
        source: Arc<dyn NetworkSource>,
        selector: Arc<InterfaceSelector>,
        store: Arc<TelemetryStore>,
        running: Arc<AtomicBool>,
        config: SamplerConfig,
    ) {
        info!(interval_ms = config.rate_interval_ms, "rate sampler started");

        while running.load(Ordering::Acquire) {
            if !sleep_while_running(&running, config.rate_interval()) {
                break;
            }

            if let Err(e) = self.cycle(source.as_ref(), &selector, &store, Instant::now()) {
                if !e.is_transient() {
                    error!(error = %e, "rate sampler cannot continue");
                    break;
                }
                error!(error = %e, "Error getting network stats");
                sleep_while_running(&running, config.error_backoff());
            }
        }

        info!("rate sampler stopped");
    }
}

/// Sleep for `duration` in short slices, returning `false` as soon as
/// `running` is cleared.
pub(crate) fn sleep_while_running(running: &AtomicBool, duration: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if !running.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(SLEEP_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::source::fake::{interfaces, FakeNetworkSource};

    fn seeded_at(rx: u64, tx: u64, at: Instant) -> RateSampler {
        RateSampler::seeded(
            1e12,
            CounterSnapshot {
                counters: ByteCounters::new(rx, tx),
                scope: NetworkScope::AllInterfaces,
                taken_at: at,
            },
        )
    }

    #[test]
    fn test_rate_from_deltas() {
        let t0 = Instant::now();
        let mut sampler = seeded_at(1000, 500, t0);

        let outcome = sampler.observe(
            NetworkScope::AllInterfaces,
            ByteCounters::new(3000, 1500),
            t0 + Duration::from_secs(1),
        );

        assert_eq!(
            outcome,
            CycleOutcome::Updated(ThroughputSample {
                download_bps: 16000.0,
                upload_bps: 8000.0,
            })
        );
    }

    #[test]
    fn test_rate_formula_is_exact() {
        let t0 = Instant::now();
        for (delta, millis) in [(1u64, 500u64), (12_345, 250), (987_654_321, 1_500), (0, 700)] {
            let mut sampler = seeded_at(10, 10, t0);
            let elapsed = Duration::from_millis(millis);
            let outcome = sampler.observe(
                NetworkScope::AllInterfaces,
                ByteCounters::new(10 + delta, 10 + delta),
                t0 + elapsed,
            );
            let expected = delta as f64 * 8.0 / elapsed.as_secs_f64();
            match outcome {
                CycleOutcome::Updated(sample) => {
                    assert_eq!(sample.download_bps, expected);
                    assert_eq!(sample.upload_bps, expected);
                }
                other => panic!("unexpected outcome {:?}", other),
            }
        }
    }

    #[test]
    fn test_counter_reset_reseeds_without_publishing() {
        let t0 = Instant::now();
        let mut sampler = seeded_at(5000, 5000, t0);
        let t1 = t0 + Duration::from_millis(500);

        let outcome =
            sampler.observe(NetworkScope::AllInterfaces, ByteCounters::new(4000, 5000), t1);

        assert_eq!(outcome, CycleOutcome::Reseeded);
        let baseline = sampler.baseline().unwrap();
        assert_eq!(baseline.counters, ByteCounters::new(4000, 5000));
        assert_eq!(baseline.taken_at, t1);
    }

    #[test]
    fn test_sent_counter_reset_also_detected() {
        let t0 = Instant::now();
        let mut sampler = seeded_at(5000, 5000, t0);
        let outcome = sampler.observe(
            NetworkScope::AllInterfaces,
            ByteCounters::new(9000, 10),
            t0 + Duration::from_secs(1),
        );
        assert_eq!(outcome, CycleOutcome::Reseeded);
    }

    #[test]
    fn test_rate_above_ceiling_stored_as_zero() {
        let t0 = Instant::now();
        let mut sampler = seeded_at(0, 0, t0);

        // 200 GB in one second is 1.6 Tbps download; upload stays plausible
        let outcome = sampler.observe(
            NetworkScope::AllInterfaces,
            ByteCounters::new(200_000_000_000, 1000),
            t0 + Duration::from_secs(1),
        );

        assert_eq!(
            outcome,
            CycleOutcome::Updated(ThroughputSample {
                download_bps: 0.0,
                upload_bps: 8000.0,
            })
        );
    }

    #[test]
    fn test_zero_elapsed_skips_and_keeps_baseline() {
        let t0 = Instant::now();
        let mut sampler = seeded_at(100, 100, t0);

        let outcome = sampler.observe(NetworkScope::AllInterfaces, ByteCounters::new(500, 500), t0);

        assert_eq!(outcome, CycleOutcome::Skipped);
        assert_eq!(sampler.baseline().unwrap().counters, ByteCounters::new(100, 100));
    }

    #[test]
    fn test_scope_change_reseeds() {
        let t0 = Instant::now();
        let mut sampler = seeded_at(10_000, 10_000, t0);

        let outcome = sampler.observe(
            NetworkScope::Interface("eth0".to_string()),
            ByteCounters::new(20_000, 20_000),
            t0 + Duration::from_secs(1),
        );

        assert_eq!(outcome, CycleOutcome::Reseeded);
        assert_eq!(
            sampler.baseline().unwrap().scope,
            NetworkScope::Interface("eth0".to_string())
        );
    }

    #[test]
    fn test_first_observation_only_seeds() {
        let mut sampler = RateSampler::new(1e12);
        let outcome =
            sampler.observe(NetworkScope::AllInterfaces, ByteCounters::new(1, 1), Instant::now());
        assert_eq!(outcome, CycleOutcome::Reseeded);
        assert!(sampler.baseline().is_some());
    }

    #[test]
    fn test_cycle_reset_leaves_store_unchanged() {
        let t0 = Instant::now();
        let source = FakeNetworkSource::new(vec![
            Ok(interfaces(&[("eth0", 3000, 1500)])),
            Ok(interfaces(&[("eth0", 2000, 1500)])),
        ]);
        let selector = InterfaceSelector::new(None, "lo");
        let store = TelemetryStore::new(1);
        let mut sampler = seeded_at(1000, 500, t0);

        sampler
            .cycle(&source, &selector, &store, t0 + Duration::from_secs(1))
            .unwrap();
        let published = store.throughput();
        assert_eq!(published.download_bps, 16000.0);

        let outcome = sampler
            .cycle(&source, &selector, &store, t0 + Duration::from_secs(2))
            .unwrap();
        assert_eq!(outcome, CycleOutcome::Reseeded);
        assert_eq!(store.throughput(), published);
        assert_eq!(sampler.baseline().unwrap().counters, ByteCounters::new(2000, 1500));
    }

    #[test]
    fn test_cycle_missing_interface_uses_aggregate() {
        let t0 = Instant::now();
        let source =
            FakeNetworkSource::steady(interfaces(&[("lo", 100, 100), ("wlan0", 900, 400)]));
        let selector = InterfaceSelector::new(Some("eth0".to_string()), "lo");
        let store = TelemetryStore::new(1);
        let mut sampler = seeded_at(0, 0, t0);

        let outcome = sampler
            .cycle(&source, &selector, &store, t0 + Duration::from_secs(1))
            .unwrap();

        assert_eq!(store.scope().to_string(), "Monitoring all interfaces");
        assert_eq!(
            outcome,
            CycleOutcome::Updated(ThroughputSample {
                download_bps: 8000.0,
                upload_bps: 4000.0,
            })
        );
    }

    #[test]
    fn test_cycle_selected_interface() {
        let t0 = Instant::now();
        let source = FakeNetworkSource::new(vec![
            Ok(interfaces(&[("eth0", 1000, 1000), ("wlan0", 50, 50)])),
            Ok(interfaces(&[("eth0", 2000, 1500), ("wlan0", 90_000, 90_000)])),
        ]);
        let selector = InterfaceSelector::new(Some("eth0".to_string()), "lo");
        let store = TelemetryStore::new(1);
        let mut sampler = RateSampler::new(1e12);

        sampler.cycle(&source, &selector, &store, t0).unwrap();
        sampler
            .cycle(&source, &selector, &store, t0 + Duration::from_secs(2))
            .unwrap();

        assert_eq!(store.scope().to_string(), "Monitoring eth0");
        assert_eq!(store.throughput().download_bps, 4000.0);
        assert_eq!(store.throughput().upload_bps, 2000.0);
        assert_eq!(store.interfaces(), vec!["eth0", "wlan0"]);
    }

    #[test]
    fn test_cycle_read_error_propagates_and_keeps_state() {
        let t0 = Instant::now();
        let source = FakeNetworkSource::new(vec![Err(CoreError::counters("adapter gone"))]);
        let selector = InterfaceSelector::new(None, "lo");
        let store = TelemetryStore::new(1);
        let mut sampler = seeded_at(10, 10, t0);

        assert!(sampler
            .cycle(&source, &selector, &store, t0 + Duration::from_secs(1))
            .is_err());
        assert_eq!(sampler.baseline().unwrap().counters, ByteCounters::new(10, 10));
        assert_eq!(store.throughput(), ThroughputSample::default());
    }

    fn spawn_run(
        source: Arc<FakeNetworkSource>,
        running: Arc<AtomicBool>,
        config: SamplerConfig,
    ) -> thread::JoinHandle<()> {
        let selector = Arc::new(InterfaceSelector::new(None, "lo"));
        let store = Arc::new(TelemetryStore::new(1));
        thread::spawn(move || RateSampler::new(1e12).run(source, selector, store, running, config))
    }

    fn finishes_within(handle: &thread::JoinHandle<()>, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(5));
        }
        true
    }

    #[test]
    fn test_long_interval_still_stops_promptly() {
        let source = Arc::new(FakeNetworkSource::steady(interfaces(&[("eth0", 1, 1)])));
        let running = Arc::new(AtomicBool::new(true));
        let config = SamplerConfig {
            rate_interval_ms: 10_000,
            ..SamplerConfig::default()
        };

        let handle = spawn_run(Arc::clone(&source), Arc::clone(&running), config);
        thread::sleep(Duration::from_millis(30));
        running.store(false, Ordering::Release);

        assert!(finishes_within(&handle, Duration::from_millis(500)));
        assert_eq!(source.reads(), 0);
    }

    #[test]
    fn test_non_transient_error_ends_loop() {
        let source = Arc::new(FakeNetworkSource::new(Vec::new()));
        source.push(Err(CoreError::config("interface table unreadable")));
        let running = Arc::new(AtomicBool::new(true));
        let config = SamplerConfig {
            rate_interval_ms: 10,
            ..SamplerConfig::default()
        };

        let handle = spawn_run(Arc::clone(&source), Arc::clone(&running), config);

        assert!(finishes_within(&handle, Duration::from_secs(2)));
        assert!(running.load(Ordering::Acquire));
        assert_eq!(source.reads(), 1);
    }

    #[test]
    fn test_transient_error_keeps_loop_alive() {
        let source = Arc::new(FakeNetworkSource::new(Vec::new()));
        source.push(Err(CoreError::counters("adapter gone")));
        source.push(Ok(interfaces(&[("eth0", 10, 10)])));
        let running = Arc::new(AtomicBool::new(true));
        let config = SamplerConfig {
            rate_interval_ms: 10,
            error_backoff_ms: 10,
            ..SamplerConfig::default()
        };

        let handle = spawn_run(Arc::clone(&source), Arc::clone(&running), config);
        let deadline = Instant::now() + Duration::from_secs(2);
        while source.reads() < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!handle.is_finished());

        running.store(false, Ordering::Release);
        assert!(finishes_within(&handle, Duration::from_secs(1)));
        assert!(source.reads() >= 3);
    }

    #[test]
    fn test_sleep_while_running_returns_early() {
        let running = AtomicBool::new(false);
        let started = Instant::now();
        assert!(!sleep_while_running(&running, Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_millis(100));

        running.store(true, Ordering::Release);
        assert!(sleep_while_running(&running, Duration::from_millis(20)));
    }
}
