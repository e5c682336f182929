use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Instantaneous network throughput in bits per second
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThroughputSample {
    pub download_bps: f64,
    pub upload_bps: f64,
}

/// Cumulative byte counters of one interface, or of all interfaces combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteCounters {
    pub bytes_received: u64,
    pub bytes_sent: u64,
}

impl ByteCounters {
    pub fn new(bytes_received: u64, bytes_sent: u64) -> Self {
        Self {
            bytes_received,
            bytes_sent,
        }
    }

    /// Sum counters across interfaces, saturating instead of wrapping
    pub fn sum<'a, I>(counters: I) -> Self
    where
        I: IntoIterator<Item = &'a ByteCounters>,
    {
        counters.into_iter().fold(Self::default(), |acc, c| Self {
            bytes_received: acc.bytes_received.saturating_add(c.bytes_received),
            bytes_sent: acc.bytes_sent.saturating_add(c.bytes_sent),
        })
    }

    /// True when either counter went backwards relative to `previous`
    pub fn is_reset_from(&self, previous: &ByteCounters) -> bool {
        self.bytes_received < previous.bytes_received || self.bytes_sent < previous.bytes_sent
    }
}

/// Counters paired with the instant they were read; the rate sampler keeps one as its baseline
#[derive(Debug, Clone, PartialEq)]
pub struct CounterSnapshot {
    pub counters: ByteCounters,
    pub scope: NetworkScope,
    pub taken_at: Instant,
}

/// Which counters the rate sampler is reading
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkScope {
    #[default]
    AllInterfaces,
    Interface(String),
}

impl fmt::Display for NetworkScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllInterfaces => write!(f, "Monitoring all interfaces"),
            Self::Interface(name) => write!(f, "Monitoring {}", name),
        }
    }
}

/// Technique that produced the current CPU figure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonitoringMethod {
    PlatformHighPrecisionCounter,
    PlatformKernelTimeDelta,
    PortableSamplingFallback,
    /// Every tier failed in the last cycle
    #[default]
    Unavailable,
}

impl MonitoringMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlatformHighPrecisionCounter => "platform-high-precision-counter",
            Self::PlatformKernelTimeDelta => "platform-kernel-time-delta",
            Self::PortableSamplingFallback => "portable-sampling-fallback",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for MonitoringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RAM figures as reported by the counter source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub used: u64,
    pub total: u64,
}

/// CPU share of one process over the last accounting window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessUsage {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f32,
}

/// A top CPU consumer as shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProcess {
    pub cpu_percent: f32,
    pub name: String,
}

/// Latest CPU, RAM and top-process figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStats {
    pub cpu_percent: f32,
    pub cpu_per_core: Vec<f32>,
    pub ram_percent: f32,
    pub ram_used_bytes: u64,
    pub ram_total_bytes: u64,
    pub top_processes: Vec<TopProcess>,
    pub monitoring_method: MonitoringMethod,
}

impl SystemStats {
    /// Safe defaults used before the first cycle completes
    pub fn empty(core_count: usize) -> Self {
        Self {
            cpu_percent: 0.0,
            cpu_per_core: vec![0.0; core_count.max(1)],
            ram_percent: 0.0,
            ram_used_bytes: 0,
            ram_total_bytes: 1,
            top_processes: Vec::new(),
            monitoring_method: MonitoringMethod::Unavailable,
        }
    }
}

impl Default for SystemStats {
    fn default() -> Self {
        Self::empty(1)
    }
}

/// Everything a consumer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub throughput: ThroughputSample,
    pub scope: NetworkScope,
    pub system: SystemStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_display() {
        assert_eq!(
            NetworkScope::AllInterfaces.to_string(),
            "Monitoring all interfaces"
        );
        assert_eq!(
            NetworkScope::Interface("eth0".to_string()).to_string(),
            "Monitoring eth0"
        );
    }

    #[test]
    fn test_counter_sum_saturates() {
        let counters = [
            ByteCounters::new(u64::MAX - 1, 10),
            ByteCounters::new(5, 20),
        ];
        let total = ByteCounters::sum(counters.iter());
        assert_eq!(total.bytes_received, u64::MAX);
        assert_eq!(total.bytes_sent, 30);
    }

    #[test]
    fn test_reset_detection_either_direction() {
        let previous = ByteCounters::new(5000, 5000);
        assert!(ByteCounters::new(4000, 5000).is_reset_from(&previous));
        assert!(ByteCounters::new(5000, 4999).is_reset_from(&previous));
        assert!(!ByteCounters::new(5000, 5000).is_reset_from(&previous));
    }

    #[test]
    fn test_empty_stats_never_zero_total() {
        let stats = SystemStats::empty(0);
        assert_eq!(stats.ram_total_bytes, 1);
        assert_eq!(stats.cpu_per_core, vec![0.0]);
    }

    #[test]
    fn test_method_serializes_kebab_case() {
        let json = serde_json::to_string(&MonitoringMethod::PortableSamplingFallback).unwrap();
        assert_eq!(json, "\"portable-sampling-fallback\"");
    }
}
