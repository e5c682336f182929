use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

/// Unit used when displaying throughput
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedUnit {
    /// Pick the largest unit that keeps the value above 1
    #[default]
    Auto,
    Bytes,
    Kbps,
    Mbps,
    Gbps,
}

impl SpeedUnit {
    pub fn next(self) -> Self {
        match self {
            Self::Auto => Self::Bytes,
            Self::Bytes => Self::Kbps,
            Self::Kbps => Self::Mbps,
            Self::Mbps => Self::Gbps,
            Self::Gbps => Self::Auto,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Bytes => "bytes",
            Self::Kbps => "kbps",
            Self::Mbps => "mbps",
            Self::Gbps => "gbps",
        }
    }
}

impl FromStr for SpeedUnit {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" | "none" => Ok(Self::Auto),
            "bytes" | "b" => Ok(Self::Bytes),
            "kbps" => Ok(Self::Kbps),
            "mbps" => Ok(Self::Mbps),
            "gbps" => Ok(Self::Gbps),
            other => Err(CoreError::config(format!("Unknown speed unit: {}", other))),
        }
    }
}

/// Format a bits-per-second rate as a byte rate, returning the number and its label.
///
/// The rate is shown in bytes per second with decimal prefixes: whole bytes,
/// one decimal for KB/s and MB/s, two decimals for GB/s.
pub fn format_speed(speed_bps: f64, unit: SpeedUnit) -> (String, &'static str) {
    let bytes_per_sec = speed_bps / 8.0;

    let unit = match unit {
        SpeedUnit::Auto if bytes_per_sec < 1_000.0 => SpeedUnit::Bytes,
        SpeedUnit::Auto if bytes_per_sec < 1_000_000.0 => SpeedUnit::Kbps,
        SpeedUnit::Auto if bytes_per_sec < 1_000_000_000.0 => SpeedUnit::Mbps,
        SpeedUnit::Auto => SpeedUnit::Gbps,
        forced => forced,
    };

    match unit {
        SpeedUnit::Kbps => (format!("{:.1}", bytes_per_sec / 1_000.0), "KB/s"),
        SpeedUnit::Mbps => (format!("{:.1}", bytes_per_sec / 1_000_000.0), "MB/s"),
        SpeedUnit::Gbps => (format!("{:.2}", bytes_per_sec / 1_000_000_000.0), "GB/s"),
        _ => (format!("{:.0}", bytes_per_sec), "B/s"),
    }
}

/// Render a byte count in binary gigabytes with one decimal
pub fn format_gib(bytes: u64) -> String {
    format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
}
