pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod monitor;
pub mod platform;
pub mod rate;
pub mod selector;
pub mod source;
pub mod stats;
pub mod store;
pub mod units;

pub use config::{Config, DisplayConfig, SamplerConfig};
pub use error::{CoreError, Result};
pub use model::*;
pub use monitor::Monitor;
pub use platform::CpuStrategy;
pub use rate::{CycleOutcome, RateSampler};
pub use selector::InterfaceSelector;
pub use source::{NetworkSource, SystemSource};
pub use stats::SystemStatsSampler;
pub use store::TelemetryStore;
pub use units::{format_gib, format_speed, SpeedUnit};
