use crate::{error::{CoreError, Result}, units::SpeedUnit};
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use tracing::warn;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Settings consumed by the samplers
    pub sampler: SamplerConfig,

    /// Settings consumed by the presentation layer
    pub display: DisplayConfig,
}

/// Sampler settings, handed to the monitor at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Rate sampler cycle interval in milliseconds
    pub rate_interval_ms: u64,

    /// Measurement window of the platform CPU tiers
    pub cpu_window_ms: u64,

    /// Measurement window of the portable CPU tier
    pub fallback_cpu_window_ms: u64,

    /// Delay between the two process accounting passes
    pub process_settle_ms: u64,

    /// Pause between system stats cycles
    pub stats_yield_ms: u64,

    /// Pause after a failed rate cycle
    pub error_backoff_ms: u64,

    /// Pause after a system stats cycle that panicked
    pub stats_error_backoff_ms: u64,

    /// How long `stop()` waits for each sampler thread
    pub shutdown_timeout_ms: u64,

    /// Rates above this many bits per second are discarded as glitches
    pub sanity_ceiling_bps: f64,

    /// Maximum number of top CPU consumers reported
    pub top_process_limit: usize,

    /// Processes at or below this CPU share are not reported
    pub top_process_min_percent: f32,

    /// Interfaces whose name starts with this prefix are not offered for selection
    pub loopback_prefix: String,

    /// Interface selected at startup; `None` aggregates all interfaces
    pub interface: Option<String>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            rate_interval_ms: 500,
            cpu_window_ms: 500,
            fallback_cpu_window_ms: 100,
            process_settle_ms: 20,
            stats_yield_ms: 20,
            error_backoff_ms: 500,
            stats_error_backoff_ms: 100,
            shutdown_timeout_ms: 2000,
            sanity_ceiling_bps: 1e12,
            top_process_limit: 3,
            top_process_min_percent: 0.5,
            loopback_prefix: "lo".to_string(),
            interface: None,
        }
    }
}

impl SamplerConfig {
    pub fn rate_interval(&self) -> Duration {
        Duration::from_millis(self.rate_interval_ms)
    }

    pub fn cpu_window(&self) -> Duration {
        Duration::from_millis(self.cpu_window_ms)
    }

    pub fn fallback_cpu_window(&self) -> Duration {
        Duration::from_millis(self.fallback_cpu_window_ms)
    }

    pub fn process_settle(&self) -> Duration {
        Duration::from_millis(self.process_settle_ms)
    }

    pub fn stats_yield(&self) -> Duration {
        Duration::from_millis(self.stats_yield_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn stats_error_backoff(&self) -> Duration {
        Duration::from_millis(self.stats_error_backoff_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.rate_interval_ms < 50 {
            return Err(CoreError::config("Update interval must be at least 50ms"));
        }

        if self.rate_interval_ms > 10000 {
            return Err(CoreError::config("Update interval must be at most 10 seconds"));
        }

        if self.cpu_window_ms == 0 || self.fallback_cpu_window_ms == 0 {
            return Err(CoreError::config("CPU measurement windows must be non-zero"));
        }

        if !(self.sanity_ceiling_bps > 0.0) {
            return Err(CoreError::config(
                "Sanity ceiling must be a positive number of bits per second",
            ));
        }

        if self.top_process_limit == 0 {
            return Err(CoreError::config("Top process limit must be at least 1"));
        }

        Ok(())
    }
}

/// Presentation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Display timer in milliseconds
    pub refresh_ms: u64,

    /// Unit for throughput figures
    pub speed_unit: SpeedUnit,

    /// Show the CPU/RAM panel
    pub show_system_stats: bool,

    /// Number of throughput samples kept for the sparklines
    pub history_len: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_ms: 200,
            speed_unit: SpeedUnit::Auto,
            show_system_stats: true,
            history_len: 60,
        }
    }
}

impl DisplayConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }
}

impl Config {
    /// Load configuration from multiple sources in order of preference:
    /// 1. CLI arguments override everything
    /// 2. JSON config file if specified
    /// 3. Default config file locations
    /// 4. Built-in defaults
    pub fn load(cli_config: Option<&CliConfig>, json_path: Option<&Path>) -> Result<Self> {
        let mut config = match json_path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_default_config().unwrap_or_default(),
        };

        if let Some(cli) = cli_config {
            config.apply_cli_overrides(cli);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            CoreError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            CoreError::config(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        Ok(config)
    }

    /// Write configuration as pretty JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Apply `update` to the file at `path` and write it back.
    ///
    /// Only what is stored in the file is rewritten, so command-line overrides
    /// of the running session are not persisted. A missing file starts from
    /// the defaults.
    pub fn update_file(path: &Path, update: impl FnOnce(&mut Config)) -> Result<()> {
        let mut config = if path.exists() {
            Self::load_from_file(path)?
        } else {
            Self::default()
        };
        update(&mut config);
        config.save_to_file(path)
    }

    /// Where runtime setting changes are saved: the explicit file if given,
    /// otherwise the first existing default location, otherwise the first
    /// default location.
    pub fn settings_path(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }

        let defaults = Self::default_config_paths();
        defaults
            .iter()
            .find(|path| path.exists())
            .or_else(|| defaults.first())
            .cloned()
    }

    /// First readable config file from the default locations
    fn load_default_config() -> Option<Self> {
        for path in Self::default_config_paths() {
            if !path.exists() {
                continue;
            }
            match Self::load_from_file(&path) {
                Ok(config) => return Some(config),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable config file")
                }
            }
        }

        None
    }

    /// Get default configuration file search paths
    pub fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("bitmeter").join("config.json"));
        }

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".bitmeter.json"));
        }

        paths.push(PathBuf::from("bitmeter.json"));

        paths
    }

    /// Apply CLI argument overrides
    fn apply_cli_overrides(&mut self, cli: &CliConfig) {
        if let Some(interval) = cli.interval_ms {
            self.sampler.rate_interval_ms = interval;
        }
        if let Some(interface) = &cli.interface {
            self.sampler.interface = Some(interface.clone());
        }
        if let Some(unit) = cli.speed_unit {
            self.display.speed_unit = unit;
        }
        if cli.no_system_stats {
            self.display.show_system_stats = false;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.sampler.validate()?;

        if self.display.refresh_ms == 0 {
            return Err(CoreError::config("Display refresh must be non-zero"));
        }

        if self.display.history_len < 2 {
            return Err(CoreError::config("History must hold at least 2 samples"));
        }

        Ok(())
    }
}

/// CLI configuration (temporary struct for CLI parsing)
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub interval_ms: Option<u64>,
    pub interface: Option<String>,
    pub speed_unit: Option<SpeedUnit>,
    pub no_system_stats: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sampler.rate_interval(), Duration::from_millis(500));
        assert_eq!(config.sampler.top_process_limit, 3);
        assert_eq!(config.sampler.sanity_ceiling_bps, 1e12);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"sampler": {"rate_interval_ms": 1000}, "display": {"speed_unit": "mbps"}}"#,
        )
        .unwrap();

        let config = Config::load(None, Some(&path)).unwrap();
        assert_eq!(config.sampler.rate_interval_ms, 1000);
        assert_eq!(config.sampler.cpu_window_ms, 500);
        assert_eq!(config.display.speed_unit, SpeedUnit::Mbps);
        assert!(config.display.show_system_stats);
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"sampler": {"interface": "wlan0"}}"#).unwrap();

        let cli = CliConfig {
            interval_ms: Some(250),
            interface: Some("eth0".to_string()),
            speed_unit: None,
            no_system_stats: true,
        };
        let config = Config::load(Some(&cli), Some(&path)).unwrap();
        assert_eq!(config.sampler.rate_interval_ms, 250);
        assert_eq!(config.sampler.interface.as_deref(), Some("eth0"));
        assert!(!config.display.show_system_stats);
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let cli = CliConfig {
            interval_ms: Some(10),
            ..CliConfig::default()
        };
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{}").unwrap();

        let err = Config::load(Some(&cli), Some(&path)).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert!(Config::load(None, Some(&path)).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::default();
        config.sampler.interface = Some("eth1".to_string());
        config.display.history_len = 120;
        config.save_to_file(&path).unwrap();

        assert_eq!(Config::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_update_file_keeps_other_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"sampler": {"interface": "wlan0"}}"#).unwrap();

        Config::update_file(&path, |c| c.display.speed_unit = SpeedUnit::Gbps).unwrap();

        let saved = Config::load_from_file(&path).unwrap();
        assert_eq!(saved.display.speed_unit, SpeedUnit::Gbps);
        assert_eq!(saved.sampler.interface.as_deref(), Some("wlan0"));
    }

    #[test]
    fn test_update_file_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bitmeter").join("config.json");

        Config::update_file(&path, |c| c.display.show_system_stats = false).unwrap();

        let saved = Config::load_from_file(&path).unwrap();
        assert!(!saved.display.show_system_stats);
        assert_eq!(saved.sampler, SamplerConfig::default());
    }

    #[test]
    fn test_settings_path_prefers_explicit_file() {
        let explicit = PathBuf::from("/tmp/custom-bitmeter.json");
        assert_eq!(Config::settings_path(Some(&explicit)), Some(explicit));
        assert!(Config::settings_path(None).is_some());
    }
}
