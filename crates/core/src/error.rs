use thiserror::Error;

/// Core errors for the sampler
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Counter source error: {0}")]
    CounterSource(String),

    #[error("Process information error: {0}")]
    ProcessInfo(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Platform-specific error: {0}")]
    Platform(String),

    #[error("Startup failed: {0}")]
    Startup(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(all(target_os = "linux", feature = "linux_procfs"))]
    #[error("Procfs error: {0}")]
    Procfs(#[from] procfs::ProcError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn counters<S: Into<String>>(msg: S) -> Self {
        Self::CounterSource(msg.into())
    }

    pub fn process_info<S: Into<String>>(msg: S) -> Self {
        Self::ProcessInfo(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    pub fn platform<S: Into<String>>(msg: S) -> Self {
        Self::Platform(msg.into())
    }

    pub fn startup<S: Into<String>>(msg: S) -> Self {
        Self::Startup(msg.into())
    }

    /// Whether a sampler loop may recover from this error by skipping a cycle.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Startup(_) | Self::Config(_))
    }
}
