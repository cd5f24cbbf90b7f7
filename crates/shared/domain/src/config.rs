use serde::Deserialize;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Default bound on the number of dispatches waiting for the next tick.
pub const DEFAULT_DEFERRED_CAPACITY: usize = 1024;

/// Top-level configuration shared across the workspace.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StratusConfigInner {
    pub bus: BusConfig,
    pub logging: LoggingConfig,
    pub arena: ArenaConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct StratusConfig {
    #[serde(flatten, default)]
    inner: Arc<StratusConfigInner>,
}

impl Deref for StratusConfig {
    type Target = StratusConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for StratusConfig {
    fn deref_mut(&mut self) -> &mut StratusConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// Event bus behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// When set, receivers must be registered explicitly before they can be
    /// connected to or dispatched on.
    pub strict_receivers: bool,
    /// Maximum number of dispatches queued for the next tick.
    pub deferred_capacity: usize,
    /// Event type names to trace from startup (matched against the end of the type path).
    pub watch: Vec<String>,
}

/// Logging sinks and verbosity.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub console: bool,
    pub directory: Option<PathBuf>,
    pub json: bool,
    pub rotation: LogRotation,
    pub max_files: usize,
    pub filter: Option<String>,
}

/// How often file logs roll over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Minutely,
    Hourly,
    #[default]
    Daily,
    Never,
}

/// Demo host frame loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub frames: u64,
    pub frame_millis: u64,
    pub squad_size: usize,
    pub agent_health: u32,
    pub strike_damage: u32,
}

// --- Default ---

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            strict_receivers: false,
            deferred_capacity: DEFAULT_DEFERRED_CAPACITY,
            watch: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            console: true,
            directory: None,
            json: false,
            rotation: LogRotation::Daily,
            max_files: 10,
            filter: None,
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self { frames: 12, frame_millis: 16, squad_size: 3, agent_health: 30, strike_damage: 9 }
    }
}
