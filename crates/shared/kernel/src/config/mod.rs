use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Prefix of environment overrides, e.g. `STRATUS__BUS__STRICT_RECEIVERS=true`.
pub const ENV_PREFIX: &str = "STRATUS";
/// Separator between the prefix and nested keys.
pub const ENV_SEPARATOR: &str = "__";
/// File stem used when no path is given; the extension picks the format.
pub const DEFAULT_CONFIG_PATH: &str = "stratus";

/// Custom error type for config loading.
#[stratus_derive::stratus_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Layered configuration source: an optional or required file, then environment overrides.
///
/// # Example
/// ```rust
/// use stratus_kernel::config::ConfigLoader;
/// use stratus_kernel::domain::config::StratusConfig;
/// use std::collections::HashMap;
///
/// let env = HashMap::from([("STRATUS__BUS__DEFERRED_CAPACITY".to_owned(), "64".to_owned())]);
/// let cfg: StratusConfig = ConfigLoader::new("does-not-exist")
///     .optional()
///     .env_source(env)
///     .load()
///     .unwrap();
/// assert_eq!(cfg.bus.deferred_capacity, 64);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
    required: bool,
    env: Option<HashMap<String, String>>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_PATH)
    }
}

impl ConfigLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf(), required: true, env: None }
    }

    /// Missing files fall back to the target's serde defaults.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Reads overrides from `vars` instead of the process environment.
    #[must_use]
    pub fn env_source(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    /// Builds and deserializes the layered configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError::Config`] if a required file is missing, a source cannot be
    /// parsed, or the merged document does not match `T`.
    pub fn load<T: DeserializeOwned>(self) -> Result<T, ConfigError> {
        info!(path = %self.path.display(), required = self.required, "Loading config");

        let environment = Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
            .source(self.env.map(|vars| vars.into_iter().collect()));

        let config = Config::builder()
            .add_source(File::from(self.path.as_path()).required(self.required))
            .add_source(environment)
            .build()
            .context("Failed to build config")?;
        debug!("Config sources merged");

        config.try_deserialize::<T>().context("Failed to deserialize config")
    }
}

/// A reusable configuration loader that combines file-based settings with environment overrides.
///
/// This function implements a layered configuration strategy:
/// 1. **Base File**: Loads settings from a file (e.g., `stratus.toml`). If no path is provided, it defaults to `"stratus"`.
/// 2. **Environment Overrides**: Overlays values from environment variables prefixed with `STRATUS__`.
///    Nested structures are accessed using double underscores (e.g., `STRATUS__ARENA__FRAMES` maps to `arena.frames`).
///
/// # Errors
/// This function will return an error if:
/// * The specified (or default) configuration file cannot be found.
/// * The content of the file does not match the structure of type `T`.
///
/// # Example
/// ```rust
/// use stratus_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     frames: u64,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    path.map_or_else(ConfigLoader::default, ConfigLoader::new).load()
}
