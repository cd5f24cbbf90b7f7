use crate::config::ConfigError;
use std::borrow::Cow;
use stratus_domain::config::{LogRotation, LoggingConfig, StratusConfig};
use stratus_event_bus::{EventBus, EventBusError};
use stratus_logger::{Logger, LoggerError, Rotation, parse_level};
use tracing::{debug, info};

#[stratus_derive::stratus_error]
pub enum BootstrapError {
    #[error("Configuration failed{}: {source}", format_context(.context))]
    Config { source: ConfigError, context: Option<Cow<'static, str>> },

    #[error("Logger setup failed{}: {source}", format_context(.context))]
    Logger { source: LoggerError, context: Option<Cow<'static, str>> },

    #[error("Event bus setup failed{}: {source}", format_context(.context))]
    Bus { source: EventBusError, context: Option<Cow<'static, str>> },
}

/// Constructs the event bus described by `config.bus`.
///
/// # Errors
/// Returns [`EventBusError::InvalidCapacity`] for a zero deferred capacity.
pub fn build_bus(config: &StratusConfig) -> Result<EventBus, EventBusError> {
    EventBus::with_config(&config.bus)
}

/// Installs the global subscriber described by `config`.
///
/// # Errors
/// Returns [`LoggerError::InvalidConfiguration`] for unknown levels or filters and
/// [`LoggerError::Subscriber`] if a subscriber is already installed.
pub fn init_logging(name: &str, config: &LoggingConfig) -> Result<Logger, LoggerError> {
    let level = stratus_logger::LoggerErrorExt::context(parse_level(&config.level), "logging.level")?;
    let builder = Logger::builder().name(name).level(level).console(config.console).json(config.json);
    let builder = match &config.filter {
        Some(filter) => builder.env_filter(filter.as_str()),
        None => builder,
    };

    match &config.directory {
        Some(directory) => builder
            .path(directory)
            .rotation(rotation_of(config.rotation))
            .max_files(config.max_files)
            .init(),
        None => builder.init(),
    }
}

fn rotation_of(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Minutely => Rotation::MINUTELY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    }
}

/// Everything a frame-driven host needs: configuration, the bus and, optionally, logging.
///
/// Dropping the host shuts the bus down.
#[derive(Debug)]
pub struct Host {
    config: StratusConfig,
    bus: EventBus,
    logger: Option<Logger>,
}

impl Host {
    /// Builds the bus without touching global logging state.
    ///
    /// # Errors
    /// Returns [`BootstrapError::Bus`] if the bus configuration is invalid.
    pub fn new(config: StratusConfig) -> Result<Self, BootstrapError> {
        let bus = build_bus(&config).context("bus")?;
        debug!(strict = bus.is_strict(), "Host bus ready");
        Ok(Self { config, bus, logger: None })
    }

    /// Installs the global subscriber from `logging` settings.
    ///
    /// # Errors
    /// Returns [`BootstrapError::Logger`] if the subscriber cannot be installed.
    pub fn with_logging(mut self, name: &str) -> Result<Self, BootstrapError> {
        let logger = init_logging(name, &self.config.logging).context("logging")?;
        info!(host = name, files = logger.writes_files(), "Logging initialized");
        self.logger = Some(logger);
        Ok(self)
    }

    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub const fn config(&self) -> &StratusConfig {
        &self.config
    }

    /// Shuts the bus down. Returns the number of receivers that were registered.
    pub fn shutdown(&self) -> usize {
        self.bus.shutdown()
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.bus.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_mapping_covers_every_variant() {
        assert_eq!(rotation_of(LogRotation::Minutely), Rotation::MINUTELY);
        assert_eq!(rotation_of(LogRotation::Hourly), Rotation::HOURLY);
        assert_eq!(rotation_of(LogRotation::Daily), Rotation::DAILY);
        assert_eq!(rotation_of(LogRotation::Never), Rotation::NEVER);
    }

    #[test]
    fn invalid_level_is_reported_with_context() {
        let config = LoggingConfig { level: "loud".to_owned(), ..LoggingConfig::default() };
        let err = init_logging("kernel-test", &config).unwrap_err();
        assert_eq!(err.kind(), "InvalidConfiguration");
        assert_eq!(err.context_str(), Some("logging.level"));
    }

    #[test]
    fn host_rejects_zero_capacity() {
        let mut config = StratusConfig::default();
        config.bus.deferred_capacity = 0;
        let err = Host::new(config).unwrap_err();
        assert!(matches!(err, BootstrapError::Bus { source: EventBusError::InvalidCapacity { .. }, .. }));
    }

    #[test]
    fn dropping_host_shuts_bus_down() {
        let host = Host::new(StratusConfig::default()).unwrap();
        let bus = host.bus().clone();
        drop(host);
        assert!(bus.is_shutting_down());
    }
}
