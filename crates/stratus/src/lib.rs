//! Facade crate for stratus.
//! Re-exports the event bus, configuration models and host bootstrap.
//! Keep this crate thin: it should compose other crates, not implement dispatch logic.
//!
//! ## Usage
//! ```rust
//! use stratus::prelude::*;
//!
//! struct Ping;
//!
//! let host = Host::new(StratusConfig::default()).unwrap();
//! let bus = host.bus();
//! let owner = bus.create_owner();
//! bus.connect_fn(ReceiverId::new(1), owner, |_: &Ping| {});
//! bus.dispatch(ReceiverId::new(1), Ping);
//! ```

pub use stratus_domain as domain;
pub use stratus_event_bus as events;
pub use stratus_kernel as kernel;
#[cfg(feature = "logging")]
pub use stratus_logger as logger;

pub mod prelude {
    pub use stratus_domain::config::{BusConfig, StratusConfig};
    pub use stratus_event_bus::{
        Delivery, Event, EventBus, EventBusError, Handler, Hierarchy, OwnerId, ReceiverId,
        SceneGraph,
    };
    pub use stratus_kernel::bootstrap::{BootstrapError, Host};
    pub use stratus_kernel::config::load_config;
}

/// Build-time enabled features (by Cargo feature).
pub const ENABLED: &[&str] = &[
    #[cfg(feature = "logging")]
    "logging",
];

#[must_use]
pub fn is_enabled(name: &str) -> bool {
    ENABLED.contains(&name)
}
