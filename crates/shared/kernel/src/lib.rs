//! Kernel utilities shared by stratus hosts.
//! Keep this crate lightweight: it wires configuration, logging and the event bus together.
//!
//! ## Config loading
//! ```rust,no_run
//! use stratus_kernel::config::load_config;
//! use stratus_kernel::domain::config::StratusConfig;
//!
//! let cfg: StratusConfig = load_config(Some("stratus.toml")).unwrap_or_default();
//! ```
//!
//! ## Host bootstrap
//! ```rust
//! use stratus_kernel::bootstrap::Host;
//! use stratus_kernel::domain::config::StratusConfig;
//!
//! let host = Host::new(StratusConfig::default()).unwrap();
//! assert!(!host.bus().is_shutting_down());
//! ```
pub mod bootstrap;
pub mod config;

pub use stratus_domain as domain;
