//! # Domain Models
//!
//! Pure configuration types shared by the event bus, the kernel and the host apps.
//! Keep it lean: no I/O or heavy logic, just data with serde defaults.

pub mod config;
