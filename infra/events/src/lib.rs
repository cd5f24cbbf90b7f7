//! # Event Bus
//!
//! A synchronous, type-safe publish/subscribe router for frame-driven hosts.
//!
//! ## Overview
//!
//! Subscriptions are keyed by a receiver identity and the Rust type of the event.
//! Each subscription belongs to an owner; destroying the owner removes its
//! subscriptions, eagerly through [`EventBus::destroy_owner`] or lazily on the next
//! dispatch that reaches them.
//!
//! ## Features
//!
//! * **Type-Safe**: Events are identified by their Rust type.
//! * **Re-entrant**: Handlers may connect, disconnect and dispatch while being invoked.
//! * **Deferred delivery**: [`EventBus::dispatch_next_tick`] queues work for the next [`EventBus::tick`].
//! * **Hierarchies**: Fan out along any [`Hierarchy`] with [`EventBus::dispatch_to_children`].
//! * **Fast lookups**: `FxHashMap` + `parking_lot::RwLock`.
//!
//! # Example
//!
//! ```rust
//! use stratus_event_bus::{EventBus, ReceiverId};
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//!
//! #[derive(Debug)]
//! struct UserCreated { id: u64 }
//!
//! let bus = EventBus::new();
//! let panel = ReceiverId::new(7);
//! let owner = bus.create_owner();
//!
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! bus.connect_fn(panel, owner, move |event: &UserCreated| sink.lock().push(event.id));
//!
//! bus.dispatch(panel, UserCreated { id: 42 });
//! bus.destroy_owner(owner);
//! bus.dispatch(panel, UserCreated { id: 43 });
//!
//! assert_eq!(*seen.lock(), vec![42]);
//! ```

mod bus;
mod deferred;
mod error;
mod handler;
mod hierarchy;
mod ids;
mod owners;
mod registry;

pub use bus::{BusStats, EventBus};
pub use deferred::Delivery;
pub use error::{EventBusError, EventBusErrorExt};
pub use handler::{Event, Handler};
pub use hierarchy::{Hierarchy, SceneGraph, ancestors, descendants};
pub use ids::{OwnerId, ReceiverId};
