#![allow(dead_code, unreachable_pub)]

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use stratus_event_bus::{Event, EventBus, Handler, OwnerId, ReceiverId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ping;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Damage(pub u32);

pub const PANEL: ReceiverId = ReceiverId::new(1);
pub const BUTTON: ReceiverId = ReceiverId::new(2);

/// Shared invocation counter.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    #[must_use]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    #[must_use]
    pub fn handler<T: Event>(&self) -> Handler<T> {
        let hits = Arc::clone(&self.0);
        Handler::new(move |_: &T| {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }
}

/// Records labels in invocation order.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    #[must_use]
    pub fn handler<T: Event>(&self, label: impl Into<String>) -> Handler<T> {
        let entries = Arc::clone(&self.0);
        let label = label.into();
        Handler::new(move |_: &T| entries.lock().push(label.clone()))
    }

    /// Records the amount of every [`Damage`] received.
    #[must_use]
    pub fn damage_handler(&self) -> Handler<Damage> {
        let entries = Arc::clone(&self.0);
        Handler::new(move |hit: &Damage| entries.lock().push(hit.0.to_string()))
    }
}

/// A bus with one live owner.
#[must_use]
pub fn bus_with_owner() -> (EventBus, OwnerId) {
    let bus = EventBus::new();
    let owner = bus.create_owner();
    (bus, owner)
}
