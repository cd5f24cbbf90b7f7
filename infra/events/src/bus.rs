use crate::deferred::{DeferredDispatch, DeferredQueue, Delivery};
use crate::error::EventBusError;
use crate::handler::{Event, Handler};
use crate::ids::{OwnerId, ReceiverId};
use crate::owners::OwnerTable;
use crate::registry::Registry;
use fxhash::FxHashSet;
use parking_lot::{Mutex, RwLock};
use std::any::{Any, TypeId, type_name};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use stratus_domain::config::{BusConfig, DEFAULT_DEFERRED_CAPACITY};
use tracing::{debug, error, info, trace, warn};

const MIN_CAPACITY: usize = 1;

fn validate_capacity(capacity: usize) -> Result<usize, EventBusError> {
    if capacity < MIN_CAPACITY {
        return Err(EventBusError::InvalidCapacity {
            message: format!("deferred capacity must be >= {MIN_CAPACITY}").into(),
            context: None,
        });
    }
    Ok(capacity)
}

/// Point-in-time counters describing the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusStats {
    pub receivers: usize,
    pub subscriptions: usize,
    pub live_owners: usize,
    pub pending_deferred: usize,
    pub tick: u64,
}

#[derive(Debug, Default)]
struct Watchlist {
    types: FxHashSet<TypeId>,
    names: Vec<String>,
}

impl Watchlist {
    fn matches(&self, event: TypeId, name: &str) -> bool {
        self.types.contains(&event) || self.names.iter().any(|pattern| type_path_ends_with(name, pattern))
    }

    fn is_empty(&self) -> bool {
        self.types.is_empty() && self.names.is_empty()
    }
}

/// `true` if `pattern` equals `full` or is a whole trailing path segment of it.
fn type_path_ends_with(full: &str, pattern: &str) -> bool {
    full.strip_suffix(pattern).is_some_and(|head| head.is_empty() || head.ends_with("::"))
}

#[derive(Debug)]
struct BusInner {
    registry: RwLock<Registry>,
    owners: RwLock<OwnerTable>,
    deferred: Mutex<DeferredQueue>,
    watchlist: RwLock<Watchlist>,
    tick: AtomicU64,
    shutting_down: AtomicBool,
    strict_receivers: bool,
}

/// Typed publish/subscribe router keyed by (receiver, event type).
///
/// The bus is a cheap-to-clone handle; clones share one registry. It is meant to be
/// driven from a single host thread that calls [`EventBus::tick`] once per frame.
/// No lock is held while handlers run, so handlers may connect, disconnect and
/// dispatch on the same bus.
///
/// Handlers that capture a clone of the bus form a reference cycle through the
/// registry; [`EventBus::shutdown`] breaks it.
#[derive(Debug, Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::build(DEFAULT_DEFERRED_CAPACITY, false)
    }
}

impl EventBus {
    /// Creates a new, empty `EventBus` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bus from configuration.
    ///
    /// # Errors
    /// Returns [`EventBusError::InvalidCapacity`] if `deferred_capacity` is zero.
    ///
    /// # Examples
    /// ```rust
    /// use stratus_event_bus::EventBus;
    /// use stratus_domain::config::BusConfig;
    ///
    /// # fn main() -> Result<(), stratus_event_bus::EventBusError> {
    /// let config = BusConfig { strict_receivers: true, ..BusConfig::default() };
    /// let bus = EventBus::with_config(&config)?;
    /// assert!(bus.is_strict());
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_config(config: &BusConfig) -> Result<Self, EventBusError> {
        let capacity = validate_capacity(config.deferred_capacity)?;
        let bus = Self::build(capacity, config.strict_receivers);
        bus.inner.watchlist.write().names.extend(config.watch.iter().cloned());
        debug!(
            strict = config.strict_receivers,
            deferred_capacity = capacity,
            watched = config.watch.len(),
            "Event bus configured"
        );
        Ok(bus)
    }

    fn build(deferred_capacity: usize, strict_receivers: bool) -> Self {
        Self {
            inner: Arc::new(BusInner {
                registry: RwLock::new(Registry::default()),
                owners: RwLock::new(OwnerTable::default()),
                deferred: Mutex::new(DeferredQueue::new(deferred_capacity)),
                watchlist: RwLock::new(Watchlist::default()),
                tick: AtomicU64::new(0),
                shutting_down: AtomicBool::new(false),
                strict_receivers,
            }),
        }
    }

    /// Whether receivers must be registered explicitly.
    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.inner.strict_receivers
    }

    // --- Owners ---

    /// Issues a fresh, live owner handle.
    #[must_use]
    pub fn create_owner(&self) -> OwnerId {
        let owner = self.inner.owners.write().create();
        trace!(%owner, "Owner created");
        owner
    }

    #[must_use]
    pub fn is_owner_alive(&self, owner: OwnerId) -> bool {
        self.inner.owners.read().is_alive(owner)
    }

    /// Marks the owner destroyed without touching its subscriptions.
    ///
    /// They are pruned lazily by the next dispatch that reaches them. Returns `false`
    /// if the owner was already dead.
    pub fn invalidate_owner(&self, owner: OwnerId) -> bool {
        let invalidated = self.inner.owners.write().invalidate(owner);
        if invalidated {
            trace!(%owner, "Owner invalidated");
        }
        invalidated
    }

    /// Host hook for a destroyed owner: invalidates it and removes all of its subscriptions.
    ///
    /// Safe to call repeatedly; later calls return 0.
    pub fn destroy_owner(&self, owner: OwnerId) -> usize {
        if self.is_shutting_down() {
            debug!(%owner, "Ignoring owner teardown: bus is shutting down");
            return 0;
        }
        self.invalidate_owner(owner);
        self.disconnect(owner)
    }

    // --- Receivers ---

    /// Registers a receiver explicitly. Returns `true` if it was not registered before.
    pub fn register_receiver(&self, receiver: ReceiverId) -> bool {
        if self.is_shutting_down() {
            return false;
        }
        self.inner.registry.write().ensure(receiver)
    }

    /// Whether the receiver has a registry entry, regardless of live subscriptions.
    #[must_use]
    pub fn is_connected(&self, receiver: ReceiverId) -> bool {
        self.inner.registry.read().contains(receiver)
    }

    /// Host hook for a destroyed receiver: drops its registry entry and owner index links.
    ///
    /// Returns the number of subscriptions dropped.
    pub fn remove_receiver(&self, receiver: ReceiverId) -> usize {
        if self.is_shutting_down() {
            return 0;
        }
        let dropped = self.inner.registry.write().remove_receiver(receiver);
        debug!(%receiver, dropped, "Receiver removed");
        dropped
    }

    // --- Registration ---

    /// Subscribes `handler` to events of type `T` sent to `receiver`.
    ///
    /// Returns `true` if a new subscription was stored. Connecting a handler that is
    /// already bound to (receiver, `T`) is a no-op, as is connecting with a dead owner,
    /// connecting after shutdown, or connecting to an unregistered receiver in strict mode.
    ///
    /// # Examples
    /// ```rust
    /// use stratus_event_bus::{EventBus, Handler, ReceiverId};
    ///
    /// struct Ping;
    ///
    /// let bus = EventBus::new();
    /// let owner = bus.create_owner();
    /// let handler = Handler::new(|_: &Ping| {});
    ///
    /// assert!(bus.connect(ReceiverId::new(1), owner, &handler));
    /// assert!(!bus.connect(ReceiverId::new(1), owner, &handler));
    /// ```
    pub fn connect<T: Event>(
        &self,
        receiver: ReceiverId,
        owner: OwnerId,
        handler: &Handler<T>,
    ) -> bool {
        if self.is_shutting_down() {
            debug!(event = type_name::<T>(), %receiver, "Ignoring connect: bus is shutting down");
            return false;
        }
        if !self.is_owner_alive(owner) {
            warn!(event = type_name::<T>(), %receiver, %owner, "Ignoring connect from a dead owner");
            return false;
        }

        let mut registry = self.inner.registry.write();
        if !registry.contains(receiver) {
            if self.inner.strict_receivers {
                warn!(event = type_name::<T>(), %receiver, "Ignoring connect to an unregistered receiver");
                return false;
            }
            registry.ensure(receiver);
        }

        match registry.insert(receiver, owner, handler) {
            Ok(inserted) => {
                trace!(event = type_name::<T>(), %receiver, %owner, inserted, "Handler connected");
                inserted
            },
            Err(err) => {
                error!(kind = err.kind(), %err, "Failed to store subscription");
                false
            },
        }
    }

    /// Wraps `callback` in a new [`Handler`], connects it and returns it for later use.
    pub fn connect_fn<T: Event>(
        &self,
        receiver: ReceiverId,
        owner: OwnerId,
        callback: impl Fn(&T) + Send + Sync + 'static,
    ) -> Handler<T> {
        let handler = Handler::new(callback);
        self.connect(receiver, owner, &handler);
        handler
    }

    /// Subscribes to the scene-wide channel ([`ReceiverId::SCENE`]).
    pub fn connect_scene<T: Event>(&self, owner: OwnerId, handler: &Handler<T>) -> bool {
        if self.inner.strict_receivers {
            self.register_receiver(ReceiverId::SCENE);
        }
        self.connect(ReceiverId::SCENE, owner, handler)
    }

    /// Removes every subscription of `owner` on every receiver it connected to.
    pub fn disconnect(&self, owner: OwnerId) -> usize {
        if self.is_shutting_down() {
            return 0;
        }
        let removed = self.inner.registry.write().remove_owner(owner);
        if removed > 0 {
            debug!(%owner, removed, "Owner disconnected");
        }
        removed
    }

    /// Removes the subscriptions of `owner` under one receiver only.
    pub fn disconnect_from(&self, owner: OwnerId, receiver: ReceiverId) -> usize {
        if self.is_shutting_down() {
            return 0;
        }
        let removed = self.inner.registry.write().remove_owner_from(owner, receiver);
        trace!(%owner, %receiver, removed, "Owner disconnected from receiver");
        removed
    }

    /// Removes a single handler from (receiver, `T`). Returns `true` if it was connected.
    pub fn disconnect_handler<T: Event>(&self, receiver: ReceiverId, handler: &Handler<T>) -> bool {
        if self.is_shutting_down() {
            return false;
        }
        self.inner.registry.write().remove_handler(receiver, handler).is_some()
    }

    /// Receivers the owner currently holds subscriptions on, in ascending order.
    #[must_use]
    pub fn receivers_of(&self, owner: OwnerId) -> Vec<ReceiverId> {
        self.inner.registry.read().receivers_of(owner)
    }

    // --- Dispatch ---

    /// Delivers `event` synchronously to every subscriber of (receiver, `T`).
    ///
    /// A missing receiver or an empty subscriber list is a silent no-op.
    ///
    /// # Examples
    /// ```rust
    /// use stratus_event_bus::{EventBus, ReceiverId};
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicU32, Ordering};
    ///
    /// struct Ping;
    ///
    /// let bus = EventBus::new();
    /// let owner = bus.create_owner();
    /// let hits = Arc::new(AtomicU32::new(0));
    /// let counter = Arc::clone(&hits);
    /// bus.connect_fn(ReceiverId::new(1), owner, move |_: &Ping| {
    ///     counter.fetch_add(1, Ordering::SeqCst);
    /// });
    ///
    /// bus.dispatch(ReceiverId::new(1), Ping);
    /// assert_eq!(hits.load(Ordering::SeqCst), 1);
    /// ```
    pub fn dispatch<T: Event>(&self, receiver: ReceiverId, event: T) {
        self.dispatch_ref(receiver, &event);
    }

    /// Like [`EventBus::dispatch`] for a borrowed payload.
    pub fn dispatch_ref<T: Event>(&self, receiver: ReceiverId, event: &T) {
        if let Err(err) = self.deliver(receiver, event, !self.inner.strict_receivers) {
            trace!(event = type_name::<T>(), %receiver, kind = err.kind(), "Dispatch skipped");
        }
    }

    /// Dispatches immediately or on the next tick.
    pub fn dispatch_with<T: Event>(&self, receiver: ReceiverId, event: T, delivery: Delivery) {
        match delivery {
            Delivery::Immediate => self.dispatch(receiver, event),
            Delivery::NextTick => self.dispatch_next_tick(receiver, event),
        }
    }

    /// Dispatch that reports why nothing could be delivered.
    ///
    /// Returns the number of handlers invoked.
    ///
    /// # Errors
    /// Returns [`EventBusError::UnknownReceiver`] for an unregistered receiver in strict
    /// mode and [`EventBusError::ShuttingDown`] after [`EventBus::shutdown`].
    pub fn try_dispatch<T: Event>(&self, receiver: ReceiverId, event: T) -> Result<usize, EventBusError> {
        self.deliver(receiver, &event, !self.inner.strict_receivers)
    }

    /// Dispatches a payload whose type is only known at runtime.
    ///
    /// Routing uses the dynamic type of the payload, so it reaches the same handlers as
    /// a typed [`EventBus::dispatch`] of that type.
    pub fn dispatch_dyn(&self, receiver: ReceiverId, payload: Arc<dyn Any + Send + Sync>) {
        if self.is_shutting_down() {
            return;
        }
        let any: &dyn Any = &*payload;
        let event = any.type_id();

        let (snapshot, removals) = {
            let registry = self.inner.registry.read();
            (registry.snapshot_erased(receiver, event), registry.removals())
        };
        let Some((name, targets)) = snapshot else {
            if !self.inner.strict_receivers {
                self.inner.registry.write().ensure(receiver);
            }
            return;
        };

        self.invoke_all(receiver, event, name, removals, targets, |handler| handler(any));
    }

    /// Sends `event` to the scene-wide channel.
    pub fn dispatch_scene<T: Event>(&self, event: T) {
        self.dispatch(ReceiverId::SCENE, event);
    }

    /// Queues `event` for delivery on the next [`EventBus::tick`].
    ///
    /// If the receiver or its subscribers are removed before then, delivery is skipped.
    pub fn dispatch_next_tick<T: Event>(&self, receiver: ReceiverId, event: T) {
        if let Err(err) = self.try_dispatch_next_tick(receiver, event) {
            warn!(event = type_name::<T>(), %receiver, kind = err.kind(), %err, "Deferred dispatch dropped");
        }
    }

    /// Queues `event` for the next tick, reporting why it could not be queued.
    ///
    /// # Errors
    /// Returns [`EventBusError::QueueFull`] when the deferred queue is at capacity,
    /// [`EventBusError::ShuttingDown`] after shutdown and [`EventBusError::UnknownReceiver`]
    /// for unregistered receivers in strict mode.
    pub fn try_dispatch_next_tick<T: Event>(
        &self,
        receiver: ReceiverId,
        event: T,
    ) -> Result<(), EventBusError> {
        self.ensure_open::<T>()?;
        self.resolve_receiver::<T>(receiver, !self.inner.strict_receivers)?;

        let scheduled_at = self.current_tick();
        self.inner.deferred.lock().push(DeferredDispatch {
            receiver,
            event: type_name::<T>(),
            scheduled_at,
            run: Box::new(move |bus: &Self| {
                if let Err(err) = bus.deliver(receiver, &event, false) {
                    trace!(event = type_name::<T>(), %receiver, kind = err.kind(), "Deferred dispatch skipped");
                }
            }),
        })?;
        trace!(event = type_name::<T>(), %receiver, scheduled_at, "Dispatch deferred to next tick");
        Ok(())
    }

    // --- Scheduling ---

    /// Advances the tick counter and runs the dispatches deferred before this call.
    ///
    /// Dispatches deferred by handlers running inside this tick wait for the next one.
    /// Returns the number of deferred dispatches executed.
    pub fn tick(&self) -> usize {
        let tick = self.inner.tick.fetch_add(1, Ordering::AcqRel) + 1;
        if self.is_shutting_down() {
            return 0;
        }

        let batch = self.inner.deferred.lock().take_batch();
        let executed = batch.len();
        for deferred in batch {
            trace!(
                tick,
                event = deferred.event,
                receiver = %deferred.receiver,
                scheduled_at = deferred.scheduled_at,
                "Running deferred dispatch"
            );
            (deferred.run)(self);
        }
        executed
    }

    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.inner.tick.load(Ordering::Acquire)
    }

    // --- Diagnostics ---

    /// Logs every handler invocation for events of type `T`.
    pub fn watch<T: Event>(&self) {
        self.inner.watchlist.write().types.insert(TypeId::of::<T>());
        info!(event = type_name::<T>(), "Watching event");
    }

    pub fn unwatch<T: Event>(&self) {
        self.inner.watchlist.write().types.remove(&TypeId::of::<T>());
    }

    #[must_use]
    pub fn is_watched<T: Event>(&self) -> bool {
        self.inner.watchlist.read().matches(TypeId::of::<T>(), type_name::<T>())
    }

    #[must_use]
    pub fn subscriber_count<T: Event>(&self, receiver: ReceiverId) -> usize {
        self.inner.registry.read().subscriber_count(receiver, TypeId::of::<T>())
    }

    #[must_use]
    pub fn stats(&self) -> BusStats {
        let (receivers, subscriptions) = {
            let registry = self.inner.registry.read();
            (registry.receiver_count(), registry.subscription_count())
        };
        BusStats {
            receivers,
            subscriptions,
            live_owners: self.inner.owners.read().live(),
            pending_deferred: self.inner.deferred.lock().len(),
            tick: self.current_tick(),
        }
    }

    // --- Lifecycle ---

    /// Stops the bus: clears the registry and the deferred queue and rejects all
    /// further mutation.
    ///
    /// Returns the number of receivers that were registered. A second call returns 0.
    pub fn shutdown(&self) -> usize {
        if self.inner.shutting_down.swap(true, Ordering::AcqRel) {
            debug!("Event bus already shut down");
            return 0;
        }
        let receivers = self.inner.registry.write().clear();
        let dropped = self.inner.deferred.lock().clear();
        info!(receivers, dropped_deferred = dropped, "Event bus shut down");
        receivers
    }

    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::Acquire)
    }

    // --- Internals ---

    fn ensure_open<T: Event>(&self) -> Result<(), EventBusError> {
        if self.is_shutting_down() {
            return Err(EventBusError::ShuttingDown {
                message: "dispatch rejected".into(),
                context: Some(type_name::<T>().into()),
            });
        }
        Ok(())
    }

    /// Checks that the receiver is registered, registering it when `vivify` is set.
    fn resolve_receiver<T: Event>(&self, receiver: ReceiverId, vivify: bool) -> Result<(), EventBusError> {
        if self.inner.registry.read().contains(receiver) {
            return Ok(());
        }
        if !vivify {
            return Err(EventBusError::UnknownReceiver {
                message: receiver.to_string().into(),
                context: Some(type_name::<T>().into()),
            });
        }
        self.inner.registry.write().ensure(receiver);
        Ok(())
    }

    pub(crate) fn deliver<T: Event>(
        &self,
        receiver: ReceiverId,
        event: &T,
        vivify: bool,
    ) -> Result<usize, EventBusError> {
        self.ensure_open::<T>()?;

        let (snapshot, removals) = {
            let registry = self.inner.registry.read();
            (registry.snapshot::<T>(receiver), registry.removals())
        };
        let targets = match snapshot {
            Some(targets) => targets,
            None => {
                self.resolve_receiver::<T>(receiver, vivify)?;
                return Ok(0);
            },
        };
        if targets.is_empty() {
            return Ok(0);
        }

        let targets = targets.into_iter().map(|sub| (sub.owner, sub.handler.key(), sub.handler));
        Ok(self.invoke_all(
            receiver,
            TypeId::of::<T>(),
            type_name::<T>(),
            removals,
            targets,
            |handler| handler.call(event),
        ))
    }

    /// Runs one dispatch pass over a snapshot and prunes owners found dead afterwards.
    ///
    /// `removals` is the registry's removal count when the snapshot was taken; once it
    /// moves, each remaining target is checked against the registry so that handlers
    /// disconnected earlier in the pass are skipped.
    fn invoke_all<H>(
        &self,
        receiver: ReceiverId,
        event: TypeId,
        name: &'static str,
        removals: u64,
        targets: impl IntoIterator<Item = (OwnerId, usize, H)>,
        invoke: impl Fn(&H),
    ) -> usize {
        let watched = {
            let watchlist = self.inner.watchlist.read();
            !watchlist.is_empty() && watchlist.matches(event, name)
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for (owner, key, handler) in targets {
            if self.is_shutting_down() {
                debug!(event = name, %receiver, "Dispatch interrupted by shutdown");
                break;
            }
            if !self.is_owner_alive(owner) {
                dead.push(owner);
                continue;
            }
            if !self.still_bound(receiver, event, owner, key, removals) {
                trace!(event = name, %receiver, %owner, "Skipping handler disconnected during dispatch");
                continue;
            }
            if watched {
                info!(event = name, %receiver, %owner, "Invoking watched handler");
            }
            if catch_unwind(AssertUnwindSafe(|| invoke(&handler))).is_err() {
                error!(event = name, %receiver, %owner, "Event handler panicked; continuing delivery");
            }
            delivered += 1;
        }

        if !dead.is_empty() && !self.is_shutting_down() {
            let pruned = self.inner.registry.write().prune(receiver, event, &dead);
            debug!(event = name, %receiver, pruned, "Pruned subscriptions of destroyed owners");
        }
        delivered
    }

    fn still_bound(&self, receiver: ReceiverId, event: TypeId, owner: OwnerId, key: usize, removals: u64) -> bool {
        let registry = self.inner.registry.read();
        registry.removals() == removals || registry.is_bound(receiver, event, owner, key)
    }
}
