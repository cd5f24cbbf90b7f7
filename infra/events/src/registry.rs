use crate::error::EventBusError;
use crate::handler::{ErasedHandler, Event, Handler};
use crate::ids::{OwnerId, ReceiverId};
use fxhash::{FxHashMap, FxHashSet};
use std::any::{Any, TypeId, type_name};
use std::fmt;

/// One (receiver, event type) binding: the handler plus the owner governing its lifetime.
pub(crate) struct Subscription<T: Event> {
    pub(crate) owner: OwnerId,
    pub(crate) handler: Handler<T>,
}

impl<T: Event> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Self { owner: self.owner, handler: self.handler.clone() }
    }
}

/// Ordered subscriptions for a single event type. Insertion order is invocation order.
struct Subscriptions<T: Event> {
    items: Vec<Subscription<T>>,
}

impl<T: Event> Default for Subscriptions<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

/// Object-safe view over `Subscriptions<T>` so lists of different event types can share a map.
trait ErasedSubscriptions: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn event_name(&self) -> &'static str;
    fn len(&self) -> usize;
    fn has_owner(&self, owner: OwnerId) -> bool;
    fn owners(&self) -> Vec<OwnerId>;
    fn remove_owner(&mut self, owner: OwnerId) -> usize;
    fn binds(&self, owner: OwnerId, key: usize) -> bool;
    fn erased(&self) -> Vec<(OwnerId, usize, ErasedHandler)>;
}

impl<T: Event> ErasedSubscriptions for Subscriptions<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn event_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn has_owner(&self, owner: OwnerId) -> bool {
        self.items.iter().any(|sub| sub.owner == owner)
    }

    fn owners(&self) -> Vec<OwnerId> {
        self.items.iter().map(|sub| sub.owner).collect()
    }

    fn remove_owner(&mut self, owner: OwnerId) -> usize {
        let before = self.items.len();
        self.items.retain(|sub| sub.owner != owner);
        before - self.items.len()
    }

    fn binds(&self, owner: OwnerId, key: usize) -> bool {
        self.items.iter().any(|sub| sub.owner == owner && sub.handler.key() == key)
    }

    fn erased(&self) -> Vec<(OwnerId, usize, ErasedHandler)> {
        self.items.iter().map(|sub| (sub.owner, sub.handler.key(), sub.handler.erase())).collect()
    }
}

#[derive(Default)]
struct ReceiverEntry {
    lists: FxHashMap<TypeId, Box<dyn ErasedSubscriptions>>,
}

impl ReceiverEntry {
    fn has_owner(&self, owner: OwnerId) -> bool {
        self.lists.values().any(|list| list.has_owner(owner))
    }

    fn len(&self) -> usize {
        self.lists.values().map(|list| list.len()).sum()
    }

    fn drop_empty_lists(&mut self) {
        self.lists.retain(|_, list| list.len() > 0);
    }
}

/// Receiver → event type → subscriptions, plus the owner → receivers index.
#[derive(Default)]
pub(crate) struct Registry {
    receivers: FxHashMap<ReceiverId, ReceiverEntry>,
    owner_index: FxHashMap<OwnerId, FxHashSet<ReceiverId>>,
    /// Bumped by every call that may drop subscriptions.
    removals: u64,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("receivers", &self.receivers.len())
            .field("subscriptions", &self.subscription_count())
            .field("owners", &self.owner_index.len())
            .field("removals", &self.removals)
            .finish()
    }
}

impl Registry {
    pub(crate) fn contains(&self, receiver: ReceiverId) -> bool {
        self.receivers.contains_key(&receiver)
    }

    /// Registers the receiver if absent. Returns `true` when a new entry was created.
    pub(crate) fn ensure(&mut self, receiver: ReceiverId) -> bool {
        if self.receivers.contains_key(&receiver) {
            return false;
        }
        self.receivers.insert(receiver, ReceiverEntry::default());
        true
    }

    /// Stores the subscription unless the same handler is already bound to (receiver, `T`).
    ///
    /// The receiver must already be registered.
    pub(crate) fn insert<T: Event>(
        &mut self,
        receiver: ReceiverId,
        owner: OwnerId,
        handler: &Handler<T>,
    ) -> Result<bool, EventBusError> {
        let entry = self.receivers.get_mut(&receiver).ok_or_else(|| {
            EventBusError::UnknownReceiver {
                message: receiver.to_string().into(),
                context: Some(type_name::<T>().into()),
            }
        })?;

        let list = entry
            .lists
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Subscriptions::<T>::default()))
            .as_any_mut()
            .downcast_mut::<Subscriptions<T>>()
            .ok_or_else(|| EventBusError::TypeMismatch {
                message: type_name::<T>().into(),
                context: Some("Subscription list stored under a foreign TypeId".into()),
            })?;

        if list.items.iter().any(|sub| sub.handler.same_as(handler)) {
            return Ok(false);
        }

        list.items.push(Subscription { owner, handler: handler.clone() });
        self.owner_index.entry(owner).or_default().insert(receiver);
        Ok(true)
    }

    /// Clones the subscription list for (receiver, `T`).
    ///
    /// `None` means the receiver is unregistered; an empty list means it is registered but
    /// nobody listens for `T`.
    pub(crate) fn snapshot<T: Event>(&self, receiver: ReceiverId) -> Option<Vec<Subscription<T>>> {
        let entry = self.receivers.get(&receiver)?;
        let items = entry
            .lists
            .get(&TypeId::of::<T>())
            .and_then(|list| list.as_any().downcast_ref::<Subscriptions<T>>())
            .map(|list| list.items.clone())
            .unwrap_or_default();
        Some(items)
    }

    /// Runtime-typed counterpart of [`Registry::snapshot`].
    pub(crate) fn snapshot_erased(
        &self,
        receiver: ReceiverId,
        event: TypeId,
    ) -> Option<(&'static str, Vec<(OwnerId, usize, ErasedHandler)>)> {
        let entry = self.receivers.get(&receiver)?;
        Some(
            entry
                .lists
                .get(&event)
                .map_or(("<unsubscribed>", Vec::new()), |list| (list.event_name(), list.erased())),
        )
    }

    /// Removes every subscription of `owner` on every receiver it touched.
    pub(crate) fn remove_owner(&mut self, owner: OwnerId) -> usize {
        self.removals += 1;
        let Some(receivers) = self.owner_index.remove(&owner) else {
            return 0;
        };

        let mut removed = 0;
        for receiver in receivers {
            if let Some(entry) = self.receivers.get_mut(&receiver) {
                removed +=
                    entry.lists.values_mut().map(|list| list.remove_owner(owner)).sum::<usize>();
                entry.drop_empty_lists();
            }
        }
        removed
    }

    /// Removes the subscriptions of `owner` under a single receiver.
    pub(crate) fn remove_owner_from(&mut self, owner: OwnerId, receiver: ReceiverId) -> usize {
        self.removals += 1;
        let removed = self.receivers.get_mut(&receiver).map_or(0, |entry| {
            let removed: usize =
                entry.lists.values_mut().map(|list| list.remove_owner(owner)).sum();
            entry.drop_empty_lists();
            removed
        });
        self.unlink(owner, receiver);
        removed
    }

    /// Removes one handler. The owner stays indexed on the receiver while it has other bindings there.
    pub(crate) fn remove_handler<T: Event>(
        &mut self,
        receiver: ReceiverId,
        handler: &Handler<T>,
    ) -> Option<OwnerId> {
        self.removals += 1;
        let entry = self.receivers.get_mut(&receiver)?;
        let list = entry
            .lists
            .get_mut(&TypeId::of::<T>())?
            .as_any_mut()
            .downcast_mut::<Subscriptions<T>>()?;

        let position = list.items.iter().position(|sub| sub.handler.same_as(handler))?;
        let owner = list.items.remove(position).owner;
        entry.drop_empty_lists();

        if !entry.has_owner(owner) {
            self.unlink(owner, receiver);
        }
        Some(owner)
    }

    /// Drops subscriptions of owners found dead during a dispatch pass over (receiver, event).
    pub(crate) fn prune(&mut self, receiver: ReceiverId, event: TypeId, dead: &[OwnerId]) -> usize {
        self.removals += 1;
        let Some(entry) = self.receivers.get_mut(&receiver) else {
            return 0;
        };
        let Some(list) = entry.lists.get_mut(&event) else {
            return 0;
        };

        let pruned = dead.iter().map(|owner| list.remove_owner(*owner)).sum();
        entry.drop_empty_lists();

        let orphaned: Vec<OwnerId> =
            dead.iter().copied().filter(|owner| !entry.has_owner(*owner)).collect();
        for owner in orphaned {
            self.unlink(owner, receiver);
        }
        pruned
    }

    /// Forgets the receiver entirely. Returns the number of subscriptions dropped with it.
    pub(crate) fn remove_receiver(&mut self, receiver: ReceiverId) -> usize {
        self.removals += 1;
        let Some(entry) = self.receivers.remove(&receiver) else {
            return 0;
        };

        let owners: FxHashSet<OwnerId> =
            entry.lists.values().flat_map(|list| list.owners()).collect();
        for owner in owners {
            self.unlink(owner, receiver);
        }
        entry.len()
    }

    /// Empties the registry. Returns how many receivers were registered.
    pub(crate) fn clear(&mut self) -> usize {
        let receivers = self.receivers.len();
        self.removals += 1;
        self.receivers.clear();
        self.owner_index.clear();
        receivers
    }

    pub(crate) const fn removals(&self) -> u64 {
        self.removals
    }

    /// Whether the handler keyed `key` is still bound to (receiver, event) under `owner`.
    pub(crate) fn is_bound(&self, receiver: ReceiverId, event: TypeId, owner: OwnerId, key: usize) -> bool {
        self.receivers
            .get(&receiver)
            .and_then(|entry| entry.lists.get(&event))
            .is_some_and(|list| list.binds(owner, key))
    }

    pub(crate) fn receivers_of(&self, owner: OwnerId) -> Vec<ReceiverId> {
        let mut receivers: Vec<ReceiverId> = self
            .owner_index
            .get(&owner)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        receivers.sort_unstable();
        receivers
    }

    pub(crate) fn receiver_count(&self) -> usize {
        self.receivers.len()
    }

    pub(crate) fn subscription_count(&self) -> usize {
        self.receivers.values().map(ReceiverEntry::len).sum()
    }

    pub(crate) fn subscriber_count(&self, receiver: ReceiverId, event: TypeId) -> usize {
        self.receivers
            .get(&receiver)
            .and_then(|entry| entry.lists.get(&event))
            .map_or(0, |list| list.len())
    }

    fn unlink(&mut self, owner: OwnerId, receiver: ReceiverId) {
        if let Some(set) = self.owner_index.get_mut(&owner) {
            set.remove(&receiver);
            if set.is_empty() {
                self.owner_index.remove(&owner);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ReceiverId = ReceiverId::new(1);
    const B: ReceiverId = ReceiverId::new(2);

    fn owner(index: usize) -> OwnerId {
        OwnerId::new(index, 0)
    }

    #[test]
    fn duplicate_handler_is_stored_once() {
        let mut registry = Registry::default();
        registry.ensure(A);
        let handler = Handler::new(|_: &u8| {});

        assert!(registry.insert(A, owner(0), &handler).unwrap());
        assert!(!registry.insert(A, owner(1), &handler.clone()).unwrap());
        assert_eq!(registry.subscriber_count(A, TypeId::of::<u8>()), 1);
    }

    #[test]
    fn insert_requires_registered_receiver() {
        let mut registry = Registry::default();
        let result = registry.insert(A, owner(0), &Handler::new(|_: &u8| {}));
        assert!(matches!(result, Err(EventBusError::UnknownReceiver { .. })));
    }

    #[test]
    fn owner_index_follows_removals() {
        let mut registry = Registry::default();
        registry.ensure(A);
        registry.ensure(B);
        registry.insert(A, owner(0), &Handler::new(|_: &u8| {})).unwrap();
        registry.insert(B, owner(0), &Handler::new(|_: &u16| {})).unwrap();
        assert_eq!(registry.receivers_of(owner(0)), vec![A, B]);

        assert_eq!(registry.remove_owner_from(owner(0), A), 1);
        assert_eq!(registry.receivers_of(owner(0)), vec![B]);

        assert_eq!(registry.remove_owner(owner(0)), 1);
        assert!(registry.receivers_of(owner(0)).is_empty());
        assert!(registry.contains(A) && registry.contains(B), "receivers outlive their owners");
    }

    #[test]
    fn prune_keeps_owner_indexed_while_other_bindings_remain() {
        let mut registry = Registry::default();
        registry.ensure(A);
        registry.insert(A, owner(0), &Handler::new(|_: &u8| {})).unwrap();
        registry.insert(A, owner(0), &Handler::new(|_: &u16| {})).unwrap();

        assert_eq!(registry.prune(A, TypeId::of::<u8>(), &[owner(0)]), 1);
        assert_eq!(registry.receivers_of(owner(0)), vec![A]);

        assert_eq!(registry.prune(A, TypeId::of::<u16>(), &[owner(0)]), 1);
        assert!(registry.receivers_of(owner(0)).is_empty());
    }

    #[test]
    fn remove_receiver_unlinks_every_owner() {
        let mut registry = Registry::default();
        registry.ensure(A);
        registry.insert(A, owner(0), &Handler::new(|_: &u8| {})).unwrap();
        registry.insert(A, owner(1), &Handler::new(|_: &u8| {})).unwrap();

        assert_eq!(registry.remove_receiver(A), 2);
        assert!(!registry.contains(A));
        assert!(registry.receivers_of(owner(0)).is_empty());
        assert!(registry.receivers_of(owner(1)).is_empty());
    }

    #[test]
    fn snapshot_distinguishes_unknown_from_unsubscribed() {
        let mut registry = Registry::default();
        assert!(registry.snapshot::<u8>(A).is_none());

        registry.ensure(A);
        assert!(registry.snapshot::<u8>(A).is_some_and(|subs| subs.is_empty()));
    }

    #[test]
    fn removals_are_counted_and_bindings_tracked() {
        let mut registry = Registry::default();
        registry.ensure(A);
        let handler = Handler::new(|_: &u8| {});
        registry.insert(A, owner(0), &handler).unwrap();

        let event = TypeId::of::<u8>();
        assert!(registry.is_bound(A, event, owner(0), handler.key()));
        assert!(!registry.is_bound(A, event, owner(1), handler.key()));

        let before = registry.removals();
        registry.remove_handler(A, &handler);
        assert!(registry.removals() > before);
        assert!(!registry.is_bound(A, event, owner(0), handler.key()));
    }
}
