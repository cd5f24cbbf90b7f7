use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

/// Marker trait for types that can be dispatched through the [`EventBus`](crate::EventBus).
///
/// Any type that is `Send + Sync + 'static` automatically implements this trait.
pub trait Event: Any + Send + Sync + 'static {}
impl<T: Any + Send + Sync + 'static> Event for T {}

/// A cloneable callback for events of type `T`.
///
/// Identity is the shared allocation: clones of one handler are the same callback,
/// so connecting a clone where the original is already connected is a no-op.
pub struct Handler<T: Event> {
    callback: Arc<dyn Fn(&T) + Send + Sync>,
}

impl<T: Event> Handler<T> {
    pub fn new(callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        Self { callback: Arc::new(callback) }
    }

    /// Invokes the callback directly, bypassing the bus.
    pub fn call(&self, event: &T) {
        (self.callback)(event);
    }

    /// Address of the shared callback; equal for clones of one handler.
    pub(crate) fn key(&self) -> usize {
        Arc::as_ptr(&self.callback).cast::<()>().addr()
    }

    /// Whether both handles point at the same callback.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.callback, &other.callback)
    }
}

impl<T: Event> Clone for Handler<T> {
    fn clone(&self) -> Self {
        Self { callback: Arc::clone(&self.callback) }
    }
}

impl<T: Event> PartialEq for Handler<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<T: Event> Eq for Handler<T> {}

impl<T: Event> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("event", &type_name::<T>())
            .field("callback", &Arc::as_ptr(&self.callback).cast::<()>())
            .finish()
    }
}

/// Type-erased callback used by runtime-typed dispatch.
pub(crate) type ErasedHandler = Arc<dyn Fn(&dyn Any) + Send + Sync>;

impl<T: Event> Handler<T> {
    pub(crate) fn erase(&self) -> ErasedHandler {
        let callback = Arc::clone(&self.callback);
        Arc::new(move |payload: &dyn Any| {
            if let Some(event) = payload.downcast_ref::<T>() {
                callback(event);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn clones_share_identity() {
        let a = Handler::new(|_: &u32| {});
        let b = a.clone();
        let c = Handler::new(|_: &u32| {});

        assert!(a.same_as(&b));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn erased_handler_ignores_foreign_payloads() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handler = Handler::new(move |value: &u32| {
            counter.fetch_add(*value as usize, Ordering::SeqCst);
        });

        let erased = handler.erase();
        erased(&5_u32 as &dyn Any);
        erased(&"not a u32" as &dyn Any);

        assert_eq!(hits.load(Ordering::SeqCst), 5);
    }
}
