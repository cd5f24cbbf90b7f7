use crate::bus::EventBus;
use crate::error::EventBusError;
use crate::ids::ReceiverId;
use std::collections::VecDeque;
use std::fmt;

/// When a dispatch is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Deliver synchronously, before the dispatch call returns.
    #[default]
    Immediate,
    /// Queue the dispatch and deliver it on the next [`EventBus::tick`].
    NextTick,
}

/// A dispatch waiting for the next tick.
pub(crate) struct DeferredDispatch {
    pub(crate) receiver: ReceiverId,
    pub(crate) event: &'static str,
    pub(crate) scheduled_at: u64,
    pub(crate) run: Box<dyn FnOnce(&EventBus) + Send>,
}

impl fmt::Debug for DeferredDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredDispatch")
            .field("receiver", &self.receiver)
            .field("event", &self.event)
            .field("scheduled_at", &self.scheduled_at)
            .finish_non_exhaustive()
    }
}

/// Bounded FIFO of deferred dispatches, drained once per tick.
#[derive(Debug)]
pub(crate) struct DeferredQueue {
    pending: VecDeque<DeferredDispatch>,
    capacity: usize,
}

impl DeferredQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self { pending: VecDeque::new(), capacity }
    }

    pub(crate) fn push(&mut self, dispatch: DeferredDispatch) -> Result<(), EventBusError> {
        if self.pending.len() >= self.capacity {
            return Err(EventBusError::QueueFull {
                message: format!("{} dispatches already pending", self.pending.len()).into(),
                context: Some(dispatch.event.into()),
            });
        }
        self.pending.push_back(dispatch);
        Ok(())
    }

    /// Takes everything queued so far; dispatches queued afterwards wait for the following tick.
    pub(crate) fn take_batch(&mut self) -> VecDeque<DeferredDispatch> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(event: &'static str) -> DeferredDispatch {
        DeferredDispatch {
            receiver: ReceiverId::new(1),
            event,
            scheduled_at: 0,
            run: Box::new(|_| {}),
        }
    }

    #[test]
    fn overflow_reports_queue_full() {
        let mut queue = DeferredQueue::new(1);
        queue.push(noop("first")).unwrap();

        let err = queue.push(noop("second")).unwrap_err();
        assert_eq!(err.kind(), "QueueFull");
        assert_eq!(err.context_str(), Some("second"));
    }

    #[test]
    fn batches_preserve_scheduling_order() {
        let mut queue = DeferredQueue::new(4);
        queue.push(noop("a")).unwrap();
        queue.push(noop("b")).unwrap();

        let batch = queue.take_batch();
        let order: Vec<_> = batch.iter().map(|d| d.event).collect();
        assert_eq!(order, vec!["a", "b"]);
        assert_eq!(queue.len(), 0);
    }
}
