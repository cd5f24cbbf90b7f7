use crate::bus::EventBus;
use crate::error::EventBusError;
use crate::handler::Event;
use crate::ids::ReceiverId;
use fxhash::{FxHashMap, FxHashSet};
use std::any::type_name;
use std::collections::VecDeque;
use tracing::trace;

/// Parent/child relation between receivers, supplied by the host.
pub trait Hierarchy {
    fn parent(&self, receiver: ReceiverId) -> Option<ReceiverId>;

    /// Direct children, in the order the host wants them visited.
    fn children(&self, receiver: ReceiverId) -> Vec<ReceiverId>;
}

/// Every transitive child of `root`, breadth-first, each once. `root` itself is excluded.
pub fn descendants<H: Hierarchy + ?Sized>(hierarchy: &H, root: ReceiverId) -> Vec<ReceiverId> {
    let mut seen = FxHashSet::default();
    seen.insert(root);

    let mut order = Vec::new();
    let mut frontier: VecDeque<ReceiverId> = VecDeque::from([root]);
    while let Some(node) = frontier.pop_front() {
        for child in hierarchy.children(node) {
            if seen.insert(child) {
                order.push(child);
                frontier.push_back(child);
            }
        }
    }
    order
}

/// Ancestors of `receiver` from the immediate parent up to the root, each once.
pub fn ancestors<H: Hierarchy + ?Sized>(hierarchy: &H, receiver: ReceiverId) -> Vec<ReceiverId> {
    let mut seen = FxHashSet::default();
    seen.insert(receiver);

    let mut chain = Vec::new();
    let mut current = receiver;
    while let Some(parent) = hierarchy.parent(current) {
        if !seen.insert(parent) {
            break;
        }
        chain.push(parent);
        current = parent;
    }
    chain
}

/// In-memory [`Hierarchy`] for hosts without a scene tree of their own.
#[derive(Debug, Default, Clone)]
pub struct SceneGraph {
    parents: FxHashMap<ReceiverId, ReceiverId>,
    children: FxHashMap<ReceiverId, Vec<ReceiverId>>,
}

impl SceneGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `child` a child of `parent`, detaching it from any previous parent.
    ///
    /// # Errors
    /// Returns [`EventBusError::InvalidHierarchy`] if `child == parent` or if `parent`
    /// is already below `child`.
    pub fn attach(&mut self, child: ReceiverId, parent: ReceiverId) -> Result<(), EventBusError> {
        if child == parent || ancestors(self, parent).contains(&child) {
            return Err(EventBusError::InvalidHierarchy {
                message: format!("attaching {child} under {parent} would form a cycle").into(),
                context: None,
            });
        }

        self.detach(child);
        self.parents.insert(child, parent);
        self.children.entry(parent).or_default().push(child);
        Ok(())
    }

    /// Detaches `child` from its parent. Returns the former parent.
    pub fn detach(&mut self, child: ReceiverId) -> Option<ReceiverId> {
        let parent = self.parents.remove(&child)?;
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|sibling| *sibling != child);
            if siblings.is_empty() {
                self.children.remove(&parent);
            }
        }
        Some(parent)
    }

    /// Removes a node; its children become roots.
    pub fn remove(&mut self, receiver: ReceiverId) {
        self.detach(receiver);
        for child in self.children.remove(&receiver).unwrap_or_default() {
            self.parents.remove(&child);
        }
    }

    #[must_use]
    pub fn contains(&self, receiver: ReceiverId) -> bool {
        self.parents.contains_key(&receiver) || self.children.contains_key(&receiver)
    }

    #[must_use]
    pub fn descendants(&self, root: ReceiverId) -> Vec<ReceiverId> {
        descendants(self, root)
    }

    #[must_use]
    pub fn ancestors(&self, receiver: ReceiverId) -> Vec<ReceiverId> {
        ancestors(self, receiver)
    }
}

impl Hierarchy for SceneGraph {
    fn parent(&self, receiver: ReceiverId) -> Option<ReceiverId> {
        self.parents.get(&receiver).copied()
    }

    fn children(&self, receiver: ReceiverId) -> Vec<ReceiverId> {
        self.children.get(&receiver).cloned().unwrap_or_default()
    }
}

impl EventBus {
    /// Dispatches `event` independently to every descendant of `root`, never to `root` itself.
    ///
    /// Returns the number of receivers visited.
    pub fn dispatch_to_children<T: Event, H: Hierarchy + ?Sized>(
        &self,
        hierarchy: &H,
        root: ReceiverId,
        event: T,
    ) -> usize {
        let targets = descendants(hierarchy, root);
        trace!(event = type_name::<T>(), %root, targets = targets.len(), "Dispatching down");
        for receiver in &targets {
            self.dispatch_ref(*receiver, &event);
        }
        targets.len()
    }

    /// Dispatches `event` to every ancestor of `receiver`, immediate parent first.
    ///
    /// Returns the number of receivers visited.
    pub fn dispatch_to_ancestors<T: Event, H: Hierarchy + ?Sized>(
        &self,
        hierarchy: &H,
        receiver: ReceiverId,
        event: T,
    ) -> usize {
        let targets = ancestors(hierarchy, receiver);
        trace!(event = type_name::<T>(), %receiver, targets = targets.len(), "Dispatching up");
        for target in &targets {
            self.dispatch_ref(*target, &event);
        }
        targets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(raw: u64) -> ReceiverId {
        ReceiverId::new(raw)
    }

    /// A host tree that reports a cycle, to check the traversal guards.
    struct Looping;

    impl Hierarchy for Looping {
        fn parent(&self, receiver: ReceiverId) -> Option<ReceiverId> {
            Some(if receiver == r(1) { r(2) } else { r(1) })
        }

        fn children(&self, receiver: ReceiverId) -> Vec<ReceiverId> {
            vec![if receiver == r(1) { r(2) } else { r(1) }]
        }
    }

    #[test]
    fn descendants_are_breadth_first() {
        let mut graph = SceneGraph::new();
        graph.attach(r(2), r(1)).unwrap();
        graph.attach(r(3), r(1)).unwrap();
        graph.attach(r(4), r(2)).unwrap();

        assert_eq!(graph.descendants(r(1)), vec![r(2), r(3), r(4)]);
        assert_eq!(graph.ancestors(r(4)), vec![r(2), r(1)]);
    }

    #[test]
    fn attach_rejects_cycles() {
        let mut graph = SceneGraph::new();
        graph.attach(r(2), r(1)).unwrap();

        assert!(graph.attach(r(1), r(2)).is_err());
        assert!(graph.attach(r(1), r(1)).is_err());
    }

    #[test]
    fn reattach_moves_the_subtree() {
        let mut graph = SceneGraph::new();
        graph.attach(r(3), r(1)).unwrap();
        graph.attach(r(3), r(2)).unwrap();

        assert!(graph.descendants(r(1)).is_empty());
        assert_eq!(graph.descendants(r(2)), vec![r(3)]);
    }

    #[test]
    fn removing_a_node_orphans_its_children() {
        let mut graph = SceneGraph::new();
        graph.attach(r(2), r(1)).unwrap();
        graph.attach(r(3), r(2)).unwrap();

        graph.remove(r(2));
        assert!(graph.descendants(r(1)).is_empty());
        assert!(graph.ancestors(r(3)).is_empty());
        assert!(!graph.contains(r(2)));
    }

    #[test]
    fn traversals_survive_cyclic_hosts() {
        assert_eq!(descendants(&Looping, r(1)), vec![r(2)]);
        assert_eq!(ancestors(&Looping, r(1)), vec![r(2)]);
    }
}
