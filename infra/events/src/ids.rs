use std::fmt;

/// Opaque handle identifying a message sink.
///
/// The bus attaches no behavior to a receiver; it is only a routing key. Hosts
/// typically derive it from their own object identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReceiverId(u64);

impl ReceiverId {
    /// Reserved receiver carrying scene-wide events.
    pub const SCENE: Self = Self(u64::MAX);

    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_scene(self) -> bool {
        self.0 == u64::MAX
    }
}

impl From<u64> for ReceiverId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_scene() { f.write_str("scene") } else { write!(f, "receiver#{}", self.0) }
    }
}

/// Generational handle for the entity whose lifetime governs a subscription.
///
/// Issued by [`EventBus::create_owner`](crate::EventBus::create_owner). A handle
/// stays valid until the owner is invalidated or destroyed; slots are recycled with
/// a bumped generation, so stale handles never alias a newer owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId {
    index: usize,
    generation: u32,
}

impl OwnerId {
    pub(crate) const fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "owner#{}v{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_receiver_is_reserved() {
        assert!(ReceiverId::SCENE.is_scene());
        assert!(!ReceiverId::new(7).is_scene());
        assert_eq!(ReceiverId::SCENE.to_string(), "scene");
        assert_eq!(ReceiverId::from(7).to_string(), "receiver#7");
    }

    #[test]
    fn owner_display_carries_generation() {
        assert_eq!(OwnerId::new(3, 2).to_string(), "owner#3v2");
    }
}
