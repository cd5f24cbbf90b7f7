use crate::ids::OwnerId;

#[derive(Debug)]
struct Slot {
    generation: u32,
    alive: bool,
}

/// Generational liveness table for subscription owners.
///
/// The table never owns the host objects; it only answers "is this handle still
/// the live occupant of its slot".
#[derive(Debug, Default)]
pub(crate) struct OwnerTable {
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
}

impl OwnerTable {
    pub(crate) fn create(&mut self) -> OwnerId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.alive = true;
            return OwnerId::new(index, slot.generation);
        }

        let index = self.slots.len();
        self.slots.push(Slot { generation: 0, alive: true });
        OwnerId::new(index, 0)
    }

    pub(crate) fn is_alive(&self, owner: OwnerId) -> bool {
        self.slots
            .get(owner.index())
            .is_some_and(|slot| slot.alive && slot.generation == owner.generation())
    }

    /// Marks the owner dead and recycles its slot. Returns `false` if it was already dead.
    pub(crate) fn invalidate(&mut self, owner: OwnerId) -> bool {
        if !self.is_alive(owner) {
            return false;
        }
        let slot = &mut self.slots[owner.index()];
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(owner.index());
        self.live -= 1;
        true
    }

    pub(crate) const fn live(&self) -> usize {
        self.live
    }
}
