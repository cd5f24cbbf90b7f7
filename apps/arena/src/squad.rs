use crate::combat::{AgentDowned, DamageDealt, RoundStarted};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use stratus::events::{EventBus, EventBusError, Handler, OwnerId, ReceiverId, SceneGraph};
use tracing::{debug, info};

/// Receiver of the squad root; agents are numbered after it.
pub const SQUAD: ReceiverId = ReceiverId::new(1);

/// One combatant: a receiver in the scene graph plus the owner of its handlers.
#[derive(Debug)]
pub struct Agent {
    pub receiver: ReceiverId,
    pub owner: OwnerId,
    health: AtomicU32,
    rounds_seen: AtomicU64,
}

impl Agent {
    #[must_use]
    pub fn health(&self) -> u32 {
        self.health.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.health() > 0
    }

    #[must_use]
    pub fn rounds_seen(&self) -> u64 {
        self.rounds_seen.load(Ordering::Acquire)
    }

    /// Applies damage and reports whether this hit took the agent down.
    fn absorb(&self, amount: u32) -> bool {
        let before = self
            .health
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |hp| (hp > 0).then(|| hp.saturating_sub(amount)));
        matches!(before, Ok(hp) if hp <= amount)
    }
}

/// The squad root, its agents and the tree linking them.
#[derive(Debug)]
pub struct Squad {
    pub owner: OwnerId,
    agents: Vec<Arc<Agent>>,
    graph: Arc<RwLock<SceneGraph>>,
    casualties: Arc<Mutex<Vec<ReceiverId>>>,
    damage_total: Arc<AtomicU64>,
}

impl Squad {
    /// Spawns `size` agents under [`SQUAD`] and connects every combat handler.
    ///
    /// # Errors
    /// Returns [`EventBusError::InvalidHierarchy`] if an agent cannot be attached under the root.
    pub(crate) fn spawn(bus: &EventBus, size: usize, health: u32) -> Result<Self, EventBusError> {
        bus.register_receiver(SQUAD);
        let mut graph = SceneGraph::new();
        let mut agents = Vec::with_capacity(size);
        for index in 0..size as u64 {
            let receiver = ReceiverId::new(SQUAD.raw() + 1 + index);
            bus.register_receiver(receiver);
            graph.attach(receiver, SQUAD)?;
            agents.push(Arc::new(Agent {
                receiver,
                owner: bus.create_owner(),
                health: AtomicU32::new(health),
                rounds_seen: AtomicU64::new(0),
            }));
        }

        let squad = Self {
            owner: bus.create_owner(),
            agents,
            graph: Arc::new(RwLock::new(graph)),
            casualties: Arc::new(Mutex::new(Vec::new())),
            damage_total: Arc::new(AtomicU64::new(0)),
        };
        for agent in &squad.agents {
            squad.connect_agent(bus, agent);
        }
        squad.connect_root(bus);
        info!(agents = size, health, "Squad spawned");
        Ok(squad)
    }

    fn connect_agent(&self, bus: &EventBus, agent: &Arc<Agent>) {
        let me = Arc::clone(agent);
        bus.connect_fn(agent.receiver, agent.owner, move |round: &RoundStarted| {
            me.rounds_seen.fetch_add(1, Ordering::AcqRel);
            debug!(agent = %me.receiver, round = round.round, "Agent ready");
        });

        let me = Arc::clone(agent);
        let handle = bus.clone();
        bus.connect_fn(agent.receiver, agent.owner, move |hit: &DamageDealt| {
            let downed = me.absorb(hit.amount);
            debug!(agent = %me.receiver, source = %hit.source, amount = hit.amount, health = me.health(), "Hit");
            handle.dispatch_scene(*hit);
            if downed {
                handle.dispatch_next_tick(SQUAD, AgentDowned { agent: me.receiver, by: hit.source });
            }
        });
    }

    fn connect_root(&self, bus: &EventBus) {
        let total = Arc::clone(&self.damage_total);
        bus.connect_scene(
            self.owner,
            &Handler::new(move |hit: &DamageDealt| {
                total.fetch_add(u64::from(hit.amount), Ordering::AcqRel);
            }),
        );

        let agents = self.agents.clone();
        let graph = Arc::clone(&self.graph);
        let casualties = Arc::clone(&self.casualties);
        let handle = bus.clone();
        bus.connect_fn(SQUAD, self.owner, move |down: &AgentDowned| {
            info!(agent = %down.agent, by = %down.by, "Agent downed");
            casualties.lock().push(down.agent);
            graph.write().remove(down.agent);
            if let Some(agent) = agents.iter().find(|agent| agent.receiver == down.agent) {
                handle.destroy_owner(agent.owner);
            }
            handle.remove_receiver(down.agent);
        });
    }

    #[must_use]
    pub fn agents(&self) -> &[Arc<Agent>] {
        &self.agents
    }

    /// Agents still standing, in spawn order.
    #[must_use]
    pub fn alive(&self) -> Vec<Arc<Agent>> {
        self.agents.iter().filter(|agent| agent.is_alive()).cloned().collect()
    }

    #[must_use]
    pub fn casualties(&self) -> Vec<ReceiverId> {
        self.casualties.lock().clone()
    }

    #[must_use]
    pub fn damage_total(&self) -> u64 {
        self.damage_total.load(Ordering::Acquire)
    }

    /// Point-in-time copy of the squad tree.
    #[must_use]
    pub fn graph(&self) -> SceneGraph {
        self.graph.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_reports_the_fatal_hit_once() {
        let agent = Agent {
            receiver: ReceiverId::new(2),
            owner: EventBus::new().create_owner(),
            health: AtomicU32::new(10),
            rounds_seen: AtomicU64::new(0),
        };

        assert!(!agent.absorb(4));
        assert_eq!(agent.health(), 6);
        assert!(agent.absorb(6));
        assert!(!agent.is_alive());
        assert!(!agent.absorb(1));
    }

    #[test]
    fn spawn_builds_the_tree() {
        let bus = EventBus::new();
        let squad = Squad::spawn(&bus, 3, 5).unwrap();

        let receivers: Vec<_> = squad.agents().iter().map(|agent| agent.receiver).collect();
        assert_eq!(squad.graph().descendants(SQUAD), receivers);
        assert_eq!(bus.subscriber_count::<AgentDowned>(SQUAD), 1);
        bus.shutdown();
    }
}
