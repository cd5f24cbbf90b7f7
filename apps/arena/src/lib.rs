//! # Stratus Arena
//!
//! A small frame-driven host for the event bus: a squad of agents trades blows,
//! one strike per frame, until the configured number of frames has run.
//!
//! ## Example
//! ```no_run
//! use stratus_arena::Arena;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let report = Arena::builder().squad_size(4).build()?.run().await;
//!     println!("{} casualties", report.casualties.len());
//!     Ok(())
//! }
//! ```

pub mod combat;
pub mod squad;

use crate::combat::{DamageDealt, RoundStarted};
use crate::squad::{SQUAD, Squad};
use anyhow::{Context, Result, bail};
use std::time::Duration;
use stratus::domain::config::ArenaConfig;
use stratus::events::{BusStats, EventBus, ReceiverId};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

/// A fluent builder for configuring and initializing the [`Arena`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ArenaBuilder {
    cfg: ArenaConfig,
    bus: Option<EventBus>,
}

impl ArenaBuilder {
    pub fn config(mut self, cfg: ArenaConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Runs on an existing bus instead of a fresh default one.
    pub fn bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub const fn frames(mut self, frames: u64) -> Self {
        self.cfg.frames = frames;
        self
    }

    pub const fn squad_size(mut self, size: usize) -> Self {
        self.cfg.squad_size = size;
        self
    }

    /// Consumes the builder and spawns the squad.
    ///
    /// # Errors
    /// Returns an error if the squad is empty, agents start without health, the bus is
    /// already shut down, or the scene graph rejects an agent.
    pub fn build(self) -> Result<Arena> {
        if self.cfg.squad_size == 0 {
            bail!("arena.squad_size must be greater than zero");
        }
        if self.cfg.agent_health == 0 {
            bail!("arena.agent_health must be greater than zero");
        }

        let bus = self.bus.unwrap_or_default();
        if bus.is_shutting_down() {
            bail!("cannot build an arena on a bus that has been shut down");
        }

        let squad = Squad::spawn(&bus, self.cfg.squad_size, self.cfg.agent_health)?;
        info!(frames = self.cfg.frames, frame_millis = self.cfg.frame_millis, "Arena ready");
        Ok(Arena { cfg: self.cfg, bus, squad, frame: 0 })
    }
}

/// Outcome of a finished arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaReport {
    pub frames: u64,
    pub casualties: Vec<ReceiverId>,
    pub survivors: usize,
    pub damage_total: u64,
    pub stats: BusStats,
}

/// A spawned squad and the bus it fights on.
#[derive(Debug)]
pub struct Arena {
    cfg: ArenaConfig,
    bus: EventBus,
    squad: Squad,
    frame: u64,
}

impl Arena {
    pub fn builder() -> ArenaBuilder {
        ArenaBuilder::default()
    }

    #[must_use]
    pub const fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[must_use]
    pub const fn squad(&self) -> &Squad {
        &self.squad
    }

    /// Runs one frame: announce the round, land one strike, then advance the bus tick.
    ///
    /// Returns the number of deferred dispatches the tick executed.
    pub fn step(&mut self) -> usize {
        let round = self.frame;
        self.frame += 1;

        let graph = self.squad.graph();
        let reached = self.bus.dispatch_to_children(&graph, SQUAD, RoundStarted { round });
        debug!(round, reached, "Round started");

        let alive = self.squad.alive();
        if alive.len() >= 2 {
            let len = alive.len() as u64;
            let source = &alive[usize::try_from(round % len).unwrap_or_default()];
            let target = &alive[usize::try_from((round + 1) % len).unwrap_or_default()];
            self.bus.dispatch(
                target.receiver,
                DamageDealt { source: source.receiver, target: target.receiver, amount: self.cfg.strike_damage },
            );
        } else {
            debug!(round, alive = alive.len(), "No opponents left");
        }

        self.bus.tick()
    }

    /// Drives every configured frame on a fixed interval, then shuts the bus down.
    pub async fn run(mut self) -> ArenaReport {
        let mut ticker = interval(Duration::from_millis(self.cfg.frame_millis.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.frame < self.cfg.frames {
            ticker.tick().await;
            self.step();
        }
        self.finish()
    }

    /// Shuts the bus down and summarizes the fight.
    pub fn finish(self) -> ArenaReport {
        let stats = self.bus.stats();
        let report = ArenaReport {
            frames: self.frame,
            casualties: self.squad.casualties(),
            survivors: self.squad.alive().len(),
            damage_total: self.squad.damage_total(),
            stats,
        };
        let receivers = self.bus.shutdown();
        if receivers == 0 {
            warn!("Bus was already shut down before the arena finished");
        }
        info!(
            frames = report.frames,
            casualties = report.casualties.len(),
            survivors = report.survivors,
            damage = report.damage_total,
            "Arena finished"
        );
        report
    }
}

/// Builds an arena from configuration with context on failure.
///
/// # Errors
/// Returns an error if the arena settings are invalid.
pub fn from_config(cfg: ArenaConfig, bus: EventBus) -> Result<Arena> {
    Arena::builder().config(cfg).bus(bus).build().context("Failed to build arena")
}
