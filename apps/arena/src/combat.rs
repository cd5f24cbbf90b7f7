//! Combat events exchanged between the squad and its agents.

use stratus::events::ReceiverId;

/// Broadcast down the squad tree at the start of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundStarted {
    pub round: u64,
}

/// Sent to the struck agent, then echoed on the scene channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageDealt {
    pub source: ReceiverId,
    pub target: ReceiverId,
    pub amount: u32,
}

/// Sent to the squad one tick after an agent's health reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentDowned {
    pub agent: ReceiverId,
    pub by: ReceiverId,
}
