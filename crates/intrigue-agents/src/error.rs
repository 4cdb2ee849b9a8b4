//! Error types for the intrigue-agents crate.
//!
//! Missing entities met while resolving a turn are skipped with a `warn!`
//! trace, not reported here. These errors cover direct requests made through
//! the [`LeaderStateManager`](crate::LeaderStateManager), where the caller
//! named the entity and must learn that it is gone.

use intrigue_types::{ArmyId, LeaderId, LocationId};

/// Errors that can occur during leader state operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Leader with the given ID was not found in the world.
    #[error("leader not found: {0}")]
    LeaderNotFound(LeaderId),

    /// Location with the given ID was not found in the world.
    #[error("location not found: {0}")]
    LocationNotFound(LocationId),

    /// Army with the given ID was not found in the world.
    #[error("army not found: {0}")]
    ArmyNotFound(ArmyId),

    /// A mission asked for more gold than is available.
    #[error("insufficient budget for {leader}: wanted {requested} gold but only {available} available")]
    InsufficientBudget {
        /// The leader the gold was meant for.
        leader: LeaderId,
        /// Gold requested.
        requested: u32,
        /// Gold available.
        available: u32,
    },

    /// The leader cannot abandon their mission now.
    #[error("exfiltration refused for {leader}: {reason}")]
    ExfiltrationRefused {
        /// The leader that asked to leave.
        leader: LeaderId,
        /// Why the request was refused.
        reason: String,
    },
}
