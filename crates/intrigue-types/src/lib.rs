//! Shared type definitions for the Intrigue covert-leader engine.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace. Every type is serde-serializable so world snapshots can be
//! written and read back by external collaborators.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe identifier wrappers for all entities
//! - [`enums`] -- Closed vocabularies (status, abilities, policies, actions)
//! - [`structs`] -- Leaders, territories, armies, roads, actions, logs
//! - [`world`] -- The id-keyed [`WorldState`] arena

pub mod enums;
pub mod ids;
pub mod structs;
pub mod world;

pub use enums::{
    Ability, ActionKind, AffinityTier, DetectionType, GovernorPolicy, LeaderStatus, LeaderTrait,
    LocationType, RoleKind, Severity,
};
pub use ids::{ArmyId, FactionId, LeaderId, LocationId, RoadId};
pub use structs::{
    ActiveClandestineAction, AlertFlags, Army, ClandestineAction, ClandestineMission,
    DEFAULT_STAT_LEVEL, FactionResources, Leader, LeaderStats, Location, LogEntry, PERCENT_MAX,
    ResourceDelta, Road, Travel, TravelPurpose,
};
pub use world::WorldState;
