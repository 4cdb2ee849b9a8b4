//! Faction strategy and turn orchestration for the Intrigue engine.
//!
//! Each AI faction looks at the world, scores every (leader, role) pair,
//! hands out roles greedily under its budget and mission cap, and puts the
//! chosen leaders to work. The turn orchestrator runs that for every faction
//! in id order and then lets the governor and clandestine passes from
//! `intrigue-agents` resolve the turn.
//!
//! # Modules
//!
//! - [`analysis`] -- Urgent needs, enemy targets and uncovered plots.
//! - [`assignment`] -- Reservation and greedy role assignment.
//! - [`config`] -- Loading `intrigue-config.yaml` and per-faction strategy.
//! - [`execution`] -- Carrying out assignments and resolving travel.
//! - [`scoring`] -- Role candidates and their scores.
//! - [`travel`] -- The [`TravelTime`] oracle and the road network.
//! - [`turn`] -- The [`TurnOrchestrator`].

pub mod analysis;
pub mod assignment;
pub mod config;
pub mod execution;
pub mod scoring;
pub mod travel;
pub mod turn;

pub use analysis::{TerritoryAnalysis, Threat, UrgentNeed, analyze};
pub use assignment::{AssignmentContext, AssignmentPlan, assign_roles};
pub use config::{
    ConfigError, Controller, FactionStrategy, LogFormat, LoggingConfig, RunConfig, ScoringConfig,
    SimulationConfig, StrategyBook,
};
pub use execution::{ExecutionContext, execute_assignment, execute_plan, resolve_travel, start_mission};
pub use scoring::{
    Role, RoleAssignment, ScoringContext, estimate_insurgents, governance_score,
    grand_insurrection_gold, score_leader,
};
pub use travel::{RoadNetwork, TravelTime, nearest_friendly, turns_between};
pub use turn::{TurnError, TurnOrchestrator, TurnOutcome};
