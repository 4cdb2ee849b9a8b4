//! Leader logic for the Intrigue engine.
//!
//! This crate contains everything that operates on leaders and territories
//! without knowing about faction strategy: the detection model, the
//! clandestine action library, the per-leader detection state machine, the
//! clandestine resolution pass, the governor policy state machine and the
//! tracked world copy those passes mutate. It sits between `intrigue-types`
//! (the data) and `intrigue-core` (scoring, assignment and the turn
//! orchestrator).
//!
//! # Modules
//!
//! - [`actions`] -- One effect processor per clandestine action, plus costs.
//! - [`clandestine`] -- The per-turn clandestine pass and log consolidation.
//! - [`config`] -- Tunables ([`ClandestineConfig`], [`GovernorConfig`]).
//! - [`detection`] -- Per-leader detection and capture state machine.
//! - [`error`] -- Error types ([`AgentError`]).
//! - [`governor`] -- Governor policy state machine.
//! - [`planning`] -- Risk-aware selection of minor sabotage actions.
//! - [`risk`] -- Detection threshold and capture risk.
//! - [`state_manager`] -- Tracked world copy and turn change-set.
//!
//! # Randomness
//!
//! Every roll goes through a caller-supplied `rand::Rng`. Seeding that RNG
//! makes a turn reproducible.

pub mod actions;
pub mod clandestine;
pub mod config;
pub mod detection;
pub mod error;
pub mod governor;
pub mod planning;
pub mod risk;
pub mod state_manager;

pub use actions::{ActionContext, ActionEffect, Disposition, LocationDelta, process_action};
pub use clandestine::{ClandestineReport, ClandestineTurnProcessor, consolidate_logs};
pub use config::{ClandestineConfig, GovernorConfig};
pub use detection::{DetectionContext, DetectionOutcome, LeaderTurn, advance_leader};
pub use error::AgentError;
pub use governor::{GovernorPolicyEngine, PolicyChange, activate_full_time, clear_full_time};
pub use planning::plan_minor_actions;
pub use risk::{RiskAssessment, RiskInputs, capture_risk, detection_threshold, stealth_level};
pub use state_manager::{LeaderStateManager, TurnDelta};
