//! The turn orchestrator.
//!
//! One call to [`TurnOrchestrator::run_turn`] advances the world by a turn.
//! Factions are processed strictly in id order, each seeing the committed
//! changes of the previous one:
//!
//! 1. travel resolution (every configured faction);
//! 2. for AI factions only:
//!    - the opening decision (turn 1 earmarks `opening_budget`);
//!    - budget normalization (the earmark never exceeds
//!      `max_clandestine_share_pct` of the treasury);
//!    - continuation of existing missions: exfiltrate agents whose capture
//!      risk is over the faction's tolerance or who have nothing left to
//!      do, re-plan agents who still carry a budget;
//!    - evacuation of leaders stranded in foreign territory;
//!    - territory analysis, role assignment and role execution.
//!
//! Then the governor policy pass and the clandestine pass run once over the
//! whole world, and the [`LeaderStateManager`] hands back the new world and
//! the change-set.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use tracing::{debug, info, warn};

use intrigue_agents::{
    AgentError, ClandestineConfig, ClandestineReport, ClandestineTurnProcessor,
    GovernorPolicyEngine, LeaderStateManager, PolicyChange, RiskAssessment, RiskInputs,
    TurnDelta, plan_minor_actions,
};
use intrigue_types::{
    FactionId, LeaderId, LeaderStatus, LocationId, LogEntry, PERCENT_MAX, Severity,
    TravelPurpose, WorldState,
};

use crate::analysis::analyze;
use crate::assignment::{AssignmentContext, AssignmentPlan, assign_roles};
use crate::config::{ConfigError, FactionStrategy, ScoringConfig, SimulationConfig, StrategyBook};
use crate::execution::{ExecutionContext, execute_plan, resolve_travel};
use crate::travel::{RoadNetwork, TravelTime, nearest_friendly};

/// Errors that end a turn.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// The configuration does not cover the world.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A direct request named an entity that is gone or refused.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// No friendly territory can be reached from where the leader stands.
    #[error("no friendly territory reachable for leader {0}")]
    NoRefuge(LeaderId),
}

/// Everything a turn produced.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The world after the turn.
    pub world: WorldState,
    /// What changed.
    pub delta: TurnDelta,
    /// Role assignments per AI faction.
    pub plans: BTreeMap<FactionId, AssignmentPlan>,
    /// Agents pulled out this turn.
    pub exfiltrated: Vec<LeaderId>,
    /// Stranded leaders sent home this turn.
    pub evacuated: Vec<LeaderId>,
    /// Tally of the clandestine pass.
    pub clandestine: ClandestineReport,
    /// Governor policies switched this turn.
    pub policy_changes: Vec<PolicyChange>,
}

/// Drives whole turns.
#[derive(Debug, Clone)]
pub struct TurnOrchestrator<T = RoadNetwork> {
    strategies: StrategyBook,
    clandestine: ClandestineConfig,
    scoring: ScoringConfig,
    governor: GovernorPolicyEngine,
    travel: T,
}

impl TurnOrchestrator<RoadNetwork> {
    /// An orchestrator using road travel times, built from `config`.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.strategy_book()?,
            config.clandestine.clone(),
            config.scoring.clone(),
            GovernorPolicyEngine::new(config.governor.clone()),
            RoadNetwork,
        ))
    }
}

impl<T: TravelTime> TurnOrchestrator<T> {
    /// Create an orchestrator with an explicit travel-time oracle.
    pub const fn new(
        strategies: StrategyBook,
        clandestine: ClandestineConfig,
        scoring: ScoringConfig,
        governor: GovernorPolicyEngine,
        travel: T,
    ) -> Self {
        Self {
            strategies,
            clandestine,
            scoring,
            governor,
            travel,
        }
    }

    /// The faction strategies in use.
    pub const fn strategies(&self) -> &StrategyBook {
        &self.strategies
    }

    /// Advance `world` by one turn.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::Config`] when a faction present in the world
    /// has no strategy.
    pub fn run_turn(
        &self,
        world: WorldState,
        rng: &mut impl Rng,
    ) -> Result<TurnOutcome, TurnError> {
        self.check_factions(&world)?;
        let turn = world.turn;
        info!(turn, "turn started");

        let mut manager = LeaderStateManager::new(world);
        let mut plans = BTreeMap::new();
        let mut exfiltrated = Vec::new();
        let mut evacuated = Vec::new();

        for faction in self.strategies.factions() {
            let strategy = self.strategies.strategy(faction)?;
            let ctx = ExecutionContext {
                strategy,
                clandestine: &self.clandestine,
                governor: &self.governor,
            };
            let arrived = resolve_travel(&mut manager, faction, &ctx);
            if !arrived.is_empty() {
                debug!(faction = %faction, arrived = arrived.len(), "travel resolved");
            }
            if !strategy.is_ai() {
                continue;
            }

            normalize_budget(&mut manager, strategy);
            exfiltrated.extend(self.continue_missions(&mut manager, strategy));
            evacuated.extend(self.evacuate_stranded(&mut manager, faction));

            let analysis = analyze(
                manager.world(),
                strategy,
                &self.clandestine,
                self.governor.config(),
            );
            let plan = assign_roles(&AssignmentContext {
                world: manager.world(),
                strategy,
                scoring: &self.scoring,
                clandestine: &self.clandestine,
                analysis: &analysis,
                travel: &self.travel,
            });
            execute_plan(&mut manager, &plan, &ctx);
            plans.insert(faction, plan);
        }

        let policy_changes = self.governor.update(&mut manager);
        let processor =
            ClandestineTurnProcessor::new(self.clandestine.clone(), self.strategies.ai_factions());
        let clandestine = processor.run(&mut manager, rng);

        let (world, delta) = manager.finish();
        info!(
            turn,
            leaders_changed = delta.leaders.len(),
            locations_changed = delta.locations.len(),
            armies_spawned = delta.spawned_armies.len(),
            logs = delta.logs.len(),
            "turn finished"
        );
        Ok(TurnOutcome {
            world,
            delta,
            plans,
            exfiltrated,
            evacuated,
            clandestine,
            policy_changes,
        })
    }

    /// Pull `leader_id` out of its mission toward the nearest friendly
    /// territory. Returns the destination.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::NoRefuge`] when no friendly territory can be
    /// reached, and [`TurnError::Agent`] when the leader is unknown or
    /// cannot leave yet.
    pub fn exfiltrate(
        &self,
        manager: &mut LeaderStateManager,
        leader_id: LeaderId,
    ) -> Result<LocationId, TurnError> {
        let leader = manager
            .leader(leader_id)
            .ok_or(AgentError::LeaderNotFound(leader_id))?;
        let (destination, turns) =
            nearest_friendly(&self.travel, manager.world(), leader.location, leader.faction)
                .ok_or(TurnError::NoRefuge(leader_id))?;
        let (faction, name) = (leader.faction, leader.name.clone());
        let refund = manager.exfiltrate(leader_id, destination, turns, &self.clandestine)?;
        manager.push_log(
            LogEntry::to_faction(
                manager.turn(),
                Severity::Warning,
                faction,
                format!("{name} abandons the mission and heads home with {refund} gold"),
            )
            .about(leader_id),
        );
        Ok(destination)
    }

    // -----------------------------------------------------------------------
    // Per-faction steps
    // -----------------------------------------------------------------------

    fn check_factions(&self, world: &WorldState) -> Result<(), ConfigError> {
        let present: BTreeSet<FactionId> = world
            .leaders
            .values()
            .map(|l| l.faction)
            .chain(world.locations.values().map(|l| l.faction))
            .filter(|f| !f.is_neutral())
            .collect();
        for faction in present {
            self.strategies.strategy(faction)?;
        }
        Ok(())
    }

    /// Exfiltrate or re-plan the faction's agents. Returns the exfiltrated.
    fn continue_missions(
        &self,
        manager: &mut LeaderStateManager,
        strategy: &FactionStrategy,
    ) -> Vec<LeaderId> {
        let agents: Vec<LeaderId> = manager
            .world()
            .leaders_of(strategy.faction)
            .filter(|l| l.status.is_clandestine())
            .map(|l| l.id)
            .collect();

        let mut pulled = Vec::new();
        for leader_id in agents {
            let Some(leader) = manager.leader(leader_id).cloned() else {
                continue;
            };
            let inputs = RiskInputs::effective(manager.world(), &leader, true);
            let risk = RiskAssessment::assess(&leader, inputs, &self.clandestine).capture_risk;
            let idle =
                leader.status == LeaderStatus::Undercover && leader.active_actions.is_empty();

            let mut leave =
                risk > strategy.max_capture_risk || (idle && leader.clandestine_budget == 0);
            if !leave && idle {
                let Some(location) = manager.location(leader.location).cloned() else {
                    continue;
                };
                let actions = plan_minor_actions(
                    &leader,
                    &location,
                    inputs,
                    leader.detection_level,
                    leader.clandestine_budget,
                    strategy.min_safe_turns,
                    &self.clandestine,
                );
                if actions.is_empty() {
                    leave = true;
                } else {
                    debug!(leader = %leader_id, actions = actions.len(), "agent re-planned");
                    let planned = manager.update_leader(leader_id, |l| l.active_actions = actions);
                    if let Err(err) = planned {
                        warn!(error = %err, "agent vanished while re-planning");
                    }
                }
            }
            if !leave {
                continue;
            }
            match self.exfiltrate(manager, leader_id) {
                Ok(destination) => {
                    info!(leader = %leader_id, risk, destination = %destination, "agent exfiltrated");
                    pulled.push(leader_id);
                }
                Err(TurnError::Agent(AgentError::ExfiltrationRefused { reason, .. })) => {
                    debug!(leader = %leader_id, risk, %reason, "agent stays on mission");
                }
                Err(err) => warn!(leader = %leader_id, error = %err, "exfiltration skipped"),
            }
        }
        pulled
    }

    /// Send available leaders standing in foreign territory home.
    fn evacuate_stranded(
        &self,
        manager: &mut LeaderStateManager,
        faction: FactionId,
    ) -> Vec<LeaderId> {
        let world = manager.world();
        let stranded: Vec<(LeaderId, LocationId, u32)> = world
            .leaders_of(faction)
            .filter(|l| l.status == LeaderStatus::Available)
            .filter(|l| l.army.is_none() && l.protecting.is_none())
            .filter(|l| {
                world
                    .locations
                    .get(&l.location)
                    .is_some_and(|loc| loc.faction != faction)
            })
            .filter_map(|l| {
                nearest_friendly(&self.travel, world, l.location, faction)
                    .map(|(destination, turns)| (l.id, destination, turns))
            })
            .collect();

        let mut sent = Vec::new();
        for (leader_id, destination, turns) in stranded {
            match manager.begin_travel(leader_id, destination, turns, TravelPurpose::Evacuate) {
                Ok(()) => {
                    debug!(leader = %leader_id, destination = %destination, turns, "leader evacuated");
                    sent.push(leader_id);
                }
                Err(err) => warn!(leader = %leader_id, error = %err, "evacuation skipped"),
            }
        }
        sent
    }
}

/// Opening decision and budget normalization.
fn normalize_budget(manager: &mut LeaderStateManager, strategy: &FactionStrategy) {
    let faction = strategy.faction;
    let treasury = manager.world().resources_of(faction);
    let mut budget = treasury.clandestine_budget;
    if manager.turn() <= 1 && strategy.opening_budget > 0 {
        budget = budget.saturating_add(strategy.opening_budget);
        info!(faction = %faction, opening = strategy.opening_budget, "opening budget granted");
    }
    let share = u64::from(treasury.gold)
        .saturating_mul(u64::from(strategy.max_clandestine_share_pct))
        .checked_div(u64::from(PERCENT_MAX))
        .unwrap_or(0);
    let cap = u32::try_from(share).unwrap_or(u32::MAX);
    manager.earmark(faction, budget.min(cap));
}
