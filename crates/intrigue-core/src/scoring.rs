//! Role scoring: turns (leader, role, target) triples into comparable scores.
//!
//! Every unreserved leader gets one [`RoleAssignment`] candidate per role
//! and target it could take this turn. Scores are plain `f64` points on one
//! scale so the assignment engine can sort them together:
//!
//! - **Governance**: `base + 15 * statesmanship_ordinal + 5 * stability_per_turn`
//!   plus MANAGER and MAN OF CHURCH bonuses, minus a penalty below
//!   "Capable". Only the leader's territory and its linked territory are
//!   considered; MAN OF ACTION leaders never govern.
//! - **Clandestine**: a value-per-gold estimate (IPG) scaled by
//!   `ipg_scale * ipg_multiplier`, minus a per-turn travel penalty.
//! - **Commander**: army strength, doubled while a campaign is active.
//!   Travel only breaks ties.
//! - **Protector**: a flat base for guarding a leader whose assassination
//!   has been uncovered.
//!
//! On top of the role value every candidate gains the at-target bonus when
//! the leader already stands there and the affinity bonus of its tier. VIP
//! leaders lose [`ScoringConfig::vip_penalty`] on clandestine roles unless
//! they are the only leaders left.

use std::fmt::Write as _;

use serde::Serialize;
use tracing::debug;

use intrigue_agents::actions::{assassination, costs, insurrection};
use intrigue_agents::{ClandestineConfig, RiskInputs, plan_minor_actions};
use intrigue_types::{
    Ability, ActionKind, AffinityTier, ArmyId, ClandestineAction, ClandestineMission,
    DEFAULT_STAT_LEVEL, GovernorPolicy, Leader, LeaderId, LeaderStatus, LeaderTrait, Location,
    LocationId, LocationType, RoleKind, WorldState,
};

use crate::analysis::TerritoryAnalysis;
use crate::config::{FactionStrategy, ScoringConfig};
use crate::travel::{TravelTime, turns_between};

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// A role with its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    /// Govern a friendly territory.
    Governor {
        /// The territory.
        location: LocationId,
        /// Full-time policy to activate, if any.
        policy: Option<GovernorPolicy>,
    },
    /// Govern a restless territory under `STABILIZE_REGION`.
    Stabilizer {
        /// The territory.
        location: LocationId,
    },
    /// Run a clandestine mission in enemy territory.
    Clandestine {
        /// The target territory.
        location: LocationId,
        /// The mission and its gold.
        mission: ClandestineMission,
    },
    /// Take command of an army.
    Commander {
        /// The army.
        army: ArmyId,
        /// Where the army stands.
        location: LocationId,
    },
    /// Guard a threatened leader.
    Protector {
        /// The leader to guard.
        leader: LeaderId,
        /// Where that leader stands.
        location: LocationId,
    },
    /// No role this turn.
    Idle,
}

impl Role {
    /// The payload-free kind of this role.
    pub const fn kind(&self) -> RoleKind {
        match self {
            Self::Governor { .. } => RoleKind::Governor,
            Self::Stabilizer { .. } => RoleKind::Stabilizer,
            Self::Clandestine { .. } => RoleKind::Clandestine,
            Self::Commander { .. } => RoleKind::Commander,
            Self::Protector { .. } => RoleKind::Protector,
            Self::Idle => RoleKind::Idle,
        }
    }

    /// Where the role is carried out.
    pub const fn location(&self) -> Option<LocationId> {
        match self {
            Self::Governor { location, .. }
            | Self::Stabilizer { location }
            | Self::Clandestine { location, .. }
            | Self::Commander { location, .. }
            | Self::Protector { location, .. } => Some(*location),
            Self::Idle => None,
        }
    }

    /// Whether the role governs a territory.
    pub const fn is_governance(&self) -> bool {
        matches!(self, Self::Governor { .. } | Self::Stabilizer { .. })
    }

    /// Gold the role takes from the faction's clandestine budget.
    pub const fn gold(&self) -> u32 {
        match self {
            Self::Clandestine { mission, .. } => mission.gold(),
            _ => 0,
        }
    }
}

/// A scored (leader, role) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleAssignment {
    /// The leader.
    pub leader: LeaderId,
    /// The role and its target.
    pub role: Role,
    /// Score; higher is better.
    pub score: f64,
    /// Gold allocated from the clandestine budget.
    pub gold: u32,
    /// Turns of travel to the target.
    pub travel_turns: u32,
    /// Whether the leader already stands at the target.
    pub located: bool,
    /// The leader's affinity with the role.
    pub tier: AffinityTier,
    /// Short explanation, for diagnostics.
    pub justification: String,
}

impl RoleAssignment {
    /// An idle assignment.
    pub fn idle(leader: LeaderId, justification: impl Into<String>) -> Self {
        Self {
            leader,
            role: Role::Idle,
            score: 0.0,
            gold: 0,
            travel_turns: 0,
            located: true,
            tier: AffinityTier::None,
            justification: justification.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything scoring reads for one faction.
#[derive(Clone, Copy)]
pub struct ScoringContext<'a> {
    /// The world as the faction sees it.
    pub world: &'a WorldState,
    /// The faction's strategy.
    pub strategy: &'a FactionStrategy,
    /// Score weights.
    pub scoring: &'a ScoringConfig,
    /// Action tunables.
    pub clandestine: &'a ClandestineConfig,
    /// Territory analysis of this turn.
    pub analysis: &'a TerritoryAnalysis,
    /// Travel-time oracle.
    pub travel: &'a dyn TravelTime,
    /// Clandestine budget still available to the faction.
    pub budget: u32,
    /// Every unreserved leader is a VIP, so none is penalised.
    pub vip_only: bool,
}

impl std::fmt::Debug for ScoringContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringContext")
            .field("faction", &self.strategy.faction)
            .field("budget", &self.budget)
            .field("vip_only", &self.vip_only)
            .finish_non_exhaustive()
    }
}

impl ScoringContext<'_> {
    fn travel_turns(&self, from: LocationId, to: LocationId) -> Option<u32> {
        turns_between(self.travel, self.world, from, to)
    }

    /// Bonuses common to every role: at-target and affinity.
    fn finish(
        &self,
        leader: &Leader,
        role: Role,
        value: f64,
        travel_turns: u32,
        justification: String,
    ) -> RoleAssignment {
        let tier = self.strategy.affinity(&leader.name, role.kind());
        let located = role.location().is_some_and(|l| l == leader.location);
        let mut score = value + ScoringConfig::affinity_bonus(tier);
        if located {
            score += self.scoring.at_target_bonus;
        }
        RoleAssignment {
            leader: leader.id,
            role,
            score,
            gold: role.gold(),
            travel_turns,
            located,
            tier,
            justification,
        }
    }
}

// ---------------------------------------------------------------------------
// Governance
// ---------------------------------------------------------------------------

/// Governance score of a leader; `None` for MAN OF ACTION.
pub fn governance_score(leader: &Leader, scoring: &ScoringConfig) -> Option<f64> {
    if leader.has_trait(LeaderTrait::ManOfAction) {
        return None;
    }
    let stats = &leader.stats;
    let mut score = scoring.governor_base
        + f64::from(stats.statesmanship_ordinal()) * scoring.statesmanship_weight
        + f64::from(stats.stability_per_turn()) * scoring.stability_per_turn_weight;
    if leader.has_ability(Ability::Manager) {
        score += scoring.manager_bonus;
    }
    if leader.has_ability(Ability::ManOfChurch) {
        score += scoring.church_bonus;
    }
    if stats.statesmanship() < DEFAULT_STAT_LEVEL {
        score -= scoring.low_statesmanship_penalty;
    }
    Some(score)
}

fn governance_candidates(ctx: &ScoringContext<'_>, leader: &Leader) -> Vec<RoleAssignment> {
    let Some(base) = governance_score(leader, ctx.scoring) else {
        return Vec::new();
    };
    let here = ctx.world.locations.get(&leader.location);
    let targets = here
        .into_iter()
        .map(|l| l.id)
        .chain(here.and_then(|l| l.linked_location));

    let mut out = Vec::new();
    for target in targets {
        let Some(location) = ctx.world.locations.get(&target) else {
            continue;
        };
        if location.faction != ctx.strategy.faction || location.kind == LocationType::RoadStage {
            continue;
        }
        let governed = ctx
            .world
            .governor_at(target)
            .is_some_and(|g| g.id != leader.id);
        if governed {
            continue;
        }
        let Some(turns) = ctx.travel_turns(leader.location, target) else {
            continue;
        };
        let travel = ctx.scoring.travel_penalty_per_turn * f64::from(turns);

        let urgent = ctx.analysis.urgent_at(target);
        let policy = match urgent {
            Some(GovernorPolicy::HuntNetworks) => Some(GovernorPolicy::HuntNetworks),
            None if location.stability >= ctx.scoring.stabilizer_threshold => {
                Some(GovernorPolicy::ImproveEconomy)
            }
            _ => None,
        };
        out.push(ctx.finish(
            leader,
            Role::Governor { location: target, policy },
            base - travel,
            turns,
            format!("govern {} ({policy:?})", location.name),
        ));

        if location.stability < ctx.scoring.stabilizer_threshold {
            let unrest = ctx.scoring.stabilizer_threshold.saturating_sub(location.stability);
            out.push(ctx.finish(
                leader,
                Role::Stabilizer { location: target },
                base + f64::from(unrest) - travel,
                turns,
                format!("stabilize {} at {}", location.name, location.stability),
            ));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Clandestine
// ---------------------------------------------------------------------------

/// Gold committed to a Grand Insurrection with `budget` available.
pub const fn grand_insurrection_gold(budget: u32) -> u32 {
    if budget >= 1000 {
        500
    } else if budget >= 600 {
        400
    } else {
        300
    }
}

/// Expected insurgents of a Grand Insurrection by `leader` at `location`.
pub fn estimate_insurgents(
    leader: &Leader,
    location: &Location,
    gold: u32,
    config: &ClandestineConfig,
) -> u32 {
    let shock = config
        .insurrection_shock_per_ops
        .saturating_mul(leader.stats.ops());
    insurrection::grand_insurrection_insurgents(
        gold,
        location.population,
        location.stability.saturating_sub(shock),
        insurrection::resentment_factor(location, leader.faction),
        leader.has_ability(Ability::Firebrand),
        config,
    )
}

/// Effect points a minor action yields per turn for an agent with `ops`.
fn minor_points(action: ClandestineAction, ops: u32) -> u32 {
    match action {
        ClandestineAction::UndermineAuthorities | ClandestineAction::DistributePamphlets => {
            ops.saturating_mul(2)
        }
        _ => ops,
    }
}

/// Mission value per gold at `location`, with the gold and a description.
fn clandestine_options(
    ctx: &ScoringContext<'_>,
    leader: &Leader,
    location: &Location,
) -> Vec<(ClandestineMission, f64, String)> {
    let config = ctx.clandestine;
    let turn = ctx.world.turn;
    let mut out = Vec::new();

    let gi_gold = grand_insurrection_gold(ctx.budget);
    if location.kind != LocationType::RoadStage && gi_gold <= ctx.budget {
        let insurgents = estimate_insurgents(leader, location, gi_gold, config);
        out.push((
            ClandestineMission::GrandInsurrection { gold: gi_gold },
            f64::from(insurgents) / f64::from(gi_gold),
            format!("grand insurrection in {}: {insurgents} insurgents", location.name),
        ));
    }

    let incite_gold = ctx.strategy.incite_budget;
    if incite_gold > 0 && !insurrection::is_suppressed(location, turn, config) {
        let size = insurrection::neutral_uprising_size(location, leader.stats.ops(), config);
        if size > 0 {
            out.push((
                ClandestineMission::InciteNeutral { gold: incite_gold },
                f64::from(size) / f64::from(incite_gold),
                format!("incite {}: {size} rebels", location.name),
            ));
        }
    }

    let minor_gold = ctx.strategy.minor_budget;
    if minor_gold > 0 {
        let plan = plan_minor_actions(
            leader,
            location,
            RiskInputs::default(),
            0,
            minor_gold,
            ctx.strategy.min_safe_turns,
            config,
        );
        let per_turn_gold = costs::per_turn_gold(plan.iter().map(|a| a.action.kind()));
        if let Some(turns_funded) = minor_gold.checked_div(per_turn_gold) {
            let points = plan
                .iter()
                .fold(0_u32, |acc, a| acc.saturating_add(minor_points(a.action, leader.stats.ops())));
            let total = points.saturating_mul(turns_funded);
            out.push((
                ClandestineMission::MinorSabotage { gold: minor_gold },
                f64::from(total) / f64::from(minor_gold),
                format!("sabotage in {}: {} actions", location.name, plan.len()),
            ));
        }
    }

    let plot_gold = ctx.strategy.assassination_budget;
    if ctx.strategy.allow_assassination
        && plot_gold > 0
        && leader.may_perform(ActionKind::AssassinateLeader)
    {
        let governor = ctx
            .world
            .governor_at(location.id)
            .filter(|g| g.faction == location.faction && g.faction != leader.faction);
        if let Some(governor) = governor {
            let protected = ctx
                .world
                .leaders
                .values()
                .any(|l| l.is_alive() && l.protecting == Some(governor.id));
            let chance = assassination::success_chance(
                location.resentment_against(location.faction),
                plot_gold,
                location.stability,
                ctx.world.hostile_soldiers_at(location.id, leader.faction),
                protected,
            );
            if chance > 0 {
                let value = f64::from(chance) / 100.0 * ctx.scoring.assassination_value;
                out.push((
                    ClandestineMission::Assassination {
                        target: governor.id,
                        gold: plot_gold,
                    },
                    value / f64::from(plot_gold),
                    format!("assassinate {} ({chance}%)", governor.name),
                ));
            }
        }
    }
    out
}

fn clandestine_candidates(ctx: &ScoringContext<'_>, leader: &Leader) -> Vec<RoleAssignment> {
    let strategy = ctx.strategy;
    let vip = strategy.is_vip(&leader.name) && !ctx.vip_only;
    let mut out = Vec::new();

    for target in &ctx.analysis.enemy {
        let Some(location) = ctx.world.locations.get(target) else {
            continue;
        };
        let Some(turns) = ctx.travel_turns(leader.location, *target) else {
            continue;
        };
        let travel = ctx.scoring.travel_penalty_per_turn * f64::from(turns);
        for (mission, ipg, mut why) in clandestine_options(ctx, leader, location) {
            let mut value = ipg * ctx.scoring.ipg_scale * strategy.ipg_multiplier - travel;
            if vip {
                value -= ctx.scoring.vip_penalty;
                why.push_str(" [vip]");
            }
            let _ = write!(why, ", ipg {ipg:.2}");
            out.push(ctx.finish(
                leader,
                Role::Clandestine {
                    location: *target,
                    mission,
                },
                value,
                turns,
                why,
            ));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Commander and protector
// ---------------------------------------------------------------------------

fn commander_candidates(ctx: &ScoringContext<'_>, leader: &Leader) -> Vec<RoleAssignment> {
    let faction = ctx.strategy.faction;
    let campaign = if ctx.analysis.campaign_active {
        ctx.scoring.campaign_multiplier
    } else {
        1.0
    };
    let legendary = if leader.has_ability(Ability::Legendary) { 10.0 } else { 0.0 };
    let command = f64::from(leader.stats.command_bonus()) * 5.0 + legendary;

    let mut out = Vec::new();
    for army in ctx.world.armies.values() {
        if army.faction != faction {
            continue;
        }
        let led = army
            .commander
            .and_then(|c| ctx.world.leaders.get(&c))
            .is_some_and(|c| c.is_alive() && c.id != leader.id);
        if led {
            continue;
        }
        let Some(turns) = ctx.travel_turns(leader.location, army.location) else {
            continue;
        };
        let value = f64::from(army.strength) / 100.0 * campaign + command;
        out.push(ctx.finish(
            leader,
            Role::Commander {
                army: army.id,
                location: army.location,
            },
            value,
            turns,
            format!("command {} soldiers", army.strength),
        ));
    }
    out
}

fn protector_candidates(ctx: &ScoringContext<'_>, leader: &Leader) -> Vec<RoleAssignment> {
    let mut out = Vec::new();
    for threat in &ctx.analysis.threats {
        if threat.target == leader.id {
            continue;
        }
        let guarded = ctx
            .world
            .leaders
            .values()
            .any(|l| l.is_alive() && l.id != leader.id && l.protecting == Some(threat.target));
        if guarded {
            continue;
        }
        let Some(turns) = ctx.travel_turns(leader.location, threat.location) else {
            continue;
        };
        let travel = ctx.scoring.travel_penalty_per_turn * f64::from(turns);
        out.push(ctx.finish(
            leader,
            Role::Protector {
                leader: threat.target,
                location: threat.location,
            },
            ctx.scoring.protector_base - travel,
            turns,
            String::from("guard a threatened leader"),
        ));
    }
    out
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Every role `leader` could take this turn, scored.
pub fn score_leader(ctx: &ScoringContext<'_>, leader: &Leader) -> Vec<RoleAssignment> {
    if leader.status == LeaderStatus::Dead {
        return Vec::new();
    }
    let mut out = governance_candidates(ctx, leader);
    out.extend(clandestine_candidates(ctx, leader));
    out.extend(commander_candidates(ctx, leader));
    out.extend(protector_candidates(ctx, leader));
    for candidate in &out {
        debug!(
            leader = %leader.id,
            role = ?candidate.role.kind(),
            score = candidate.score,
            travel = candidate.travel_turns,
            "candidate scored"
        );
    }
    out
}
