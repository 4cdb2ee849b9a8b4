//! The clandestine action library.
//!
//! One effect processor per action kind. Each processor reads an
//! [`ActionContext`] and returns an [`ActionEffect`]: the world-state delta,
//! gold movements, spawned army or killed leader, game logs and what should
//! happen to the action next. Processors never touch the world; the
//! detection state machine applies their effects.
//!
//! # Submodules
//!
//! - [`costs`] -- Gold and detection footprint per action kind.
//! - [`undermine`] -- Stability sabotage.
//! - [`propaganda`] -- Resentment shifts (pamphlets, propaganda).
//! - [`theft`] -- Tax convoy attacks and granary theft.
//! - [`arson`] -- Crop field and urban fires.
//! - [`insurrection`] -- Neutral uprisings and the Grand Insurrection.
//! - [`assassination`] -- Plots against enemy leaders.

pub mod arson;
pub mod assassination;
pub mod costs;
pub mod insurrection;
pub mod propaganda;
pub mod theft;
pub mod undermine;

use std::collections::BTreeMap;

use rand::Rng;

use intrigue_types::{
    ActionKind, ActiveClandestineAction, Army, ClandestineAction, FactionId, Leader, LeaderId,
    Location, LogEntry, PERCENT_MAX, ResourceDelta, Severity,
};

use crate::config::ClandestineConfig;

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Everything an effect processor may read.
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    /// Current turn.
    pub turn: u32,
    /// The acting agent.
    pub leader: &'a Leader,
    /// Gold the agent still carries, after earlier actions this turn.
    pub budget: u32,
    /// The territory the agent operates in.
    pub location: &'a Location,
    /// Enemy governor of the territory, if any.
    pub governor: Option<&'a Leader>,
    /// `HuntNetworks` is active in the territory.
    pub hunt_networks: bool,
    /// Target of an assassination plot.
    pub target: Option<&'a Leader>,
    /// A protector guards the target.
    pub target_protected: bool,
    /// Soldiers in the territory not belonging to the agent's faction.
    pub hostile_soldiers: u32,
    /// Tunables.
    pub config: &'a ClandestineConfig,
}

impl ActionContext<'_> {
    /// The acting faction.
    pub const fn actor(&self) -> FactionId {
        self.leader.faction
    }

    /// The faction controlling the territory.
    pub const fn controller(&self) -> FactionId {
        self.location.faction
    }

    /// The agent's clandestine-ops level.
    pub fn ops(&self) -> u32 {
        self.leader.stats.ops()
    }

    /// A log for the acting faction about this action.
    pub fn actor_log(&self, kind: ActionKind, severity: Severity, message: String) -> LogEntry {
        LogEntry::to_faction(self.turn, severity, self.actor(), message)
            .at(self.location.id)
            .from_action(self.actor(), kind)
            .about(self.leader.id)
    }

    /// A log for the territory's controller about this action.
    pub fn defender_log(&self, kind: ActionKind, severity: Severity, message: String) -> LogEntry {
        LogEntry::to_faction(self.turn, severity, self.controller(), message)
            .at(self.location.id)
            .from_action(self.actor(), kind)
    }
}

// ---------------------------------------------------------------------------
// Effect
// ---------------------------------------------------------------------------

/// What happens to an action after this turn's processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Disposition {
    /// Keep the action active.
    #[default]
    Continue,
    /// Remove the action: its auto-disable condition holds.
    AutoDisable,
    /// Remove the action: it has resolved.
    Complete,
    /// Remove the action without effect, returning `refund` gold to the agent.
    Blocked {
        /// Gold returned to the agent's budget.
        refund: u32,
    },
}

impl Disposition {
    /// Whether the action leaves the agent's action set.
    pub const fn removes(self) -> bool {
        !matches!(self, Self::Continue)
    }
}

/// Signed change to a territory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationDelta {
    /// Stability change.
    pub stability: i64,
    /// Resentment change per faction.
    pub resentment: BTreeMap<FactionId, i64>,
    /// Population change.
    pub population: i64,
    /// Food stock change.
    pub food_stock: i64,
}

impl LocationDelta {
    /// Whether nothing changes.
    pub fn is_empty(&self) -> bool {
        self.stability == 0
            && self.population == 0
            && self.food_stock == 0
            && self.resentment.values().all(|v| *v == 0)
    }

    /// Apply the delta, clamping percentages to 0--100 and counts at 0.
    pub fn apply(&self, location: &mut Location) {
        location.stability = shift(location.stability, self.stability, PERCENT_MAX);
        for (faction, change) in &self.resentment {
            let current = location.resentment_against(*faction);
            location.set_resentment(*faction, shift(current, *change, PERCENT_MAX));
        }
        location.population = shift(location.population, self.population, u32::MAX);
        location.food_stock = shift(location.food_stock, self.food_stock, u32::MAX);
    }
}

/// Result of one action for one turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionEffect {
    /// Gold drawn from the agent's budget.
    pub gold_spent: u32,
    /// Change to the territory.
    pub location: LocationDelta,
    /// Resource changes per faction.
    pub resources: BTreeMap<FactionId, ResourceDelta>,
    /// Army raised by the action.
    pub spawned_army: Option<Army>,
    /// Leader killed by the action.
    pub killed_leader: Option<LeaderId>,
    /// The action was revealed to its target this turn.
    pub revealed: bool,
    /// Game logs.
    pub logs: Vec<LogEntry>,
    /// What happens to the action next.
    pub disposition: Disposition,
}

impl ActionEffect {
    /// An effect that only sets the disposition.
    pub fn with_disposition(disposition: Disposition) -> Self {
        Self {
            disposition,
            ..Self::default()
        }
    }

    /// Record a resource change for `faction`.
    pub fn credit(&mut self, faction: FactionId, delta: ResourceDelta) {
        self.resources.entry(faction).or_default().accumulate(delta);
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Process one active action for one turn.
///
/// Per-turn actions pay their gold first: an agent who cannot pay sees the
/// action auto-disabled without effect, and an action that empties the
/// budget auto-disables after its effect.
pub fn process_action(
    active: &ActiveClandestineAction,
    ctx: &ActionContext<'_>,
    rng: &mut impl Rng,
) -> ActionEffect {
    let kind = active.action.kind();
    if !ctx.leader.may_perform(kind) {
        return ActionEffect::with_disposition(Disposition::AutoDisable);
    }

    let cost = costs::gold_per_turn(kind);
    if cost > ctx.budget {
        return ActionEffect::with_disposition(Disposition::AutoDisable);
    }

    let mut effect = match active.action {
        ClandestineAction::UndermineAuthorities => undermine::undermine_authorities(ctx, rng),
        ClandestineAction::DistributePamphlets => propaganda::distribute_pamphlets(ctx),
        ClandestineAction::SpreadPropaganda => propaganda::spread_propaganda(ctx),
        ClandestineAction::AttackTaxConvoys => theft::attack_tax_convoys(ctx, rng),
        ClandestineAction::StealFromGranaries => theft::steal_from_granaries(ctx, rng),
        ClandestineAction::BurnCropFields => arson::burn_crop_fields(ctx, rng),
        ClandestineAction::StartUrbanFire => arson::start_urban_fire(ctx, rng),
        ClandestineAction::InciteNeutralInsurrections => {
            insurrection::incite_neutral(active, ctx, rng)
        }
        ClandestineAction::PrepareGrandInsurrection => {
            insurrection::prepare_grand_insurrection(active, ctx, rng)
        }
        ClandestineAction::AssassinateLeader { target } => {
            assassination::assassinate_leader(active, target, ctx, rng)
        }
    };

    effect.gold_spent = cost;
    if cost > 0 && ctx.budget == cost && effect.disposition == Disposition::Continue {
        effect.disposition = Disposition::AutoDisable;
    }
    effect
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Roll a percentage chance against a uniform `0..100` draw.
pub fn roll_pct(rng: &mut impl Rng, pct: u32) -> bool {
    rng.random_range(0..PERCENT_MAX) < pct
}

/// Shift `value` by a signed `delta`, clamped to `0..=max`.
pub fn shift(value: u32, delta: i64, max: u32) -> u32 {
    let shifted = i64::from(value).saturating_add(delta);
    let clamped = shifted.clamp(0, i64::from(max));
    u32::try_from(clamped).unwrap_or(0)
}

/// Signed difference `new - old`.
pub fn signed_diff(new: u32, old: u32) -> i64 {
    i64::from(new).saturating_sub(i64::from(old))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::{BTreeMap, BTreeSet};

    use intrigue_types::{FactionId, Leader, LeaderStats, Location, LocationId, LocationType};

    /// A controller-1 city with round figures.
    pub fn make_location(kind: LocationType) -> Location {
        Location {
            id: LocationId::new(),
            name: String::from("Drevna"),
            faction: FactionId(1),
            stability: 70,
            resentment: BTreeMap::new(),
            population: 100_000,
            gold_income: 50,
            food_stock: 60,
            food_consumption: 10,
            kind,
            linked_location: None,
            active_policies: BTreeSet::new(),
            last_make_examples_turn: None,
        }
    }

    /// A faction-2 agent with the given ops and discretion.
    pub fn make_agent(location: &Location, ops: u8, discretion: u8) -> Leader {
        let mut leader = Leader::new("Teodor", FactionId(2), location.id);
        leader.status = intrigue_types::LeaderStatus::Undercover;
        leader.clandestine_budget = 500;
        leader.stats = LeaderStats {
            clandestine_ops: Some(ops),
            discretion: Some(discretion),
            ..LeaderStats::default()
        };
        leader
    }
}
