//! Uprisings: Incite Neutral Insurrections and Prepare Grand Insurrection.
//!
//! # Incite Neutral Insurrections
//!
//! Two turns. The first turn warns the controller (critical); from the
//! second on, a neutral army of
//!
//! ```text
//! ceil(population * ops * (resentment + 1) / (divisor * (1 + stability / 100)))
//! ```
//!
//! rises, capped at `neutral_army_cap`. The divisor is `city_divisor` for
//! cities and `rural_divisor` for the countryside. `MakeExamples`, or its
//! cooldown, blocks the action and returns its gold.
//!
//! # Prepare Grand Insurrection
//!
//! A four-turn timer. On completion stability takes a `4 * ops` shock and
//!
//! ```text
//! floor((gold / 25) * (population / 100000) * (100 - stability) * resentment_factor) + 100
//! ```
//!
//! insurgents (x1.33 for FIREBRAND) leave the population and form an army of
//! the acting faction, led by the agent.

use rand::Rng;
use tracing::{debug, info};

use intrigue_types::{
    Ability, ActionKind, ActiveClandestineAction, Army, ArmyId, FactionId, GovernorPolicy,
    Location, LocationType, PERCENT_MAX, Severity,
};

use super::{ActionContext, ActionEffect, Disposition, signed_diff};
use crate::config::ClandestineConfig;

/// Population scale of the Grand Insurrection formula.
const POPULATION_SCALE: f64 = 100_000.0;

/// Lower bound of the resentment factor.
const MIN_RESENTMENT_FACTOR: f64 = 0.5;

/// Upper bound of the resentment factor.
const MAX_RESENTMENT_FACTOR: f64 = 1.5;

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

/// Whether `MakeExamples` suppresses uprisings at `location` on `turn`.
pub fn is_suppressed(location: &Location, turn: u32, config: &ClandestineConfig) -> bool {
    location.has_policy(GovernorPolicy::MakeExamples)
        || location
            .last_make_examples_turn
            .is_some_and(|last| turn.saturating_sub(last) < config.make_examples_cooldown)
}

/// Size of a neutral uprising raised by an agent with `ops`.
pub fn neutral_uprising_size(location: &Location, ops: u32, config: &ClandestineConfig) -> u32 {
    let divisor = match location.kind {
        LocationType::City => config.city_divisor,
        LocationType::Rural => config.rural_divisor,
        LocationType::RoadStage => return 0,
    };
    let resentment = location.resentment_against(location.faction);
    let numerator = u64::from(location.population)
        .saturating_mul(u64::from(ops))
        .saturating_mul(u64::from(resentment).saturating_add(1))
        .saturating_mul(u64::from(PERCENT_MAX));
    let denominator = divisor.saturating_mul(u64::from(PERCENT_MAX.saturating_add(location.stability)));
    if denominator == 0 {
        return 0;
    }
    let size = numerator.div_ceil(denominator);
    u32::try_from(size)
        .unwrap_or(u32::MAX)
        .min(config.neutral_army_cap)
}

/// `clamp((50 + resentment_vs_controller - resentment_vs_actor) / 100, 0.5, 1.5)`.
pub fn resentment_factor(location: &Location, actor: FactionId) -> f64 {
    let against_controller = f64::from(location.resentment_against(location.faction));
    let against_actor = f64::from(location.resentment_against(actor));
    ((50.0 + against_controller - against_actor) / 100.0)
        .clamp(MIN_RESENTMENT_FACTOR, MAX_RESENTMENT_FACTOR)
}

/// Insurgents raised by a Grand Insurrection.
///
/// `stability` is the stability after the outbreak shock.
pub fn grand_insurrection_insurgents(
    gold: u32,
    population: u32,
    stability: u32,
    resentment_factor: f64,
    firebrand: bool,
    config: &ClandestineConfig,
) -> u32 {
    let divisor = config.insurgent_gold_divisor.max(1);
    let unrest = f64::from(PERCENT_MAX.saturating_sub(stability));
    let raw = (f64::from(gold) / f64::from(divisor))
        * (f64::from(population) / POPULATION_SCALE)
        * unrest
        * resentment_factor;
    let mut count = raw.floor() + f64::from(config.insurgent_base);
    if firebrand {
        count = (count * config.firebrand_multiplier).floor();
    }
    saturating_u32(count)
}

/// Convert a non-negative float to `u32`, saturating at the bounds.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn saturating_u32(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        value as u32
    }
}

// ---------------------------------------------------------------------------
// Processors
// ---------------------------------------------------------------------------

/// Resolve one turn of incitement.
pub fn incite_neutral(
    active: &ActiveClandestineAction,
    ctx: &ActionContext<'_>,
    rng: &mut impl Rng,
) -> ActionEffect {
    let kind = ActionKind::InciteNeutralInsurrections;

    if is_suppressed(ctx.location, ctx.turn, ctx.config) {
        let refund = active.one_time_gold.unwrap_or(0);
        let mut effect = ActionEffect::with_disposition(Disposition::Blocked { refund });
        effect.logs.push(ctx.actor_log(
            kind,
            Severity::Warning,
            format!(
                "Public punishments in {} have cowed the crowds; {} calls off the uprising",
                ctx.location.name, ctx.leader.name
            ),
        ));
        return effect;
    }

    let elapsed = active.elapsed(ctx.turn);
    if elapsed < ctx.config.incite_turns.saturating_sub(1) {
        let mut effect = ActionEffect::default();
        if elapsed == 0 {
            effect.logs.push(ctx.defender_log(
                kind,
                Severity::Critical,
                format!("Unrest is brewing in {}: an uprising is imminent", ctx.location.name),
            ));
            effect.logs.push(ctx.actor_log(
                kind,
                Severity::Info,
                format!("{} is stirring up the people of {}", ctx.leader.name, ctx.location.name),
            ));
        }
        return effect;
    }

    let size = neutral_uprising_size(ctx.location, ctx.ops(), ctx.config);
    let mut effect = ActionEffect::with_disposition(Disposition::Complete);
    if size == 0 {
        effect.logs.push(ctx.actor_log(
            kind,
            Severity::Info,
            format!("Nobody in {} answered the call to rise", ctx.location.name),
        ));
        return effect;
    }

    effect.spawned_army = Some(Army {
        id: ArmyId::from_random_bytes(rng.random()),
        faction: FactionId::NEUTRAL,
        location: ctx.location.id,
        strength: size,
        commander: None,
        is_insurgent: true,
    });
    effect.logs.push(ctx.defender_log(
        kind,
        Severity::Critical,
        format!("{size} rebels have risen in {}", ctx.location.name),
    ));
    effect.logs.push(ctx.actor_log(
        kind,
        Severity::Good,
        format!("{} raised {size} rebels in {}", ctx.leader.name, ctx.location.name),
    ));
    info!(
        leader = %ctx.leader.id,
        location = %ctx.location.id,
        size,
        "neutral uprising spawned"
    );
    effect
}

/// Resolve one turn of Grand Insurrection preparation.
pub fn prepare_grand_insurrection(
    active: &ActiveClandestineAction,
    ctx: &ActionContext<'_>,
    rng: &mut impl Rng,
) -> ActionEffect {
    let kind = ActionKind::PrepareGrandInsurrection;
    let elapsed = active.elapsed(ctx.turn);

    if elapsed < ctx.config.grand_insurrection_turns {
        let mut effect = ActionEffect::default();
        if elapsed == 0 {
            effect.logs.push(ctx.actor_log(
                kind,
                Severity::Info,
                format!(
                    "{} begins preparing a grand insurrection in {}",
                    ctx.leader.name, ctx.location.name
                ),
            ));
        }
        debug!(leader = %ctx.leader.id, elapsed, "grand insurrection in preparation");
        return effect;
    }

    let gold = active.one_time_gold.unwrap_or(0);
    let shock = ctx
        .ops()
        .saturating_mul(ctx.config.insurrection_shock_per_ops);
    let stability = ctx.location.stability.saturating_sub(shock);
    let insurgents = grand_insurrection_insurgents(
        gold,
        ctx.location.population,
        stability,
        resentment_factor(ctx.location, ctx.actor()),
        ctx.leader.has_ability(Ability::Firebrand),
        ctx.config,
    )
    .min(ctx.location.population);

    let mut effect = ActionEffect::with_disposition(Disposition::Complete);
    effect.location.stability = signed_diff(stability, ctx.location.stability);
    effect.location.population = i64::from(insurgents).saturating_neg();
    let army_id = ArmyId::from_random_bytes(rng.random());
    effect.spawned_army = Some(Army {
        id: army_id,
        faction: ctx.actor(),
        location: ctx.location.id,
        strength: insurgents,
        commander: Some(ctx.leader.id),
        is_insurgent: true,
    });
    effect.logs.push(ctx.defender_log(
        kind,
        Severity::Critical,
        format!("{} is in open revolt: {insurgents} insurgents take up arms", ctx.location.name),
    ));
    effect.logs.push(ctx.actor_log(
        kind,
        Severity::Good,
        format!(
            "{} leads {insurgents} insurgents out of hiding in {}",
            ctx.leader.name, ctx.location.name
        ),
    ));
    info!(
        leader = %ctx.leader.id,
        location = %ctx.location.id,
        army = %army_id,
        insurgents,
        "grand insurrection broke out"
    );
    effect
}
