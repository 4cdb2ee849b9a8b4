//! Arson: Burn Crop Fields and Start Urban Fire.
//!
//! Success chance is `20 * discretion - stability`, lowered by
//! `10 + 5 * statesmanship` of a governor running `HuntNetworks`. A failed
//! attempt identifies the agent half of the time, adding resentment against
//! the acting faction. A successful one destroys
//! `min(rand[1..=5] * ops, 15, available)` food (fields) or gold (cities).

use rand::Rng;
use tracing::debug;

use intrigue_types::{ActionKind, PERCENT_MAX, ResourceDelta, Severity};

use super::{ActionContext, ActionEffect, roll_pct};

/// Base success chance per discretion level, in percent.
const SUCCESS_PER_DISCRETION: u32 = 20;

/// Flat chance lost to a `HuntNetworks` governor.
const HUNT_PENALTY_BASE: u32 = 10;

/// Chance lost to a `HuntNetworks` governor per statesmanship level.
const HUNT_PENALTY_PER_LEVEL: u32 = 5;

/// Largest multiplier of the damage roll.
const MAX_DAMAGE_ROLL: u32 = 5;

/// Success chance of an arson attempt, 0--100.
pub fn success_chance(ctx: &ActionContext<'_>) -> u32 {
    let base = SUCCESS_PER_DISCRETION.saturating_mul(ctx.leader.stats.discretion());
    let hunt_penalty = match ctx.governor {
        Some(governor) if ctx.hunt_networks => HUNT_PENALTY_BASE
            .saturating_add(HUNT_PENALTY_PER_LEVEL.saturating_mul(governor.stats.statesmanship())),
        _ => 0,
    };
    base.saturating_sub(ctx.location.stability)
        .saturating_sub(hunt_penalty)
        .min(PERCENT_MAX)
}

/// Shared roll: `Some(damage)` on success, `None` on failure.
fn attempt(
    ctx: &ActionContext<'_>,
    kind: ActionKind,
    available: u32,
    effect: &mut ActionEffect,
    rng: &mut impl Rng,
) -> Option<u32> {
    let chance = success_chance(ctx);
    if roll_pct(rng, chance) {
        let roll = rng.random_range(1..=MAX_DAMAGE_ROLL);
        let damage = roll
            .saturating_mul(ctx.ops())
            .min(ctx.config.arson_max_damage)
            .min(available);
        debug!(leader = %ctx.leader.id, chance, damage, ?kind, "arson succeeded");
        return Some(damage);
    }

    if roll_pct(rng, ctx.config.arson_identified_pct) {
        effect
            .location
            .resentment
            .insert(ctx.actor(), i64::from(ctx.config.arson_resentment_penalty));
        effect.logs.push(ctx.actor_log(
            kind,
            Severity::Warning,
            format!("{} was recognised setting fires in {}", ctx.leader.name, ctx.location.name),
        ));
        effect.logs.push(ctx.defender_log(
            kind,
            Severity::Warning,
            format!("Foreign arsonists were caught in the act in {}", ctx.location.name),
        ));
    } else {
        effect.logs.push(ctx.actor_log(
            kind,
            Severity::Info,
            format!("{} failed to start a fire in {}", ctx.leader.name, ctx.location.name),
        ));
    }
    debug!(leader = %ctx.leader.id, chance, ?kind, "arson failed");
    None
}

/// Resolve one turn of crop burning.
pub fn burn_crop_fields(ctx: &ActionContext<'_>, rng: &mut impl Rng) -> ActionEffect {
    let kind = ActionKind::BurnCropFields;
    let mut effect = ActionEffect::default();
    if let Some(damage) = attempt(ctx, kind, ctx.location.food_stock, &mut effect, rng) {
        effect.location.food_stock = i64::from(damage).saturating_neg();
        effect.logs.push(ctx.actor_log(
            kind,
            Severity::Good,
            format!("{} burned the fields of {}: {damage} food lost", ctx.leader.name, ctx.location.name),
        ));
        effect.logs.push(ctx.defender_log(
            kind,
            Severity::Warning,
            format!("Fields are burning around {}", ctx.location.name),
        ));
    }
    effect
}

/// Resolve one turn of urban fire-raising.
pub fn start_urban_fire(ctx: &ActionContext<'_>, rng: &mut impl Rng) -> ActionEffect {
    let kind = ActionKind::StartUrbanFire;
    let mut effect = ActionEffect::default();
    if let Some(damage) = attempt(ctx, kind, ctx.location.gold_income, &mut effect, rng) {
        effect.credit(
            ctx.controller(),
            ResourceDelta::gold(i64::from(damage).saturating_neg()),
        );
        effect.logs.push(ctx.actor_log(
            kind,
            Severity::Good,
            format!("{} set {} ablaze: {damage} gold destroyed", ctx.leader.name, ctx.location.name),
        ));
        effect.logs.push(ctx.defender_log(
            kind,
            Severity::Warning,
            format!("A fire is ravaging {}", ctx.location.name),
        ));
    }
    effect
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use intrigue_types::{FactionId, GovernorPolicy, Leader, LeaderStats, LeaderTrait, LocationType};

    use super::*;
    use crate::actions::test_support::{make_agent, make_location};
    use crate::config::ClandestineConfig;

    fn make_arsonist(location: &intrigue_types::Location, discretion: u8) -> Leader {
        let mut leader = make_agent(location, 3, discretion);
        leader.traits.insert(LeaderTrait::ScorchedEarth);
        leader
    }

    #[test]
    fn hunting_governor_lowers_chance() {
        let config = ClandestineConfig::default();
        let mut location = make_location(LocationType::Rural);
        location.stability = 20;
        location.active_policies.insert(GovernorPolicy::HuntNetworks);
        let leader = make_arsonist(&location, 5);
        let mut governor = Leader::new("Kasimir", FactionId(1), location.id);
        governor.stats = LeaderStats {
            statesmanship: Some(4),
            ..LeaderStats::default()
        };
        let mut ctx = ActionContext {
            turn: 1,
            leader: &leader,
            budget: 100,
            location: &location,
            governor: Some(&governor),
            hunt_networks: false,
            target: None,
            target_protected: false,
            hostile_soldiers: 0,
            config: &config,
        };
        assert_eq!(success_chance(&ctx), 80);
        ctx.hunt_networks = true;
        assert_eq!(success_chance(&ctx), 50);
    }

    #[test]
    fn certain_fire_destroys_at_most_fifteen() {
        let config = ClandestineConfig::default();
        let mut location = make_location(LocationType::Rural);
        location.stability = 0;
        let leader = make_arsonist(&location, 5);
        let ctx = ActionContext {
            turn: 1,
            leader: &leader,
            budget: 100,
            location: &location,
            governor: None,
            hunt_networks: false,
            target: None,
            target_protected: false,
            hostile_soldiers: 0,
            config: &config,
        };
        let mut rng = SmallRng::seed_from_u64(42);
        let effect = burn_crop_fields(&ctx, &mut rng);
        assert!((-15..=-3).contains(&effect.location.food_stock));
    }

    #[test]
    fn identified_arsonist_raises_resentment() {
        let config = ClandestineConfig {
            arson_identified_pct: 100,
            ..ClandestineConfig::default()
        };
        let location = make_location(LocationType::City);
        // 20 * 1 - 70 stability: no chance at all.
        let leader = make_arsonist(&location, 1);
        let ctx = ActionContext {
            turn: 1,
            leader: &leader,
            budget: 100,
            location: &location,
            governor: None,
            hunt_networks: false,
            target: None,
            target_protected: false,
            hostile_soldiers: 0,
            config: &config,
        };
        let mut rng = SmallRng::seed_from_u64(42);
        let effect = start_urban_fire(&ctx, &mut rng);
        assert_eq!(effect.location.resentment.get(&FactionId(2)).copied(), Some(30));
        assert!(effect.resources.is_empty());
    }
}
