//! Resource theft: Attack Tax Convoys and Steal From Granaries.
//!
//! The resolution flow:
//! 1. Roll for success at `10% * ops`
//! 2. On success take `min(rand[1..=5] * ops, available)` where `available`
//!    is the territory's gold income (convoys) or food stock (granaries)
//! 3. Roll the defender warning at 50%, whatever the outcome
//!
//! Stolen gold leaves the controller's treasury; stolen food leaves the
//! territory's stock. Both are credited to the acting faction.

use rand::Rng;
use tracing::debug;

use intrigue_types::{ActionKind, ResourceDelta, Severity};

use super::{ActionContext, ActionEffect, roll_pct};

/// Success chance per clandestine-ops level, in percent.
const SUCCESS_PER_OPS: u32 = 10;

/// Largest multiplier of the loot roll.
const MAX_LOOT_ROLL: u32 = 5;

/// Roll the amount taken, capped by what is there.
fn loot(ctx: &ActionContext<'_>, available: u32, rng: &mut impl Rng) -> u32 {
    let roll = rng.random_range(1..=MAX_LOOT_ROLL);
    roll.saturating_mul(ctx.ops()).min(available)
}

/// Resolve one turn of attacks on tax convoys.
pub fn attack_tax_convoys(ctx: &ActionContext<'_>, rng: &mut impl Rng) -> ActionEffect {
    let kind = ActionKind::AttackTaxConvoys;
    let mut effect = ActionEffect::default();

    if roll_pct(rng, SUCCESS_PER_OPS.saturating_mul(ctx.ops())) {
        let stolen = loot(ctx, ctx.location.gold_income, rng);
        let amount = i64::from(stolen);
        effect.credit(ctx.controller(), ResourceDelta::gold(amount.saturating_neg()));
        effect.credit(ctx.actor(), ResourceDelta::gold(amount));
        effect.logs.push(ctx.actor_log(
            kind,
            Severity::Good,
            format!("{} ambushed a tax convoy near {}: {stolen} gold taken", ctx.leader.name, ctx.location.name),
        ));
        debug!(leader = %ctx.leader.id, stolen, "convoy attack succeeded");
    } else {
        effect.logs.push(ctx.actor_log(
            kind,
            Severity::Info,
            format!("{} found no convoy to strike near {}", ctx.leader.name, ctx.location.name),
        ));
    }

    if roll_pct(rng, ctx.config.theft_warning_pct) {
        effect.logs.push(ctx.defender_log(
            kind,
            Severity::Warning,
            format!("Bandits are harassing our tax convoys around {}", ctx.location.name),
        ));
    }
    effect
}

/// Resolve one turn of granary theft.
pub fn steal_from_granaries(ctx: &ActionContext<'_>, rng: &mut impl Rng) -> ActionEffect {
    let kind = ActionKind::StealFromGranaries;
    let mut effect = ActionEffect::default();

    if roll_pct(rng, SUCCESS_PER_OPS.saturating_mul(ctx.ops())) {
        let stolen = loot(ctx, ctx.location.food_stock, rng);
        let amount = i64::from(stolen);
        effect.location.food_stock = amount.saturating_neg();
        effect.credit(ctx.actor(), ResourceDelta::food(amount));
        effect.logs.push(ctx.actor_log(
            kind,
            Severity::Good,
            format!("{} emptied granaries in {}: {stolen} food taken", ctx.leader.name, ctx.location.name),
        ));
        debug!(leader = %ctx.leader.id, stolen, "granary theft succeeded");
    } else {
        effect.logs.push(ctx.actor_log(
            kind,
            Severity::Info,
            format!("{} could not get into the granaries of {}", ctx.leader.name, ctx.location.name),
        ));
    }

    if roll_pct(rng, ctx.config.theft_warning_pct) {
        effect.logs.push(ctx.defender_log(
            kind,
            Severity::Warning,
            format!("Grain is disappearing from the stores of {}", ctx.location.name),
        ));
    }
    effect
}
