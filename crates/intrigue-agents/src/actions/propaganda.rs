//! Resentment shifts: Distribute Pamphlets and Spread Propaganda.
//!
//! Pamphlets raise resentment against the controller by `2 * ops`;
//! propaganda lowers resentment against the acting faction by `ops`. Both
//! are bounded to 0--100 and auto-disable once their bound is reached.

use tracing::debug;

use intrigue_types::{ActionKind, PERCENT_MAX, Severity};

use super::{ActionContext, ActionEffect, Disposition, signed_diff};

/// Resolve one turn of pamphlet distribution.
pub fn distribute_pamphlets(ctx: &ActionContext<'_>) -> ActionEffect {
    let kind = ActionKind::DistributePamphlets;
    let controller = ctx.controller();
    let before = ctx.location.resentment_against(controller);
    let after = before
        .saturating_add(ctx.ops().saturating_mul(2))
        .min(PERCENT_MAX);

    let mut effect = ActionEffect::default();
    effect
        .location
        .resentment
        .insert(controller, signed_diff(after, before));
    effect.logs.push(ctx.actor_log(
        kind,
        Severity::Info,
        format!(
            "{} spreads pamphlets in {}: resentment against {controller} {before} -> {after}",
            ctx.leader.name, ctx.location.name
        ),
    ));
    if after >= PERCENT_MAX {
        effect.disposition = Disposition::AutoDisable;
    }

    debug!(leader = %ctx.leader.id, location = %ctx.location.id, before, after, "pamphlets");
    effect
}

/// Resolve one turn of propaganda.
pub fn spread_propaganda(ctx: &ActionContext<'_>) -> ActionEffect {
    let kind = ActionKind::SpreadPropaganda;
    let actor = ctx.actor();
    let before = ctx.location.resentment_against(actor);
    let after = before.saturating_sub(ctx.ops());

    let mut effect = ActionEffect::default();
    effect
        .location
        .resentment
        .insert(actor, signed_diff(after, before));
    effect.logs.push(ctx.actor_log(
        kind,
        Severity::Info,
        format!(
            "{} spreads propaganda in {}: resentment against us {before} -> {after}",
            ctx.leader.name, ctx.location.name
        ),
    ));
    if after == 0 {
        effect.disposition = Disposition::AutoDisable;
    }

    debug!(leader = %ctx.leader.id, location = %ctx.location.id, before, after, "propaganda");
    effect
}
