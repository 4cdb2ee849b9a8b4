//! Undermine Authorities: erode the stability of enemy territory.
//!
//! Each turn the agent knocks `2 * ops` points off stability (floor 0).
//! The defender is warned with a 25% chance. The action auto-disables once
//! stability reaches 0; running out of gold is handled by the dispatcher.

use rand::Rng;
use tracing::debug;

use intrigue_types::{ActionKind, Severity};

use super::{ActionContext, ActionEffect, Disposition, roll_pct, signed_diff};

/// Stability points lost per clandestine-ops level.
const DAMAGE_PER_OPS: u32 = 2;

/// Resolve one turn of undermining.
pub fn undermine_authorities(ctx: &ActionContext<'_>, rng: &mut impl Rng) -> ActionEffect {
    let kind = ActionKind::UndermineAuthorities;
    let before = ctx.location.stability;
    let after = before.saturating_sub(ctx.ops().saturating_mul(DAMAGE_PER_OPS));

    let mut effect = ActionEffect::default();
    effect.location.stability = signed_diff(after, before);
    effect.logs.push(ctx.actor_log(
        kind,
        Severity::Info,
        format!(
            "{} undermines the authorities of {}: stability {before} -> {after}",
            ctx.leader.name, ctx.location.name
        ),
    ));

    if roll_pct(rng, ctx.config.undermine_warning_pct) {
        effect.logs.push(ctx.defender_log(
            kind,
            Severity::Warning,
            format!("Agitators are undermining our authority in {}", ctx.location.name),
        ));
    }

    if after == 0 {
        effect.disposition = Disposition::AutoDisable;
    }

    debug!(
        leader = %ctx.leader.id,
        location = %ctx.location.id,
        before,
        after,
        "undermine authorities"
    );
    effect
}
