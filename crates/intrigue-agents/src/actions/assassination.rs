//! Assassinate Leader: a three-turn plot against an enemy leader.
//!
//! While the plot matures, each turn it may be revealed to the target's
//! faction (33%). On resolution the success chance is
//!
//! ```text
//! resentment / 4 * gold / 50 - stability - enemy_soldiers / 200
//! ```
//!
//! clamped to 0--100 and halved when a protector guards the target. The
//! action is removed after resolution whatever the outcome.

use rand::Rng;
use tracing::info;

use intrigue_types::{
    ActionKind, ActiveClandestineAction, LeaderId, LogEntry, PERCENT_MAX, Severity,
};

use super::{ActionContext, ActionEffect, Disposition, roll_pct};

/// Success chance of an assassination, 0--100.
pub fn success_chance(
    resentment: u32,
    gold: u32,
    stability: u32,
    hostile_soldiers: u32,
    protected: bool,
) -> u32 {
    let raw = f64::from(resentment) / 4.0 * (f64::from(gold) / 50.0)
        - f64::from(stability)
        - f64::from(hostile_soldiers) / 200.0;
    let clamped = raw.clamp(0.0, f64::from(PERCENT_MAX));
    let chance = if protected { clamped / 2.0 } else { clamped };
    to_pct(chance)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_pct(value: f64) -> u32 {
    // Value is already clamped to 0--100.
    value.floor() as u32
}

/// Resolve one turn of an assassination plot against `target_id`.
pub fn assassinate_leader(
    active: &ActiveClandestineAction,
    target_id: LeaderId,
    ctx: &ActionContext<'_>,
    rng: &mut impl Rng,
) -> ActionEffect {
    let kind = ActionKind::AssassinateLeader;
    let Some(target) = ctx
        .target
        .filter(|t| t.id == target_id && t.is_alive() && t.location == ctx.location.id)
    else {
        let refund = active.one_time_gold.unwrap_or(0);
        let mut effect = ActionEffect::with_disposition(Disposition::Blocked { refund });
        effect.logs.push(ctx.actor_log(
            kind,
            Severity::Info,
            format!("{}'s target is no longer in {}; the plot is dropped", ctx.leader.name, ctx.location.name),
        ));
        return effect;
    };

    let target_log = |severity: Severity, message: String| {
        LogEntry::to_faction(ctx.turn, severity, target.faction, message)
            .at(ctx.location.id)
            .from_action(ctx.actor(), kind)
            .about(target.id)
    };

    let elapsed = active.elapsed(ctx.turn);
    if elapsed < ctx.config.assassination_turns {
        let mut effect = ActionEffect::default();
        if !active.is_revealed && roll_pct(rng, ctx.config.reveal_chance_pct) {
            effect.revealed = true;
            effect.logs.push(target_log(
                Severity::Warning,
                format!("A plot against {} has been uncovered in {}", target.name, ctx.location.name),
            ));
        }
        return effect;
    }

    let chance = success_chance(
        ctx.location.resentment_against(target.faction),
        active.one_time_gold.unwrap_or(0),
        ctx.location.stability,
        ctx.hostile_soldiers,
        ctx.target_protected,
    );
    let mut effect = ActionEffect::with_disposition(Disposition::Complete);
    if roll_pct(rng, chance) {
        effect.killed_leader = Some(target.id);
        effect.logs.push(ctx.actor_log(
            kind,
            Severity::Good,
            format!("{} has assassinated {} in {}", ctx.leader.name, target.name, ctx.location.name),
        ));
        effect.logs.push(target_log(
            Severity::Critical,
            format!("{} was assassinated in {}", target.name, ctx.location.name),
        ));
        info!(leader = %ctx.leader.id, target = %target.id, chance, "assassination succeeded");
    } else {
        effect.logs.push(ctx.actor_log(
            kind,
            Severity::Warning,
            format!("{}'s attempt on {} failed", ctx.leader.name, target.name),
        ));
        effect.logs.push(target_log(
            Severity::Warning,
            format!("{} survived an attempt on their life in {}", target.name, ctx.location.name),
        ));
        info!(leader = %ctx.leader.id, target = %target.id, chance, "assassination failed");
    }
    effect
}
