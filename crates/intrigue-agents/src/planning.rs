//! Risk-aware selection of minor sabotage actions.
//!
//! A minor mission bundles cheap per-turn actions. Candidates are tried in
//! a fixed order and kept greedily while the agent can pay a turn of all of
//! them and the projected detection stays at least `min_safe_turns` turns
//! away from the threshold.

use tracing::debug;

use intrigue_types::{
    ActionKind, ActiveClandestineAction, ClandestineAction, Leader, Location, LocationType,
    PERCENT_MAX,
};

use crate::actions::costs;
use crate::config::ClandestineConfig;
use crate::risk::{RiskAssessment, RiskInputs};

/// Minor actions worth attempting at `location`, in preference order.
fn candidates(leader: &Leader, location: &Location) -> Vec<ClandestineAction> {
    let mut out = Vec::new();
    let city = match location.kind {
        LocationType::City => true,
        LocationType::Rural => false,
        LocationType::RoadStage => return out,
    };

    if location.stability > 0 {
        out.push(ClandestineAction::UndermineAuthorities);
    }
    if location.resentment_against(location.faction) < PERCENT_MAX {
        out.push(ClandestineAction::DistributePamphlets);
    }

    let (arson, theft, available) = if city {
        (
            ClandestineAction::StartUrbanFire,
            ClandestineAction::AttackTaxConvoys,
            location.gold_income,
        )
    } else {
        (
            ClandestineAction::BurnCropFields,
            ClandestineAction::StealFromGranaries,
            location.food_stock,
        )
    };
    if available > 0 {
        if leader.may_perform(arson.kind()) {
            out.push(arson);
        }
        out.push(theft);
    }

    if location.resentment_against(leader.faction) > 0 {
        out.push(ClandestineAction::SpreadPropaganda);
    }
    out
}

/// Choose the minor actions `leader` should run at `location`.
///
/// `base_level` is the detection the leader will start from and `budget`
/// the gold they will carry.
pub fn plan_minor_actions(
    leader: &Leader,
    location: &Location,
    inputs: RiskInputs,
    base_level: u32,
    budget: u32,
    min_safe_turns: u32,
    config: &ClandestineConfig,
) -> Vec<ActiveClandestineAction> {
    let mut planned: Vec<ActionKind> = Vec::new();
    let mut chosen = Vec::new();

    for action in candidates(leader, location) {
        let kind = action.kind();
        let mut tentative = planned.clone();
        tentative.push(kind);

        if costs::per_turn_gold(tentative.iter().copied()) > budget {
            continue;
        }
        let projected = RiskAssessment::project(leader, base_level, inputs, &tentative, config);
        let safe = projected
            .turns_to_threshold()
            .is_none_or(|turns| turns >= min_safe_turns);
        if !safe {
            debug!(leader = %leader.id, ?kind, level = projected.detection_level, "action too risky");
            continue;
        }
        planned = tentative;
        chosen.push(ActiveClandestineAction::new(action));
    }

    debug!(leader = %leader.id, location = %location.id, actions = ?planned, "minor actions planned");
    chosen
}
