//! Gold cost and detection footprint of each clandestine action.
//!
//! Per-turn actions draw their gold from the agent's budget every turn.
//! One-time actions commit their gold once, on initiation, and the amount is
//! carried on the [`ActiveClandestineAction`](intrigue_types::ActiveClandestineAction)
//! itself.

use intrigue_types::{ActionKind, DetectionType};

/// Gold drawn from the agent's budget every turn the action is active.
///
/// One-time actions return 0.
#[allow(clippy::match_same_arms)] // One arm per action keeps the table readable.
pub const fn gold_per_turn(kind: ActionKind) -> u32 {
    match kind {
        ActionKind::UndermineAuthorities => 10,
        ActionKind::DistributePamphlets => 10,
        ActionKind::SpreadPropaganda => 10,
        ActionKind::AttackTaxConvoys => 15,
        ActionKind::StealFromGranaries => 15,
        ActionKind::BurnCropFields => 20,
        ActionKind::StartUrbanFire => 20,
        ActionKind::InciteNeutralInsurrections => 0,
        ActionKind::PrepareGrandInsurrection => 0,
        ActionKind::AssassinateLeader => 0,
    }
}

/// How the action feeds the detection level.
pub const fn detection_type(kind: ActionKind) -> DetectionType {
    match kind {
        ActionKind::PrepareGrandInsurrection | ActionKind::AssassinateLeader => {
            DetectionType::OneTime
        }
        _ => DetectionType::PerTurn,
    }
}

/// Detection added per turn, or once at initiation for one-time actions.
#[allow(clippy::match_same_arms)]
pub const fn detection_increase(kind: ActionKind) -> u32 {
    match kind {
        ActionKind::UndermineAuthorities => 10,
        ActionKind::DistributePamphlets => 5,
        ActionKind::SpreadPropaganda => 5,
        ActionKind::AttackTaxConvoys => 10,
        ActionKind::StealFromGranaries => 10,
        ActionKind::BurnCropFields => 15,
        ActionKind::StartUrbanFire => 15,
        ActionKind::InciteNeutralInsurrections => 15,
        ActionKind::PrepareGrandInsurrection => 25,
        ActionKind::AssassinateLeader => 20,
    }
}

/// Detection added every turn by `kinds`, ignoring one-time actions.
pub fn per_turn_detection(kinds: impl IntoIterator<Item = ActionKind>) -> u32 {
    kinds
        .into_iter()
        .filter(|k| detection_type(*k) == DetectionType::PerTurn)
        .fold(0_u32, |acc, k| acc.saturating_add(detection_increase(k)))
}

/// Gold drawn every turn by `kinds`.
pub fn per_turn_gold(kinds: impl IntoIterator<Item = ActionKind>) -> u32 {
    kinds
        .into_iter()
        .fold(0_u32, |acc, k| acc.saturating_add(gold_per_turn(k)))
}

/// Rank used when consolidating game logs; higher wins.
///
/// Arson outranks undermining, which outranks pamphlets, granary theft and
/// convoy attacks in that order. Everything else shares the lowest rank.
pub const fn log_priority(kind: ActionKind) -> u8 {
    match kind {
        ActionKind::BurnCropFields | ActionKind::StartUrbanFire => 5,
        ActionKind::UndermineAuthorities => 4,
        ActionKind::DistributePamphlets => 3,
        ActionKind::StealFromGranaries => 2,
        ActionKind::AttackTaxConvoys => 1,
        _ => 0,
    }
}
