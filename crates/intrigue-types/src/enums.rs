//! Enumeration types for the covert-leader engine.
//!
//! Closed vocabularies: leader status, abilities and behavioral traits,
//! territory types, governor policies, clandestine action kinds, roles and
//! role-affinity tiers, and log severities.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Leader status
// ---------------------------------------------------------------------------

/// What a leader is doing this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaderStatus {
    /// Free for assignment.
    Available,
    /// Travelling; the leader's `travel` field carries destination and purpose.
    Moving,
    /// Operating clandestinely in foreign territory.
    Undercover,
    /// Locked into a multi-turn mission (Grand Insurrection preparation).
    OnMission,
    /// Governing the territory the leader stands in.
    Governing,
    /// Killed. Dead leaders are never reassigned.
    Dead,
}

impl LeaderStatus {
    /// Whether the status belongs to the clandestine window in which active
    /// actions and a detection level are meaningful.
    pub const fn is_clandestine(self) -> bool {
        matches!(self, Self::Undercover | Self::OnMission)
    }
}

// ---------------------------------------------------------------------------
// Abilities and traits
// ---------------------------------------------------------------------------

/// A special ability of a leader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Ability {
    /// Rouses crowds: insurgent yields are multiplied by 1.33.
    Firebrand,
    /// Leaves no trace: counts as one extra stealth level.
    Ghost,
    /// As a governor, adds a flat bonus to the capture risk of enemy agents.
    Paranoid,
    /// Famous commander: armies fight harder under them.
    Legendary,
    /// Half a chance of escaping when caught.
    Daredevil,
    /// Skilled administrator.
    Manager,
    /// Clergy: calms unrest when governing.
    ManOfChurch,
}

/// A behavioral trait that forces or forbids certain actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaderTrait {
    /// Refuses desk work: disqualified from normal governance.
    ManOfAction,
    /// Willing to burn fields and cities.
    ScorchedEarth,
    /// Refuses arson and assassination.
    Pacifist,
}

// ---------------------------------------------------------------------------
// Territories
// ---------------------------------------------------------------------------

/// The kind of territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationType {
    /// Urban centre; produces gold income.
    City,
    /// Countryside; produces and stores food.
    Rural,
    /// Waypoint on a road. Never targeted.
    RoadStage,
}

/// A policy a governor can activate at their territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GovernorPolicy {
    /// Full-time: restore order.
    StabilizeRegion,
    /// Full-time: hunt enemy networks. Halves the detection threshold of
    /// enemy agents in the territory.
    HuntNetworks,
    /// Full-time: develop the local economy.
    ImproveEconomy,
    /// Public punishments. Suppresses neutral insurrections for a while.
    MakeExamples,
    /// Ration food while the territory is cut off.
    Rationing,
}

impl GovernorPolicy {
    /// Full-time policies occupy the governor entirely and are mutually
    /// exclusive.
    pub const fn is_full_time(self) -> bool {
        matches!(
            self,
            Self::StabilizeRegion | Self::HuntNetworks | Self::ImproveEconomy
        )
    }
}

// ---------------------------------------------------------------------------
// Clandestine actions
// ---------------------------------------------------------------------------

/// The kind of a clandestine action, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Erode stability.
    UndermineAuthorities,
    /// Raise resentment against the controller.
    DistributePamphlets,
    /// Lower resentment against the acting faction.
    SpreadPropaganda,
    /// Steal gold income.
    AttackTaxConvoys,
    /// Steal food stock.
    StealFromGranaries,
    /// Destroy rural food.
    BurnCropFields,
    /// Destroy city gold.
    StartUrbanFire,
    /// Two-turn action raising a neutral uprising.
    InciteNeutralInsurrections,
    /// Four-turn preparation of an uprising under the acting faction.
    PrepareGrandInsurrection,
    /// Three-turn plot against an enemy leader.
    AssassinateLeader,
}

impl ActionKind {
    /// Every action kind, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::UndermineAuthorities,
        Self::DistributePamphlets,
        Self::SpreadPropaganda,
        Self::AttackTaxConvoys,
        Self::StealFromGranaries,
        Self::BurnCropFields,
        Self::StartUrbanFire,
        Self::InciteNeutralInsurrections,
        Self::PrepareGrandInsurrection,
        Self::AssassinateLeader,
    ];

    /// Arson actions require a willing agent.
    pub const fn is_arson(self) -> bool {
        matches!(self, Self::BurnCropFields | Self::StartUrbanFire)
    }
}

/// How an action contributes to the agent's detection level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionType {
    /// Added every turn the action stays active.
    PerTurn,
    /// Added exactly once, when the action is initiated.
    OneTime,
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// The role families the assignment engine chooses between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    /// Govern a friendly territory.
    Governor,
    /// Govern a friendly territory with the sole aim of restoring order.
    Stabilizer,
    /// Operate in enemy territory.
    Clandestine,
    /// Command an army.
    Commander,
    /// Guard a threatened leader.
    Protector,
    /// Nothing better to do.
    Idle,
}

/// Static affinity of a leader for a role, from the faction's table.
///
/// Variants are declared lowest first so the derived ordering ranks
/// `Primary` highest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AffinityTier {
    /// No affinity.
    #[default]
    None,
    /// Only in exceptional circumstances.
    Exceptional,
    /// Third choice.
    Tertiary,
    /// Second choice.
    Secondary,
    /// What this leader is for.
    Primary,
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// Severity of a game log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Routine information.
    Info,
    /// Something the reader should act on.
    Warning,
    /// Something the reader must act on now.
    Critical,
    /// Good news.
    Good,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clandestine_window() {
        assert!(LeaderStatus::Undercover.is_clandestine());
        assert!(LeaderStatus::OnMission.is_clandestine());
        assert!(!LeaderStatus::Moving.is_clandestine());
        assert!(!LeaderStatus::Governing.is_clandestine());
    }

    #[test]
    fn affinity_ordering() {
        assert!(AffinityTier::Primary > AffinityTier::Secondary);
        assert!(AffinityTier::Secondary > AffinityTier::Tertiary);
        assert!(AffinityTier::Tertiary > AffinityTier::Exceptional);
        assert!(AffinityTier::Exceptional > AffinityTier::None);
    }

    #[test]
    fn full_time_policies() {
        assert!(GovernorPolicy::HuntNetworks.is_full_time());
        assert!(GovernorPolicy::StabilizeRegion.is_full_time());
        assert!(!GovernorPolicy::Rationing.is_full_time());
        assert!(!GovernorPolicy::MakeExamples.is_full_time());
    }

    #[test]
    fn status_serializes_screaming_case() {
        let json = serde_json::to_string(&LeaderStatus::OnMission).unwrap_or_default();
        assert_eq!(json, "\"ON_MISSION\"");
    }
}
