//! Detection threshold and capture risk of clandestine agents.
//!
//! The model is a threshold over an accumulated detection level:
//!
//! ```text
//! threshold    = threshold_base + threshold_per_level * stealth
//! threshold   /= 2                        (HUNT_NETWORKS active, floored)
//! capture_risk = max(0, detection - threshold)
//!              + paranoid_bonus           (PARANOID governor, detection >= threshold)
//! ```
//!
//! The risk is a percentage rolled directly once per turn, capped at 100.
//!
//! # Notification lag
//!
//! `HuntNetworks` and PARANOID only weigh on an agent from the turn after the
//! agent's controller learned of them. [`RiskInputs::effective`] picks the
//! raw observation for factions deemed notified immediately (AI factions)
//! and the recorded alert flags for everyone else.

use intrigue_types::{
    Ability, ActionKind, AlertFlags, GovernorPolicy, Leader, PERCENT_MAX, WorldState,
};

use crate::actions::costs;
use crate::config::ClandestineConfig;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Defensive measures weighing on an agent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskInputs {
    /// An enemy governor runs `HuntNetworks` where the agent operates.
    pub hunt_networks: bool,
    /// The enemy governor where the agent operates is PARANOID.
    pub paranoid_governor: bool,
}

impl RiskInputs {
    /// Measures actually present at the leader's location this turn.
    pub fn observe(world: &WorldState, leader: &Leader) -> Self {
        let Some(governor) = world
            .governor_at(leader.location)
            .filter(|g| g.faction != leader.faction)
        else {
            return Self::default();
        };
        let hunt_networks = world
            .locations
            .get(&leader.location)
            .is_some_and(|l| l.has_policy(GovernorPolicy::HuntNetworks));
        Self {
            hunt_networks,
            paranoid_governor: governor.has_ability(Ability::Paranoid),
        }
    }

    /// Measures the leader's controller already knows about.
    pub const fn from_alerts(alerts: AlertFlags) -> Self {
        Self {
            hunt_networks: alerts.hunt_networks_notified,
            paranoid_governor: alerts.paranoid_governor_notified,
        }
    }

    /// Measures that count against the leader this turn.
    pub fn effective(world: &WorldState, leader: &Leader, notified_immediately: bool) -> Self {
        if notified_immediately {
            Self::observe(world, leader)
        } else {
            Self::from_alerts(leader.alerts)
        }
    }
}

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

/// Stealth level of a leader: discretion, plus one for GHOST.
pub fn stealth_level(leader: &Leader) -> u32 {
    let ghost = u32::from(leader.has_ability(Ability::Ghost));
    leader.stats.discretion().saturating_add(ghost)
}

/// Detection level at which capture risk starts.
pub const fn detection_threshold(stealth: u32, hunt_networks: bool, config: &ClandestineConfig) -> u32 {
    let threshold = config
        .threshold_base
        .saturating_add(config.threshold_per_level.saturating_mul(stealth));
    if hunt_networks { threshold / 2 } else { threshold }
}

/// Per-turn capture probability, 0--100.
pub fn capture_risk(
    detection_level: u32,
    threshold: u32,
    paranoid_governor: bool,
    config: &ClandestineConfig,
) -> u32 {
    let excess = detection_level.saturating_sub(threshold);
    let paranoid = if paranoid_governor && detection_level >= threshold {
        config.paranoid_bonus
    } else {
        0
    };
    excess.saturating_add(paranoid).min(PERCENT_MAX)
}

// ---------------------------------------------------------------------------
// RiskAssessment
// ---------------------------------------------------------------------------

/// Risk picture of one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskAssessment {
    /// Detection threshold.
    pub threshold: u32,
    /// Detection level the assessment is made at.
    pub detection_level: u32,
    /// Capture risk at that level.
    pub capture_risk: u32,
    /// Detection gained every turn from per-turn actions.
    pub per_turn_increase: u32,
}

impl RiskAssessment {
    /// Assess the leader as they stand.
    pub fn assess(leader: &Leader, inputs: RiskInputs, config: &ClandestineConfig) -> Self {
        let threshold = detection_threshold(stealth_level(leader), inputs.hunt_networks, config);
        let per_turn_increase =
            costs::per_turn_detection(leader.active_actions.iter().map(|a| a.action.kind()));
        Self {
            threshold,
            detection_level: leader.detection_level,
            capture_risk: capture_risk(
                leader.detection_level,
                threshold,
                inputs.paranoid_governor,
                config,
            ),
            per_turn_increase,
        }
    }

    /// Project the risk after one turn with `planned` actions added.
    ///
    /// One-time actions in `planned` add their footprint once; per-turn
    /// actions join the leader's existing per-turn load. `base_level`
    /// is the detection the leader starts from: their current level, or 0
    /// when they are about to arrive somewhere new.
    pub fn project(
        leader: &Leader,
        base_level: u32,
        inputs: RiskInputs,
        planned: &[ActionKind],
        config: &ClandestineConfig,
    ) -> Self {
        let threshold = detection_threshold(stealth_level(leader), inputs.hunt_networks, config);
        let existing = leader.active_actions.iter().map(|a| a.action.kind());
        let per_turn_increase = costs::per_turn_detection(existing.chain(planned.iter().copied()));
        let one_time = planned
            .iter()
            .filter(|k| costs::detection_type(**k) == intrigue_types::DetectionType::OneTime)
            .fold(0_u32, |acc, k| acc.saturating_add(costs::detection_increase(*k)));
        let detection_level = base_level
            .saturating_add(one_time)
            .saturating_add(per_turn_increase);
        Self {
            threshold,
            detection_level,
            capture_risk: capture_risk(detection_level, threshold, inputs.paranoid_governor, config),
            per_turn_increase,
        }
    }

    /// Turns until the detection level exceeds the threshold; `None` when it
    /// never will.
    pub const fn turns_to_threshold(&self) -> Option<u32> {
        if self.detection_level > self.threshold {
            return Some(0);
        }
        let gap = self.threshold.saturating_sub(self.detection_level);
        match gap.checked_div(self.per_turn_increase) {
            Some(turns) => Some(turns.saturating_add(1)),
            None => None,
        }
    }

    /// Whether the detection level is above the threshold.
    pub const fn is_exceeded(&self) -> bool {
        self.detection_level > self.threshold
    }
}
