//! Core entity structs: leaders, territories, armies, roads, clandestine
//! actions, mission payloads, game logs and resource deltas.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::enums::{
    Ability, ActionKind, GovernorPolicy, LeaderStatus, LeaderTrait, LocationType, Severity,
};
use crate::ids::{ArmyId, FactionId, LeaderId, LocationId, RoadId};

/// Stat level assumed when a stat is unset ("Capable").
pub const DEFAULT_STAT_LEVEL: u32 = 3;

/// Upper bound of stability, resentment and percentage values.
pub const PERCENT_MAX: u32 = 100;

// ---------------------------------------------------------------------------
// Leader stats
// ---------------------------------------------------------------------------

/// Ordinal stat levels (1--5) of a leader.
///
/// Unset stats are neutral: see the accessor methods for defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderStats {
    /// Skill at sabotage and subversion.
    #[serde(default)]
    pub clandestine_ops: Option<u8>,
    /// Skill at staying hidden.
    #[serde(default)]
    pub discretion: Option<u8>,
    /// Skill at governing.
    #[serde(default)]
    pub statesmanship: Option<u8>,
    /// Stability a governor restores per turn.
    #[serde(default)]
    pub stability_per_turn: Option<u8>,
    /// Bonus as an army commander.
    #[serde(default)]
    pub command_bonus: Option<u8>,
}

impl LeaderStats {
    /// Clandestine-ops level, defaulting to "Capable".
    pub fn ops(&self) -> u32 {
        self.clandestine_ops.map_or(DEFAULT_STAT_LEVEL, u32::from)
    }

    /// Discretion level, defaulting to "Capable".
    pub fn discretion(&self) -> u32 {
        self.discretion.map_or(DEFAULT_STAT_LEVEL, u32::from)
    }

    /// Statesmanship level, defaulting to "Capable".
    pub fn statesmanship(&self) -> u32 {
        self.statesmanship.map_or(DEFAULT_STAT_LEVEL, u32::from)
    }

    /// Statesmanship mapped onto the ordinal scale -2..=+2.
    pub fn statesmanship_ordinal(&self) -> i32 {
        let level = i32::try_from(self.statesmanship()).unwrap_or(3);
        level.saturating_sub(3).clamp(-2, 2)
    }

    /// Stability restored per turn; unset means none.
    pub fn stability_per_turn(&self) -> u32 {
        self.stability_per_turn.map_or(0, u32::from)
    }

    /// Command bonus level, defaulting to "Capable".
    pub fn command_bonus(&self) -> u32 {
        self.command_bonus.map_or(DEFAULT_STAT_LEVEL, u32::from)
    }
}

// ---------------------------------------------------------------------------
// Clandestine actions
// ---------------------------------------------------------------------------

/// A clandestine action with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClandestineAction {
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
    /// Raise a neutral uprising.
    InciteNeutralInsurrections,
    /// Prepare an uprising under the acting faction.
    PrepareGrandInsurrection,
    /// Kill an enemy leader.
    AssassinateLeader {
        /// The leader to kill.
        target: LeaderId,
    },
}

impl ClandestineAction {
    /// The payload-free kind of this action.
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::UndermineAuthorities => ActionKind::UndermineAuthorities,
            Self::DistributePamphlets => ActionKind::DistributePamphlets,
            Self::SpreadPropaganda => ActionKind::SpreadPropaganda,
            Self::AttackTaxConvoys => ActionKind::AttackTaxConvoys,
            Self::StealFromGranaries => ActionKind::StealFromGranaries,
            Self::BurnCropFields => ActionKind::BurnCropFields,
            Self::StartUrbanFire => ActionKind::StartUrbanFire,
            Self::InciteNeutralInsurrections => ActionKind::InciteNeutralInsurrections,
            Self::PrepareGrandInsurrection => ActionKind::PrepareGrandInsurrection,
            Self::AssassinateLeader { .. } => ActionKind::AssassinateLeader,
        }
    }
}

/// An action bound to a leader.
///
/// `turn_started == None` means the action has not been initialized: the
/// first processing pass sets the start turn and deducts the one-time cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveClandestineAction {
    /// The action and its payload.
    pub action: ClandestineAction,
    /// Turn of initialization.
    pub turn_started: Option<u32>,
    /// Gold committed once at initiation.
    pub one_time_gold: Option<u32>,
    /// Whether the target faction has learned of the action.
    pub is_revealed: bool,
}

impl ActiveClandestineAction {
    /// A not-yet-initialized action without a one-time cost.
    pub const fn new(action: ClandestineAction) -> Self {
        Self {
            action,
            turn_started: None,
            one_time_gold: None,
            is_revealed: false,
        }
    }

    /// A not-yet-initialized action committing `gold` once.
    pub const fn with_gold(action: ClandestineAction, gold: u32) -> Self {
        Self {
            action,
            turn_started: None,
            one_time_gold: Some(gold),
            is_revealed: false,
        }
    }

    /// Turns elapsed since initialization; zero before initialization.
    pub const fn elapsed(&self, current_turn: u32) -> u32 {
        match self.turn_started {
            Some(started) => current_turn.saturating_sub(started),
            None => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Missions and travel
// ---------------------------------------------------------------------------

/// A clandestine mission the assignment engine can start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mission", rename_all = "snake_case")]
pub enum ClandestineMission {
    /// Four-turn uprising under the acting faction.
    GrandInsurrection {
        /// Gold committed to the uprising (300, 400 or 500).
        gold: u32,
    },
    /// Neutral uprising against the controller.
    InciteNeutral {
        /// Gold committed.
        gold: u32,
    },
    /// Per-turn sabotage actions funded by a budget.
    MinorSabotage {
        /// Budget handed to the agent.
        gold: u32,
    },
    /// Plot against an enemy leader.
    Assassination {
        /// The leader to kill.
        target: LeaderId,
        /// Gold committed.
        gold: u32,
    },
}

impl ClandestineMission {
    /// Gold the mission takes from the faction's clandestine budget.
    pub const fn gold(&self) -> u32 {
        match self {
            Self::GrandInsurrection { gold }
            | Self::InciteNeutral { gold }
            | Self::MinorSabotage { gold }
            | Self::Assassination { gold, .. } => *gold,
        }
    }
}

/// Why a leader is travelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "purpose", rename_all = "snake_case")]
pub enum TravelPurpose {
    /// Start a clandestine mission on arrival.
    Mission {
        /// The mission to start.
        mission: ClandestineMission,
    },
    /// Take up governance on arrival.
    Govern {
        /// Policy to activate on arrival, if any.
        policy: Option<GovernorPolicy>,
    },
    /// Take command of an army on arrival.
    Command {
        /// The army to command.
        army: ArmyId,
    },
    /// Guard a leader on arrival.
    Protect {
        /// The leader to guard.
        leader: LeaderId,
    },
    /// Get back to friendly territory.
    Evacuate,
}

/// An ongoing journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Travel {
    /// Where the leader is going.
    pub destination: LocationId,
    /// Turns until arrival.
    pub turns_remaining: u32,
    /// What happens on arrival.
    pub purpose: TravelPurpose,
}

// ---------------------------------------------------------------------------
// Leader
// ---------------------------------------------------------------------------

/// Notification flags driving the alert edges of the detection state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFlags {
    /// The controller knows a PARANOID governor watches this territory.
    pub paranoid_governor_notified: bool,
    /// The controller knows `HuntNetworks` is active in this territory.
    pub hunt_networks_notified: bool,
    /// The controller was told the detection threshold is exceeded.
    pub threshold_exceeded_notified: bool,
}

/// A leader: covert agent, governor, or commander.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leader {
    /// Identity.
    pub id: LeaderId,
    /// Display name; also the key into faction role-affinity tables.
    pub name: String,
    /// Owning faction.
    pub faction: FactionId,
    /// Current status.
    pub status: LeaderStatus,
    /// Current territory.
    pub location: LocationId,
    /// Ongoing journey. Present exactly when the status is `Moving`.
    #[serde(default)]
    pub travel: Option<Travel>,
    /// Gold the agent carries for clandestine work.
    #[serde(default)]
    pub clandestine_budget: u32,
    /// Accumulated suspicion. Meaningful only in the clandestine window.
    #[serde(default)]
    pub detection_level: u32,
    /// Territory the detection level was accumulated in.
    #[serde(default)]
    pub detection_location: Option<LocationId>,
    /// Active clandestine actions.
    #[serde(default)]
    pub active_actions: Vec<ActiveClandestineAction>,
    /// Stat levels.
    #[serde(default)]
    pub stats: LeaderStats,
    /// Special abilities.
    #[serde(default)]
    pub abilities: BTreeSet<Ability>,
    /// Behavioral traits.
    #[serde(default)]
    pub traits: BTreeSet<LeaderTrait>,
    /// Alert notification flags.
    #[serde(default)]
    pub alerts: AlertFlags,
    /// Army under this leader's command.
    #[serde(default)]
    pub army: Option<ArmyId>,
    /// Leader this one is guarding.
    #[serde(default)]
    pub protecting: Option<LeaderId>,
}

impl Leader {
    /// Create an available leader with default stats at `location`.
    pub fn new(name: impl Into<String>, faction: FactionId, location: LocationId) -> Self {
        Self {
            id: LeaderId::new(),
            name: name.into(),
            faction,
            status: LeaderStatus::Available,
            location,
            travel: None,
            clandestine_budget: 0,
            detection_level: 0,
            detection_location: None,
            active_actions: Vec::new(),
            stats: LeaderStats::default(),
            abilities: BTreeSet::new(),
            traits: BTreeSet::new(),
            alerts: AlertFlags::default(),
            army: None,
            protecting: None,
        }
    }

    /// Whether the leader has the ability.
    pub fn has_ability(&self, ability: Ability) -> bool {
        self.abilities.contains(&ability)
    }

    /// Whether the leader has the trait.
    pub fn has_trait(&self, leader_trait: LeaderTrait) -> bool {
        self.traits.contains(&leader_trait)
    }

    /// Whether the leader is alive.
    pub fn is_alive(&self) -> bool {
        self.status != LeaderStatus::Dead
    }

    /// Whether the leader may perform an action of `kind`.
    pub fn may_perform(&self, kind: ActionKind) -> bool {
        let forbidden_by_pacifism = self.has_trait(LeaderTrait::Pacifist)
            && (kind.is_arson() || kind == ActionKind::AssassinateLeader);
        let arson_without_will = kind.is_arson() && !self.has_trait(LeaderTrait::ScorchedEarth);
        !forbidden_by_pacifism && !arson_without_will
    }

    /// Whether the leader has an active action of `kind`.
    pub fn has_action(&self, kind: ActionKind) -> bool {
        self.active_actions.iter().any(|a| a.action.kind() == kind)
    }

    /// Drop every piece of clandestine mission state.
    ///
    /// Clears actions, detection and alert flags. The budget is left to the
    /// caller, which decides between refund and forfeit.
    pub fn clear_mission_state(&mut self) {
        self.active_actions.clear();
        self.detection_level = 0;
        self.detection_location = None;
        self.alerts = AlertFlags::default();
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A territory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Identity.
    pub id: LocationId,
    /// Display name.
    pub name: String,
    /// Controlling faction; [`FactionId::NEUTRAL`] when unaligned.
    pub faction: FactionId,
    /// Order, 0--100.
    pub stability: u32,
    /// Hostility toward each faction, 0--100.
    #[serde(default)]
    pub resentment: BTreeMap<FactionId, u32>,
    /// Inhabitants.
    pub population: u32,
    /// Gold produced per turn.
    #[serde(default)]
    pub gold_income: u32,
    /// Food in store.
    #[serde(default)]
    pub food_stock: u32,
    /// Food eaten per turn.
    #[serde(default)]
    pub food_consumption: u32,
    /// City, rural or road stage.
    pub kind: LocationType,
    /// The paired city or countryside.
    #[serde(default)]
    pub linked_location: Option<LocationId>,
    /// Active governor policies.
    #[serde(default)]
    pub active_policies: BTreeSet<GovernorPolicy>,
    /// Last turn `MakeExamples` was active.
    #[serde(default)]
    pub last_make_examples_turn: Option<u32>,
}

impl Location {
    /// Resentment toward `faction`; zero when unrecorded.
    pub fn resentment_against(&self, faction: FactionId) -> u32 {
        self.resentment.get(&faction).copied().unwrap_or(0)
    }

    /// Set resentment toward `faction`, clamped to 0--100.
    pub fn set_resentment(&mut self, faction: FactionId, value: u32) {
        self.resentment.insert(faction, value.min(PERCENT_MAX));
    }

    /// Whether `policy` is active.
    pub fn has_policy(&self, policy: GovernorPolicy) -> bool {
        self.active_policies.contains(&policy)
    }

    /// Whole turns of food left; `None` when nothing is consumed.
    pub fn turns_of_food(&self) -> Option<u32> {
        self.food_stock.checked_div(self.food_consumption)
    }

    /// Whether `faction` controls this territory.
    pub fn is_controlled_by(&self, faction: FactionId) -> bool {
        self.faction == faction
    }
}

// ---------------------------------------------------------------------------
// Armies and roads
// ---------------------------------------------------------------------------

/// An army. The engine only spawns armies; movement and battle are external.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Army {
    /// Identity.
    pub id: ArmyId,
    /// Owning faction; neutral for neutral uprisings.
    pub faction: FactionId,
    /// Current territory.
    pub location: LocationId,
    /// Soldiers.
    pub strength: u32,
    /// Commanding leader.
    #[serde(default)]
    pub commander: Option<LeaderId>,
    /// Raised by an insurrection.
    #[serde(default)]
    pub is_insurgent: bool,
}

/// A road between two territories, usable in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Road {
    /// Identity.
    pub id: RoadId,
    /// One end.
    pub from: LocationId,
    /// Other end.
    pub to: LocationId,
    /// Turns to travel the road.
    pub travel_turns: u32,
}

// ---------------------------------------------------------------------------
// Faction resources and deltas
// ---------------------------------------------------------------------------

/// A faction's treasury as seen by the AI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionResources {
    /// Treasury gold.
    pub gold: u32,
    /// Portion of the treasury earmarked for clandestine missions.
    pub clandestine_budget: u32,
}

/// Signed resource change for one faction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDelta {
    /// Gold gained (positive) or lost (negative).
    pub gold: i64,
    /// Food gained (positive) or lost (negative).
    pub food: i64,
}

impl ResourceDelta {
    /// A gold-only delta.
    pub const fn gold(amount: i64) -> Self {
        Self { gold: amount, food: 0 }
    }

    /// A food-only delta.
    pub const fn food(amount: i64) -> Self {
        Self { gold: 0, food: amount }
    }

    /// Add `other` into this delta.
    pub const fn accumulate(&mut self, other: Self) {
        self.gold = self.gold.saturating_add(other.gold);
        self.food = self.food.saturating_add(other.food);
    }

    /// Whether nothing changes.
    pub const fn is_zero(&self) -> bool {
        self.gold == 0 && self.food == 0
    }
}

// ---------------------------------------------------------------------------
// Game logs
// ---------------------------------------------------------------------------

/// A structured game log entry.
///
/// Text is a short English summary; presentation and localization belong to
/// the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Turn of the event.
    pub turn: u32,
    /// Severity.
    pub severity: Severity,
    /// Territory concerned.
    pub location: Option<LocationId>,
    /// Faction whose agent caused the event.
    pub acting_faction: Option<FactionId>,
    /// Factions allowed to see the entry.
    pub visible_to: BTreeSet<FactionId>,
    /// Clandestine action that produced the entry.
    pub source: Option<ActionKind>,
    /// Leader concerned.
    pub leader: Option<LeaderId>,
    /// Summary.
    pub message: String,
}

impl LogEntry {
    /// An entry visible to a single faction.
    pub fn to_faction(
        turn: u32,
        severity: Severity,
        faction: FactionId,
        message: impl Into<String>,
    ) -> Self {
        Self {
            turn,
            severity,
            location: None,
            acting_faction: None,
            visible_to: BTreeSet::from([faction]),
            source: None,
            leader: None,
            message: message.into(),
        }
    }

    /// Attach the territory.
    #[must_use]
    pub fn at(mut self, location: LocationId) -> Self {
        self.location = Some(location);
        self
    }

    /// Attach the acting faction and the action that produced the entry.
    #[must_use]
    pub fn from_action(mut self, actor: FactionId, source: ActionKind) -> Self {
        self.acting_faction = Some(actor);
        self.source = Some(source);
        self
    }

    /// Attach the acting faction.
    #[must_use]
    pub fn by(mut self, actor: FactionId) -> Self {
        self.acting_faction = Some(actor);
        self
    }

    /// Attach the leader concerned.
    #[must_use]
    pub fn about(mut self, leader: LeaderId) -> Self {
        self.leader = Some(leader);
        self
    }

    /// Make the entry visible to another faction as well.
    #[must_use]
    pub fn also_visible_to(mut self, faction: FactionId) -> Self {
        self.visible_to.insert(faction);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_stats_default_to_capable() {
        let stats = LeaderStats::default();
        assert_eq!(stats.ops(), 3);
        assert_eq!(stats.discretion(), 3);
        assert_eq!(stats.statesmanship(), 3);
        assert_eq!(stats.statesmanship_ordinal(), 0);
        assert_eq!(stats.stability_per_turn(), 0);
    }

    #[test]
    fn statesmanship_ordinal_range() {
        let low = LeaderStats {
            statesmanship: Some(1),
            ..LeaderStats::default()
        };
        let high = LeaderStats {
            statesmanship: Some(5),
            ..LeaderStats::default()
        };
        assert_eq!(low.statesmanship_ordinal(), -2);
        assert_eq!(high.statesmanship_ordinal(), 2);
    }

    #[test]
    fn arson_requires_scorched_earth() {
        let mut leader = Leader::new("Varga", FactionId(1), LocationId::new());
        assert!(!leader.may_perform(ActionKind::BurnCropFields));
        leader.traits.insert(LeaderTrait::ScorchedEarth);
        assert!(leader.may_perform(ActionKind::BurnCropFields));
        leader.traits.insert(LeaderTrait::Pacifist);
        assert!(!leader.may_perform(ActionKind::StartUrbanFire));
        assert!(!leader.may_perform(ActionKind::AssassinateLeader));
        assert!(leader.may_perform(ActionKind::UndermineAuthorities));
    }

    #[test]
    fn clear_mission_state_resets_detection() {
        let mut leader = Leader::new("Orsolya", FactionId(1), LocationId::new());
        leader.status = LeaderStatus::Undercover;
        leader.detection_level = 42;
        leader
            .active_actions
            .push(ActiveClandestineAction::new(ClandestineAction::UndermineAuthorities));
        leader.alerts.threshold_exceeded_notified = true;
        leader.clear_mission_state();
        assert_eq!(leader.detection_level, 0);
        assert!(leader.active_actions.is_empty());
        assert_eq!(leader.alerts, AlertFlags::default());
    }

    #[test]
    fn resentment_is_clamped() {
        let mut location = Location {
            id: LocationId::new(),
            name: String::from("Karst"),
            faction: FactionId(1),
            stability: 50,
            resentment: BTreeMap::new(),
            population: 10_000,
            gold_income: 0,
            food_stock: 30,
            food_consumption: 10,
            kind: LocationType::City,
            linked_location: None,
            active_policies: BTreeSet::new(),
            last_make_examples_turn: None,
        };
        location.set_resentment(FactionId(1), 250);
        assert_eq!(location.resentment_against(FactionId(1)), 100);
        assert_eq!(location.resentment_against(FactionId(2)), 0);
        assert_eq!(location.turns_of_food(), Some(3));
    }

    #[test]
    fn elapsed_turns() {
        let mut action = ActiveClandestineAction::with_gold(ClandestineAction::PrepareGrandInsurrection, 400);
        assert_eq!(action.elapsed(9), 0);
        action.turn_started = Some(5);
        assert_eq!(action.elapsed(9), 4);
    }
}
