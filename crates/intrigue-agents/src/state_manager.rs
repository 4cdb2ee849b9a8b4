//! Tracked mutation of the world during a turn.
//!
//! The [`LeaderStateManager`] owns a working copy of the [`WorldState`] and
//! records every entity it replaces, every army it spawns, every game log
//! and every resource movement. When the turn is over,
//! [`LeaderStateManager::finish`] hands back the new world together with a
//! [`TurnDelta`] change-set built from the recorded ids.
//!
//! All mutation goes through "replace entity at id" style methods; nothing
//! outside this module patches the collections by position.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use intrigue_types::{
    ActionKind, Army, ArmyId, FactionId, Leader, LeaderId, LeaderStatus, Location, LocationId,
    LogEntry, ResourceDelta, Travel, TravelPurpose, WorldState,
};

use crate::actions::shift;
use crate::config::ClandestineConfig;
use crate::error::AgentError;

// ---------------------------------------------------------------------------
// TurnDelta
// ---------------------------------------------------------------------------

/// Everything a turn changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnDelta {
    /// Final state of every leader touched this turn, in id order.
    pub leaders: Vec<Leader>,
    /// Final state of every territory touched this turn, in id order.
    pub locations: Vec<Location>,
    /// Final state of every pre-existing army touched this turn.
    pub armies: Vec<Army>,
    /// Armies created this turn, in creation order.
    pub spawned_armies: Vec<Army>,
    /// Game logs, in emission order.
    pub logs: Vec<LogEntry>,
    /// Net resource movement per faction.
    pub resource_deltas: BTreeMap<FactionId, ResourceDelta>,
}

// ---------------------------------------------------------------------------
// LeaderStateManager
// ---------------------------------------------------------------------------

/// Working copy of the world with change tracking.
#[derive(Debug, Clone)]
pub struct LeaderStateManager {
    world: WorldState,
    modified_leaders: BTreeSet<LeaderId>,
    modified_locations: BTreeSet<LocationId>,
    modified_armies: BTreeSet<ArmyId>,
    spawned_armies: Vec<ArmyId>,
    logs: Vec<LogEntry>,
    resource_deltas: BTreeMap<FactionId, ResourceDelta>,
}

impl LeaderStateManager {
    /// Start tracking changes to `world`.
    pub const fn new(world: WorldState) -> Self {
        Self {
            world,
            modified_leaders: BTreeSet::new(),
            modified_locations: BTreeSet::new(),
            modified_armies: BTreeSet::new(),
            spawned_armies: Vec::new(),
            logs: Vec::new(),
            resource_deltas: BTreeMap::new(),
        }
    }

    /// The working world.
    pub const fn world(&self) -> &WorldState {
        &self.world
    }

    /// Current turn.
    pub const fn turn(&self) -> u32 {
        self.world.turn
    }

    /// Look up a leader.
    pub fn leader(&self, id: LeaderId) -> Option<&Leader> {
        self.world.leaders.get(&id)
    }

    /// Look up a territory.
    pub fn location(&self, id: LocationId) -> Option<&Location> {
        self.world.locations.get(&id)
    }

    /// Whether the leader was touched this turn.
    pub fn is_leader_modified(&self, id: LeaderId) -> bool {
        self.modified_leaders.contains(&id)
    }

    /// Whether the territory was touched this turn.
    pub fn is_location_modified(&self, id: LocationId) -> bool {
        self.modified_locations.contains(&id)
    }

    /// Logs emitted so far.
    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    // -----------------------------------------------------------------------
    // Generic mutation
    // -----------------------------------------------------------------------

    /// Mutate a leader in place and mark it modified.
    pub fn update_leader<T>(
        &mut self,
        id: LeaderId,
        f: impl FnOnce(&mut Leader) -> T,
    ) -> Result<T, AgentError> {
        let leader = self
            .world
            .leaders
            .get_mut(&id)
            .ok_or(AgentError::LeaderNotFound(id))?;
        let out = f(leader);
        self.modified_leaders.insert(id);
        Ok(out)
    }

    /// Mutate a territory in place and mark it modified.
    pub fn update_location<T>(
        &mut self,
        id: LocationId,
        f: impl FnOnce(&mut Location) -> T,
    ) -> Result<T, AgentError> {
        let location = self
            .world
            .locations
            .get_mut(&id)
            .ok_or(AgentError::LocationNotFound(id))?;
        let out = f(location);
        self.modified_locations.insert(id);
        Ok(out)
    }

    /// Mutate an army in place and mark it modified.
    pub fn update_army<T>(&mut self, id: ArmyId, f: impl FnOnce(&mut Army) -> T) -> Result<T, AgentError> {
        let army = self
            .world
            .armies
            .get_mut(&id)
            .ok_or(AgentError::ArmyNotFound(id))?;
        let out = f(army);
        if !self.spawned_armies.contains(&id) {
            self.modified_armies.insert(id);
        }
        Ok(out)
    }

    /// Replace the leader stored under `leader.id`.
    pub fn replace_leader(&mut self, leader: Leader) -> Result<(), AgentError> {
        let id = leader.id;
        let slot = self
            .world
            .leaders
            .get_mut(&id)
            .ok_or(AgentError::LeaderNotFound(id))?;
        *slot = leader;
        self.modified_leaders.insert(id);
        Ok(())
    }

    /// Replace the territory stored under `location.id`.
    pub fn replace_location(&mut self, location: Location) -> Result<(), AgentError> {
        let id = location.id;
        let slot = self
            .world
            .locations
            .get_mut(&id)
            .ok_or(AgentError::LocationNotFound(id))?;
        *slot = location;
        self.modified_locations.insert(id);
        Ok(())
    }

    /// Add a newly raised army.
    pub fn spawn_army(&mut self, army: Army) {
        info!(
            army = %army.id,
            faction = %army.faction,
            location = %army.location,
            strength = army.strength,
            "army spawned"
        );
        self.spawned_armies.push(army.id);
        self.world.insert_army(army);
    }

    /// Record a game log.
    pub fn push_log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }

    /// Record several game logs.
    pub fn extend_logs(&mut self, entries: impl IntoIterator<Item = LogEntry>) {
        self.logs.extend(entries);
    }

    /// Move resources for `faction`. Gold lands in (or leaves) the treasury
    /// immediately; food is only recorded.
    pub fn credit(&mut self, faction: FactionId, delta: ResourceDelta) {
        if delta.is_zero() {
            return;
        }
        let treasury = self.world.resources_mut(faction);
        treasury.gold = shift(treasury.gold, delta.gold, u32::MAX);
        treasury.clandestine_budget = treasury.clandestine_budget.min(treasury.gold);
        self.resource_deltas
            .entry(faction)
            .or_default()
            .accumulate(delta);
    }

    /// Set the portion of `faction`'s treasury earmarked for clandestine
    /// work. The earmark never exceeds the treasury. Returns the new value.
    pub fn earmark(&mut self, faction: FactionId, budget: u32) -> u32 {
        let treasury = self.world.resources_mut(faction);
        let before = treasury.clandestine_budget;
        treasury.clandestine_budget = budget.min(treasury.gold);
        if treasury.clandestine_budget != before {
            debug!(
                faction = %faction,
                before,
                after = treasury.clandestine_budget,
                "clandestine budget earmarked"
            );
        }
        treasury.clandestine_budget
    }

    // -----------------------------------------------------------------------
    // Leader transitions
    // -----------------------------------------------------------------------

    /// Move `gold` from the faction's clandestine budget to the leader.
    pub fn fund_mission(&mut self, leader_id: LeaderId, gold: u32) -> Result<(), AgentError> {
        let faction = self
            .leader(leader_id)
            .ok_or(AgentError::LeaderNotFound(leader_id))?
            .faction;
        let available = self.world.resources_of(faction).clandestine_budget;
        if gold > available {
            return Err(AgentError::InsufficientBudget {
                leader: leader_id,
                requested: gold,
                available,
            });
        }
        let treasury = self.world.resources_mut(faction);
        treasury.clandestine_budget = treasury.clandestine_budget.saturating_sub(gold);
        treasury.gold = treasury.gold.saturating_sub(gold);
        self.update_leader(leader_id, |l| {
            l.clandestine_budget = l.clandestine_budget.saturating_add(gold);
        })?;
        let amount = i64::from(gold);
        self.resource_deltas
            .entry(faction)
            .or_default()
            .accumulate(ResourceDelta::gold(amount.saturating_neg()));
        debug!(leader = %leader_id, gold, "mission funded");
        Ok(())
    }

    /// Return the leader's remaining budget to the faction treasury.
    pub fn refund_budget(&mut self, leader_id: LeaderId) -> Result<u32, AgentError> {
        let (faction, refund) = self.update_leader(leader_id, |l| {
            let refund = l.clandestine_budget;
            l.clandestine_budget = 0;
            (l.faction, refund)
        })?;
        if refund > 0 {
            self.credit(faction, ResourceDelta::gold(i64::from(refund)));
        }
        Ok(refund)
    }

    /// Put the leader on the road. Mission state is dropped; the budget
    /// travels with the leader.
    pub fn begin_travel(
        &mut self,
        leader_id: LeaderId,
        destination: LocationId,
        turns: u32,
        purpose: TravelPurpose,
    ) -> Result<(), AgentError> {
        if !self.world.locations.contains_key(&destination) {
            return Err(AgentError::LocationNotFound(destination));
        }
        self.update_leader(leader_id, |l| {
            l.clear_mission_state();
            l.status = LeaderStatus::Moving;
            l.travel = Some(Travel {
                destination,
                turns_remaining: turns.max(1),
                purpose,
            });
        })?;
        debug!(leader = %leader_id, destination = %destination, turns, "travel started");
        Ok(())
    }

    /// Abandon the leader's clandestine mission and head for `destination`.
    ///
    /// The remaining budget is refunded to the treasury. Refused while a
    /// Grand Insurrection is in its final risk band.
    pub fn exfiltrate(
        &mut self,
        leader_id: LeaderId,
        destination: LocationId,
        turns: u32,
        config: &ClandestineConfig,
    ) -> Result<u32, AgentError> {
        let leader = self
            .leader(leader_id)
            .ok_or(AgentError::LeaderNotFound(leader_id))?;
        let turn = self.turn();
        let locked = leader.active_actions.iter().any(|a| {
            a.action.kind() == ActionKind::PrepareGrandInsurrection
                && a.turn_started
                    .is_some_and(|started| config.in_final_band(started, turn))
        });
        if locked {
            return Err(AgentError::ExfiltrationRefused {
                leader: leader_id,
                reason: String::from("grand insurrection is about to break out"),
            });
        }

        let refund = self.refund_budget(leader_id)?;
        self.begin_travel(leader_id, destination, turns, TravelPurpose::Evacuate)?;
        info!(leader = %leader_id, destination = %destination, refund, "leader exfiltrated");
        Ok(refund)
    }

    /// Kill a leader: mission state is dropped, command and guard duties end.
    pub fn kill_leader(&mut self, leader_id: LeaderId) -> Result<(), AgentError> {
        let army = self.update_leader(leader_id, |l| {
            l.status = LeaderStatus::Dead;
            l.clear_mission_state();
            l.travel = None;
            l.protecting = None;
            l.army.take()
        })?;
        if let Some(army_id) = army {
            // The army may have been destroyed elsewhere.
            let _ = self.update_army(army_id, |a| a.commander = None);
        }
        info!(leader = %leader_id, "leader killed");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Completion
    // -----------------------------------------------------------------------

    /// Hand back the new world and the change-set of this turn.
    pub fn finish(self) -> (WorldState, TurnDelta) {
        let leaders = self
            .modified_leaders
            .iter()
            .filter_map(|id| self.world.leaders.get(id).cloned())
            .collect();
        let locations = self
            .modified_locations
            .iter()
            .filter_map(|id| self.world.locations.get(id).cloned())
            .collect();
        let armies = self
            .modified_armies
            .iter()
            .filter_map(|id| self.world.armies.get(id).cloned())
            .collect();
        let spawned_armies = self
            .spawned_armies
            .iter()
            .filter_map(|id| self.world.armies.get(id).cloned())
            .collect();
        let delta = TurnDelta {
            leaders,
            locations,
            armies,
            spawned_armies,
            logs: self.logs,
            resource_deltas: self.resource_deltas,
        };
        (self.world, delta)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use intrigue_types::{
        ActiveClandestineAction, ClandestineAction, FactionResources, LocationType,
    };

    use super::*;

    fn make_world() -> (WorldState, LeaderId, LocationId, LocationId) {
        let mut world = WorldState {
            turn: 6,
            ..WorldState::default()
        };
        let home = Location {
            id: LocationId::new(),
            name: String::from("Ostrava"),
            faction: FactionId(1),
            stability: 60,
            resentment: BTreeMap::new(),
            population: 40_000,
            gold_income: 30,
            food_stock: 50,
            food_consumption: 5,
            kind: LocationType::City,
            linked_location: None,
            active_policies: BTreeSet::new(),
            last_make_examples_turn: None,
        };
        let mut enemy = home.clone();
        enemy.id = LocationId::new();
        enemy.name = String::from("Lunca");
        enemy.faction = FactionId(2);
        let mut leader = Leader::new("Radu", FactionId(1), enemy.id);
        leader.status = LeaderStatus::Undercover;
        leader.clandestine_budget = 80;
        leader.detection_level = 30;
        let ids = (leader.id, home.id, enemy.id);
        world.insert_location(home);
        world.insert_location(enemy);
        world.insert_leader(leader);
        world.resources.insert(
            FactionId(1),
            FactionResources {
                gold: 1000,
                clandestine_budget: 300,
            },
        );
        (world, ids.0, ids.1, ids.2)
    }

    #[test]
    fn exfiltration_refunds_and_resets_detection() {
        let (world, leader_id, home, _) = make_world();
        let mut manager = LeaderStateManager::new(world);
        let refund = manager.exfiltrate(leader_id, home, 2, &ClandestineConfig::default());
        assert!(refund.is_ok_and(|r| r == 80));
        let leader = manager.leader(leader_id);
        assert!(leader.is_some_and(|l| l.detection_level == 0 && l.status == LeaderStatus::Moving));
        assert_eq!(manager.world().resources_of(FactionId(1)).gold, 1080);

        let (_, delta) = manager.finish();
        assert_eq!(delta.leaders.len(), 1);
        assert_eq!(
            delta.resource_deltas.get(&FactionId(1)).map(|d| d.gold),
            Some(80)
        );
    }

    #[test]
    fn exfiltration_refused_in_final_band() {
        let (world, leader_id, home, _) = make_world();
        let mut manager = LeaderStateManager::new(world);
        let _ = manager.update_leader(leader_id, |l| {
            l.status = LeaderStatus::OnMission;
            let mut action =
                ActiveClandestineAction::with_gold(ClandestineAction::PrepareGrandInsurrection, 300);
            action.turn_started = Some(3);
            l.active_actions.push(action);
        });
        let result = manager.exfiltrate(leader_id, home, 2, &ClandestineConfig::default());
        assert!(matches!(result, Err(AgentError::ExfiltrationRefused { .. })));
        assert!(manager.leader(leader_id).is_some_and(|l| l.clandestine_budget == 80));
    }

    #[test]
    fn funding_respects_clandestine_budget() {
        let (world, leader_id, _, _) = make_world();
        let mut manager = LeaderStateManager::new(world);
        assert!(manager.fund_mission(leader_id, 200).is_ok());
        let treasury = manager.world().resources_of(FactionId(1));
        assert_eq!(treasury.clandestine_budget, 100);
        assert_eq!(treasury.gold, 800);
        assert!(matches!(
            manager.fund_mission(leader_id, 200),
            Err(AgentError::InsufficientBudget { available: 100, .. })
        ));
    }

    #[test]
    fn earmark_is_bounded_by_the_treasury() {
        let (world, _, _, _) = make_world();
        let mut manager = LeaderStateManager::new(world);
        assert_eq!(manager.earmark(FactionId(1), 5000), 1000);
        assert_eq!(manager.earmark(FactionId(1), 250), 250);
        assert_eq!(manager.world().resources_of(FactionId(1)).gold, 1000);
    }

    #[test]
    fn missing_leader_is_reported() {
        let (world, _, _, _) = make_world();
        let mut manager = LeaderStateManager::new(world);
        let ghost = LeaderId::new();
        assert!(matches!(
            manager.update_leader(ghost, |l| l.detection_level = 1),
            Err(AgentError::LeaderNotFound(id)) if id == ghost
        ));
    }

    #[test]
    fn unmodified_entities_stay_out_of_delta() {
        let (world, _, _, _) = make_world();
        let manager = LeaderStateManager::new(world);
        let (_, delta) = manager.finish();
        assert!(delta.leaders.is_empty());
        assert!(delta.locations.is_empty());
    }
}
