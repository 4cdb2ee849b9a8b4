//! The world arena: every entity addressed by a stable id.
//!
//! Collections are `BTreeMap`s so iteration order is the id order, which
//! keeps seeded turns reproducible.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::LeaderStatus;
use crate::ids::{ArmyId, FactionId, LeaderId, LocationId};
use crate::structs::{Army, FactionResources, Leader, Location, Road};

/// Snapshot of everything the engine reads and writes in a turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    /// Current turn number (turn 1 is the opening turn).
    pub turn: u32,
    /// Leaders of all factions.
    pub leaders: BTreeMap<LeaderId, Leader>,
    /// Territories.
    pub locations: BTreeMap<LocationId, Location>,
    /// Armies.
    pub armies: BTreeMap<ArmyId, Army>,
    /// Road network.
    pub roads: Vec<Road>,
    /// Treasury per faction.
    pub resources: BTreeMap<FactionId, FactionResources>,
}

impl WorldState {
    /// Add a leader, keyed by its id.
    pub fn insert_leader(&mut self, leader: Leader) {
        self.leaders.insert(leader.id, leader);
    }

    /// Add a territory, keyed by its id.
    pub fn insert_location(&mut self, location: Location) {
        self.locations.insert(location.id, location);
    }

    /// Add an army, keyed by its id.
    pub fn insert_army(&mut self, army: Army) {
        self.armies.insert(army.id, army);
    }

    /// The living leader governing `location`, if any.
    pub fn governor_at(&self, location: LocationId) -> Option<&Leader> {
        self.leaders
            .values()
            .find(|l| l.status == LeaderStatus::Governing && l.location == location)
    }

    /// Territories controlled by `faction`, in id order.
    pub fn friendly_locations(&self, faction: FactionId) -> impl Iterator<Item = &Location> {
        self.locations.values().filter(move |l| l.faction == faction)
    }

    /// Living leaders of `faction`, in id order.
    pub fn leaders_of(&self, faction: FactionId) -> impl Iterator<Item = &Leader> {
        self.leaders
            .values()
            .filter(move |l| l.faction == faction && l.is_alive())
    }

    /// Total soldiers at `location` not belonging to `faction`.
    pub fn hostile_soldiers_at(&self, location: LocationId, faction: FactionId) -> u32 {
        self.armies
            .values()
            .filter(|a| a.location == location && a.faction != faction)
            .fold(0_u32, |acc, a| acc.saturating_add(a.strength))
    }

    /// Treasury of `faction`, zeroed when unrecorded.
    pub fn resources_of(&self, faction: FactionId) -> FactionResources {
        self.resources.get(&faction).copied().unwrap_or_default()
    }

    /// Mutable treasury of `faction`, created on first use.
    pub fn resources_mut(&mut self, faction: FactionId) -> &mut FactionResources {
        self.resources.entry(faction).or_default()
    }

    /// Whether a city and its countryside are both held by the city's
    /// controller. Territories without a link count as connected.
    pub fn is_supply_connected(&self, location: LocationId) -> bool {
        let Some(loc) = self.locations.get(&location) else {
            return false;
        };
        loc.linked_location
            .and_then(|linked| self.locations.get(&linked))
            .is_none_or(|linked| linked.faction == loc.faction)
    }
}
