//! Travel time between territories.
//!
//! The engine only needs "how many turns from A to B". [`TravelTime`] is
//! that question; [`RoadNetwork`] answers it with Dijkstra's algorithm over
//! the world's roads, and any closure of the right shape answers it too,
//! which keeps pathfinding swappable.

use std::collections::{BTreeMap, BTreeSet};

use intrigue_types::{FactionId, Location, LocationId, LocationType, Road, WorldState};

/// Turns needed to travel between two territories.
pub trait TravelTime {
    /// Turns from `from` to `to`, or `None` when `to` cannot be reached.
    /// Staying put takes 0 turns.
    fn turns_between(
        &self,
        from: LocationId,
        to: LocationId,
        locations: &BTreeMap<LocationId, Location>,
        roads: &[Road],
    ) -> Option<u32>;
}

impl<F> TravelTime for F
where
    F: Fn(LocationId, LocationId, &BTreeMap<LocationId, Location>, &[Road]) -> Option<u32>,
{
    fn turns_between(
        &self,
        from: LocationId,
        to: LocationId,
        locations: &BTreeMap<LocationId, Location>,
        roads: &[Road],
    ) -> Option<u32> {
        self(from, to, locations, roads)
    }
}

/// Shortest travel over roads, usable in both directions.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoadNetwork;

impl TravelTime for RoadNetwork {
    /// Uses Dijkstra's algorithm with a `BTreeSet` as the priority queue.
    fn turns_between(
        &self,
        from: LocationId,
        to: LocationId,
        locations: &BTreeMap<LocationId, Location>,
        roads: &[Road],
    ) -> Option<u32> {
        if !locations.contains_key(&from) || !locations.contains_key(&to) {
            return None;
        }
        if from == to {
            return Some(0);
        }

        let mut dist: BTreeMap<LocationId, u32> = BTreeMap::new();
        let mut queue: BTreeSet<(u32, LocationId)> = BTreeSet::new();
        dist.insert(from, 0);
        queue.insert((0, from));

        while let Some((current_dist, current)) = queue.pop_first() {
            if current == to {
                return Some(current_dist);
            }
            for road in roads {
                let neighbor = if road.from == current {
                    road.to
                } else if road.to == current {
                    road.from
                } else {
                    continue;
                };
                let Some(new_dist) = current_dist.checked_add(road.travel_turns) else {
                    continue;
                };
                let is_shorter = dist.get(&neighbor).is_none_or(|&existing| new_dist < existing);
                if is_shorter {
                    if let Some(&old) = dist.get(&neighbor) {
                        queue.remove(&(old, neighbor));
                    }
                    dist.insert(neighbor, new_dist);
                    queue.insert((new_dist, neighbor));
                }
            }
        }
        None
    }
}

/// Turns between two territories of `world`.
pub fn turns_between(
    travel: &dyn TravelTime,
    world: &WorldState,
    from: LocationId,
    to: LocationId,
) -> Option<u32> {
    travel.turns_between(from, to, &world.locations, &world.roads)
}

/// The closest territory held by `faction`, and the turns to get there.
/// Ties go to the lower id. Road stages are not a refuge.
pub fn nearest_friendly(
    travel: &dyn TravelTime,
    world: &WorldState,
    from: LocationId,
    faction: FactionId,
) -> Option<(LocationId, u32)> {
    world
        .friendly_locations(faction)
        .filter(|l| l.kind != LocationType::RoadStage)
        .filter_map(|l| turns_between(travel, world, from, l.id).map(|turns| (l.id, turns)))
        .min_by_key(|(id, turns)| (*turns, *id))
}
