//! Governor policy state machine.
//!
//! Policies live on territories. Full-time policies (`STABILIZE_REGION`,
//! `HUNT_NETWORKS`, `IMPROVE_ECONOMY`) are set by the governor's
//! assignment and exclude one another. The toggled policies follow the
//! territory's condition with hysteresis:
//!
//! - `RATIONING` starts while the territory is cut off from its linked
//!   supply with at most `rationing_on_turns` turns of food, and ends at
//!   `rationing_off_turns` turns or once supply is restored.
//! - `MAKE_EXAMPLES` starts when resentment against the controller reaches
//!   `make_examples_on` and ends below `make_examples_off`. The last turn it
//!   was active is recorded for the uprising cooldown.
//!
//! A territory without a governor of its controlling faction loses all of
//! its policies.

use tracing::{debug, warn};

use intrigue_types::{GovernorPolicy, LeaderId, LeaderStatus, Location, LocationId, PERCENT_MAX};

use crate::config::GovernorConfig;
use crate::error::AgentError;
use crate::state_manager::LeaderStateManager;

/// A policy switched on or off this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyChange {
    /// Territory concerned.
    pub location: LocationId,
    /// Policy switched.
    pub policy: GovernorPolicy,
    /// `true` when switched on.
    pub activated: bool,
}

/// Activate a full-time policy, dropping any other full-time policy.
///
/// Returns the full-time policies that were replaced. Toggled policies are
/// ignored.
pub fn activate_full_time(location: &mut Location, policy: GovernorPolicy) -> Vec<GovernorPolicy> {
    if !policy.is_full_time() {
        return Vec::new();
    }
    let replaced: Vec<GovernorPolicy> = location
        .active_policies
        .iter()
        .copied()
        .filter(|p| p.is_full_time() && *p != policy)
        .collect();
    for old in &replaced {
        location.active_policies.remove(old);
    }
    location.active_policies.insert(policy);
    replaced
}

/// Drop every full-time policy, keeping the toggled ones.
///
/// Returns the policies removed.
pub fn clear_full_time(location: &mut Location) -> Vec<GovernorPolicy> {
    let removed: Vec<GovernorPolicy> = location
        .active_policies
        .iter()
        .copied()
        .filter(|p| p.is_full_time())
        .collect();
    for old in &removed {
        location.active_policies.remove(old);
    }
    removed
}

/// Runs the policy state machine over all territories.
#[derive(Debug, Clone, Default)]
pub struct GovernorPolicyEngine {
    config: GovernorConfig,
}

impl GovernorPolicyEngine {
    /// Create an engine with the given thresholds.
    pub const fn new(config: GovernorConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use.
    pub const fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Install `leader` as governor of `location`, optionally with a
    /// full-time policy. Without one, any full-time policy left over from a
    /// previous appointment is lifted.
    pub fn appoint(
        &self,
        manager: &mut LeaderStateManager,
        leader: LeaderId,
        location: LocationId,
        policy: Option<GovernorPolicy>,
    ) -> Result<(), AgentError> {
        manager.update_leader(leader, |l| {
            l.status = LeaderStatus::Governing;
            l.location = location;
            l.travel = None;
        })?;
        match policy {
            Some(policy) => manager.update_location(location, |l| activate_full_time(l, policy))?,
            None => manager.update_location(location, clear_full_time)?,
        };
        debug!(leader = %leader, location = %location, ?policy, "governor appointed");
        Ok(())
    }

    /// Update every territory's policies for this turn.
    pub fn update(&self, manager: &mut LeaderStateManager) -> Vec<PolicyChange> {
        let turn = manager.turn();
        let ids: Vec<LocationId> = manager.world().locations.keys().copied().collect();
        let mut changes = Vec::new();

        for id in ids {
            let Some(mut location) = manager.location(id).cloned() else {
                continue;
            };
            let before = location.clone();
            let governor = manager
                .world()
                .governor_at(id)
                .filter(|g| g.faction == location.faction)
                .map(|g| g.stats.stability_per_turn());

            match governor {
                None => location.active_policies.clear(),
                Some(stability_per_turn) => {
                    let supplied = manager.world().is_supply_connected(id);
                    self.toggle_rationing(&mut location, supplied);
                    self.toggle_make_examples(&mut location, turn);
                    if location.has_policy(GovernorPolicy::StabilizeRegion) {
                        let gain = stability_per_turn.max(self.config.min_stabilize_gain);
                        location.stability =
                            location.stability.saturating_add(gain).min(PERCENT_MAX);
                    }
                }
            }

            for policy in before.active_policies.difference(&location.active_policies) {
                changes.push(PolicyChange {
                    location: id,
                    policy: *policy,
                    activated: false,
                });
            }
            for policy in location.active_policies.difference(&before.active_policies) {
                changes.push(PolicyChange {
                    location: id,
                    policy: *policy,
                    activated: true,
                });
            }

            if location != before {
                if let Err(err) = manager.replace_location(location) {
                    warn!(error = %err, "territory vanished during the policy pass");
                }
            }
        }

        for change in &changes {
            debug!(
                location = %change.location,
                policy = ?change.policy,
                activated = change.activated,
                "policy changed"
            );
        }
        changes
    }

    fn toggle_rationing(&self, location: &mut Location, supplied: bool) {
        // No consumption means the stock never runs out.
        let turns = location.turns_of_food().unwrap_or(u32::MAX);
        let active = location.has_policy(GovernorPolicy::Rationing);
        if !active && !supplied && turns <= self.config.rationing_on_turns {
            location.active_policies.insert(GovernorPolicy::Rationing);
        } else if active && (supplied || turns >= self.config.rationing_off_turns) {
            location.active_policies.remove(&GovernorPolicy::Rationing);
        }
    }

    fn toggle_make_examples(&self, location: &mut Location, turn: u32) {
        let resentment = location.resentment_against(location.faction);
        let active = location.has_policy(GovernorPolicy::MakeExamples);
        if !active && resentment >= self.config.make_examples_on {
            location.active_policies.insert(GovernorPolicy::MakeExamples);
        } else if active && resentment < self.config.make_examples_off {
            location.active_policies.remove(&GovernorPolicy::MakeExamples);
        }
        if location.has_policy(GovernorPolicy::MakeExamples) {
            location.last_make_examples_turn = Some(turn);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use intrigue_types::{FactionId, Leader, LeaderStats, LocationType, WorldState};

    use super::*;

    fn make_pair() -> (WorldState, LocationId, LocationId) {
        let city = Location {
            id: LocationId::new(),
            name: String::from("Halden"),
            faction: FactionId(1),
            stability: 50,
            resentment: BTreeMap::new(),
            population: 80_000,
            gold_income: 60,
            food_stock: 20,
            food_consumption: 10,
            kind: LocationType::City,
            linked_location: None,
            active_policies: BTreeSet::new(),
            last_make_examples_turn: None,
        };
        let mut rural = city.clone();
        rural.id = LocationId::new();
        rural.name = String::from("Halden Vale");
        rural.kind = LocationType::Rural;
        rural.linked_location = Some(city.id);
        let mut city = city;
        city.linked_location = Some(rural.id);

        let mut world = WorldState {
            turn: 7,
            ..WorldState::default()
        };
        let mut governor = Leader::new("Agnes", FactionId(1), city.id);
        governor.status = LeaderStatus::Governing;
        governor.stats = LeaderStats {
            stability_per_turn: Some(3),
            ..LeaderStats::default()
        };
        let ids = (city.id, rural.id);
        world.insert_location(city);
        world.insert_location(rural);
        world.insert_leader(governor);
        (world, ids.0, ids.1)
    }

    #[test]
    fn full_time_policies_are_exclusive() {
        let (world, city, _) = make_pair();
        let mut location = world.locations.get(&city).cloned().unwrap();
        location.active_policies.insert(GovernorPolicy::Rationing);
        assert!(activate_full_time(&mut location, GovernorPolicy::HuntNetworks).is_empty());
        let replaced = activate_full_time(&mut location, GovernorPolicy::StabilizeRegion);
        assert_eq!(replaced, vec![GovernorPolicy::HuntNetworks]);
        assert!(location.has_policy(GovernorPolicy::StabilizeRegion));
        assert!(location.has_policy(GovernorPolicy::Rationing));
        assert!(!location.has_policy(GovernorPolicy::HuntNetworks));
    }

    #[test]
    fn rationing_follows_supply_with_hysteresis() {
        let (mut world, city, rural) = make_pair();
        if let Some(r) = world.locations.get_mut(&rural) {
            r.faction = FactionId(2);
        }
        let engine = GovernorPolicyEngine::default();
        let mut manager = LeaderStateManager::new(world);

        // 20 / 10 = 2 turns of food, cut off.
        let changes = engine.update(&mut manager);
        assert!(changes.contains(&PolicyChange {
            location: city,
            policy: GovernorPolicy::Rationing,
            activated: true,
        }));

        // 4 turns: still rationing.
        let _ = manager.update_location(city, |l| l.food_stock = 40);
        let _ = engine.update(&mut manager);
        assert!(manager.location(city).is_some_and(|l| l.has_policy(GovernorPolicy::Rationing)));

        // 5 turns: rationing ends.
        let _ = manager.update_location(city, |l| l.food_stock = 50);
        let _ = engine.update(&mut manager);
        assert!(manager.location(city).is_some_and(|l| !l.has_policy(GovernorPolicy::Rationing)));
    }

    #[test]
    fn make_examples_hysteresis_and_cooldown_stamp() {
        let (mut world, city, _) = make_pair();
        if let Some(c) = world.locations.get_mut(&city) {
            c.set_resentment(FactionId(1), 60);
        }
        let engine = GovernorPolicyEngine::default();
        let mut manager = LeaderStateManager::new(world);
        let _ = engine.update(&mut manager);
        assert!(manager
            .location(city)
            .is_some_and(|l| l.has_policy(GovernorPolicy::MakeExamples) && l.last_make_examples_turn == Some(7)));

        let _ = manager.update_location(city, |l| l.set_resentment(FactionId(1), 45));
        let _ = engine.update(&mut manager);
        assert!(manager.location(city).is_some_and(|l| l.has_policy(GovernorPolicy::MakeExamples)));

        let _ = manager.update_location(city, |l| l.set_resentment(FactionId(1), 39));
        let _ = engine.update(&mut manager);
        assert!(manager.location(city).is_some_and(|l| !l.has_policy(GovernorPolicy::MakeExamples)));
    }

    #[test]
    fn stabilize_region_restores_order() {
        let (world, city, _) = make_pair();
        let engine = GovernorPolicyEngine::default();
        let mut manager = LeaderStateManager::new(world);
        let _ = manager.update_location(city, |l| activate_full_time(l, GovernorPolicy::StabilizeRegion));
        let _ = engine.update(&mut manager);
        assert!(manager.location(city).is_some_and(|l| l.stability == 53));
    }

    #[test]
    fn territory_without_governor_drops_policies() {
        let (mut world, _, rural) = make_pair();
        if let Some(r) = world.locations.get_mut(&rural) {
            r.active_policies.insert(GovernorPolicy::HuntNetworks);
        }
        let engine = GovernorPolicyEngine::default();
        let mut manager = LeaderStateManager::new(world);
        let changes = engine.update(&mut manager);
        assert!(manager.location(rural).is_some_and(|l| l.active_policies.is_empty()));
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn appointment_sets_status_and_policy() {
        let (mut world, _, rural) = make_pair();
        let deputy = Leader::new("Lutz", FactionId(1), rural);
        let deputy_id = deputy.id;
        world.insert_leader(deputy);
        let engine = GovernorPolicyEngine::default();
        let mut manager = LeaderStateManager::new(world);
        assert!(engine
            .appoint(&mut manager, deputy_id, rural, Some(GovernorPolicy::HuntNetworks))
            .is_ok());
        assert!(manager
            .leader(deputy_id)
            .is_some_and(|l| l.status == LeaderStatus::Governing));
        assert!(manager
            .location(rural)
            .is_some_and(|l| l.has_policy(GovernorPolicy::HuntNetworks)));
    }

    #[test]
    fn reappointment_without_policy_lifts_the_hunt() {
        let (world, city, _) = make_pair();
        let governor = world
            .leaders
            .values()
            .find(|l| l.name == "Agnes")
            .map(|l| l.id)
            .unwrap();
        let engine = GovernorPolicyEngine::default();
        let mut manager = LeaderStateManager::new(world);
        engine
            .appoint(&mut manager, governor, city, Some(GovernorPolicy::HuntNetworks))
            .unwrap();
        manager
            .update_location(city, |l| l.active_policies.insert(GovernorPolicy::Rationing))
            .unwrap();

        engine.appoint(&mut manager, governor, city, None).unwrap();
        let location = manager.location(city).unwrap();
        assert!(!location.has_policy(GovernorPolicy::HuntNetworks));
        assert!(location.has_policy(GovernorPolicy::Rationing));
    }
}
