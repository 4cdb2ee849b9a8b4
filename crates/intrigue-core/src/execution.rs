//! Role execution and travel resolution.
//!
//! Turns accepted [`RoleAssignment`]s into state changes through the
//! [`LeaderStateManager`]: leaders already at their target take up the role
//! at once, everyone else sets off with a [`TravelPurpose`] that is carried
//! out on arrival by [`resolve_travel`].

use tracing::{debug, info, warn};

use intrigue_agents::{
    AgentError, ClandestineConfig, GovernorPolicyEngine, LeaderStateManager, RiskInputs,
    plan_minor_actions,
};
use intrigue_types::{
    ActiveClandestineAction, ArmyId, ClandestineAction, ClandestineMission, FactionId,
    GovernorPolicy, LeaderId, LeaderStatus, LocationId, LogEntry, Severity, TravelPurpose,
};

use crate::assignment::AssignmentPlan;
use crate::config::FactionStrategy;
use crate::scoring::{Role, RoleAssignment};

/// Collaborators role execution needs.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionContext<'a> {
    /// The faction's strategy.
    pub strategy: &'a FactionStrategy,
    /// Action tunables.
    pub clandestine: &'a ClandestineConfig,
    /// Governor appointments.
    pub governor: &'a GovernorPolicyEngine,
}

// ---------------------------------------------------------------------------
// Plans
// ---------------------------------------------------------------------------

/// Carry out every assignment of `plan`. Failures are logged and skipped.
pub fn execute_plan(
    manager: &mut LeaderStateManager,
    plan: &AssignmentPlan,
    ctx: &ExecutionContext<'_>,
) {
    for assignment in &plan.assignments {
        if let Err(err) = execute_assignment(manager, assignment, ctx) {
            warn!(
                leader = %assignment.leader,
                role = ?assignment.role.kind(),
                error = %err,
                "assignment skipped"
            );
        }
    }
}

/// Carry out one assignment.
pub fn execute_assignment(
    manager: &mut LeaderStateManager,
    assignment: &RoleAssignment,
    ctx: &ExecutionContext<'_>,
) -> Result<(), AgentError> {
    let leader_id = assignment.leader;
    let turns = assignment.travel_turns;
    match assignment.role {
        Role::Governor { location, policy } => {
            govern(manager, leader_id, location, policy, turns, ctx)
        }
        Role::Stabilizer { location } => govern(
            manager,
            leader_id,
            location,
            Some(GovernorPolicy::StabilizeRegion),
            turns,
            ctx,
        ),
        Role::Clandestine { location, mission } => {
            manager.fund_mission(leader_id, mission.gold())?;
            if assignment.located {
                start_mission(manager, leader_id, location, mission, ctx)
            } else {
                manager.begin_travel(leader_id, location, turns, TravelPurpose::Mission { mission })
            }
        }
        Role::Commander { army, location } => {
            if assignment.located {
                take_command(manager, leader_id, army)
            } else {
                manager.begin_travel(leader_id, location, turns, TravelPurpose::Command { army })
            }
        }
        Role::Protector { leader, location } => {
            if assignment.located {
                guard(manager, leader_id, leader)
            } else {
                manager.begin_travel(leader_id, location, turns, TravelPurpose::Protect { leader })
            }
        }
        Role::Idle => manager.update_leader(leader_id, |l| {
            if l.status == LeaderStatus::Governing {
                l.status = LeaderStatus::Available;
            }
        }),
    }
}

fn govern(
    manager: &mut LeaderStateManager,
    leader_id: LeaderId,
    location: LocationId,
    policy: Option<GovernorPolicy>,
    turns: u32,
    ctx: &ExecutionContext<'_>,
) -> Result<(), AgentError> {
    let here = manager
        .leader(leader_id)
        .ok_or(AgentError::LeaderNotFound(leader_id))?
        .location;
    if here == location {
        ctx.governor.appoint(manager, leader_id, location, policy)
    } else {
        manager.begin_travel(leader_id, location, turns, TravelPurpose::Govern { policy })
    }
}

fn take_command(
    manager: &mut LeaderStateManager,
    leader_id: LeaderId,
    army: ArmyId,
) -> Result<(), AgentError> {
    manager.update_army(army, |a| a.commander = Some(leader_id))?;
    let previous = manager.update_leader(leader_id, |l| {
        l.status = LeaderStatus::Available;
        l.protecting = None;
        l.army.replace(army)
    })?;
    if let Some(old) = previous.filter(|old| *old != army) {
        // The old army may be gone.
        if let Err(e) = manager.update_army(old, |a| {
            if a.commander == Some(leader_id) {
                a.commander = None;
            }
        }) {
            debug!(leader = %leader_id, army = %old, error = %e, "previous army not released");
        }
    }
    debug!(leader = %leader_id, army = %army, "command taken");
    Ok(())
}

fn guard(
    manager: &mut LeaderStateManager,
    leader_id: LeaderId,
    target: LeaderId,
) -> Result<(), AgentError> {
    manager.update_leader(leader_id, |l| {
        l.status = LeaderStatus::Available;
        l.protecting = Some(target);
    })?;
    debug!(leader = %leader_id, target = %target, "guard posted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Missions
// ---------------------------------------------------------------------------

/// Put a funded leader to work at `location`.
///
/// The leader's actions are built from the mission; the detection state
/// machine initializes them on its next pass. A minor mission that finds
/// nothing safe to do refunds its budget and stands the leader down.
pub fn start_mission(
    manager: &mut LeaderStateManager,
    leader_id: LeaderId,
    location_id: LocationId,
    mission: ClandestineMission,
    ctx: &ExecutionContext<'_>,
) -> Result<(), AgentError> {
    let leader = manager
        .leader(leader_id)
        .ok_or(AgentError::LeaderNotFound(leader_id))?
        .clone();
    let location = manager
        .location(location_id)
        .ok_or(AgentError::LocationNotFound(location_id))?
        .clone();

    let (actions, status) = match mission {
        ClandestineMission::GrandInsurrection { gold } => (
            vec![ActiveClandestineAction::with_gold(
                ClandestineAction::PrepareGrandInsurrection,
                gold,
            )],
            LeaderStatus::OnMission,
        ),
        ClandestineMission::InciteNeutral { gold } => (
            vec![ActiveClandestineAction::with_gold(
                ClandestineAction::InciteNeutralInsurrections,
                gold,
            )],
            LeaderStatus::Undercover,
        ),
        ClandestineMission::Assassination { target, gold } => (
            vec![ActiveClandestineAction::with_gold(
                ClandestineAction::AssassinateLeader { target },
                gold,
            )],
            LeaderStatus::Undercover,
        ),
        ClandestineMission::MinorSabotage { .. } => {
            let mut positioned = leader.clone();
            positioned.location = location_id;
            let inputs = RiskInputs::effective(manager.world(), &positioned, true);
            let planned = plan_minor_actions(
                &positioned,
                &location,
                inputs,
                0,
                leader.clandestine_budget,
                ctx.strategy.min_safe_turns,
                ctx.clandestine,
            );
            (planned, LeaderStatus::Undercover)
        }
    };

    let turn = manager.turn();
    if actions.is_empty() {
        let refund = manager.refund_budget(leader_id)?;
        manager.update_leader(leader_id, |l| {
            l.clear_mission_state();
            l.status = LeaderStatus::Available;
            l.location = location_id;
            l.travel = None;
        })?;
        manager.push_log(
            LogEntry::to_faction(
                turn,
                Severity::Info,
                leader.faction,
                format!(
                    "{} finds nothing safe to do in {} and returns {refund} gold",
                    leader.name, location.name
                ),
            )
            .at(location_id)
            .about(leader_id),
        );
        return Ok(());
    }

    let count = actions.len();
    manager.update_leader(leader_id, |l| {
        l.clear_mission_state();
        l.status = status;
        l.location = location_id;
        l.travel = None;
        l.army = None;
        l.protecting = None;
        l.active_actions = actions;
        l.detection_location = Some(location_id);
    })?;
    manager.push_log(
        LogEntry::to_faction(
            turn,
            Severity::Info,
            leader.faction,
            format!("{} goes to ground in {}", leader.name, location.name),
        )
        .at(location_id)
        .about(leader_id),
    );
    info!(leader = %leader_id, location = %location_id, ?mission, actions = count, "mission started");
    Ok(())
}

// ---------------------------------------------------------------------------
// Travel
// ---------------------------------------------------------------------------

/// Advance every travelling leader of `faction` by one turn and carry out
/// the purpose of those who arrive. Returns the leaders that arrived.
pub fn resolve_travel(
    manager: &mut LeaderStateManager,
    faction: FactionId,
    ctx: &ExecutionContext<'_>,
) -> Vec<LeaderId> {
    let travellers: Vec<LeaderId> = manager
        .world()
        .leaders_of(faction)
        .filter(|l| l.status == LeaderStatus::Moving)
        .map(|l| l.id)
        .collect();

    let mut arrived = Vec::new();
    for leader_id in travellers {
        let step = manager.update_leader(leader_id, |l| {
            let Some(travel) = l.travel.as_mut() else {
                l.status = LeaderStatus::Available;
                return None;
            };
            travel.turns_remaining = travel.turns_remaining.saturating_sub(1);
            if travel.turns_remaining > 0 {
                return None;
            }
            let travel = *travel;
            l.location = travel.destination;
            l.travel = None;
            l.status = LeaderStatus::Available;
            Some(travel)
        });
        let travel = match step {
            Ok(Some(travel)) => travel,
            Ok(None) => continue,
            Err(err) => {
                warn!(leader = %leader_id, error = %err, "traveller vanished");
                continue;
            }
        };
        debug!(leader = %leader_id, destination = %travel.destination, "leader arrived");
        if let Err(err) = arrive(manager, leader_id, travel.destination, travel.purpose, ctx) {
            warn!(leader = %leader_id, error = %err, "arrival purpose skipped");
        }
        arrived.push(leader_id);
    }
    arrived
}

fn arrive(
    manager: &mut LeaderStateManager,
    leader_id: LeaderId,
    destination: LocationId,
    purpose: TravelPurpose,
    ctx: &ExecutionContext<'_>,
) -> Result<(), AgentError> {
    let faction = manager
        .leader(leader_id)
        .ok_or(AgentError::LeaderNotFound(leader_id))?
        .faction;
    let location = manager
        .location(destination)
        .ok_or(AgentError::LocationNotFound(destination))?;
    let friendly = location.faction == faction;

    match purpose {
        TravelPurpose::Mission { mission } => {
            if friendly {
                let refund = manager.refund_budget(leader_id)?;
                debug!(leader = %leader_id, refund, "mission target became friendly");
                Ok(())
            } else {
                start_mission(manager, leader_id, destination, mission, ctx)
            }
        }
        TravelPurpose::Govern { policy } => {
            let governed = manager
                .world()
                .governor_at(destination)
                .is_some_and(|g| g.id != leader_id);
            if friendly && !governed {
                ctx.governor.appoint(manager, leader_id, destination, policy)
            } else {
                Ok(())
            }
        }
        TravelPurpose::Command { army } => {
            let usable = manager
                .world()
                .armies
                .get(&army)
                .is_some_and(|a| a.faction == faction);
            if usable {
                take_command(manager, leader_id, army)
            } else {
                Ok(())
            }
        }
        TravelPurpose::Protect { leader } => {
            let alive = manager.leader(leader).is_some_and(|t| t.is_alive());
            if alive { guard(manager, leader_id, leader) } else { Ok(()) }
        }
        TravelPurpose::Evacuate => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use intrigue_agents::GovernorConfig;
    use intrigue_types::{
        ActionKind, AffinityTier, Army, FactionResources, Leader, Location, LocationType, Travel,
        WorldState,
    };

    use super::*;

    fn make_location(name: &str, faction: FactionId) -> Location {
        Location {
            id: LocationId::new(),
            name: name.to_owned(),
            faction,
            stability: 60,
            resentment: BTreeMap::new(),
            population: 50_000,
            gold_income: 30,
            food_stock: 40,
            food_consumption: 5,
            kind: LocationType::City,
            linked_location: None,
            active_policies: BTreeSet::new(),
            last_make_examples_turn: None,
        }
    }

    struct Fixture {
        manager: LeaderStateManager,
        strategy: FactionStrategy,
        clandestine: ClandestineConfig,
        governor: GovernorPolicyEngine,
        home: LocationId,
        enemy: LocationId,
        leader: LeaderId,
    }

    fn run(f: &mut Fixture, assignment: &RoleAssignment) -> Result<(), AgentError> {
        let ctx = ExecutionContext {
            strategy: &f.strategy,
            clandestine: &f.clandestine,
            governor: &f.governor,
        };
        execute_assignment(&mut f.manager, assignment, &ctx)
    }

    fn travel(f: &mut Fixture) -> Vec<LeaderId> {
        let ctx = ExecutionContext {
            strategy: &f.strategy,
            clandestine: &f.clandestine,
            governor: &f.governor,
        };
        resolve_travel(&mut f.manager, FactionId(1), &ctx)
    }

    fn fixture() -> Fixture {
        let mut world = WorldState {
            turn: 4,
            ..WorldState::default()
        };
        let home = make_location("Aldmoor", FactionId(1));
        let enemy = make_location("Varn", FactionId(2));
        let leader = Leader::new("Rook", FactionId(1), home.id);
        let ids = (home.id, enemy.id, leader.id);
        world.insert_location(home);
        world.insert_location(enemy);
        world.insert_leader(leader);
        world.resources.insert(
            FactionId(1),
            FactionResources {
                gold: 1000,
                clandestine_budget: 500,
            },
        );
        Fixture {
            manager: LeaderStateManager::new(world),
            strategy: FactionStrategy::new(FactionId(1), "Aurel"),
            clandestine: ClandestineConfig::default(),
            governor: GovernorPolicyEngine::new(GovernorConfig::default()),
            home: ids.0,
            enemy: ids.1,
            leader: ids.2,
        }
    }

    fn assignment(leader: LeaderId, role: Role, located: bool, travel_turns: u32) -> RoleAssignment {
        RoleAssignment {
            leader,
            role,
            score: 50.0,
            gold: role.gold(),
            travel_turns,
            located,
            tier: AffinityTier::None,
            justification: String::new(),
        }
    }

    #[test]
    fn distant_mission_is_funded_and_travels() {
        let mut f = fixture();
        let mission = ClandestineMission::GrandInsurrection { gold: 300 };
        let role = Role::Clandestine {
            location: f.enemy,
            mission,
        };
        let id = f.leader;
        run(&mut f, &assignment(id, role, false, 2)).unwrap();

        let leader = f.manager.leader(f.leader).unwrap();
        assert_eq!(leader.status, LeaderStatus::Moving);
        assert_eq!(leader.clandestine_budget, 300);
        assert_eq!(
            leader.travel,
            Some(Travel {
                destination: f.enemy,
                turns_remaining: 2,
                purpose: TravelPurpose::Mission { mission },
            })
        );
        let treasury = f.manager.world().resources_of(FactionId(1));
        assert_eq!(treasury.clandestine_budget, 200);
        assert_eq!(treasury.gold, 700);
    }

    #[test]
    fn arrival_starts_the_mission() {
        let mut f = fixture();
        let mission = ClandestineMission::GrandInsurrection { gold: 300 };
        let role = Role::Clandestine {
            location: f.enemy,
            mission,
        };
        let id = f.leader;
        run(&mut f, &assignment(id, role, false, 2)).unwrap();

        assert!(travel(&mut f).is_empty());
        assert_eq!(travel(&mut f), vec![f.leader]);

        let leader = f.manager.leader(f.leader).unwrap();
        assert_eq!(leader.status, LeaderStatus::OnMission);
        assert_eq!(leader.location, f.enemy);
        assert_eq!(leader.detection_level, 0);
        assert!(leader.has_action(ActionKind::PrepareGrandInsurrection));
    }

    #[test]
    fn located_minor_mission_plans_actions() {
        let mut f = fixture();
        let agent = Leader::new("Wren", FactionId(1), f.enemy);
        let agent_id = agent.id;
        let mut world = f.manager.world().clone();
        world.insert_leader(agent);
        f.manager = LeaderStateManager::new(world);

        let role = Role::Clandestine {
            location: f.enemy,
            mission: ClandestineMission::MinorSabotage { gold: 100 },
        };
        run(&mut f, &assignment(agent_id, role, true, 0)).unwrap();
        let agent = f.manager.leader(agent_id).unwrap();
        assert_eq!(agent.status, LeaderStatus::Undercover);
        assert_eq!(agent.clandestine_budget, 100);
        assert_eq!(agent.active_actions.len(), 2);
        assert_eq!(f.manager.logs().len(), 1);
    }

    #[test]
    fn governor_appointed_in_place() {
        let mut f = fixture();
        let role = Role::Stabilizer { location: f.home };
        let id = f.leader;
        run(&mut f, &assignment(id, role, true, 0)).unwrap();
        assert_eq!(f.manager.leader(f.leader).unwrap().status, LeaderStatus::Governing);
        assert!(
            f.manager
                .location(f.home)
                .unwrap()
                .has_policy(GovernorPolicy::StabilizeRegion)
        );
    }

    #[test]
    fn command_moves_to_the_new_army() {
        let mut f = fixture();
        let (old, fresh) = (ArmyId::new(), ArmyId::new());
        let mut world = f.manager.world().clone();
        world.insert_army(Army {
            id: old,
            faction: FactionId(1),
            location: f.home,
            strength: 800,
            commander: Some(f.leader),
            is_insurgent: false,
        });
        world.insert_army(Army {
            id: fresh,
            faction: FactionId(1),
            location: f.home,
            strength: 1200,
            commander: None,
            is_insurgent: false,
        });
        if let Some(l) = world.leaders.get_mut(&f.leader) {
            l.army = Some(old);
        }
        f.manager = LeaderStateManager::new(world);

        let id = f.leader;
        let role = Role::Commander {
            army: fresh,
            location: f.home,
        };
        run(&mut f, &assignment(id, role, true, 0)).unwrap();
        let armies = &f.manager.world().armies;
        assert_eq!(armies.get(&fresh).unwrap().commander, Some(f.leader));
        assert_eq!(armies.get(&old).unwrap().commander, None);
        assert_eq!(f.manager.leader(f.leader).unwrap().army, Some(fresh));
    }

    #[test]
    fn command_survives_a_disbanded_former_army() {
        let mut f = fixture();
        let fresh = ArmyId::new();
        let mut world = f.manager.world().clone();
        world.insert_army(Army {
            id: fresh,
            faction: FactionId(1),
            location: f.home,
            strength: 1200,
            commander: None,
            is_insurgent: false,
        });
        if let Some(l) = world.leaders.get_mut(&f.leader) {
            // Its former army no longer exists.
            l.army = Some(ArmyId::new());
        }
        f.manager = LeaderStateManager::new(world);

        let id = f.leader;
        let role = Role::Commander {
            army: fresh,
            location: f.home,
        };
        run(&mut f, &assignment(id, role, true, 0)).unwrap();
        assert_eq!(f.manager.leader(f.leader).unwrap().army, Some(fresh));
        assert_eq!(f.manager.world().armies.len(), 1);
    }

    #[test]
    fn mission_to_a_recaptured_territory_is_refunded() {
        let mut f = fixture();
        let role = Role::Clandestine {
            location: f.enemy,
            mission: ClandestineMission::MinorSabotage { gold: 100 },
        };
        let id = f.leader;
        run(&mut f, &assignment(id, role, false, 1)).unwrap();
        f.manager
            .update_location(f.enemy, |l| l.faction = FactionId(1))
            .unwrap();

        travel(&mut f);
        let leader = f.manager.leader(f.leader).unwrap();
        assert_eq!(leader.status, LeaderStatus::Available);
        assert_eq!(leader.clandestine_budget, 0);
        assert_eq!(f.manager.world().resources_of(FactionId(1)).gold, 1000);
    }
}
