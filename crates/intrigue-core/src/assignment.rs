//! Unified role assignment for one faction.
//!
//! Three phases:
//!
//! 1. **Reservation.** Leaders already committed keep their role: anyone
//!    travelling or on a locked mission, agents still working undercover,
//!    commanders of a living army, and protectors standing next to their
//!    charge. Then every urgent governance need locks the best governor
//!    standing in that territory.
//! 2. **Candidates.** Every other leader is scored for every role
//!    ([`score_leader`]).
//! 3. **Greedy pick.** Candidates are stable-sorted by score, then by
//!    "already there", affinity tier, travel time and leader id, and
//!    accepted in order while they respect exclusivity, the clandestine
//!    budget, the wealth floor and the mission cap.
//!
//! Leaders left over govern their own territory when it has no governor,
//! and idle otherwise.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info};

use intrigue_agents::ClandestineConfig;
use intrigue_types::{
    AffinityTier, ArmyId, GovernorPolicy, Leader, LeaderId, LeaderStatus, LocationId, LocationType,
    TravelPurpose, WorldState,
};

use crate::analysis::TerritoryAnalysis;
use crate::config::{FactionStrategy, ScoringConfig};
use crate::scoring::{Role, RoleAssignment, ScoringContext, governance_score, score_leader};
use crate::travel::TravelTime;

/// Everything the assignment engine reads for one faction.
#[derive(Clone, Copy)]
pub struct AssignmentContext<'a> {
    /// The world after this faction's earlier steps.
    pub world: &'a WorldState,
    /// The faction's strategy.
    pub strategy: &'a FactionStrategy,
    /// Score weights.
    pub scoring: &'a ScoringConfig,
    /// Action tunables.
    pub clandestine: &'a ClandestineConfig,
    /// Territory analysis of this turn.
    pub analysis: &'a TerritoryAnalysis,
    /// Travel-time oracle.
    pub travel: &'a dyn TravelTime,
}

impl std::fmt::Debug for AssignmentContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentContext")
            .field("faction", &self.strategy.faction)
            .field("turn", &self.world.turn)
            .finish_non_exhaustive()
    }
}

/// The roles a faction hands out this turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssignmentPlan {
    /// Accepted roles, urgent locks first, then in acceptance order, then
    /// fallbacks and idle leaders.
    pub assignments: Vec<RoleAssignment>,
    /// Leaders that kept their current role.
    pub reserved: Vec<LeaderId>,
    /// Clandestine gold handed out.
    pub gold_committed: u32,
    /// New clandestine missions started.
    pub missions: u32,
}

impl AssignmentPlan {
    /// The role given to `leader`, if any.
    pub fn role_of(&self, leader: LeaderId) -> Option<&Role> {
        self.assignments
            .iter()
            .find(|a| a.leader == leader)
            .map(|a| &a.role)
    }
}

// ---------------------------------------------------------------------------
// Phase 1: reservation
// ---------------------------------------------------------------------------

/// Why `leader` keeps its current role, if it does.
fn reservation(world: &WorldState, leader: &Leader) -> Option<&'static str> {
    match leader.status {
        LeaderStatus::Moving => return Some("travelling"),
        LeaderStatus::OnMission => return Some("on mission"),
        LeaderStatus::Undercover
            if leader.clandestine_budget > 0 || !leader.active_actions.is_empty() =>
        {
            return Some("undercover");
        }
        _ => {}
    }
    let commanding = leader
        .army
        .and_then(|id| world.armies.get(&id))
        .is_some_and(|a| a.commander == Some(leader.id));
    if commanding {
        return Some("commanding");
    }
    let guarding = leader
        .protecting
        .and_then(|id| world.leaders.get(&id))
        .is_some_and(|t| t.is_alive() && t.location == leader.location);
    if guarding {
        return Some("guarding");
    }
    None
}

/// Mutable bookkeeping of the greedy pick.
#[derive(Debug, Default)]
struct Ledger {
    assigned: BTreeSet<LeaderId>,
    governed: BTreeSet<LocationId>,
    commanded: BTreeSet<ArmyId>,
    guarded: BTreeSet<LeaderId>,
    infiltrated: BTreeSet<LocationId>,
    remaining_budget: u32,
    missions: u32,
    gold_committed: u32,
}

impl Ledger {
    /// Seed the ledger with what the faction is already doing.
    fn seed(world: &WorldState, strategy: &FactionStrategy) -> Self {
        let faction = strategy.faction;
        let mut ledger = Self {
            remaining_budget: world.resources_of(faction).clandestine_budget,
            ..Self::default()
        };
        for leader in world.leaders_of(faction) {
            if leader.status.is_clandestine() {
                ledger.infiltrated.insert(leader.location);
            }
            if let Some(travel) = leader.travel {
                match travel.purpose {
                    TravelPurpose::Mission { .. } => {
                        ledger.infiltrated.insert(travel.destination);
                    }
                    TravelPurpose::Govern { .. } => {
                        ledger.governed.insert(travel.destination);
                    }
                    TravelPurpose::Command { army } => {
                        ledger.commanded.insert(army);
                    }
                    TravelPurpose::Protect { leader } => {
                        ledger.guarded.insert(leader);
                    }
                    TravelPurpose::Evacuate => {}
                }
            }
            if let Some(army) = leader.army {
                ledger.commanded.insert(army);
            }
            if let Some(target) = leader.protecting {
                ledger.guarded.insert(target);
            }
        }
        ledger
    }

    /// Why `candidate` cannot be accepted, if it cannot.
    fn rejection(&self, candidate: &RoleAssignment, floor: f64, cap: u32) -> Option<&'static str> {
        if self.assigned.contains(&candidate.leader) {
            return Some("leader already assigned");
        }
        match candidate.role {
            Role::Governor { location, .. } | Role::Stabilizer { location } => {
                self.governed.contains(&location).then_some("already governed")
            }
            Role::Clandestine { location, .. } => {
                if candidate.score < floor {
                    Some("below the wealth floor")
                } else if candidate.gold > self.remaining_budget {
                    Some("over budget")
                } else if self.missions >= cap {
                    Some("mission cap reached")
                } else if self.infiltrated.contains(&location) {
                    Some("target already infiltrated")
                } else {
                    None
                }
            }
            Role::Commander { army, .. } => self.commanded.contains(&army).then_some("army taken"),
            Role::Protector { leader, .. } => {
                self.guarded.contains(&leader).then_some("already guarded")
            }
            Role::Idle => None,
        }
    }

    fn accept(&mut self, candidate: &RoleAssignment) {
        self.assigned.insert(candidate.leader);
        match candidate.role {
            Role::Governor { location, .. } | Role::Stabilizer { location } => {
                self.governed.insert(location);
            }
            Role::Clandestine { location, .. } => {
                self.infiltrated.insert(location);
                self.remaining_budget = self.remaining_budget.saturating_sub(candidate.gold);
                self.gold_committed = self.gold_committed.saturating_add(candidate.gold);
                self.missions = self.missions.saturating_add(1);
            }
            Role::Commander { army, .. } => {
                self.commanded.insert(army);
            }
            Role::Protector { leader, .. } => {
                self.guarded.insert(leader);
            }
            Role::Idle => {}
        }
    }
}

/// Role answering an urgent need.
const fn urgent_role(location: LocationId, policy: GovernorPolicy) -> Role {
    match policy {
        GovernorPolicy::StabilizeRegion => Role::Stabilizer { location },
        GovernorPolicy::HuntNetworks => Role::Governor {
            location,
            policy: Some(GovernorPolicy::HuntNetworks),
        },
        // Rationing and the other toggles follow from having a governor.
        _ => Role::Governor {
            location,
            policy: None,
        },
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Hand out this turn's roles for `ctx.strategy.faction`.
pub fn assign_roles(ctx: &AssignmentContext<'_>) -> AssignmentPlan {
    let world = ctx.world;
    let strategy = ctx.strategy;
    let faction = strategy.faction;
    let mut plan = AssignmentPlan::default();
    let mut ledger = Ledger::seed(world, strategy);

    // Phase 1: reservation.
    let mut free: Vec<&Leader> = Vec::new();
    for leader in world.leaders_of(faction) {
        if let Some(reason) = reservation(world, leader) {
            debug!(leader = %leader.id, reason, "leader reserved");
            ledger.assigned.insert(leader.id);
            plan.reserved.push(leader.id);
        } else {
            free.push(leader);
        }
    }

    for need in &ctx.analysis.urgent {
        if ledger.governed.contains(&need.location) {
            continue;
        }
        let best = free
            .iter()
            .filter(|l| l.location == need.location && !ledger.assigned.contains(&l.id))
            .filter_map(|l| governance_score(l, ctx.scoring).map(|s| (*l, s)))
            .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.id.cmp(&a.0.id)));
        let Some((leader, score)) = best else {
            debug!(location = %need.location, policy = ?need.policy, "urgent need without a governor");
            continue;
        };
        let role = urgent_role(need.location, need.policy);
        let lock = RoleAssignment {
            leader: leader.id,
            role,
            score,
            gold: 0,
            travel_turns: 0,
            located: true,
            tier: strategy.affinity(&leader.name, role.kind()),
            justification: format!("urgent {:?}", need.policy),
        };
        info!(leader = %leader.id, location = %need.location, policy = ?need.policy, "urgent governor locked");
        ledger.accept(&lock);
        plan.assignments.push(lock);
    }

    // Phase 2: candidates.
    let free: Vec<&Leader> = free
        .into_iter()
        .filter(|l| !ledger.assigned.contains(&l.id))
        .collect();
    let vip_only = !free.is_empty() && free.iter().all(|l| strategy.is_vip(&l.name));
    let scoring_ctx = ScoringContext {
        world,
        strategy,
        scoring: ctx.scoring,
        clandestine: ctx.clandestine,
        analysis: ctx.analysis,
        travel: ctx.travel,
        budget: ledger.remaining_budget,
        vip_only,
    };
    let mut candidates: Vec<RoleAssignment> = free
        .iter()
        .flat_map(|l| score_leader(&scoring_ctx, l))
        .collect();

    // Phase 3: greedy pick.
    candidates.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.located.cmp(&a.located))
            .then_with(|| b.tier.cmp(&a.tier))
            .then_with(|| a.travel_turns.cmp(&b.travel_turns))
            .then_with(|| a.leader.cmp(&b.leader))
    });
    let floor = strategy.wealth_floor(world.resources_of(faction).gold);
    let cap = strategy.mission_cap_for(world.turn);
    for candidate in candidates {
        if let Some(reason) = ledger.rejection(&candidate, floor, cap) {
            if !ledger.assigned.contains(&candidate.leader) {
                debug!(leader = %candidate.leader, role = ?candidate.role.kind(), reason, "candidate rejected");
            }
            continue;
        }
        debug!(
            leader = %candidate.leader,
            role = ?candidate.role.kind(),
            score = candidate.score,
            why = %candidate.justification,
            "role accepted"
        );
        ledger.accept(&candidate);
        plan.assignments.push(candidate);
    }

    // Leftovers.
    for leader in free {
        if ledger.assigned.contains(&leader.id) {
            continue;
        }
        let fallback = fallback_governor(world, leader, &ledger, ctx.scoring);
        let assignment =
            fallback.unwrap_or_else(|| RoleAssignment::idle(leader.id, "nothing worth doing"));
        ledger.accept(&assignment);
        plan.assignments.push(assignment);
    }

    plan.gold_committed = ledger.gold_committed;
    plan.missions = ledger.missions;
    info!(
        faction = %faction,
        assigned = plan.assignments.len(),
        reserved = plan.reserved.len(),
        missions = plan.missions,
        gold = plan.gold_committed,
        "roles assigned"
    );
    plan
}

/// A no-policy governorship of the leader's own territory, when it is
/// friendly and ungoverned.
fn fallback_governor(
    world: &WorldState,
    leader: &Leader,
    ledger: &Ledger,
    scoring: &ScoringConfig,
) -> Option<RoleAssignment> {
    let score = governance_score(leader, scoring)?;
    let location = world.locations.get(&leader.location)?;
    let open = location.faction == leader.faction
        && location.kind != LocationType::RoadStage
        && !ledger.governed.contains(&location.id)
        && world
            .governor_at(location.id)
            .is_none_or(|g| g.id == leader.id);
    open.then(|| RoleAssignment {
        leader: leader.id,
        role: Role::Governor {
            location: location.id,
            policy: None,
        },
        score,
        gold: 0,
        travel_turns: 0,
        located: true,
        tier: AffinityTier::None,
        justification: String::from("fallback governor"),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use intrigue_agents::GovernorConfig;
    use intrigue_types::{
        ActiveClandestineAction, ClandestineAction, ClandestineMission, FactionId,
        FactionResources, LeaderStats, Location, Road, RoadId, RoleKind, Travel,
    };

    use super::*;
    use crate::analysis::analyze;
    use crate::travel::RoadNetwork;

    fn make_location(name: &str, faction: FactionId) -> Location {
        Location {
            id: LocationId::new(),
            name: name.to_owned(),
            faction,
            stability: 60,
            resentment: BTreeMap::new(),
            population: 100_000,
            gold_income: 30,
            food_stock: 60,
            food_consumption: 5,
            kind: LocationType::City,
            linked_location: None,
            active_policies: BTreeSet::new(),
            last_make_examples_turn: None,
        }
    }

    struct Fixture {
        world: WorldState,
        strategy: FactionStrategy,
        home: LocationId,
        enemy: LocationId,
        other_enemy: LocationId,
    }

    /// One home city between two enemy cities, one turn away each.
    fn fixture(budget: u32) -> Fixture {
        let mut world = WorldState {
            turn: 3,
            ..WorldState::default()
        };
        let home = make_location("Aldmoor", FactionId(1));
        let enemy = make_location("Varn", FactionId(2));
        let other = make_location("Kesh", FactionId(2));
        let ids = (home.id, enemy.id, other.id);
        for to in [enemy.id, other.id] {
            world.roads.push(Road {
                id: RoadId::new(),
                from: home.id,
                to,
                travel_turns: 1,
            });
        }
        world.insert_location(home);
        world.insert_location(enemy);
        world.insert_location(other);
        world.resources.insert(
            FactionId(1),
            FactionResources {
                gold: 2000,
                clandestine_budget: budget,
            },
        );
        Fixture {
            world,
            strategy: FactionStrategy::new(FactionId(1), "Aurel"),
            home: ids.0,
            enemy: ids.1,
            other_enemy: ids.2,
        }
    }

    fn add_leader(f: &mut Fixture, name: &str, statesmanship: u8) -> LeaderId {
        let mut leader = Leader::new(name, FactionId(1), f.home);
        leader.stats = LeaderStats {
            statesmanship: Some(statesmanship),
            ..LeaderStats::default()
        };
        let id = leader.id;
        f.world.insert_leader(leader);
        id
    }

    fn plan(f: &Fixture) -> AssignmentPlan {
        let clandestine = ClandestineConfig::default();
        let scoring = ScoringConfig::default();
        let analysis = analyze(&f.world, &f.strategy, &clandestine, &GovernorConfig::default());
        assign_roles(&AssignmentContext {
            world: &f.world,
            strategy: &f.strategy,
            scoring: &scoring,
            clandestine: &clandestine,
            analysis: &analysis,
            travel: &RoadNetwork,
        })
    }

    fn count(plan: &AssignmentPlan, kind: RoleKind) -> usize {
        plan.assignments
            .iter()
            .filter(|a| a.role.kind() == kind)
            .count()
    }

    #[test]
    fn one_governor_per_territory() {
        let mut f = fixture(0);
        let a = add_leader(&mut f, "Ilse", 5);
        let b = add_leader(&mut f, "Otto", 4);
        let plan = plan(&f);
        let governors: Vec<LeaderId> = plan
            .assignments
            .iter()
            .filter(|x| x.role.is_governance())
            .map(|x| x.leader)
            .collect();
        assert_eq!(governors, vec![a]);
        assert_eq!(plan.role_of(b), Some(&Role::Idle));
        assert_eq!(plan.assignments.len(), 2);
    }

    #[test]
    fn mission_cap_limits_new_missions() {
        let mut f = fixture(2000);
        f.world.resources.get_mut(&FactionId(1)).unwrap().gold = 4000;
        add_leader(&mut f, "Rook", 1);
        add_leader(&mut f, "Wren", 1);
        add_leader(&mut f, "Finch", 1);
        let capped = plan(&f);
        assert_eq!(count(&capped, RoleKind::Clandestine), 1);
        assert_eq!(capped.missions, 1);

        f.strategy.mission_cap = 2;
        let doubled = plan(&f);
        assert_eq!(count(&doubled, RoleKind::Clandestine), 2);
        let targets: BTreeSet<LocationId> = doubled
            .assignments
            .iter()
            .filter(|a| a.role.kind() == RoleKind::Clandestine)
            .filter_map(|a| a.role.location())
            .collect();
        assert_eq!(targets, BTreeSet::from([f.enemy, f.other_enemy]));
    }

    #[test]
    fn budget_is_never_overspent() {
        let mut f = fixture(350);
        f.strategy.mission_cap = 3;
        add_leader(&mut f, "Rook", 1);
        add_leader(&mut f, "Wren", 1);
        let plan = plan(&f);
        assert!(plan.gold_committed <= 350);
        assert_eq!(count(&plan, RoleKind::Clandestine), 1);
        assert_eq!(plan.gold_committed, 300);
    }

    #[test]
    fn committed_leaders_are_reserved() {
        let mut f = fixture(1000);
        let mut traveller = Leader::new("Rook", FactionId(1), f.home);
        traveller.status = LeaderStatus::Moving;
        traveller.travel = Some(Travel {
            destination: f.enemy,
            turns_remaining: 1,
            purpose: TravelPurpose::Mission {
                mission: ClandestineMission::MinorSabotage { gold: 100 },
            },
        });
        let mut agent = Leader::new("Wren", FactionId(1), f.other_enemy);
        agent.status = LeaderStatus::Undercover;
        agent.clandestine_budget = 40;
        agent
            .active_actions
            .push(ActiveClandestineAction::new(ClandestineAction::UndermineAuthorities));
        let ids = (traveller.id, agent.id);
        f.world.insert_leader(traveller);
        f.world.insert_leader(agent);
        let newcomer = add_leader(&mut f, "Finch", 1);

        let plan = plan(&f);
        assert!(plan.reserved.contains(&ids.0));
        assert!(plan.reserved.contains(&ids.1));
        // Both enemy cities are taken, so the newcomer stays home.
        assert!(!matches!(plan.role_of(newcomer), Some(Role::Clandestine { .. })));
    }

    #[test]
    fn urgent_need_locks_the_local_governor() {
        let mut f = fixture(1000);
        f.world.locations.get_mut(&f.home).unwrap().stability = 20;
        let local = add_leader(&mut f, "Ilse", 2);
        let plan = plan(&f);
        assert_eq!(plan.role_of(local), Some(&Role::Stabilizer { location: f.home }));
        assert_eq!(plan.assignments.first().map(|a| a.leader), Some(local));
    }

    #[test]
    fn wealth_floor_blocks_weak_missions() {
        let mut f = fixture(1000);
        f.strategy.clandestine_floor = 10_000.0;
        let agent = add_leader(&mut f, "Rook", 1);
        let plan = plan(&f);
        assert!(!matches!(plan.role_of(agent), Some(Role::Clandestine { .. })));
        assert_eq!(plan.gold_committed, 0);
    }

    #[test]
    fn lone_vip_still_works() {
        let mut f = fixture(1000);
        f.strategy.vip_leaders.insert(String::from("Queen Ilse"));
        let queen = add_leader(&mut f, "Queen Ilse", 1);
        let plan = plan(&f);
        assert!(matches!(plan.role_of(queen), Some(Role::Clandestine { .. })));
    }
}
