//! Per-leader detection state machine.
//!
//! Advances one clandestine agent by one turn. States:
//!
//! ```text
//! DORMANT --mission--> ACTIVE --capture--> CAUGHT --> ESCAPED | EXECUTED
//!                        |  \--exfiltration--> EXFILTRATED
//!                        \--Grand Insurrection--> COMPLETED
//! ```
//!
//! # Turn order
//!
//! 0. Cleanup: territory flips, leaving the clandestine window, moving
//!    to a new territory (detection reset).
//! 1. Alerts for a newly appointed PARANOID governor and a newly activated
//!    `HuntNetworks` (combined when both are new); notified flags updated.
//! 2. Capture roll, using the notified flags from *before* step 1 unless the
//!    leader's faction is notified immediately.
//! 3. Action effects, in the order the actions were started.
//! 4. Per-turn detection increase of the actions still active.
//! 5. Threshold alert on the rising edge; flag cleared on the falling edge.
//!
//! Reordering these steps changes observable outcomes.

use rand::Rng;
use tracing::{debug, info, warn};

use intrigue_types::{
    Ability, ActionKind, ActiveClandestineAction, ClandestineAction, DetectionType, FactionId,
    Leader, LeaderId, LeaderStatus, LogEntry, ResourceDelta, Severity,
};

use crate::actions::{self, ActionContext, Disposition, costs, roll_pct};
use crate::config::ClandestineConfig;
use crate::risk::{self, RiskAssessment, RiskInputs};
use crate::state_manager::LeaderStateManager;

/// Per-turn parameters of the state machine.
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext<'a> {
    /// Tunables.
    pub config: &'a ClandestineConfig,
    /// The leader's faction learns of new defensive measures the same turn.
    pub notified_immediately: bool,
}

/// Where the leader ended up this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionOutcome {
    /// No mission to advance.
    Dormant,
    /// The mission ended because the territory changed hands.
    StoodDown,
    /// The mission goes on.
    Active,
    /// Caught, but got away.
    Escaped,
    /// Caught and executed.
    Executed,
    /// The Grand Insurrection broke out; the leader leads its army.
    Completed,
}

/// Result of advancing one leader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderTurn {
    /// Final state.
    pub outcome: DetectionOutcome,
    /// Game logs, not yet consolidated.
    pub logs: Vec<LogEntry>,
}

impl LeaderTurn {
    const fn quiet(outcome: DetectionOutcome) -> Self {
        Self {
            outcome,
            logs: Vec::new(),
        }
    }
}

/// Advance `leader_id` by one turn.
///
/// Missing leaders and territories are skipped with a warning.
#[allow(clippy::too_many_lines)]
pub fn advance_leader(
    manager: &mut LeaderStateManager,
    leader_id: LeaderId,
    ctx: &DetectionContext<'_>,
    rng: &mut impl Rng,
) -> LeaderTurn {
    let turn = manager.turn();
    let config = ctx.config;
    let Some(mut leader) = manager.leader(leader_id).cloned() else {
        warn!(leader = %leader_id, "clandestine leader not found, skipping");
        return LeaderTurn::quiet(DetectionOutcome::Dormant);
    };

    // -----------------------------------------------------------------------
    // Step 0: cleanup
    // -----------------------------------------------------------------------

    if !leader.status.is_clandestine() {
        let residue = !leader.active_actions.is_empty()
            || leader.detection_level > 0
            || leader.detection_location.is_some();
        if residue {
            let destination = leader.travel.map_or(leader.location, |t| t.destination);
            let friendly = manager
                .location(destination)
                .is_some_and(|l| l.faction == leader.faction);
            leader.clear_mission_state();
            if friendly {
                leader.clandestine_budget = 0;
            }
            store_leader(manager, leader);
        }
        return LeaderTurn::quiet(DetectionOutcome::Dormant);
    }

    let Some(mut location) = manager.location(leader.location).cloned() else {
        warn!(leader = %leader_id, location = %leader.location, "agent location not found, skipping");
        return LeaderTurn::quiet(DetectionOutcome::Dormant);
    };

    let mut logs = Vec::new();

    if location.faction == leader.faction {
        let refund = leader.clandestine_budget;
        leader.clandestine_budget = 0;
        leader.clear_mission_state();
        leader.status = LeaderStatus::Available;
        manager.credit(leader.faction, ResourceDelta::gold(i64::from(refund)));
        logs.push(
            LogEntry::to_faction(
                turn,
                Severity::Good,
                leader.faction,
                format!("{} is now ours; {} stands down and returns {refund} gold", location.name, leader.name),
            )
            .at(location.id)
            .about(leader_id),
        );
        store_leader(manager, leader);
        return LeaderTurn {
            outcome: DetectionOutcome::StoodDown,
            logs,
        };
    }

    if location.faction.is_neutral() && leader.status == LeaderStatus::Undercover {
        leader.clandestine_budget = 0;
        leader.clear_mission_state();
        leader.status = LeaderStatus::Available;
        logs.push(
            LogEntry::to_faction(
                turn,
                Severity::Info,
                leader.faction,
                format!("{} fell to no one; {} abandons the mission", location.name, leader.name),
            )
            .at(location.id)
            .about(leader_id),
        );
        store_leader(manager, leader);
        return LeaderTurn {
            outcome: DetectionOutcome::StoodDown,
            logs,
        };
    }

    if leader.detection_location != Some(location.id) {
        leader.detection_level = 0;
        leader.detection_location = Some(location.id);
    }

    // -----------------------------------------------------------------------
    // Step 1: alerts
    // -----------------------------------------------------------------------

    let observed = RiskInputs::observe(manager.world(), &leader);
    let previous = leader.alerts;
    let new_paranoid = observed.paranoid_governor && !previous.paranoid_governor_notified;
    let new_hunt = observed.hunt_networks && !previous.hunt_networks_notified;
    let alert = match (new_paranoid, new_hunt) {
        (true, true) => Some(format!(
            "A paranoid governor is hunting our networks in {}; {} is in grave danger",
            location.name, leader.name
        )),
        (true, false) => Some(format!(
            "A paranoid governor now rules {}; {} must tread carefully",
            location.name, leader.name
        )),
        (false, true) => Some(format!(
            "The authorities of {} are hunting our networks; {} is exposed",
            location.name, leader.name
        )),
        (false, false) => None,
    };
    if let Some(message) = alert {
        logs.push(
            LogEntry::to_faction(turn, Severity::Warning, leader.faction, message)
                .at(location.id)
                .about(leader_id),
        );
    }
    leader.alerts.paranoid_governor_notified = observed.paranoid_governor;
    leader.alerts.hunt_networks_notified = observed.hunt_networks;

    // -----------------------------------------------------------------------
    // Step 2: capture
    // -----------------------------------------------------------------------

    let effective = if ctx.notified_immediately {
        observed
    } else {
        RiskInputs::from_alerts(previous)
    };
    let assessment = RiskAssessment::assess(&leader, effective, config);
    if roll_pct(rng, assessment.capture_risk) {
        let outcome = capture(manager, leader, location.faction, &mut logs, ctx, rng);
        return LeaderTurn { outcome, logs };
    }

    // -----------------------------------------------------------------------
    // Step 3: action effects
    // -----------------------------------------------------------------------

    let governor = manager
        .world()
        .governor_at(location.id)
        .filter(|g| g.faction != leader.faction)
        .cloned();
    let hostile_soldiers = manager.world().hostile_soldiers_at(location.id, leader.faction);

    let mut kept: Vec<ActiveClandestineAction> = Vec::new();
    let mut spawned = Vec::new();
    let mut killed = Vec::new();
    let mut credits: Vec<(FactionId, ResourceDelta)> = Vec::new();
    let mut completed_army = None;

    for mut active in leader.active_actions.clone() {
        let kind = active.action.kind();

        if active.turn_started.is_none() {
            let gold = active.one_time_gold.unwrap_or(0);
            if gold > leader.clandestine_budget {
                warn!(leader = %leader_id, ?kind, gold, budget = leader.clandestine_budget, "cannot fund action, dropping it");
                continue;
            }
            active.turn_started = Some(turn);
            leader.clandestine_budget = leader.clandestine_budget.saturating_sub(gold);
            if costs::detection_type(kind) == DetectionType::OneTime {
                leader.detection_level = leader
                    .detection_level
                    .saturating_add(costs::detection_increase(kind));
            }
            if kind == ActionKind::PrepareGrandInsurrection {
                leader.status = LeaderStatus::OnMission;
            }
            debug!(leader = %leader_id, ?kind, gold, "action initiated");
        }

        let target = match active.action {
            ClandestineAction::AssassinateLeader { target } => {
                manager.leader(target).cloned()
            }
            _ => None,
        };
        let target_protected = target.as_ref().is_some_and(|t| {
            manager.world().leaders.values().any(|p| {
                p.is_alive() && p.protecting == Some(t.id) && p.location == t.location
            })
        });

        let effect = {
            let action_ctx = ActionContext {
                turn,
                leader: &leader,
                budget: leader.clandestine_budget,
                location: &location,
                governor: governor.as_ref(),
                hunt_networks: observed.hunt_networks,
                target: target.as_ref(),
                target_protected,
                hostile_soldiers,
                config,
            };
            actions::process_action(&active, &action_ctx, rng)
        };

        leader.clandestine_budget = leader.clandestine_budget.saturating_sub(effect.gold_spent);
        if effect.revealed {
            active.is_revealed = true;
        }
        effect.location.apply(&mut location);
        credits.extend(effect.resources);
        logs.extend(effect.logs);
        if let Some(victim) = effect.killed_leader {
            killed.push(victim);
        }
        if let Some(army) = effect.spawned_army {
            if kind == ActionKind::PrepareGrandInsurrection {
                completed_army = Some(army.id);
            }
            spawned.push(army);
        }

        match effect.disposition {
            Disposition::Continue => kept.push(active),
            Disposition::AutoDisable => {
                debug!(leader = %leader_id, ?kind, "action auto-disabled");
            }
            Disposition::Complete => {
                debug!(leader = %leader_id, ?kind, "action completed");
            }
            Disposition::Blocked { refund } => {
                leader.clandestine_budget = leader.clandestine_budget.saturating_add(refund);
                debug!(leader = %leader_id, ?kind, refund, "action blocked");
            }
        }
    }
    leader.active_actions = kept;

    // -----------------------------------------------------------------------
    // Step 4: per-turn detection
    // -----------------------------------------------------------------------

    let increase = costs::per_turn_detection(leader.active_actions.iter().map(|a| a.action.kind()));
    leader.detection_level = leader.detection_level.saturating_add(increase);

    // -----------------------------------------------------------------------
    // Step 5: threshold edge
    // -----------------------------------------------------------------------

    let threshold =
        risk::detection_threshold(risk::stealth_level(&leader), effective.hunt_networks, config);
    let exceeded = leader.detection_level > threshold;
    if exceeded && !leader.alerts.threshold_exceeded_notified {
        leader.alerts.threshold_exceeded_notified = true;
        logs.push(
            LogEntry::to_faction(
                turn,
                Severity::Warning,
                leader.faction,
                format!(
                    "{} has drawn attention in {} (detection {} over {threshold})",
                    leader.name, location.name, leader.detection_level
                ),
            )
            .at(location.id)
            .about(leader_id),
        );
    } else if !exceeded && leader.alerts.threshold_exceeded_notified {
        leader.alerts.threshold_exceeded_notified = false;
    }

    // -----------------------------------------------------------------------
    // Completion and write-back
    // -----------------------------------------------------------------------

    let mut outcome = DetectionOutcome::Active;
    if let Some(army_id) = completed_army {
        let refund = leader.clandestine_budget;
        leader.clandestine_budget = 0;
        leader.clear_mission_state();
        leader.status = LeaderStatus::Available;
        leader.army = Some(army_id);
        credits.push((leader.faction, ResourceDelta::gold(i64::from(refund))));
        outcome = DetectionOutcome::Completed;
    } else if leader.status == LeaderStatus::OnMission
        && !leader.has_action(ActionKind::PrepareGrandInsurrection)
    {
        leader.status = LeaderStatus::Undercover;
    }

    debug!(
        leader = %leader_id,
        detection = leader.detection_level,
        threshold,
        budget = leader.clandestine_budget,
        actions = leader.active_actions.len(),
        "agent advanced"
    );

    store_leader(manager, leader);
    if let Err(err) = manager.replace_location(location) {
        warn!(error = %err, "agent location vanished during the turn");
    }
    for army in spawned {
        manager.spawn_army(army);
    }
    for victim in killed {
        if let Err(err) = manager.kill_leader(victim) {
            warn!(error = %err, "assassination target vanished");
        }
    }
    for (faction, delta) in credits {
        manager.credit(faction, delta);
    }

    LeaderTurn { outcome, logs }
}

/// Resolve a capture: seize the budget, then escape or execution.
fn capture(
    manager: &mut LeaderStateManager,
    mut leader: Leader,
    captor: FactionId,
    logs: &mut Vec<LogEntry>,
    ctx: &DetectionContext<'_>,
    rng: &mut impl Rng,
) -> DetectionOutcome {
    let turn = manager.turn();
    let seized = leader.clandestine_budget;
    leader.clandestine_budget = 0;
    leader.clear_mission_state();
    manager.credit(captor, ResourceDelta::gold(i64::from(seized)));

    let location = leader.location;
    logs.push(
        LogEntry::to_faction(
            turn,
            Severity::Good,
            captor,
            format!("Our guards caught {}, an enemy agent; {seized} gold seized", leader.name),
        )
        .at(location)
        .about(leader.id)
        .by(leader.faction),
    );

    let refuge = if leader.has_ability(Ability::Daredevil)
        && roll_pct(rng, ctx.config.daredevil_escape_pct)
    {
        let friendly: Vec<_> = manager
            .world()
            .friendly_locations(leader.faction)
            .map(|l| l.id)
            .collect();
        if friendly.is_empty() {
            None
        } else {
            friendly.get(rng.random_range(0..friendly.len())).copied()
        }
    } else {
        None
    };

    if let Some(refuge) = refuge {
        leader.location = refuge;
        leader.status = LeaderStatus::Available;
        leader.travel = None;
        logs.push(
            LogEntry::to_faction(
                turn,
                Severity::Critical,
                leader.faction,
                format!("{} was caught but escaped to safety", leader.name),
            )
            .at(location)
            .about(leader.id)
            .also_visible_to(captor),
        );
        info!(leader = %leader.id, seized, "agent captured and escaped");
        store_leader(manager, leader);
        return DetectionOutcome::Escaped;
    }

    logs.push(
        LogEntry::to_faction(
            turn,
            Severity::Critical,
            leader.faction,
            format!("{} was caught and executed", leader.name),
        )
        .at(location)
        .about(leader.id),
    );
    info!(leader = %leader.id, seized, "agent captured and executed");
    let id = leader.id;
    store_leader(manager, leader);
    if let Err(err) = manager.kill_leader(id) {
        warn!(error = %err, "captured leader vanished");
    }
    DetectionOutcome::Executed
}

fn store_leader(manager: &mut LeaderStateManager, leader: Leader) {
    if let Err(err) = manager.replace_leader(leader) {
        warn!(error = %err, "leader vanished during the turn");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use intrigue_types::{
        FactionResources, GovernorPolicy, LeaderStats, Location, LocationId, LocationType,
        WorldState,
    };

    use super::*;

    struct Fixture {
        world: WorldState,
        agent: LeaderId,
        target_loc: LocationId,
        home: LocationId,
    }

    fn make_location(name: &str, faction: FactionId) -> Location {
        Location {
            id: LocationId::new(),
            name: name.to_owned(),
            faction,
            stability: 70,
            resentment: BTreeMap::new(),
            population: 60_000,
            gold_income: 40,
            food_stock: 80,
            food_consumption: 10,
            kind: LocationType::City,
            linked_location: None,
            active_policies: BTreeSet::new(),
            last_make_examples_turn: None,
        }
    }

    fn make_fixture() -> Fixture {
        let mut world = WorldState {
            turn: 3,
            ..WorldState::default()
        };
        let target = make_location("Sarnath", FactionId(1));
        let home = make_location("Veyra", FactionId(2));
        let mut agent = Leader::new("Iskra", FactionId(2), target.id);
        agent.status = LeaderStatus::Undercover;
        agent.clandestine_budget = 100;
        agent.stats = LeaderStats {
            clandestine_ops: Some(4),
            discretion: Some(3),
            ..LeaderStats::default()
        };
        agent
            .active_actions
            .push(ActiveClandestineAction::new(ClandestineAction::UndermineAuthorities));
        let (agent_id, target_loc, home_loc) = (agent.id, target.id, home.id);
        world.insert_location(target);
        world.insert_location(home);
        world.insert_leader(agent);
        world.resources.insert(FactionId(1), FactionResources::default());
        world.resources.insert(FactionId(2), FactionResources::default());
        Fixture {
            world,
            agent: agent_id,
            target_loc,
            home: home_loc,
        }
    }

    fn ai_context(config: &ClandestineConfig) -> DetectionContext<'_> {
        DetectionContext {
            config,
            notified_immediately: true,
        }
    }

    #[test]
    fn action_runs_and_detection_accumulates() {
        let fixture = make_fixture();
        let config = ClandestineConfig::default();
        let mut manager = LeaderStateManager::new(fixture.world);
        let mut rng = SmallRng::seed_from_u64(42);
        let turn = advance_leader(&mut manager, fixture.agent, &ai_context(&config), &mut rng);
        assert_eq!(turn.outcome, DetectionOutcome::Active);

        let leader = manager.leader(fixture.agent);
        assert!(leader.is_some_and(|l| l.detection_level == 10));
        assert!(leader.is_some_and(|l| l.clandestine_budget == 90));
        assert!(leader.is_some_and(|l| l.active_actions.first().is_some_and(|a| a.turn_started == Some(3))));
        assert!(manager.location(fixture.target_loc).is_some_and(|l| l.stability == 62));
    }

    #[test]
    fn certain_capture_executes_and_seizes_budget() {
        let mut fixture = make_fixture();
        if let Some(l) = fixture.world.leaders.get_mut(&fixture.agent) {
            l.detection_level = 400;
            l.detection_location = Some(fixture.target_loc);
        }
        let config = ClandestineConfig::default();
        let mut manager = LeaderStateManager::new(fixture.world);
        let mut rng = SmallRng::seed_from_u64(42);
        let turn = advance_leader(&mut manager, fixture.agent, &ai_context(&config), &mut rng);
        assert_eq!(turn.outcome, DetectionOutcome::Executed);
        let leader = manager.leader(fixture.agent);
        assert!(leader.is_some_and(|l| l.status == LeaderStatus::Dead && l.detection_level == 0));
        assert_eq!(manager.world().resources_of(FactionId(1)).gold, 100);
        // Capture skips action processing.
        assert!(manager.location(fixture.target_loc).is_some_and(|l| l.stability == 70));
    }

    #[test]
    fn daredevil_escape_relocates_home() {
        let mut fixture = make_fixture();
        if let Some(l) = fixture.world.leaders.get_mut(&fixture.agent) {
            l.detection_level = 400;
            l.detection_location = Some(fixture.target_loc);
            l.abilities.insert(Ability::Daredevil);
        }
        let config = ClandestineConfig {
            daredevil_escape_pct: 100,
            ..ClandestineConfig::default()
        };
        let mut manager = LeaderStateManager::new(fixture.world);
        let mut rng = SmallRng::seed_from_u64(42);
        let turn = advance_leader(&mut manager, fixture.agent, &ai_context(&config), &mut rng);
        assert_eq!(turn.outcome, DetectionOutcome::Escaped);
        let leader = manager.leader(fixture.agent);
        assert!(leader.is_some_and(|l| l.location == fixture.home && l.status == LeaderStatus::Available));
        assert!(leader.is_some_and(|l| l.active_actions.is_empty() && l.clandestine_budget == 0));
    }

    #[test]
    fn moving_to_new_location_resets_detection() {
        let mut fixture = make_fixture();
        if let Some(l) = fixture.world.leaders.get_mut(&fixture.agent) {
            l.detection_level = 45;
            l.detection_location = Some(LocationId::new());
        }
        let config = ClandestineConfig::default();
        let mut manager = LeaderStateManager::new(fixture.world);
        let mut rng = SmallRng::seed_from_u64(42);
        let _ = advance_leader(&mut manager, fixture.agent, &ai_context(&config), &mut rng);
        // Reset to 0, then one turn of undermining.
        assert!(manager.leader(fixture.agent).is_some_and(|l| l.detection_level == 10));
    }

    #[test]
    fn leaving_undercover_resets_detection() {
        let mut fixture = make_fixture();
        if let Some(l) = fixture.world.leaders.get_mut(&fixture.agent) {
            l.status = LeaderStatus::Available;
            l.detection_level = 45;
            l.detection_location = Some(fixture.target_loc);
        }
        let config = ClandestineConfig::default();
        let mut manager = LeaderStateManager::new(fixture.world);
        let mut rng = SmallRng::seed_from_u64(42);
        let turn = advance_leader(&mut manager, fixture.agent, &ai_context(&config), &mut rng);
        assert_eq!(turn.outcome, DetectionOutcome::Dormant);
        let leader = manager.leader(fixture.agent);
        assert!(leader.is_some_and(|l| l.detection_level == 0 && l.active_actions.is_empty()));
    }

    #[test]
    fn flip_to_own_faction_refunds() {
        let mut fixture = make_fixture();
        if let Some(l) = fixture.world.locations.get_mut(&fixture.target_loc) {
            l.faction = FactionId(2);
        }
        let config = ClandestineConfig::default();
        let mut manager = LeaderStateManager::new(fixture.world);
        let mut rng = SmallRng::seed_from_u64(42);
        let turn = advance_leader(&mut manager, fixture.agent, &ai_context(&config), &mut rng);
        assert_eq!(turn.outcome, DetectionOutcome::StoodDown);
        assert_eq!(manager.world().resources_of(FactionId(2)).gold, 100);
        assert!(manager.leader(fixture.agent).is_some_and(|l| l.status == LeaderStatus::Available));
    }

    #[test]
    fn flip_to_neutral_keeps_grand_insurrection() {
        let mut fixture = make_fixture();
        if let Some(l) = fixture.world.locations.get_mut(&fixture.target_loc) {
            l.faction = FactionId::NEUTRAL;
        }
        if let Some(l) = fixture.world.leaders.get_mut(&fixture.agent) {
            l.status = LeaderStatus::OnMission;
            l.active_actions = vec![ActiveClandestineAction::with_gold(
                ClandestineAction::PrepareGrandInsurrection,
                100,
            )];
        }
        let config = ClandestineConfig::default();
        let mut manager = LeaderStateManager::new(fixture.world);
        let mut rng = SmallRng::seed_from_u64(42);
        let turn = advance_leader(&mut manager, fixture.agent, &ai_context(&config), &mut rng);
        assert_eq!(turn.outcome, DetectionOutcome::Active);
        let leader = manager.leader(fixture.agent);
        assert!(leader.is_some_and(|l| l.status == LeaderStatus::OnMission));
        // One-time detection of the preparation, added once.
        assert!(leader.is_some_and(|l| l.detection_level == 25 && l.clandestine_budget == 0));
    }

    #[test]
    fn human_faction_sees_hunt_networks_one_turn_late() {
        let mut fixture = make_fixture();
        let mut governor = Leader::new("Zoran", FactionId(1), fixture.target_loc);
        governor.status = LeaderStatus::Governing;
        fixture.world.insert_leader(governor);
        if let Some(l) = fixture.world.locations.get_mut(&fixture.target_loc) {
            l.active_policies.insert(GovernorPolicy::HuntNetworks);
        }
        if let Some(l) = fixture.world.leaders.get_mut(&fixture.agent) {
            // Over the hunted threshold (25), under the normal one (50).
            l.detection_level = 40;
            l.detection_location = Some(fixture.target_loc);
        }
        let config = ClandestineConfig::default();
        let ctx = DetectionContext {
            config: &config,
            notified_immediately: false,
        };
        let mut manager = LeaderStateManager::new(fixture.world);
        let mut rng = SmallRng::seed_from_u64(42);
        let turn = advance_leader(&mut manager, fixture.agent, &ctx, &mut rng);

        assert_eq!(turn.outcome, DetectionOutcome::Active);
        assert!(turn.logs.iter().any(|l| l.severity == Severity::Warning && l.message.contains("hunting")));
        assert!(manager
            .leader(fixture.agent)
            .is_some_and(|l| l.alerts.hunt_networks_notified && !l.alerts.threshold_exceeded_notified));
    }

    #[test]
    fn human_faction_feels_hunt_networks_the_turn_after() {
        let mut fixture = make_fixture();
        let mut governor = Leader::new("Zoran", FactionId(1), fixture.target_loc);
        governor.status = LeaderStatus::Governing;
        fixture.world.insert_leader(governor);
        if let Some(l) = fixture.world.locations.get_mut(&fixture.target_loc) {
            l.active_policies.insert(GovernorPolicy::HuntNetworks);
        }
        if let Some(l) = fixture.world.leaders.get_mut(&fixture.agent) {
            l.detection_level = 190;
            l.detection_location = Some(fixture.target_loc);
        }
        // Threshold 200, or 100 while hunted.
        let config = ClandestineConfig {
            threshold_base: 200,
            threshold_per_level: 0,
            ..ClandestineConfig::default()
        };
        let ctx = DetectionContext {
            config: &config,
            notified_immediately: false,
        };
        let mut manager = LeaderStateManager::new(fixture.world);
        let mut rng = SmallRng::seed_from_u64(7);

        let first = advance_leader(&mut manager, fixture.agent, &ctx, &mut rng);
        assert_eq!(first.outcome, DetectionOutcome::Active);
        assert!(manager
            .leader(fixture.agent)
            .is_some_and(|l| l.detection_level == 200 && l.alerts.hunt_networks_notified));

        // Now notified: detection 200 against 100 is a certain capture.
        let second = advance_leader(&mut manager, fixture.agent, &ctx, &mut rng);
        assert_eq!(second.outcome, DetectionOutcome::Executed);
    }

    #[test]
    fn paranoid_hunt_raises_a_single_combined_alert() {
        let mut fixture = make_fixture();
        let mut governor = Leader::new("Zoran", FactionId(1), fixture.target_loc);
        governor.status = LeaderStatus::Governing;
        governor.abilities.insert(Ability::Paranoid);
        fixture.world.insert_leader(governor);
        if let Some(l) = fixture.world.locations.get_mut(&fixture.target_loc) {
            l.active_policies.insert(GovernorPolicy::HuntNetworks);
        }
        let config = ClandestineConfig::default();
        let mut manager = LeaderStateManager::new(fixture.world);
        let mut rng = SmallRng::seed_from_u64(42);
        let turn = advance_leader(&mut manager, fixture.agent, &ai_context(&config), &mut rng);

        assert_eq!(turn.outcome, DetectionOutcome::Active);
        let alerts: Vec<_> = turn
            .logs
            .iter()
            .filter(|l| l.severity == Severity::Warning && l.visible_to.contains(&FactionId(2)))
            .collect();
        assert_eq!(alerts.len(), 1);
        assert!(alerts.iter().all(|l| l.message.contains("grave danger")));
        assert!(manager.leader(fixture.agent).is_some_and(|l| {
            l.alerts.paranoid_governor_notified && l.alerts.hunt_networks_notified
        }));

        // Known measures are not announced again.
        let next = advance_leader(&mut manager, fixture.agent, &ai_context(&config), &mut rng);
        assert!(!next.logs.iter().any(|l| l.message.contains("grave danger")));
    }

    #[test]
    fn grand_insurrection_completes_and_hands_over_the_army() {
        let mut fixture = make_fixture();
        if let Some(l) = fixture.world.leaders.get_mut(&fixture.agent) {
            l.status = LeaderStatus::OnMission;
            l.clandestine_budget = 150;
            l.active_actions = vec![ActiveClandestineAction::with_gold(
                ClandestineAction::PrepareGrandInsurrection,
                100,
            )];
        }
        let config = ClandestineConfig::default();
        let mut world = fixture.world;
        let mut outcomes = Vec::new();
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..5 {
            let mut manager = LeaderStateManager::new(world);
            let turn = advance_leader(&mut manager, fixture.agent, &ai_context(&config), &mut rng);
            outcomes.push((manager.turn(), turn.outcome));
            world = manager.finish().0;
            world.turn = world.turn.saturating_add(1);
        }

        assert_eq!(
            outcomes,
            vec![
                (3, DetectionOutcome::Active),
                (4, DetectionOutcome::Active),
                (5, DetectionOutcome::Active),
                (6, DetectionOutcome::Active),
                (7, DetectionOutcome::Completed),
            ]
        );
        let leader = world.leaders.get(&fixture.agent).unwrap();
        assert_eq!(leader.status, LeaderStatus::Available);
        assert_eq!(leader.clandestine_budget, 0);
        assert!(leader.active_actions.is_empty());
        let army = leader.army.and_then(|id| world.armies.get(&id)).unwrap();
        assert_eq!(army.commander, Some(fixture.agent));
        assert_eq!(army.faction, FactionId(2));
        assert_eq!(world.armies.len(), 1);
        // The 50 gold left after the preparation goes back to the treasury.
        assert_eq!(world.resources_of(FactionId(2)).gold, 50);
    }

    #[test]
    fn threshold_alert_fires_on_rising_edge_only() {
        let mut fixture = make_fixture();
        if let Some(l) = fixture.world.leaders.get_mut(&fixture.agent) {
            l.detection_level = 45;
            l.detection_location = Some(fixture.target_loc);
            l.clandestine_budget = 500;
        }
        let config = ClandestineConfig::default();
        let mut manager = LeaderStateManager::new(fixture.world);
        let mut rng = SmallRng::seed_from_u64(42);
        let first = advance_leader(&mut manager, fixture.agent, &ai_context(&config), &mut rng);
        let crossing = first
            .logs
            .iter()
            .filter(|l| l.message.contains("drawn attention"))
            .count();
        assert_eq!(crossing, 1);
        assert!(manager
            .leader(fixture.agent)
            .is_some_and(|l| l.alerts.threshold_exceeded_notified));

        // Start under a threshold of 60 so no capture is rolled, end over it.
        let steady = ClandestineConfig {
            threshold_base: 30,
            ..ClandestineConfig::default()
        };
        let still_over = advance_leader(&mut manager, fixture.agent, &ai_context(&steady), &mut rng);
        assert_eq!(still_over.outcome, DetectionOutcome::Active);
        assert!(!still_over.logs.iter().any(|l| l.message.contains("drawn attention")));
        assert!(manager
            .leader(fixture.agent)
            .is_some_and(|l| l.detection_level == 65 && l.alerts.threshold_exceeded_notified));

        // A higher threshold puts the agent back under it.
        let relaxed = ClandestineConfig {
            threshold_base: 1000,
            ..ClandestineConfig::default()
        };
        let second = advance_leader(&mut manager, fixture.agent, &ai_context(&relaxed), &mut rng);
        assert!(!second.logs.iter().any(|l| l.message.contains("drawn attention")));
        assert!(manager
            .leader(fixture.agent)
            .is_some_and(|l| !l.alerts.threshold_exceeded_notified));
    }
}
