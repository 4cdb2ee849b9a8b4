//! Territory and opportunity analysis for one faction.
//!
//! Produces the facts the assignment engine works from: friendly
//! territories with an urgent governance need, enemy territories worth
//! targeting, and friendly leaders whose assassination has been uncovered.

use tracing::debug;

use intrigue_agents::{ClandestineConfig, GovernorConfig, detection_threshold, stealth_level};
use intrigue_types::{
    ClandestineAction, FactionId, GovernorPolicy, LeaderId, LocationId, LocationType, WorldState,
};

use crate::config::FactionStrategy;

/// A friendly territory that needs a governor now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrgentNeed {
    /// The territory.
    pub location: LocationId,
    /// What the governor must do: `HUNT_NETWORKS` against a detected agent,
    /// `RATIONING` for a cut-off city, `STABILIZE_REGION` for unrest.
    pub policy: GovernorPolicy,
}

/// A friendly leader targeted by an uncovered plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Threat {
    /// The threatened leader.
    pub target: LeaderId,
    /// Where they stand.
    pub location: LocationId,
}

/// What a faction knows at the start of its decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerritoryAnalysis {
    /// The faction analysed.
    pub faction: FactionId,
    /// Urgent governance needs, one per territory, in territory order.
    pub urgent: Vec<UrgentNeed>,
    /// Territories the faction holds, road stages excluded.
    pub friendly: Vec<LocationId>,
    /// Territories held by another faction, road stages excluded.
    pub enemy: Vec<LocationId>,
    /// Uncovered plots against the faction's leaders.
    pub threats: Vec<Threat>,
    /// Whether a military campaign is under way.
    pub campaign_active: bool,
}

impl TerritoryAnalysis {
    /// The urgent need at `location`, if any.
    pub fn urgent_at(&self, location: LocationId) -> Option<GovernorPolicy> {
        self.urgent
            .iter()
            .find(|n| n.location == location)
            .map(|n| n.policy)
    }
}

/// Analyse the world from `strategy.faction`'s point of view.
pub fn analyze(
    world: &WorldState,
    strategy: &FactionStrategy,
    clandestine: &ClandestineConfig,
    governor: &GovernorConfig,
) -> TerritoryAnalysis {
    let faction = strategy.faction;
    let mut urgent = Vec::new();
    let mut friendly = Vec::new();
    let mut enemy = Vec::new();

    for location in world.locations.values() {
        if location.kind == LocationType::RoadStage {
            continue;
        }
        if location.faction != faction {
            if !location.faction.is_neutral() {
                enemy.push(location.id);
            }
            continue;
        }
        friendly.push(location.id);

        let detected_agent = world.leaders.values().any(|l| {
            l.faction != faction
                && l.status.is_clandestine()
                && l.location == location.id
                && l.detection_level
                    > detection_threshold(stealth_level(l), false, clandestine)
        });
        let starving = location.kind == LocationType::City
            && !world.is_supply_connected(location.id)
            && location
                .turns_of_food()
                .is_some_and(|turns| turns <= governor.rationing_on_turns);
        let policy = if detected_agent {
            Some(GovernorPolicy::HuntNetworks)
        } else if starving {
            Some(GovernorPolicy::Rationing)
        } else if location.stability < governor.urgent_stability {
            Some(GovernorPolicy::StabilizeRegion)
        } else {
            None
        };
        if let Some(policy) = policy {
            urgent.push(UrgentNeed {
                location: location.id,
                policy,
            });
        }
    }

    let threats = world
        .leaders
        .values()
        .filter(|plotter| plotter.faction != faction && plotter.is_alive())
        .flat_map(|plotter| plotter.active_actions.iter())
        .filter(|a| a.is_revealed)
        .filter_map(|a| match a.action {
            ClandestineAction::AssassinateLeader { target } => world.leaders.get(&target),
            _ => None,
        })
        .filter(|target| target.faction == faction && target.is_alive())
        .map(|target| Threat {
            target: target.id,
            location: target.location,
        })
        .collect();

    let analysis = TerritoryAnalysis {
        faction,
        urgent,
        friendly,
        enemy,
        threats,
        campaign_active: strategy.campaign_active,
    };
    debug!(
        faction = %faction,
        urgent = analysis.urgent.len(),
        friendly = analysis.friendly.len(),
        enemy = analysis.enemy.len(),
        threats = analysis.threats.len(),
        "territory analysed"
    );
    analysis
}
