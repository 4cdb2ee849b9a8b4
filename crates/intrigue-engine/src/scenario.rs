//! The demo starting world.
//!
//! Three factions each hold a city and its countryside. A neutral province
//! and a road stage sit between them. Identifiers are drawn from a seeded
//! RNG, so the same seed always builds the same world.

use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use intrigue_core::FactionStrategy;
use intrigue_types::{
    Ability, AffinityTier, Army, ArmyId, FactionId, FactionResources, Leader, LeaderId,
    LeaderStats, LeaderTrait, Location, LocationId, LocationType, Road, RoadId, RoleKind,
    WorldState,
};

/// The crown of Aldmoor.
pub const AUREL: FactionId = FactionId(1);
/// The march lords of Varn.
pub const MORVANE: FactionId = FactionId(2);
/// The free towns of Corrin.
pub const TESSALY: FactionId = FactionId(3);

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

struct ProvinceRow {
    faction: FactionId,
    city: &'static str,
    countryside: &'static str,
    stability: u32,
    city_population: u32,
    rural_population: u32,
    resentment: &'static [(FactionId, u32)],
}

const PROVINCES: &[ProvinceRow] = &[
    ProvinceRow {
        faction: AUREL,
        city: "Aldmoor",
        countryside: "Aldmoor Fields",
        stability: 70,
        city_population: 80_000,
        rural_population: 220_000,
        resentment: &[(AUREL, 20), (MORVANE, 60), (TESSALY, 50)],
    },
    ProvinceRow {
        faction: MORVANE,
        city: "Varn",
        countryside: "Varn Marches",
        stability: 45,
        city_population: 60_000,
        rural_population: 180_000,
        resentment: &[(MORVANE, 65), (AUREL, 30), (TESSALY, 45)],
    },
    ProvinceRow {
        faction: TESSALY,
        city: "Corrin",
        countryside: "Corrin Downs",
        stability: 28,
        city_population: 50_000,
        rural_population: 150_000,
        resentment: &[(TESSALY, 55), (AUREL, 40), (MORVANE, 70)],
    },
    ProvinceRow {
        faction: FactionId::NEUTRAL,
        city: "Ostwick",
        countryside: "Ostwick Heath",
        stability: 50,
        city_population: 30_000,
        rural_population: 90_000,
        resentment: &[],
    },
];

const ROAD_STAGE: &str = "Greyford Crossing";

const ROADS: &[(&str, &str, u32)] = &[
    ("Aldmoor", "Aldmoor Fields", 1),
    ("Varn", "Varn Marches", 1),
    ("Corrin", "Corrin Downs", 1),
    ("Ostwick", "Ostwick Heath", 1),
    ("Aldmoor", ROAD_STAGE, 1),
    (ROAD_STAGE, "Varn", 1),
    (ROAD_STAGE, "Corrin", 3),
    ("Aldmoor Fields", "Ostwick Heath", 2),
    ("Ostwick", "Varn", 2),
    ("Ostwick", "Corrin", 2),
    ("Varn Marches", "Corrin Downs", 3),
];

struct LeaderRow {
    name: &'static str,
    faction: FactionId,
    home: &'static str,
    stats: LeaderStats,
    abilities: &'static [Ability],
    traits: &'static [LeaderTrait],
}

const UNSET: LeaderStats = LeaderStats {
    clandestine_ops: None,
    discretion: None,
    statesmanship: None,
    stability_per_turn: None,
    command_bonus: None,
};

const LEADERS: &[LeaderRow] = &[
    LeaderRow {
        name: "Queen Aldis",
        faction: AUREL,
        home: "Aldmoor",
        stats: LeaderStats {
            statesmanship: Some(5),
            stability_per_turn: Some(4),
            ..UNSET
        },
        abilities: &[Ability::Manager],
        traits: &[],
    },
    LeaderRow {
        name: "Rook",
        faction: AUREL,
        home: "Aldmoor",
        stats: LeaderStats {
            clandestine_ops: Some(5),
            discretion: Some(4),
            statesmanship: Some(2),
            ..UNSET
        },
        abilities: &[Ability::Ghost],
        traits: &[],
    },
    LeaderRow {
        name: "Tamsin Vey",
        faction: AUREL,
        home: "Aldmoor Fields",
        stats: LeaderStats {
            stability_per_turn: Some(2),
            ..UNSET
        },
        abilities: &[],
        traits: &[],
    },
    LeaderRow {
        name: "Captain Brann",
        faction: AUREL,
        home: "Aldmoor Fields",
        stats: LeaderStats {
            command_bonus: Some(5),
            statesmanship: Some(2),
            ..UNSET
        },
        abilities: &[Ability::Legendary],
        traits: &[LeaderTrait::ManOfAction],
    },
    LeaderRow {
        name: "Ilse Morrow",
        faction: MORVANE,
        home: "Varn",
        stats: LeaderStats {
            statesmanship: Some(4),
            stability_per_turn: Some(3),
            ..UNSET
        },
        abilities: &[Ability::Paranoid],
        traits: &[],
    },
    LeaderRow {
        name: "Corvin",
        faction: MORVANE,
        home: "Varn Marches",
        stats: LeaderStats {
            clandestine_ops: Some(4),
            ..UNSET
        },
        abilities: &[Ability::Firebrand],
        traits: &[LeaderTrait::ScorchedEarth],
    },
    LeaderRow {
        name: "Brother Hale",
        faction: MORVANE,
        home: "Varn",
        stats: UNSET,
        abilities: &[Ability::ManOfChurch],
        traits: &[],
    },
    LeaderRow {
        name: "Lady Sorrel",
        faction: TESSALY,
        home: "Corrin",
        stats: LeaderStats {
            stability_per_turn: Some(3),
            ..UNSET
        },
        abilities: &[],
        traits: &[],
    },
    LeaderRow {
        name: "Wren",
        faction: TESSALY,
        home: "Corrin Downs",
        stats: LeaderStats {
            discretion: Some(5),
            ..UNSET
        },
        abilities: &[Ability::Daredevil],
        traits: &[],
    },
    LeaderRow {
        name: "Old Maren",
        faction: TESSALY,
        home: "Corrin Downs",
        stats: LeaderStats {
            statesmanship: Some(2),
            ..UNSET
        },
        abilities: &[],
        traits: &[LeaderTrait::Pacifist],
    },
];

/// (faction, treasury gold, army strength, army home)
const FACTIONS: &[(FactionId, u32, u32, &str)] = &[
    (AUREL, 1500, 1200, "Aldmoor Fields"),
    (MORVANE, 1000, 900, "Varn"),
    (TESSALY, 600, 600, "Corrin"),
];

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

fn territory(
    id: LocationId,
    name: &str,
    row: &ProvinceRow,
    kind: LocationType,
    linked: Option<LocationId>,
) -> Location {
    let (population, gold_income, food_stock, food_consumption) = match kind {
        LocationType::Rural => (row.rural_population, 10, 120, 4),
        _ => (row.city_population, 50, 40, 8),
    };
    Location {
        id,
        name: name.to_owned(),
        faction: row.faction,
        stability: row.stability,
        resentment: row.resentment.iter().copied().collect(),
        population,
        gold_income,
        food_stock,
        food_consumption,
        kind,
        linked_location: linked,
        active_policies: BTreeSet::new(),
        last_make_examples_turn: None,
    }
}

/// Build the starting world for `seed`.
pub fn starting_world(seed: u64) -> WorldState {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut world = WorldState {
        turn: 1,
        ..WorldState::default()
    };
    let mut places: BTreeMap<&str, LocationId> = BTreeMap::new();

    for row in PROVINCES {
        let city = LocationId::from_random_bytes(rng.random());
        let countryside = LocationId::from_random_bytes(rng.random());
        world.insert_location(territory(
            city,
            row.city,
            row,
            LocationType::City,
            Some(countryside),
        ));
        world.insert_location(territory(
            countryside,
            row.countryside,
            row,
            LocationType::Rural,
            Some(city),
        ));
        places.insert(row.city, city);
        places.insert(row.countryside, countryside);
    }

    let stage = LocationId::from_random_bytes(rng.random());
    world.insert_location(Location {
        id: stage,
        name: ROAD_STAGE.to_owned(),
        faction: FactionId::NEUTRAL,
        stability: 50,
        resentment: BTreeMap::new(),
        population: 500,
        gold_income: 0,
        food_stock: 0,
        food_consumption: 0,
        kind: LocationType::RoadStage,
        linked_location: None,
        active_policies: BTreeSet::new(),
        last_make_examples_turn: None,
    });
    places.insert(ROAD_STAGE, stage);

    for (from, to, travel_turns) in ROADS {
        let (Some(from_id), Some(to_id)) = (places.get(from), places.get(to)) else {
            warn!(from, to, "road end not found, skipping");
            continue;
        };
        world.roads.push(Road {
            id: RoadId::from_random_bytes(rng.random()),
            from: *from_id,
            to: *to_id,
            travel_turns: *travel_turns,
        });
    }

    for row in LEADERS {
        let Some(home) = places.get(row.home) else {
            warn!(leader = row.name, home = row.home, "leader home not found, skipping");
            continue;
        };
        let mut leader = Leader::new(row.name, row.faction, *home);
        leader.id = LeaderId::from_random_bytes(rng.random());
        leader.stats = row.stats;
        leader.abilities = row.abilities.iter().copied().collect();
        leader.traits = row.traits.iter().copied().collect();
        world.insert_leader(leader);
    }

    for (faction, gold, strength, home) in FACTIONS {
        world.resources.insert(
            *faction,
            FactionResources {
                gold: *gold,
                clandestine_budget: 0,
            },
        );
        let Some(location) = places.get(home) else {
            continue;
        };
        world.insert_army(Army {
            id: ArmyId::from_random_bytes(rng.random()),
            faction: *faction,
            location: *location,
            strength: *strength,
            commander: None,
            is_insurgent: false,
        });
    }

    info!(
        seed,
        locations = world.locations.len(),
        roads = world.roads.len(),
        leaders = world.leaders.len(),
        armies = world.armies.len(),
        "starting world built"
    );
    world
}

/// Strategies used when the configuration names no faction.
pub fn default_strategies() -> Vec<FactionStrategy> {
    let mut aurel = FactionStrategy::new(AUREL, "Aurel");
    aurel.opening_budget = 500;
    aurel.opening_mission_cap = Some(2);
    aurel.vip_leaders.insert(String::from("Queen Aldis"));
    aurel.role_affinity.insert(
        String::from("Rook"),
        BTreeMap::from([(RoleKind::Clandestine, AffinityTier::Primary)]),
    );
    aurel.role_affinity.insert(
        String::from("Captain Brann"),
        BTreeMap::from([(RoleKind::Commander, AffinityTier::Primary)]),
    );

    let mut morvane = FactionStrategy::new(MORVANE, "Morvane");
    morvane.opening_budget = 300;
    morvane.ipg_multiplier = 1.2;
    morvane.allow_assassination = true;

    let mut tessaly = FactionStrategy::new(TESSALY, "Tessaly");
    tessaly.campaign_active = true;
    tessaly.max_capture_risk = 10;

    vec![aurel, morvane, tessaly]
}
