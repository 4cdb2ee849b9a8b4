//! Turn loop binary for the Intrigue engine.
//!
//! Loads the configuration, builds the demo starting world and runs the
//! configured number of seeded turns, logging a summary of each one.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from the path given as the first argument, or
//!    `intrigue-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Build the turn orchestrator and the starting world
//! 4. Run the turns, each with an RNG seeded from the run seed and the turn
//! 5. Write the final world as JSON when `simulation.snapshot_path` is set

mod error;
mod scenario;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use intrigue_core::{LogFormat, LoggingConfig, SimulationConfig, TurnOrchestrator, TurnOutcome};
use intrigue_types::{Severity, WorldState};

use crate::error::EngineError;

const DEFAULT_CONFIG_PATH: &str = "intrigue-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration is unusable, a turn fails, or the
/// snapshot cannot be written.
fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let (mut config, found) = load_config(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    init_logging(&config.logging)?;

    if !found {
        info!(path = %config_path.display(), "config file not found, using defaults");
    }
    if config.factions.is_empty() {
        config.factions = scenario::default_strategies();
    }
    info!(
        seed = config.simulation.seed,
        turns = config.simulation.turns,
        factions = config.factions.len(),
        "intrigue-engine starting"
    );

    let engine = TurnOrchestrator::from_config(&config).map_err(EngineError::from)?;
    let mut world = scenario::starting_world(config.simulation.seed);

    for _ in 0..config.simulation.turns {
        let turn = world.turn;
        let mut rng = SmallRng::seed_from_u64(config.simulation.seed ^ u64::from(turn));
        let outcome = engine
            .run_turn(world, &mut rng)
            .map_err(EngineError::from)
            .with_context(|| format!("running turn {turn}"))?;
        log_turn(turn, &outcome);
        world = outcome.world;
        world.turn = world.turn.saturating_add(1);
    }

    if let Some(path) = &config.simulation.snapshot_path {
        write_snapshot(path, &world)?;
        info!(path = %path.display(), "snapshot written");
    }
    info!(turns = config.simulation.turns, "intrigue-engine finished");
    Ok(())
}

/// Load the configuration at `path`. A missing file yields the defaults;
/// the flag tells whether the file was found.
fn load_config(path: &Path) -> Result<(SimulationConfig, bool), EngineError> {
    if path.exists() {
        Ok((SimulationConfig::from_file(path)?, true))
    } else {
        let mut config = SimulationConfig::default();
        config.simulation.apply_env_overrides();
        Ok((config, false))
    }
}

/// Install the diagnostic subscriber. `RUST_LOG` wins over the configured
/// level.
fn init_logging(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = match logging.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}

fn log_turn(turn: u32, outcome: &TurnOutcome) {
    for (faction, plan) in &outcome.plans {
        info!(
            turn,
            faction = %faction,
            assigned = plan.assignments.len(),
            reserved = plan.reserved.len(),
            missions = plan.missions,
            gold = plan.gold_committed,
            "faction plan"
        );
        for assignment in &plan.assignments {
            debug!(
                turn,
                leader = %assignment.leader,
                role = ?assignment.role.kind(),
                score = assignment.score,
                why = %assignment.justification,
                "assignment"
            );
        }
    }

    let report = outcome.clandestine;
    info!(
        turn,
        agents = report.active,
        completed = report.completed,
        escaped = report.escaped,
        executed = report.executed,
        stood_down = report.stood_down,
        exfiltrated = outcome.exfiltrated.len(),
        evacuated = outcome.evacuated.len(),
        policy_changes = outcome.policy_changes.len(),
        "clandestine pass"
    );

    for entry in &outcome.delta.logs {
        match entry.severity {
            Severity::Critical | Severity::Good => {
                info!(turn, severity = ?entry.severity, message = %entry.message, "game log");
            }
            Severity::Info | Severity::Warning => {
                debug!(turn, severity = ?entry.severity, message = %entry.message, "game log");
            }
        }
    }
}

fn write_snapshot(path: &Path, world: &WorldState) -> Result<(), EngineError> {
    let json = serde_json::to_string_pretty(world)?;
    std::fs::write(path, json).map_err(|source| EngineError::Snapshot {
        path: path.to_path_buf(),
        source,
    })
}
