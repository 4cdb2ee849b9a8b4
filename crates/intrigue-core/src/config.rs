//! Configuration loading and typed config structures.
//!
//! The canonical configuration lives in `intrigue-config.yaml` at the
//! project root. Every struct mirrors a YAML section and every field has a
//! serde default, so a partial file is valid. Faction strategies are the
//! exception to leniency: [`StrategyBook::strategy`] fails for a faction
//! that has no entry, since that means the configuration is incomplete.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use intrigue_agents::{ClandestineConfig, GovernorConfig};
use intrigue_types::{AffinityTier, FactionId, PERCENT_MAX, RoleKind};

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A faction was asked for that has no strategy entry.
    #[error("no strategy configured for faction {0}")]
    UnknownFaction(FactionId),

    /// A strategy entry holds values the engine cannot work with.
    #[error("invalid strategy for faction {faction}: {reason}")]
    InvalidStrategy {
        /// The faction whose entry is wrong.
        faction: FactionId,
        /// What is wrong with it.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

// ---------------------------------------------------------------------------
// Top level
// ---------------------------------------------------------------------------

/// Top-level configuration.
///
/// Mirrors the structure of `intrigue-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Run parameters (seed, turn count, snapshot).
    #[serde(default)]
    pub simulation: RunConfig,

    /// Diagnostic logging.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Detection model and clandestine action tunables.
    #[serde(default)]
    pub clandestine: ClandestineConfig,

    /// Governor policy thresholds.
    #[serde(default)]
    pub governor: GovernorConfig,

    /// Role scoring weights.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// One strategy per faction.
    #[serde(default)]
    pub factions: Vec<FactionStrategy>,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `INTRIGUE_SEED` overrides `simulation.seed` when set to an integer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::InvalidStrategy`] if a faction entry is unusable.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::InvalidStrategy`] if a faction entry is unusable.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.simulation.apply_env_overrides();
        for strategy in &config.factions {
            strategy.validate()?;
        }
        Ok(config)
    }

    /// Index the faction strategies.
    pub fn strategy_book(&self) -> Result<StrategyBook, ConfigError> {
        StrategyBook::new(self.factions.clone())
    }
}

/// Run parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Seed of the per-turn RNG.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Turns to simulate.
    #[serde(default = "default_turns")]
    pub turns: u32,

    /// Where to write the final world as JSON, if anywhere.
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl RunConfig {
    /// Apply `INTRIGUE_SEED` if it holds an integer.
    pub fn apply_env_overrides(&mut self) {
        if let Some(seed) = std::env::var("INTRIGUE_SEED")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.seed = seed;
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            turns: default_turns(),
            snapshot_path: None,
        }
    }
}

/// Output format of diagnostic logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (trace, debug, info, warn, error).
    /// `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Weights of the role scoring engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScoringConfig {
    /// Points per unit of insurgents-per-gold (default: 20).
    #[serde(default = "default_ipg_scale")]
    pub ipg_scale: f64,

    /// Points lost per turn of travel (default: 3).
    #[serde(default = "default_travel_penalty_per_turn")]
    pub travel_penalty_per_turn: f64,

    /// Points for already standing at the target (default: 25).
    #[serde(default = "default_at_target_bonus")]
    pub at_target_bonus: f64,

    /// Points lost by a VIP leader on clandestine roles (default: 1000).
    #[serde(default = "default_vip_penalty")]
    pub vip_penalty: f64,

    /// Governance score before stats (default: 20).
    #[serde(default = "default_governor_base")]
    pub governor_base: f64,

    /// Governance points per statesmanship ordinal step (default: 15).
    #[serde(default = "default_statesmanship_weight")]
    pub statesmanship_weight: f64,

    /// Governance points per point of stability-per-turn (default: 5).
    #[serde(default = "default_stability_per_turn_weight")]
    pub stability_per_turn_weight: f64,

    /// Governance bonus of a MANAGER (default: 10).
    #[serde(default = "default_manager_bonus")]
    pub manager_bonus: f64,

    /// Governance bonus of a MAN OF CHURCH (default: 5).
    #[serde(default = "default_church_bonus")]
    pub church_bonus: f64,

    /// Governance penalty for statesmanship below "Capable" (default: 15).
    #[serde(default = "default_low_statesmanship_penalty")]
    pub low_statesmanship_penalty: f64,

    /// Stability under which a stabilizer is worth sending (default: 50).
    #[serde(default = "default_stabilizer_threshold")]
    pub stabilizer_threshold: u32,

    /// Score of guarding a threatened leader (default: 40).
    #[serde(default = "default_protector_base")]
    pub protector_base: f64,

    /// Commander score multiplier while a campaign is active (default: 2).
    #[serde(default = "default_campaign_multiplier")]
    pub campaign_multiplier: f64,

    /// Insurgent-equivalent value of a dead enemy governor (default: 800).
    #[serde(default = "default_assassination_value")]
    pub assassination_value: f64,
}

impl ScoringConfig {
    /// Bonus for a leader's affinity with a role.
    pub const fn affinity_bonus(tier: AffinityTier) -> f64 {
        match tier {
            AffinityTier::Primary => 12.0,
            AffinityTier::Secondary => 8.0,
            AffinityTier::Tertiary => 4.0,
            AffinityTier::Exceptional => 2.0,
            AffinityTier::None => 0.0,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            ipg_scale: default_ipg_scale(),
            travel_penalty_per_turn: default_travel_penalty_per_turn(),
            at_target_bonus: default_at_target_bonus(),
            vip_penalty: default_vip_penalty(),
            governor_base: default_governor_base(),
            statesmanship_weight: default_statesmanship_weight(),
            stability_per_turn_weight: default_stability_per_turn_weight(),
            manager_bonus: default_manager_bonus(),
            church_bonus: default_church_bonus(),
            low_statesmanship_penalty: default_low_statesmanship_penalty(),
            stabilizer_threshold: default_stabilizer_threshold(),
            protector_base: default_protector_base(),
            campaign_multiplier: default_campaign_multiplier(),
            assassination_value: default_assassination_value(),
        }
    }
}

// ---------------------------------------------------------------------------
// Faction strategy
// ---------------------------------------------------------------------------

/// Who takes a faction's decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Controller {
    /// The engine decides, and learns of enemy measures immediately.
    #[default]
    Ai,
    /// Decisions come from outside; only travel is resolved.
    Human,
}

/// Per-faction parameters of the AI.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FactionStrategy {
    /// The faction.
    pub faction: FactionId,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Who decides for the faction.
    #[serde(default)]
    pub controller: Controller,

    /// Multiplier on clandestine value scores (default: 1.0).
    #[serde(default = "default_ipg_multiplier")]
    pub ipg_multiplier: f64,

    /// Least score a clandestine assignment must reach, before the
    /// wealth adjustment (default: 10).
    #[serde(default = "default_clandestine_floor")]
    pub clandestine_floor: f64,

    /// Capture risk above which an agent is pulled out (default: 20).
    #[serde(default = "default_max_capture_risk")]
    pub max_capture_risk: u32,

    /// Turns of margin minor missions keep from the detection threshold
    /// (default: 3).
    #[serde(default = "default_min_safe_turns")]
    pub min_safe_turns: u32,

    /// Largest share of treasury gold earmarked for clandestine work,
    /// in percent (default: 50).
    #[serde(default = "default_max_clandestine_share_pct")]
    pub max_clandestine_share_pct: u32,

    /// Gold moved into the clandestine budget on the first turn.
    #[serde(default)]
    pub opening_budget: u32,

    /// New clandestine missions per turn (default: 1).
    #[serde(default = "default_mission_cap")]
    pub mission_cap: u32,

    /// Mission cap on the first turn, when it differs.
    #[serde(default)]
    pub opening_mission_cap: Option<u32>,

    /// Leaders kept out of clandestine work while anyone else is available.
    #[serde(default)]
    pub vip_leaders: BTreeSet<String>,

    /// Whether the faction plots against enemy governors.
    #[serde(default)]
    pub allow_assassination: bool,

    /// Whether a military campaign is under way.
    #[serde(default)]
    pub campaign_active: bool,

    /// Role affinities by leader name.
    #[serde(default)]
    pub role_affinity: BTreeMap<String, BTreeMap<RoleKind, AffinityTier>>,

    /// Budget handed to a minor sabotage mission (default: 100).
    #[serde(default = "default_minor_budget")]
    pub minor_budget: u32,

    /// Gold committed to inciting a neutral uprising (default: 100).
    #[serde(default = "default_incite_budget")]
    pub incite_budget: u32,

    /// Gold committed to an assassination (default: 200).
    #[serde(default = "default_assassination_budget")]
    pub assassination_budget: u32,
}

impl FactionStrategy {
    /// A strategy with every default, for `faction`.
    pub fn new(faction: FactionId, name: impl Into<String>) -> Self {
        Self {
            faction,
            name: name.into(),
            controller: Controller::default(),
            ipg_multiplier: default_ipg_multiplier(),
            clandestine_floor: default_clandestine_floor(),
            max_capture_risk: default_max_capture_risk(),
            min_safe_turns: default_min_safe_turns(),
            max_clandestine_share_pct: default_max_clandestine_share_pct(),
            opening_budget: 0,
            mission_cap: default_mission_cap(),
            opening_mission_cap: None,
            vip_leaders: BTreeSet::new(),
            allow_assassination: false,
            campaign_active: false,
            role_affinity: BTreeMap::new(),
            minor_budget: default_minor_budget(),
            incite_budget: default_incite_budget(),
            assassination_budget: default_assassination_budget(),
        }
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidStrategy {
            faction: self.faction,
            reason: reason.to_owned(),
        };
        if self.faction.is_neutral() {
            return Err(invalid("the neutral faction cannot have a strategy"));
        }
        if !self.ipg_multiplier.is_finite() || self.ipg_multiplier <= 0.0 {
            return Err(invalid("ipg_multiplier must be a positive number"));
        }
        if !self.clandestine_floor.is_finite() {
            return Err(invalid("clandestine_floor must be a number"));
        }
        if self.max_clandestine_share_pct > PERCENT_MAX {
            return Err(invalid("max_clandestine_share_pct cannot exceed 100"));
        }
        Ok(())
    }

    /// Whether the engine takes this faction's decisions.
    pub const fn is_ai(&self) -> bool {
        matches!(self.controller, Controller::Ai)
    }

    /// New clandestine missions allowed on `turn`.
    pub const fn mission_cap_for(&self, turn: u32) -> u32 {
        match self.opening_mission_cap {
            Some(cap) if turn <= 1 => cap,
            _ => self.mission_cap,
        }
    }

    /// The leader's affinity with a role.
    pub fn affinity(&self, leader_name: &str, role: RoleKind) -> AffinityTier {
        self.role_affinity
            .get(leader_name)
            .and_then(|roles| roles.get(&role))
            .copied()
            .unwrap_or_default()
    }

    /// Whether the leader is a VIP.
    pub fn is_vip(&self, leader_name: &str) -> bool {
        self.vip_leaders.contains(leader_name)
    }

    /// Least clandestine score accepted with `treasury_gold` in the bank.
    /// Rich factions accept thinner margins.
    pub const fn wealth_floor(&self, treasury_gold: u32) -> f64 {
        let factor = if treasury_gold < 500 {
            1.0
        } else if treasury_gold < 1000 {
            0.75
        } else {
            0.5
        };
        self.clandestine_floor * factor
    }
}

/// Strategies indexed by faction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyBook {
    strategies: BTreeMap<FactionId, FactionStrategy>,
}

impl StrategyBook {
    /// Index `strategies`, validating each and rejecting duplicates.
    pub fn new(strategies: Vec<FactionStrategy>) -> Result<Self, ConfigError> {
        let mut book = BTreeMap::new();
        for strategy in strategies {
            strategy.validate()?;
            let faction = strategy.faction;
            if book.insert(faction, strategy).is_some() {
                return Err(ConfigError::InvalidStrategy {
                    faction,
                    reason: String::from("configured more than once"),
                });
            }
        }
        Ok(Self { strategies: book })
    }

    /// The strategy of `faction`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownFaction`] if the faction has no entry.
    pub fn strategy(&self, faction: FactionId) -> Result<&FactionStrategy, ConfigError> {
        self.strategies
            .get(&faction)
            .ok_or(ConfigError::UnknownFaction(faction))
    }

    /// Every configured faction, in id order.
    pub fn factions(&self) -> impl Iterator<Item = FactionId> + '_ {
        self.strategies.keys().copied()
    }

    /// Factions whose decisions the engine takes.
    pub fn ai_factions(&self) -> BTreeSet<FactionId> {
        self.strategies
            .values()
            .filter(|s| s.is_ai())
            .map(|s| s.faction)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_seed() -> u64 {
    42
}

const fn default_turns() -> u32 {
    12
}

fn default_log_level() -> String {
    String::from("info")
}

const fn default_ipg_scale() -> f64 {
    20.0
}

const fn default_travel_penalty_per_turn() -> f64 {
    3.0
}

const fn default_at_target_bonus() -> f64 {
    25.0
}

const fn default_vip_penalty() -> f64 {
    1000.0
}

const fn default_governor_base() -> f64 {
    20.0
}

const fn default_statesmanship_weight() -> f64 {
    15.0
}

const fn default_stability_per_turn_weight() -> f64 {
    5.0
}

const fn default_manager_bonus() -> f64 {
    10.0
}

const fn default_church_bonus() -> f64 {
    5.0
}

const fn default_low_statesmanship_penalty() -> f64 {
    15.0
}

const fn default_stabilizer_threshold() -> u32 {
    50
}

const fn default_protector_base() -> f64 {
    40.0
}

const fn default_campaign_multiplier() -> f64 {
    2.0
}

const fn default_assassination_value() -> f64 {
    800.0
}

const fn default_ipg_multiplier() -> f64 {
    1.0
}

const fn default_clandestine_floor() -> f64 {
    10.0
}

const fn default_max_capture_risk() -> u32 {
    20
}

const fn default_min_safe_turns() -> u32 {
    3
}

const fn default_max_clandestine_share_pct() -> u32 {
    50
}

const fn default_mission_cap() -> u32 {
    1
}

const fn default_minor_budget() -> u32 {
    100
}

const fn default_incite_budget() -> u32 {
    100
}

const fn default_assassination_budget() -> u32 {
    200
}
