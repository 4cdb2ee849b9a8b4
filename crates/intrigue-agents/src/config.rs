//! Tunables for clandestine resolution and governor policies.
//!
//! These values mirror the `clandestine` and `governor` sections of
//! `intrigue-config.yaml`. Every field carries a serde default, so an empty
//! section yields [`ClandestineConfig::default`] and
//! [`GovernorConfig::default`].

use serde::{Deserialize, Serialize};

/// Parameters of the detection model and the clandestine action library.
///
/// Percentages are whole numbers in 0--100 and are rolled against a
/// uniform `0..100` draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClandestineConfig {
    /// Detection threshold before stealth is added (default: 20).
    #[serde(default = "default_threshold_base")]
    pub threshold_base: u32,

    /// Detection threshold gained per stealth level (default: 10).
    #[serde(default = "default_threshold_per_level")]
    pub threshold_per_level: u32,

    /// Flat capture risk added by a PARANOID governor (default: 15).
    #[serde(default = "default_paranoid_bonus")]
    pub paranoid_bonus: u32,

    /// Turns a Grand Insurrection is prepared (default: 4).
    #[serde(default = "default_grand_insurrection_turns")]
    pub grand_insurrection_turns: u32,

    /// Turns before an assassination resolves (default: 3).
    #[serde(default = "default_assassination_turns")]
    pub assassination_turns: u32,

    /// Turns before an incited uprising breaks out (default: 2).
    #[serde(default = "default_incite_turns")]
    pub incite_turns: u32,

    /// Turns `MakeExamples` keeps suppressing uprisings after it ends (default: 3).
    #[serde(default = "default_make_examples_cooldown")]
    pub make_examples_cooldown: u32,

    /// Largest neutral army an incited uprising can raise (default: 1500).
    #[serde(default = "default_neutral_army_cap")]
    pub neutral_army_cap: u32,

    /// Population divisor for incited uprisings in cities (default: 10000).
    #[serde(default = "default_city_divisor")]
    pub city_divisor: u64,

    /// Population divisor for incited uprisings in the countryside (default: 100000).
    #[serde(default = "default_rural_divisor")]
    pub rural_divisor: u64,

    /// Chance per turn a plot is revealed to its target (default: 33).
    #[serde(default = "default_reveal_chance_pct")]
    pub reveal_chance_pct: u32,

    /// Chance an undermining turn warns the defender (default: 25).
    #[serde(default = "default_undermine_warning_pct")]
    pub undermine_warning_pct: u32,

    /// Chance a theft warns the defender (default: 50).
    #[serde(default = "default_theft_warning_pct")]
    pub theft_warning_pct: u32,

    /// Chance a failed arson identifies the actor (default: 50).
    #[serde(default = "default_arson_identified_pct")]
    pub arson_identified_pct: u32,

    /// Resentment gained against an identified arsonist (default: 30).
    #[serde(default = "default_arson_resentment_penalty")]
    pub arson_resentment_penalty: u32,

    /// Most an arson can destroy in one turn (default: 15).
    #[serde(default = "default_arson_max_damage")]
    pub arson_max_damage: u32,

    /// Chance a DAREDEVIL escapes capture (default: 50).
    #[serde(default = "default_daredevil_escape_pct")]
    pub daredevil_escape_pct: u32,

    /// Insurgent multiplier for FIREBRAND leaders (default: 1.33).
    #[serde(default = "default_firebrand_multiplier")]
    pub firebrand_multiplier: f64,

    /// Insurgents every Grand Insurrection raises on top of the formula (default: 100).
    #[serde(default = "default_insurgent_base")]
    pub insurgent_base: u32,

    /// Gold per insurgent-weight unit in the Grand Insurrection formula (default: 25).
    #[serde(default = "default_insurgent_gold_divisor")]
    pub insurgent_gold_divisor: u32,

    /// Stability lost per clandestine-ops level when a Grand Insurrection
    /// breaks out (default: 4).
    #[serde(default = "default_insurrection_shock_per_ops")]
    pub insurrection_shock_per_ops: u32,
}

impl Default for ClandestineConfig {
    fn default() -> Self {
        Self {
            threshold_base: default_threshold_base(),
            threshold_per_level: default_threshold_per_level(),
            paranoid_bonus: default_paranoid_bonus(),
            grand_insurrection_turns: default_grand_insurrection_turns(),
            assassination_turns: default_assassination_turns(),
            incite_turns: default_incite_turns(),
            make_examples_cooldown: default_make_examples_cooldown(),
            neutral_army_cap: default_neutral_army_cap(),
            city_divisor: default_city_divisor(),
            rural_divisor: default_rural_divisor(),
            reveal_chance_pct: default_reveal_chance_pct(),
            undermine_warning_pct: default_undermine_warning_pct(),
            theft_warning_pct: default_theft_warning_pct(),
            arson_identified_pct: default_arson_identified_pct(),
            arson_resentment_penalty: default_arson_resentment_penalty(),
            arson_max_damage: default_arson_max_damage(),
            daredevil_escape_pct: default_daredevil_escape_pct(),
            firebrand_multiplier: default_firebrand_multiplier(),
            insurgent_base: default_insurgent_base(),
            insurgent_gold_divisor: default_insurgent_gold_divisor(),
            insurrection_shock_per_ops: default_insurrection_shock_per_ops(),
        }
    }
}

impl ClandestineConfig {
    /// Whether a Grand Insurrection started on `started` is in its final
    /// risk band on `turn`, where it can no longer be abandoned.
    pub const fn in_final_band(&self, started: u32, turn: u32) -> bool {
        turn.saturating_sub(started) >= self.grand_insurrection_turns.saturating_sub(1)
    }
}

/// Thresholds of the governor policy state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorConfig {
    /// Rationing starts at or below this many turns of food while cut off (default: 2).
    #[serde(default = "default_rationing_on_turns")]
    pub rationing_on_turns: u32,

    /// Rationing ends at or above this many turns of food (default: 5).
    #[serde(default = "default_rationing_off_turns")]
    pub rationing_off_turns: u32,

    /// `MakeExamples` starts at or above this resentment (default: 60).
    #[serde(default = "default_make_examples_on")]
    pub make_examples_on: u32,

    /// `MakeExamples` ends below this resentment (default: 40).
    #[serde(default = "default_make_examples_off")]
    pub make_examples_off: u32,

    /// Stability under which a territory urgently needs a stabilizer (default: 30).
    #[serde(default = "default_urgent_stability")]
    pub urgent_stability: u32,

    /// Stability restored per turn under `StabilizeRegion` when the
    /// governor has no stability-per-turn stat (default: 1).
    #[serde(default = "default_min_stabilize_gain")]
    pub min_stabilize_gain: u32,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            rationing_on_turns: default_rationing_on_turns(),
            rationing_off_turns: default_rationing_off_turns(),
            make_examples_on: default_make_examples_on(),
            make_examples_off: default_make_examples_off(),
            urgent_stability: default_urgent_stability(),
            min_stabilize_gain: default_min_stabilize_gain(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_threshold_base() -> u32 {
    20
}

const fn default_threshold_per_level() -> u32 {
    10
}

const fn default_paranoid_bonus() -> u32 {
    15
}

const fn default_grand_insurrection_turns() -> u32 {
    4
}

const fn default_assassination_turns() -> u32 {
    3
}

const fn default_incite_turns() -> u32 {
    2
}

const fn default_make_examples_cooldown() -> u32 {
    3
}

const fn default_neutral_army_cap() -> u32 {
    1500
}

const fn default_city_divisor() -> u64 {
    10_000
}

const fn default_rural_divisor() -> u64 {
    100_000
}

const fn default_reveal_chance_pct() -> u32 {
    33
}

const fn default_undermine_warning_pct() -> u32 {
    25
}

const fn default_theft_warning_pct() -> u32 {
    50
}

const fn default_arson_identified_pct() -> u32 {
    50
}

const fn default_arson_resentment_penalty() -> u32 {
    30
}

const fn default_arson_max_damage() -> u32 {
    15
}

const fn default_daredevil_escape_pct() -> u32 {
    50
}

const fn default_firebrand_multiplier() -> f64 {
    1.33
}

const fn default_insurgent_base() -> u32 {
    100
}

const fn default_insurgent_gold_divisor() -> u32 {
    25
}

const fn default_insurrection_shock_per_ops() -> u32 {
    4
}

const fn default_rationing_on_turns() -> u32 {
    2
}

const fn default_rationing_off_turns() -> u32 {
    5
}

const fn default_make_examples_on() -> u32 {
    60
}

const fn default_make_examples_off() -> u32 {
    40
}

const fn default_urgent_stability() -> u32 {
    30
}

const fn default_min_stabilize_gain() -> u32 {
    1
}
