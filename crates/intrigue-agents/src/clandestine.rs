//! The clandestine resolution pass.
//!
//! Runs the detection state machine over every agent of every faction once
//! per turn, in `(faction, leader id)` order, then consolidates the game
//! logs the agents produced before handing them to the state manager.
//! Resource movements and spawned armies go through the manager as each
//! agent resolves, so later agents see the effects of earlier ones.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use tracing::info;

use intrigue_types::{FactionId, LeaderId, LocationId, LogEntry, Severity};

use crate::actions::costs;
use crate::config::ClandestineConfig;
use crate::detection::{self, DetectionContext, DetectionOutcome};
use crate::state_manager::LeaderStateManager;

/// Tally of one clandestine pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClandestineReport {
    /// Agents whose mission advanced.
    pub active: u32,
    /// Agents caught who escaped.
    pub escaped: u32,
    /// Agents caught and executed.
    pub executed: u32,
    /// Grand Insurrections that broke out.
    pub completed: u32,
    /// Agents who stood down after a territory flip.
    pub stood_down: u32,
    /// Game logs dropped by consolidation.
    pub logs_suppressed: u32,
}

impl ClandestineReport {
    fn record(&mut self, outcome: DetectionOutcome) {
        let slot = match outcome {
            DetectionOutcome::Dormant => return,
            DetectionOutcome::StoodDown => &mut self.stood_down,
            DetectionOutcome::Active => &mut self.active,
            DetectionOutcome::Escaped => &mut self.escaped,
            DetectionOutcome::Executed => &mut self.executed,
            DetectionOutcome::Completed => &mut self.completed,
        };
        *slot = slot.saturating_add(1);
    }
}

/// Resolves all clandestine activity of a turn.
#[derive(Debug, Clone)]
pub struct ClandestineTurnProcessor {
    config: ClandestineConfig,
    notified_immediately: BTreeSet<FactionId>,
}

impl ClandestineTurnProcessor {
    /// Create a processor. Factions in `notified_immediately` (the AI
    /// factions) learn of new defensive measures the turn they appear.
    pub const fn new(config: ClandestineConfig, notified_immediately: BTreeSet<FactionId>) -> Self {
        Self {
            config,
            notified_immediately,
        }
    }

    /// Tunables in use.
    pub const fn config(&self) -> &ClandestineConfig {
        &self.config
    }

    /// Advance every agent by one turn.
    pub fn run(&self, manager: &mut LeaderStateManager, rng: &mut impl Rng) -> ClandestineReport {
        let mut agents: Vec<(FactionId, LeaderId)> = manager
            .world()
            .leaders
            .values()
            .filter(|l| {
                l.status.is_clandestine()
                    || !l.active_actions.is_empty()
                    || l.detection_level > 0
                    || l.detection_location.is_some()
            })
            .map(|l| (l.faction, l.id))
            .collect();
        agents.sort_unstable();

        let mut report = ClandestineReport::default();
        let mut logs = Vec::new();
        for (faction, leader_id) in agents {
            let ctx = DetectionContext {
                config: &self.config,
                notified_immediately: self.notified_immediately.contains(&faction),
            };
            let turn = detection::advance_leader(manager, leader_id, &ctx, rng);
            report.record(turn.outcome);
            logs.extend(turn.logs);
        }

        let produced = logs.len();
        let kept = consolidate_logs(logs);
        report.logs_suppressed =
            u32::try_from(produced.saturating_sub(kept.len())).unwrap_or(u32::MAX);
        manager.extend_logs(kept);

        info!(
            turn = manager.turn(),
            active = report.active,
            executed = report.executed,
            escaped = report.escaped,
            completed = report.completed,
            stood_down = report.stood_down,
            "clandestine pass complete"
        );
        report
    }
}

/// Consolidate action logs per audience.
///
/// Entries produced by a clandestine action are grouped by territory,
/// acting faction and audience. A group with any CRITICAL entry keeps only
/// its critical entries; otherwise it keeps the single entry whose action
/// ranks highest, the earliest one on ties. Entries not produced by an
/// action pass through. Relative order is preserved.
pub fn consolidate_logs(entries: Vec<LogEntry>) -> Vec<LogEntry> {
    type GroupKey = (LocationId, FactionId, BTreeSet<FactionId>);

    let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    for (index, entry) in entries.iter().enumerate() {
        if let (Some(location), Some(actor), Some(_)) =
            (entry.location, entry.acting_faction, entry.source)
        {
            groups
                .entry((location, actor, entry.visible_to.clone()))
                .or_default()
                .push(index);
        }
    }

    let severity = |index: usize| entries.get(index).map(|e| e.severity);
    let priority = |index: usize| {
        entries
            .get(index)
            .and_then(|e| e.source)
            .map_or(0, costs::log_priority)
    };

    let mut dropped = BTreeSet::new();
    for indices in groups.values() {
        let has_critical = indices
            .iter()
            .any(|i| severity(*i) == Some(Severity::Critical));
        if has_critical {
            dropped.extend(
                indices
                    .iter()
                    .copied()
                    .filter(|i| severity(*i) != Some(Severity::Critical)),
            );
        } else {
            // `max_by_key` keeps the last maximum; reversing makes it the first.
            let keep = indices.iter().rev().copied().max_by_key(|i| priority(*i));
            dropped.extend(indices.iter().copied().filter(|i| Some(*i) != keep));
        }
    }

    entries
        .into_iter()
        .enumerate()
        .filter(|(index, _)| !dropped.contains(index))
        .map(|(_, entry)| entry)
        .collect()
}
