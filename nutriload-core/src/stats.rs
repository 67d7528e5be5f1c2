//! Run bookkeeping: pipeline phases, per-record outcomes and the statistics they add up to.
use std::{fmt, time::Duration};

use itertools::Itertools as _;
use serde::{Deserialize, Serialize};

use crate::{errors::SkipReason, food::FoodId, records::SourceKind};

/// Named phases of a pipeline run.
///
/// `Disconnected → Connected → Cleared → Merging(kind) → Loading { batch } → Done`, with
/// `Failed` reachable from any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Disconnected,
    Connected,
    Cleared,
    Merging(SourceKind),
    Loading { batch: usize },
    Done,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunPhase::Disconnected => write!(f, "disconnected"),
            RunPhase::Connected => write!(f, "connected"),
            RunPhase::Cleared => write!(f, "cleared"),
            RunPhase::Merging(kind) => write!(f, "merging {kind}"),
            RunPhase::Loading { batch } => write!(f, "loading batch {batch}"),
            RunPhase::Done => write!(f, "done"),
            RunPhase::Failed => write!(f, "failed"),
        }
    }
}

/// What happened when a single typed record was merged into the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// A new aggregate was created from a base food
    Seeded,
    /// A base food replaced an existing aggregate (last wins)
    Replaced,
    /// An empty description was filled in
    Filled,
    /// A description override found the description already set
    Unchanged,
    /// A nutrient or attribute was appended
    Appended,
    Skipped(SkipReason),
}

/// Statistics for a single source pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    pub kind: Option<SourceKind>,
    /// Non-noise lines seen
    pub lines: usize,
    pub malformed: usize,
    /// Records dropped by normalization
    pub invalid: usize,
    /// Records whose id has no base food
    pub unmatched: usize,
    pub seeded: usize,
    pub replaced: usize,
    pub filled: usize,
    pub unchanged: usize,
    pub appended: usize,
}

impl SourceStats {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    /// Records that changed the index
    pub fn applied(&self) -> usize {
        self.seeded + self.replaced + self.filled + self.appended
    }

    /// Records that were dropped for any reason
    pub fn skipped(&self) -> usize {
        self.malformed + self.invalid + self.unmatched
    }

    pub fn record(&mut self, outcome: &MergeOutcome) {
        match outcome {
            MergeOutcome::Seeded => self.seeded += 1,
            MergeOutcome::Replaced => self.replaced += 1,
            MergeOutcome::Filled => self.filled += 1,
            MergeOutcome::Unchanged => self.unchanged += 1,
            MergeOutcome::Appended => self.appended += 1,
            MergeOutcome::Skipped(reason) => self.record_skip(reason),
        }
    }

    pub fn record_skip(&mut self, reason: &SkipReason) {
        match reason {
            SkipReason::MalformedJson { .. } => self.malformed += 1,
            SkipReason::UnknownFood(_) => self.unmatched += 1,
            SkipReason::NotAnObject { .. }
            | SkipReason::MissingField { .. }
            | SkipReason::InvalidField { .. } => self.invalid += 1,
        }
    }
}

impl fmt::Display for SourceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self
            .kind
            .map_or_else(|| "unknown".to_string(), |kind| kind.to_string());
        write!(
            f,
            "{kind}: {} lines, {} applied, {} unchanged, {} malformed, {} invalid, {} unmatched",
            self.lines,
            self.applied(),
            self.unchanged,
            self.malformed,
            self.invalid,
            self.unmatched
        )
    }
}

/// A document the store refused to insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedDocument {
    pub id: FoodId,
    pub reason: String,
}

/// Result of a single best-effort batch insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub inserted: usize,
    pub rejected: Vec<RejectedDocument>,
}

impl BatchReport {
    /// A report for a batch where every document landed
    pub fn all_inserted(count: usize) -> Self {
        Self {
            attempted: count,
            inserted: count,
            rejected: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub batches: usize,
    pub attempted: usize,
    pub inserted: usize,
    pub rejected: usize,
}

impl LoadStats {
    pub fn record(&mut self, report: &BatchReport) {
        self.batches += 1;
        self.attempted += report.attempted;
        self.inserted += report.inserted;
        self.rejected += report.rejected.len();
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub sources: Vec<SourceStats>,
    pub load: LoadStats,
    pub catalog_size: usize,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn source(&self, kind: SourceKind) -> Option<&SourceStats> {
        self.sources.iter().find(|stats| stats.kind == Some(kind))
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} foods in catalog, {} inserted, {} rejected in {} batches ({:.1}s)",
            self.catalog_size,
            self.load.inserted,
            self.load.rejected,
            self.load.batches,
            self.elapsed.as_secs_f64()
        )?;
        write!(f, "{}", self.sources.iter().map(|s| format!("  {s}")).join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_stats_counts_outcomes() {
        let mut stats = SourceStats::new(SourceKind::FoodAttributes);
        stats.record(&MergeOutcome::Appended);
        stats.record(&MergeOutcome::Appended);
        stats.record(&MergeOutcome::Skipped(SkipReason::UnknownFood(99)));
        stats.record(&MergeOutcome::Skipped(SkipReason::MalformedJson {
            line: 2,
            message: "EOF".into(),
        }));

        assert_eq!(stats.applied(), 2);
        assert_eq!(stats.skipped(), 2);
        assert_eq!(stats.unmatched, 1);
        assert_eq!(stats.malformed, 1);
    }

    #[test]
    fn test_load_stats_accumulate_reports() {
        let mut load = LoadStats::default();
        load.record(&BatchReport::all_inserted(3));
        load.record(&BatchReport {
            attempted: 2,
            inserted: 1,
            rejected: vec![RejectedDocument {
                id: 1,
                reason: "duplicate".into(),
            }],
        });

        assert_eq!(
            load,
            LoadStats {
                batches: 2,
                attempted: 5,
                inserted: 4,
                rejected: 1
            }
        );
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(
            RunPhase::Merging(SourceKind::FoodNutrients).to_string(),
            "merging food_nutrients"
        );
        assert_eq!(RunPhase::Loading { batch: 2 }.to_string(), "loading batch 2");
        assert_eq!(RunPhase::Failed.to_string(), "failed");
    }
}
