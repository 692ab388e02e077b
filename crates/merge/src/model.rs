use serde::Serialize;

use crate::error::MergeError;
use crate::loader::CategoryTables;
use crate::similarity::Scorer;
use crate::table::{EntityKey, Table};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Pre-loaded, cleaned tables for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    /// Statistics categories, in configured order.
    pub categories: Vec<CategoryTables>,
    /// Cleaned valuation table (secondary side of the match).
    pub valuation: Table,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Fuzzy,
    None,
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Fuzzy => write!(f, "fuzzy"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Outcome for one primary row. Records line up with the output rows of
/// [`MatchOutput::table`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRecord {
    pub key: EntityKey,
    pub matched: bool,
    pub method: MatchMethod,
    /// Similarity of the accepted candidate; fuzzy matches only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    /// Index of the secondary row that supplied the valuation fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_row: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct MatchOutput {
    /// One row per primary row: exact matches first, then the fuzzy phase rows.
    pub table: Table,
    pub records: Vec<MatchRecord>,
    /// [`MergeError::InvalidScope`] per primary season without secondary rows.
    pub scope_warnings: Vec<MergeError>,
}

impl MatchOutput {
    pub fn summary(&self) -> MatchSummary {
        let count = |m: MatchMethod| self.records.iter().filter(|r| r.method == m).count();
        MatchSummary {
            rows: self.records.len(),
            exact: count(MatchMethod::Exact),
            fuzzy: count(MatchMethod::Fuzzy),
            unmatched: count(MatchMethod::None),
            scope_warnings: self
                .scope_warnings
                .iter()
                .filter_map(|w| match w {
                    MergeError::InvalidScope { season, .. } => Some(season.clone()),
                    _ => None,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub rows: usize,
    pub exact: usize,
    pub fuzzy: usize,
    pub unmatched: usize,
    /// Seasons present in the statistics but absent from the valuation table.
    pub scope_warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Why a row is still missing its valuation. Checked in declaration order;
/// a row lands in the first bucket it fits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticBucket {
    /// Team totals and opponent rows, never a real player.
    Synthetic,
    /// Player name shorter than five characters.
    IncompleteName,
    /// Row in the latest season; the valuation site may not list them yet.
    NewEntrant,
    /// Everything else: likely a genuine matching failure.
    Unresolved,
}

impl DiagnosticBucket {
    pub const ALL: [DiagnosticBucket; 4] =
        [Self::Synthetic, Self::IncompleteName, Self::NewEntrant, Self::Unresolved];
}

impl std::fmt::Display for DiagnosticBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Synthetic => write!(f, "synthetic"),
            Self::IncompleteName => write!(f, "incomplete_name"),
            Self::NewEntrant => write!(f, "new_entrant"),
            Self::Unresolved => write!(f, "unresolved"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketReport {
    pub bucket: DiagnosticBucket,
    pub count: usize,
    /// Distinct player names, first-seen order.
    pub players: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticsReport {
    pub total_rows: usize,
    pub total_unvalued: usize,
    /// All four buckets, in priority order.
    pub buckets: Vec<BucketReport>,
}

impl DiagnosticsReport {
    pub fn bucket(&self, bucket: DiagnosticBucket) -> Option<&BucketReport> {
        self.buckets.iter().find(|b| b.bucket == bucket)
    }
}

/// A player appearing in more than one season of the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MultiSeasonPlayer {
    pub player: String,
    pub seasons: Vec<String>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub seasons: Vec<String>,
    pub threshold: u8,
    pub scorer: Scorer,
}

/// Everything about a run except the merged rows themselves.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub meta: RunMeta,
    pub rows: usize,
    pub columns: usize,
    pub matching: MatchSummary,
    /// Absent when diagnostics are disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<DiagnosticsReport>,
    pub multi_season_players: Vec<MultiSeasonPlayer>,
}

#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub report: PipelineReport,
    /// Final merged table: one row per player-season, join key removed.
    pub table: Table,
    pub records: Vec<MatchRecord>,
}
