//! Structured progress events.
//!
//! Pipeline stages never print. They report through an [`EventSink`] handed
//! in by the caller: the CLI forwards to the `log` facade, tests collect.

use std::cell::RefCell;

/// Events emitted by the pipeline stages, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeEvent {
    /// An input file for a (category, season) pair was not found; loading continues.
    FileMissing { category: String, season: String, path: String },
    /// A category finished loading.
    CategoryLoaded { category: String, seasons: usize, rows: usize },
    /// The `Matches` column held something other than its own header text and was kept.
    UnexpectedMatchesColumn { category: String },
    /// Valuation rows dropped during cleaning (no season or no parseable value).
    ValuationRowsDropped { dropped: usize, kept: usize },
    /// A joined-in table had more than one row per key; the first row was used.
    DuplicateJoinKeys { table: String, duplicates: usize },
    /// A primary season has no secondary rows; its rows stay unmatched.
    ScopeWarning { season: String, rows: usize },
    /// Fuzzy phase accepted a candidate.
    FuzzyAccepted { name: String, matched: String, season: String, score: u8 },
    /// Fuzzy phase found a best candidate below the threshold.
    FuzzyRejected { name: String, best: String, season: String, score: u8 },
    /// Reconciler removed a column.
    ColumnDropped { column: String },
    /// A stage finished.
    StageFinished { stage: Stage, rows: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Combine,
    Match,
    Reconcile,
    Filter,
    Diagnostics,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load => write!(f, "load"),
            Self::Combine => write!(f, "combine"),
            Self::Match => write!(f, "match"),
            Self::Reconcile => write!(f, "reconcile"),
            Self::Filter => write!(f, "filter"),
            Self::Diagnostics => write!(f, "diagnostics"),
        }
    }
}

/// Receiver for pipeline events.
pub trait EventSink {
    fn emit(&self, event: MergeEvent);
}

/// Discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: MergeEvent) {}
}

/// Forwards events to the `log` facade.
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: MergeEvent) {
        match event {
            MergeEvent::FileMissing { path, .. } => log::warn!("missing file: {path}"),
            MergeEvent::CategoryLoaded { category, seasons, rows } => {
                log::info!("loaded {category}: {rows} row(s) across {seasons} season(s)")
            }
            MergeEvent::UnexpectedMatchesColumn { category } => {
                log::warn!("unexpected values in 'Matches' column of {category}; column kept")
            }
            MergeEvent::ValuationRowsDropped { dropped, kept } => {
                log::info!("valuation: dropped {dropped} row(s) without season or value, kept {kept}")
            }
            MergeEvent::DuplicateJoinKeys { table, duplicates } => {
                log::warn!("{table}: {duplicates} duplicate join key(s); first row used")
            }
            MergeEvent::ScopeWarning { season, rows } => {
                log::warn!("season {season}: no valuation rows for {rows} player row(s)")
            }
            MergeEvent::FuzzyAccepted { name, matched, season, score } => {
                log::debug!("fuzzy match [{season}]: '{name}' -> '{matched}' (score: {score})")
            }
            MergeEvent::FuzzyRejected { name, best, season, score } => {
                log::debug!("no fuzzy match [{season}]: '{name}' (best '{best}', score: {score})")
            }
            MergeEvent::ColumnDropped { column } => log::debug!("dropped column '{column}'"),
            MergeEvent::StageFinished { stage, rows } => log::info!("{stage}: {rows} row(s)"),
        }
    }
}

/// Simple event collector for testing.
#[derive(Default)]
pub struct EventCollector {
    events: RefCell<Vec<MergeEvent>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MergeEvent> {
        self.events.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Seasons reported by scope warnings.
    pub fn scope_warnings(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                MergeEvent::ScopeWarning { season, .. } => Some(season.clone()),
                _ => None,
            })
            .collect()
    }

    /// Paths reported missing by the loader.
    pub fn missing_files(&self) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                MergeEvent::FileMissing { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for EventCollector {
    fn emit(&self, event: MergeEvent) {
        self.events.borrow_mut().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_filters_by_kind() {
        let collector = EventCollector::new();
        collector.emit(MergeEvent::FileMissing {
            category: "player_gca".into(),
            season: "2223".into(),
            path: "df_player_gca_2223.csv".into(),
        });
        collector.emit(MergeEvent::ScopeWarning { season: "2425".into(), rows: 4 });
        collector.emit(MergeEvent::StageFinished { stage: Stage::Match, rows: 10 });

        assert_eq!(collector.len(), 3);
        assert_eq!(collector.missing_files(), vec!["df_player_gca_2223.csv"]);
        assert_eq!(collector.scope_warnings(), vec!["2425"]);
    }
}
