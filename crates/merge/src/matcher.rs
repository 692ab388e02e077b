use std::collections::{HashMap, HashSet};

use crate::combine::first_row_index;
use crate::config::MatchConfig;
use crate::error::MergeError;
use crate::events::{EventSink, MergeEvent, Stage};
use crate::model::{MatchMethod, MatchOutput, MatchRecord};
use crate::similarity::Scorer;
use crate::table::{EntityKey, Table, NORMALIZED_NAME, SEASON};
use crate::value::Value;

const PRIMARY: &str = "statistics";
const SECONDARY: &str = "valuation";

/// Align the statistics table against the valuation table.
///
/// Exact phase: left join on (NormalizedName, Season); a row whose value
/// column is filled is an exact match. Fuzzy phase: every other row is scored
/// against the same-season valuation rows and takes the best candidate if it
/// reaches `config.threshold`. Equal top scores keep the earlier candidate.
///
/// Columns present on both sides come out as `<name>_x` (statistics) and
/// `<name>_y` (valuation). Every primary row appears exactly once.
pub fn match_tables(
    primary: &Table,
    secondary: &Table,
    config: &MatchConfig,
    sink: &dyn EventSink,
) -> Result<MatchOutput, MergeError> {
    let p_name = primary.require_column(PRIMARY, NORMALIZED_NAME)?;
    let p_season = primary.require_column(PRIMARY, SEASON)?;
    let s_name = secondary.require_column(SECONDARY, NORMALIZED_NAME)?;
    let s_season = secondary.require_column(SECONDARY, SEASON)?;
    let s_value = secondary.require_column(SECONDARY, &config.value_column)?;

    let layout = Layout::new(primary, secondary, &[s_name, s_season]);
    // Join keys are not payload; a value column naming one has no destination
    let value_dst = layout.destination(s_value).ok_or_else(|| MergeError::MissingColumn {
        table: SECONDARY.into(),
        column: config.value_column.clone(),
    })?;

    let (exact_index, duplicates) = first_row_index(secondary, s_name, s_season);
    if duplicates > 0 {
        sink.emit(MergeEvent::DuplicateJoinKeys { table: SECONDARY.into(), duplicates });
    }

    let s_keys: Vec<EntityKey> = (0..secondary.len())
        .map(|r| EntityKey::of(secondary, r, s_name, s_season))
        .collect();
    let mut by_season: HashMap<&str, Vec<usize>> = HashMap::new();
    for (row, key) in s_keys.iter().enumerate() {
        by_season.entry(key.season.as_str()).or_default().push(row);
    }

    let p_keys: Vec<EntityKey> = (0..primary.len())
        .map(|r| EntityKey::of(primary, r, p_name, p_season))
        .collect();
    let scope_warnings = scope_check(&p_keys, &by_season, sink);

    // Exact phase
    let mut exact = Vec::new();
    let mut pending = Vec::new();
    for (row, key) in p_keys.iter().enumerate() {
        let mut merged = layout.primary_row(primary, row);
        let hit = exact_index.get(key).copied();
        if let Some(s_row) = hit {
            layout.fill_secondary(&mut merged, secondary, s_row);
        }
        if merged[value_dst].is_null() {
            pending.push((merged, key));
        } else {
            let record = MatchRecord {
                key: key.clone(),
                matched: true,
                method: MatchMethod::Exact,
                score: None,
                matched_row: hit,
            };
            exact.push((merged, record));
        }
    }

    // Fuzzy phase, one search per distinct key
    let mut cache: HashMap<&EntityKey, Option<(usize, u8)>> = HashMap::new();
    let mut fuzzy = Vec::with_capacity(pending.len());
    for (mut merged, key) in pending {
        let best = *cache.entry(key).or_insert_with(|| {
            let candidates = by_season.get(key.season.as_str()).map(Vec::as_slice).unwrap_or(&[]);
            let best = best_candidate(&key.name, candidates, &s_keys, config.scorer);
            report_candidate(key, best, &s_keys, config.threshold, sink);
            best
        });

        let record = match best {
            Some((s_row, score)) if score >= config.threshold => {
                layout.fill_secondary(&mut merged, secondary, s_row);
                MatchRecord {
                    key: key.clone(),
                    matched: true,
                    method: MatchMethod::Fuzzy,
                    score: Some(score),
                    matched_row: Some(s_row),
                }
            }
            _ => MatchRecord {
                key: key.clone(),
                matched: false,
                method: MatchMethod::None,
                score: None,
                matched_row: None,
            },
        };
        fuzzy.push((merged, record));
    }

    let mut table = Table::new(layout.columns);
    let mut records = Vec::with_capacity(primary.len());
    for (merged, record) in exact.into_iter().chain(fuzzy) {
        table.push_row(merged);
        records.push(record);
    }

    sink.emit(MergeEvent::StageFinished { stage: Stage::Match, rows: table.len() });
    Ok(MatchOutput { table, records, scope_warnings })
}

/// Highest-scoring candidate. Only a strictly higher score replaces the
/// current best, so ties keep the earlier row; a zero score never qualifies.
fn best_candidate(
    name: &str,
    candidates: &[usize],
    keys: &[EntityKey],
    scorer: Scorer,
) -> Option<(usize, u8)> {
    let mut best: Option<(usize, u8)> = None;
    for &row in candidates {
        let score = scorer.score(name, &keys[row].name);
        if score > best.map_or(0, |(_, s)| s) {
            best = Some((row, score));
        }
    }
    best
}

fn report_candidate(
    key: &EntityKey,
    best: Option<(usize, u8)>,
    keys: &[EntityKey],
    threshold: u8,
    sink: &dyn EventSink,
) {
    let Some((row, score)) = best else {
        return;
    };
    let (name, season, other) = (key.name.clone(), key.season.clone(), keys[row].name.clone());
    if score >= threshold {
        sink.emit(MergeEvent::FuzzyAccepted { name, matched: other, season, score });
    } else {
        sink.emit(MergeEvent::FuzzyRejected { name, best: other, season, score });
    }
}

/// One [`MergeError::InvalidScope`] per primary season with no secondary rows,
/// in first-seen order.
fn scope_check(
    keys: &[EntityKey],
    by_season: &HashMap<&str, Vec<usize>>,
    sink: &dyn EventSink,
) -> Vec<MergeError> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in keys {
        let season = key.season.as_str();
        if by_season.contains_key(season) {
            continue;
        }
        let n = counts.entry(season).or_insert(0);
        if *n == 0 {
            order.push(season);
        }
        *n += 1;
    }

    order
        .into_iter()
        .map(|season| {
            let rows = counts.get(season).copied().unwrap_or_default();
            sink.emit(MergeEvent::ScopeWarning { season: season.into(), rows });
            MergeError::InvalidScope { season: season.into(), rows }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Output layout
// ---------------------------------------------------------------------------

/// Output columns: primary columns, then secondary payload columns (all but
/// the join keys), with `_x` / `_y` on names both sides carry.
struct Layout {
    columns: Vec<String>,
    /// (secondary column, output column) per payload column.
    payload: Vec<(usize, usize)>,
}

impl Layout {
    fn new(primary: &Table, secondary: &Table, secondary_keys: &[usize]) -> Self {
        let payload_cols: Vec<usize> =
            (0..secondary.width()).filter(|c| !secondary_keys.contains(c)).collect();
        let shared: HashSet<&str> = payload_cols
            .iter()
            .map(|&c| secondary.columns()[c].as_str())
            .filter(|name| primary.has_column(name))
            .collect();

        let mut columns: Vec<String> = primary
            .columns()
            .iter()
            .map(|c| if shared.contains(c.as_str()) { format!("{c}_x") } else { c.clone() })
            .collect();

        let mut payload = Vec::with_capacity(payload_cols.len());
        for src in payload_cols {
            let name = &secondary.columns()[src];
            payload.push((src, columns.len()));
            columns.push(if shared.contains(name.as_str()) {
                format!("{name}_y")
            } else {
                name.clone()
            });
        }

        Self { columns, payload }
    }

    fn destination(&self, secondary_col: usize) -> Option<usize> {
        self.payload.iter().find(|(src, _)| *src == secondary_col).map(|(_, dst)| *dst)
    }

    fn primary_row(&self, primary: &Table, row: usize) -> Vec<Value> {
        let mut merged = Vec::with_capacity(self.columns.len());
        merged.extend_from_slice(&primary.rows()[row]);
        merged.resize(self.columns.len(), Value::Null);
        merged
    }

    fn fill_secondary(&self, merged: &mut [Value], secondary: &Table, row: usize) {
        for &(src, dst) in &self.payload {
            merged[dst] = secondary.value(row, src).clone();
        }
    }
}
