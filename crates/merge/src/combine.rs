//! Intra-source combination: season concatenation and the category join.

use std::collections::HashMap;

use crate::error::MergeError;
use crate::events::{EventSink, MergeEvent, Stage};
use crate::loader::CategoryTables;
use crate::normalize::normalize_name;
use crate::table::{EntityKey, Table, NORMALIZED_NAME, PLAYER, SEASON};
use crate::value::Value;

/// Row-wise union of one category's season tables.
pub fn concat_seasons(category: &CategoryTables) -> Table {
    Table::concat(&category.tables)
}

/// Add (or refresh) the `NormalizedName` join key from `Player`.
pub fn with_normalized_name(mut table: Table, table_name: &str) -> Result<Table, MergeError> {
    let player = table.require_column(table_name, PLAYER)?;
    let key = table.add_column(NORMALIZED_NAME);
    for row in 0..table.len() {
        let name = match table.value(row, player) {
            Value::Null => Value::Null,
            v => Value::Text(normalize_name(&v.to_text())),
        };
        table.set(row, key, name);
    }
    Ok(table)
}

/// Left-join every category onto `base` by (NormalizedName, Season), in the
/// order given. Base rows are all kept; an incoming column whose name is
/// already taken gets a `_<category>` suffix.
pub fn join_categories(
    categories: &[CategoryTables],
    base: &str,
    sink: &dyn EventSink,
) -> Result<Table, MergeError> {
    let base_tables = categories
        .iter()
        .find(|c| c.category == base)
        .ok_or_else(|| MergeError::MissingBaseTable { base: base.into() })?;

    let mut wide = with_normalized_name(concat_seasons(base_tables), base)?;
    let wide_name = wide.require_column(base, NORMALIZED_NAME)?;
    let wide_season = wide.require_column(base, SEASON)?;
    let wide_keys: Vec<EntityKey> = (0..wide.len())
        .map(|r| EntityKey::of(&wide, r, wide_name, wide_season))
        .collect();

    for category in categories.iter().filter(|c| c.category != base) {
        let incoming = with_normalized_name(concat_seasons(category), &category.category)?;
        left_join(&mut wide, &wide_keys, &incoming, &category.category, sink)?;
    }

    sink.emit(MergeEvent::StageFinished { stage: Stage::Combine, rows: wide.len() });
    Ok(wide)
}

fn left_join(
    wide: &mut Table,
    wide_keys: &[EntityKey],
    incoming: &Table,
    category: &str,
    sink: &dyn EventSink,
) -> Result<(), MergeError> {
    let name_col = incoming.require_column(category, NORMALIZED_NAME)?;
    let season_col = incoming.require_column(category, SEASON)?;

    let (index, duplicates) = first_row_index(incoming, name_col, season_col);
    if duplicates > 0 {
        sink.emit(MergeEvent::DuplicateJoinKeys { table: category.into(), duplicates });
    }

    // (source column, destination column) for every non-key column
    let mut mapping = Vec::new();
    for (src, name) in incoming.columns().iter().enumerate() {
        if src == name_col || src == season_col {
            continue;
        }
        let target = if wide.has_column(name) {
            suffixed_name(wide, name, category)
        } else {
            name.clone()
        };
        mapping.push((src, wide.add_column(&target)));
    }

    for (row, key) in wide_keys.iter().enumerate() {
        if let Some(&src_row) = index.get(key) {
            for &(src, dst) in &mapping {
                wide.set(row, dst, incoming.value(src_row, src).clone());
            }
        }
    }
    Ok(())
}

/// First row per key, plus how many rows were shadowed by an earlier one.
pub(crate) fn first_row_index(
    table: &Table,
    name_col: usize,
    season_col: usize,
) -> (HashMap<EntityKey, usize>, usize) {
    let mut index = HashMap::new();
    let mut duplicates = 0;
    for row in 0..table.len() {
        let key = EntityKey::of(table, row, name_col, season_col);
        if index.contains_key(&key) {
            duplicates += 1;
        } else {
            index.insert(key, row);
        }
    }
    (index, duplicates)
}

fn suffixed_name(table: &Table, name: &str, category: &str) -> String {
    let candidate = format!("{name}_{category}");
    if !table.has_column(&candidate) {
        return candidate;
    }
    (1..)
        .map(|n| format!("{candidate}_{n}"))
        .find(|c| !table.has_column(c))
        .unwrap_or(candidate)
}
