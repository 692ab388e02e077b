//! Column reconciliation after the joins.
//!
//! The category join and the cross-source match leave several variants of
//! the same field behind (`Age`, `Age_x`, `Age_y`, `Age_player_passing`).
//! [`reconcile`] collapses them to one canonical column each, fixes column
//! order and row order, and removes the internal join key. Running it on
//! its own output changes nothing.

use std::collections::HashMap;

use crate::config::ReconcileConfig;
use crate::events::{EventSink, MergeEvent, Stage};
use crate::normalize::parse_age;
use crate::table::{Table, AGE, NORMALIZED_NAME, PLAYER, SEASON};
use crate::value::Value;

pub fn reconcile(
    mut table: Table,
    config: &ReconcileConfig,
    categories: &[String],
    sink: &dyn EventSink,
) -> Table {
    let suffixes = category_suffixes(categories);

    drop_configured(&mut table, &config.drop_columns, &suffixes, sink);
    collapse_variants(&mut table, &suffixes, sink);
    cast_age(&mut table, config.age_fallback);
    collapse_category_duplicates(&mut table, &suffixes, sink);
    reorder_columns(&mut table, &config.priority_columns);
    table.sort_by_columns(&[PLAYER, SEASON]);
    table.drop_column(NORMALIZED_NAME);

    sink.emit(MergeEvent::StageFinished { stage: Stage::Reconcile, rows: table.len() });
    table
}

/// `_<category>` suffixes, longest first so `_player_passing_types` is
/// stripped before `_player_passing`.
fn category_suffixes(categories: &[String]) -> Vec<String> {
    let mut suffixes: Vec<String> = categories.iter().map(|c| format!("_{c}")).collect();
    suffixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    suffixes
}

/// Drop configured columns by exact name, together with their
/// `_<category>` copies from the category join.
fn drop_configured(table: &mut Table, names: &[String], suffixes: &[String], sink: &dyn EventSink) {
    let listed = |name: &str| names.iter().any(|n| n == name);
    let doomed = |column: &str| match split_variant(column, suffixes) {
        (base, Variant::Category) => listed(column) || listed(base),
        _ => listed(column),
    };
    let dropped: Vec<String> =
        table.columns().iter().filter(|c| doomed(c.as_str())).cloned().collect();
    for column in dropped {
        table.drop_column(&column);
        sink.emit(MergeEvent::ColumnDropped { column });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    Bare,
    Left,
    Right,
    Category,
}

/// Field name and variant kind of a column.
fn split_variant<'a>(name: &'a str, suffixes: &[String]) -> (&'a str, Variant) {
    if let Some(base) = name.strip_suffix("_x").filter(|b| !b.is_empty()) {
        return (base, Variant::Left);
    }
    if let Some(base) = name.strip_suffix("_y").filter(|b| !b.is_empty()) {
        return (base, Variant::Right);
    }
    for suffix in suffixes {
        if let Some(base) = name.strip_suffix(suffix.as_str()).filter(|b| !b.is_empty()) {
            return (base, Variant::Category);
        }
    }
    (name, Variant::Bare)
}

/// For every field with a bare or `_x` column: keep the bare one (else `_x`),
/// drop the other variants and give the survivor the bare name. Fields with
/// neither are left for [`collapse_category_duplicates`].
fn collapse_variants(table: &mut Table, suffixes: &[String], sink: &dyn EventSink) {
    let mut groups: HashMap<String, Vec<(usize, Variant)>> = HashMap::new();
    for (i, name) in table.columns().iter().enumerate() {
        let (base, variant) = split_variant(name, suffixes);
        groups.entry(base.to_string()).or_default().push((i, variant));
    }

    let mut keep_as: HashMap<usize, String> = HashMap::new();
    let mut dropped: Vec<usize> = Vec::new();
    for (base, members) in &groups {
        let kept = members
            .iter()
            .find(|(_, v)| *v == Variant::Bare)
            .or_else(|| members.iter().find(|(_, v)| *v == Variant::Left));
        let Some(&(kept, _)) = kept else {
            continue;
        };
        keep_as.insert(kept, base.clone());
        dropped.extend(members.iter().map(|(i, _)| *i).filter(|&i| i != kept));
    }

    dropped.sort_unstable();
    for &i in &dropped {
        sink.emit(MergeEvent::ColumnDropped { column: table.columns()[i].clone() });
    }
    for (&i, name) in &keep_as {
        table.rename_at(i, name);
    }
    table.retain_columns(|i, _| dropped.binary_search(&i).is_err());
}

/// Age becomes a whole number. Unparseable or missing ages become
/// `fallback`, or stay null without one.
fn cast_age(table: &mut Table, fallback: Option<i64>) {
    let Some(col) = table.column_index(AGE) else {
        return;
    };
    for row in 0..table.len() {
        let years = match table.value(row, col) {
            Value::Number(n) if n.is_finite() => Some(n.trunc() as i64),
            Value::Number(_) | Value::Null => None,
            Value::Text(s) => parse_age(s),
        };
        let cell = years.or(fallback).map(|y| Value::Number(y as f64)).unwrap_or_default();
        table.set(row, col, cell);
    }
}

/// Remaining `<field>_<category>` columns: keep the earliest per field and
/// rename it to the field name when no column already claims that field.
fn collapse_category_duplicates(table: &mut Table, suffixes: &[String], sink: &dyn EventSink) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut dropped: Vec<usize> = Vec::new();
    for (i, name) in table.columns().iter().enumerate() {
        let (base, variant) = split_variant(name, suffixes);
        if variant != Variant::Category {
            continue;
        }
        if seen.contains_key(base) {
            dropped.push(i);
        } else {
            seen.insert(base.to_string(), i);
        }
    }

    let claimed = |table: &Table, base: &str| {
        [base.to_string(), format!("{base}_x"), format!("{base}_y")]
            .iter()
            .any(|n| table.has_column(n))
    };
    let renames: Vec<(usize, String)> = seen
        .into_iter()
        .filter(|(base, _)| !claimed(&*table, base.as_str()))
        .map(|(base, i)| (i, base))
        .collect();

    for &i in &dropped {
        sink.emit(MergeEvent::ColumnDropped { column: table.columns()[i].clone() });
    }
    for (i, name) in renames {
        table.rename_at(i, &name);
    }
    table.retain_columns(|i, _| !dropped.contains(&i));
}

/// Priority columns first (those present, in the given order), then the rest
/// in their current relative order.
fn reorder_columns(table: &mut Table, priority: &[String]) {
    let mut order: Vec<usize> = Vec::with_capacity(table.width());
    for i in priority.iter().filter_map(|p| table.column_index(p)) {
        if !order.contains(&i) {
            order.push(i);
        }
    }
    let rest: Vec<usize> = (0..table.width()).filter(|i| !order.contains(i)).collect();
    order.extend(rest);
    if order.iter().copied().eq(0..table.width()) {
        return;
    }
    *table = table.select_columns(&order);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventCollector, NullSink};

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut t = Table::new(columns.iter().map(|c| c.to_string()).collect());
        for r in rows {
            t.push_row(r.iter().map(|v| Value::from_field(v)).collect());
        }
        t
    }

    fn categories() -> Vec<String> {
        ["player_stats", "player_passing", "player_passing_types", "player_gca"]
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    fn merged() -> Table {
        table(
            &[
                "Rk", "Player", "Nation", "Pos", "Age_x", "Season", "NormalizedName",
                "Player_player_passing", "Age_player_passing", "Cmp", "Cmp_player_passing_types",
                "Att_player_passing", "Att_player_passing_types", "MarketValueEuro", "Age_y",
                "Position", "Nationality", "Current club",
            ],
            &[
                &[
                    "3", "Pepelu", "es ESP", "MF", "25-031", "2324", "pepelu", "Pepelu", "25",
                    "812", "790", "900", "901", "12000000", "25", "Defensive Midfield", "Spain",
                    "Valencia CF",
                ],
                &[
                    "1", "Hugo Duro", "es ESP", "FW", "", "2324", "hugo duro", "Hugo Duro", "24",
                    "120", "118", "150", "151", "", "", "", "", "",
                ],
                &[
                    "2", "Pepelu", "es ESP", "MF", "24-020", "2223", "pepelu", "Pepelu", "24",
                    "700", "690", "800", "801", "8000000", "24", "Defensive Midfield", "Spain",
                    "Levante UD",
                ],
            ],
        )
    }

    #[test]
    fn collapses_variants_and_orders_output() {
        let sink = EventCollector::new();
        let out = reconcile(merged(), &ReconcileConfig::default(), &categories(), &sink);

        assert_eq!(
            out.columns(),
            &[
                "Player", "Season", "Nation", "Nationality", "Pos", "Position", "Age", "Cmp",
                "Att", "MarketValueEuro", "Current club",
            ]
        );
        let players: Vec<(String, String)> = out
            .iter()
            .map(|r| (r.get("Player").to_text(), r.get("Season").to_text()))
            .collect();
        assert_eq!(
            players,
            vec![
                ("Hugo Duro".to_string(), "2324".to_string()),
                ("Pepelu".to_string(), "2223".to_string()),
                ("Pepelu".to_string(), "2324".to_string()),
            ]
        );
        // earliest category column wins for a field without a bare column
        assert_eq!(out.row(0).get("Att").to_text(), "150");
        assert!(sink.events().contains(&MergeEvent::ColumnDropped { column: "Rk".into() }));
        assert!(sink.events().contains(&MergeEvent::ColumnDropped { column: "Age_y".into() }));
    }

    #[test]
    fn age_is_whole_number_or_null() {
        let out = reconcile(merged(), &ReconcileConfig::default(), &categories(), &NullSink);
        assert_eq!(out.row(0).get("Age"), &Value::Null);
        assert_eq!(out.row(1).get("Age"), &Value::Number(24.0));
        assert_eq!(out.row(2).get("Age"), &Value::Number(25.0));
    }

    #[test]
    fn age_fallback_replaces_unparseable() {
        let config = ReconcileConfig { age_fallback: Some(-1), ..ReconcileConfig::default() };
        let out = reconcile(merged(), &config, &categories(), &NullSink);
        assert_eq!(out.row(0).get("Age"), &Value::Number(-1.0));
    }

    #[test]
    fn join_key_never_reaches_output() {
        let out = reconcile(merged(), &ReconcileConfig::default(), &categories(), &NullSink);
        assert!(!out.has_column("NormalizedName"));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let once = reconcile(merged(), &ReconcileConfig::default(), &categories(), &NullSink);
        let twice = reconcile(once.clone(), &ReconcileConfig::default(), &categories(), &NullSink);
        assert_eq!(once, twice);
    }

    #[test]
    fn right_only_variant_is_left_alone() {
        let t = table(&["Player", "Season", "Club_y"], &[&["Pepelu", "2324", "VCF"]]);
        let out = reconcile(t, &ReconcileConfig::default(), &categories(), &NullSink);
        assert_eq!(out.columns(), &["Player", "Season", "Club_y"]);
    }

    #[test]
    fn category_suffix_prefers_longest() {
        let suffixes = category_suffixes(&categories());
        assert_eq!(
            split_variant("Cmp_player_passing_types", &suffixes),
            ("Cmp", Variant::Category)
        );
        assert_eq!(split_variant("Age_x", &suffixes), ("Age", Variant::Left));
        assert_eq!(split_variant("xG", &suffixes), ("xG", Variant::Bare));
    }
}
