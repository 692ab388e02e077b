use std::cmp::Ordering;

use serde::Serialize;

use crate::error::MergeError;
use crate::value::Value;

/// Player display name, present in both sources after cleaning.
pub const PLAYER: &str = "Player";
/// Season code, compact encoding once it has passed the loader.
pub const SEASON: &str = "Season";
/// Internal join key. Never part of the output schema.
pub const NORMALIZED_NAME: &str = "NormalizedName";
/// Canonical age column.
pub const AGE: &str = "Age";
/// Parsed market value in euros.
pub const MARKET_VALUE: &str = "MarketValueEuro";

static NULL: Value = Value::Null;

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Header plus rows of cells. Every row is exactly as wide as the header;
/// the field set is dynamic per table and checked at stage boundaries.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Build a table from pre-split rows, rejecting rows whose width differs from the header.
    pub fn from_rows(
        name: &str,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, MergeError> {
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(MergeError::RaggedRow {
                table: name.into(),
                row: i,
                expected: columns.len(),
                found: row.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Index of a column the caller cannot proceed without.
    pub fn require_column(&self, table: &str, name: &str) -> Result<usize, MergeError> {
        self.column_index(name).ok_or_else(|| MergeError::MissingColumn {
            table: table.into(),
            column: name.into(),
        })
    }

    /// Append a row, padding with nulls (or truncating) to the header width.
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn value(&self, row: usize, col: usize) -> &Value {
        &self.rows[row][col]
    }

    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        self.column_index(name).map(|c| &self.rows[row][c])
    }

    pub fn set(&mut self, row: usize, col: usize, value: Value) {
        self.rows[row][col] = value;
    }

    pub fn row(&self, i: usize) -> Row<'_> {
        Row { columns: &self.columns, values: &self.rows[i] }
    }

    pub fn iter(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|values| Row { columns: &self.columns, values })
    }

    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |r| &r[col])
    }

    /// Add a null-filled column, or return the index of the existing one.
    pub fn add_column(&mut self, name: &str) -> usize {
        if let Some(i) = self.column_index(name) {
            return i;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        self.columns.len() - 1
    }

    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(i) => {
                self.columns.remove(i);
                for row in &mut self.rows {
                    row.remove(i);
                }
                true
            }
            None => false,
        }
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(i) => {
                self.columns[i] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Rename the column at `index`, whatever its current name.
    pub fn rename_at(&mut self, index: usize, name: &str) {
        self.columns[index] = name.to_string();
    }

    /// Keep only the columns for which `keep(index, name)` holds, preserving order.
    pub fn retain_columns(&mut self, mut keep: impl FnMut(usize, &str) -> bool) {
        let kept: Vec<usize> = (0..self.columns.len())
            .filter(|&i| keep(i, &self.columns[i]))
            .collect();
        if kept.len() == self.columns.len() {
            return;
        }
        *self = self.select_columns(&kept);
    }

    /// New table with the given column indices, in the given order.
    pub fn select_columns(&self, order: &[usize]) -> Table {
        Table {
            columns: order.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|r| order.iter().map(|&i| r[i].clone()).collect())
                .collect(),
        }
    }

    pub fn retain_rows(&mut self, mut keep: impl FnMut(Row<'_>) -> bool) {
        let columns = &self.columns;
        self.rows.retain(|values| keep(Row { columns, values }));
    }

    /// Row-wise union. Columns are the union in first-seen order; cells a
    /// table does not have become null.
    pub fn concat(tables: &[Table]) -> Table {
        let mut out = Table::default();
        for t in tables {
            for c in &t.columns {
                if !out.has_column(c) {
                    out.columns.push(c.clone());
                }
            }
        }
        for t in tables {
            let mapping: Vec<usize> = t
                .columns
                .iter()
                .map(|c| out.column_index(c).unwrap_or_default())
                .collect();
            for r in &t.rows {
                let mut row = vec![Value::Null; out.columns.len()];
                for (src, &dst) in mapping.iter().enumerate() {
                    row[dst] = r[src].clone();
                }
                out.rows.push(row);
            }
        }
        out
    }

    /// Stable ascending sort on the text of the named columns. Nulls sort last;
    /// absent columns are ignored.
    pub fn sort_by_columns(&mut self, names: &[&str]) {
        let idx: Vec<usize> = names.iter().filter_map(|n| self.column_index(n)).collect();
        self.rows.sort_by(|a, b| {
            for &i in &idx {
                let ord = compare_cells(&a[i], &b[i]);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }
}

fn compare_cells(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.to_text().cmp(&b.to_text()),
    }
}

// ---------------------------------------------------------------------------
// Row view
// ---------------------------------------------------------------------------

/// Borrowed view of one row with name-based access.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> Row<'a> {
    /// Cell by column name; missing columns read as null.
    pub fn get(&self, name: &str) -> &'a Value {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| &self.values[i])
            .unwrap_or(&NULL)
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }
}

// ---------------------------------------------------------------------------
// Entity key
// ---------------------------------------------------------------------------

/// Join key shared by every stage: normalized player name plus compact season.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityKey {
    pub name: String,
    pub season: String,
}

impl EntityKey {
    /// Key for row `row`, given the indices of the name and season columns.
    /// Seasons are normalized to compact encoding here, so both sides of a
    /// join compare in the same encoding regardless of what the loader did.
    pub fn of(table: &Table, row: usize, name_col: usize, season_col: usize) -> Self {
        Self {
            name: table.value(row, name_col).to_text(),
            season: crate::normalize::convert_season_format(
                table.value(row, season_col).to_text().trim(),
            ),
        }
    }
}
