//! Table loading and per-source cleaning.
//!
//! Where tables come from is behind [`TableSource`]; the pipeline only sees
//! already-resolved tables. [`CsvDirSource`] reads the on-disk layout the
//! scrapers write, [`MemorySource`] serves tables built in code.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::config::PipelineConfig;
use crate::csv_io::read_csv;
use crate::error::MergeError;
use crate::events::{EventSink, MergeEvent, Stage};
use crate::normalize::{
    clean_header, convert_season_format, monetary_cell, normalize_name, parse_string_literals,
};
use crate::table::{Table, NORMALIZED_NAME, PLAYER, SEASON};
use crate::value::Value;

/// Column holding the raw valuation string (`"€1.5m"`).
pub const RAW_MARKET_VALUE: &str = "Market value";

/// Columns kept from the valuation source, in output order, when present.
const VALUATION_FIELDS: [&str; 4] = ["Age", "Position", "Nationality", "Current club"];

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Capability to fetch raw tables.
pub trait TableSource {
    /// Raw statistics table for one (category, season). A table that does not
    /// exist is reported as [`MergeError::MissingFile`].
    fn load_category_table(&self, category: &str, season: &str) -> Result<Table, MergeError>;

    /// Raw valuation table covering every season.
    fn load_valuation_table(&self) -> Result<Table, MergeError>;
}

/// CSV files on disk: `<stats_dir>/<file_pattern>` per (category, season)
/// and a single valuation file.
#[derive(Debug, Clone)]
pub struct CsvDirSource {
    pub stats_dir: PathBuf,
    pub valuation_file: PathBuf,
    pub file_pattern: String,
    pub header_row: usize,
}

impl CsvDirSource {
    /// Resolve the config's relative paths against `base_dir` (the config file's directory).
    pub fn from_config(config: &PipelineConfig, base_dir: &Path) -> Self {
        Self {
            stats_dir: base_dir.join(&config.stats.dir),
            valuation_file: base_dir.join(&config.valuation.file),
            file_pattern: config.stats.file_pattern.clone(),
            header_row: config.stats.header_row,
        }
    }

    fn category_path(&self, category: &str, season: &str) -> PathBuf {
        self.stats_dir.join(
            self.file_pattern
                .replace("{category}", category)
                .replace("{season}", season),
        )
    }
}

impl TableSource for CsvDirSource {
    fn load_category_table(&self, category: &str, season: &str) -> Result<Table, MergeError> {
        let path = self.category_path(category, season);
        if !path.is_file() {
            return Err(MergeError::MissingFile {
                category: category.into(),
                season: season.into(),
                path: path.display().to_string(),
            });
        }
        read_csv_file(&path, self.header_row)
    }

    fn load_valuation_table(&self) -> Result<Table, MergeError> {
        read_csv_file(&self.valuation_file, 0)
    }
}

/// Ragged rows are reported against the file they came from.
fn read_csv_file(path: &Path, header_row: usize) -> Result<Table, MergeError> {
    let file = File::open(path)
        .map_err(|e| MergeError::Io(format!("cannot read {}: {e}", path.display())))?;
    read_csv(file, header_row).map_err(|e| match e {
        MergeError::RaggedRow { row, expected, found, .. } => MergeError::RaggedRow {
            table: path.display().to_string(),
            row,
            expected,
            found,
        },
        other => other,
    })
}

/// Tables held in memory, keyed by (category, season).
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: HashMap<(String, String), Table>,
    valuation: Option<Table>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category_table(mut self, category: &str, season: &str, table: Table) -> Self {
        self.tables.insert((category.into(), season.into()), table);
        self
    }

    pub fn with_valuation(mut self, table: Table) -> Self {
        self.valuation = Some(table);
        self
    }
}

impl TableSource for MemorySource {
    fn load_category_table(&self, category: &str, season: &str) -> Result<Table, MergeError> {
        self.tables
            .get(&(category.to_string(), season.to_string()))
            .cloned()
            .ok_or_else(|| MergeError::MissingFile {
                category: category.into(),
                season: season.into(),
                path: format!("memory:{category}/{season}"),
            })
    }

    fn load_valuation_table(&self) -> Result<Table, MergeError> {
        self.valuation
            .clone()
            .ok_or_else(|| MergeError::NoData { category: "valuation".into() })
    }
}

// ---------------------------------------------------------------------------
// Statistics categories
// ---------------------------------------------------------------------------

/// Cleaned, season-tagged tables of one statistics category.
#[derive(Debug, Clone)]
pub struct CategoryTables {
    pub category: String,
    pub tables: Vec<Table>,
}

impl CategoryTables {
    pub fn rows(&self) -> usize {
        self.tables.iter().map(Table::len).sum()
    }
}

/// Load every season of one category. Missing seasons are reported and
/// skipped; a category with no table at all is [`MergeError::NoData`].
pub fn load_category(
    source: &dyn TableSource,
    category: &str,
    seasons: &[String],
    sink: &dyn EventSink,
) -> Result<CategoryTables, MergeError> {
    let mut tables = Vec::new();
    for season in seasons {
        match source.load_category_table(category, season) {
            Ok(raw) => {
                let cleaned = clean_stats_table(category, raw, sink);
                tables.push(tag_season(cleaned, season));
            }
            Err(MergeError::MissingFile { category, season, path }) => {
                sink.emit(MergeEvent::FileMissing { category, season, path });
            }
            Err(e) => return Err(e),
        }
    }

    if tables.is_empty() {
        return Err(MergeError::NoData { category: category.into() });
    }

    let loaded = CategoryTables { category: category.into(), tables };
    sink.emit(MergeEvent::CategoryLoaded {
        category: category.into(),
        seasons: loaded.tables.len(),
        rows: loaded.rows(),
    });
    Ok(loaded)
}

/// Load all categories in order. The first category without data aborts.
pub fn load_categories(
    source: &dyn TableSource,
    categories: &[String],
    seasons: &[String],
    sink: &dyn EventSink,
) -> Result<Vec<CategoryTables>, MergeError> {
    let loaded = categories
        .iter()
        .map(|c| load_category(source, c, seasons, sink))
        .collect::<Result<Vec<_>, _>>()?;
    sink.emit(MergeEvent::StageFinished {
        stage: Stage::Load,
        rows: loaded.iter().map(CategoryTables::rows).sum(),
    });
    Ok(loaded)
}

/// Normalize a raw statistics table: clean and de-duplicate headers, drop the
/// noisy `Matches` link column when it only repeats its own header.
pub fn clean_stats_table(category: &str, mut table: Table, sink: &dyn EventSink) -> Table {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for i in 0..table.width() {
        let base = clean_header(&table.columns()[i]);
        let n = seen.entry(base.clone()).or_insert(0);
        let name = if *n == 0 { base } else { format!("{base}.{n}") };
        *n += 1;
        table.rename_at(i, &name);
    }

    if let Some(col) = table.column_index("Matches") {
        let noisy = table
            .column_values(col)
            .all(|v| v.is_null() || v.as_str() == Some("Matches"));
        if noisy {
            table.drop_column("Matches");
        } else {
            sink.emit(MergeEvent::UnexpectedMatchesColumn { category: category.into() });
        }
    }
    table
}

/// Set every row's season, adding the column when absent.
fn tag_season(mut table: Table, season: &str) -> Table {
    let col = table.add_column(SEASON);
    let season = convert_season_format(season);
    for row in 0..table.len() {
        table.set(row, col, Value::Text(season.clone()));
    }
    table
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

/// Clean the raw valuation table into the secondary matching table:
/// `NormalizedName`, `Season` (compact), the value column, then whichever of
/// Age, Position, Nationality and Current club exist.
///
/// Accepts both the scraper's raw shape (`Player` holding a
/// `('Name', 'Position')` literal, `Nat.`, `Market value`) and an
/// already-cleaned shape with `Name` and a numeric value column.
pub fn clean_valuation_table(
    mut table: Table,
    value_column: &str,
    sink: &dyn EventSink,
) -> Result<Table, MergeError> {
    const TABLE: &str = "valuation";

    if table.has_column(PLAYER) && !table.has_column("Name") {
        unpack_player_literal(&mut table);
    }
    table.rename_column("Nat.", "Nationality");

    if let Some(col) = table.column_index("Nationality") {
        for row in 0..table.len() {
            let first = table
                .value(row, col)
                .as_str()
                .and_then(parse_string_literals)
                .map(|list| list.into_iter().next().into());
            if let Some(first) = first {
                table.set(row, col, first);
            }
        }
    }

    let raw_col = table.column_index(RAW_MARKET_VALUE);
    let value_col = match (raw_col, table.column_index(value_column)) {
        (Some(raw), _) => {
            let dst = table.add_column(value_column);
            for row in 0..table.len() {
                let parsed = monetary_cell(table.value(row, raw));
                table.set(row, dst, parsed);
            }
            dst
        }
        (None, Some(dst)) => {
            for row in 0..table.len() {
                let parsed = monetary_cell(table.value(row, dst));
                table.set(row, dst, parsed);
            }
            dst
        }
        (None, None) => {
            return Err(MergeError::MissingColumn {
                table: TABLE.into(),
                column: RAW_MARKET_VALUE.into(),
            })
        }
    };

    let season_col = table.require_column(TABLE, SEASON)?;
    let name_col = table.require_column(TABLE, "Name")?;
    let key_col = table.add_column(NORMALIZED_NAME);
    for row in 0..table.len() {
        let season = match table.value(row, season_col) {
            Value::Null => Value::Null,
            v => Value::Text(convert_season_format(v.to_text().trim())),
        };
        table.set(row, season_col, season);
        let key = match table.value(row, name_col) {
            Value::Null => Value::Null,
            v => Value::Text(normalize_name(&v.to_text())),
        };
        table.set(row, key_col, key);
    }

    let before = table.len();
    table.retain_rows(|r| {
        !r.values()[season_col].is_null()
            && !r.values()[value_col].is_null()
            && !r.values()[key_col].is_null()
    });
    if table.len() < before {
        sink.emit(MergeEvent::ValuationRowsDropped {
            dropped: before - table.len(),
            kept: table.len(),
        });
    }

    let mut order = vec![key_col, season_col, value_col];
    order.extend(VALUATION_FIELDS.iter().filter_map(|f| table.column_index(f)));
    Ok(table.select_columns(&order))
}

/// Split `('Name', 'Position')` literals in `Player` into `Name` and `Position`.
/// Plain names are copied into `Name` as they are.
fn unpack_player_literal(table: &mut Table) {
    let Some(player_col) = table.column_index(PLAYER) else {
        return;
    };
    let name_col = table.add_column("Name");
    let position_col = table.add_column("Position");
    for row in 0..table.len() {
        let raw = table.value(row, player_col).clone();
        match raw.as_str().and_then(parse_string_literals) {
            Some(parts) => {
                let mut parts = parts.into_iter();
                table.set(row, name_col, parts.next().into());
                if let Some(position) = parts.next() {
                    table.set(row, position_col, Value::Text(position));
                }
            }
            None => table.set(row, name_col, raw),
        }
    }
}
