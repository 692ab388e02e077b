use std::collections::HashSet;

use serde::Deserialize;

use crate::error::MergeError;
use crate::normalize::season_code;
use crate::similarity::Scorer;
use crate::table::{MARKET_VALUE, NORMALIZED_NAME, SEASON};

/// Category every other statistics category is joined onto.
pub const DEFAULT_BASE_CATEGORY: &str = "player_stats";
/// Fuzzy acceptance threshold (0-100).
pub const DEFAULT_THRESHOLD: u8 = 85;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    /// Seasons to load. Any encoding is accepted; normalized to compact on parse.
    pub seasons: Vec<String>,
    pub stats: StatsConfig,
    pub valuation: ValuationConfig,
    #[serde(default)]
    pub matching: MatchConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub options: PipelineOptions,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Per-season, per-category statistics tables.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_dir")]
    pub dir: String,
    pub categories: Vec<String>,
    #[serde(default = "default_base_category")]
    pub base_category: String,
    /// File name template; `{category}` and `{season}` are substituted.
    #[serde(default = "default_file_pattern")]
    pub file_pattern: String,
    /// Zero-based line holding the header. Raw exports carry a grouping row above it.
    #[serde(default)]
    pub header_row: usize,
}

impl StatsConfig {
    pub fn file_name(&self, category: &str, season: &str) -> String {
        self.file_pattern
            .replace("{category}", category)
            .replace("{season}", season)
    }
}

/// Market valuation table, one file covering every season.
#[derive(Debug, Clone, Deserialize)]
pub struct ValuationConfig {
    pub file: String,
    #[serde(default = "default_value_column")]
    pub value_column: String,
}

fn default_dir() -> String {
    ".".into()
}

fn default_base_category() -> String {
    DEFAULT_BASE_CATEGORY.into()
}

fn default_file_pattern() -> String {
    "df_{category}_{season}.csv".into()
}

fn default_value_column() -> String {
    MARKET_VALUE.into()
}

// ---------------------------------------------------------------------------
// Matching + Reconcile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub threshold: u8,
    pub scorer: Scorer,
    /// Secondary column whose presence marks a row as matched.
    #[serde(skip)]
    pub value_column: String,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            scorer: Scorer::default(),
            value_column: MARKET_VALUE.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Known-redundant columns, dropped by exact name.
    pub drop_columns: Vec<String>,
    /// Leading columns of the output, in order, when present.
    pub priority_columns: Vec<String>,
    /// Value written for an unparseable age. `None` leaves the cell null.
    pub age_fallback: Option<i64>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            drop_columns: vec!["Rk".into(), "Matches".into(), "Nationality_y".into()],
            priority_columns: ["Player", "Season", "Nation", "Nationality", "Pos", "Position"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            age_fallback: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Options + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    pub remove_synthetic_rows: bool,
    pub only_rows_with_valuation: bool,
    pub run_diagnostics: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            remove_synthetic_rows: false,
            only_rows_with_valuation: false,
            run_diagnostics: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub csv: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, MergeError> {
        let mut config: PipelineConfig =
            toml::from_str(input).map_err(|e| MergeError::ConfigParse(e.to_string()))?;
        config.seasons = config.seasons.iter().map(|s| season_code(s)).collect();
        config.matching.value_column = config.valuation.value_column.clone();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MergeError> {
        if self.seasons.is_empty() {
            return Err(MergeError::ConfigValidation("at least one season is required".into()));
        }
        let mut seen_seasons = HashSet::new();
        for season in &self.seasons {
            if season.len() != 4 || !season.bytes().all(|b| b.is_ascii_digit()) {
                return Err(MergeError::ConfigValidation(format!(
                    "season '{season}' is not a 4-digit season code"
                )));
            }
            if !seen_seasons.insert(season.as_str()) {
                return Err(MergeError::ConfigValidation(format!(
                    "season '{season}' is listed twice"
                )));
            }
        }

        if self.stats.categories.is_empty() {
            return Err(MergeError::ConfigValidation(
                "at least one statistics category is required".into(),
            ));
        }
        let mut seen = HashSet::new();
        for category in &self.stats.categories {
            if !seen.insert(category.as_str()) {
                return Err(MergeError::ConfigValidation(format!(
                    "category '{category}' is listed twice"
                )));
            }
        }
        if !seen.contains(self.stats.base_category.as_str()) {
            return Err(MergeError::ConfigValidation(format!(
                "base category '{}' is not in categories",
                self.stats.base_category
            )));
        }
        for placeholder in ["{category}", "{season}"] {
            if !self.stats.file_pattern.contains(placeholder) {
                return Err(MergeError::ConfigValidation(format!(
                    "file_pattern must contain {placeholder}"
                )));
            }
        }

        if self.matching.threshold > 100 {
            return Err(MergeError::ConfigValidation(format!(
                "threshold must be 0-100, got {}",
                self.matching.threshold
            )));
        }
        if self.valuation.value_column.trim().is_empty() {
            return Err(MergeError::ConfigValidation("value_column must not be empty".into()));
        }
        if [SEASON, NORMALIZED_NAME].contains(&self.valuation.value_column.as_str()) {
            return Err(MergeError::ConfigValidation(format!(
                "value_column '{}' is a join key",
                self.valuation.value_column
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
