use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum MergeError {
    /// A (category, season) input file does not exist. Recoverable: logged, loading continues.
    MissingFile { category: String, season: String, path: String },
    /// No input at all for a requested category.
    NoData { category: String },
    /// The base category is absent from the combiner input.
    MissingBaseTable { base: String },
    /// A season present in the primary table has no secondary rows.
    /// Non-fatal: reported alongside the match output.
    InvalidScope { season: String, rows: usize },
    /// Missing required column in a table.
    MissingColumn { table: String, column: String },
    /// A row's width does not match the table header.
    RaggedRow { table: String, row: usize, expected: usize, found: usize },
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, unknown base category, etc.).
    ConfigValidation(String),
    /// CSV decode / encode error.
    Csv(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFile { category, season, path } => {
                write!(f, "missing file for '{category}' season {season}: {path}")
            }
            Self::NoData { category } => write!(f, "no data found for category '{category}'"),
            Self::MissingBaseTable { base } => {
                write!(f, "base category '{base}' is required but was not loaded")
            }
            Self::InvalidScope { season, rows } => {
                write!(f, "season {season}: {rows} primary row(s) but no secondary rows")
            }
            Self::MissingColumn { table, column } => {
                write!(f, "table '{table}': missing column '{column}'")
            }
            Self::RaggedRow { table, row, expected, found } => {
                write!(f, "table '{table}', row {row}: expected {expected} field(s), found {found}")
            }
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for MergeError {}

impl From<csv::Error> for MergeError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}

impl From<std::io::Error> for MergeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
