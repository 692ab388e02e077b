//! CLI Exit Code Registry
//!
//! Single source of truth for `squadval` exit codes. Scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range | Domain    | Description                              |
//! |-------|-----------|------------------------------------------|
//! | 0     | Universal | Success                                  |
//! | 1     | Universal | General error (unspecified)              |
//! | 2     | Universal | CLI usage error (bad args, missing file) |
//! | 3-9   | merge     | Pipeline-specific codes                  |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into [`merge_exit_code`] or the command's error handling

use squadval_merge::MergeError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unreadable config path.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Merge (3-9)
// =============================================================================

/// Config failed to parse or validate.
pub const EXIT_MERGE_INVALID_CONFIG: u8 = 3;

/// Input could not be loaded: no data for a category, unreadable valuation file.
pub const EXIT_MERGE_INPUT: u8 = 4;

/// A required table or column is missing mid-pipeline.
pub const EXIT_MERGE_SCHEMA: u8 = 5;

/// `--strict`: rows remain in the unresolved diagnostics bucket.
pub const EXIT_MERGE_UNRESOLVED: u8 = 6;

/// Output could not be written.
pub const EXIT_MERGE_OUTPUT: u8 = 7;

/// Map an engine error to its exit code.
pub fn merge_exit_code(err: &MergeError) -> u8 {
    match err {
        MergeError::ConfigParse(_) | MergeError::ConfigValidation(_) => EXIT_MERGE_INVALID_CONFIG,
        MergeError::MissingFile { .. }
        | MergeError::NoData { .. }
        | MergeError::Io(_)
        | MergeError::Csv(_) => EXIT_MERGE_INPUT,
        MergeError::MissingBaseTable { .. }
        | MergeError::MissingColumn { .. }
        | MergeError::RaggedRow { .. } => EXIT_MERGE_SCHEMA,
        MergeError::InvalidScope { .. } => EXIT_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_have_their_own_code() {
        assert_eq!(merge_exit_code(&MergeError::ConfigParse("x".into())), 3);
        assert_eq!(merge_exit_code(&MergeError::ConfigValidation("x".into())), 3);
    }

    #[test]
    fn structural_errors_map_to_schema() {
        let err = MergeError::MissingBaseTable { base: "player_stats".into() };
        assert_eq!(merge_exit_code(&err), EXIT_MERGE_SCHEMA);
        let err = MergeError::NoData { category: "player_gca".into() };
        assert_eq!(merge_exit_code(&err), EXIT_MERGE_INPUT);
    }
}
