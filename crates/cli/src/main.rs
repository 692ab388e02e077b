// squadval CLI - player statistics and market value merge

mod exit_codes;
mod logger;
mod merge;

use std::process::ExitCode;

use clap::Parser;
use squadval_merge::MergeError;

use exit_codes::{merge_exit_code, EXIT_MERGE_OUTPUT, EXIT_SUCCESS, EXIT_USAGE};
use merge::MergeCommands;

#[derive(Parser)]
#[command(name = "squadval")]
#[command(about = "Merge per-season player statistics with market valuations")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<MergeCommands>,
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  squadval-merge ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  squadval-merge ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init_logging(cli.verbose);

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: squadval <command> [options]");
            eprintln!("       squadval --help for more information");
            Ok(())
        }
        Some(cmd) => merge::cmd_merge(cmd),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn output(msg: impl Into<String>) -> Self {
        Self::new(EXIT_MERGE_OUTPUT, msg)
    }

    /// Create error from an engine error with the matching exit code.
    pub fn merge(err: MergeError) -> Self {
        let code = merge_exit_code(&err);
        let hint = match &err {
            MergeError::NoData { category } => {
                Some(format!("check [stats] dir and file_pattern for '{category}'"))
            }
            MergeError::MissingBaseTable { base } => {
                Some(format!("add '{base}' to [stats] categories"))
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
