//! `squadval` commands: config-driven merge runs and their helpers.

use std::fs::File;
use std::path::{Path, PathBuf};

use clap::Subcommand;
use squadval_merge::csv_io::{read_csv, write_csv};
use squadval_merge::diagnostics::{diagnose, players_in_multiple_seasons};
use squadval_merge::model::{DiagnosticBucket, DiagnosticsReport, PipelineResult};
use squadval_merge::normalize::season_code;
use squadval_merge::table::MARKET_VALUE;
use squadval_merge::{CsvDirSource, LogSink, PipelineConfig};

use crate::exit_codes::EXIT_MERGE_UNRESOLVED;
use crate::CliError;

#[derive(Subcommand)]
pub enum MergeCommands {
    /// Merge statistics and valuation tables from a TOML config file
    #[command(after_help = "\
Examples:
  squadval run valencia.merge.toml
  squadval run valencia.merge.toml --csv merged.csv
  squadval run valencia.merge.toml --json --threshold 90
  squadval run valencia.merge.toml --drop-synthetic --only-valued --strict")]
    Run {
        /// Path to the .merge.toml config file
        config: PathBuf,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON report to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the merged table as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Fuzzy match acceptance threshold (0-100), overrides the config
        #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
        threshold: Option<u8>,

        /// Remove team-total and opponent rows from the output
        #[arg(long)]
        drop_synthetic: bool,

        /// Keep only rows that received a market value
        #[arg(long)]
        only_valued: bool,

        /// Skip the diagnostics pass
        #[arg(long, conflicts_with = "strict")]
        no_diagnostics: bool,

        /// Exit non-zero when unresolved rows remain
        #[arg(long)]
        strict: bool,
    },

    /// Validate a merge config without running
    #[command(after_help = "\
Examples:
  squadval validate valencia.merge.toml")]
    Validate {
        /// Path to the .merge.toml config file
        config: PathBuf,
    },

    /// Classify unvalued rows of an already merged CSV
    #[command(after_help = "\
Examples:
  squadval diagnose merged.csv
  squadval diagnose merged.csv --json")]
    Diagnose {
        /// Merged CSV written by `squadval run --csv`
        merged: PathBuf,

        /// Column holding the market value
        #[arg(long, default_value = MARKET_VALUE)]
        value_column: String,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Convert season labels to compact codes
    #[command(after_help = "\
Examples:
  squadval season 2023 2023-2024 2022/23 2425")]
    Season {
        /// Season labels (calendar year, compact code or range)
        #[arg(required = true)]
        labels: Vec<String>,
    },
}

pub fn cmd_merge(cmd: MergeCommands) -> Result<(), CliError> {
    match cmd {
        MergeCommands::Run {
            config,
            json,
            output,
            csv,
            threshold,
            drop_synthetic,
            only_valued,
            no_diagnostics,
            strict,
        } => {
            let overrides = Overrides { threshold, drop_synthetic, only_valued, no_diagnostics };
            cmd_run(config, overrides, json, output, csv, strict)
        }
        MergeCommands::Validate { config } => cmd_validate(config),
        MergeCommands::Diagnose { merged, value_column, json } => {
            cmd_diagnose(merged, &value_column, json)
        }
        MergeCommands::Season { labels } => cmd_season(labels),
    }
}

/// Command-line overrides applied on top of the config file.
struct Overrides {
    threshold: Option<u8>,
    drop_synthetic: bool,
    only_valued: bool,
    no_diagnostics: bool,
}

impl Overrides {
    fn apply(&self, config: &mut PipelineConfig) {
        if let Some(threshold) = self.threshold {
            config.matching.threshold = threshold;
        }
        if self.drop_synthetic {
            config.options.remove_synthetic_rows = true;
        }
        if self.only_valued {
            config.options.only_rows_with_valuation = true;
        }
        if self.no_diagnostics {
            config.options.run_diagnostics = false;
        }
    }
}

/// Read and parse a config; returns it with the directory its paths are relative to.
fn load_config(path: &Path) -> Result<(PipelineConfig, PathBuf), CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::args(format!("cannot read config {}: {e}", path.display()))
    })?;
    let config = PipelineConfig::from_toml(&text).map_err(CliError::merge)?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    Ok((config, base_dir))
}

fn cmd_run(
    config_path: PathBuf,
    overrides: Overrides,
    json_output: bool,
    output_file: Option<PathBuf>,
    csv_file: Option<PathBuf>,
    strict: bool,
) -> Result<(), CliError> {
    let (mut config, base_dir) = load_config(&config_path)?;
    overrides.apply(&mut config);
    config.validate().map_err(CliError::merge)?;
    if strict && !config.options.run_diagnostics {
        return Err(CliError::args("--strict needs diagnostics")
            .with_hint("remove run_diagnostics = false from [options]"));
    }

    let sink = LogSink;
    let source = CsvDirSource::from_config(&config, &base_dir);
    let input = squadval_merge::load_input(&config, &source, &sink).map_err(CliError::merge)?;
    let result = squadval_merge::run(&config, &input, &sink).map_err(CliError::merge)?;

    // Flags win over [output]; config paths are relative to the config file
    let csv_path = csv_file.or_else(|| config.output.csv.as_ref().map(|p| base_dir.join(p)));
    if let Some(ref path) = csv_path {
        let file = File::create(path).map_err(|e| {
            CliError::output(format!("cannot write {}: {e}", path.display()))
        })?;
        write_csv(&result.table, file).map_err(|e| CliError::output(e.to_string()))?;
        eprintln!("wrote {}", path.display());
    }

    let json_str = serde_json::to_string_pretty(&result.report)
        .map_err(|e| CliError::output(format!("JSON serialization error: {e}")))?;
    let json_path = output_file.or_else(|| config.output.json.as_ref().map(|p| base_dir.join(p)));
    if let Some(ref path) = json_path {
        std::fs::write(path, &json_str).map_err(|e| {
            CliError::output(format!("cannot write output: {e}"))
        })?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    print_summary(&result);

    if strict {
        let unresolved = result
            .report
            .diagnostics
            .as_ref()
            .and_then(|d| d.bucket(DiagnosticBucket::Unresolved))
            .map_or(0, |b| b.count);
        if unresolved > 0 {
            return Err(CliError::new(
                EXIT_MERGE_UNRESOLVED,
                format!("{unresolved} unresolved row(s) without market value"),
            )
            .with_hint("run with --json to list them, or lower --threshold"));
        }
    }

    Ok(())
}

fn print_summary(result: &PipelineResult) {
    let r = &result.report;
    let m = &r.matching;
    eprintln!(
        "{}: {} rows, {} columns; {} exact, {} fuzzy, {} unmatched",
        r.meta.config_name, r.rows, r.columns, m.exact, m.fuzzy, m.unmatched,
    );
    if !m.scope_warnings.is_empty() {
        eprintln!("warning: no valuation rows for season(s) {}", m.scope_warnings.join(", "));
    }
    if let Some(ref diagnostics) = r.diagnostics {
        print_diagnostics(diagnostics);
    }
}

fn print_diagnostics(report: &DiagnosticsReport) {
    let counts: Vec<String> = report
        .buckets
        .iter()
        .map(|b| format!("{} {}", b.count, b.bucket))
        .collect();
    eprintln!(
        "diagnostics: {} of {} rows without market value ({})",
        report.total_unvalued,
        report.total_rows,
        counts.join(", "),
    );
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let (config, base_dir) = load_config(&config_path)?;
    eprintln!(
        "{}: {} season(s), {} categor{}, threshold {} ({})",
        config.name,
        config.seasons.len(),
        config.stats.categories.len(),
        if config.stats.categories.len() == 1 { "y" } else { "ies" },
        config.matching.threshold,
        config.matching.scorer,
    );

    let stats_dir = base_dir.join(&config.stats.dir);
    for category in &config.stats.categories {
        let found = config
            .seasons
            .iter()
            .filter(|s| stats_dir.join(config.stats.file_name(category, s)).is_file())
            .count();
        eprintln!("  {category}: {found}/{} season file(s)", config.seasons.len());
    }
    let valuation = base_dir.join(&config.valuation.file);
    if !valuation.is_file() {
        eprintln!("  warning: valuation file not found: {}", valuation.display());
    }
    Ok(())
}

fn cmd_diagnose(merged: PathBuf, value_column: &str, json_output: bool) -> Result<(), CliError> {
    let file = File::open(&merged).map_err(|e| {
        CliError::args(format!("cannot read {}: {e}", merged.display()))
    })?;
    let table = read_csv(file, 0).map_err(CliError::merge)?;
    let report = diagnose(&table, value_column).map_err(CliError::merge)?;

    if json_output {
        let out = serde_json::json!({
            "diagnostics": report,
            "multi_season_players": players_in_multiple_seasons(&table),
        });
        let json_str = serde_json::to_string_pretty(&out)
            .map_err(|e| CliError::output(format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
        return Ok(());
    }

    print_diagnostics(&report);
    for bucket in report.buckets.iter().filter(|b| b.count > 0) {
        println!("{}: {}", bucket.bucket, bucket.players.join(", "));
    }
    Ok(())
}

fn cmd_season(labels: Vec<String>) -> Result<(), CliError> {
    for label in labels {
        println!("{label}\t{}", season_code(&label));
    }
    Ok(())
}
