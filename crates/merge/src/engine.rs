use crate::combine::join_categories;
use crate::config::{PipelineConfig, PipelineOptions};
use crate::diagnostics::{diagnose, is_synthetic, players_in_multiple_seasons};
use crate::error::MergeError;
use crate::events::{EventSink, MergeEvent, Stage};
use crate::loader::{clean_valuation_table, load_categories, TableSource};
use crate::matcher::match_tables;
use crate::model::{PipelineInput, PipelineReport, PipelineResult, RunMeta};
use crate::reconcile::reconcile;
use crate::table::{Table, PLAYER};

/// Load and clean every table the config names.
pub fn load_input(
    config: &PipelineConfig,
    source: &dyn TableSource,
    sink: &dyn EventSink,
) -> Result<PipelineInput, MergeError> {
    let categories = load_categories(source, &config.stats.categories, &config.seasons, sink)?;
    let raw = source.load_valuation_table()?;
    let valuation = clean_valuation_table(raw, &config.valuation.value_column, sink)?;
    Ok(PipelineInput { categories, valuation })
}

/// Run the merge per config: combine, match, reconcile, filter, diagnose.
pub fn run(
    config: &PipelineConfig,
    input: &PipelineInput,
    sink: &dyn EventSink,
) -> Result<PipelineResult, MergeError> {
    let wide = join_categories(&input.categories, &config.stats.base_category, sink)?;
    let matched = match_tables(&wide, &input.valuation, &config.matching, sink)?;
    let summary = matched.summary();

    let table = reconcile(matched.table, &config.reconcile, &config.stats.categories, sink);
    let table = apply_options(table, config.options, &config.valuation.value_column);
    sink.emit(MergeEvent::StageFinished { stage: Stage::Filter, rows: table.len() });

    let diagnostics = if config.options.run_diagnostics {
        let report = diagnose(&table, &config.valuation.value_column)?;
        sink.emit(MergeEvent::StageFinished {
            stage: Stage::Diagnostics,
            rows: report.total_unvalued,
        });
        Some(report)
    } else {
        None
    };

    Ok(PipelineResult {
        report: PipelineReport {
            meta: RunMeta {
                config_name: config.name.clone(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
                seasons: config.seasons.clone(),
                threshold: config.matching.threshold,
                scorer: config.matching.scorer,
            },
            rows: table.len(),
            columns: table.width(),
            matching: summary,
            diagnostics,
            multi_season_players: players_in_multiple_seasons(&table),
        },
        table,
        records: matched.records,
    })
}

/// Row filters, in order: synthetic rows, then rows without a valuation.
pub fn apply_options(mut table: Table, options: PipelineOptions, value_column: &str) -> Table {
    if options.remove_synthetic_rows {
        table.retain_rows(|r| !is_synthetic(&r.get(PLAYER).to_text()));
    }
    if options.only_rows_with_valuation {
        table.retain_rows(|r| !r.get(value_column).is_null());
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventCollector, NullSink};
    use crate::loader::MemorySource;
    use crate::model::{DiagnosticBucket, MatchMethod};
    use crate::value::Value;

    const CONFIG: &str = r#"
name = "Valencia CF"
seasons = ["2223", "2324"]

[stats]
categories = ["player_stats", "player_shooting"]

[valuation]
file = "tm.csv"
"#;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut t = Table::new(columns.iter().map(|c| c.to_string()).collect());
        for r in rows {
            t.push_row(r.iter().map(|v| Value::from_field(v)).collect());
        }
        t
    }

    fn source() -> MemorySource {
        MemorySource::new()
            .with_category_table(
                "player_stats",
                "2223",
                table(
                    &["Rk", "Player", "Nation", "Pos", "Age", "Matches"],
                    &[
                        &["1", "Javi Guerra", "es ESP", "MF", "19-150", "Matches"],
                        &["2", "Squad Total", "", "", "", "Matches"],
                    ],
                ),
            )
            .with_category_table(
                "player_stats",
                "2324",
                table(
                    &["Rk", "Player", "Nation", "Pos", "Age", "Matches"],
                    &[
                        &["1", "J. Smith", "eng ENG", "DF", "23-001", "Matches"],
                        &["2", "Javi Guerra", "es ESP", "MF", "20-150", "Matches"],
                    ],
                ),
            )
            .with_category_table(
                "player_shooting",
                "2324",
                table(
                    &["Player", "Age", "Gls"],
                    &[&["J. Smith", "23-001", "1"], &["Javi Guerra", "20-150", "4"]],
                ),
            )
            .with_valuation(table(
                &["Player", "Age", "Nat.", "Market value", "Season"],
                &[
                    &["('Javier Guerra', 'Central Midfield')", "19", "['Spain']", "€500k", "2022"],
                    &["('J Smith', 'Centre-Back')", "23", "['England']", "€1.00m", "2023"],
                ],
            ))
    }

    #[test]
    fn full_run_merges_both_sources() {
        let config = PipelineConfig::from_toml(CONFIG).unwrap();
        let sink = EventCollector::new();
        let input = load_input(&config, &source(), &sink).unwrap();
        let result = run(&config, &input, &sink).unwrap();
        let t = &result.table;

        assert_eq!(
            t.columns(),
            &[
                "Player", "Season", "Nation", "Nationality", "Pos", "Position", "Age", "Gls",
                "MarketValueEuro",
            ]
        );
        assert_eq!(t.len(), 4);
        let smith = t.iter().find(|r| r.get("Player").to_text() == "J. Smith").unwrap();
        assert_eq!(smith.get("MarketValueEuro"), &Value::Number(1_000_000.0));
        assert_eq!(smith.get("Gls").to_text(), "1");
        assert_eq!(smith.get("Age"), &Value::Number(23.0));

        let guerra = t
            .iter()
            .find(|r| r.get("Player").to_text() == "Javi Guerra" && r.get("Season").to_text() == "2223")
            .unwrap();
        assert_eq!(guerra.get("MarketValueEuro"), &Value::Number(500_000.0));
        assert_eq!(guerra.get("Position").to_text(), "Central Midfield");

        let m = &result.report.matching;
        assert_eq!((m.exact, m.fuzzy, m.unmatched), (1, 1, 2));
        assert!(result.records.iter().any(|r| r.method == MatchMethod::Fuzzy && r.score == Some(92)));

        let diag = result.report.diagnostics.as_ref().unwrap();
        assert_eq!(diag.total_unvalued, 2);
        assert_eq!(diag.bucket(DiagnosticBucket::Synthetic).unwrap().players, vec!["Squad Total"]);
        assert_eq!(diag.bucket(DiagnosticBucket::NewEntrant).unwrap().players, vec!["Javi Guerra"]);
        assert_eq!(result.report.multi_season_players.len(), 1);
    }

    #[test]
    fn options_filter_before_diagnostics() {
        let mut config = PipelineConfig::from_toml(CONFIG).unwrap();
        config.options.remove_synthetic_rows = true;
        config.options.only_rows_with_valuation = true;
        let input = load_input(&config, &source(), &NullSink).unwrap();
        let result = run(&config, &input, &NullSink).unwrap();

        assert_eq!(result.table.len(), 2);
        assert_eq!(result.report.diagnostics.unwrap().total_unvalued, 0);
    }

    #[test]
    fn diagnostics_can_be_disabled() {
        let mut config = PipelineConfig::from_toml(CONFIG).unwrap();
        config.options.run_diagnostics = false;
        let input = load_input(&config, &source(), &NullSink).unwrap();
        let result = run(&config, &input, &NullSink).unwrap();
        assert!(result.report.diagnostics.is_none());
    }

    #[test]
    fn missing_category_data_aborts() {
        let config = PipelineConfig::from_toml(&CONFIG.replace("player_shooting", "player_gca")).unwrap();
        let err = load_input(&config, &source(), &NullSink).unwrap_err();
        assert_eq!(err, MergeError::NoData { category: "player_gca".into() });
    }
}
