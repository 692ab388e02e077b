//! Read-only classification of rows still missing a valuation.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::error::MergeError;
use crate::model::{BucketReport, DiagnosticBucket, DiagnosticsReport, MultiSeasonPlayer};
use crate::table::{Table, PLAYER, SEASON};

/// Name used for rows without a player.
pub const UNKNOWN_PLAYER: &str = "Unknown";

const SYNTHETIC_MARKERS: [&str; 3] = ["total", "squad", "opponent"];
const MIN_NAME_LEN: usize = 5;

/// Team-total and opponent rows the statistics site mixes into player tables.
pub fn is_synthetic(player: &str) -> bool {
    let lower = player.to_lowercase();
    SYNTHETIC_MARKERS.iter().any(|m| lower.contains(m))
}

/// Bucket for one unvalued row. `latest_season` is the table's maximum season.
pub fn classify(player: &str, season: Option<&str>, latest_season: Option<&str>) -> DiagnosticBucket {
    if is_synthetic(player) {
        DiagnosticBucket::Synthetic
    } else if player.chars().count() < MIN_NAME_LEN {
        DiagnosticBucket::IncompleteName
    } else if season.is_some() && season == latest_season {
        DiagnosticBucket::NewEntrant
    } else {
        DiagnosticBucket::Unresolved
    }
}

/// Classify every row whose `value_column` is null. Bucket counts sum to the
/// number of such rows.
pub fn diagnose(table: &Table, value_column: &str) -> Result<DiagnosticsReport, MergeError> {
    let value = table.require_column("merged", value_column)?;
    let player_col = table.column_index(PLAYER);
    let season_col = table.column_index(SEASON);

    let seasons: Vec<String> = match season_col {
        Some(col) => table
            .column_values(col)
            .filter(|v| !v.is_null())
            .map(|v| v.to_text())
            .collect(),
        None => Vec::new(),
    };
    let latest = seasons.iter().max().map(String::as_str);

    let mut buckets: Vec<(BucketReport, HashSet<String>)> = DiagnosticBucket::ALL
        .iter()
        .map(|&bucket| (BucketReport { bucket, count: 0, players: Vec::new() }, HashSet::new()))
        .collect();
    let mut total_unvalued = 0;

    for row in 0..table.len() {
        if !table.value(row, value).is_null() {
            continue;
        }
        total_unvalued += 1;

        let player = player_col
            .map(|c| table.value(row, c))
            .filter(|v| !v.is_null())
            .map(|v| v.to_text())
            .unwrap_or_else(|| UNKNOWN_PLAYER.to_string());
        let season = season_col
            .map(|c| table.value(row, c))
            .filter(|v| !v.is_null())
            .map(|v| v.to_text());

        let bucket = classify(&player, season.as_deref(), latest);
        if let Some((report, seen)) = buckets.iter_mut().find(|(r, _)| r.bucket == bucket) {
            report.count += 1;
            if seen.insert(player.clone()) {
                report.players.push(player);
            }
        }
    }

    Ok(DiagnosticsReport {
        total_rows: table.len(),
        total_unvalued,
        buckets: buckets.into_iter().map(|(report, _)| report).collect(),
    })
}

/// Players with rows in more than one season, by name, with their sorted seasons.
pub fn players_in_multiple_seasons(table: &Table) -> Vec<MultiSeasonPlayer> {
    let (Some(player_col), Some(season_col)) = (table.column_index(PLAYER), table.column_index(SEASON))
    else {
        return Vec::new();
    };

    let mut seasons: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for row in 0..table.len() {
        let (player, season) = (table.value(row, player_col), table.value(row, season_col));
        if player.is_null() || season.is_null() {
            continue;
        }
        seasons.entry(player.to_text()).or_default().insert(season.to_text());
    }

    seasons
        .into_iter()
        .filter(|(_, s)| s.len() > 1)
        .map(|(player, s)| MultiSeasonPlayer { player, seasons: s.into_iter().collect() })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut t = Table::new(columns.iter().map(|c| c.to_string()).collect());
        for r in rows {
            t.push_row(r.iter().map(|v| Value::from_field(v)).collect());
        }
        t
    }

    fn final_table() -> Table {
        table(
            &["Player", "Season", "MarketValueEuro"],
            &[
                &["Squad Total", "2324", ""],
                &["Opponent Total", "2425", ""],
                &["Iker", "2223", ""],
                &["Diego López", "2425", ""],
                &["Diego López", "2324", "1500000"],
                &["Cristhian Mosquera", "2223", ""],
                &["Cristhian Mosquera", "2324", ""],
                &["", "2324", ""],
                &["Gayà", "2425", ""],
            ],
        )
    }

    #[test]
    fn buckets_are_priority_ordered() {
        let report = diagnose(&final_table(), "MarketValueEuro").unwrap();
        let players = |b| report.bucket(b).unwrap().players.clone();

        assert_eq!(report.total_unvalued, 8);
        assert_eq!(players(DiagnosticBucket::Synthetic), vec!["Squad Total", "Opponent Total"]);
        // short name beats latest season
        assert_eq!(players(DiagnosticBucket::IncompleteName), vec!["Iker", "Gayà"]);
        assert_eq!(players(DiagnosticBucket::NewEntrant), vec!["Diego López"]);
        // null player reads as "Unknown", which is long enough to count as a name
        assert_eq!(players(DiagnosticBucket::Unresolved), vec!["Cristhian Mosquera", "Unknown"]);
        assert_eq!(report.bucket(DiagnosticBucket::Unresolved).unwrap().count, 3);
    }

    #[test]
    fn bucket_counts_sum_to_unvalued_rows() {
        let report = diagnose(&final_table(), "MarketValueEuro").unwrap();
        let sum: usize = report.buckets.iter().map(|b| b.count).sum();
        assert_eq!(sum, report.total_unvalued);
        assert_eq!(report.buckets.len(), 4);
    }

    #[test]
    fn missing_value_column_is_an_error() {
        let t = table(&["Player", "Season"], &[&["Pepelu", "2324"]]);
        assert!(matches!(
            diagnose(&t, "MarketValueEuro"),
            Err(MergeError::MissingColumn { .. })
        ));
    }

    #[test]
    fn synthetic_detection_ignores_case() {
        assert!(is_synthetic("squad TOTAL"));
        assert!(is_synthetic("vs Opponents"));
        assert!(!is_synthetic("Thierry Correia"));
    }

    #[test]
    fn multi_season_players() {
        let found = players_in_multiple_seasons(&final_table());
        assert_eq!(
            found,
            vec![
                MultiSeasonPlayer {
                    player: "Cristhian Mosquera".into(),
                    seasons: vec!["2223".into(), "2324".into()],
                },
                MultiSeasonPlayer {
                    player: "Diego López".into(),
                    seasons: vec!["2324".into(), "2425".into()],
                },
            ]
        );
    }
}
