// Module: scoring calibration against actual fantasy results.
//
// Scores exported lineups with real points and reports how well each
// projected metric ranked them.

use std::fmt;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::lineup::export::{load_lineups, ExportError, LineupRow};
use crate::roster::player::Metric;
use crate::roster::reference::ReferenceData;

/// Lineups scoring fewer matched players than this are left out.
pub const MIN_MATCHED_PLAYERS: usize = 7;
/// Correlations need at least this many scored lineups.
pub const MIN_SCORED_LINEUPS: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error(transparent)]
    Lineups(#[from] ExportError),
}

// ---------------------------------------------------------------------------
// Actual results
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawActual {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "DFS Total", default, deserialize_with = "csv::invalid_option")]
    dfs_total: Option<f64>,
}

/// Actual fantasy points keyed by normalized name, in file order.
#[derive(Debug, Clone, Default)]
pub struct ActualResults {
    entries: Vec<(String, f64)>,
}

impl ActualResults {
    pub fn new(entries: impl IntoIterator<Item = (String, f64)>, reference: &ReferenceData) -> Self {
        let entries = entries
            .into_iter()
            .map(|(name, points)| (reference.match_key(&name), points))
            .filter(|(key, _)| !key.is_empty())
            .collect();
        ActualResults { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact key first, then either name containing the other.
    pub fn lookup(&self, key: &str) -> Option<f64> {
        if key.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .or_else(|| self.entries.iter().find(|(k, _)| k.contains(key)))
            .or_else(|| self.entries.iter().find(|(k, _)| key.contains(k.as_str())))
            .map(|&(_, points)| points)
    }
}

fn load_actuals_from_reader<R: Read>(reader: R, reference: &ReferenceData) -> Result<ActualResults, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut entries = Vec::new();
    for (i, result) in rdr.deserialize::<RawActual>().enumerate() {
        match result {
            Ok(RawActual {
                name,
                dfs_total: Some(points),
            }) if points.is_finite() => entries.push((name, points)),
            Ok(raw) => debug!("actuals row {}: no points for {}", i + 2, raw.name),
            Err(e) => warn!("skipping actuals row {}: {}", i + 2, e),
        }
    }
    Ok(ActualResults::new(entries, reference))
}

pub fn load_actuals(path: &Path, reference: &ReferenceData) -> Result<ActualResults, BacktestError> {
    let file = std::fs::File::open(path).map_err(|e| BacktestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_actuals_from_reader(file, reference).map_err(|e| BacktestError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

/// Actual total for a lineup's players, or `None` when fewer than
/// [`MIN_MATCHED_PLAYERS`] are found.
pub fn actual_lineup_score(players: &[&str], actuals: &ActualResults, reference: &ReferenceData) -> Option<f64> {
    let mut total = 0.0;
    let mut matched = 0;
    for name in players {
        if let Some(points) = actuals.lookup(&reference.match_key(name)) {
            total += points;
            matched += 1;
        }
    }
    (matched >= MIN_MATCHED_PLAYERS).then_some(total)
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Pearson correlation; `None` for mismatched lengths, fewer than two
/// points, or a constant series.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// 1-based ranks; tied values share the mean of their positions.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }
    ranks
}

/// Spearman rank correlation: Pearson over average ranks.
pub fn spearman(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() {
        return None;
    }
    pearson(&average_ranks(xs), &average_ranks(ys))
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCorrelation {
    pub metric: Metric,
    pub pearson: Option<f64>,
    pub spearman: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredLineup {
    /// 1-based row in the lineup file.
    pub row: usize,
    pub actual: f64,
    pub projected: f64,
    pub risk_adjusted: f64,
    pub boom: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestReport {
    pub total_lineups: usize,
    pub scored_lineups: usize,
    pub correlations: Vec<MetricCorrelation>,
    pub best_pearson: Option<Metric>,
    pub best_spearman: Option<Metric>,
    pub lineups: Vec<ScoredLineup>,
}

fn best_by(correlations: &[MetricCorrelation], key: impl Fn(&MetricCorrelation) -> Option<f64>) -> Option<Metric> {
    correlations
        .iter()
        .filter_map(|c| key(c).map(|v| (c.metric, v)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(metric, _)| metric)
}

pub fn run_backtest(rows: &[LineupRow], actuals: &ActualResults, reference: &ReferenceData) -> BacktestReport {
    let lineups: Vec<ScoredLineup> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let actual = actual_lineup_score(&row.players(), actuals, reference)?;
            Some(ScoredLineup {
                row: i + 1,
                actual,
                projected: row.projected_score,
                risk_adjusted: row.risk_adjusted_score,
                boom: row.boom_score,
            })
        })
        .collect();
    info!("scored {} of {} lineups against actuals", lineups.len(), rows.len());

    let actual: Vec<f64> = lineups.iter().map(|l| l.actual).collect();
    let enough = lineups.len() >= MIN_SCORED_LINEUPS;
    if !enough {
        warn!(
            "only {} lineups scored; need {} for correlations",
            lineups.len(),
            MIN_SCORED_LINEUPS
        );
    }
    let series: [(Metric, fn(&ScoredLineup) -> f64); 3] = [
        (Metric::Projected, |l| l.projected),
        (Metric::RiskAdjusted, |l| l.risk_adjusted),
        (Metric::BoomScore, |l| l.boom),
    ];
    let correlations: Vec<MetricCorrelation> = series
        .iter()
        .map(|(metric, get)| {
            let xs: Vec<f64> = lineups.iter().map(*get).collect();
            MetricCorrelation {
                metric: *metric,
                pearson: if enough { pearson(&xs, &actual) } else { None },
                spearman: if enough { spearman(&xs, &actual) } else { None },
            }
        })
        .collect();

    BacktestReport {
        total_lineups: rows.len(),
        scored_lineups: lineups.len(),
        best_pearson: best_by(&correlations, |c| c.pearson),
        best_spearman: best_by(&correlations, |c| c.spearman),
        correlations,
        lineups,
    }
}

/// Load both files and run the backtest.
pub fn backtest_files(
    lineups_path: &Path,
    actuals_path: &Path,
    reference: &ReferenceData,
) -> Result<BacktestReport, BacktestError> {
    let rows = load_lineups(lineups_path)?;
    let actuals = load_actuals(actuals_path, reference)?;
    info!("loaded {} lineups and {} actual results", rows.len(), actuals.len());
    Ok(run_backtest(&rows, &actuals, reference))
}

fn fmt_corr(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}

impl fmt::Display for BacktestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} of {} lineups scored", self.scored_lineups, self.total_lineups)?;
        writeln!(f, "  {:<22} {:>9} {:>9}", "metric", "pearson", "spearman")?;
        for c in &self.correlations {
            writeln!(
                f,
                "  {:<22} {:>9} {:>9}",
                c.metric.column_label(),
                fmt_corr(c.pearson),
                fmt_corr(c.spearman)
            )?;
        }
        if let Some(m) = self.best_pearson {
            writeln!(f, "  best pearson:  {}", m.column_label())?;
        }
        if let Some(m) = self.best_spearman {
            writeln!(f, "  best spearman: {}", m.column_label())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALLSIGNS: [&str; 9] = [
        "Alpha", "Bravo", "Charlie", "Delta", "Echo", "Foxtrot", "Golf", "Hotel", "India",
    ];

    fn player_names() -> Vec<String> {
        CALLSIGNS.iter().map(|c| format!("Player {c}")).collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn row(players: [&str; 9], projected: f64, risk: f64, boom: f64) -> LineupRow {
        LineupRow {
            qb: players[0].into(),
            rb1: players[1].into(),
            rb2: players[2].into(),
            wr1: players[3].into(),
            wr2: players[4].into(),
            wr3: players[5].into(),
            te: players[6].into(),
            flex: players[7].into(),
            dst: players[8].into(),
            salary: 50_000,
            projected_score: projected,
            risk_adjusted_score: risk,
            boom_score: boom,
            bust_score: 0.0,
            avg_boom_percentage: 0.0,
            avg_bust_percentage: 0.0,
            quality_score: 0.0,
            teams: 5,
        }
    }

    #[test]
    fn pearson_of_linear_series() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        assert!(approx(pearson(&xs, &ys).unwrap(), 1.0));
        let inv = [8.0, 6.0, 4.0, 2.0];
        assert!(approx(pearson(&xs, &inv).unwrap(), -1.0));
        assert_eq!(pearson(&xs, &[1.0, 1.0, 1.0, 1.0]), None);
        assert_eq!(pearson(&[1.0], &[2.0]), None);
    }

    #[test]
    fn ties_share_average_rank() {
        assert_eq!(average_ranks(&[10.0, 20.0, 20.0, 30.0]), vec![1.0, 2.5, 2.5, 4.0]);
        assert_eq!(average_ranks(&[3.0, 1.0, 2.0]), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn spearman_is_rank_based() {
        // Monotone but not linear: Spearman 1, Pearson below 1.
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [1.0, 4.0, 9.0, 16.0, 100.0];
        assert!(approx(spearman(&xs, &ys).unwrap(), 1.0));
        assert!(pearson(&xs, &ys).unwrap() < 1.0);
    }

    #[test]
    fn lookup_falls_back_to_substring() {
        let reference = ReferenceData::empty();
        let actuals = ActualResults::new(
            vec![
                ("Patrick Mahomes II".to_string(), 25.0),
                ("Marquise Hollywood Brown".to_string(), 12.0),
            ],
            &reference,
        );
        assert_eq!(actuals.lookup(&reference.match_key("Patrick Mahomes (4001)")), Some(25.0));
        assert_eq!(actuals.lookup(&reference.match_key("Hollywood Brown")), Some(12.0));
        assert_eq!(actuals.lookup(&reference.match_key("Nobody Here")), None);
        assert_eq!(actuals.lookup(""), None);
    }

    #[test]
    fn lineup_needs_seven_matches() {
        let reference = ReferenceData::empty();
        let names = player_names();
        let actuals = ActualResults::new(names.iter().take(7).map(|n| (n.clone(), 10.0)), &reference);
        let players: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(actual_lineup_score(&players, &actuals, &reference), Some(70.0));

        let six = ActualResults::new(names.iter().take(6).map(|n| (n.clone(), 10.0)), &reference);
        assert_eq!(actual_lineup_score(&players, &six, &reference), None);
    }

    #[test]
    fn report_needs_five_scored_lineups() {
        let reference = ReferenceData::empty();
        let names = player_names();
        let actuals = ActualResults::new(names.iter().map(|n| (n.clone(), 10.0)), &reference);
        let players: [&str; 9] = std::array::from_fn(|i| names[i].as_str());

        let rows: Vec<LineupRow> = (0..4).map(|i| row(players, 100.0 + i as f64, 90.0, 0.0)).collect();
        let report = run_backtest(&rows, &actuals, &reference);
        assert_eq!(report.scored_lineups, 4);
        assert!(report.correlations.iter().all(|c| c.pearson.is_none() && c.spearman.is_none()));
        assert_eq!(report.best_pearson, None);
    }

    #[test]
    fn report_ranks_metrics() {
        let reference = ReferenceData::empty();
        // Only the QB changes between lineups, so actual totals rise with i.
        let shared = player_names();
        let mut rows = Vec::new();
        let mut entries: Vec<(String, f64)> = shared[1..].iter().map(|n| (n.clone(), 8.0)).collect();
        for (i, callsign) in CALLSIGNS.iter().take(6).enumerate() {
            let qb = format!("Quarterback {callsign}");
            entries.push((qb.clone(), 10.0 + 5.0 * i as f64));
            let names: [&str; 9] = std::array::from_fn(|slot| if slot == 0 { qb.as_str() } else { shared[slot].as_str() });
            // Projected tracks actual; risk-adjusted runs backwards.
            rows.push(row(names, 100.0 + i as f64, 100.0 - i as f64, 0.0));
        }
        let actuals = ActualResults::new(entries, &reference);

        let report = run_backtest(&rows, &actuals, &reference);
        assert_eq!(report.scored_lineups, 6);
        let projected = &report.correlations[0];
        assert_eq!(projected.metric, Metric::Projected);
        assert!(approx(projected.pearson.unwrap(), 1.0));
        assert!(approx(report.correlations[1].spearman.unwrap(), -1.0));
        // Boom is constant here, so it has no correlation.
        assert_eq!(report.correlations[2].pearson, None);
        assert_eq!(report.best_pearson, Some(Metric::Projected));
        assert_eq!(report.best_spearman, Some(Metric::Projected));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"scored_lineups\":6"));
    }
}
