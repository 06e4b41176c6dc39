// Lineup CSV export: one row per lineup, slot columns then aggregates.

use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::lineup::lineup::{Lineup, Slot};
use crate::lineup::scoring::QualityScorer;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

/// One exported lineup. Slot columns hold the site's `Name + ID` label when
/// the salary feed supplied one, else the player name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupRow {
    #[serde(rename = "QB")]
    pub qb: String,
    #[serde(rename = "RB1")]
    pub rb1: String,
    #[serde(rename = "RB2")]
    pub rb2: String,
    #[serde(rename = "WR1")]
    pub wr1: String,
    #[serde(rename = "WR2")]
    pub wr2: String,
    #[serde(rename = "WR3")]
    pub wr3: String,
    #[serde(rename = "TE")]
    pub te: String,
    #[serde(rename = "FLEX")]
    pub flex: String,
    #[serde(rename = "DST")]
    pub dst: String,
    #[serde(rename = "Salary")]
    pub salary: u32,
    #[serde(rename = "Projected_Score")]
    pub projected_score: f64,
    #[serde(rename = "Risk_Adjusted_Score")]
    pub risk_adjusted_score: f64,
    #[serde(rename = "Boom_Score")]
    pub boom_score: f64,
    #[serde(rename = "Bust_Score")]
    pub bust_score: f64,
    #[serde(rename = "Avg_Boom_Percentage")]
    pub avg_boom_percentage: f64,
    #[serde(rename = "Avg_Bust_Percentage")]
    pub avg_bust_percentage: f64,
    #[serde(rename = "Quality_Score")]
    pub quality_score: f64,
    #[serde(rename = "Teams")]
    pub teams: usize,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl LineupRow {
    pub fn from_lineup(lineup: &Lineup<'_>, scorer: &QualityScorer) -> Self {
        let label = |slot: Slot| lineup.player(slot).export_label().to_string();
        LineupRow {
            qb: label(Slot::Qb),
            rb1: label(Slot::Rb1),
            rb2: label(Slot::Rb2),
            wr1: label(Slot::Wr1),
            wr2: label(Slot::Wr2),
            wr3: label(Slot::Wr3),
            te: label(Slot::Te),
            flex: label(Slot::Flex),
            dst: label(Slot::Dst),
            salary: lineup.salary(),
            projected_score: round2(lineup.projected_score()),
            risk_adjusted_score: round2(lineup.risk_adjusted_score()),
            boom_score: round2(lineup.boom_score()),
            bust_score: round2(lineup.bust_score()),
            avg_boom_percentage: round2(lineup.avg_boom_percentage()),
            avg_bust_percentage: round2(lineup.avg_bust_percentage()),
            quality_score: round2(scorer.score(lineup)),
            teams: lineup.team_count(),
        }
    }

    /// Slot labels in column order.
    pub fn players(&self) -> [&str; 9] {
        [
            self.qb.as_str(),
            self.rb1.as_str(),
            self.rb2.as_str(),
            self.wr1.as_str(),
            self.wr2.as_str(),
            self.wr3.as_str(),
            self.te.as_str(),
            self.flex.as_str(),
            self.dst.as_str(),
        ]
    }
}

pub fn write_lineups<W: Write>(writer: W, lineups: &[Lineup<'_>], scorer: &QualityScorer) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);
    for lineup in lineups {
        wtr.serialize(LineupRow::from_lineup(lineup, scorer))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write lineups to `path`, creating parent directories.
pub fn export_lineups(path: &Path, lineups: &[Lineup<'_>], scorer: &QualityScorer) -> Result<(), ExportError> {
    let io_err = |e| ExportError::Io {
        path: path.display().to_string(),
        source: e,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = std::fs::File::create(path).map_err(io_err)?;
    write_lineups(file, lineups, scorer).map_err(|e| ExportError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn read_lineups<R: Read>(reader: R) -> Result<Vec<LineupRow>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    rdr.deserialize().collect()
}

pub fn load_lineups(path: &Path) -> Result<Vec<LineupRow>, ExportError> {
    let file = std::fs::File::open(path).map_err(|e| ExportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    read_lineups(file).map_err(|e| ExportError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}
