// Player model: slate positions, projection detail, and derived score metrics.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// NFL positions that appear on a DFS classic slate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Quarterback,
    RunningBack,
    WideReceiver,
    TightEnd,
    Defense,
}

impl Position {
    pub const ALL: [Position; 5] = [
        Position::Quarterback,
        Position::RunningBack,
        Position::WideReceiver,
        Position::TightEnd,
        Position::Defense,
    ];

    /// Parse a position string from a projections or salary feed.
    ///
    /// Handles the feed-specific spellings:
    /// - "D/ST", "DEF" -> Defense
    /// - "WR, CB" (two-way players listed by ESPN) -> WideReceiver
    pub fn from_str_pos(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "QB" => Some(Position::Quarterback),
            "RB" => Some(Position::RunningBack),
            "WR" | "WR, CB" | "WR/CB" => Some(Position::WideReceiver),
            "TE" => Some(Position::TightEnd),
            "DST" | "D/ST" | "DEF" => Some(Position::Defense),
            _ => None,
        }
    }

    /// Return the display string for this position.
    pub fn display_str(&self) -> &'static str {
        match self {
            Position::Quarterback => "QB",
            Position::RunningBack => "RB",
            Position::WideReceiver => "WR",
            Position::TightEnd => "TE",
            Position::Defense => "DST",
        }
    }

    /// Whether this position may fill the FLEX slot.
    pub fn is_flex_eligible(&self) -> bool {
        matches!(
            self,
            Position::RunningBack | Position::WideReceiver | Position::TightEnd
        )
    }

    /// Whether this position can be the receiving half of a QB stack.
    pub fn is_pass_catcher(&self) -> bool {
        matches!(self, Position::WideReceiver | Position::TightEnd)
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Position::Quarterback => 0,
            Position::RunningBack => 1,
            Position::WideReceiver => 2,
            Position::TightEnd => 3,
            Position::Defense => 4,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_str())
    }
}

// ---------------------------------------------------------------------------
// Optimization metric
// ---------------------------------------------------------------------------

/// The score a run optimizes for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Metric {
    #[default]
    #[serde(rename = "projected")]
    #[value(name = "projected")]
    Projected,
    #[serde(rename = "risk_adjusted")]
    #[value(name = "risk_adjusted")]
    RiskAdjusted,
    #[serde(rename = "boom_score", alias = "boom")]
    #[value(name = "boom_score")]
    BoomScore,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Projected => "projected",
            Metric::RiskAdjusted => "risk_adjusted",
            Metric::BoomScore => "boom_score",
        }
    }

    /// Column header used for this metric in reports.
    pub fn column_label(&self) -> &'static str {
        match self {
            Metric::Projected => "Projected_Score",
            Metric::RiskAdjusted => "Risk_Adjusted_Score",
            Metric::BoomScore => "Boom_Score",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ---------------------------------------------------------------------------
// Projection detail
// ---------------------------------------------------------------------------

/// How much of the projection distribution a feed supplied for a player.
///
/// `Basic` rows carry only a point projection. `WithBoomBust` rows add the
/// outer-band scores and the probability (in percent) of landing beyond them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionDetail {
    Basic,
    WithBoomBust {
        bust_score: f64,
        boom_score: f64,
        bust_percentage: f64,
        boom_percentage: f64,
    },
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A rosterable player with salary and projections. Read-only once the pool
/// is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub name: String,
    pub position: Position,
    pub team: String,
    pub opponent: String,
    pub salary: u32,
    pub projected_score: f64,
    pub detail: ProjectionDetail,
    /// Salary-site identifier (e.g. DraftKings "Name + ID"), used on export.
    pub export_id: Option<String>,
    pub game_info: Option<String>,
}

impl Player {
    pub fn new(
        name: impl Into<String>,
        position: Position,
        team: impl Into<String>,
        opponent: impl Into<String>,
        salary: u32,
        projected_score: f64,
    ) -> Self {
        Player {
            name: name.into(),
            position,
            team: team.into(),
            opponent: opponent.into(),
            salary,
            projected_score,
            detail: ProjectionDetail::Basic,
            export_id: None,
            game_info: None,
        }
    }

    /// Attach boom/bust projection bands.
    pub fn with_boom_bust(
        mut self,
        bust_score: f64,
        boom_score: f64,
        bust_percentage: f64,
        boom_percentage: f64,
    ) -> Self {
        self.detail = ProjectionDetail::WithBoomBust {
            bust_score,
            boom_score,
            bust_percentage,
            boom_percentage,
        };
        self
    }

    pub fn with_export_id(mut self, id: impl Into<String>) -> Self {
        self.export_id = Some(id.into());
        self
    }

    /// Identifier written to lineup exports.
    pub fn export_label(&self) -> &str {
        self.export_id.as_deref().unwrap_or(&self.name)
    }

    /// Projected points per $1000 of salary.
    pub fn value(&self) -> f64 {
        if self.salary > 0 {
            self.projected_score / self.salary as f64 * 1000.0
        } else {
            0.0
        }
    }

    pub fn has_boom_bust(&self) -> bool {
        matches!(self.detail, ProjectionDetail::WithBoomBust { .. })
    }

    pub fn boom_score(&self) -> f64 {
        match self.detail {
            ProjectionDetail::WithBoomBust { boom_score, .. } => boom_score,
            ProjectionDetail::Basic => 0.0,
        }
    }

    pub fn bust_score(&self) -> f64 {
        match self.detail {
            ProjectionDetail::WithBoomBust { bust_score, .. } => bust_score,
            ProjectionDetail::Basic => 0.0,
        }
    }

    pub fn boom_percentage(&self) -> f64 {
        match self.detail {
            ProjectionDetail::WithBoomBust {
                boom_percentage, ..
            } => boom_percentage,
            ProjectionDetail::Basic => 0.0,
        }
    }

    pub fn bust_percentage(&self) -> f64 {
        match self.detail {
            ProjectionDetail::WithBoomBust {
                bust_percentage, ..
            } => bust_percentage,
            ProjectionDetail::Basic => 0.0,
        }
    }

    /// Probability-weighted blend of the bust, projected and boom bands.
    ///
    /// The bust and boom percentages weight the outer bands; whatever
    /// probability remains goes to the point projection. Percentages that sum
    /// past 100 push the middle weight negative rather than failing.
    pub fn risk_adjusted_score(&self) -> f64 {
        match self.detail {
            ProjectionDetail::Basic => self.projected_score,
            ProjectionDetail::WithBoomBust {
                bust_score,
                boom_score,
                bust_percentage,
                boom_percentage,
            } => {
                let normal_probability = 100.0 - bust_percentage - boom_percentage;
                bust_score * (bust_percentage / 100.0)
                    + self.projected_score * (normal_probability / 100.0)
                    + boom_score * (boom_percentage / 100.0)
            }
        }
    }

    /// Points available above the projection in a boom outcome (0 without
    /// boom data).
    pub fn upside_potential(&self) -> f64 {
        match self.detail {
            ProjectionDetail::WithBoomBust { boom_score, .. } if boom_score != 0.0 => {
                boom_score - self.projected_score
            }
            _ => 0.0,
        }
    }

    /// Player-level score under the given metric. Boom falls back to the
    /// projection for players without boom data.
    pub fn score(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Projected => self.projected_score,
            Metric::RiskAdjusted => self.risk_adjusted_score(),
            Metric::BoomScore => match self.detail {
                ProjectionDetail::WithBoomBust { boom_score, .. } => boom_score,
                ProjectionDetail::Basic => self.projected_score,
            },
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {}, ${})", self.name, self.position, self.team, self.salary)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
