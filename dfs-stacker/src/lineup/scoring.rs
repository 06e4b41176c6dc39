// Composite lineup quality score used to rank and keep lineups.

use serde::{Deserialize, Serialize};

use crate::lineup::lineup::{Lineup, Slot};
use crate::lineup::validator::LineupRules;
use crate::roster::player::{Metric, Position};

/// Term weights for the quality score (`[scoring]` in strategy.toml).
///
/// | term        | raw scale                         | default weight |
/// |-------------|-----------------------------------|----------------|
/// | primary     | lineup points (~100-200)          | 0.65           |
/// | utilization | salary / cap, clamped to [0, 1]   | 15.0           |
/// | efficiency  | points per $10k (~20-40)          | 0.05           |
/// | diversity   | team-count lookup in [0, 1]       | 0.05           |
/// | flex        | FLEX position lookup in [0, 1]    | 0.05           |
/// | upside      | boom gap and boom % in [0, 1]     | 0.05           |
///
/// Utilization is a flat bonus of up to 15 points rather than a
/// fraction of the total; the other 0-1 terms contribute at most 0.05
/// each and effectively act as tie-breakers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub primary: f64,
    pub utilization: f64,
    pub efficiency: f64,
    pub diversity: f64,
    pub flex: f64,
    pub upside: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            primary: 0.65,
            utilization: 15.0,
            efficiency: 0.05,
            diversity: 0.05,
            flex: 0.05,
            upside: 0.05,
        }
    }
}

impl ScoreWeights {
    pub fn as_pairs(&self) -> [(&'static str, f64); 6] {
        [
            ("primary", self.primary),
            ("utilization", self.utilization),
            ("efficiency", self.efficiency),
            ("diversity", self.diversity),
            ("flex", self.flex),
            ("upside", self.upside),
        ]
    }
}

/// 6-7 teams scores best; heavier concentration or spread scores lower.
pub fn team_diversity_score(team_count: usize) -> f64 {
    match team_count {
        4 => 0.3,
        5 => 0.7,
        6 | 7 => 1.0,
        8 => 0.7,
        9 => 0.3,
        _ => 0.0,
    }
}

pub fn flex_position_quality(position: Position) -> f64 {
    match position {
        Position::WideReceiver => 1.0,
        Position::RunningBack => 0.7,
        Position::TightEnd => 0.6,
        _ => 0.5,
    }
}

/// Blend of the average boom gap (per 10 points) and average boom
/// percentage, clamped to [0, 1].
pub fn upside_potential_score(lineup: &Lineup<'_>) -> f64 {
    let score = (lineup.avg_upside() / 10.0) * 0.7 + (lineup.avg_boom_percentage() / 100.0) * 0.3;
    score.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy)]
pub struct QualityScorer {
    pub metric: Metric,
    pub rules: LineupRules,
    pub weights: ScoreWeights,
}

impl QualityScorer {
    pub fn new(metric: Metric, rules: LineupRules) -> Self {
        QualityScorer {
            metric,
            rules,
            weights: ScoreWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn primary_score(&self, lineup: &Lineup<'_>) -> f64 {
        lineup.primary_score(self.metric)
    }

    /// Quality score; 0 for any lineup that breaks a rule.
    pub fn score(&self, lineup: &Lineup<'_>) -> f64 {
        if !self.rules.is_valid(lineup) {
            return 0.0;
        }
        let w = &self.weights;
        let primary = self.primary_score(lineup);
        let salary = lineup.salary() as f64;

        let utilization = (salary / self.rules.salary_cap as f64).min(1.0);
        let efficiency = if salary > 0.0 {
            primary / salary * 10_000.0
        } else {
            0.0
        };
        let diversity = team_diversity_score(lineup.team_count());
        let flex = flex_position_quality(lineup.player(Slot::Flex).position);
        let upside = upside_potential_score(lineup);

        primary * w.primary
            + utilization * w.utilization
            + efficiency * w.efficiency
            + diversity * w.diversity
            + flex * w.flex
            + upside * w.upside
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineup::validator::Violation;
    use crate::roster::player::Player;
    use crate::testutil::{known_lineup, named, synthetic_pool};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn diversity_lookup_peaks_at_six_and_seven() {
        assert_eq!(team_diversity_score(3), 0.0);
        assert_eq!(team_diversity_score(4), 0.3);
        assert_eq!(team_diversity_score(5), 0.7);
        assert_eq!(team_diversity_score(6), 1.0);
        assert_eq!(team_diversity_score(7), 1.0);
        assert_eq!(team_diversity_score(8), 0.7);
        assert_eq!(team_diversity_score(9), 0.3);
        assert_eq!(team_diversity_score(10), 0.0);
    }

    #[test]
    fn score_matches_weighted_sum() {
        let pool = synthetic_pool();
        let lineup = known_lineup(&pool);
        let scorer = QualityScorer::new(Metric::Projected, LineupRules::default());

        let primary = lineup.projected_score();
        let expected = primary * 0.65
            + (49_450.0 / 50_000.0) * 15.0
            + primary / 49_450.0 * 10_000.0 * 0.05
            + 1.0 * 0.05 // seven teams
            + 1.0 * 0.05 // WR in FLEX
            + 0.0; // no boom data
        assert!(approx_eq(scorer.score(&lineup), expected));
    }

    #[test]
    fn invalid_lineup_scores_zero() {
        let pool = synthetic_pool();
        let lineup = known_lineup(&pool);
        let rules = LineupRules::default();
        let scorer = QualityScorer::new(Metric::Projected, rules);

        let three_teams = [
            "KC QB", "BUF RB1", "CIN RB3", "KC WR1", "BUF WR2", "CIN WR4", "BUF TE1", "CIN WR3",
            "KC DST",
        ]
        .map(|n| named(&pool, n));

        let cases = [
            // Punt RB out for an RB1: over the cap.
            lineup.with_slot_replaced(Slot::Rb2, named(&pool, "DAL RB1")),
            lineup.with_slot_replaced(Slot::Rb1, named(&pool, "DET RB3")),
            lineup.with_slot_replaced(Slot::Rb2, named(&pool, "BUF RB3")),
            lineup.with_slot_replaced(Slot::Flex, named(&pool, "PHI WR3")),
            Lineup::new(three_teams, Some(Slot::Wr1)),
            lineup.with_slot_replaced(Slot::Wr2, named(&pool, "KC WR2")),
        ];
        let violations: Vec<Violation> = cases.iter().filter_map(|l| rules.check(l).err()).collect();
        assert_eq!(violations.len(), cases.len());
        assert!(matches!(violations[0], Violation::OverCap { .. }));
        assert!(matches!(violations[1], Violation::UnderFloor { salary: 45_050, .. }));
        assert!(matches!(violations[2], Violation::NoPuntPlayer { threshold: 4_000 }));
        assert_eq!(violations[3], Violation::DuplicatePlayer("PHI WR3".into()));
        assert!(matches!(violations[4], Violation::TooFewTeams { found: 3, required: 4 }));
        assert!(matches!(violations[5], Violation::TeamOverloaded { count: 4, .. }));

        for broken in &cases {
            assert!(!rules.is_valid(broken));
            assert_eq!(scorer.score(broken), 0.0, "{broken}");
        }
    }

    #[test]
    fn upside_score_is_clamped() {
        let pool = synthetic_pool();
        let lineup = known_lineup(&pool);
        assert_eq!(upside_potential_score(&lineup), 0.0);

        let boomers: Vec<Player> = lineup
            .players()
            .iter()
            .map(|p| {
                let base = p.projected_score;
                (*p).clone().with_boom_bust(base * 0.5, base + 40.0, 10.0, 90.0)
            })
            .collect();
        let boomed = Lineup::new(std::array::from_fn(|i| &boomers[i]), lineup.stack_slot());
        assert_eq!(upside_potential_score(&boomed), 1.0);
    }

    #[test]
    fn custom_weights_apply() {
        let pool = synthetic_pool();
        let lineup = known_lineup(&pool);
        let weights = ScoreWeights {
            primary: 1.0,
            utilization: 0.0,
            efficiency: 0.0,
            diversity: 0.0,
            flex: 0.0,
            upside: 0.0,
        };
        let scorer = QualityScorer::new(Metric::Projected, LineupRules::default()).with_weights(weights);
        assert!(approx_eq(scorer.score(&lineup), lineup.projected_score()));
    }
}
