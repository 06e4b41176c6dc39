// Module: end-to-end lineup generation.
//
// Stacks -> per-stack random search -> merge -> local optimization ->
// ownership balancing. One RNG drives the whole run so a seed reproduces
// a batch exactly.

use std::cmp::Ordering;
use std::fmt;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::config::{Config, StrategyConfig};
use crate::lineup::builder::LineupBuilder;
use crate::lineup::lineup::Lineup;
use crate::lineup::optimizer::LineupOptimizer;
use crate::lineup::ownership::OwnershipBalancer;
use crate::lineup::scoring::QualityScorer;
use crate::lineup::stack::StackFinder;
use crate::lineup::validator::LineupRules;
use crate::roster::player::Metric;
use crate::roster::pool::PlayerPool;

/// Seeded when a seed is configured, otherwise from OS entropy.
pub fn make_rng(seed: Option<u64>) -> SmallRng {
    match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    }
}

#[derive(Debug, Clone)]
pub struct LineupGenerator<'p> {
    pool: &'p PlayerPool,
    scorer: QualityScorer,
    strategy: StrategyConfig,
}

impl<'p> LineupGenerator<'p> {
    pub fn new(pool: &'p PlayerPool, rules: LineupRules, strategy: StrategyConfig) -> Self {
        let scorer = QualityScorer::new(strategy.metric, rules).with_weights(strategy.weights);
        LineupGenerator {
            pool,
            scorer,
            strategy,
        }
    }

    pub fn from_config(pool: &'p PlayerPool, config: &Config) -> Self {
        Self::new(pool, config.contest, config.strategy.clone())
    }

    pub fn scorer(&self) -> QualityScorer {
        self.scorer
    }

    /// Generate `strategy.num_lineups` lineups, rounded down to a multiple
    /// of the stack count. Empty when too few stacks qualify.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Lineup<'p>> {
        let s = &self.strategy;
        let stacks = StackFinder::new(s.metric, s.stacks).find(self.pool);
        if stacks.len() < s.stacks.count {
            warn!(
                "found {} qualifying stacks, need {}; no lineups generated",
                stacks.len(),
                s.stacks.count
            );
            return Vec::new();
        }

        let per_stack = s.num_lineups / s.stacks.count;
        if per_stack == 0 {
            warn!(
                "{} lineups cannot be split across {} stacks",
                s.num_lineups, s.stacks.count
            );
            return Vec::new();
        }
        if s.num_lineups % s.stacks.count != 0 {
            warn!(
                "{} is not divisible by {}; generating {} lineups",
                s.num_lineups,
                s.stacks.count,
                per_stack * s.stacks.count
            );
        }
        info!(
            "generating {} lineups ({} per stack, searching {} each)",
            per_stack * s.stacks.count,
            per_stack,
            per_stack * s.search.oversample
        );

        let builder = LineupBuilder::new(self.pool, self.scorer, s.pools, s.search.max_attempts);
        let mut lineups = Vec::with_capacity(per_stack * stacks.len());
        for (i, stack) in stacks.iter().enumerate() {
            let mut found = builder.generate_lineup_from_stack(stack, per_stack * s.search.oversample, rng);
            self.sort_by_quality(&mut found);
            found.truncate(per_stack);
            info!("stack {} ({}): {} lineups", i + 1, stack, found.len());
            if found.len() < per_stack {
                warn!("stack {} produced {} of {} lineups", i + 1, found.len(), per_stack);
            }
            lineups.extend(found);
        }
        self.sort_by_quality(&mut lineups);

        let optimizer = LineupOptimizer::new(self.pool, self.scorer, s.optimizer);
        let optimized = optimizer.optimize_all(&lineups);

        OwnershipBalancer::new(self.pool, self.scorer, s.ownership).balance(optimized)
    }

    fn sort_by_quality(&self, lineups: &mut [Lineup<'p>]) {
        lineups.sort_by(|a, b| {
            self.scorer
                .score(b)
                .partial_cmp(&self.scorer.score(a))
                .unwrap_or(Ordering::Equal)
        });
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TopLineup {
    pub rank: usize,
    pub primary: f64,
    pub salary: u32,
    pub quality: f64,
    pub stack: String,
}

/// Batch-level averages plus the best few lineups.
#[derive(Debug, Clone, PartialEq)]
pub struct LineupSummary {
    pub metric: Metric,
    pub count: usize,
    pub avg_primary: f64,
    pub avg_salary: f64,
    pub avg_teams: f64,
    pub avg_quality: f64,
    pub top: Vec<TopLineup>,
}

impl LineupSummary {
    pub const TOP: usize = 5;

    pub fn from_lineups(lineups: &[Lineup<'_>], scorer: &QualityScorer) -> Self {
        let count = lineups.len();
        let top = lineups
            .iter()
            .take(Self::TOP)
            .enumerate()
            .map(|(i, l)| TopLineup {
                rank: i + 1,
                primary: scorer.primary_score(l),
                salary: l.salary(),
                quality: scorer.score(l),
                stack: match l.stack_partner() {
                    Some(partner) => format!("{} + {}", l.qb().name, partner.name),
                    None => "-".to_string(),
                },
            })
            .collect();

        LineupSummary {
            metric: scorer.metric,
            count,
            avg_primary: mean(lineups.iter().map(|l| scorer.primary_score(l))),
            avg_salary: mean(lineups.iter().map(|l| l.salary() as f64)),
            avg_teams: mean(lineups.iter().map(|l| l.team_count() as f64)),
            avg_quality: mean(lineups.iter().map(|l| scorer.score(l))),
            top,
        }
    }
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        0.0
    } else {
        values.sum::<f64>() / n as f64
    }
}

impl fmt::Display for LineupSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} lineups ({})", self.count, self.metric)?;
        writeln!(f, "  avg {:<20} {:.2}", self.metric.column_label(), self.avg_primary)?;
        writeln!(f, "  avg salary           ${:.0}", self.avg_salary)?;
        writeln!(f, "  avg teams            {:.2}", self.avg_teams)?;
        writeln!(f, "  avg quality          {:.3}", self.avg_quality)?;
        for t in &self.top {
            writeln!(
                f,
                "  #{:<2} {:>7.2} pts  ${:<6} quality {:.3}  {}",
                t.rank, t.primary, t.salary, t.quality, t.stack
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{known_lineup, synthetic_pool};

    fn strategy(num_lineups: usize, seed: u64) -> StrategyConfig {
        let mut s = StrategyConfig::default();
        s.num_lineups = num_lineups;
        s.search.max_attempts = 20_000;
        s.search.seed = Some(seed);
        s
    }

    #[test]
    fn generates_valid_balanced_batch() {
        let pool = synthetic_pool();
        let rules = LineupRules::default();
        let generator = LineupGenerator::new(&pool, rules, strategy(8, 3));
        let lineups = generator.generate(&mut make_rng(Some(3)));

        assert!(!lineups.is_empty());
        assert!(lineups.len() <= 8);
        for l in &lineups {
            assert!(rules.is_valid(l), "{l}");
        }
        for pair in lineups.windows(2) {
            assert!(pair[0].projected_score() >= pair[1].projected_score());
        }
    }

    #[test]
    fn same_seed_same_batch() {
        let pool = synthetic_pool();
        let rules = LineupRules::default();
        let generator = LineupGenerator::new(&pool, rules, strategy(4, 9));
        let a: Vec<_> = generator.generate(&mut make_rng(Some(9))).iter().map(|l| l.roster_key()).collect();
        let b: Vec<_> = generator.generate(&mut make_rng(Some(9))).iter().map(|l| l.roster_key()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn too_few_stacks_yields_nothing() {
        let pool = synthetic_pool();
        let mut s = strategy(8, 1);
        // A band no QB + pass-catcher pair reaches.
        s.stacks.min_salary = 30_000;
        s.stacks.max_salary = 31_000;
        let generator = LineupGenerator::new(&pool, LineupRules::default(), s);
        assert!(generator.generate(&mut make_rng(Some(1))).is_empty());
    }

    #[test]
    fn fewer_lineups_than_stacks_yields_nothing() {
        let pool = synthetic_pool();
        let generator = LineupGenerator::new(&pool, LineupRules::default(), strategy(3, 1));
        assert!(generator.generate(&mut make_rng(Some(1))).is_empty());
    }

    #[test]
    fn summary_averages_and_top() {
        let pool = synthetic_pool();
        let lineup = known_lineup(&pool);
        let scorer = QualityScorer::new(Metric::Projected, LineupRules::default());
        let summary = LineupSummary::from_lineups(&[lineup, lineup], &scorer);
        assert_eq!(summary.count, 2);
        assert!((summary.avg_salary - 49_450.0).abs() < 1e-9);
        assert!((summary.avg_teams - 7.0).abs() < 1e-9);
        assert_eq!(summary.top.len(), 2);
        assert_eq!(summary.top[0].stack, "KC QB + KC WR1");
        assert!(summary.to_string().contains("2 lineups"));

        let empty = LineupSummary::from_lineups(&[], &scorer);
        assert_eq!(empty.avg_primary, 0.0);
        assert!(empty.top.is_empty());
    }
}
