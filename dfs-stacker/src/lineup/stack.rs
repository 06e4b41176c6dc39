// Stack discovery: same-team QB + pass-catcher anchors for lineup search.

use std::fmt;

use tracing::{debug, info};

use crate::config::StackSettings;
use crate::roster::player::{Metric, Player, Position};
use crate::roster::pool::PlayerPool;

/// A QB paired with a same-team WR or TE. Identity is the name pair.
#[derive(Debug, Clone, Copy)]
pub struct Stack<'a> {
    pub qb: &'a Player,
    pub partner: &'a Player,
}

impl PartialEq for Stack<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.qb.name == other.qb.name && self.partner.name == other.partner.name
    }
}

impl Eq for Stack<'_> {}

impl<'a> Stack<'a> {
    pub fn salary(&self) -> u32 {
        self.qb.salary + self.partner.salary
    }

    pub fn score(&self, metric: Metric) -> f64 {
        self.qb.score(metric) + self.partner.score(metric)
    }

    /// Sum of both players' points per $1000.
    pub fn value(&self) -> f64 {
        self.qb.value() + self.partner.value()
    }

    /// WR stacks start at 0.8, TE stacks at 0.6, raised by the pair's
    /// combined boom percentage; capped at 1.
    pub fn correlation(&self) -> f64 {
        let base = if self.partner.position == Position::WideReceiver {
            0.8
        } else {
            0.6
        };
        let boom = (self.qb.boom_percentage() + self.partner.boom_percentage()) / 200.0;
        (base + boom).min(1.0)
    }
}

impl fmt::Display for Stack<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} + {} {} (${})",
            self.qb.name,
            self.partner.position,
            self.partner.name,
            self.salary()
        )
    }
}

/// Descending by key, then by name pair so equal keys order the same way
/// every run.
fn sort_desc_by<'a>(stacks: &mut [Stack<'a>], key: impl Fn(&Stack<'a>) -> f64) {
    stacks.sort_by(|a, b| {
        key(b)
            .partial_cmp(&key(a))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.qb.name.cmp(&b.qb.name))
            .then_with(|| a.partner.name.cmp(&b.partner.name))
    });
}

#[derive(Debug, Clone, Copy)]
pub struct StackFinder {
    pub metric: Metric,
    pub settings: StackSettings,
}

impl StackFinder {
    pub fn new(metric: Metric, settings: StackSettings) -> Self {
        StackFinder { metric, settings }
    }

    /// Every same-team QB/WR and QB/TE pair inside the salary band.
    pub fn candidates<'a>(&self, pool: &'a PlayerPool) -> Vec<Stack<'a>> {
        let catchers = pool
            .at(Position::WideReceiver)
            .iter()
            .chain(pool.at(Position::TightEnd));
        let catchers: Vec<&Player> = catchers.collect();

        let mut stacks = Vec::new();
        for qb in pool.at(Position::Quarterback) {
            for &partner in catchers.iter().filter(|p| p.team == qb.team) {
                let stack = Stack { qb, partner };
                let salary = stack.salary();
                if salary >= self.settings.min_salary && salary <= self.settings.max_salary {
                    stacks.push(stack);
                }
            }
        }
        stacks
    }

    /// Pick `count` distinct stacks: the top half by score, then the best
    /// by value, backfilling from the value ranking. Fewer come back only
    /// when the pool has fewer qualifying pairs.
    pub fn find<'a>(&self, pool: &'a PlayerPool) -> Vec<Stack<'a>> {
        let count = self.settings.count;
        let mut by_score = self.candidates(pool);
        debug!("{} stacks inside the salary band", by_score.len());

        let mut by_value = by_score.clone();
        let metric = self.metric;
        sort_desc_by(&mut by_score, |s| s.score(metric));
        sort_desc_by(&mut by_value, Stack::value);

        let mut selected: Vec<Stack<'a>> = by_score.iter().take(count / 2).copied().collect();
        for stack in by_value {
            if selected.len() >= count {
                break;
            }
            if !selected.contains(&stack) {
                selected.push(stack);
            }
        }

        for stack in &selected {
            info!(
                "stack {}: {:.2} pts, {:.2} value, {:.2} correlation",
                stack,
                stack.score(metric),
                stack.value(),
                stack.correlation()
            );
        }
        selected
    }
}

/// Four stacks from the given salary band.
pub fn find_optimal_stacks(
    pool: &PlayerPool,
    metric: Metric,
    min_salary: u32,
    max_salary: u32,
) -> Vec<Stack<'_>> {
    StackFinder::new(
        metric,
        StackSettings {
            min_salary,
            max_salary,
            count: 4,
        },
    )
    .find(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{named, synthetic_pool};

    #[test]
    fn candidates_respect_team_and_band() {
        let pool = synthetic_pool();
        let finder = StackFinder::new(Metric::Projected, StackSettings::default());
        let stacks = finder.candidates(&pool);
        assert!(!stacks.is_empty());
        for s in &stacks {
            assert_eq!(s.qb.team, s.partner.team);
            assert!(s.partner.position.is_pass_catcher());
            assert!((10_000..=15_000).contains(&s.salary()));
        }
        // DET QB ($7,550) + DET WR1 ($7,500) is $15,050: out of band.
        assert!(!stacks
            .iter()
            .any(|s| s.qb.name == "DET QB" && s.partner.name == "DET WR1"));
    }

    #[test]
    fn selects_top_by_score_then_by_value() {
        let pool = synthetic_pool();
        let stacks = find_optimal_stacks(&pool, Metric::Projected, 10_000, 15_000);
        assert_eq!(stacks.len(), 4);

        let finder = StackFinder::new(Metric::Projected, StackSettings::default());
        let mut by_score = finder.candidates(&pool);
        sort_desc_by(&mut by_score, |s| s.score(Metric::Projected));
        assert_eq!(stacks[0], by_score[0]);
        assert_eq!(stacks[1], by_score[1]);

        for (i, a) in stacks.iter().enumerate() {
            for b in &stacks[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn selection_is_deterministic() {
        let pool = synthetic_pool();
        let first = find_optimal_stacks(&pool, Metric::Projected, 10_000, 15_000);
        let second = find_optimal_stacks(&pool, Metric::Projected, 10_000, 15_000);
        assert_eq!(first, second);
    }

    #[test]
    fn in_band_top_pair_is_selected() {
        // One QB per team, three WRs per team; the $7,000 QB with its $6,000
        // WR is the highest-scoring pair in band.
        let mut players = Vec::new();
        for (i, team) in ["AAA", "BBB", "CCC", "DDD", "EEE"].iter().enumerate() {
            let qb_salary = if i == 0 { 7000 } else { 6000 - 100 * i as u32 };
            let qb_points = if i == 0 { 24.0 } else { 17.0 };
            players.push(Player::new(format!("{team} QB"), Position::Quarterback, *team, "ZZZ", qb_salary, qb_points));
            for (n, salary) in [6000u32, 5000, 4000].iter().enumerate() {
                let points = if i == 0 && n == 0 { 20.0 } else { 10.0 };
                players.push(Player::new(
                    format!("{team} WR{}", n + 1),
                    Position::WideReceiver,
                    *team,
                    "ZZZ",
                    *salary,
                    points,
                ));
            }
        }
        let pool = PlayerPool::new(players);
        let stacks = find_optimal_stacks(&pool, Metric::Projected, 10_000, 15_000);
        let expected = Stack {
            qb: named(&pool, "AAA QB"),
            partner: named(&pool, "AAA WR1"),
        };
        assert_eq!(expected.salary(), 13_000);
        assert!(stacks.contains(&expected));
    }

    #[test]
    fn thin_pool_returns_fewer_stacks() {
        let pool = PlayerPool::new(vec![
            Player::new("Solo QB", Position::Quarterback, "AAA", "BBB", 7000, 20.0),
            Player::new("Solo WR", Position::WideReceiver, "AAA", "BBB", 6000, 15.0),
            Player::new("Other WR", Position::WideReceiver, "BBB", "AAA", 6000, 15.0),
        ]);
        let stacks = find_optimal_stacks(&pool, Metric::Projected, 10_000, 15_000);
        assert_eq!(stacks.len(), 1);
    }

    #[test]
    fn correlation_prefers_receivers() {
        let pool = synthetic_pool();
        let wr = Stack {
            qb: named(&pool, "KC QB"),
            partner: named(&pool, "KC WR1"),
        };
        let te = Stack {
            qb: named(&pool, "KC QB"),
            partner: named(&pool, "KC TE1"),
        };
        assert!((wr.correlation() - 0.8).abs() < 1e-9);
        assert!((te.correlation() - 0.6).abs() < 1e-9);
    }
}
