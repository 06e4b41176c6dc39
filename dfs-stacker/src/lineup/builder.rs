// Randomized lineup construction around a stack anchor.
//
// Each position draws from a small pre-filtered candidate pool; every trial
// is validated and the best distinct lineups are retained.

use std::collections::HashSet;

use rand::Rng;
use tracing::{debug, warn};

use crate::config::PoolSettings;
use crate::lineup::lineup::{Lineup, Slot};
use crate::lineup::scoring::QualityScorer;
use crate::lineup::stack::Stack;
use crate::roster::player::{Metric, Player, Position};
use crate::roster::pool::PlayerPool;

// ---------------------------------------------------------------------------
// Candidate pools
// ---------------------------------------------------------------------------

/// Players one position may draw from.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool<'a> {
    players: Vec<&'a Player>,
}

/// Descending by metric score, salary breaking ties.
fn by_score_then_salary(metric: Metric) -> impl Fn(&&Player, &&Player) -> std::cmp::Ordering {
    move |a, b| {
        b.score(metric)
            .partial_cmp(&a.score(metric))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.salary.cmp(&a.salary))
    }
}

impl<'a> CandidatePool<'a> {
    /// Keep the `top_k` best by (score, salary), then merge the `merge_k`
    /// best by score with the `merge_k` best by value, by name. Falls back to
    /// the whole pre-filtered list when the merge leaves fewer than
    /// `min_size`.
    pub fn build(
        players: impl IntoIterator<Item = &'a Player>,
        metric: Metric,
        top_k: usize,
        merge_k: usize,
        min_size: usize,
    ) -> Self {
        let mut prefiltered: Vec<&'a Player> = players.into_iter().collect();
        prefiltered.sort_by(by_score_then_salary(metric));
        prefiltered.truncate(top_k);

        let mut by_value = prefiltered.clone();
        by_value.sort_by(|a, b| {
            b.value()
                .partial_cmp(&a.value())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut seen = HashSet::new();
        let merged: Vec<&'a Player> = prefiltered
            .iter()
            .take(merge_k)
            .chain(by_value.iter().take(merge_k))
            .copied()
            .filter(|p| seen.insert(p.name.as_str()))
            .collect();

        if merged.len() < min_size {
            CandidatePool {
                players: prefiltered,
            }
        } else {
            CandidatePool { players: merged }
        }
    }

    pub fn from_players(players: Vec<&'a Player>) -> Self {
        CandidatePool { players }
    }

    pub fn players(&self) -> &[&'a Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&'a Player> {
        if self.players.is_empty() {
            return None;
        }
        Some(self.players[rng.random_range(0..self.players.len())])
    }

    /// `N` distinct players, uniformly without replacement.
    pub fn sample<R: Rng + ?Sized, const N: usize>(&self, rng: &mut R) -> Option<[&'a Player; N]> {
        if self.players.len() < N {
            return None;
        }
        let picks = rand::seq::index::sample(rng, self.players.len(), N);
        let mut out = [self.players[0]; N];
        for (slot, idx) in out.iter_mut().zip(picks.iter()) {
            *slot = self.players[idx];
        }
        Some(out)
    }
}

/// Working pools for one stack.
#[derive(Debug, Clone)]
pub struct StackCandidates<'a> {
    pub rbs: CandidatePool<'a>,
    pub wrs: CandidatePool<'a>,
    pub tes: CandidatePool<'a>,
    pub dsts: CandidatePool<'a>,
}

impl<'a> StackCandidates<'a> {
    /// Both stack members are excluded everywhere; defenses facing the
    /// stack QB are excluded.
    pub fn for_stack(pool: &'a PlayerPool, stack: &Stack<'a>, metric: Metric, cfg: &PoolSettings) -> Self {
        let not_stacked = |p: &&'a Player| p.name != stack.qb.name && p.name != stack.partner.name;
        let rbs = CandidatePool::build(
            pool.at(Position::RunningBack).iter().filter(not_stacked),
            metric,
            cfg.rb_top,
            cfg.merge_top,
            cfg.min_skill_pool,
        );
        let wrs = CandidatePool::build(
            pool.at(Position::WideReceiver).iter().filter(not_stacked),
            metric,
            cfg.wr_top,
            cfg.merge_top,
            cfg.min_skill_pool,
        );
        let tes = CandidatePool::build(
            pool.at(Position::TightEnd).iter().filter(not_stacked),
            metric,
            cfg.te_top,
            cfg.merge_top,
            cfg.min_thin_pool,
        );

        let mut dst_top: Vec<&'a Player> = pool.at(Position::Defense).iter().collect();
        dst_top.sort_by(by_score_then_salary(metric));
        dst_top.truncate(cfg.dst_top);
        let dsts = CandidatePool::build(
            dst_top.into_iter().filter(|d| d.team != stack.qb.opponent),
            metric,
            cfg.dst_top,
            cfg.merge_top,
            cfg.min_thin_pool,
        );

        StackCandidates { rbs, wrs, tes, dsts }
    }

    /// Why no lineup can be drawn, if that is the case.
    pub fn shortfall(&self, partner: Position) -> Option<&'static str> {
        if self.rbs.len() < 2 {
            Some("fewer than 2 running backs")
        } else if self.wrs.len() < 3 {
            Some("fewer than 3 wide receivers")
        } else if partner != Position::TightEnd && self.tes.is_empty() {
            Some("no tight ends")
        } else if self.dsts.is_empty() {
            Some("no eligible defenses")
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct LineupBuilder<'p> {
    pool: &'p PlayerPool,
    scorer: QualityScorer,
    pools: PoolSettings,
    max_attempts: usize,
}

impl<'p> LineupBuilder<'p> {
    pub fn new(pool: &'p PlayerPool, scorer: QualityScorer, pools: PoolSettings, max_attempts: usize) -> Self {
        LineupBuilder {
            pool,
            scorer,
            pools,
            max_attempts,
        }
    }

    /// Up to `num_lineups` distinct valid lineups built on `stack`, best
    /// quality first. Empty when the pool cannot fill the roster or no
    /// trial within the attempt budget passes validation.
    pub fn generate_lineup_from_stack<R: Rng + ?Sized>(
        &self,
        stack: &Stack<'p>,
        num_lineups: usize,
        rng: &mut R,
    ) -> Vec<Lineup<'p>> {
        let metric = self.scorer.metric;
        let rules = self.scorer.rules;
        let cands = StackCandidates::for_stack(self.pool, stack, metric, &self.pools);
        if let Some(reason) = cands.shortfall(stack.partner.position) {
            warn!("cannot build around {}: {}", stack, reason);
            return Vec::new();
        }
        if num_lineups == 0 {
            return Vec::new();
        }

        let mut kept: Vec<Lineup<'p>> = Vec::with_capacity(num_lineups);
        let mut keys: HashSet<Vec<&'p str>> = HashSet::new();
        let mut flex_buf: Vec<&'p Player> = Vec::with_capacity(self.pools.flex_window);
        let mut valid = 0usize;
        let mut duplicates = 0usize;

        for _ in 0..self.max_attempts {
            let Some(players) = self.draw(stack, &cands, &mut flex_buf, rng) else {
                continue;
            };
            if rules.check_players(&players).is_err() {
                continue;
            }
            valid += 1;

            let stack_slot = Slot::ALL
                .iter()
                .copied()
                .find(|&s| s != Slot::Qb && players[s.index()].name == stack.partner.name);
            let lineup = Lineup::new(players, stack_slot);
            let key = lineup.roster_key();
            if keys.contains(&key) {
                duplicates += 1;
                continue;
            }

            if kept.len() < num_lineups {
                keys.insert(key);
                kept.push(lineup);
                continue;
            }

            let (worst_idx, worst_score) = kept
                .iter()
                .enumerate()
                .map(|(i, l)| (i, l.primary_score(metric)))
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .unwrap_or((0, f64::INFINITY));
            if lineup.primary_score(metric) > worst_score {
                keys.remove(&kept[worst_idx].roster_key());
                keys.insert(key);
                kept[worst_idx] = lineup;
            }
        }

        debug!(
            "{}: {} valid trials of {}, {} duplicates, kept {}",
            stack,
            valid,
            self.max_attempts,
            duplicates,
            kept.len()
        );
        if kept.is_empty() {
            warn!("no valid lineup found for {} in {} attempts", stack, self.max_attempts);
        }

        let scorer = self.scorer;
        kept.sort_by(|a, b| {
            scorer
                .score(b)
                .partial_cmp(&scorer.score(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        kept
    }

    /// One random trial in slot order.
    fn draw<R: Rng + ?Sized>(
        &self,
        stack: &Stack<'p>,
        cands: &StackCandidates<'p>,
        flex_buf: &mut Vec<&'p Player>,
        rng: &mut R,
    ) -> Option<[&'p Player; 9]> {
        let metric = self.scorer.metric;
        let [rb1, rb2] = cands.rbs.sample::<R, 2>(rng)?;
        let mut wrs = cands.wrs.sample::<R, 3>(rng)?;
        let drawn_te = cands.tes.choose(rng);
        let dst = cands.dsts.choose(rng)?;

        let partner_is_wr = stack.partner.position == Position::WideReceiver;

        // FLEX candidates, in preference order, from players not drawn above.
        flex_buf.clear();
        let window = self.pools.flex_window;
        let unused_wr = |p: &&&'p Player| !wrs.iter().any(|w| w.name == p.name);
        let unused_rb = |p: &&&'p Player| p.name != rb1.name && p.name != rb2.name;
        let unused_te = |p: &&&'p Player| drawn_te.is_none_or(|t| t.name != p.name);
        if partner_is_wr {
            let lead_te = cands.tes.players().iter().find(unused_te).copied();
            let rest = cands
                .wrs
                .players()
                .iter()
                .filter(unused_wr)
                .chain(cands.rbs.players().iter().filter(unused_rb))
                .chain(
                    cands
                        .tes
                        .players()
                        .iter()
                        .filter(unused_te)
                        .filter(|p| lead_te.is_none_or(|l| l.name != p.name)),
                )
                .copied();
            flex_buf.extend(lead_te.into_iter().chain(rest).take(window));
        } else {
            let rest = cands
                .wrs
                .players()
                .iter()
                .filter(unused_wr)
                .chain(cands.rbs.players().iter().filter(unused_rb))
                .copied();
            flex_buf.extend(rest.take(window));
        }
        if flex_buf.is_empty() {
            return None;
        }
        let flex = flex_buf[rng.random_range(0..flex_buf.len())];

        let te = if partner_is_wr {
            // Lowest-scoring drawn WR gives way to the partner; ties go to
            // the later slot.
            let mut low = 0;
            for i in 1..3 {
                if wrs[i].score(metric) <= wrs[low].score(metric) {
                    low = i;
                }
            }
            wrs[low] = stack.partner;
            drawn_te?
        } else {
            stack.partner
        };

        Some([stack.qb, rb1, rb2, wrs[0], wrs[1], wrs[2], te, flex, dst])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineup::validator::LineupRules;
    use crate::testutil::{named, synthetic_pool};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn builder(pool: &PlayerPool, attempts: usize) -> LineupBuilder<'_> {
        let scorer = QualityScorer::new(Metric::Projected, LineupRules::default());
        LineupBuilder::new(pool, scorer, PoolSettings::default(), attempts)
    }

    fn kc_wr_stack(pool: &PlayerPool) -> Stack<'_> {
        Stack {
            qb: named(pool, "KC QB"),
            partner: named(pool, "KC WR2"),
        }
    }

    #[test]
    fn candidate_pool_merges_score_and_value_lists() {
        let pool = synthetic_pool();
        let wrs = CandidatePool::build(pool.at(Position::WideReceiver).iter(), Metric::Projected, 30, 5, 5);
        // Top five by score plus top five by value, deduplicated.
        assert!(wrs.len() >= 5 && wrs.len() <= 10);
        let names: HashSet<&str> = wrs.players().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names.len(), wrs.len());
    }

    #[test]
    fn candidate_pool_falls_back_when_small() {
        let pool = synthetic_pool();
        let tes = CandidatePool::build(pool.at(Position::TightEnd).iter(), Metric::Projected, 4, 1, 3);
        // The merge yields at most two names, so the pre-filtered four are used.
        assert_eq!(tes.len(), 4);
    }

    #[test]
    fn sampling_without_replacement() {
        let pool = synthetic_pool();
        let rbs = CandidatePool::build(pool.at(Position::RunningBack).iter(), Metric::Projected, 30, 20, 5);
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..200 {
            let [a, b, c] = rbs.sample::<_, 3>(&mut rng).unwrap();
            assert!(a.name != b.name && b.name != c.name && a.name != c.name);
        }
        let tiny = CandidatePool::from_players(vec![named(&pool, "KC RB1")]);
        assert!(tiny.sample::<_, 2>(&mut rng).is_none());
    }

    #[test]
    fn defenses_facing_stack_qb_are_excluded() {
        let pool = synthetic_pool();
        let stack = kc_wr_stack(&pool);
        let cands = StackCandidates::for_stack(&pool, &stack, Metric::Projected, &PoolSettings::default());
        assert!(!cands.dsts.players().iter().any(|d| d.team == "BUF"));
        assert!(!cands.wrs.players().iter().any(|w| w.name == "KC WR2"));
    }

    #[test]
    fn generated_lineups_are_valid_distinct_and_stacked() {
        let pool = synthetic_pool();
        let b = builder(&pool, 20_000);
        let stack = kc_wr_stack(&pool);
        let mut rng = SmallRng::seed_from_u64(42);
        let lineups = b.generate_lineup_from_stack(&stack, 5, &mut rng);
        assert_eq!(lineups.len(), 5);

        let rules = LineupRules::default();
        let mut keys = HashSet::new();
        for l in &lineups {
            assert_eq!(rules.check(l), Ok(()));
            assert_eq!(l.qb().name, "KC QB");
            assert_eq!(l.stack_partner().map(|p| p.name.as_str()), Some("KC WR2"));
            assert!(matches!(l.stack_slot(), Some(Slot::Wr1 | Slot::Wr2 | Slot::Wr3)));
            assert_ne!(l.player(Slot::Dst).team, "BUF");
            assert!(keys.insert(l.roster_key()));
        }

        let scorer = QualityScorer::new(Metric::Projected, rules);
        for pair in lineups.windows(2) {
            assert!(scorer.score(&pair[0]) >= scorer.score(&pair[1]));
        }
    }

    #[test]
    fn te_stack_fills_te_slot() {
        let pool = synthetic_pool();
        let b = builder(&pool, 20_000);
        let stack = Stack {
            qb: named(&pool, "CIN QB"),
            partner: named(&pool, "CIN TE1"),
        };
        let mut rng = SmallRng::seed_from_u64(3);
        let lineups = b.generate_lineup_from_stack(&stack, 3, &mut rng);
        assert!(!lineups.is_empty());
        for l in &lineups {
            assert_eq!(l.player(Slot::Te).name, "CIN TE1");
            assert_eq!(l.stack_slot(), Some(Slot::Te));
            assert_ne!(l.player(Slot::Flex).position, Position::TightEnd);
        }
    }

    #[test]
    fn same_seed_same_lineups() {
        let pool = synthetic_pool();
        let b = builder(&pool, 5_000);
        let stack = kc_wr_stack(&pool);
        let first = b.generate_lineup_from_stack(&stack, 4, &mut SmallRng::seed_from_u64(11));
        let second = b.generate_lineup_from_stack(&stack, 4, &mut SmallRng::seed_from_u64(11));
        let a: Vec<_> = first.iter().map(|l| l.roster_key()).collect();
        let b: Vec<_> = second.iter().map(|l| l.roster_key()).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn infeasible_pool_returns_empty() {
        let pool = PlayerPool::new(vec![
            Player::new("QB", Position::Quarterback, "AAA", "BBB", 7000, 20.0),
            Player::new("WR", Position::WideReceiver, "AAA", "BBB", 6000, 15.0),
            Player::new("RB", Position::RunningBack, "CCC", "DDD", 6000, 15.0),
        ]);
        let b = builder(&pool, 1_000);
        let stack = Stack {
            qb: named(&pool, "QB"),
            partner: named(&pool, "WR"),
        };
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(b.generate_lineup_from_stack(&stack, 3, &mut rng).is_empty());
    }
}
