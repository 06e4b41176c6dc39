// Stack-preserving local search over finished lineups.
//
// Three greedy passes, in order: FLEX re-selection by quality, score
// improvements at RB and DST, then salary upgrades into unspent cap. No
// pass touches the stack QB or the stack partner.

use std::cmp::Ordering;

use tracing::debug;

use crate::config::OptimizerSettings;
use crate::lineup::lineup::{Lineup, Slot};
use crate::lineup::scoring::QualityScorer;
use crate::roster::player::{Player, Position};
use crate::roster::pool::PlayerPool;

/// Players that could fill `slot`, excluding everyone already in the
/// lineup. A DST candidate may not face the lineup's QB, and a QB
/// candidate may not face the lineup's DST.
pub(crate) fn replacement_candidates<'p>(pool: &'p PlayerPool, lineup: &Lineup<'p>, slot: Slot) -> Vec<&'p Player> {
    let positions: &[Position] = match slot.base_position() {
        Some(Position::Quarterback) => &[Position::Quarterback],
        Some(Position::RunningBack) => &[Position::RunningBack],
        Some(Position::WideReceiver) => &[Position::WideReceiver],
        Some(Position::TightEnd) => &[Position::TightEnd],
        Some(Position::Defense) => &[Position::Defense],
        None => &[Position::WideReceiver, Position::RunningBack, Position::TightEnd],
    };
    let qb_opponent = lineup.qb().opponent.as_str();
    let dst_team = lineup.player(Slot::Dst).team.as_str();
    positions
        .iter()
        .flat_map(|&pos| pool.at(pos))
        .filter(|p| !lineup.contains(&p.name))
        .filter(|p| slot != Slot::Dst || p.team != qb_opponent)
        .filter(|p| slot != Slot::Qb || p.opponent != dst_team)
        .collect()
}

const IMPROVE_SLOTS: [Slot; 3] = [Slot::Rb1, Slot::Rb2, Slot::Dst];
const UPGRADE_SLOTS: [Slot; 4] = [Slot::Rb1, Slot::Rb2, Slot::Flex, Slot::Dst];

#[derive(Debug, Clone, Copy)]
pub struct LineupOptimizer<'p> {
    pool: &'p PlayerPool,
    scorer: QualityScorer,
    settings: OptimizerSettings,
}

impl<'p> LineupOptimizer<'p> {
    pub fn new(pool: &'p PlayerPool, scorer: QualityScorer, settings: OptimizerSettings) -> Self {
        LineupOptimizer {
            pool,
            scorer,
            settings,
        }
    }

    /// Run every pass over one lineup. A valid input stays valid.
    pub fn optimize(&self, lineup: &Lineup<'p>) -> Lineup<'p> {
        let flexed = self.reselect_flex(lineup);
        let improved = self.improve_scores(&flexed);
        let upgraded = self.upgrade_salary(&improved);
        debug!(
            "optimized lineup: {:.2} -> {:.2} pts, ${} -> ${}",
            self.scorer.primary_score(lineup),
            self.scorer.primary_score(&upgraded),
            lineup.salary(),
            upgraded.salary()
        );
        upgraded
    }

    pub fn optimize_all(&self, lineups: &[Lineup<'p>]) -> Vec<Lineup<'p>> {
        lineups.iter().map(|l| self.optimize(l)).collect()
    }

    fn candidates_for(&self, lineup: &Lineup<'p>, slot: Slot) -> Vec<&'p Player> {
        replacement_candidates(self.pool, lineup, slot)
    }

    fn sort_by_score(&self, players: &mut [&'p Player]) {
        let metric = self.scorer.metric;
        players.sort_by(|a, b| {
            b.score(metric)
                .partial_cmp(&a.score(metric))
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.salary.cmp(&a.salary))
        });
    }

    /// Try the best FLEX candidates; keep whichever raises quality most.
    fn reselect_flex(&self, lineup: &Lineup<'p>) -> Lineup<'p> {
        if lineup.is_stack_slot(Slot::Flex) {
            return *lineup;
        }
        let mut candidates = self.candidates_for(lineup, Slot::Flex);
        self.sort_by_score(&mut candidates);

        let rules = self.scorer.rules;
        let mut best = *lineup;
        let mut best_quality = self.scorer.score(lineup);
        for &candidate in candidates.iter().take(self.settings.flex_candidates) {
            let trial = lineup.with_slot_replaced(Slot::Flex, candidate);
            if !rules.is_valid(&trial) {
                continue;
            }
            let quality = self.scorer.score(&trial);
            if quality > best_quality {
                best = trial;
                best_quality = quality;
            }
        }
        best
    }

    /// Swap in higher-scoring RBs and defenses. Ties on the lineup total
    /// are taken when they spend more salary, so equal-scoring candidates
    /// stay in play.
    fn improve_scores(&self, lineup: &Lineup<'p>) -> Lineup<'p> {
        let metric = self.scorer.metric;
        let rules = self.scorer.rules;
        let mut best = *lineup;
        let mut best_score = self.scorer.primary_score(&best);

        for slot in IMPROVE_SLOTS {
            if best.is_stack_slot(slot) {
                continue;
            }
            let current = best.player(slot).score(metric);
            let mut candidates = self.candidates_for(&best, slot);
            self.sort_by_score(&mut candidates);

            for &candidate in candidates.iter().take(self.settings.improve_candidates) {
                if candidate.score(metric) < current {
                    break;
                }
                let trial = best.with_slot_replaced(slot, candidate);
                if !rules.is_valid(&trial) {
                    continue;
                }
                let score = self.scorer.primary_score(&trial);
                if score > best_score || (score == best_score && trial.salary() > best.salary()) {
                    best = trial;
                    best_score = score;
                }
            }
        }
        best
    }

    /// Spend unused cap: per slot, take the most expensive candidate whose
    /// raise fits the headroom and keeps enough of the replaced score.
    fn upgrade_salary(&self, lineup: &Lineup<'p>) -> Lineup<'p> {
        let cap = self.scorer.rules.salary_cap;
        if lineup.salary() >= cap {
            return *lineup;
        }
        let metric = self.scorer.metric;
        let rules = self.scorer.rules;
        let tolerance = self.settings.salary_score_tolerance;
        let mut best = *lineup;
        let mut headroom = cap - lineup.salary();

        for slot in UPGRADE_SLOTS {
            if best.is_stack_slot(slot) {
                continue;
            }
            let current = best.player(slot);
            let mut candidates = self.candidates_for(&best, slot);
            candidates.sort_by(|a, b| b.salary.cmp(&a.salary));

            for &candidate in &candidates {
                if candidate.salary <= current.salary {
                    break;
                }
                let raise = candidate.salary - current.salary;
                if raise > headroom || candidate.score(metric) < current.score(metric) * tolerance {
                    continue;
                }
                let trial = best.with_slot_replaced(slot, candidate);
                if rules.is_valid(&trial) {
                    best = trial;
                    headroom -= raise;
                    break;
                }
            }
        }
        best
    }
}
