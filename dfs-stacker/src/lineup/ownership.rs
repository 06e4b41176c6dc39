// Ownership balancing: cap how many lineups in a batch share any one player.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::config::OwnershipSettings;
use crate::lineup::lineup::{Lineup, Slot};
use crate::lineup::optimizer::replacement_candidates;
use crate::lineup::scoring::QualityScorer;
use crate::lineup::validator::LineupRules;
use crate::roster::player::{Metric, Player};
use crate::roster::pool::PlayerPool;

/// Lineups containing each player, by name.
pub fn ownership_counts<'a>(lineups: &[Lineup<'a>]) -> HashMap<&'a str, usize> {
    let mut counts = HashMap::new();
    for lineup in lineups {
        for p in lineup.players() {
            *counts.entry(p.name.as_str()).or_insert(0) += 1;
        }
    }
    counts
}

/// Largest number of lineups a player may appear in.
pub fn ownership_limit(threshold: f64, lineup_count: usize) -> usize {
    (threshold * lineup_count as f64).floor() as usize
}

/// Names appearing in more than `threshold` of `lineups`.
pub fn oversubscribed<'a>(lineups: &[Lineup<'a>], threshold: f64) -> HashSet<&'a str> {
    let limit = ownership_limit(threshold, lineups.len());
    ownership_counts(lineups)
        .into_iter()
        .filter(|&(_, count)| count > limit)
        .map(|(name, _)| name)
        .collect()
}

/// What a balancing run changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceReport {
    pub passes: usize,
    pub replacements: usize,
    /// Players still above the limit, with their final counts.
    pub unresolved: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Copy)]
pub struct OwnershipBalancer<'p> {
    pool: &'p PlayerPool,
    scorer: QualityScorer,
    settings: OwnershipSettings,
}

impl<'p> OwnershipBalancer<'p> {
    pub fn new(pool: &'p PlayerPool, scorer: QualityScorer, settings: OwnershipSettings) -> Self {
        OwnershipBalancer {
            pool,
            scorer,
            settings,
        }
    }

    /// Rebalance `lineups` and return them best primary score first.
    pub fn balance(&self, lineups: Vec<Lineup<'p>>) -> Vec<Lineup<'p>> {
        self.balance_with_report(lineups).0
    }

    pub fn balance_with_report(&self, mut lineups: Vec<Lineup<'p>>) -> (Vec<Lineup<'p>>, BalanceReport) {
        let mut report = BalanceReport::default();
        let threshold = self.settings.threshold;
        let limit = ownership_limit(threshold, lineups.len());
        let metric = self.scorer.metric;

        // Weakest lineups give up their oversubscribed players first.
        sort_by_primary(&mut lineups, metric);
        lineups.reverse();

        for pass in 0..self.settings.max_passes {
            if oversubscribed(&lineups, threshold).is_empty() {
                break;
            }
            report.passes = pass + 1;
            let mut changed = 0;
            for i in 0..lineups.len() {
                let over = oversubscribed(&lineups, threshold);
                if over.is_empty() {
                    break;
                }
                if let Some((updated, swaps)) = self.rebalance_lineup(&lineups[i], &over) {
                    lineups[i] = updated;
                    changed += swaps;
                }
            }
            debug!("ownership pass {}: {} replacements", pass + 1, changed);
            report.replacements += changed;
            if changed == 0 {
                break;
            }
        }

        let counts = ownership_counts(&lineups);
        let mut unresolved: Vec<(String, usize)> = counts
            .into_iter()
            .filter(|&(_, count)| count > limit)
            .map(|(name, count)| (name.to_string(), count))
            .collect();
        unresolved.sort();
        for (name, count) in &unresolved {
            warn!(
                "{} remains in {} of {} lineups (limit {}): no legal replacement",
                name,
                count,
                lineups.len(),
                limit
            );
        }
        report.unresolved = unresolved;
        if report.replacements > 0 {
            info!(
                "ownership balancing made {} replacements in {} passes",
                report.replacements, report.passes
            );
        }

        sort_by_primary(&mut lineups, metric);
        (lineups, report)
    }

    /// Replace every oversubscribed player in one lineup. All swaps land
    /// together when the combined lineup is valid; otherwise each swap is
    /// kept only while the lineup stays valid.
    fn rebalance_lineup(&self, lineup: &Lineup<'p>, over: &HashSet<&str>) -> Option<(Lineup<'p>, usize)> {
        let rules = self.scorer.rules;
        let mut chosen: Vec<(Slot, &'p Player)> = Vec::new();
        for (slot, player) in lineup.slots() {
            if !over.contains(player.name.as_str()) {
                continue;
            }
            match self.best_replacement(lineup, slot, over, &chosen) {
                Some(replacement) => chosen.push((slot, replacement)),
                None => debug!(
                    "no replacement for {} at {}: ${} available",
                    player.name,
                    slot,
                    available_salary(&rules, lineup, player)
                ),
            }
        }
        if chosen.is_empty() {
            return None;
        }

        let combined = chosen
            .iter()
            .fold(*lineup, |l, &(slot, p)| l.with_slot_replaced(slot, p));
        if rules.is_valid(&combined) {
            for (slot, p) in &chosen {
                debug!("replacing {} with {}", lineup.player(*slot).name, p.name);
            }
            return Some((combined, chosen.len()));
        }

        let mut current = *lineup;
        let mut applied = 0;
        for (slot, p) in chosen {
            let trial = current.with_slot_replaced(slot, p);
            if rules.is_valid(&trial) {
                debug!("replacing {} with {}", current.player(slot).name, p.name);
                current = trial;
                applied += 1;
            }
        }
        (applied > 0).then_some((current, applied))
    }

    /// Top scorer for `slot` that fits the freed salary, is not itself
    /// oversubscribed, and leaves the lineup valid as a single swap.
    fn best_replacement(
        &self,
        lineup: &Lineup<'p>,
        slot: Slot,
        over: &HashSet<&str>,
        chosen: &[(Slot, &'p Player)],
    ) -> Option<&'p Player> {
        let rules = self.scorer.rules;
        let metric = self.scorer.metric;
        let outgoing = lineup.player(slot);
        let available = available_salary(&rules, lineup, outgoing);

        let mut pool: Vec<&'p Player> = replacement_candidates(self.pool, lineup, slot)
            .into_iter()
            .filter(|p| p.salary <= available)
            .filter(|p| !over.contains(p.name.as_str()))
            .filter(|p| !chosen.iter().any(|(_, c)| c.name == p.name))
            .collect();
        pool.sort_by(|a, b| {
            b.score(metric)
                .partial_cmp(&a.score(metric))
                .unwrap_or(Ordering::Equal)
        });
        pool.into_iter()
            .find(|&p| rules.is_valid(&lineup.with_slot_replaced(slot, p)))
    }
}

fn available_salary(rules: &LineupRules, lineup: &Lineup<'_>, outgoing: &Player) -> u32 {
    rules
        .salary_cap
        .saturating_sub(lineup.salary() - outgoing.salary)
}

/// Descending by primary score; equal scores keep their order.
fn sort_by_primary(lineups: &mut [Lineup<'_>], metric: Metric) {
    lineups.sort_by(|a, b| {
        b.primary_score(metric)
            .partial_cmp(&a.primary_score(metric))
            .unwrap_or(Ordering::Equal)
    });
}

/// Balance with default rules and the given threshold.
pub fn optimize_ownership<'p>(
    pool: &'p PlayerPool,
    lineups: Vec<Lineup<'p>>,
    metric: Metric,
    threshold: f64,
) -> Vec<Lineup<'p>> {
    let settings = OwnershipSettings {
        threshold,
        ..OwnershipSettings::default()
    };
    OwnershipBalancer::new(pool, QualityScorer::new(metric, LineupRules::default()), settings).balance(lineups)
}
