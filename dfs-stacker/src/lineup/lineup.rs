// Lineup value type: nine fixed slots borrowing players from the pool.

use std::collections::BTreeMap;
use std::fmt;

use crate::roster::player::{Metric, Player, Position};

/// A classic-slate roster slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Qb,
    Rb1,
    Rb2,
    Wr1,
    Wr2,
    Wr3,
    Te,
    Flex,
    Dst,
}

impl Slot {
    /// Slots in export column order.
    pub const ALL: [Slot; 9] = [
        Slot::Qb,
        Slot::Rb1,
        Slot::Rb2,
        Slot::Wr1,
        Slot::Wr2,
        Slot::Wr3,
        Slot::Te,
        Slot::Flex,
        Slot::Dst,
    ];

    pub fn index(self) -> usize {
        match self {
            Slot::Qb => 0,
            Slot::Rb1 => 1,
            Slot::Rb2 => 2,
            Slot::Wr1 => 3,
            Slot::Wr2 => 4,
            Slot::Wr3 => 5,
            Slot::Te => 6,
            Slot::Flex => 7,
            Slot::Dst => 8,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Slot::Qb => "QB",
            Slot::Rb1 => "RB1",
            Slot::Rb2 => "RB2",
            Slot::Wr1 => "WR1",
            Slot::Wr2 => "WR2",
            Slot::Wr3 => "WR3",
            Slot::Te => "TE",
            Slot::Flex => "FLEX",
            Slot::Dst => "DST",
        }
    }

    /// The single position a slot holds; `None` for FLEX.
    pub fn base_position(self) -> Option<Position> {
        match self {
            Slot::Qb => Some(Position::Quarterback),
            Slot::Rb1 | Slot::Rb2 => Some(Position::RunningBack),
            Slot::Wr1 | Slot::Wr2 | Slot::Wr3 => Some(Position::WideReceiver),
            Slot::Te => Some(Position::TightEnd),
            Slot::Flex => None,
            Slot::Dst => Some(Position::Defense),
        }
    }

    pub fn accepts(self, position: Position) -> bool {
        match self.base_position() {
            Some(base) => base == position,
            None => position.is_flex_eligible(),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Nine players in slot order, plus the slot holding the stack partner.
///
/// The QB slot is the stack QB whenever `stack_slot` is set. Edits go
/// through [`Lineup::with_slot_replaced`], which returns a new value.
#[derive(Debug, Clone, Copy)]
pub struct Lineup<'a> {
    players: [&'a Player; 9],
    stack_slot: Option<Slot>,
}

impl<'a> Lineup<'a> {
    pub fn new(players: [&'a Player; 9], stack_slot: Option<Slot>) -> Self {
        Lineup {
            players,
            stack_slot,
        }
    }

    pub fn players(&self) -> &[&'a Player; 9] {
        &self.players
    }

    pub fn player(&self, slot: Slot) -> &'a Player {
        self.players[slot.index()]
    }

    pub fn qb(&self) -> &'a Player {
        self.player(Slot::Qb)
    }

    pub fn stack_slot(&self) -> Option<Slot> {
        self.stack_slot
    }

    pub fn stack_partner(&self) -> Option<&'a Player> {
        self.stack_slot.map(|slot| self.player(slot))
    }

    /// Whether local search must leave this slot alone.
    pub fn is_stack_slot(&self, slot: Slot) -> bool {
        self.stack_slot.is_some() && (slot == Slot::Qb || Some(slot) == self.stack_slot)
    }

    /// Copy of this lineup with one slot swapped. Replacing either half of
    /// the stack dissolves it.
    pub fn with_slot_replaced(&self, slot: Slot, player: &'a Player) -> Lineup<'a> {
        let mut players = self.players;
        players[slot.index()] = player;
        let stack_slot = if self.is_stack_slot(slot) {
            None
        } else {
            self.stack_slot
        };
        Lineup {
            players,
            stack_slot,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.players.iter().any(|p| p.name == name)
    }

    /// Sorted player names; equal keys mean the same roster.
    pub fn roster_key(&self) -> Vec<&'a str> {
        let mut names: Vec<&'a str> = self.players.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn salary(&self) -> u32 {
        self.players.iter().map(|p| p.salary).sum()
    }

    pub fn projected_score(&self) -> f64 {
        self.players.iter().map(|p| p.projected_score).sum()
    }

    pub fn risk_adjusted_score(&self) -> f64 {
        self.players.iter().map(|p| p.risk_adjusted_score()).sum()
    }

    /// Raw boom total (0 when no player carries boom data).
    pub fn boom_score(&self) -> f64 {
        self.players.iter().map(|p| p.boom_score()).sum()
    }

    pub fn bust_score(&self) -> f64 {
        self.players.iter().map(|p| p.bust_score()).sum()
    }

    pub fn avg_boom_percentage(&self) -> f64 {
        self.players.iter().map(|p| p.boom_percentage()).sum::<f64>() / 9.0
    }

    pub fn avg_bust_percentage(&self) -> f64 {
        self.players.iter().map(|p| p.bust_percentage()).sum::<f64>() / 9.0
    }

    pub fn avg_upside(&self) -> f64 {
        self.players.iter().map(|p| p.upside_potential()).sum::<f64>() / 9.0
    }

    /// Lineup total under the run's metric. Under boom, players without
    /// boom data count their projection, matching `Player::score`. A
    /// lineup with no boom data at all scores its projection.
    pub fn primary_score(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Projected => self.projected_score(),
            Metric::RiskAdjusted => self.risk_adjusted_score(),
            Metric::BoomScore => {
                if self.boom_score() > 0.0 {
                    self.players.iter().map(|p| p.score(Metric::BoomScore)).sum()
                } else {
                    self.projected_score()
                }
            }
        }
    }

    /// Players per team.
    pub fn team_counts(&self) -> BTreeMap<&'a str, usize> {
        let mut counts = BTreeMap::new();
        for p in &self.players {
            *counts.entry(p.team.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn team_count(&self) -> usize {
        self.team_counts().len()
    }

    /// Slots paired with their players, in export order.
    pub fn slots(&self) -> impl Iterator<Item = (Slot, &'a Player)> + '_ {
        Slot::ALL.iter().map(move |&slot| (slot, self.player(slot)))
    }
}

impl fmt::Display for Lineup<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .slots()
            .map(|(slot, p)| format!("{}: {}", slot, p.name))
            .collect();
        write!(f, "{} (${})", names.join(", "), self.salary())
    }
}
