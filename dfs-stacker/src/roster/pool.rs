// Player pool: the read-only per-position roster every search component
// consults.

use crate::roster::player::{Player, Position};
use tracing::warn;

/// Candidate players grouped by position. Built once per run; nothing
/// downstream mutates it.
#[derive(Debug, Clone, Default)]
pub struct PlayerPool {
    by_position: [Vec<Player>; 5],
}

impl PlayerPool {
    /// Build a pool, dropping players that cannot take part in salary-cap
    /// arithmetic.
    pub fn new(players: impl IntoIterator<Item = Player>) -> Self {
        let mut pool = PlayerPool::default();
        for player in players {
            if player.salary == 0 {
                warn!("dropping {} ({}): no salary", player.name, player.position);
                continue;
            }
            if !player.projected_score.is_finite() {
                warn!("dropping {} ({}): non-finite projection", player.name, player.position);
                continue;
            }
            pool.by_position[player.position.index()].push(player);
        }
        pool
    }

    /// All players at a position, in load order.
    pub fn at(&self, position: Position) -> &[Player] {
        &self.by_position[position.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.by_position.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.by_position.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, name: &str, position: Position) -> Option<&Player> {
        self.at(position).iter().find(|p| p.name == name)
    }

    /// Whether any player carries boom/bust bands.
    pub fn has_boom_bust(&self) -> bool {
        self.iter().any(Player::has_boom_bust)
    }

    /// Per-position counts, for log lines.
    pub fn counts(&self) -> Vec<(Position, usize)> {
        Position::ALL
            .iter()
            .map(|&pos| (pos, self.at(pos).len()))
            .collect()
    }
}
