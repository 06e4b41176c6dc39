// Shared fixtures for unit tests: a synthetic eight-team slate.

use crate::lineup::lineup::{Lineup, Slot};
use crate::roster::player::{Player, Position};
use crate::roster::pool::PlayerPool;

pub const TEAMS: [&str; 8] = ["KC", "BUF", "CIN", "DAL", "PHI", "SF", "MIA", "DET"];

pub fn opponent_of(i: usize) -> &'static str {
    TEAMS[i ^ 1]
}

/// Eight teams in four games (KC-BUF, CIN-DAL, PHI-SF, MIA-DET), each with
/// one QB, three RBs, four WRs, two TEs and a defense. Salaries step down
/// by team index so no two players tie on salary within a position.
pub fn synthetic_players() -> Vec<Player> {
    let mut players = Vec::new();
    for (i, team) in TEAMS.iter().enumerate() {
        let opp = opponent_of(i);
        let step = i as u32;

        let qb_salary = 5800 + 250 * step;
        players.push(Player::new(
            format!("{team} QB"),
            Position::Quarterback,
            *team,
            opp,
            qb_salary,
            qb_salary as f64 / 1000.0 * 2.9,
        ));

        for (n, base) in [8000u32, 6000, 4200].iter().enumerate() {
            let salary = base - 100 * step;
            players.push(Player::new(
                format!("{team} RB{}", n + 1),
                Position::RunningBack,
                *team,
                opp,
                salary,
                salary as f64 / 1000.0 * 2.6 + (i % 3) as f64 * 0.4,
            ));
        }

        for (n, base) in [8200u32, 6500, 5000, 3600].iter().enumerate() {
            let salary = base - 100 * step;
            players.push(Player::new(
                format!("{team} WR{}", n + 1),
                Position::WideReceiver,
                *team,
                opp,
                salary,
                salary as f64 / 1000.0 * 2.5 + (i % 4) as f64 * 0.3,
            ));
        }

        for (n, base) in [6000u32, 3200].iter().enumerate() {
            let salary = base - 50 * step;
            players.push(Player::new(
                format!("{team} TE{}", n + 1),
                Position::TightEnd,
                *team,
                opp,
                salary,
                salary as f64 / 1000.0 * 2.2,
            ));
        }

        players.push(Player::new(
            format!("{team} DST"),
            Position::Defense,
            *team,
            opp,
            2600 + 100 * step,
            6.0 + 0.4 * i as f64,
        ));
    }
    players
}

pub fn synthetic_pool() -> PlayerPool {
    PlayerPool::new(synthetic_players())
}

/// Look a player up by name across every position.
pub fn named<'a>(pool: &'a PlayerPool, name: &str) -> &'a Player {
    pool.iter()
        .find(|p| p.name == name)
        .unwrap_or_else(|| panic!("no player named {name}"))
}

/// A hand-checked valid lineup: $49,450, seven teams, KC QB + KC WR1 stack,
/// CIN RB3 ($4,000) as the punt.
pub fn known_lineup(pool: &PlayerPool) -> Lineup<'_> {
    let names = [
        "KC QB", "BUF RB1", "CIN RB3", "KC WR1", "DAL WR2", "PHI WR3", "SF TE1", "MIA WR3",
        "KC DST",
    ];
    let players = names.map(|n| named(pool, n));
    Lineup::new(players, Some(Slot::Wr1))
}
