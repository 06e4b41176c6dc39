// Lineup validity rules.
//
// A pure predicate set. Failing lineups are scored as worthless; a
// `Violation` names the first rule broken, for logs and tests. It is never
// propagated as an error.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::lineup::lineup::{Lineup, Slot};
use crate::roster::player::{Player, Position};

/// Contest construction rules (`[contest]` in contest.toml).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineupRules {
    pub salary_cap: u32,
    /// Minimum total salary; unspent cap has no fantasy value.
    pub min_salary: u32,
    pub max_players_per_team: usize,
    pub min_teams: usize,
    /// At least one non-DST player must cost this much or less.
    pub punt_salary: u32,
}

impl Default for LineupRules {
    fn default() -> Self {
        LineupRules {
            salary_cap: 50_000,
            min_salary: 48_000,
            max_players_per_team: 3,
            min_teams: 4,
            punt_salary: 4_000,
        }
    }
}

/// The first validity rule a lineup breaks.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Violation {
    #[error("salary {salary} exceeds cap {cap}")]
    OverCap { salary: u32, cap: u32 },

    #[error("salary {salary} below floor {floor}")]
    UnderFloor { salary: u32, floor: u32 },

    #[error("no non-DST player at or below {threshold}")]
    NoPuntPlayer { threshold: u32 },

    #[error("player {0} appears more than once")]
    DuplicatePlayer(String),

    #[error("only {found} teams represented (need {required})")]
    TooFewTeams { found: usize, required: usize },

    #[error("team {team} supplies {count} players (max {max})")]
    TeamOverloaded {
        team: String,
        count: usize,
        max: usize,
    },

    #[error("{player} ({position}) cannot fill {slot}")]
    SlotMismatch {
        slot: Slot,
        player: String,
        position: Position,
    },
}

impl LineupRules {
    /// Check nine slot-ordered players, cheapest rules first.
    pub fn check_players(&self, players: &[&Player; 9]) -> Result<(), Violation> {
        let salary: u32 = players.iter().map(|p| p.salary).sum();
        if salary > self.salary_cap {
            return Err(Violation::OverCap {
                salary,
                cap: self.salary_cap,
            });
        }
        if salary < self.min_salary {
            return Err(Violation::UnderFloor {
                salary,
                floor: self.min_salary,
            });
        }

        let has_punt = players
            .iter()
            .any(|p| p.position != Position::Defense && p.salary <= self.punt_salary);
        if !has_punt {
            return Err(Violation::NoPuntPlayer {
                threshold: self.punt_salary,
            });
        }

        let mut names = HashSet::with_capacity(9);
        for p in players {
            if !names.insert(p.name.as_str()) {
                return Err(Violation::DuplicatePlayer(p.name.clone()));
            }
        }

        let mut teams: HashMap<&str, usize> = HashMap::new();
        for p in players {
            *teams.entry(p.team.as_str()).or_insert(0) += 1;
        }
        if teams.len() < self.min_teams {
            return Err(Violation::TooFewTeams {
                found: teams.len(),
                required: self.min_teams,
            });
        }
        if let Some((team, &count)) = teams
            .iter()
            .filter(|(_, c)| **c > self.max_players_per_team)
            .max_by_key(|(_, c)| **c)
        {
            return Err(Violation::TeamOverloaded {
                team: team.to_string(),
                count,
                max: self.max_players_per_team,
            });
        }

        for (slot, p) in Slot::ALL.iter().zip(players.iter()) {
            if !slot.accepts(p.position) {
                return Err(Violation::SlotMismatch {
                    slot: *slot,
                    player: p.name.clone(),
                    position: p.position,
                });
            }
        }
        Ok(())
    }

    pub fn check(&self, lineup: &Lineup<'_>) -> Result<(), Violation> {
        self.check_players(lineup.players())
    }

    pub fn is_valid(&self, lineup: &Lineup<'_>) -> bool {
        self.check(lineup).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{known_lineup, synthetic_pool};

    /// Nine players on nine teams summing to exactly $48,000.
    fn floor_players() -> Vec<Player> {
        let spec = [
            ("QB A", Position::Quarterback, "T1", 6000),
            ("RB A", Position::RunningBack, "T2", 6000),
            ("RB B", Position::RunningBack, "T3", 6000),
            ("WR A", Position::WideReceiver, "T4", 6000),
            ("WR B", Position::WideReceiver, "T5", 6000),
            ("WR C", Position::WideReceiver, "T6", 6000),
            ("TE A", Position::TightEnd, "T7", 6000),
            ("FLEX A", Position::RunningBack, "T8", 3000),
            ("DST A", Position::Defense, "T9", 3000),
        ];
        spec.iter()
            .map(|(name, pos, team, salary)| Player::new(*name, *pos, *team, "OPP", *salary, 10.0))
            .collect()
    }

    fn as_array(players: &[Player]) -> [&Player; 9] {
        std::array::from_fn(|i| &players[i])
    }

    #[test]
    fn known_lineup_is_valid() {
        let pool = synthetic_pool();
        let lineup = known_lineup(&pool);
        assert_eq!(LineupRules::default().check(&lineup), Ok(()));
    }

    #[test]
    fn exact_floor_is_valid() {
        let players = floor_players();
        assert_eq!(LineupRules::default().check_players(&as_array(&players)), Ok(()));
    }

    #[test]
    fn one_dollar_over_cap_is_rejected() {
        let mut players = floor_players();
        players[0].salary += 2001;
        let result = LineupRules::default().check_players(&as_array(&players));
        assert_eq!(
            result,
            Err(Violation::OverCap {
                salary: 50_001,
                cap: 50_000
            })
        );
    }

    #[test]
    fn under_floor_is_rejected() {
        let mut players = floor_players();
        players[0].salary -= 1;
        assert!(matches!(
            LineupRules::default().check_players(&as_array(&players)),
            Err(Violation::UnderFloor { salary: 47_999, .. })
        ));
    }

    #[test]
    fn defense_does_not_count_as_punt() {
        let mut players = floor_players();
        // FLEX up to 4001, DST down to 1999: still $48,000, only the DST is cheap.
        players[7].salary = 4001;
        players[8].salary = 1999;
        assert_eq!(
            LineupRules::default().check_players(&as_array(&players)),
            Err(Violation::NoPuntPlayer { threshold: 4000 })
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut players = floor_players();
        players[2].name = "RB A".into();
        assert_eq!(
            LineupRules::default().check_players(&as_array(&players)),
            Err(Violation::DuplicatePlayer("RB A".into()))
        );
    }

    #[test]
    fn team_rules() {
        let rules = LineupRules::default();

        let mut players = floor_players();
        for p in players.iter_mut().take(4) {
            p.team = "T1".into();
        }
        assert!(matches!(
            rules.check_players(&as_array(&players)),
            Err(Violation::TeamOverloaded { count: 4, max: 3, .. })
        ));

        let mut players = floor_players();
        for (i, p) in players.iter_mut().enumerate() {
            p.team = ["A", "B", "C"][i % 3].into();
        }
        assert_eq!(
            rules.check_players(&as_array(&players)),
            Err(Violation::TooFewTeams {
                found: 3,
                required: 4
            })
        );
    }

    #[test]
    fn flex_must_be_skill_position() {
        let mut players = floor_players();
        players[7].position = Position::Quarterback;
        assert!(matches!(
            LineupRules::default().check_players(&as_array(&players)),
            Err(Violation::SlotMismatch {
                slot: Slot::Flex,
                ..
            })
        ));
    }
}
