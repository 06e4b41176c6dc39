// Projection and salary feed loading, and the merge into a PlayerPool.
//
// Two CSV feeds: a projections file (one row per player with a point
// projection and optional boom/bust bands) and an optional DFS-site salary
// export. Rows are joined on normalized name + position.

use crate::roster::player::{Player, Position, ProjectionDetail};
use crate::roster::pool::PlayerPool;
use crate::roster::reference::{opponent_from_game_info, ReferenceData};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One usable row of the projections feed.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionRecord {
    pub name: String,
    pub position: Position,
    pub team: String,
    pub opponent: String,
    pub projected_score: f64,
    pub detail: ProjectionDetail,
    /// Salary carried by the projections file itself, used when no salary
    /// feed is supplied.
    pub salary: Option<u32>,
}

/// One usable row of the salary feed.
#[derive(Debug, Clone, PartialEq)]
pub struct SalaryRecord {
    pub name: String,
    pub position: Position,
    pub salary: u32,
    pub export_id: Option<String>,
    pub game_info: Option<String>,
    pub team: Option<String>,
}

/// Salary above which a player missing from the projections feed is worth
/// reporting.
fn key_player_threshold(position: Position) -> Option<u32> {
    match position {
        Position::Quarterback => Some(5000),
        Position::RunningBack => Some(4500),
        Position::WideReceiver => Some(4000),
        Position::TightEnd => Some(3000),
        Position::Defense => None,
    }
}

/// A slate should offer at least this many defenses.
const MIN_DEFENSES: usize = 10;

/// What happened while joining the feeds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub matched: usize,
    pub skipped_no_salary: usize,
    pub dropped_on_bye: usize,
    /// Salary-feed players above the key-player threshold with no projection.
    pub missing_projections: Vec<(String, Position, u32)>,
    pub defense_count: usize,
}

impl MergeReport {
    pub fn has_warnings(&self) -> bool {
        !self.missing_projections.is_empty() || self.defense_count < MIN_DEFENSES
    }

    /// Emit the report through tracing.
    pub fn log(&self) {
        info!(
            "merged {} players ({} without salary, {} on bye)",
            self.matched, self.skipped_no_salary, self.dropped_on_bye
        );
        for (name, position, salary) in &self.missing_projections {
            warn!("no projection for {} {} (${})", position, name, salary);
        }
        if self.defense_count < MIN_DEFENSES {
            warn!(
                "only {} defenses in pool (expected at least {})",
                self.defense_count, MIN_DEFENSES
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

/// Projections feed row. Boom/bust columns are optional; empty cells read
/// as `None`. Unknown columns are ignored.
#[derive(Debug, Deserialize)]
struct RawProjection {
    #[serde(alias = "name", alias = "Name")]
    player_name: String,
    position: String,
    #[serde(default)]
    team: String,
    #[serde(default)]
    opponent: String,
    #[serde(alias = "projected_points")]
    projected_score: f64,
    #[serde(default)]
    bust_score: Option<f64>,
    #[serde(default)]
    boom_score: Option<f64>,
    #[serde(default)]
    bust_percentage: Option<f64>,
    #[serde(default)]
    boom_percentage: Option<f64>,
    #[serde(default)]
    salary: Option<f64>,
}

/// DraftKings-style salary export row.
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawSalary {
    Name: String,
    Position: String,
    Salary: f64,
    #[serde(default, rename = "Name + ID")]
    name_id: Option<String>,
    #[serde(default, rename = "Game Info")]
    game_info: Option<String>,
    #[serde(default)]
    TeamAbbrev: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Basic only when every boom/bust field is absent. Present zeros are data.
fn detail_from_bands(
    bust_score: Option<f64>,
    boom_score: Option<f64>,
    bust_percentage: Option<f64>,
    boom_percentage: Option<f64>,
) -> ProjectionDetail {
    let fields = [bust_score, boom_score, bust_percentage, boom_percentage];
    let present = fields
        .iter()
        .any(|f| f.is_some_and(f64::is_finite));
    if !present {
        return ProjectionDetail::Basic;
    }
    let get = |f: Option<f64>| f.filter(|v| v.is_finite()).unwrap_or(0.0);
    ProjectionDetail::WithBoomBust {
        bust_score: get(bust_score),
        boom_score: get(boom_score),
        bust_percentage: get(bust_percentage),
        boom_percentage: get(boom_percentage),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn whole_salary(raw: f64) -> Option<u32> {
    if raw.is_finite() && raw >= 1.0 && raw <= u32::MAX as f64 {
        Some(raw.round() as u32)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_projections_from_reader<R: Read>(
    rdr: R,
    reference: &ReferenceData,
) -> Result<Vec<ProjectionRecord>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut records = Vec::new();
    for result in reader.deserialize::<RawProjection>() {
        match result {
            Ok(raw) => {
                let name = raw.player_name.trim().to_string();
                if name.is_empty() {
                    warn!("skipping projection row with empty name");
                    continue;
                }
                let Some(position) = Position::from_str_pos(&raw.position) else {
                    debug!("skipping '{}': unsupported position '{}'", name, raw.position);
                    continue;
                };
                if !raw.projected_score.is_finite() {
                    warn!("skipping '{}': non-finite projection", name);
                    continue;
                }
                records.push(ProjectionRecord {
                    name,
                    position,
                    team: reference.normalize_team(&raw.team),
                    opponent: reference.normalize_team(&raw.opponent),
                    projected_score: raw.projected_score,
                    detail: detail_from_bands(
                        raw.bust_score,
                        raw.boom_score,
                        raw.bust_percentage,
                        raw.boom_percentage,
                    ),
                    salary: raw.salary.and_then(whole_salary),
                });
            }
            Err(e) => {
                warn!("skipping malformed projection row: {}", e);
            }
        }
    }
    Ok(records)
}

fn load_salaries_from_reader<R: Read>(
    rdr: R,
    reference: &ReferenceData,
) -> Result<Vec<SalaryRecord>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut records = Vec::new();
    for result in reader.deserialize::<RawSalary>() {
        match result {
            Ok(raw) => {
                let name = raw.Name.trim().to_string();
                let Some(position) = Position::from_str_pos(&raw.Position) else {
                    debug!("skipping salary row '{}': position '{}'", name, raw.Position);
                    continue;
                };
                let Some(salary) = whole_salary(raw.Salary) else {
                    warn!("skipping salary row '{}': invalid salary {}", name, raw.Salary);
                    continue;
                };
                records.push(SalaryRecord {
                    name,
                    position,
                    salary,
                    export_id: non_empty(raw.name_id),
                    game_info: non_empty(raw.game_info),
                    team: non_empty(raw.TeamAbbrev).map(|t| reference.normalize_team(&t)),
                });
            }
            Err(e) => {
                warn!("skipping malformed salary row: {}", e);
            }
        }
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

pub fn load_projections(
    path: &Path,
    reference: &ReferenceData,
) -> Result<Vec<ProjectionRecord>, RosterError> {
    let file = std::fs::File::open(path).map_err(|e| RosterError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_projections_from_reader(file, reference).map_err(|e| RosterError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn load_salaries(
    path: &Path,
    reference: &ReferenceData,
) -> Result<Vec<SalaryRecord>, RosterError> {
    let file = std::fs::File::open(path).map_err(|e| RosterError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    load_salaries_from_reader(file, reference).map_err(|e| RosterError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Join projections with salaries into players.
///
/// With a salary feed, salary, site ID and game string come from the feed
/// and projection rows without a salary match are skipped. Without one, the
/// projections file's own `salary` column is used. Defenses fall back to a
/// team match since feeds name them inconsistently. When `week` is given,
/// players on bye are dropped.
pub fn merge_feeds(
    projections: &[ProjectionRecord],
    salaries: Option<&[SalaryRecord]>,
    reference: &ReferenceData,
    week: Option<u32>,
) -> (Vec<Player>, MergeReport) {
    let mut report = MergeReport::default();

    let mut by_key: HashMap<(String, Position), &SalaryRecord> = HashMap::new();
    let mut dst_by_team: HashMap<String, &SalaryRecord> = HashMap::new();
    for record in salaries.unwrap_or(&[]) {
        let key = (reference.match_key(&record.name), record.position);
        if by_key.insert(key, record).is_some() {
            warn!("duplicate salary entry for {} {}", record.position, record.name);
        }
        if record.position == Position::Defense {
            if let Some(team) = &record.team {
                dst_by_team.insert(team.clone(), record);
            }
        }
    }

    let mut players = Vec::with_capacity(projections.len());
    let mut seen: HashSet<(String, Position)> = HashSet::new();
    for proj in projections {
        let key = (reference.match_key(&proj.name), proj.position);
        if !seen.insert(key.clone()) {
            warn!("duplicate projection for {} {}, keeping first", proj.position, proj.name);
            continue;
        }

        let matched = if salaries.is_some() {
            by_key.get(&key).copied().or_else(|| {
                if proj.position == Position::Defense {
                    dst_by_team.get(&proj.team).copied()
                } else {
                    None
                }
            })
        } else {
            None
        };

        let salary = match (salaries.is_some(), matched) {
            (true, Some(record)) => Some(record.salary),
            (true, None) => None,
            (false, _) => proj.salary,
        };
        let Some(salary) = salary else {
            report.skipped_no_salary += 1;
            debug!("no salary for {} {}", proj.position, proj.name);
            continue;
        };

        let team = if proj.team.is_empty() {
            matched.and_then(|r| r.team.clone()).unwrap_or_default()
        } else {
            proj.team.clone()
        };
        let game_info = matched.and_then(|r| r.game_info.clone());
        let opponent = if proj.opponent.is_empty() {
            game_info
                .as_deref()
                .and_then(|g| opponent_from_game_info(g, &team))
                .map(|o| reference.normalize_team(&o))
                .unwrap_or_default()
        } else {
            proj.opponent.clone()
        };

        if let Some(week) = week {
            if reference.is_on_bye(&team, week) {
                report.dropped_on_bye += 1;
                continue;
            }
        }

        let mut player = Player::new(
            proj.name.clone(),
            proj.position,
            team,
            opponent,
            salary,
            proj.projected_score,
        );
        player.detail = proj.detail;
        player.export_id = matched.and_then(|r| r.export_id.clone());
        player.game_info = game_info;
        players.push(player);
        report.matched += 1;
    }

    if let Some(salaries) = salaries {
        let projected: HashSet<(String, Position)> = players
            .iter()
            .map(|p| (reference.match_key(&p.name), p.position))
            .collect();
        for record in salaries {
            let Some(threshold) = key_player_threshold(record.position) else {
                continue;
            };
            let key = (reference.match_key(&record.name), record.position);
            if record.salary > threshold && !projected.contains(&key) {
                report
                    .missing_projections
                    .push((record.name.clone(), record.position, record.salary));
            }
        }
    }

    report.defense_count = players
        .iter()
        .filter(|p| p.position == Position::Defense)
        .count();
    (players, report)
}

/// Load both feeds and build the pool. Errors only on I/O, unreadable CSV,
/// or an empty result.
pub fn load_pool(
    projections_path: &Path,
    salaries_path: Option<&Path>,
    reference: &ReferenceData,
    week: Option<u32>,
) -> Result<(PlayerPool, MergeReport), RosterError> {
    let projections = load_projections(projections_path, reference)?;
    if projections.is_empty() {
        return Err(RosterError::Validation(
            "projections CSV produced zero valid rows".into(),
        ));
    }
    let salaries = salaries_path
        .map(|p| load_salaries(p, reference))
        .transpose()?;
    let (players, report) = merge_feeds(&projections, salaries.as_deref(), reference, week);
    let pool = PlayerPool::new(players);
    if pool.is_empty() {
        return Err(RosterError::Validation(
            "no projected player has a usable salary".into(),
        ));
    }
    Ok((pool, report))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
