// Reference data: team directory, bye weeks, and player-name aliases.
//
// Loaded once at startup from reference.toml and passed explicitly to the
// loaders that resolve team and opponent identifiers.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("failed to read reference data {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse reference data {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// One NFL team entry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TeamInfo {
    /// Nickname, e.g. "Chiefs".
    pub name: String,
    /// City or region, e.g. "Kansas City".
    pub city: String,
    #[serde(default)]
    pub bye: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ReferenceFile {
    #[serde(default)]
    teams: BTreeMap<String, TeamInfo>,
    #[serde(default)]
    aliases: HashMap<String, String>,
}

/// Name suffixes that feeds disagree about ("Jr.", "III", "D/ST", ...).
const NAME_SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv", "v", "d/st", "dst"];

/// Reduce a raw feed name to a comparison key.
///
/// Drops parenthesized site IDs, punctuation, and trailing generational or
/// defense suffixes, then lowercases and collapses whitespace.
pub fn normalize_name(raw: &str) -> String {
    let mut without_parens = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for c in raw.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => without_parens.push(c),
            _ => {}
        }
    }

    let cleaned: String = without_parens
        .chars()
        .map(|c| if c == '\u{a0}' { ' ' } else { c })
        .filter(|c| !matches!(c, '.' | '\'' | ',' | '\u{2019}'))
        .collect::<String>()
        .to_lowercase();

    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    while tokens.len() > 1 && tokens.last().is_some_and(|t| NAME_SUFFIXES.contains(t)) {
        tokens.pop();
    }
    tokens.join(" ")
}

/// Read-only lookup service for team identity and naming.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    teams: BTreeMap<String, TeamInfo>,
    /// Lowercased abbreviation, nickname, city, or "city nickname" -> abbreviation.
    team_lookup: HashMap<String, String>,
    /// Normalized raw name -> normalized canonical name.
    aliases: HashMap<String, String>,
}

impl ReferenceData {
    /// An empty directory: team identifiers pass through uppercased and no
    /// aliases apply.
    pub fn empty() -> Self {
        ReferenceData::default()
    }

    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ReferenceError> {
        let file: ReferenceFile = toml::from_str(text).map_err(|e| ReferenceError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::from_parts(file.teams, file.aliases))
    }

    pub fn load(path: &Path) -> Result<Self, ReferenceError> {
        let text = std::fs::read_to_string(path).map_err(|e| ReferenceError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&text, path)
    }

    fn from_parts(teams: BTreeMap<String, TeamInfo>, aliases: HashMap<String, String>) -> Self {
        let mut team_lookup = HashMap::new();
        for (abbr, info) in &teams {
            let abbr_upper = abbr.trim().to_uppercase();
            for key in [
                abbr.to_string(),
                info.name.clone(),
                info.city.clone(),
                format!("{} {}", info.city, info.name),
            ] {
                team_lookup.insert(key.trim().to_lowercase(), abbr_upper.clone());
            }
        }
        let aliases = aliases
            .into_iter()
            .map(|(raw, canonical)| (normalize_name(&raw), normalize_name(&canonical)))
            .collect();
        ReferenceData {
            teams: teams
                .into_iter()
                .map(|(abbr, info)| (abbr.trim().to_uppercase(), info))
                .collect(),
            team_lookup,
            aliases,
        }
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn team(&self, abbr: &str) -> Option<&TeamInfo> {
        self.teams.get(&abbr.trim().to_uppercase())
    }

    /// Resolve any known spelling of a team to its abbreviation.
    pub fn team_abbrev(&self, raw: &str) -> Option<&str> {
        self.team_lookup
            .get(&raw.trim().to_lowercase())
            .map(String::as_str)
    }

    /// Canonical team identifier: the directory abbreviation when known,
    /// otherwise the trimmed, uppercased input.
    pub fn normalize_team(&self, raw: &str) -> String {
        let stripped = strip_venue_marker(raw);
        match self.team_abbrev(stripped) {
            Some(abbr) => abbr.to_string(),
            None => stripped.to_uppercase(),
        }
    }

    /// Whether `team` has its bye in `week`.
    pub fn is_on_bye(&self, team: &str, week: u32) -> bool {
        self.team(team)
            .and_then(|info| info.bye)
            .is_some_and(|bye| bye == week)
    }

    /// Comparison key for a player name, after alias resolution.
    pub fn match_key(&self, raw_name: &str) -> String {
        let key = normalize_name(raw_name);
        match self.aliases.get(&key) {
            Some(canonical) => canonical.clone(),
            None => key,
        }
    }
}

/// Drop the "@" / "vs" prefixes projection feeds put on opponents.
fn strip_venue_marker(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('@').unwrap_or(trimmed);
    let lower = trimmed.to_lowercase();
    let trimmed = if lower.starts_with("vs.") {
        &trimmed[3..]
    } else if lower.starts_with("vs ") {
        &trimmed[2..]
    } else {
        trimmed
    };
    trimmed.trim()
}

/// Derive a player's opponent from a salary-site game string such as
/// "KC@BUF 10/12/2025 01:00PM ET".
pub fn opponent_from_game_info(game_info: &str, team: &str) -> Option<String> {
    let matchup = game_info.split_whitespace().next()?;
    let (away, home) = matchup.split_once('@')?;
    if away.eq_ignore_ascii_case(team) {
        Some(home.to_uppercase())
    } else if home.eq_ignore_ascii_case(team) {
        Some(away.to_uppercase())
    } else {
        None
    }
}
