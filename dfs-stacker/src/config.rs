// Configuration loading and parsing (contest.toml, strategy.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::lineup::scoring::ScoreWeights;
use crate::lineup::validator::LineupRules;
use crate::roster::player::Metric;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub contest: LineupRules,
    pub strategy: StrategyConfig,
    pub data_paths: DataPaths,
}

// ---------------------------------------------------------------------------
// contest.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[contest]` table in contest.toml.
#[derive(Debug, Clone, Deserialize)]
struct ContestFile {
    contest: LineupRules,
}

// ---------------------------------------------------------------------------
// strategy.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire strategy.toml file.
#[derive(Debug, Clone, Deserialize)]
struct StrategyFile {
    optimization: OptimizationSection,
    stacks: StackSettings,
    search: SearchSettings,
    pools: PoolSettings,
    optimizer: OptimizerSettings,
    ownership: OwnershipSettings,
    #[serde(default)]
    scoring: ScoreWeights,
    data_paths: DataPaths,
}

#[derive(Debug, Clone, Deserialize)]
struct OptimizationSection {
    metric: Metric,
    num_lineups: usize,
}

/// The public strategy config assembled from the strategy.toml sections.
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    pub metric: Metric,
    pub num_lineups: usize,
    pub stacks: StackSettings,
    pub search: SearchSettings,
    pub pools: PoolSettings,
    pub optimizer: OptimizerSettings,
    pub ownership: OwnershipSettings,
    pub weights: ScoreWeights,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            metric: Metric::default(),
            num_lineups: 20,
            stacks: StackSettings::default(),
            search: SearchSettings::default(),
            pools: PoolSettings::default(),
            optimizer: OptimizerSettings::default(),
            ownership: OwnershipSettings::default(),
            weights: ScoreWeights::default(),
        }
    }
}

/// QB + pass-catcher anchor selection.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct StackSettings {
    pub min_salary: u32,
    pub max_salary: u32,
    /// Stacks to anchor on; half chosen by score, the rest by value.
    pub count: usize,
}

impl Default for StackSettings {
    fn default() -> Self {
        StackSettings {
            min_salary: 10_000,
            max_salary: 15_000,
            count: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SearchSettings {
    /// Random trials per stack, valid or not.
    pub max_attempts: usize,
    /// Each stack searches `lineups_per_stack * oversample` lineups and
    /// keeps the best `lineups_per_stack`.
    pub oversample: usize,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        SearchSettings {
            max_attempts: 500_000,
            oversample: 3,
            seed: None,
        }
    }
}

/// Candidate pool shaping for random lineup construction.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PoolSettings {
    pub rb_top: usize,
    pub wr_top: usize,
    pub te_top: usize,
    pub dst_top: usize,
    /// Size of the by-score and by-value sub-lists merged into each pool.
    pub merge_top: usize,
    /// Below this many merged RBs/WRs, fall back to the pre-filtered list.
    pub min_skill_pool: usize,
    /// Same fallback for TEs and defenses.
    pub min_thin_pool: usize,
    /// FLEX is drawn uniformly from this many leading candidates.
    pub flex_window: usize,
}

impl Default for PoolSettings {
    fn default() -> Self {
        PoolSettings {
            rb_top: 30,
            wr_top: 30,
            te_top: 20,
            dst_top: 15,
            merge_top: 20,
            min_skill_pool: 5,
            min_thin_pool: 3,
            flex_window: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct OptimizerSettings {
    pub flex_candidates: usize,
    pub improve_candidates: usize,
    /// A salary upgrade must keep at least this fraction of the replaced
    /// player's score.
    pub salary_score_tolerance: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        OptimizerSettings {
            flex_candidates: 10,
            improve_candidates: 5,
            salary_score_tolerance: 0.9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct OwnershipSettings {
    /// Players in more than this fraction of lineups are oversubscribed.
    pub threshold: f64,
    pub max_passes: usize,
}

impl Default for OwnershipSettings {
    fn default() -> Self {
        OwnershipSettings {
            threshold: 0.66,
            max_passes: 10,
        }
    }
}

/// Input and output locations, relative to the base directory unless
/// absolute.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataPaths {
    pub projections: String,
    #[serde(default)]
    pub salaries: Option<String>,
    pub reference: String,
    pub output: String,
}

impl Default for DataPaths {
    fn default() -> Self {
        DataPaths {
            projections: "data/projections.csv".into(),
            salaries: Some("data/DKSalaries.csv".into()),
            reference: "config/reference.toml".into(),
            output: "output/lineups.csv".into(),
        }
    }
}

impl DataPaths {
    pub fn resolve(base_dir: &Path, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            base_dir.join(p)
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/contest.toml` and
/// `config/strategy.toml` relative to the given `base_dir`.
///
/// Does not copy defaults; prefer `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- contest.toml (required) ---
    let contest_path = config_dir.join("contest.toml");
    let contest_text = read_file(&contest_path)?;
    let contest_file: ContestFile =
        toml::from_str(&contest_text).map_err(|e| ConfigError::ParseError {
            path: contest_path.clone(),
            source: e,
        })?;

    // --- strategy.toml (required) ---
    let strategy_path = config_dir.join("strategy.toml");
    let strategy_text = read_file(&strategy_path)?;
    let strategy_file: StrategyFile =
        toml::from_str(&strategy_text).map_err(|e| ConfigError::ParseError {
            path: strategy_path.clone(),
            source: e,
        })?;

    let strategy = StrategyConfig {
        metric: strategy_file.optimization.metric,
        num_lineups: strategy_file.optimization.num_lineups,
        stacks: strategy_file.stacks,
        search: strategy_file.search,
        pools: strategy_file.pools,
        optimizer: strategy_file.optimizer,
        ownership: strategy_file.ownership,
        weights: strategy_file.scoring,
    };

    let config = Config {
        contest: contest_file.contest,
        strategy,
        data_paths: strategy_file.data_paths,
    };

    validate(&config)?;

    Ok(config)
}

fn copy_error(action: &str, path: &Path, err: std::io::Error) -> ConfigError {
    ConfigError::DefaultsCopyError {
        message: format!("failed to {action} {}: {err}", path.display()),
    }
}

/// Default files to install, in name order. `*.example` templates and
/// subdirectories are not installed.
fn default_files(defaults_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let entries = std::fs::read_dir(defaults_dir).map_err(|e| copy_error("read", defaults_dir, e))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| copy_error("read", defaults_dir, e))?.path();
        let is_template = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".example"));
        if path.is_file() && !is_template {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Copy `src` to `dest` unless `dest` already exists. Returns whether a
/// copy happened.
fn install_if_absent(src: &Path, dest: &Path) -> Result<bool, ConfigError> {
    use std::io::Write;

    let mut file = match std::fs::OpenOptions::new().write(true).create_new(true).open(dest) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(copy_error("create", dest, e)),
    };
    let content = std::fs::read(src).map_err(|e| copy_error("read", src, e))?;
    file.write_all(&content).map_err(|e| copy_error("write", dest, e))?;
    Ok(true)
}

/// Install any `defaults/` file missing from `config/`; existing files are
/// never touched. Returns the paths written.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        return if config_dir.is_dir() {
            Ok(Vec::new())
        } else {
            Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or pass --base-dir",
                    base_dir.display()
                ),
            })
        };
    }
    std::fs::create_dir_all(&config_dir).map_err(|e| copy_error("create", &config_dir, e))?;

    let mut installed = Vec::new();
    for src in default_files(&defaults_dir)? {
        let Some(name) = src.file_name() else {
            continue;
        };
        let dest = config_dir.join(name);
        if install_if_absent(&src, &dest)? {
            info!("installed default config {}", dest.display());
            installed.push(dest);
        }
    }
    Ok(installed)
}

/// Copy any missing defaults into `base_dir/config`, then load.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject configurations the search cannot honor. Also used after CLI
/// overrides are applied.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    // Contest rules
    let contest = &config.contest;
    if contest.salary_cap == 0 {
        return Err(invalid("contest.salary_cap", "must be greater than 0"));
    }
    if contest.min_salary > contest.salary_cap {
        return Err(invalid(
            "contest.min_salary",
            format!(
                "must not exceed salary_cap ({} > {})",
                contest.min_salary, contest.salary_cap
            ),
        ));
    }
    if contest.max_players_per_team == 0 {
        return Err(invalid("contest.max_players_per_team", "must be greater than 0"));
    }
    if contest.min_teams > 9 {
        return Err(invalid(
            "contest.min_teams",
            format!("a lineup has 9 players, got {}", contest.min_teams),
        ));
    }

    // Strategy
    let strategy = &config.strategy;
    if strategy.num_lineups == 0 {
        return Err(invalid("optimization.num_lineups", "must be greater than 0"));
    }

    let stacks = &strategy.stacks;
    if stacks.min_salary > stacks.max_salary {
        return Err(invalid(
            "stacks.min_salary",
            format!(
                "must not exceed stacks.max_salary ({} > {})",
                stacks.min_salary, stacks.max_salary
            ),
        ));
    }
    if stacks.count == 0 {
        return Err(invalid("stacks.count", "must be greater than 0"));
    }
    if strategy.num_lineups < stacks.count {
        return Err(invalid(
            "optimization.num_lineups",
            format!(
                "must be at least stacks.count ({} < {})",
                strategy.num_lineups, stacks.count
            ),
        ));
    }

    let search = &strategy.search;
    if search.max_attempts == 0 {
        return Err(invalid("search.max_attempts", "must be greater than 0"));
    }
    if search.oversample == 0 {
        return Err(invalid("search.oversample", "must be greater than 0"));
    }

    // Pool sizes must be positive
    let pools = &strategy.pools;
    let pool_fields: &[(&str, usize)] = &[
        ("pools.rb_top", pools.rb_top),
        ("pools.wr_top", pools.wr_top),
        ("pools.te_top", pools.te_top),
        ("pools.dst_top", pools.dst_top),
        ("pools.merge_top", pools.merge_top),
        ("pools.flex_window", pools.flex_window),
    ];
    for (name, val) in pool_fields {
        if *val == 0 {
            return Err(invalid(name, "must be > 0"));
        }
    }

    let optimizer = &strategy.optimizer;
    if optimizer.flex_candidates == 0 {
        return Err(invalid("optimizer.flex_candidates", "must be > 0"));
    }
    if optimizer.improve_candidates == 0 {
        return Err(invalid("optimizer.improve_candidates", "must be > 0"));
    }
    let tol = optimizer.salary_score_tolerance;
    if !(0.0..=1.0).contains(&tol) {
        return Err(invalid(
            "optimizer.salary_score_tolerance",
            format!("must be between 0.0 and 1.0 inclusive, got {tol}"),
        ));
    }

    let threshold = strategy.ownership.threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(invalid(
            "ownership.threshold",
            format!("must be in (0.0, 1.0], got {threshold}"),
        ));
    }
    if strategy.ownership.max_passes == 0 {
        return Err(invalid("ownership.max_passes", "must be > 0"));
    }

    for (name, val) in strategy.weights.as_pairs() {
        if !val.is_finite() || val < 0.0 {
            return Err(invalid(
                &format!("scoring.{name}"),
                format!("must be a non-negative number, got {val}"),
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
