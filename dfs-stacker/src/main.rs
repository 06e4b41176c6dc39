// DFS stack optimizer entry point.
//
// generate: load config -> build player pool -> generate lineups -> export CSV
//           -> print summary.
// backtest: score an exported lineup file against actual results.
//
// Logs go to stderr; stdout carries only the summary or report.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use dfs_stacker::backtest;
use dfs_stacker::config::{self, DataPaths};
use dfs_stacker::lineup::export;
use dfs_stacker::lineup::generator::{make_rng, LineupGenerator, LineupSummary};
use dfs_stacker::roster::player::Metric;
use dfs_stacker::roster::projections;
use dfs_stacker::roster::reference::ReferenceData;

#[derive(Debug, Parser)]
#[command(name = "dfs-stacker", version, about = "QB-stack lineup generator for NFL classic DFS slates")]
struct Cli {
    /// Directory holding config/, defaults/ and relative data paths.
    #[arg(long, global = true, default_value = ".")]
    base_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate lineups and write them to CSV.
    Generate {
        #[arg(short = 'n', long)]
        num_lineups: Option<usize>,

        #[arg(long, value_enum)]
        optimize_by: Option<Metric>,

        #[arg(long)]
        projections: Option<PathBuf>,

        /// DFS-site salary export. Pass --no-salaries to use the
        /// projections file's own salary column.
        #[arg(long, conflicts_with = "no_salaries")]
        salaries: Option<PathBuf>,

        #[arg(long)]
        no_salaries: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,

        /// NFL week; players on bye are dropped.
        #[arg(long)]
        week: Option<u32>,
    },

    /// Correlate exported lineup scores with actual results.
    Backtest {
        #[arg(long)]
        lineups: PathBuf,

        /// CSV with `Name` and `DFS Total` columns.
        #[arg(long)]
        actuals: PathBuf,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Generate {
            num_lineups,
            optimize_by,
            projections,
            salaries,
            no_salaries,
            output,
            seed,
            week,
        } => {
            let mut config = config::load_config(&cli.base_dir).context("failed to load configuration")?;
            if let Some(n) = num_lineups {
                config.strategy.num_lineups = n;
            }
            if let Some(metric) = optimize_by {
                config.strategy.metric = metric;
            }
            if let Some(seed) = seed {
                config.strategy.search.seed = Some(seed);
            }
            if let Some(p) = projections {
                config.data_paths.projections = p.display().to_string();
            }
            if let Some(p) = salaries {
                config.data_paths.salaries = Some(p.display().to_string());
            }
            if no_salaries {
                config.data_paths.salaries = None;
            }
            if let Some(p) = output {
                config.data_paths.output = p.display().to_string();
            }
            config::validate(&config).context("invalid configuration after command-line overrides")?;
            info!(
                "config loaded: {} lineups by {}, ${} cap",
                config.strategy.num_lineups, config.strategy.metric, config.contest.salary_cap
            );

            let base = cli.base_dir.as_path();
            let reference = load_reference(base, &config.data_paths.reference)?;

            let projections_path = DataPaths::resolve(base, &config.data_paths.projections);
            let salaries_path = config
                .data_paths
                .salaries
                .as_deref()
                .map(|p| DataPaths::resolve(base, p));
            let (pool, report) = projections::load_pool(&projections_path, salaries_path.as_deref(), &reference, week)
                .with_context(|| format!("failed to build player pool from {}", projections_path.display()))?;
            report.log();
            for (position, count) in pool.counts() {
                info!("{}: {} players", position, count);
            }
            if config.strategy.metric != Metric::Projected && !pool.has_boom_bust() {
                warn!(
                    "optimizing by {} without boom/bust data; scores fall back to projections",
                    config.strategy.metric
                );
            }

            let generator = LineupGenerator::from_config(&pool, &config);
            let mut rng = make_rng(config.strategy.search.seed);
            let lineups = generator.generate(&mut rng);
            if lineups.is_empty() {
                anyhow::bail!("no valid lineups could be generated from this pool");
            }

            let output_path = DataPaths::resolve(base, &config.data_paths.output);
            let scorer = generator.scorer();
            export::export_lineups(&output_path, &lineups, &scorer)
                .with_context(|| format!("failed to write {}", output_path.display()))?;
            info!("wrote {} lineups to {}", lineups.len(), output_path.display());

            print!("{}", LineupSummary::from_lineups(&lineups, &scorer));
        }

        Command::Backtest {
            lineups,
            actuals,
            json,
        } => {
            let base = cli.base_dir.as_path();
            let reference_path = config::load_config(base)
                .map(|c| c.data_paths.reference)
                .unwrap_or_else(|e| {
                    warn!("using default reference path: {}", e);
                    DataPaths::default().reference
                });
            let reference = load_reference(base, &reference_path)?;
            let report = backtest::backtest_files(&lineups, &actuals, &reference).context("backtest failed")?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("failed to serialize report")?
                );
            } else {
                print!("{report}");
            }
        }
    }

    Ok(())
}

/// Team directory and aliases; a missing file means raw identifiers.
fn load_reference(base: &Path, path: &str) -> anyhow::Result<ReferenceData> {
    let path = DataPaths::resolve(base, path);
    if !path.exists() {
        warn!("no reference data at {}; team names pass through unchanged", path.display());
        return Ok(ReferenceData::empty());
    }
    let reference = ReferenceData::load(&path).with_context(|| format!("failed to load {}", path.display()))?;
    info!("reference data: {} teams", reference.team_count());
    Ok(reference)
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dfs_stacker=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    Ok(())
}
