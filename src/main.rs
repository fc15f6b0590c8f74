mod error;
mod graph;
mod manager;
mod record;
mod registry;
mod scoring;
mod stats;

use crate::graph::compute_graph_stats;
use crate::manager::{Manager, Overrides, save_json, score_record};
use crate::record::RunRecord;
use crate::registry::Registry;
use crate::scoring::score_from_remote;
use crate::stats::EqualWidthBinner;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// TOML file with the environment specifications.
    #[arg(long)]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct ScoreArgs {
    /// Override the number of trials of the environment.
    #[arg(long)]
    trials: Option<usize>,

    /// Override the reward threshold of the environment.
    #[arg(long)]
    reward_threshold: Option<f64>,
}

#[derive(Debug, Subcommand)]
enum Command {
    Score {
        /// Record file or http(s) URL.
        #[arg(long)]
        input: String,

        #[command(flatten)]
        score_args: ScoreArgs,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    Graph {
        /// Record file or http(s) URL.
        #[arg(long)]
        input: String,

        #[arg(long)]
        buckets: usize,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    Analyze {
        #[arg(long)]
        run_dir: PathBuf,

        #[arg(long, default_value_t = 100)]
        buckets: usize,

        #[command(flatten)]
        score_args: ScoreArgs,
    },

    Clean {
        #[arg(long)]
        run_dir: PathBuf,
    },
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let registry = match &args.registry {
        Some(file) => {
            let registry = Registry::from_file(file)
                .with_context(|| format!("failed to load registry {file:?}"))?;
            log::info!("loaded {} environments from {file:?}", registry.len());
            Some(registry)
        }
        None => None,
    };

    match args.command {
        Command::Score {
            input,
            score_args,
            output,
        } => {
            let overrides = Overrides::from(score_args);
            let no_overrides = overrides.trials.is_none() && overrides.reward_threshold.is_none();
            let summary = match &registry {
                Some(registry) if is_url(&input) && no_overrides => {
                    score_from_remote(&input, registry)
                        .with_context(|| format!("failed to score {input}"))?
                }
                _ => {
                    let record = load_record(&input)?;
                    score_record(&record, registry.as_ref(), &overrides)
                        .with_context(|| format!("failed to score {input}"))?
                }
            };
            emit(&summary, output)?;
        }
        Command::Graph {
            input,
            buckets,
            output,
        } => {
            let record = load_record(&input)?;
            let graph_stats = compute_graph_stats(
                &record.episode_lengths,
                &record.episode_rewards,
                &record.timestamps,
                buckets,
                &EqualWidthBinner,
            )
            .with_context(|| format!("failed to bucket {input}"))?;
            emit(&graph_stats, output)?;
        }
        Command::Analyze {
            run_dir,
            buckets,
            score_args,
        } => {
            let mgr = Manager::new(run_dir).context("failed to construct mgr")?;
            let n_runs = mgr.analyze_runs(registry.as_ref(), &Overrides::from(score_args), buckets)?;
            log::info!("analyzed {n_runs} runs");
        }
        Command::Clean { run_dir } => {
            let mgr = Manager::new(run_dir).context("failed to construct mgr")?;
            mgr.clean_runs()?;
        }
    }

    Ok(())
}

impl From<ScoreArgs> for Overrides {
    fn from(args: ScoreArgs) -> Self {
        Self {
            trials: args.trials,
            reward_threshold: args.reward_threshold,
        }
    }
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

fn load_record(input: &str) -> Result<RunRecord> {
    if is_url(input) {
        Ok(RunRecord::from_url(input)?)
    } else {
        RunRecord::from_file(input).with_context(|| format!("failed to load {input}"))
    }
}

fn emit<T: Serialize>(value: &T, output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(file) => save_json(value, &file),
        None => {
            let json = serde_json::to_string_pretty(value).context("failed to serialize results")?;
            println!("{json}");
            Ok(())
        }
    }
}
