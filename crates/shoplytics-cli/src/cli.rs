use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::demo::DEFAULT_ROWS;
use crate::sample::DEFAULT_SEED;

/// Descriptive analytics for e-commerce behavior logs.
#[derive(Debug, Parser)]
#[command(name = "shoplytics", version, about)]
pub struct Cli {
    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load an event log and print the full analysis report as JSON.
    Analyze(AnalyzeArgs),
    /// Write a random subset of an event log's rows to a new file.
    Sample(SampleArgs),
    /// Write a synthetic event log.
    Generate(GenerateArgs),
}

#[derive(Debug, Clone, Args)]
pub struct AnalyzeArgs {
    /// Headerless CSV: user_id,item_id,category_id,behavior_type,timestamp.
    #[arg(long, short)]
    pub input: PathBuf,

    /// Write the report here instead of stdout.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Analyze only this fraction of rows, chosen at random.
    #[arg(long)]
    pub sample: Option<f64>,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Abort on the first malformed row instead of skipping it.
    #[arg(long, overrides_with = "no_strict")]
    pub strict: bool,

    /// Skip malformed rows even when SHOPLYTICS_STRICT is set.
    #[arg(long, overrides_with = "strict")]
    pub no_strict: bool,

    /// Drop repeated (user, item, behavior, timestamp) rows.
    #[arg(long, overrides_with = "no_dedupe")]
    pub dedupe: bool,

    /// Keep repeated rows even when SHOPLYTICS_DEDUPE is set.
    #[arg(long, overrides_with = "dedupe")]
    pub no_dedupe: bool,

    /// `epoch` or a strftime pattern such as "%Y-%m-%d %H:%M:%S".
    #[arg(long)]
    pub timestamp_format: Option<String>,

    /// Purchases needed for the core tier.
    #[arg(long)]
    pub high_buy: Option<String>,

    /// Cart + favorite events needed for the interested tier.
    #[arg(long)]
    pub interest_min: Option<String>,

    /// Page views needed for the browsing tier.
    #[arg(long)]
    pub browse_min: Option<String>,

    /// Length of the top items / categories lists.
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Single-line JSON instead of pretty-printed.
    #[arg(long)]
    pub compact: bool,
}

#[derive(Debug, Clone, Args)]
pub struct SampleArgs {
    #[arg(long, short)]
    pub input: PathBuf,

    #[arg(long, short, default_value = "UserBehavior_sampled.csv")]
    pub output: PathBuf,

    /// Fraction of rows to keep, in (0, 1].
    #[arg(long, default_value_t = 0.01)]
    pub ratio: f64,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
}

#[derive(Debug, Clone, Args)]
pub struct GenerateArgs {
    #[arg(long, short, default_value = "UserBehavior_sampled.csv")]
    pub output: PathBuf,

    #[arg(long, default_value_t = DEFAULT_ROWS)]
    pub rows: usize,

    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,
}
