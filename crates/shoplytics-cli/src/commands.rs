use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};

use anyhow::{Context, Result};

use shoplytics_core::{
    run_analysis, AnalysisReport, EngineConfig, SegmentThresholds, ThresholdOverrides,
    TimestampFormat,
};

use crate::cli::{AnalyzeArgs, Command, GenerateArgs, SampleArgs};
use crate::demo::write_demo_csv;
use crate::sample::{sample_csv, RowSampler};
use crate::source::load_store;

pub fn run(command: Command) -> Result<()> {
    match command {
        Command::Analyze(args) => analyze(&args),
        Command::Sample(args) => sample(&args),
        Command::Generate(args) => generate(&args),
    }
}

/// Layer command-line flags over the `SHOPLYTICS_*` environment configuration.
pub fn engine_config(args: &AnalyzeArgs, base: EngineConfig) -> Result<EngineConfig> {
    let mut config = base;
    config.load.strict = switch(config.load.strict, args.strict, args.no_strict);
    config.load.dedupe = switch(config.load.dedupe, args.dedupe, args.no_dedupe);
    if let Some(raw) = &args.timestamp_format {
        config.load.timestamp_format = TimestampFormat::parse(raw)?;
    }
    let parse = |name: &'static str, raw: &Option<String>| -> Result<Option<i64>> {
        Ok(raw
            .as_deref()
            .map(|raw| SegmentThresholds::parse_value(name, raw))
            .transpose()?)
    };
    config.thresholds = config.thresholds.with_overrides(ThresholdOverrides {
        high_buy: parse("high_buy", &args.high_buy)?,
        interest_min: parse("interest_min", &args.interest_min)?,
        browse_min: parse("browse_min", &args.browse_min)?,
    });
    if let Some(top_n) = args.top_n {
        config.top_n = top_n;
    }
    Ok(config)
}

/// `--flag` / `--no-flag` pair over an inherited value; clap keeps only the last one given.
fn switch(inherited: bool, on: bool, off: bool) -> bool {
    match (on, off) {
        (true, _) => true,
        (_, true) => false,
        _ => inherited,
    }
}

pub fn analyze_reader<R: Read>(
    reader: R,
    config: &EngineConfig,
    sampler: Option<RowSampler>,
) -> Result<AnalysisReport> {
    let store = load_store(reader, &config.load, sampler)?;
    Ok(run_analysis(&store, config)?)
}

fn analyze(args: &AnalyzeArgs) -> Result<()> {
    let config = engine_config(args, EngineConfig::from_env()?)?;
    let sampler = args
        .sample
        .map(|ratio| RowSampler::new(ratio, args.seed))
        .transpose()?;

    let file = File::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;
    tracing::info!(input = %args.input.display(), strict = config.load.strict, "Analyzing event log");
    let report = analyze_reader(BufReader::new(file), &config, sampler)
        .with_context(|| format!("analysis of {} failed", args.input.display()))?;

    let rendered = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    match &args.output {
        Some(path) => {
            let mut out = BufWriter::new(
                File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?,
            );
            writeln!(out, "{rendered}")?;
            out.flush()?;
            tracing::info!(output = %path.display(), "Report written");
        }
        None => {
            let mut out = io::stdout().lock();
            writeln!(out, "{rendered}")?;
        }
    }
    Ok(())
}

fn sample(args: &SampleArgs) -> Result<()> {
    let sampler = RowSampler::new(args.ratio, args.seed)?;
    let input = File::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;
    let output = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    sample_csv(BufReader::new(input), BufWriter::new(output), sampler)?;
    Ok(())
}

fn generate(args: &GenerateArgs) -> Result<()> {
    let output = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    write_demo_csv(BufWriter::new(output), args.rows, args.seed)?;
    Ok(())
}
