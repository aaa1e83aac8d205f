//! Seeded row sampling, used to cut multi-million-row logs down before analysis.

use std::io::{Read, Write};

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::source::raw_csv_reader;

pub const DEFAULT_SEED: u64 = 42;

/// Keeps each row independently with probability `fraction`.
#[derive(Debug, Clone)]
pub struct RowSampler {
    rng: StdRng,
    fraction: f64,
}

impl RowSampler {
    pub fn new(fraction: f64, seed: u64) -> Result<Self> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            bail!("sample ratio must be in (0, 1], got {fraction}");
        }
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            fraction,
        })
    }

    pub fn keep(&mut self) -> bool {
        self.fraction >= 1.0 || self.rng.gen_bool(self.fraction)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleSummary {
    pub rows_read: u64,
    pub rows_written: u64,
}

/// Copy a random subset of CSV rows from `input` to `output`, unchanged and headerless.
pub fn sample_csv<R: Read, W: Write>(
    input: R,
    output: W,
    mut sampler: RowSampler,
) -> Result<SampleSummary> {
    let mut reader = raw_csv_reader(input);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(output);
    let mut summary = SampleSummary {
        rows_read: 0,
        rows_written: 0,
    };

    for record in reader.byte_records() {
        let record = record.context("failed to read CSV input")?;
        summary.rows_read += 1;
        if sampler.keep() {
            writer
                .write_byte_record(&record)
                .context("failed to write sampled row")?;
            summary.rows_written += 1;
        }
        if summary.rows_read % 1_000_000 == 0 {
            tracing::info!(rows_read = summary.rows_read, "Sampling in progress");
        }
    }
    writer.flush().context("failed to flush sampled output")?;

    tracing::info!(
        rows_read = summary.rows_read,
        rows_written = summary.rows_written,
        "Sampling complete"
    );
    Ok(summary)
}
