//! Headerless five-column CSV input.

use std::io::Read;

use anyhow::{Context, Result};
use csv::{ByteRecord, ReaderBuilder};

use shoplytics_core::{EventStore, LoadOptions};

use crate::sample::RowSampler;

/// Rows are read flexibly so that short or long rows reach the event store and are
/// reported as malformed rows instead of aborting the CSV reader.
fn reader_builder() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(false).flexible(true);
    builder
}

/// Reader for analysis; whitespace around fields is dropped.
pub fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    reader_builder().trim(csv::Trim::All).from_reader(reader)
}

/// Reader that leaves field bytes exactly as they appear in the input.
pub fn raw_csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    reader_builder().from_reader(reader)
}

fn record_fields(record: &ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}

/// Stream CSV rows from `reader` into an [`EventStore`], optionally keeping only a
/// random sample of them. Reported row indices are positions in the full input,
/// not in the sample.
pub fn load_store<R: Read>(
    reader: R,
    options: &LoadOptions,
    mut sampler: Option<RowSampler>,
) -> Result<EventStore> {
    let mut input = csv_reader(reader);
    let mut read_error: Option<csv::Error> = None;

    let rows = input
        .byte_records()
        .map_while(|record| match record {
            Ok(record) => Some(record),
            Err(e) => {
                read_error = Some(e);
                None
            }
        })
        .enumerate()
        .filter(|_| sampler.as_mut().map_or(true, RowSampler::keep))
        .map(|(row, record)| (row, record_fields(&record)));

    let store = EventStore::load_numbered(rows, options)?;
    if let Some(e) = read_error {
        return Err(e).context("failed to read CSV input");
    }
    Ok(store)
}
