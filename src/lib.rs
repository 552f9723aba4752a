//! # batch-flatten
//!
//! Converts a batch job listing (a JSON array of nested batch records) into
//! newline-delimited JSON, one flat object per valid record, with the job's
//! elapsed time and run time derived from its timestamps.
//!
//! ## Quick Start
//!
//! ```rust
//! use batch_flatten::flatten_batches;
//!
//! # fn main() -> anyhow::Result<()> {
//! let input = r#"[{
//!     "batchType": "PYSPARK",
//!     "createTime": "2024-01-01T00:00:00Z",
//!     "creator": "etl@example.com",
//!     "labels": {"goog-dataproc-location": "us-central1"},
//!     "runtimeConfig": {"properties": {"spark:spark.app.name": "nightly"}},
//!     "state": "SUCCEEDED",
//!     "stateTime": "2024-01-01T00:05:30Z",
//!     "stateHistory": [{"state": "RUNNING", "stateStartTime": "2024-01-01T00:00:30Z"}]
//! }]"#;
//!
//! let mut output = Vec::new();
//! let summary = flatten_batches(input.as_bytes(), &mut output)?;
//!
//! assert_eq!(summary.written, 1);
//! let line = String::from_utf8(output)?;
//! assert!(line.contains(r#""spark_spark_app_name":"nightly""#));
//! assert!(line.contains(r#""elapsed_time":"330""#));
//! assert!(line.contains(r#""run_time":"300""#));
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

pub mod flatten;

pub use flatten::{
    ArrayStream, BatchTransformer, Config, InputRecord, OutputRecord, RecordWriter, RunSummary,
};

/// Main entry point: convert the file at `config.input` into `config.output`
pub fn run(config: &Config) -> Result<RunSummary> {
    let input = File::open(&config.input)
        .with_context(|| format!("Cannot open input file: {}", config.input.display()))?;
    let output = File::create(&config.output)
        .with_context(|| format!("Cannot create output file: {}", config.output.display()))?;

    let summary = flatten_batches(BufReader::new(input), BufWriter::new(output))?;

    info!(
        "Converted {} to {}: {} read, {} written, {} incomplete, {} invalid",
        config.input.display(),
        config.output.display(),
        summary.read,
        summary.written,
        summary.skipped_incomplete,
        summary.skipped_invalid,
    );
    Ok(summary)
}

/// Stream every record of a JSON array from `reader` to `writer` as JSON Lines
pub fn flatten_batches<R: BufRead, W: Write>(reader: R, writer: W) -> Result<RunSummary> {
    let mut stream = ArrayStream::open(reader).context("Failed to read start of batch array")?;
    let transformer = BatchTransformer::new();
    let mut writer = RecordWriter::new(writer);
    let mut summary = RunSummary::default();

    while let Some(element) = stream
        .next_element::<Option<InputRecord>>()
        .context("Failed to read batch array")?
    {
        let index = stream.decoded() - 1;

        // A null element has none of the required fields
        let transformed = match element {
            Some(record) => transformer.transform(record),
            None => Ok(None),
        };

        let output = match transformed {
            Ok(Some(output)) => output,
            Ok(None) => {
                debug!("record {}: missing a required field, skipped", index);
                summary.skipped_incomplete += 1;
                continue;
            }
            Err(e) => {
                warn!("record {}: {}", index, e);
                summary.skipped_invalid += 1;
                continue;
            }
        };

        if let Err(e) = writer.write_record(&output)? {
            warn!("record {}: {}", index, e);
            summary.skipped_invalid += 1;
        }
    }

    summary.read = stream.decoded();
    if let Err(e) = stream.close() {
        warn!("{}", e);
    }

    writer.flush()?;
    summary.written = writer.written();
    Ok(summary)
}
