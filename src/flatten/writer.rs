use crate::flatten::error::RecordError;
use crate::flatten::types::OutputRecord;
use anyhow::{Context, Result};
use std::io::Write;

/// Writes flattened records as JSON Lines
pub struct RecordWriter<W: Write> {
    writer: W,
    written: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W) -> Self {
        RecordWriter { writer, written: 0 }
    }

    /// Encode a record and write it as one line.
    ///
    /// The outer error is an I/O failure on the output and ends the run; the
    /// inner one means this record could not be encoded and nothing was written.
    pub fn write_record(&mut self, record: &OutputRecord) -> Result<Result<(), RecordError>> {
        let mut line = match serde_json::to_vec(record) {
            Ok(line) => line,
            Err(e) => return Ok(Err(RecordError::Encode(e))),
        };
        line.push(b'\n');

        self.writer
            .write_all(&line)
            .context("Failed to write record")?;
        self.written += 1;
        Ok(Ok(()))
    }

    /// Lines written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }
}
