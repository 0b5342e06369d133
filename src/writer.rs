//! CSV serialization of fetched records in schema column order

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::config::ColumnSchema;
use crate::error::{Error, Result};
use crate::formatter::format_value;
use crate::types::Record;

/// Row counts from one write pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteStats {
    /// Data rows written (header excluded)
    pub rows_written: u64,
    /// Rows dropped because writing them failed
    pub rows_skipped: u64,
}

/// Build the cells for one record, one per schema column
///
/// Always returns exactly `schema.len()` cells; absent fields become empty cells.
pub fn render_row(schema: &ColumnSchema, record: &Record) -> Vec<String> {
    schema
        .columns
        .iter()
        .map(|column| format_value(schema, column, record.get(column)))
        .collect()
}

/// Outcome of handing one encoded line to the sink
enum LineOutcome {
    Written,
    /// The sink refused the line before accepting any of its bytes
    Rejected(std::io::Error),
}

/// Encode one row as a complete CSV line, terminator included
fn encode_line<I>(fields: I) -> Result<Vec<u8>>
where
    I: IntoIterator,
    I::Item: AsRef<[u8]>,
{
    let mut line = csv::Writer::from_writer(Vec::new());
    line.write_record(fields)?;
    line.into_inner().map_err(|e| Error::Io(e.into_error()))
}

/// Write a whole line or nothing of it
///
/// A line the sink refuses outright is reported as rejected. A line that was partly
/// accepted cannot be taken back, so that case is an error.
fn write_line<W: Write>(sink: &mut W, line: &[u8], row: usize) -> Result<LineOutcome> {
    let mut written = 0;
    while written < line.len() {
        match sink.write(&line[written..]) {
            Ok(0) if written == 0 => {
                return Ok(LineOutcome::Rejected(std::io::ErrorKind::WriteZero.into()));
            }
            Ok(0) => {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    format!("row {row} was partly written before the sink stopped accepting data"),
                )));
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) if written == 0 => return Ok(LineOutcome::Rejected(e)),
            Err(e) => {
                return Err(Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("row {row} was partly written: {e}"),
                )));
            }
        }
    }
    Ok(LineOutcome::Written)
}

/// Write the header and one row per record to `sink`
///
/// Each row is encoded in full before it reaches the sink, so a row the sink refuses is
/// logged and skipped without leaving a fragment behind. Failing to write the header, a row
/// torn halfway through, or a failed final flush aborts the write.
pub fn write_csv<W: Write>(
    schema: &ColumnSchema,
    records: &[Record],
    sink: W,
) -> Result<WriteStats> {
    let mut sink = BufWriter::new(sink);
    sink.write_all(&encode_line(&schema.columns)?)?;

    let mut stats = WriteStats::default();
    for (index, record) in records.iter().enumerate() {
        let line = match encode_line(render_row(schema, record)) {
            Ok(line) => line,
            Err(e) => {
                warn!(row = index, error = %e, "Error encoding record as CSV, skipping");
                stats.rows_skipped += 1;
                continue;
            }
        };
        match write_line(&mut sink, &line, index)? {
            LineOutcome::Written => stats.rows_written += 1,
            LineOutcome::Rejected(e) => {
                warn!(row = index, error = %e, "Error writing record to CSV, skipping");
                stats.rows_skipped += 1;
            }
        }
    }

    sink.flush()?;
    debug!(
        rows_written = stats.rows_written,
        rows_skipped = stats.rows_skipped,
        "CSV write complete"
    );
    Ok(stats)
}

/// Create `path` (and its parent directory) and write the table into it
///
/// Any existing file at `path` is replaced.
///
/// # Errors
/// Returns [`Error::Sink`] when the directory or file cannot be created; nothing is written
/// in that case.
pub fn write_csv_file(
    path: &Path,
    schema: &ColumnSchema,
    records: &[Record],
) -> Result<WriteStats> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| Error::Sink {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let file = File::create(path).map_err(|source| Error::Sink {
        path: path.to_path_buf(),
        source,
    })?;

    write_csv(schema, records, file)
}
