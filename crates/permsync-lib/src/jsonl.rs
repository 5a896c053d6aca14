//! JSONL I/O for scheme export records.
//!
//! Each line is one complete `SchemeRecord` with its roles embedded.

use std::io::{BufRead, ErrorKind, Lines, Write};

use crate::error::{PermsError, Result};
use crate::model::SchemeRecord;

/// Write one record followed by a newline.
///
/// The record goes out in a single `write_all` so a failing sink never
/// sees half a line from this call.
///
/// # Errors
///
/// Returns `Json` if serialization fails or `Io` if the sink rejects the write.
pub fn write_record<W: Write + ?Sized>(writer: &mut W, record: &SchemeRecord) -> Result<()> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');
    writer.write_all(&line)?;
    Ok(())
}

/// Iterator over the records of a JSONL stream.
///
/// Yields `(line_number, record)`; blank lines are skipped.
pub struct RecordReader<R> {
    lines: Lines<R>,
    line_num: usize,
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<(usize, SchemeRecord)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let next = self.lines.next()?;
            self.line_num += 1;
            let line = match next {
                Ok(line) => line,
                Err(e) if e.kind() == ErrorKind::InvalidData => {
                    return Some(Err(PermsError::JsonlParse {
                        line: self.line_num,
                        reason: e.to_string(),
                    }));
                }
                Err(e) => return Some(Err(PermsError::Io(e))),
            };
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let line_num = self.line_num;
            return Some(
                serde_json::from_str::<SchemeRecord>(trimmed)
                    .map(|record| (line_num, record))
                    .map_err(|e| PermsError::JsonlParse {
                        line: line_num,
                        reason: e.to_string(),
                    }),
            );
        }
    }
}

/// Read records lazily from any buffered reader.
pub fn read_records<R: BufRead>(reader: R) -> RecordReader<R> {
    RecordReader {
        lines: reader.lines(),
        line_num: 0,
    }
}
