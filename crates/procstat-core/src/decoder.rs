//! Decoder for the line-oriented procstat log.
//!
//! Each line is one operation:
//!
//! ```text
//! T + 1288112101.512       scan begins
//! /proc/stat:ctxt = 12345  set key to the rest of the line
//! /proc/42/stat -          delete key
//! T - 1288112101.530       scan ends
//! ```
//!
//! Anything else is fatal for the whole run.

use std::io::BufRead;
use std::path::PathBuf;

use crate::error::ReportError;

/// Key used by scan timestamp markers.
const SCAN_MARKER: &str = "T";

/// One decoded log line.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// `T + <seconds>`: a scan is about to begin.
    BeginScan(f64),
    /// `T - <seconds>`: the scan is complete.
    EndScan(f64),
    /// `<key> = <value...>` or `<key> + <value...>`.
    Set { key: String, value: String },
    /// `<key> -`.
    Delete(String),
}

/// Splits off the first whitespace-delimited token.
fn split_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some((&s[..end], &s[end..]))
}

/// Decodes a single log line. `line_no` is 1-based and only used for errors.
pub fn parse_line(line_no: usize, line: &str) -> Result<Operation, ReportError> {
    let malformed = || ReportError::malformed(line_no, line);

    let (name, rest) = split_token(line).ok_or_else(malformed)?;
    let (op, rest) = split_token(rest).ok_or_else(malformed)?;
    if !matches!(op, "+" | "-" | "=") {
        return Err(malformed());
    }

    if name == SCAN_MARKER && op != "=" {
        let t: f64 = rest
            .trim()
            .parse()
            .ok()
            .filter(|t: &f64| t.is_finite())
            .ok_or_else(malformed)?;
        return Ok(if op == "+" {
            Operation::BeginScan(t)
        } else {
            Operation::EndScan(t)
        });
    }

    if op == "-" {
        return Ok(Operation::Delete(name.to_string()));
    }

    Ok(Operation::Set {
        key: name.to_string(),
        value: rest.trim().to_string(),
    })
}

/// Iterator decoding operations from a buffered reader.
///
/// Lines are decoded lossily: `comm` fields may hold arbitrary bytes.
/// Yields the first error and then stops.
pub struct LogDecoder<R> {
    reader: R,
    buf: Vec<u8>,
    path: PathBuf,
    line_no: usize,
    failed: bool,
}

impl<R: BufRead> LogDecoder<R> {
    /// `path` names the source in I/O errors.
    pub fn new(reader: R, path: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            path: path.into(),
            line_no: 0,
            failed: false,
        }
    }

    /// Number of lines consumed so far.
    pub fn line_count(&self) -> usize {
        self.line_no
    }
}

impl<R: BufRead> Iterator for LogDecoder<R> {
    type Item = Result<Operation, ReportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => return None,
            Ok(_) => {}
            Err(e) => {
                self.failed = true;
                return Some(Err(ReportError::io(self.path.clone(), e)));
            }
        }
        let mut bytes = self.buf.as_slice();
        if let Some(rest) = bytes.strip_suffix(b"\n") {
            bytes = rest.strip_suffix(b"\r").unwrap_or(rest);
        }
        let line = String::from_utf8_lossy(bytes);
        self.line_no += 1;
        let op = parse_line(self.line_no, &line);
        self.failed = op.is_err();
        Some(op)
    }
}
