//! Tabular series files consumed by the charting library.
//!
//! One file per chart: a `Time` header plus one column per sub-series, then
//! one row per timestamp (milliseconds since the epoch), ascending. Missing
//! samples are empty fields.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ReportError;
use crate::metrics::{Fraction, Series};
use crate::parser::ParseError;

/// Encoding of a sample as a table cell.
pub trait SeriesValue {
    fn encode(&self) -> String;
}

impl SeriesValue for i64 {
    fn encode(&self) -> String {
        self.to_string()
    }
}

impl SeriesValue for Fraction {
    /// Stacked-fraction charts expect `numerator/denominator`.
    fn encode(&self) -> String {
        format!("{}/{}", self.numerator, self.denominator)
    }
}

/// Seconds to whole milliseconds, truncating.
pub fn epoch_ms(timestamp: f64) -> i64 {
    (timestamp * 1000.0) as i64
}

/// One encoded sub-series.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub title: String,
    pub cells: Vec<(i64, String)>,
}

impl Column {
    pub fn from_series<V: SeriesValue>(title: &str, series: &Series<V>) -> Self {
        Self {
            title: title.to_string(),
            cells: series.iter().map(|(t, v)| (epoch_ms(t), v.encode())).collect(),
        }
    }
}

/// A parsed series file.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub titles: Vec<String>,
    pub rows: Vec<(i64, Vec<Option<String>>)>,
}

/// Merges columns into rows keyed by time.
pub fn merge_rows(columns: &[Column]) -> Vec<(i64, Vec<Option<String>>)> {
    let mut rows: BTreeMap<i64, Vec<Option<String>>> = BTreeMap::new();
    for (idx, column) in columns.iter().enumerate() {
        for (ms, cell) in &column.cells {
            rows.entry(*ms).or_insert_with(|| vec![None; columns.len()])[idx] = Some(cell.clone());
        }
    }
    rows.into_iter().collect()
}

pub fn render_table(columns: &[Column]) -> String {
    let mut out = String::from("Time");
    for column in columns {
        out.push(',');
        out.push_str(&column.title);
    }
    out.push('\n');

    for (ms, cells) in merge_rows(columns) {
        out.push_str(&ms.to_string());
        for cell in cells {
            out.push(',');
            if let Some(cell) = cell {
                out.push_str(&cell);
            }
        }
        out.push('\n');
    }
    out
}

pub fn write_table(path: &Path, columns: &[Column]) -> Result<(), ReportError> {
    std::fs::write(path, render_table(columns)).map_err(|e| ReportError::io(path, e))
}

/// Parses the output of [`render_table`].
pub fn parse_table(content: &str) -> Result<Table, ParseError> {
    let mut lines = content.lines();
    let header = lines
        .next()
        .ok_or_else(|| ParseError::new("missing header"))?;
    let mut fields = header.split(',');
    if fields.next() != Some("Time") {
        return Err(ParseError::new("header must start with Time"));
    }
    let titles: Vec<String> = fields.map(str::to_string).collect();

    let mut rows = Vec::new();
    for line in lines {
        let mut fields = line.split(',');
        let ms: i64 = fields
            .next()
            .unwrap_or_default()
            .parse()
            .map_err(|_| ParseError::new(format!("invalid time in row {:?}", line)))?;
        let cells: Vec<Option<String>> = fields
            .map(|f| (!f.is_empty()).then(|| f.to_string()))
            .collect();
        if cells.len() != titles.len() {
            return Err(ParseError::new(format!(
                "expected {} values, got {} in row {:?}",
                titles.len(),
                cells.len(),
                line
            )));
        }
        rows.push((ms, cells));
    }

    Ok(Table { titles, rows })
}
