//! Error types for the report pipeline.

use std::path::PathBuf;

/// Errors that abort report generation.
///
/// Every variant is fatal: the pipeline never writes a partial report.
#[derive(Debug)]
pub enum ReportError {
    /// A log line that is not `name op [value...]` with `op` in `+ - =`,
    /// or a scan marker whose timestamp does not parse.
    MalformedLogLine { line_no: usize, line: String },
    /// I/O error while reading the log or writing report files.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Chart options could not be encoded for the document.
    Encode {
        chart: String,
        source: serde_json::Error,
    },
}

impl ReportError {
    pub fn malformed(line_no: usize, line: impl Into<String>) -> Self {
        ReportError::MalformedLogLine {
            line_no,
            line: line.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn encode(chart: impl Into<String>, source: serde_json::Error) -> Self {
        ReportError::Encode {
            chart: chart.into(),
            source,
        }
    }
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::MalformedLogLine { line_no, line } => {
                write!(f, "invalid input at line {}: {:?}", line_no, line)
            }
            ReportError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            ReportError::Encode { chart, source } => {
                write!(f, "cannot encode options of chart {}: {}", chart, source)
            }
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::MalformedLogLine { .. } => None,
            ReportError::Io { source, .. } => Some(source),
            ReportError::Encode { source, .. } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display_includes_line() {
        let err = ReportError::malformed(7, "X ? foo");
        let msg = err.to_string();
        assert!(msg.contains("line 7"));
        assert!(msg.contains("X ? foo"));
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error;
        let err = ReportError::io(
            "/nonexistent/log",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.source().is_some());
        assert!(err.to_string().contains("/nonexistent/log"));
    }

    #[test]
    fn test_encode_error_names_chart() {
        use std::error::Error;
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err = ReportError::encode("proc42", json_err);
        assert!(err.to_string().contains("chart proc42"));
        assert!(err.source().is_some());
    }
}
