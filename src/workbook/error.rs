use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkbookError {
    /// The page text could not be parsed. `source_name` is filled in by the
    /// package layer with the page path once it is known.
    #[error("{}", format_error_message(.source_name, .line, .message))]
    Format {
        source_name: Option<String>,
        line: Option<usize>,
        message: String,
    },

    #[error("Workbook not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unsupported workbook at {}: {reason}", path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Index {index} is out of range for a document with {len} cells")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Operation was cancelled")]
    Cancelled,

    #[error("Opening {} was declined by the quarantine check", .0.display())]
    QuarantineRejected(PathBuf),
}

impl WorkbookError {
    pub fn format(message: impl Into<String>) -> Self {
        WorkbookError::Format {
            source_name: None,
            line: None,
            message: message.into(),
        }
    }

    pub fn format_at(line: usize, message: impl Into<String>) -> Self {
        WorkbookError::Format {
            source_name: None,
            line: Some(line),
            message: message.into(),
        }
    }

    /// Attaches a file name to a format error; other variants pass through.
    pub fn with_source_name(self, name: impl Into<String>) -> Self {
        match self {
            WorkbookError::Format {
                source_name: None,
                line,
                message,
            } => WorkbookError::Format {
                source_name: Some(name.into()),
                line,
                message,
            },
            other => other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkbookError::Cancelled)
    }
}

fn format_error_message(
    source_name: &Option<String>,
    line: &Option<usize>,
    message: &str,
) -> String {
    match (source_name, line) {
        (Some(name), Some(line)) => format!("Invalid workbook {}:{}: {}", name, line, message),
        (Some(name), None) => format!("Invalid workbook {}: {}", name, message),
        (None, Some(line)) => format!("Invalid workbook (line {}): {}", line, message),
        (None, None) => format!("Invalid workbook: {}", message),
    }
}

pub type Result<T> = std::result::Result<T, WorkbookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_display_includes_context() {
        let err = WorkbookError::format_at(7, "missing closing fence").with_source_name("index.workbook");
        assert_eq!(
            err.to_string(),
            "Invalid workbook index.workbook:7: missing closing fence"
        );
    }

    #[test]
    fn test_with_source_name_keeps_existing_name() {
        let err = WorkbookError::Format {
            source_name: Some("a.workbook".into()),
            line: None,
            message: "bad".into(),
        }
        .with_source_name("b.workbook");
        assert_eq!(err.to_string(), "Invalid workbook a.workbook: bad");
    }

    #[test]
    fn test_with_source_name_ignores_other_variants() {
        let err = WorkbookError::Cancelled.with_source_name("x");
        assert!(err.is_cancelled());
    }
}
