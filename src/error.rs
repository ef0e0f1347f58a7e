use std::path::PathBuf;

use thiserror::Error;

use crate::domain::ReportColumn;

/// Application-level error: a message plus the process exit code.
///
/// Exit codes: 2 = I/O or usage, 3 = no usable data, 4 = corrupt persisted store.
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Per-file ingest failures.
///
/// These never abort a batch: the file is logged, skipped and left in place.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("malformed filename '{0}'")]
    MalformedFilename(String),

    #[error("invalid date format '{token}' in filename '{file}'")]
    UnparseableDate { file: String, token: String },

    #[error("no data table found")]
    MissingDataTable,

    #[error("no data rows")]
    EmptyDataTable,

    #[error("failed to read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single cell that failed numeric coercion; reported, never returned.
    #[error("non-numeric value '{value}' in column '{column}'")]
    NumericCoercion { column: ReportColumn, value: String },
}
