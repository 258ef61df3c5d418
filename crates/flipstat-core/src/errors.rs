//! Error types for loading, aggregating and writing metric tables.

use std::path::{Path, PathBuf};

/// Pipeline errors.
///
/// Per-cell coercion failures are not errors: they are recovered as missing
/// values and counted in the load report.
#[derive(Debug, thiserror::Error)]
pub enum FlipstatError {
    /// Input file does not exist or cannot be opened.
    #[error("input file not found or unreadable: {}", path.display())]
    MissingFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A required column is absent from the input header.
    #[error("required column `{column}` is missing from {}", path.display())]
    Schema { path: PathBuf, column: String },

    /// A metric column was requested that the table never loaded.
    #[error("metric column `{column}` is not loaded in this table")]
    UnknownMetric { column: String },

    /// More than one row maps to the same pivot cell.
    #[error("duplicate rows for {row_key}={row}, {col_key}={col} while reshaping `{metric}`")]
    DuplicateKey {
        row_key: String,
        col_key: String,
        row: String,
        col: String,
        metric: String,
    },

    /// Structurally malformed CSV (bad quoting, unreadable record).
    #[error("malformed csv in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Output could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Chart sink failed to render.
    #[error("failed to render chart {}: {message}", path.display())]
    Render { path: PathBuf, message: String },
}

impl FlipstatError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn render(path: impl AsRef<Path>, err: impl std::fmt::Display) -> Self {
        Self::Render {
            path: path.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Exit code for the binaries. See `flipstat_cli::exit_codes`.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Input / configuration
            Self::MissingFile { .. } => 2,
            Self::Config { .. } => 2,

            // Data shape
            Self::Schema { .. } => 3,
            Self::UnknownMetric { .. } => 3,
            Self::DuplicateKey { .. } => 3,
            Self::Csv { .. } => 3,

            // Output
            Self::Io { .. } => 4,
            Self::Render { .. } => 4,
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, FlipstatError>;
