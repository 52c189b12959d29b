//! Error types for the tab2tex library.
//!
//! Every failure is reported through [`Tab2TexError`]. Generation errors
//! (empty paste, a chart with a single column) are cheap to hit and are meant
//! to be shown to the user verbatim, so their messages say what to fix.
//! Compile-service errors keep the service's own words: the status code, or
//! the key lines of the LaTeX log.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the tab2tex library.
#[derive(Debug, Error)]
pub enum Tab2TexError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The pasted text contains no non-blank line.
    #[error("Input is empty: paste at least one row of data")]
    EmptyInput,

    /// A chart needs a key column plus at least one value column.
    #[error("A chart needs at least 2 columns (x and y), got {columns}")]
    TooFewColumns { columns: usize },

    /// No cell of the key column or of the value columns is numeric.
    #[error("No numeric data to plot: column {column} has no numeric cells")]
    NoNumericData { column: usize },

    /// An option string (legend position, scale mode, model…) is not recognised.
    #[error("Invalid {option} '{value}'. Expected one of: {expected}")]
    InvalidOption {
        option: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A regression column index is outside the table.
    #[error("Column {column} is out of range (table has {width} columns)")]
    ColumnOutOfRange { column: usize, width: usize },

    // ── Compile-service errors ────────────────────────────────────────────
    /// The request never reached the service (DNS, TLS, connection refused).
    #[error("Failed to reach compile service '{endpoint}': {reason}")]
    CompileRequestFailed { endpoint: String, reason: String },

    /// The service did not answer in time.
    #[error("Compile service timed out after {secs}s\nIncrease --compile-timeout.")]
    CompileTimeout { secs: u64 },

    /// The service answered with a non-2xx status.
    #[error("Compile service returned HTTP {status}: {body}")]
    CompileHttpStatus { status: u16, body: String },

    /// The service answered with a compiler log instead of a PDF.
    #[error("LaTeX compilation failed:\n{excerpt}")]
    CompileFailed { excerpt: String, log: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not read the input file.
    #[error("Failed to read input '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Tab2TexError {
    /// The full compiler log when the service rejected the document.
    pub fn compile_log(&self) -> Option<&str> {
        match self {
            Tab2TexError::CompileFailed { log, .. } => Some(log),
            _ => None,
        }
    }
}
