//! Error types for the PDF splitter

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the splitter library
#[derive(Error, Debug)]
pub enum Error {
    /// Input path does not resolve to a readable file
    #[error("File not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// Source could not be parsed, even with lenient recovery
    #[error("Cannot read PDF {source_name}: {reason}")]
    Read { source_name: String, reason: String },

    /// A single page could not be retrieved or copied
    #[error("Page {index} is not accessible: {reason}")]
    PageAccess { index: usize, reason: String },

    /// A whole range failed to finalize
    #[error("Pages {start}..{end} could not be serialized: {reason}")]
    RangeSerialization {
        start: usize,
        end: usize,
        reason: String,
    },

    /// Persisting one output failed
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Group size must be at least one page
    #[error("Invalid group size {0}: must be at least 1")]
    InvalidGroupSize(usize),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
