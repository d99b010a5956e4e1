//! pdflex library
//!
//! Splits a PDF into documents of N pages each, tolerating damaged input:
//! - Open a source PDF leniently, rebuilding a broken cross-reference table
//! - Cache parsed documents per file, invalidated when the file changes
//! - Plan contiguous page ranges and build one self-contained PDF per range
//! - Skip pages or ranges that cannot be copied, and report exactly which
//! - Write the results as `split_<n>.pdf` files
//!
//! # Example
//!
//! ```no_run
//! use pdflex::pdf::SourceDocument;
//! use pdflex::split::split;
//!
//! let source = SourceDocument::open("large.pdf").expect("Failed to open PDF");
//! for document in split(&source, 10).expect("Invalid group size").documents() {
//!     println!(
//!         "pages {}-{}: {} bytes",
//!         document.range.start + 1,
//!         document.range.end,
//!         document.bytes.len()
//!     );
//! }
//! ```

pub mod error;
pub mod output;
pub mod pdf;
pub mod split;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use error::{Error, Result};
pub use output::{split_to_dir, OutputWriter, SplitOptions};
pub use pdf::{DocumentCache, SourceDocument};
pub use split::{split, split_with, OutputDocument, SplitSummary};
