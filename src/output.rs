//! Persisting produced documents as `split_<n>.pdf` files

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{info, warn};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::pdf::SourceDocument;
use crate::split::{split, OutputDocument, OutputRange, RangeOutcome, SplitSummary, WriteFailure};

/// Directory used when the caller does not choose one
pub const DEFAULT_OUTPUT_DIR: &str = "split_output";

/// Options for splitting a document into files
#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Pages per output document
    pub group_size: usize,
    /// Directory receiving the `split_<n>.pdf` files
    pub output_dir: PathBuf,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            group_size: crate::split::plan::DEFAULT_GROUP_SIZE,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// File name of the output for `range`; numbering starts at 1
///
/// `n` is the range number, not the count of files produced so far. When a
/// range is skipped its number is left unused, so `split_3.pdf` always holds
/// the third group of pages even if `split_2.pdf` was never written. This
/// differs from numbering outputs in production order, where every file after
/// a skipped range would shift down by one.
pub fn file_name(range: &OutputRange) -> String {
    format!("split_{}.pdf", range.number())
}

/// Writes output documents into one directory
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    /// Create the directory if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| Error::Write {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final path for a range's document
    pub fn path_for(&self, range: &OutputRange) -> PathBuf {
        self.dir.join(file_name(range))
    }

    /// Write one document atomically and return its path
    ///
    /// The bytes go to a temporary file in the same directory that is renamed
    /// into place, so a failure never leaves a truncated output behind.
    pub fn write(&self, document: &OutputDocument) -> Result<PathBuf> {
        let path = self.path_for(&document.range);
        let failed = |source: std::io::Error| Error::Write {
            path: path.clone(),
            source,
        };

        let mut file = NamedTempFile::new_in(&self.dir).map_err(failed)?;
        file.write_all(&document.bytes).map_err(failed)?;
        file.flush().map_err(failed)?;
        file.persist(&path).map_err(|e| failed(e.error))?;
        Ok(path)
    }
}

/// Split `source` and write every produced document into `options.output_dir`
///
/// `on_progress(done, total, range)` is called after each range, whether it
/// was written, skipped, or failed to write. Write failures are recorded in
/// the summary and the run moves on to the next range.
pub fn split_to_dir<F>(
    source: &SourceDocument,
    options: &SplitOptions,
    mut on_progress: F,
) -> Result<SplitSummary>
where
    F: FnMut(usize, usize, &OutputRange),
{
    let splitter = split(source, options.group_size)?;
    let total = splitter.total();
    let writer = OutputWriter::new(&options.output_dir)?;
    let mut summary = SplitSummary::new(source.page_count(), options.group_size);

    for (done, outcome) in splitter.enumerate() {
        summary.record(&outcome);
        let range = outcome.range();

        if let RangeOutcome::Produced(document) = outcome {
            match writer.write(&document) {
                Ok(path) => {
                    info!("Wrote {} ({} pages)", path.display(), document.pages_written);
                    summary.record_written(path);
                }
                Err(err) => {
                    warn!("Range {} not saved: {}", range.number(), err);
                    summary.record_write_failure(WriteFailure {
                        range,
                        path: writer.path_for(&range),
                        reason: err.to_string(),
                    });
                }
            }
        }

        on_progress(done + 1, total, &range);
    }

    Ok(summary)
}
