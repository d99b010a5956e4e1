//! pdflex CLI tool
//!
//! Splits a PDF into files of N pages each and reports what was written.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;

use pdflex::output::DEFAULT_OUTPUT_DIR;
use pdflex::split::default_group_size;
use pdflex::{split_to_dir, SourceDocument, SplitOptions};

/// pdflex - Flexible PDF splitter
#[derive(Parser)]
#[command(name = "pdflex")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Split into files of 10 pages in ./split_output
    pdflex split large.pdf

    # Split into files of 25 pages in a chosen directory
    pdflex split large.pdf --pages 25 --output-dir parts

    # Show size and page count
    pdflex info large.pdf")]
struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a PDF into files of N pages each
    Split {
        /// Input PDF file
        input: PathBuf,

        /// Pages per output file (default: 10, or the page count if smaller)
        #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
        pages: Option<u64>,

        /// Directory for the split_<n>.pdf files
        #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,
    },

    /// Show information about a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let result = match cli.command {
        Commands::Split {
            input,
            pages,
            output_dir,
        } => cmd_split(&input, pages, output_dir),
        Commands::Info { input } => cmd_info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn file_size_mb(path: &Path) -> Result<f64> {
    let len = std::fs::metadata(path)
        .with_context(|| format!("Cannot stat {}", path.display()))?
        .len();
    Ok(len as f64 / (1024.0 * 1024.0))
}

fn open_source(input: &Path) -> Result<SourceDocument> {
    if !input.exists() {
        bail!("Input file not found: {}", input.display());
    }
    SourceDocument::open(input).with_context(|| format!("Failed to read {}", input.display()))
}

/// Split a PDF into files
fn cmd_split(input: &Path, pages: Option<u64>, output_dir: PathBuf) -> Result<()> {
    let source = open_source(input)?;
    let page_count = source.page_count();

    eprintln!("File size: {:.1}MB", file_size_mb(input)?);
    eprintln!("Total pages: {}", page_count);

    if page_count == 0 {
        eprintln!("Nothing to split.");
        return Ok(());
    }

    let group_size = match pages {
        Some(n) => usize::try_from(n).unwrap_or(usize::MAX),
        None => default_group_size(page_count),
    };
    let options = SplitOptions {
        group_size,
        output_dir,
    };

    eprintln!("Splitting into files of {} pages...", group_size);
    let summary = split_to_dir(&source, &options, |done, total, _| {
        eprintln!("[{}/{}] {}%", done, total, done * 100 / total);
    })?;

    for page in &summary.skipped_pages {
        eprintln!("Skipped page {}: {}", page.index + 1, page.reason);
    }
    for skipped in &summary.skipped_ranges {
        eprintln!(
            "Skipped pages {}-{}: {}",
            skipped.range.start + 1,
            skipped.range.end,
            skipped.reason
        );
    }
    for failure in &summary.write_failures {
        eprintln!("Could not write {}: {}", failure.path.display(), failure.reason);
    }

    eprintln!(
        "Done: {} of {} files written to {} ({} pages)",
        summary.written_files.len(),
        summary.ranges_planned,
        options.output_dir.display(),
        summary.pages_written
    );

    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: &Path) -> Result<()> {
    let source = open_source(input)?;

    println!("File: {}", input.display());
    println!("Size: {:.1}MB", file_size_mb(input)?);
    println!("Pages: {}", source.page_count());
    println!("PDF version: {}", source.version());

    if let Some(title) = &source.info().title {
        println!("Title: {}", title);
    }
    if let Some(author) = &source.info().author {
        println!("Author: {}", author);
    }
    if source.is_repaired() {
        println!("Note: cross-reference table was damaged and has been rebuilt");
    }

    Ok(())
}
