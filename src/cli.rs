//! CLI argument parsing for zepbmerge.
//!
//! This module defines the command-line interface structure using
//! `clap`: one subcommand per boundary operation of the library.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use zepbmerge::compress::DEFAULT_QUALITY;

/// Pair and merge notification/ZEPB PDF sets, and batch-compress PDFs.
#[derive(Parser, Debug)]
#[command(name = "zepbmerge")]
#[command(version)]
#[command(about = "Pair and merge notification/ZEPB PDF sets, and batch-compress PDFs")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Suppress all non-error output
    ///
    /// Only errors and warnings will be printed.
    /// Useful for scripts and automation.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output
    ///
    /// Shows per-item details and debug information.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Which dictionary a scan builds.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    /// ZEPB documents (marker or extractable code).
    Zepb,
    /// Notification documents (extractable code, no ZEPB marker).
    Notification,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Merge matched notification/ZEPB pairs into single PDFs
    ///
    /// Scans both folders, pairs files by canonical record code and
    /// writes one merged PDF per pair (notification pages first) into
    /// the output folder, plus a register of the produced files.
    Merge {
        /// Folder holding the ZEPB documents
        #[arg(long, value_name = "DIR")]
        main: PathBuf,

        /// Folder holding the notification documents
        #[arg(long, value_name = "DIR")]
        insert: PathBuf,

        /// Folder merged output is written to (created if missing)
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Scan the ZEPB folder recursively
        #[arg(long)]
        recursive_main: bool,

        /// Scan the notification folder recursively
        #[arg(long)]
        recursive_insert: bool,

        /// Print the run summary as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Compress PDFs through Ghostscript (or the library fallback)
    ///
    /// Either compresses every PDF directly inside --input-folder, or
    /// the files given as arguments (glob patterns are expanded).
    Compress {
        /// Folder scanned (non-recursively) for PDFs to compress
        #[arg(long, value_name = "DIR", conflicts_with = "files")]
        input_folder: Option<PathBuf>,

        /// Files or glob patterns to compress
        #[arg(value_name = "FILE", required_unless_present = "input_folder")]
        files: Vec<String>,

        /// Folder compressed output is written to (created if missing)
        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Quality 0-100; low values compress harder
        ///
        /// Mapped onto Ghostscript profiles: 0-12 /screen, 13-25
        /// /ebook, 26-40 /printer, 41-100 /prepress.
        #[arg(long, value_name = "N", default_value_t = DEFAULT_QUALITY)]
        quality: u8,

        /// Skip Ghostscript detection and use the library fallback
        #[arg(long)]
        no_ghostscript: bool,

        /// Print the run summary as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },

    /// Scan a folder and print the code -> file dictionary
    ///
    /// Useful for checking which files would participate in a merge
    /// and which codes they resolve to.
    Scan {
        /// Folder to scan
        #[arg(value_name = "DIR")]
        folder: PathBuf,

        /// Which dictionary to build
        #[arg(long, value_enum)]
        kind: ScanKind,

        /// Scan recursively
        #[arg(short, long)]
        recursive: bool,

        /// Print the dictionary as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
}

/// Expand glob patterns into filesystem paths.
///
/// A pattern that matches nothing is kept as a literal path so the
/// pipeline can report it (missing files are dropped there with the
/// same rules as drag-and-drop input).
pub fn collect_paths_for_patterns<T>(patterns: T) -> anyhow::Result<Vec<PathBuf>>
where
    T: IntoIterator,
    T::Item: AsRef<str>,
{
    let mut resolved_paths = Vec::new();

    for pattern in patterns.into_iter() {
        let pattern = pattern.as_ref();
        let mut matched_any = false;

        for entry in glob::glob(pattern)? {
            resolved_paths.push(entry?);
            matched_any = true;
        }

        if !matched_any {
            resolved_paths.push(PathBuf::from(pattern));
        }
    }

    Ok(resolved_paths)
}
