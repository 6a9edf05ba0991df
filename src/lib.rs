//! zepbmerge - pair and merge notification/ZEPB PDF sets, and batch
//! compress PDFs.
//!
//! Scanned technical records ("ZEPB") and their notification letters
//! arrive as two separate folder trees. Both carry a structured record
//! code in their filenames (`СПД-1245.25`, dash and spelling variants
//! included); this crate extracts and canonicalizes those codes, pairs
//! the two sets, appends each notification in front of its ZEPB into a
//! single output PDF, and can batch-compress PDFs through Ghostscript
//! with a pure-library fallback.
//!
//! # Examples
//!
//! ## Merging two folders
//!
//! ```no_run
//! use zepbmerge::cancel::CancelToken;
//! use zepbmerge::merge::{MergeOptions, MergePipeline};
//! use std::path::PathBuf;
//!
//! # async fn example() {
//! let pipeline = MergePipeline::new();
//! let options = MergeOptions {
//!     main_folder: PathBuf::from("scans/zepb"),
//!     insert_folder: PathBuf::from("scans/notifications"),
//!     output_folder: PathBuf::from("scans/merged"),
//!     recursive_main: true,
//!     recursive_insert: true,
//! };
//!
//! let token = CancelToken::new();
//! let summary = pipeline.merge(&options, &token, |_event| {}).await;
//! println!("merged {}/{} pairs", summary.processed, summary.total);
//! # }
//! ```
//!
//! ## Compressing a folder
//!
//! ```no_run
//! use zepbmerge::cancel::CancelToken;
//! use zepbmerge::compress::{CompressFolderOptions, CompressPipeline, DEFAULT_QUALITY};
//! use std::path::PathBuf;
//!
//! # async fn example() {
//! let pipeline = CompressPipeline::new();
//! let options = CompressFolderOptions {
//!     input_folder: PathBuf::from("scans/merged"),
//!     output_folder: PathBuf::from("scans/compressed"),
//!     quality: DEFAULT_QUALITY,
//! };
//!
//! let summary = pipeline
//!     .compress_folder(&options, &CancelToken::new(), |_progress| {})
//!     .await;
//! println!("engine: {}", summary.engine_used);
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod codes;
pub mod compress;
pub mod dictionary;
pub mod error;
pub mod io;
pub mod matcher;
pub mod merge;
pub mod output;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use error::{Result, ZepbError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
