//! Batch PDF compression.

pub mod ghostscript;
pub mod pipeline;

pub use ghostscript::{GhostscriptEngine, GhostscriptLocation, PdfSettings};
pub use pipeline::{
    CompressFilesOptions, CompressFolderOptions, CompressPipeline, CompressProgress,
    CompressSummary, DEFAULT_QUALITY, FileResult, MAX_PARALLEL,
};
