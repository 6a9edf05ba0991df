//! PDF input/output.
//!
//! Loading goes through [`PdfReader`], which verifies structure and
//! detects encrypted documents; writing goes through [`PdfWriter`],
//! which saves atomically (temp file, then rename).

pub mod reader;
pub mod writer;

pub use reader::{LoadedPdf, PdfReader};
pub use writer::{PdfWriter, WriteOptions};
