//! PDF writing and saving operations.
//!
//! Writes are atomic by default: the document is serialized to a
//! sibling temp file which is then renamed over the destination, so a
//! failed write never leaves a truncated PDF behind.
//!
//! # Examples
//!
//! ```no_run
//! use zepbmerge::io::PdfWriter;
//! use lopdf::Document;
//! use std::path::Path;
//!
//! # async fn example(doc: Document) -> Result<(), Box<dyn std::error::Error>> {
//! let writer = PdfWriter::new();
//! writer.save(&doc, Path::new("output.pdf")).await?;
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use std::io::Write;
use std::path::Path;
use tokio::task;

use crate::error::{Result, ZepbError};

/// Options for writing PDF files.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Use atomic writes (write to temp file, then rename).
    pub atomic: bool,

    /// Compress object streams before writing.
    pub compress: bool,

    /// Buffer size for writing (in bytes).
    pub buffer_size: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            atomic: true,
            compress: true,
            buffer_size: 8192,
        }
    }
}

/// PDF writer with configurable behavior.
pub struct PdfWriter {
    options: WriteOptions,
}

impl PdfWriter {
    /// Create a new PDF writer with default options.
    pub fn new() -> Self {
        Self {
            options: WriteOptions::default(),
        }
    }

    /// Create a writer with custom options.
    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Save a PDF document to a file.
    ///
    /// Serialization runs on a blocking task so the async runtime is
    /// not stalled by large documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the output file cannot be created or the
    /// write fails.
    pub async fn save(&self, doc: &Document, path: &Path) -> Result<u64> {
        let path_buf = path.to_path_buf();
        let options = self.options.clone();
        let mut doc_clone = doc.clone();

        task::spawn_blocking(move || {
            if options.compress {
                doc_clone.compress();
            }
            doc_clone.renumber_objects();

            let write_path = if options.atomic {
                path_buf.with_extension("tmp")
            } else {
                path_buf.clone()
            };

            let file = std::fs::File::create(&write_path).map_err(|e| {
                ZepbError::FailedToCreateOutput {
                    path: write_path.clone(),
                    source: e,
                }
            })?;

            let mut writer = std::io::BufWriter::with_capacity(options.buffer_size, file);
            doc_clone
                .save_to(&mut writer)
                .map_err(|e| ZepbError::FailedToWrite {
                    path: write_path.clone(),
                    source: std::io::Error::other(e),
                })?;
            writer.flush().map_err(|e| ZepbError::FailedToWrite {
                path: write_path.clone(),
                source: e,
            })?;

            if options.atomic {
                std::fs::rename(&write_path, &path_buf).map_err(|e| ZepbError::FailedToWrite {
                    path: path_buf.clone(),
                    source: e,
                })?;
            }

            let file_size = std::fs::metadata(&path_buf).map(|m| m.len()).unwrap_or(0);
            Ok::<_, ZepbError>(file_size)
        })
        .await
        .map_err(|e| ZepbError::other(format!("Write task failed: {e}")))?
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}
