//! PDF reading and loading operations.
//!
//! # Examples
//!
//! ```no_run
//! use zepbmerge::io::PdfReader;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PdfReader::new();
//! let loaded = reader.load(Path::new("document.pdf")).await?;
//! println!("Loaded {} pages", loaded.page_count);
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use std::path::{Path, PathBuf};

use crate::error::{Result, ZepbError};

/// A loaded PDF document with metadata.
#[derive(Debug)]
pub struct LoadedPdf {
    /// The PDF document.
    pub document: Document,

    /// Path to the source file.
    pub path: PathBuf,

    /// Number of pages in the document.
    pub page_count: usize,

    /// File size in bytes.
    pub file_size: u64,
}

/// PDF reader with configurable loading behavior.
#[derive(Debug, Clone)]
pub struct PdfReader {
    /// Whether to verify the document has pages after loading.
    verify: bool,
}

impl PdfReader {
    /// Create a new PDF reader with default settings.
    pub fn new() -> Self {
        Self { verify: true }
    }

    /// Create a reader that skips verification (faster but less safe).
    pub fn without_verification() -> Self {
        Self { verify: false }
    }

    /// Load a single PDF document.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - File is not a valid PDF
    /// - PDF is encrypted
    /// - Verification is on and the document has no pages
    pub async fn load(&self, path: &Path) -> Result<LoadedPdf> {
        let path_buf = path.to_path_buf();

        let bytes = tokio::fs::read(&path_buf)
            .await
            .map_err(|err| ZepbError::failed_to_load_pdf(path_buf.clone(), err.to_string()))?;
        let file_size = bytes.len() as u64;

        let document = Document::load_mem(&bytes).map_err(|err| {
            let err_msg = err.to_string();
            if err_msg.contains("encrypt") || err_msg.contains("password") {
                ZepbError::EncryptedPdf {
                    path: path_buf.clone(),
                }
            } else {
                ZepbError::failed_to_load_pdf(path_buf.clone(), err_msg)
            }
        })?;

        let page_count = document.get_pages().len();
        if self.verify && page_count == 0 {
            return Err(ZepbError::corrupted_pdf(path_buf, "PDF has no pages"));
        }

        Ok(LoadedPdf {
            document,
            path: path_buf,
            page_count,
            file_size,
        })
    }
}

impl Default for PdfReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;
    use lopdf::Object;
    use tempfile::TempDir;

    fn create_test_document(pages: usize) -> Document {
        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();

        let mut page_ids = Vec::new();
        for _ in 0..pages {
            let page_id = doc.new_object_id();
            let page = lopdf::dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            };
            doc.objects.insert(page_id, page.into());
            page_ids.push(page_id);
        }

        let catalog_id = doc.new_object_id();
        let catalog = lopdf::dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        let pages_dict = lopdf::dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.into_iter().map(Object::from).collect::<Vec<Object>>(),
            "Count" => pages as i64,
        };

        doc.objects.insert(catalog_id, catalog.into());
        doc.objects.insert(pages_id, pages_dict.into());
        doc.trailer.set("Root", catalog_id);

        doc
    }

    fn create_test_pdf(dir: &TempDir, name: &str, pages: usize) -> PathBuf {
        let path = dir.path().join(name);
        let mut doc = create_test_document(pages);
        doc.save(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_single_pdf() {
        let temp_dir = TempDir::new().unwrap();
        let pdf_path = create_test_pdf(&temp_dir, "test.pdf", 2);

        let reader = PdfReader::new();
        let result = reader.load(&pdf_path).await;

        assert!(result.is_ok());
        let loaded = result.unwrap();
        assert_eq!(loaded.page_count, 2);
        assert_eq!(loaded.path, pdf_path);
        assert!(loaded.file_size > 0);
    }

    #[tokio::test]
    async fn test_load_nonexistent_pdf() {
        let reader = PdfReader::new();
        let result = reader.load(Path::new("/nonexistent.pdf")).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_invalid_pdf() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invalid.pdf");
        std::fs::write(&path, b"not a pdf at all").unwrap();

        let reader = PdfReader::new();
        let result = reader.load(&path).await;

        assert!(matches!(
            result,
            Err(ZepbError::FailedToLoadPdf { .. }) | Err(ZepbError::CorruptedPdf { .. })
        ));
    }
}
