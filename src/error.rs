//! Error types for zepbmerge.
//!
//! Everything below the two pipeline entry points returns [`Result`];
//! the pipelines themselves are the error boundary and fold every
//! failure into the summary they return.

use std::io;
use std::path::PathBuf;

/// Result type alias for zepbmerge operations.
pub type Result<T> = std::result::Result<T, ZepbError>;

/// Main error type for zepbmerge operations.
#[derive(Debug, thiserror::Error)]
pub enum ZepbError {
    /// A required folder argument was not provided.
    #[error("Folders not specified: {which}")]
    FoldersNotSpecified {
        /// Which argument(s) are missing.
        which: String,
    },

    /// A folder passed to a pipeline does not exist.
    #[error("Folder not found: {path}")]
    FolderNotFound {
        /// The missing folder.
        path: PathBuf,
    },

    /// Failed to load a PDF file.
    #[error("Failed to load PDF: {path}\n  Reason: {reason}")]
    FailedToLoadPdf {
        /// Path to the PDF file.
        path: PathBuf,
        /// Reason for the failure.
        reason: String,
    },

    /// PDF file is corrupted or has invalid structure.
    #[error("Corrupted or invalid PDF: {path}\n  Details: {details}")]
    CorruptedPdf {
        /// Path to the corrupted PDF.
        path: PathBuf,
        /// Details about the corruption.
        details: String,
    },

    /// PDF file is encrypted and cannot be processed.
    #[error(
        "PDF is encrypted and cannot be processed: {path}\n  \
         Hint: Decrypt the PDF first using 'qpdf --decrypt' or similar tools"
    )]
    EncryptedPdf {
        /// Path to the encrypted PDF.
        path: PathBuf,
    },

    /// Failed to create an output file.
    #[error("Failed to create output file: {path}\n  Reason: {source}")]
    FailedToCreateOutput {
        /// Path where output should be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Failed to write an output file.
    #[error("Failed to write to output file: {path}\n  Reason: {source}")]
    FailedToWrite {
        /// Path being written to.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The merge of a single matched pair failed.
    #[error("Merge operation failed: {reason}")]
    MergeFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// The external compression engine is not available.
    #[error("Compression engine not available")]
    EngineUnavailable,

    /// The external compression engine ran but did not succeed.
    #[error("Compression engine failed: {reason}")]
    EngineFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// Failed to produce the register document.
    #[error("Failed to create register: {reason}")]
    RegisterFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic error with a custom message.
    #[error("{0}")]
    Other(String),
}

impl From<lopdf::Error> for ZepbError {
    fn from(err: lopdf::Error) -> Self {
        Self::Other(err.to_string())
    }
}

impl ZepbError {
    /// Create a FailedToLoadPdf error.
    pub fn failed_to_load_pdf(path: PathBuf, reason: impl Into<String>) -> Self {
        Self::FailedToLoadPdf {
            path,
            reason: reason.into(),
        }
    }

    /// Create a CorruptedPdf error.
    pub fn corrupted_pdf(path: PathBuf, details: impl Into<String>) -> Self {
        Self::CorruptedPdf {
            path,
            details: details.into(),
        }
    }

    /// Create a MergeFailed error.
    pub fn merge_failed(reason: impl Into<String>) -> Self {
        Self::MergeFailed {
            reason: reason.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_to_load_pdf_display() {
        let err = ZepbError::failed_to_load_pdf(PathBuf::from("bad.pdf"), "Invalid PDF header");
        let msg = format!("{err}");
        assert!(msg.contains("Failed to load PDF"));
        assert!(msg.contains("bad.pdf"));
        assert!(msg.contains("Invalid PDF header"));
    }

    #[test]
    fn test_encrypted_pdf_display() {
        let err = ZepbError::EncryptedPdf {
            path: PathBuf::from("secret.pdf"),
        };
        let msg = format!("{err}");
        assert!(msg.contains("encrypted"));
        assert!(msg.contains("secret.pdf"));
        assert!(msg.contains("Decrypt")); // Helpful hint
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "not found");
        let err: ZepbError = io_err.into();
        assert!(matches!(err, ZepbError::Io(_)));
    }

    #[test]
    fn test_builder_methods() {
        let err = ZepbError::merge_failed("test reason");
        assert!(matches!(err, ZepbError::MergeFailed { .. }));

        let err = ZepbError::other("generic error");
        assert!(matches!(err, ZepbError::Other(_)));
    }
}
