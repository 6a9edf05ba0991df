//! The compression pipeline.
//!
//! Both entry points (a whole folder, or an explicit file list) feed
//! the same bounded-concurrency batch: a fixed pool of workers where
//! each finished worker immediately claims the next unclaimed file.
//! Like the merge pipeline, this is an error boundary: every failure
//! is captured per file and the batch always returns a summary.

use futures::stream::{self, StreamExt};
use lopdf::Document;
use serde::Serialize;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

use crate::cancel::CancelToken;
use crate::compress::ghostscript::{GhostscriptEngine, GhostscriptLocation, PdfSettings};
use crate::dictionary::is_pdf_name;
use crate::error::{Result, ZepbError};

/// Fixed number of concurrently in-flight files.
pub const MAX_PARALLEL: usize = 3;

/// Default quality when the caller does not specify one.
pub const DEFAULT_QUALITY: u8 = 30;

/// Parameters for compressing every PDF in a folder.
#[derive(Debug, Clone)]
pub struct CompressFolderOptions {
    /// Folder scanned (non-recursively) for PDFs.
    pub input_folder: PathBuf,
    /// Folder compressed output is written to (created if missing).
    pub output_folder: PathBuf,
    /// Quality 0-100, mapped onto a Ghostscript profile.
    pub quality: u8,
}

/// Parameters for compressing an explicit list of files.
#[derive(Debug, Clone)]
pub struct CompressFilesOptions {
    /// Files to compress; non-PDFs and non-files are silently dropped.
    pub files: Vec<PathBuf>,
    /// Folder compressed output is written to (created if missing).
    pub output_folder: PathBuf,
    /// Quality 0-100, mapped onto a Ghostscript profile.
    pub quality: u8,
}

/// Per-file outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResult {
    /// Filename (basename) of the input.
    pub name: String,
    /// Input size in bytes, when it could be determined.
    pub in_size: Option<u64>,
    /// Output size in bytes, when it could be determined.
    pub out_size: Option<u64>,
    /// Whether this file was compressed successfully.
    pub ok: bool,
    /// Error message for a failed file.
    pub error: Option<String>,
    /// Engine note, e.g. the Ghostscript profile used.
    pub notes: Option<String>,
}

/// Outcome of a compression batch. Always returned, never thrown past.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressSummary {
    /// Files that ran to completion (successfully or not).
    pub processed: usize,
    /// Files selected for this batch.
    pub total: usize,
    /// Per-file results, in completion order.
    pub files: Vec<FileResult>,
    /// Error lines collected during the run.
    pub errors: Vec<String>,
    /// Human-readable run log.
    pub log: Vec<String>,
    /// Whether the run was cancelled before draining the queue.
    pub canceled: bool,
    /// Which engine handled the batch.
    pub engine_used: String,
}

impl Default for CompressSummary {
    fn default() -> Self {
        Self {
            processed: 0,
            total: 0,
            files: Vec::new(),
            errors: Vec::new(),
            log: Vec::new(),
            canceled: false,
            engine_used: "none".to_string(),
        }
    }
}

/// Per-file progress event, emitted as each worker finishes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressProgress {
    /// 1-based index issued when the worker claimed the file.
    pub index: usize,
    /// Files selected for this batch.
    pub total: usize,
    /// Filename (basename) of the input.
    pub name: String,
    /// Input size in bytes, when known.
    pub in_size: Option<u64>,
    /// Output size in bytes, when known.
    pub out_size: Option<u64>,
    /// Whether this file succeeded.
    pub ok: bool,
    /// Error message for a failed file.
    pub error: Option<String>,
    /// Engine note, e.g. the Ghostscript profile used.
    pub notes: Option<String>,
}

/// Bounded-concurrency PDF compression over an external engine with a
/// pure-library fallback.
pub struct CompressPipeline {
    engine: GhostscriptEngine,
}

impl CompressPipeline {
    /// Create a pipeline with the default engine detector.
    pub fn new() -> Self {
        Self {
            engine: GhostscriptEngine::new(),
        }
    }

    /// Create a pipeline around a specific engine instance.
    pub fn with_engine(engine: GhostscriptEngine) -> Self {
        Self { engine }
    }

    /// Compress every PDF found in `input_folder` (direct children
    /// only). Never fails: all errors land in the summary.
    pub async fn compress_folder<F>(
        &self,
        options: &CompressFolderOptions,
        token: &CancelToken,
        on_progress: F,
    ) -> CompressSummary
    where
        F: FnMut(CompressProgress),
    {
        let mut summary = CompressSummary::default();

        if let Err(err) = self
            .run_folder(options, token, &mut summary, on_progress)
            .await
        {
            let msg = format!("Error compressing PDFs: {err}");
            error!("{msg}");
            summary.errors.push(msg.clone());
            summary.log.push(msg);
        }

        summary
    }

    /// Compress an explicit list of files. Never fails: all errors
    /// land in the summary.
    pub async fn compress_files<F>(
        &self,
        options: &CompressFilesOptions,
        token: &CancelToken,
        on_progress: F,
    ) -> CompressSummary
    where
        F: FnMut(CompressProgress),
    {
        let mut summary = CompressSummary::default();

        if let Err(err) = self
            .run_files(options, token, &mut summary, on_progress)
            .await
        {
            let msg = format!("Error compressing files: {err}");
            error!("{msg}");
            summary.errors.push(msg.clone());
            summary.log.push(msg);
        }

        summary
    }

    async fn run_folder<F>(
        &self,
        options: &CompressFolderOptions,
        token: &CancelToken,
        summary: &mut CompressSummary,
        on_progress: F,
    ) -> Result<()>
    where
        F: FnMut(CompressProgress),
    {
        if options.input_folder.as_os_str().is_empty() || options.output_folder.as_os_str().is_empty()
        {
            return Err(ZepbError::FoldersNotSpecified {
                which: "input, output".to_string(),
            });
        }
        if !tokio::fs::try_exists(&options.input_folder).await.unwrap_or(false) {
            return Err(ZepbError::FolderNotFound {
                path: options.input_folder.clone(),
            });
        }

        let mut pdfs = Vec::new();
        let mut entries = tokio::fs::read_dir(&options.input_folder).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file && is_pdf_name(&name) {
                pdfs.push(entry.path());
            }
        }
        pdfs.sort();
        summary.log.push(format!(
            "Found {} PDF in {}",
            pdfs.len(),
            options.input_folder.display()
        ));

        self.run_batch(
            pdfs,
            &options.output_folder,
            options.quality,
            token,
            summary,
            on_progress,
        )
        .await
    }

    async fn run_files<F>(
        &self,
        options: &CompressFilesOptions,
        token: &CancelToken,
        summary: &mut CompressSummary,
        on_progress: F,
    ) -> Result<()>
    where
        F: FnMut(CompressProgress),
    {
        if options.files.is_empty() {
            return Err(ZepbError::other("No files for compression"));
        }
        if options.output_folder.as_os_str().is_empty() {
            return Err(ZepbError::FoldersNotSpecified {
                which: "output".to_string(),
            });
        }

        let mut pdfs = Vec::new();
        for file in &options.files {
            let name = match file.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };
            let is_file = tokio::fs::metadata(file)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false);
            if is_file && is_pdf_name(&name) {
                pdfs.push(file.clone());
            }
        }
        summary
            .log
            .push(format!("Received {} PDF for compression", pdfs.len()));

        self.run_batch(
            pdfs,
            &options.output_folder,
            options.quality,
            token,
            summary,
            on_progress,
        )
        .await
    }

    /// The shared batch: detect the engine once, then drain the list
    /// through a fixed-size self-replenishing pool.
    async fn run_batch<F>(
        &self,
        pdfs: Vec<PathBuf>,
        output_folder: &Path,
        quality: u8,
        token: &CancelToken,
        summary: &mut CompressSummary,
        on_progress: F,
    ) -> Result<()>
    where
        F: FnMut(CompressProgress),
    {
        summary.total = pdfs.len();

        tokio::fs::create_dir_all(output_folder)
            .await
            .map_err(|source| ZepbError::FailedToCreateOutput {
                path: output_folder.to_path_buf(),
                source,
            })?;

        let engine = self.engine.detect().await;
        match &engine {
            Some(location) => {
                summary.engine_used = format!("ghostscript ({})", location.origin());
                summary
                    .log
                    .push(format!("[INFO] Using Ghostscript: {location}"));
            }
            None => {
                summary.engine_used = "lopdf (fallback)".to_string();
                summary
                    .log
                    .push("[WARN] Ghostscript not found, fallback mode.".to_string());
                warn!("ghostscript not found, using lopdf fallback");
            }
        }

        let total = pdfs.len();
        let progress = Mutex::new(on_progress);
        let engine_ref = engine.as_ref();

        // Workers check the token when they claim a file; in-flight
        // files always run to completion.
        let results: Vec<Option<(FileResult, String)>> =
            stream::iter(pdfs.iter().enumerate().map(|(position, path)| {
                let progress = &progress;
                async move {
                    if token.is_cancelled() {
                        return None;
                    }

                    let index = position + 1;
                    let (result, log_line) = self
                        .process_one(path, output_folder, quality, engine_ref)
                        .await;

                    if let Ok(mut on_progress) = progress.lock() {
                        (*on_progress)(CompressProgress {
                            index,
                            total,
                            name: result.name.clone(),
                            in_size: result.in_size,
                            out_size: result.out_size,
                            ok: result.ok,
                            error: result.error.clone(),
                            notes: result.notes.clone(),
                        });
                    }

                    Some((result, log_line))
                }
            }))
            .buffer_unordered(MAX_PARALLEL)
            .collect()
            .await;

        for (result, log_line) in results.into_iter().flatten() {
            if let Some(err) = &result.error {
                summary.errors.push(format!("{}: {err}", result.name));
            }
            summary.log.push(log_line);
            summary.files.push(result);
            summary.processed += 1;
        }

        if token.is_cancelled() {
            summary.canceled = true;
            summary
                .log
                .push("Compression operation canceled by user".to_string());
        }

        summary
            .log
            .insert(0, format!("Compression completed. Engine: {}", summary.engine_used));
        info!(
            "compression batch done: {}/{} files, engine {}",
            summary.processed, summary.total, summary.engine_used
        );

        Ok(())
    }

    /// Process a single file. Every failure is captured in the
    /// returned result; this never errors out of the batch.
    async fn process_one(
        &self,
        path: &Path,
        output_folder: &Path,
        quality: u8,
        engine: Option<&GhostscriptLocation>,
    ) -> (FileResult, String) {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let out_path = output_folder.join(&name);

        let in_size = tokio::fs::metadata(path).await.ok().map(|meta| meta.len());

        let mut result = FileResult {
            name: name.clone(),
            in_size,
            out_size: None,
            ok: false,
            error: None,
            notes: None,
        };

        let log_line = match engine {
            Some(location) => {
                let flag = PdfSettings::from_quality(quality).as_flag();
                match self.engine.compress(location, path, &out_path, quality).await {
                    Ok(()) => {
                        result.ok = true;
                        result.notes = Some(format!("GS:{flag}"));
                        format!("GS: {name} -> {} ({flag})", out_path.display())
                    }
                    Err(err) => {
                        result.error = Some(err.to_string());
                        format!("GS error {name}: {err}")
                    }
                }
            }
            None => match fallback_resave(path, &out_path).await {
                Ok(()) => {
                    result.ok = true;
                    result.notes = Some("fallback".to_string());
                    format!("FB: {name} -> {}", out_path.display())
                }
                Err(err) => {
                    result.error = Some(err.to_string());
                    format!("Fallback error {name}: {err}")
                }
            },
        };

        result.out_size = tokio::fs::metadata(&out_path).await.ok().map(|meta| meta.len());

        (result, log_line)
    }
}

impl Default for CompressPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Pure-library fallback: load the PDF and re-serialize it unchanged.
/// Guarantees a valid output even without an engine, though the size
/// reduction is marginal.
async fn fallback_resave(input: &Path, output: &Path) -> Result<()> {
    let bytes = tokio::fs::read(input).await?;
    let mut doc = Document::load_mem(&bytes)
        .map_err(|err| ZepbError::failed_to_load_pdf(input.to_path_buf(), err.to_string()))?;

    let mut buf = Cursor::new(Vec::new());
    doc.save_to(&mut buf)
        .map_err(|err| ZepbError::FailedToWrite {
            path: output.to_path_buf(),
            source: std::io::Error::other(err),
        })?;

    tokio::fs::write(output, buf.into_inner())
        .await
        .map_err(|source| ZepbError::FailedToWrite {
            path: output.to_path_buf(),
            source,
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_file_list_produces_error_summary() {
        let pipeline = CompressPipeline::new();
        let options = CompressFilesOptions {
            files: Vec::new(),
            output_folder: PathBuf::from("/tmp"),
            quality: DEFAULT_QUALITY,
        };

        let summary = pipeline
            .compress_files(&options, &CancelToken::new(), |_| {})
            .await;

        assert!(!summary.errors.is_empty());
        assert!(summary.errors[0].contains("No files for compression"));
        assert_eq!(summary.processed, 0);
    }

    #[tokio::test]
    async fn test_missing_input_folder_produces_error_summary() {
        let pipeline = CompressPipeline::new();
        let options = CompressFolderOptions {
            input_folder: PathBuf::from("/nonexistent/input"),
            output_folder: PathBuf::from("/tmp/out"),
            quality: DEFAULT_QUALITY,
        };

        let summary = pipeline
            .compress_folder(&options, &CancelToken::new(), |_| {})
            .await;

        assert!(!summary.errors.is_empty());
        assert!(summary.errors[0].contains("Folder not found"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_processes_nothing() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("a.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(temp.path().join("b.pdf"), b"%PDF-1.4").unwrap();

        let token = CancelToken::new();
        token.cancel();

        let pipeline = CompressPipeline::new();
        let options = CompressFolderOptions {
            input_folder: temp.path().to_path_buf(),
            output_folder: temp.path().join("out"),
            quality: DEFAULT_QUALITY,
        };

        let mut events = 0usize;
        let summary = pipeline
            .compress_folder(&options, &token, |_| events += 1)
            .await;

        assert!(summary.canceled);
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.total, 2);
        assert_eq!(events, 0);
    }

    #[tokio::test]
    async fn test_non_pdf_files_are_dropped_from_file_list() {
        let temp = tempfile::TempDir::new().unwrap();
        let pdf = temp.path().join("doc.pdf");
        let txt = temp.path().join("note.txt");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        std::fs::write(&txt, b"hello").unwrap();

        let pipeline = CompressPipeline::new();
        let options = CompressFilesOptions {
            files: vec![pdf, txt, temp.path().join("missing.pdf")],
            output_folder: temp.path().join("out"),
            quality: DEFAULT_QUALITY,
        };

        let summary = pipeline
            .compress_files(&options, &CancelToken::new(), |_| {})
            .await;

        assert_eq!(summary.total, 1);
    }
}
