//! The merge pipeline.
//!
//! One run: build both dictionaries, match them, report the unmatched
//! sets, then merge each matched pair sequentially into the output
//! folder, notification pages first, then the ZEPB pages. The
//! pipeline is the error boundary: it always returns a summary and
//! never propagates an error to the caller.

use lopdf::{Document, Object, ObjectId};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::cancel::CancelToken;
use crate::codes::{is_marked_processed, strip_processed_marker};
use crate::dictionary::{notification_dictionary, zepb_dictionary};
use crate::error::{Result, ZepbError};
use crate::io::{PdfReader, PdfWriter};
use crate::matcher::{UnmatchedItem, match_dictionaries};
use crate::merge::register::{CsvRegisterWriter, RegisterWriter};

/// Marker appended to every merged output filename.
const MERGED_MARKER: &str = "с увед";

/// Parameters for one merge run.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Folder holding the ZEPB documents.
    pub main_folder: PathBuf,
    /// Folder holding the notification documents.
    pub insert_folder: PathBuf,
    /// Folder merged output is written to (created if missing).
    pub output_folder: PathBuf,
    /// Scan the ZEPB folder recursively.
    pub recursive_main: bool,
    /// Scan the notification folder recursively.
    pub recursive_insert: bool,
}

/// Outcome of a merge run. Always returned, even on validation
/// failure or cancellation.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSummary {
    /// Pairs merged into an output file.
    pub processed: usize,
    /// Pairs skipped (already processed or failed).
    pub skipped: usize,
    /// Matched pairs found for this run.
    pub total: usize,
    /// Error lines collected during the run.
    pub errors: Vec<String>,
    /// Human-readable run log.
    pub log: Vec<String>,
    /// Whether the run was cancelled before completing.
    pub canceled: bool,
    /// Path of the generated register, when at least one file was
    /// produced.
    pub registry: Option<PathBuf>,
    /// Notifications without a ZEPB counterpart.
    pub unmatched_notifications: Vec<UnmatchedItem>,
    /// ZEPB documents without a notification counterpart.
    pub unmatched_zepb: Vec<UnmatchedItem>,
}

/// Incremental events emitted during a merge run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum MergeEvent {
    /// Emitted once, before the merge loop, as soon as the unmatched
    /// sets are known.
    Unmatched {
        /// Notifications without a ZEPB counterpart.
        unmatched_notifications: Vec<UnmatchedItem>,
        /// ZEPB documents without a notification counterpart.
        unmatched_zepb: Vec<UnmatchedItem>,
    },
    /// Emitted after every processed or skipped pair.
    Progress {
        /// Pairs merged so far.
        processed: usize,
        /// Pairs skipped so far.
        skipped: usize,
        /// Matched pairs in this run.
        total: usize,
        /// 1-based index of the pair just handled.
        current: usize,
        /// Code of the pair, when applicable.
        code: Option<String>,
        /// What happened.
        message: String,
    },
}

/// Sequential merge pipeline over matched notification/ZEPB pairs.
pub struct MergePipeline {
    reader: PdfReader,
    writer: PdfWriter,
    register: Box<dyn RegisterWriter>,
}

impl MergePipeline {
    /// Create a pipeline with the default collaborators.
    pub fn new() -> Self {
        Self {
            reader: PdfReader::new(),
            writer: PdfWriter::new(),
            register: Box::new(CsvRegisterWriter::new()),
        }
    }

    /// Create a pipeline with a custom register writer.
    pub fn with_register(register: Box<dyn RegisterWriter>) -> Self {
        Self {
            reader: PdfReader::new(),
            writer: PdfWriter::new(),
            register,
        }
    }

    /// Run a merge. Never fails: validation errors, per-pair errors
    /// and cancellation are all folded into the returned summary.
    ///
    /// `on_event` receives the unmatched sets before the loop starts
    /// and a progress event after every pair.
    pub async fn merge<F>(
        &self,
        options: &MergeOptions,
        token: &CancelToken,
        mut on_event: F,
    ) -> MergeSummary
    where
        F: FnMut(MergeEvent),
    {
        let mut summary = MergeSummary::default();

        if let Err(err) = self.run(options, token, &mut summary, &mut on_event).await {
            let msg = format!("Merge error: {err}");
            error!("{msg}");
            summary.errors.push(msg.clone());
            summary.log.push(msg);
        }

        summary
    }

    async fn run<F>(
        &self,
        options: &MergeOptions,
        token: &CancelToken,
        summary: &mut MergeSummary,
        on_event: &mut F,
    ) -> Result<()>
    where
        F: FnMut(MergeEvent),
    {
        validate_folders(options)?;

        tokio::fs::create_dir_all(&options.output_folder)
            .await
            .map_err(|source| ZepbError::FailedToCreateOutput {
                path: options.output_folder.clone(),
                source,
            })?;

        let notifications =
            notification_dictionary(&options.insert_folder, options.recursive_insert).await;
        let zepb = zepb_dictionary(&options.main_folder, options.recursive_main).await;
        info!(
            "dictionaries built: {} notifications, {} zepb",
            notifications.len(),
            zepb.len()
        );

        let outcome = match_dictionaries(&notifications, &zepb);
        summary.total = outcome.matched.len();
        summary.unmatched_notifications = outcome.unmatched_notifications.clone();
        summary.unmatched_zepb = outcome.unmatched_zepb.clone();

        // Surface the unmatched sets before any heavy work so the
        // caller can display them while the loop runs.
        on_event(MergeEvent::Unmatched {
            unmatched_notifications: outcome.unmatched_notifications,
            unmatched_zepb: outcome.unmatched_zepb,
        });

        let mut produced: Vec<String> = Vec::new();

        for (i, code) in outcome.matched.iter().enumerate() {
            if token.is_cancelled() {
                let msg = "Merge operation canceled by user".to_string();
                summary.log.push(msg.clone());
                summary.canceled = true;
                on_event(MergeEvent::Progress {
                    processed: summary.processed,
                    skipped: summary.skipped,
                    total: summary.total,
                    current: i + 1,
                    code: None,
                    message: msg,
                });
                break;
            }

            let notif_path = &notifications[code];
            let zepb_path = &zepb[code];
            let zepb_name = basename(zepb_path);

            // The dictionary already excludes processed files; this
            // guards against a stale dictionary entry renamed mid-run.
            if is_marked_processed(&zepb_name) {
                let msg = format!("Skipped already processed ZEPB: {zepb_name}");
                summary.log.push(msg.clone());
                summary.skipped += 1;
                on_event(MergeEvent::Progress {
                    processed: summary.processed,
                    skipped: summary.skipped,
                    total: summary.total,
                    current: i + 1,
                    code: Some(code.clone()),
                    message: msg,
                });
                continue;
            }

            match self
                .merge_pair(notif_path, zepb_path, &options.output_folder)
                .await
            {
                Ok(out_name) => {
                    summary.processed += 1;
                    let msg = format!("Merged: {out_name}");
                    summary.log.push(msg.clone());
                    produced.push(out_name);
                    on_event(MergeEvent::Progress {
                        processed: summary.processed,
                        skipped: summary.skipped,
                        total: summary.total,
                        current: i + 1,
                        code: Some(code.clone()),
                        message: msg,
                    });
                }
                Err(err) => {
                    let msg = format!("Error merging code {code}: {err}");
                    summary.log.push(msg.clone());
                    summary.errors.push(msg.clone());
                    summary.skipped += 1;
                    on_event(MergeEvent::Progress {
                        processed: summary.processed,
                        skipped: summary.skipped,
                        total: summary.total,
                        current: i + 1,
                        code: Some(code.clone()),
                        message: msg,
                    });
                }
            }
        }

        if !produced.is_empty() {
            match self.register.create_register(&options.output_folder, &produced) {
                Ok(path) => {
                    summary.log.push(format!("Register: {}", path.display()));
                    summary.registry = Some(path);
                }
                Err(err) => {
                    let msg = format!("Register error: {err}");
                    summary.log.push(msg.clone());
                    summary.errors.push(msg);
                }
            }
        }

        Ok(())
    }

    /// Merge one matched pair and write the output file. Returns the
    /// output filename.
    async fn merge_pair(
        &self,
        notif_path: &Path,
        zepb_path: &Path,
        output_folder: &Path,
    ) -> Result<String> {
        let notif = self.reader.load(notif_path).await?;
        let zepb = self.reader.load(zepb_path).await?;

        let merged = concat_documents(&notif.document, &zepb.document)?;

        let stem = zepb_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| basename(zepb_path));
        let base = strip_processed_marker(&stem);
        let out_name = format!("{base} ({MERGED_MARKER}).pdf");
        let out_path = output_folder.join(&out_name);

        self.writer.save(&merged, &out_path).await?;
        Ok(out_name)
    }
}

impl Default for MergePipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Concatenate two documents into a new one: all pages of `first`,
/// then all pages of `second`.
pub fn concat_documents(first: &Document, second: &Document) -> Result<Document> {
    let mut merged = first.clone();
    let max_id = merged.max_id;

    let mut appended = second.clone();

    // Renumber objects to avoid ID conflicts
    appended.renumber_objects_with(max_id + 1);

    let appended_pages: Vec<ObjectId> = appended.get_pages().into_values().collect();

    merged.objects.extend(appended.objects);
    add_pages_to_tree(&mut merged, &appended_pages)?;

    // Always renumber for consistency
    merged.renumber_objects();

    Ok(merged)
}

/// Add pages to the merged document's page tree.
fn add_pages_to_tree(merged: &mut Document, page_ids: &[ObjectId]) -> Result<()> {
    let catalog = merged
        .catalog_mut()
        .map_err(|e| ZepbError::merge_failed(format!("Failed to get catalog: {e}")))?;

    let pages_id = catalog
        .get(b"Pages")
        .and_then(|p| p.as_reference())
        .map_err(|e| ZepbError::merge_failed(format!("Failed to get pages reference: {e}")))?;

    let pages_dict = merged
        .get_object_mut(pages_id)
        .map_err(|e| ZepbError::merge_failed(format!("Failed to get pages object: {e}")))?;

    if let Object::Dictionary(dict) = pages_dict {
        let kids = dict
            .get_mut(b"Kids")
            .map_err(|_| ZepbError::merge_failed("Pages dictionary missing Kids array"))?;

        if let Object::Array(kids_array) = kids {
            for &page_id in page_ids {
                kids_array.push(Object::Reference(page_id));
            }
        } else {
            return Err(ZepbError::merge_failed("Kids is not an array"));
        }

        let current_count = dict.get(b"Count").and_then(|c| c.as_i64()).unwrap_or(0);
        let new_count = current_count + page_ids.len() as i64;
        dict.set("Count", Object::Integer(new_count));
    } else {
        return Err(ZepbError::merge_failed("Pages object is not a dictionary"));
    }

    Ok(())
}

fn validate_folders(options: &MergeOptions) -> Result<()> {
    let mut missing = Vec::new();
    if options.main_folder.as_os_str().is_empty() {
        missing.push("main");
    }
    if options.insert_folder.as_os_str().is_empty() {
        missing.push("insert");
    }
    if options.output_folder.as_os_str().is_empty() {
        missing.push("output");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ZepbError::FoldersNotSpecified {
            which: missing.join(", "),
        })
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
