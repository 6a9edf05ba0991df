//! Directory scanning and dictionary building.
//!
//! A dictionary maps canonical codes to the file that carries them.
//! Scans fail soft: an unreadable directory is logged and contributes
//! nothing, the rest of the tree is still walked.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::codes::{
    canonical_code, extract_notification_code, extract_zepb_code, has_zepb_marker,
    is_marked_processed,
};

/// Canonical code -> absolute file path. BTreeMap keeps iteration
/// deterministic, which the merge loop relies on.
pub type Dictionary = BTreeMap<String, PathBuf>;

/// Directory name that is never descended into, regardless of the
/// recursive flag. Rejected records live there and must not be merged.
pub const REJECTS_DIR: &str = "отказы";

/// Check for a `.pdf` extension, case-insensitively.
pub fn is_pdf_name(name: &str) -> bool {
    name.to_lowercase().ends_with(".pdf")
}

/// Scan a folder tree and build a code -> path dictionary.
///
/// Depth-first traversal of `root`; when `recursive` is false only the
/// root's direct children are considered. `include` filters regular
/// files by full path and filename; `extract` derives the raw code
/// from the full path. Files marked as already processed are always
/// skipped so the output of a previous run is never re-merged.
///
/// Collision policy: when two files canonicalize to the same code, the
/// one with the greater modification time wins. Stat failures during
/// the comparison keep the existing entry.
pub async fn build_dictionary<F, E>(root: &Path, recursive: bool, include: F, extract: E) -> Dictionary
where
    F: Fn(&Path, &str) -> bool,
    E: Fn(&Path) -> Option<String>,
{
    let mut dict = Dictionary::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!("cannot read dir {:?}: {err}", dir);
                continue;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    warn!("cannot read entry in {:?}: {err}", dir);
                    break;
                }
            };

            let full = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();

            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(err) => {
                    warn!("cannot stat {:?}: {err}", full);
                    continue;
                }
            };

            if file_type.is_dir() {
                if name.to_lowercase() == REJECTS_DIR {
                    continue;
                }
                if recursive {
                    pending.push(full);
                }
                continue;
            }

            if !file_type.is_file() {
                continue;
            }
            if !include(&full, &name) {
                continue;
            }
            if is_marked_processed(&name) {
                debug!("skip processed {:?}", name);
                continue;
            }

            let Some(raw) = extract(&full) else {
                debug!("no code extracted for {:?}", name);
                continue;
            };
            let code = canonical_code(&raw);

            match dict.get(&code) {
                Some(existing) => {
                    if newer_than(&full, existing).await {
                        dict.insert(code, full);
                    }
                }
                None => {
                    dict.insert(code, full);
                }
            }
        }
    }

    dict
}

/// Whether `candidate` has a strictly greater mtime than `existing`.
/// Any stat failure answers false, keeping the existing entry.
async fn newer_than(candidate: &Path, existing: &Path) -> bool {
    let candidate_mtime = match fs::metadata(candidate).await {
        Ok(meta) => meta.modified().ok(),
        Err(_) => None,
    };
    let existing_mtime = match fs::metadata(existing).await {
        Ok(meta) => meta.modified().ok(),
        Err(_) => None,
    };

    match (candidate_mtime, existing_mtime) {
        (Some(candidate), Some(existing)) => candidate > existing,
        _ => false,
    }
}

/// Build the notification dictionary for a folder.
///
/// Notification files are PDFs without a ZEPB indicator whose code is
/// extractable from the filename or, as a fallback, from the parent
/// folder name plus a standalone number.
pub async fn notification_dictionary(root: &Path, recursive: bool) -> Dictionary {
    build_dictionary(
        root,
        recursive,
        |full, name| {
            is_pdf_name(name) && !has_zepb_marker(name) && extract_notification_code(full).is_some()
        },
        extract_notification_code,
    )
    .await
}

/// Build the ZEPB dictionary for a folder.
///
/// ZEPB files are PDFs that either carry a ZEPB indicator in the name
/// or have an extractable record code.
pub async fn zepb_dictionary(root: &Path, recursive: bool) -> Dictionary {
    build_dictionary(
        root,
        recursive,
        |_full, name| is_pdf_name(name) && (has_zepb_marker(name) || extract_zepb_code(name).is_some()),
        |path| {
            path.file_name()
                .and_then(|name| extract_zepb_code(&name.to_string_lossy()))
        },
    )
    .await
}
