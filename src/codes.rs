//! Code extraction and canonicalization.
//!
//! Record codes look like `СПД-1245.25`: a short uppercase prefix from
//! a closed set, an optional dash (several Unicode dash variants are in
//! circulation, optionally surrounded by whitespace), and a number with
//! an optional decimal revision suffix. Matching is case-insensitive;
//! the extracted form is uppercased with the separator normalized to a
//! single ASCII dash.
//!
//! # Examples
//!
//! ```
//! use zepbmerge::codes::{canonical_code, extract_code};
//!
//! let code = extract_code("СПД – 1245.25 Резервуар.pdf").unwrap();
//! assert_eq!(code, "СПД-1245.25");
//! assert_eq!(canonical_code(&code), "СПД-1245");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Known record-type prefixes (ZEPB / notification codes).
pub const PREFIXES: &[&str] = &[
    "СК", "УА", "СППК", "СПД", "РВС", "ПУ", "П", "ГЗУ", "ПТП", "ТТП", "НА",
];

/// Dash variants accepted between prefix and number: ASCII hyphen,
/// the U+2010..U+2015 range (hyphen, non-breaking hyphen, figure dash,
/// en dash, em dash, horizontal bar) and the minus sign U+2212.
const DASH_CLASS: &str = r"[-\u{2010}\u{2011}\u{2012}\u{2013}\u{2014}\u{2015}\u{2212}]";

/// Full code pattern: `PREFIX [ws] [dash] [ws] DIGITS[.DIGITS]`.
static CODE_RE: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"(?i)({prefixes})\s*{dash}?\s*(\d+(?:\.\d+)?)",
        prefixes = PREFIXES.join("|"),
        dash = DASH_CLASS,
    );
    Regex::new(&pattern).expect("code pattern is valid")
});

/// A standalone number, used by the folder-name fallback.
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number pattern"));

/// Trailing revision suffix stripped by canonicalization. Only 1-4
/// digit suffixes count; longer numeric tails are kept verbatim.
static REVISION_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.\d{1,4}$").expect("suffix pattern"));

/// Marker left on files already merged by a previous run, either
/// parenthesized or as a bare token.
static PROCESSED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\(.*?(с увед|с уведомл|with notification).*?\)|\bс увед\b|\bс уведомл\b|\bwith notification\b|\bобъединен\b|\bprocessed\b)",
    )
    .expect("processed-marker pattern")
});

/// ZEPB-type indicator in a filename, tolerant of common misspellings
/// and spaced-out letters.
static ZEPB_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(зэпб|зэсб|эпб|з\s*э\s*п\s*б|з[её]пб)").expect("zepb-marker pattern")
});

/// Trailing processed-marker group on a basename, parenthesized form.
static STRIP_PAREN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\((с увед.*?)\)\s*$").expect("paren strip pattern"));

/// Trailing processed-marker tail on a basename, bare form.
static STRIP_TAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(с увед.*?)$").expect("tail strip pattern"));

/// Extract the first record code from a filename.
///
/// Returns the code uppercased with the separator normalized to a
/// single `-`, or None when the name carries no recognizable code.
pub fn extract_code(name: &str) -> Option<String> {
    CODE_RE
        .captures(name)
        .map(|caps| format!("{}-{}", caps[1].to_uppercase(), &caps[2]))
}

/// Extract a notification code from a file path.
///
/// First tries the filename itself. When that fails, falls back to the
/// parent directory: if the directory name contains a known prefix and
/// the filename contains a standalone number, the code is synthesized
/// as `PREFIX-NUMBER`. Scanned notification batches are often dropped
/// into a per-record folder with bare-numbered files inside.
pub fn extract_notification_code(path: &Path) -> Option<String> {
    let filename = path.file_name()?.to_string_lossy();

    if let Some(code) = extract_code(&filename) {
        return Some(code);
    }

    let folder = path.parent()?.file_name()?.to_string_lossy();
    let folder_upper = folder.to_uppercase();
    let prefix = PREFIXES.iter().find(|p| folder_upper.contains(**p))?;
    let number = NUMBER_RE.find(&filename)?;

    Some(format!("{}-{}", prefix, number.as_str()))
}

/// Extract a ZEPB code from a filename. No folder fallback: ZEPB
/// scans are named after the record itself.
pub fn extract_zepb_code(name: &str) -> Option<String> {
    extract_code(name)
}

/// Canonicalize a code for dictionary matching.
///
/// Strips a trailing `.` + 1-4 digit revision suffix and uppercases
/// the remainder. Idempotent.
pub fn canonical_code(raw: &str) -> String {
    REVISION_SUFFIX_RE.replace(raw, "").to_uppercase()
}

/// Whether a filename is marked as already merged by a previous run.
pub fn is_marked_processed(name: &str) -> bool {
    PROCESSED_RE.is_match(name)
}

/// Whether a filename carries a ZEPB-type indicator.
pub fn has_zepb_marker(name: &str) -> bool {
    ZEPB_MARKER_RE.is_match(name)
}

/// Remove a trailing processed marker from a basename, so re-merged
/// output never stacks markers.
pub fn strip_processed_marker(base: &str) -> String {
    let stripped = STRIP_PAREN_RE.replace(base, "");
    STRIP_TAIL_RE.replace(&stripped, "").into_owned()
}
