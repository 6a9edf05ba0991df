//! Dictionary matching.
//!
//! Pure set operations over the two dictionaries: the intersection is
//! what gets merged, the two differences are surfaced to the caller so
//! missing counterparts can be chased down before the next run.

use serde::{Deserialize, Serialize};

use crate::dictionary::Dictionary;

/// Which side of the match an unmatched entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedKind {
    /// A notification without a ZEPB counterpart.
    Notification,
    /// A ZEPB without a notification counterpart.
    Zepb,
}

/// A dictionary entry that found no counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedItem {
    /// Side the entry came from.
    pub kind: UnmatchedKind,
    /// Canonical code of the entry.
    pub code: String,
    /// Filename (basename) of the entry.
    pub file: String,
}

/// Result of matching the notification dictionary against the ZEPB
/// dictionary.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    /// Codes present in both dictionaries, in dictionary key order.
    pub matched: Vec<String>,
    /// Notification codes absent from the ZEPB dictionary.
    pub unmatched_notifications: Vec<UnmatchedItem>,
    /// ZEPB codes absent from the notification dictionary.
    pub unmatched_zepb: Vec<UnmatchedItem>,
}

/// Compute matched and unmatched sets for two dictionaries.
///
/// `matched ∪ unmatched_notifications ∪ unmatched_zepb` partitions the
/// union of both key sets, and `matched` equals their intersection.
pub fn match_dictionaries(notifications: &Dictionary, zepb: &Dictionary) -> MatchOutcome {
    let mut outcome = MatchOutcome::default();

    for (code, path) in notifications {
        if zepb.contains_key(code) {
            outcome.matched.push(code.clone());
        } else {
            outcome.unmatched_notifications.push(UnmatchedItem {
                kind: UnmatchedKind::Notification,
                code: code.clone(),
                file: basename(path),
            });
        }
    }

    for (code, path) in zepb {
        if !notifications.contains_key(code) {
            outcome.unmatched_zepb.push(UnmatchedItem {
                kind: UnmatchedKind::Zepb,
                code: code.clone(),
                file: basename(path),
            });
        }
    }

    outcome
}

fn basename(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::path::PathBuf;

    fn dict(entries: &[(&str, &str)]) -> Dictionary {
        entries
            .iter()
            .map(|(code, path)| (code.to_string(), PathBuf::from(path)))
            .collect()
    }

    #[test]
    fn test_matched_is_intersection() {
        let notifications = dict(&[("СПД-1", "/n/a.pdf"), ("СПД-2", "/n/b.pdf")]);
        let zepb = dict(&[("СПД-2", "/z/b.pdf"), ("СПД-3", "/z/c.pdf")]);

        let outcome = match_dictionaries(&notifications, &zepb);

        assert_eq!(outcome.matched, vec!["СПД-2".to_string()]);
        assert_eq!(outcome.unmatched_notifications.len(), 1);
        assert_eq!(outcome.unmatched_notifications[0].code, "СПД-1");
        assert_eq!(outcome.unmatched_notifications[0].file, "a.pdf");
        assert_eq!(outcome.unmatched_zepb.len(), 1);
        assert_eq!(outcome.unmatched_zepb[0].code, "СПД-3");
    }

    #[test]
    fn test_outcome_partitions_key_union() {
        let notifications = dict(&[
            ("П-1", "/n/1.pdf"),
            ("П-2", "/n/2.pdf"),
            ("П-3", "/n/3.pdf"),
        ]);
        let zepb = dict(&[("П-2", "/z/2.pdf"), ("П-4", "/z/4.pdf")]);

        let outcome = match_dictionaries(&notifications, &zepb);

        let mut seen = BTreeSet::new();
        for code in &outcome.matched {
            assert!(seen.insert(code.clone()));
        }
        for item in outcome
            .unmatched_notifications
            .iter()
            .chain(&outcome.unmatched_zepb)
        {
            assert!(seen.insert(item.code.clone()));
        }

        let union: BTreeSet<String> = notifications.keys().chain(zepb.keys()).cloned().collect();
        assert_eq!(seen, union);
    }

    #[test]
    fn test_empty_dictionaries() {
        let outcome = match_dictionaries(&Dictionary::new(), &Dictionary::new());
        assert!(outcome.matched.is_empty());
        assert!(outcome.unmatched_notifications.is_empty());
        assert!(outcome.unmatched_zepb.is_empty());
    }

    #[test]
    fn test_matched_follows_dictionary_key_order() {
        let notifications = dict(&[("Б-2", "/n/2.pdf"), ("А-1", "/n/1.pdf"), ("В-3", "/n/3.pdf")]);
        let zepb = dict(&[("В-3", "/z/3.pdf"), ("А-1", "/z/1.pdf"), ("Б-2", "/z/2.pdf")]);

        let outcome = match_dictionaries(&notifications, &zepb);
        assert_eq!(outcome.matched, vec!["А-1", "Б-2", "В-3"]);
    }

    #[test]
    fn test_unmatched_kind_serialization() {
        let item = UnmatchedItem {
            kind: UnmatchedKind::Zepb,
            code: "СПД-1".to_string(),
            file: "z.pdf".to_string(),
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"zepb\""));
        assert!(json.contains("СПД-1"));
    }
}
