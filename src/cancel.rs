//! Cooperative cancellation.
//!
//! Each pipeline run receives its own [`CancelToken`]; the caller keeps
//! a clone and flips it to stop the run at the next checkpoint. Tokens
//! are independent, so a merge run and a compress run can be cancelled
//! separately.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A cancellation token shared between a pipeline run and its caller.
///
/// Cancellation is cooperative: pipelines poll the token at item
/// boundaries (top of each merge iteration, before a compression worker
/// claims new work). An in-flight single-file operation always runs to
/// completion.
///
/// # Examples
///
/// ```
/// use zepbmerge::cancel::CancelToken;
///
/// let token = CancelToken::new();
/// let handle = token.clone();
///
/// assert!(!token.is_cancelled());
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, non-cancelled token.
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    ///
    /// Returns true if this call flipped the flag, false if the token
    /// was already cancelled.
    pub fn cancel(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_is_not_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let clone = token.clone();

        clone.cancel();
        assert!(token.is_cancelled());
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_cancel_reports_first_flip() {
        let token = CancelToken::new();
        assert!(token.cancel());
        assert!(!token.cancel());
    }

    #[test]
    fn test_tokens_are_independent() {
        let merge_token = CancelToken::new();
        let compress_token = CancelToken::new();

        merge_token.cancel();
        assert!(merge_token.is_cancelled());
        assert!(!compress_token.is_cancelled());
    }
}
