//! Abort token for cooperative orchestration abort.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// A token for requesting an orchestration abort.
///
/// Aborting is idempotent; only the first reason is kept. The scheduler
/// checks the token before issuing each construction call, so in-flight
/// provider calls run to completion and their nodes keep their outcome.
#[derive(Debug, Default)]
pub struct AbortToken {
    aborted: AtomicBool,
    reason: RwLock<Option<String>>,
}

impl AbortToken {
    /// Creates a new token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests an abort with a reason. First reason wins.
    pub fn abort(&self, reason: impl Into<String>) {
        if self
            .aborted
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.reason.write() = Some(reason.into());
        }
    }

    /// Returns whether an abort has been requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Returns the abort reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_default_not_aborted() {
        let token = AbortToken::new();
        assert!(!token.is_aborted());
        assert!(token.reason().is_none());
    }

    #[test]
    fn test_abort_first_reason_wins() {
        let token = AbortToken::new();
        token.abort("operator request");
        token.abort("second request");

        assert!(token.is_aborted());
        assert_eq!(token.reason(), Some("operator request".to_string()));
    }
}
