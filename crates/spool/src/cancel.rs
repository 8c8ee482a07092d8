//! crates/spool/src/cancel.rs
//!
//! A cheap, cloneable cancellation flag shared between the writer/reader
//! tasks and whatever drives the replication session's shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A single cancellation signal, observed by polling.
///
/// Cloning shares the same underlying flag; any clone can set it and every
/// clone observes the change immediately.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not yet cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Marks the token cancelled. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether [`Self::cancel`] has been called on this token or any
    /// of its clones.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled() {
        assert!(!CancelToken::new().is_cancelled());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
