//! Cooperative cancellation for analysis runs.
//!
//! The scanner, recommender, and analyzer call [`CancellationToken::check`]
//! between entity-level checks. A tripped token aborts the run with
//! [`Error::Cancelled`] or [`Error::TimedOut`]; partial results are dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use taxon_core::{Error, Result};

/// Cloneable cancellation handle with an optional deadline.
///
/// Clones share the cancellation flag, so a token handed to another thread
/// can stop a running analysis.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// Token that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Checkpoint: Ok while the run may continue.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.is_expired() {
            return Err(Error::TimedOut);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_passes() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
        assert!(!token.is_cancelled());
        assert!(!token.is_expired());
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancellationToken::new();
        let handle = token.clone();

        handle.cancel();

        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_past_deadline_times_out() {
        let token = CancellationToken::with_deadline(Instant::now());
        assert!(matches!(token.check(), Err(Error::TimedOut)));
    }

    #[test]
    fn test_distant_deadline_passes() {
        let token = CancellationToken::with_timeout(Duration::from_secs(3600));
        assert!(token.check().is_ok());
    }

    #[test]
    fn test_cancellation_wins_over_deadline() {
        let token = CancellationToken::with_deadline(Instant::now());
        token.cancel();
        assert!(matches!(token.check(), Err(Error::Cancelled)));
    }
}
