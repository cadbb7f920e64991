//! Cooperative cancellation checked between pipeline stages.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Why a layer stopped before finishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// [`CancellationToken::cancel`] was called.
    Cancelled,
    /// The token's deadline passed.
    DeadlineExceeded,
}

/// Cancel flag plus an optional deadline.
///
/// Clones share the flag, so cancelling any clone cancels them all. Each
/// clone may carry its own deadline.
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use strata_data::{CancellationToken, Interrupt};
///
/// let batch = CancellationToken::new();
/// let layer = batch.with_timeout(Some(Duration::from_secs(60)));
/// assert_eq!(layer.check(), Ok(()));
/// batch.cancel();
/// assert_eq!(layer.check(), Err(Interrupt::Cancelled));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// Token that is never cancelled unless asked to be.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone sharing the cancel flag with a deadline `timeout` from now.
    ///
    /// `None` keeps the current deadline.
    #[must_use]
    pub fn with_timeout(&self, timeout: Option<Duration>) -> Self {
        let deadline = timeout
            .and_then(|timeout| Instant::now().checked_add(timeout))
            .or(self.deadline);
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline,
        }
    }

    /// Clone sharing the cancel flag with an explicit deadline.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline: Some(deadline),
        }
    }

    /// Request cancellation of every clone.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Ok` while the layer may proceed to its next stage.
    pub fn check(&self) -> Result<(), Interrupt> {
        if self.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupt::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn fresh_tokens_proceed() {
        assert_eq!(CancellationToken::new().check(), Ok(()));
    }

    #[rstest]
    fn cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.with_timeout(None);
        clone.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.check(), Err(Interrupt::Cancelled));
    }

    #[rstest]
    fn past_deadlines_interrupt() {
        let token = CancellationToken::new().with_deadline(Instant::now());
        assert_eq!(token.check(), Err(Interrupt::DeadlineExceeded));
    }

    #[rstest]
    fn deadlines_are_per_clone() {
        let batch = CancellationToken::new();
        let _expired = batch.with_deadline(Instant::now());
        assert_eq!(batch.check(), Ok(()));
    }
}
