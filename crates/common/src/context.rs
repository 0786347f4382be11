//! Cancellation and deadline handling for discovery passes

use crate::{DiscoveryError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Carries cancellation and an optional deadline through a discovery pass.
///
/// Extractors call [`DiscoveryContext::check`] before every file, resource
/// kind and API page. Cancelling stops the next unit, never one in flight.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl DiscoveryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context that shares cancellation with this one and expires
    /// after `timeout` (or at the parent's deadline, whichever is sooner)
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline: Some(match self.deadline {
                Some(parent) if parent < deadline => parent,
                _ => deadline,
            }),
        }
    }

    /// Request cancellation of every context sharing this flag
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Time left before the deadline, if one is set
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fail with [`DiscoveryError::Cancelled`] once cancelled or expired
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(DiscoveryError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(DiscoveryError::Cancelled);
            }
        }
        Ok(())
    }
}
