//! Bounded, thread-safe circular buffer of console log lines.
//!
//! Every pushed line is also mirrored to `tracing` at debug level under the
//! `bot_console::log` target, so the host's log sink sees the same stream the
//! UI reads from the buffer.

use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Fixed-capacity, insertion-ordered log buffer.
///
/// Clones share the same storage. Once full, every push evicts the oldest line.
#[derive(Clone, Debug)]
pub struct LogBuffer {
    lines: Arc<RwLock<VecDeque<String>>>,
    capacity: usize,
}

impl LogBuffer {
    /// Create a buffer holding at most `capacity` lines (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append a line, evicting the oldest one if the buffer is full.
    pub fn push(&self, line: impl Into<String>) {
        let line = line.into();
        debug!(target: "bot_console::log", "{line}");

        let mut lines = self.write();
        while lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Current lines, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.read().iter().cloned().collect()
    }

    /// Number of buffered lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether no line has been buffered yet (or the buffer was cleared).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Maximum number of lines kept.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every buffered line.
    pub fn clear(&self) {
        self.write().clear();
    }

    // A writer panicking mid-push cannot leave the deque in a torn state,
    // so poisoned locks are recovered.
    fn read(&self) -> RwLockReadGuard<'_, VecDeque<String>> {
        self.lines.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<String>> {
        self.lines.write().unwrap_or_else(PoisonError::into_inner)
    }
}
