//! Execution context and runtime configuration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::executor::{ExecResult, ExecutionError};

/// Configuration for query execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionConfig {
    /// Maximum wall time of one query, measured from execution start.
    pub query_timeout: Option<Duration>,
}

impl ExecutionConfig {
    /// Sets the query timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }
}

/// Cloneable handle that cancels a running query.
///
/// Cancellation is observed on the next pull from the result iterator or
/// the scan.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Creates a handle that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns true once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Per-query execution state threaded through every `next()` call.
#[derive(Debug)]
pub struct ExecutionContext {
    query_id: u64,
    config: ExecutionConfig,
    cancel: CancelHandle,
    started: Instant,
    deadline: Option<Instant>,
}

impl ExecutionContext {
    /// Creates a context; the deadline starts counting now.
    pub fn new(query_id: u64, config: ExecutionConfig) -> Self {
        let started = Instant::now();
        let deadline = config.query_timeout.map(|t| started + t);
        Self {
            query_id,
            config,
            cancel: CancelHandle::new(),
            started,
            deadline,
        }
    }

    /// Query identifier, for logging.
    pub fn query_id(&self) -> u64 {
        self.query_id
    }

    /// Execution configuration.
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Returns a handle that cancels this query.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Time since the context was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Fails if the query was cancelled or ran past its deadline.
    pub fn check(&self) -> ExecResult<()> {
        if self.cancel.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }
        if let (Some(deadline), Some(timeout)) = (self.deadline, self.config.query_timeout) {
            if Instant::now() >= deadline {
                return Err(ExecutionError::Timeout(timeout));
            }
        }
        Ok(())
    }
}
