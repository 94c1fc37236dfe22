//! Run progress reporting
//!
//! Progress is a `(completed, total)` pair over the items a run dispatches to
//! the resolver. It is published two ways: an optional callback invoked once
//! per completed item, and a `watch` channel for observers that only care
//! about the latest value.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

/// Progress callback type invoked once per completed item
pub type ProgressCallback = Arc<dyn Fn(PipelineProgress) + Send + Sync>;

/// Snapshot of run progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineProgress {
    pub completed: usize,
    pub total: usize,
}

impl PipelineProgress {
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.completed as f64 / self.total as f64) * 100.0
    }
}

/// Serialized progress counter for one run
///
/// The count and both notifications are updated under one lock so observers
/// never see the count move backwards.
pub struct ProgressTracker {
    total: usize,
    completed: Mutex<usize>,
    callback: Option<ProgressCallback>,
    sender: Arc<watch::Sender<PipelineProgress>>,
}

impl ProgressTracker {
    pub fn new(
        total: usize,
        callback: Option<ProgressCallback>,
        sender: Arc<watch::Sender<PipelineProgress>>,
    ) -> Self {
        sender.send_replace(PipelineProgress::new(0, total));
        Self {
            total,
            completed: Mutex::new(0),
            callback,
            sender,
        }
    }

    /// Count one finished item and notify observers
    pub fn record(&self) -> PipelineProgress {
        let mut completed = match self.completed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if *completed >= self.total {
            return PipelineProgress::new(*completed, self.total);
        }
        *completed += 1;
        let progress = PipelineProgress::new(*completed, self.total);

        self.sender.send_replace(progress);
        if let Some(callback) = &self.callback {
            callback(progress);
        }

        progress
    }

    pub fn snapshot(&self) -> PipelineProgress {
        *self.sender.borrow()
    }
}
