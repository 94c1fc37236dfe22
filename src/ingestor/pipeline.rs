//! Resolution pipeline
//!
//! Turns an ordered list of source references into an ordered playlist.
//!
//! # Flow
//!
//! 1. Every reference is classified once (see [`SourceReference::kind`]).
//!    Collections are expanded with a flat lookup, single items become one
//!    item reference each. References on hosts outside the allow-list become
//!    an `UnsupportedSource` entry without any service call. A collection
//!    that cannot be listed, or lists nothing, takes one failed entry at its
//!    input position. Every item gets a fixed output index here.
//! 2. Item references are dispatched in sequential batches of `batch_size`.
//!    One semaphore of `concurrency` permits, created per run, caps the
//!    number of lookups in flight. Each batch completes before the next one
//!    starts.
//! 3. Results are written at their fixed index, so output order is input
//!    order no matter which lookup finishes first.
//!
//! Only credential loading and option validation can fail a run, and both
//! happen before any lookup.
//!
//! Each run gets its own cancellation token. A [`CancelHandle`] cancels the
//! run in progress; a cancelled run never affects the next one.

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Semaphore, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::config::defaults::{
    DEFAULT_ALLOWED_HOSTS, DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY, DEFAULT_EXTRACTOR_TIMEOUT_SECS,
};
use crate::errors::{AppError, AppResult};
use crate::ingestor::item_resolver::ItemResolver;
use crate::ingestor::playlist_expander::{ExpansionFailure, PlaylistExpander};
use crate::ingestor::progress::{PipelineProgress, ProgressCallback, ProgressTracker};
use crate::ingestor::report::PipelineReport;
use crate::models::{
    ErrorKind, FailedItem, FailedReference, ItemReference, Playlist, PlaylistEntry,
    SourceReference,
};
use crate::sources::{CredentialSource, Credentials, MetadataExtractor};
use crate::utils::UrlUtils;

/// Tuning for one pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Maximum lookups in flight at once
    pub concurrency: usize,
    /// Items dispatched per batch
    pub batch_size: usize,
    /// Per-lookup timeout
    pub timeout: Duration,
    /// Accepted source hosts; empty accepts every host
    pub allowed_hosts: Vec<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: Duration::from_secs(DEFAULT_EXTRACTOR_TIMEOUT_SECS),
            allowed_hosts: DEFAULT_ALLOWED_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.pipeline.concurrency,
            batch_size: config.pipeline.batch_size,
            timeout: config.extractor.timeout,
            allowed_hosts: config.extractor.allowed_hosts.clone(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.concurrency == 0 {
            return Err(AppError::configuration("concurrency must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(AppError::configuration("batch size must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(AppError::configuration("timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Cancels the run in progress on the pipeline it came from
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    current: Arc<Mutex<Option<(Uuid, CancellationToken)>>>,
}

impl CancelHandle {
    /// Cancel the current run
    ///
    /// Returns `false` when no run is in progress.
    pub fn cancel(&self) -> bool {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        match current.as_ref() {
            Some((run_id, token)) => {
                debug!("Cancelling run {}", run_id);
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a run is in progress
    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn begin(&self, run_id: Uuid) -> CancellationToken {
        let token = CancellationToken::new();
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some((run_id, token.clone()));
        token
    }

    fn finish(&self, run_id: Uuid) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.as_ref().is_some_and(|(id, _)| *id == run_id) {
            *current = None;
        }
    }
}

/// Batched, bounded-concurrency resolver over a list of references
pub struct ResolutionPipeline {
    resolver: ItemResolver,
    expander: PlaylistExpander,
    options: PipelineOptions,
    progress_callback: Option<ProgressCallback>,
    progress_tx: Arc<watch::Sender<PipelineProgress>>,
    cancel_handle: CancelHandle,
}

impl ResolutionPipeline {
    pub fn new(extractor: Arc<dyn MetadataExtractor>, options: PipelineOptions) -> Self {
        let (progress_tx, _) = watch::channel(PipelineProgress::default());
        Self {
            resolver: ItemResolver::new(extractor.clone()),
            expander: PlaylistExpander::new(extractor),
            options,
            progress_callback: None,
            progress_tx: Arc::new(progress_tx),
            cancel_handle: CancelHandle::default(),
        }
    }

    /// Invoke `callback` once per completed item
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Handle that cancels whichever run is in progress
    ///
    /// Cancelling stops further dispatch. Lookups already running finish and
    /// keep their results; everything else becomes a `Cancelled` entry.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel_handle.clone()
    }

    /// Latest progress of the current or last run
    pub fn subscribe_progress(&self) -> watch::Receiver<PipelineProgress> {
        self.progress_tx.subscribe()
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Load credentials and resolve `references`
    ///
    /// Unreadable or malformed credential material fails the run before any
    /// lookup is made. Per-reference and per-item problems never do.
    pub async fn run(
        &self,
        references: &[SourceReference],
        auth: Option<&CredentialSource>,
    ) -> AppResult<PipelineReport> {
        self.options.validate()?;

        let credentials = auth.map(Credentials::load).transpose()?;
        if let Some(credentials) = &credentials {
            info!(
                "Using {} cookies from {}",
                credentials.cookie_count(),
                credentials.path().display()
            );
        }

        Ok(self.run_with_credentials(references, credentials.as_ref()).await)
    }

    /// Resolve `references` with already loaded credentials
    pub async fn run_with_credentials(
        &self,
        references: &[SourceReference],
        credentials: Option<&Credentials>,
    ) -> PipelineReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let cancellation = self.cancel_handle.begin(run_id);
        info!(
            "Starting resolution run {} for {} references (concurrency {}, batch size {})",
            run_id,
            references.len(),
            self.options.concurrency,
            self.options.batch_size
        );

        let mut titles: Vec<String> = Vec::new();
        let mut slots: Vec<Option<PlaylistEntry>> = Vec::new();
        let mut pending: Vec<(usize, ItemReference)> = Vec::new();
        let mut collection_failures: Vec<FailedReference> = Vec::new();

        for reference in references {
            let url = reference.url();
            let title = reference.display_title();

            if !UrlUtils::host_allowed(url, &self.options.allowed_hosts) {
                let detail = match UrlUtils::extract_domain(url) {
                    Some(host) => format!("host {host} is not an accepted source"),
                    None => "not a valid URL".to_string(),
                };
                debug!("Rejected {}: {}", url, detail);
                titles.push(title.to_string());
                slots.push(Some(
                    FailedItem::new(title, ErrorKind::UnsupportedSource, detail).into(),
                ));
                continue;
            }

            let items = if reference.is_collection() {
                let listed = if cancellation.is_cancelled() {
                    Err(ExpansionFailure {
                        reason: ErrorKind::Cancelled,
                        detail: "run cancelled before the collection was listed".to_string(),
                    })
                } else {
                    self.expander
                        .try_expand(url, credentials, self.options.timeout)
                        .await
                };

                match listed {
                    Ok(items) => items,
                    Err(failure) => {
                        warn!("Collection {} contributed no items: {}", url, failure.detail);
                        titles.push(title.to_string());
                        slots.push(Some(
                            FailedItem::new(title, failure.reason, failure.detail.clone()).into(),
                        ));
                        collection_failures.push(FailedReference {
                            url: url.to_string(),
                            reason: failure.reason,
                            detail: failure.detail,
                        });
                        continue;
                    }
                }
            } else {
                vec![reference.to_item_reference()]
            };

            for item in items {
                let index = slots.len();
                titles.push(item.display_title().to_string());
                slots.push(None);
                pending.push((index, item));
            }
        }

        let tracker = ProgressTracker::new(
            pending.len(),
            self.progress_callback.clone(),
            self.progress_tx.clone(),
        );
        let semaphore = Semaphore::new(self.options.concurrency);
        let batch_count = pending.len().div_ceil(self.options.batch_size);

        for (batch_number, batch) in pending.chunks(self.options.batch_size).enumerate() {
            if cancellation.is_cancelled() {
                info!(
                    "Run {} cancelled before batch {}/{}",
                    run_id,
                    batch_number + 1,
                    batch_count
                );
                break;
            }

            debug!(
                "Dispatching batch {}/{} ({} items)",
                batch_number + 1,
                batch_count,
                batch.len()
            );

            let mut in_flight: FuturesUnordered<_> = batch
                .iter()
                .map(|(index, item)| {
                    self.resolve_slot(*index, item, credentials, &semaphore, &cancellation)
                })
                .collect();

            while let Some((index, entry)) = in_flight.next().await {
                if let Some(entry) = entry {
                    slots[index] = Some(entry);
                    tracker.record();
                }
            }
        }

        let mut cancelled = collection_failures
            .iter()
            .any(|f| f.reason == ErrorKind::Cancelled);

        let entries: Vec<PlaylistEntry> = slots
            .into_iter()
            .zip(titles)
            .map(|(slot, title)| {
                slot.unwrap_or_else(|| {
                    cancelled = true;
                    FailedItem::new(
                        title,
                        ErrorKind::Cancelled,
                        "run cancelled before this item was resolved",
                    )
                    .into()
                })
            })
            .collect();

        let report = PipelineReport {
            run_id,
            playlist: Playlist::new(entries),
            collection_failures,
            cancelled,
            started_at,
            finished_at: Utc::now(),
        };

        self.cancel_handle.finish(run_id);
        info!("Run {} finished: {}", run_id, report.summary());
        report
    }

    /// Resolve one item once a permit is free
    ///
    /// Returns `None` when the run was cancelled while the item was waiting.
    async fn resolve_slot(
        &self,
        index: usize,
        item: &ItemReference,
        credentials: Option<&Credentials>,
        semaphore: &Semaphore,
        cancellation: &CancellationToken,
    ) -> (usize, Option<PlaylistEntry>) {
        let Ok(_permit) = semaphore.acquire().await else {
            return (index, None);
        };

        if cancellation.is_cancelled() {
            return (index, None);
        }

        let entry = self
            .resolver
            .resolve(item, credentials, self.options.timeout)
            .await;
        (index, Some(entry))
    }
}
