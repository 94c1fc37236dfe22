//! Single item resolution
//!
//! [`ItemResolver`] performs one full-detail lookup for one item reference and
//! turns whatever comes back into a [`PlaylistEntry`]. Every failure mode is a
//! value; nothing here returns an error to the caller.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::ExtractionError;
use crate::models::{ErrorKind, FailedItem, ItemReference, PlaylistEntry, ResolvedItem};
use crate::sources::{Credentials, ExtractionResult, LookupMode, MetadataExtractor};
use crate::streaming::select_variant;

/// Resolves item references into playable stream URLs
#[derive(Clone)]
pub struct ItemResolver {
    extractor: Arc<dyn MetadataExtractor>,
}

impl ItemResolver {
    pub fn new(extractor: Arc<dyn MetadataExtractor>) -> Self {
        Self { extractor }
    }

    /// Resolve one item
    ///
    /// The lookup is bounded by `timeout` here as well as inside the
    /// extractor, so a misbehaving extractor cannot stall a batch.
    pub async fn resolve(
        &self,
        item: &ItemReference,
        credentials: Option<&Credentials>,
        timeout: Duration,
    ) -> PlaylistEntry {
        let url = item.source_url.as_str();
        debug!("Resolving {} via {}", url, self.extractor.name());

        let lookup = self
            .extractor
            .lookup(url, LookupMode::Full, credentials, timeout);

        let result = match tokio::time::timeout(timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Timeout {
                url: url.to_string(),
                seconds: timeout.as_secs(),
            }),
        };

        match result {
            Ok(ExtractionResult::Single(metadata)) => {
                let title = [item.title.as_deref(), metadata.title.as_deref()]
                    .into_iter()
                    .flatten()
                    .find(|t| !t.trim().is_empty())
                    .unwrap_or(&item.source_url)
                    .to_string();

                match select_variant(&metadata.variants) {
                    Some(variant) => {
                        let stream_url = variant.usable_url().unwrap_or_default();
                        debug!(
                            "Resolved {} to {}p variant",
                            url,
                            variant.height.unwrap_or(0)
                        );
                        PlaylistEntry::Resolved(ResolvedItem {
                            title,
                            stream_url: stream_url.to_string(),
                            height: variant.height,
                        })
                    }
                    None => {
                        debug!(
                            "No HLS variant among {} formats for {}",
                            metadata.variants.len(),
                            url
                        );
                        FailedItem::new(
                            title,
                            ErrorKind::NoStreamFound,
                            "no adaptive (HLS) stream available",
                        )
                        .into()
                    }
                }
            }
            Ok(ExtractionResult::Collection(listing)) => FailedItem::new(
                item.display_title(),
                ErrorKind::ExtractionError,
                format!(
                    "reference resolved to a collection of {} entries",
                    listing.entries.len()
                ),
            )
            .into(),
            Err(error) => {
                warn!("Lookup failed for {}: {}", url, error);
                let (reason, detail) = classify_error(&error);
                FailedItem::new(item.display_title(), reason, detail).into()
            }
        }
    }
}

/// Fold an extraction failure into the item-level vocabulary
pub fn classify_error(error: &ExtractionError) -> (ErrorKind, String) {
    match error {
        ExtractionError::AuthRequired { message } => (ErrorKind::AuthRequired, message.clone()),
        ExtractionError::Timeout { seconds, .. } => {
            (ErrorKind::Timeout, format!("timed out after {seconds}s"))
        }
        ExtractionError::NotFound { .. } => (ErrorKind::ExtractionError, error.to_string()),
        ExtractionError::Unknown { message } => (ErrorKind::ExtractionError, message.clone()),
    }
}
