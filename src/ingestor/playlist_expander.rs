//! Collection expansion
//!
//! Collections are listed with a flat lookup (titles and URLs only), so a
//! playlist of N entries costs one service call rather than N.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::ExtractionError;
use crate::ingestor::item_resolver::classify_error;
use crate::models::{ErrorKind, ItemReference};
use crate::sources::{Credentials, ExtractionResult, LookupMode, MetadataExtractor};
use crate::utils::UrlUtils;

/// Why a collection contributed no items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionFailure {
    pub reason: ErrorKind,
    pub detail: String,
}

impl ExpansionFailure {
    fn new<S: Into<String>>(reason: ErrorKind, detail: S) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

/// Expands collection references into ordered item references
#[derive(Clone)]
pub struct PlaylistExpander {
    extractor: Arc<dyn MetadataExtractor>,
}

impl PlaylistExpander {
    pub fn new(extractor: Arc<dyn MetadataExtractor>) -> Self {
        Self { extractor }
    }

    /// Expand a collection, treating every failure as an empty collection
    pub async fn expand(
        &self,
        collection_url: &str,
        credentials: Option<&Credentials>,
        timeout: Duration,
    ) -> Vec<ItemReference> {
        self.try_expand(collection_url, credentials, timeout)
            .await
            .unwrap_or_default()
    }

    /// Expand a collection, reporting why it produced nothing
    ///
    /// Entries keep the service's order. Entries with neither a URL nor an ID
    /// cannot be referenced and are skipped. A lookup that turns out to be a
    /// single item yields that item.
    pub async fn try_expand(
        &self,
        collection_url: &str,
        credentials: Option<&Credentials>,
        timeout: Duration,
    ) -> Result<Vec<ItemReference>, ExpansionFailure> {
        debug!("Expanding collection {}", collection_url);

        let lookup = self
            .extractor
            .lookup(collection_url, LookupMode::Flat, credentials, timeout);

        let result = match tokio::time::timeout(timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(ExtractionError::Timeout {
                url: collection_url.to_string(),
                seconds: timeout.as_secs(),
            }),
        };

        let listing = match result {
            Ok(ExtractionResult::Collection(listing)) => listing,
            Ok(ExtractionResult::Single(item)) => {
                debug!("{} is a single item, not a collection", collection_url);
                let reference = ItemReference {
                    title: item.title,
                    source_url: collection_url.to_string(),
                };
                return Ok(vec![reference]);
            }
            Err(error) => {
                warn!("Could not list collection {}: {}", collection_url, error);
                let (reason, detail) = classify_error(&error);
                return Err(ExpansionFailure::new(reason, detail));
            }
        };

        let total = listing.entries.len();
        let items: Vec<ItemReference> = listing
            .entries
            .into_iter()
            .filter_map(|entry| {
                let source_url = UrlUtils::normalize_entry_url(
                    collection_url,
                    entry.url.as_deref(),
                    entry.id.as_deref(),
                )?;
                Some(ItemReference {
                    title: entry.title,
                    source_url,
                })
            })
            .collect();

        if items.len() < total {
            debug!(
                "Skipped {} unreferenceable entries in {}",
                total - items.len(),
                collection_url
            );
        }

        if items.is_empty() {
            return Err(ExpansionFailure::new(
                ErrorKind::EmptyCollection,
                "collection has no playable entries",
            ));
        }

        debug!("Collection {} expanded to {} items", collection_url, items.len());
        Ok(items)
    }
}
