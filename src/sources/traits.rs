//! Metadata extraction service abstraction
//!
//! The resolver never talks to a video site directly. Every lookup goes
//! through a [`MetadataExtractor`], which maps one source URL to either a
//! single item (with its stream variants) or a collection listing. The shape
//! of the answer is decided once, here at the boundary, and never
//! re-inspected downstream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ExtractionError;
use crate::models::StreamVariant;
use crate::sources::credentials::Credentials;

/// How much detail a lookup should return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupMode {
    /// Per-item variant set
    Full,
    /// Titles and URLs only, no per-item probing
    Flat,
}

/// One item with its candidate stream variants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub title: Option<String>,
    pub variants: Vec<StreamVariant>,
}

/// One entry of a flat collection listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionEntry {
    pub title: Option<String>,
    pub url: Option<String>,
    pub id: Option<String>,
}

/// A collection and its entries, in service order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionListing {
    pub title: Option<String>,
    pub entries: Vec<CollectionEntry>,
}

/// Tagged lookup result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionResult {
    Single(ItemMetadata),
    Collection(CollectionListing),
}

impl ExtractionResult {
    pub fn title(&self) -> Option<&str> {
        match self {
            ExtractionResult::Single(item) => item.title.as_deref(),
            ExtractionResult::Collection(listing) => listing.title.as_deref(),
        }
    }
}

/// The metadata extraction service seam
///
/// Implementations must be safe to call concurrently; the pipeline shares
/// one extractor across all in-flight lookups.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Look up one URL
    async fn lookup(
        &self,
        url: &str,
        mode: LookupMode,
        credentials: Option<&Credentials>,
        timeout: Duration,
    ) -> Result<ExtractionResult, ExtractionError>;
}
