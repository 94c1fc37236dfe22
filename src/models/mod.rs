//! Core data model shared by the resolution pipeline and the playback session.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::url::UrlUtils;

/// How a raw reference should be treated by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    SingleItem,
    Collection,
}

/// One line of raw user input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReference {
    url: String,
    kind: ReferenceKind,
    /// Display name chosen by the user, e.g. a preset name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
}

impl SourceReference {
    /// Create a reference and classify it from the URL shape
    ///
    /// Links pasted without a scheme default to HTTPS.
    pub fn new<S: Into<String>>(url: S) -> Self {
        let url = UrlUtils::normalize_scheme(&url.into());
        let kind = if UrlUtils::looks_like_collection(&url) {
            ReferenceKind::Collection
        } else {
            ReferenceKind::SingleItem
        };
        Self {
            url,
            kind,
            title: None,
        }
    }

    /// Create a reference that is always resolved as a single item
    pub fn single<S: Into<String>>(url: S) -> Self {
        Self {
            url: UrlUtils::normalize_scheme(&url.into()),
            kind: ReferenceKind::SingleItem,
            title: None,
        }
    }

    /// Create a reference that is always expanded as a playlist
    pub fn playlist<S: Into<String>>(url: S) -> Self {
        Self {
            url: UrlUtils::normalize_scheme(&url.into()),
            kind: ReferenceKind::Collection,
            title: None,
        }
    }

    /// Parse newline separated input, skipping blank lines
    pub fn parse_lines(input: &str) -> Vec<Self> {
        input
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Self::new)
            .collect()
    }

    /// Attach a display name; blank names are ignored
    pub fn with_title<T: Into<String>>(mut self, title: T) -> Self {
        let title = title.into();
        let trimmed = title.trim();
        self.title = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Title for display, falling back to the URL
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.url)
    }

    /// The item reference for a reference resolved as a single item
    pub fn to_item_reference(&self) -> ItemReference {
        ItemReference {
            title: self.title.clone(),
            source_url: self.url.clone(),
        }
    }

    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    pub fn is_collection(&self) -> bool {
        self.kind == ReferenceKind::Collection
    }
}

/// A single playable item before resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemReference {
    pub title: Option<String>,
    pub source_url: String,
}

impl ItemReference {
    pub fn new<S: Into<String>>(source_url: S) -> Self {
        Self {
            title: None,
            source_url: source_url.into(),
        }
    }

    pub fn with_title<T: Into<String>, S: Into<String>>(title: T, source_url: S) -> Self {
        Self {
            title: Some(title.into()),
            source_url: source_url.into(),
        }
    }

    /// Title for display, falling back to the source URL
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.source_url)
    }
}

/// One quality/bitrate option reported for an item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamVariant {
    pub protocol_tag: String,
    pub container_ext: String,
    pub format_note: String,
    pub url: Option<String>,
    pub height: Option<u32>,
    pub total_bitrate: Option<f64>,
}

impl StreamVariant {
    /// The variant URL, if present and non-blank
    pub fn usable_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Terminal success state for one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedItem {
    pub title: String,
    pub stream_url: String,
    pub height: Option<u32>,
}

impl ResolvedItem {
    pub fn new<T: Into<String>, U: Into<String>>(title: T, stream_url: U) -> Self {
        Self {
            title: title.into(),
            stream_url: stream_url.into(),
            height: None,
        }
    }
}

/// Reason an item or reference could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoStreamFound,
    AuthRequired,
    Timeout,
    ExtractionError,
    EmptyCollection,
    UnsupportedSource,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoStreamFound => "no_stream_found",
            ErrorKind::AuthRequired => "auth_required",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ExtractionError => "extraction_error",
            ErrorKind::EmptyCollection => "empty_collection",
            ErrorKind::UnsupportedSource => "unsupported_source",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure state for one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub title: String,
    pub reason: ErrorKind,
    pub detail: String,
}

impl FailedItem {
    pub fn new<T: Into<String>, D: Into<String>>(title: T, reason: ErrorKind, detail: D) -> Self {
        Self {
            title: title.into(),
            reason,
            detail: detail.into(),
        }
    }
}

/// A reference that contributed no items, kept for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedReference {
    pub url: String,
    pub reason: ErrorKind,
    pub detail: String,
}

/// One slot of the pipeline output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlaylistEntry {
    Resolved(ResolvedItem),
    Failed(FailedItem),
}

impl PlaylistEntry {
    pub fn title(&self) -> &str {
        match self {
            PlaylistEntry::Resolved(item) => &item.title,
            PlaylistEntry::Failed(item) => &item.title,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, PlaylistEntry::Resolved(_))
    }

    pub fn as_resolved(&self) -> Option<&ResolvedItem> {
        match self {
            PlaylistEntry::Resolved(item) => Some(item),
            PlaylistEntry::Failed(_) => None,
        }
    }

    pub fn as_failed(&self) -> Option<&FailedItem> {
        match self {
            PlaylistEntry::Resolved(_) => None,
            PlaylistEntry::Failed(item) => Some(item),
        }
    }
}

impl From<ResolvedItem> for PlaylistEntry {
    fn from(item: ResolvedItem) -> Self {
        PlaylistEntry::Resolved(item)
    }
}

impl From<FailedItem> for PlaylistEntry {
    fn from(item: FailedItem) -> Self {
        PlaylistEntry::Failed(item)
    }
}

/// Ordered pipeline output, one entry per item reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    entries: Vec<PlaylistEntry>,
}

impl Playlist {
    pub fn new(entries: Vec<PlaylistEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PlaylistEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[PlaylistEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlaylistEntry> {
        self.entries.iter()
    }

    pub fn resolved(&self) -> impl Iterator<Item = &ResolvedItem> {
        self.entries.iter().filter_map(PlaylistEntry::as_resolved)
    }

    pub fn failed(&self) -> impl Iterator<Item = &FailedItem> {
        self.entries.iter().filter_map(PlaylistEntry::as_failed)
    }

    /// The resolved subsequence, ready to seed a playback session
    pub fn playable(&self) -> Vec<ResolvedItem> {
        self.resolved().cloned().collect()
    }
}
