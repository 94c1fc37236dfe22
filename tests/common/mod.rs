//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use m3u8_resolver::errors::ExtractionError;
use m3u8_resolver::models::StreamVariant;
use m3u8_resolver::sources::{
    CollectionEntry, CollectionListing, Credentials, ExtractionResult, ItemMetadata, LookupMode,
    MetadataExtractor,
};

/// Canned answer for one URL
#[derive(Clone)]
pub struct Script {
    pub delay: Duration,
    pub result: Result<ExtractionResult, ExtractionError>,
}

/// When one lookup started and finished
#[derive(Debug, Clone, Copy)]
pub struct LookupSpan {
    pub started: Instant,
    pub finished: Instant,
}

/// In-memory extractor driven by per-URL scripts
///
/// Tracks how many lookups are in flight, the peak reached and when each
/// lookup ran.
#[derive(Default)]
pub struct ScriptedExtractor {
    scripts: HashMap<String, Script>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
    spans: Mutex<HashMap<String, LookupSpan>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, url: &str, delay: Duration, result: Result<ExtractionResult, ExtractionError>) -> Self {
        self.scripts.insert(url.to_string(), Script { delay, result });
        self
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Timing of the last lookup of `url`
    pub fn span(&self, url: &str) -> Option<LookupSpan> {
        self.spans.lock().unwrap().get(url).copied()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl MetadataExtractor for ScriptedExtractor {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn lookup(
        &self,
        url: &str,
        _mode: LookupMode,
        _credentials: Option<&Credentials>,
        _timeout: Duration,
    ) -> Result<ExtractionResult, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let script = self.scripts.get(url).cloned();
        let result = match script {
            Some(script) => {
                tokio::time::sleep(script.delay).await;
                script.result
            }
            None => Err(ExtractionError::NotFound {
                url: url.to_string(),
            }),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.spans.lock().unwrap().insert(
            url.to_string(),
            LookupSpan {
                started,
                finished: Instant::now(),
            },
        );
        result
    }
}

pub fn hls_item(title: &str, stream_url: &str, height: u32) -> ExtractionResult {
    ExtractionResult::Single(ItemMetadata {
        title: Some(title.to_string()),
        variants: vec![StreamVariant {
            protocol_tag: "m3u8_native".to_string(),
            container_ext: "mp4".to_string(),
            format_note: String::new(),
            url: Some(stream_url.to_string()),
            height: Some(height),
            total_bitrate: None,
        }],
    })
}

pub fn collection(title: &str, entries: &[(&str, &str)]) -> ExtractionResult {
    ExtractionResult::Collection(CollectionListing {
        title: Some(title.to_string()),
        entries: entries
            .iter()
            .map(|(title, url)| CollectionEntry {
                title: Some(title.to_string()),
                url: Some(url.to_string()),
                id: None,
            })
            .collect(),
    })
}

pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}
