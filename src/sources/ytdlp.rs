//! yt-dlp backed metadata extraction
//!
//! This module runs the `yt-dlp` command line tool to look up a source URL
//! and decodes its `--dump-single-json` output into an [`ExtractionResult`].

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::ExtractorConfig;
use crate::errors::ExtractionError;
use crate::models::StreamVariant;
use crate::sources::credentials::Credentials;
use crate::sources::traits::{
    CollectionEntry, CollectionListing, ExtractionResult, ItemMetadata, LookupMode,
    MetadataExtractor,
};

const AUTH_MARKERS: &[&str] = &[
    "sign in",
    "login required",
    "log in",
    "use --cookies",
    "cookies",
    "private video",
    "members-only",
    "confirm your age",
];

const NOT_FOUND_MARKERS: &[&str] = &[
    "video unavailable",
    "http error 404",
    "does not exist",
    "not found",
    "has been removed",
];

const TIMEOUT_MARKERS: &[&str] = &["timed out", "timeout"];

/// Subset of the yt-dlp info JSON the resolver reads
#[derive(Debug, Default, Deserialize)]
struct RawInfo {
    #[serde(rename = "_type")]
    kind: Option<String>,
    title: Option<String>,
    entries: Option<Vec<Option<RawEntry>>>,
    formats: Option<Vec<RawFormat>>,
    #[serde(flatten)]
    top_level: RawFormat,
}

#[derive(Debug, Default, Deserialize)]
struct RawEntry {
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawFormat {
    url: Option<String>,
    protocol: Option<String>,
    ext: Option<String>,
    format_note: Option<String>,
    height: Option<f64>,
    tbr: Option<f64>,
}

impl From<RawFormat> for StreamVariant {
    fn from(raw: RawFormat) -> Self {
        StreamVariant {
            protocol_tag: raw.protocol.unwrap_or_default(),
            container_ext: raw.ext.unwrap_or_default(),
            format_note: raw.format_note.unwrap_or_default(),
            url: raw.url,
            height: raw.height.filter(|h| *h >= 0.0).map(|h| h as u32),
            total_bitrate: raw.tbr,
        }
    }
}

/// Metadata extractor that shells out to yt-dlp
pub struct YtDlpExtractor {
    command: String,
    extra_args: Vec<String>,
}

impl YtDlpExtractor {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.unwrap_or_else(|| "yt-dlp".to_string()),
            extra_args: Vec::new(),
        }
    }

    pub fn from_config(config: &ExtractorConfig) -> Self {
        Self {
            command: config.command.clone(),
            extra_args: config.extra_args.clone(),
        }
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    fn build_args(
        &self,
        url: &str,
        mode: LookupMode,
        credentials: Option<&Credentials>,
        timeout: Duration,
    ) -> Vec<String> {
        let mut args = vec![
            "--dump-single-json".to_string(),
            "--skip-download".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            timeout.as_secs().max(1).to_string(),
        ];

        if mode == LookupMode::Flat {
            args.push("--flat-playlist".to_string());
        }

        if let Some(credentials) = credentials {
            args.push("--cookies".to_string());
            args.push(credentials.path().to_string_lossy().to_string());
        }

        args.extend(self.extra_args.iter().cloned());
        // End of options; URLs starting with '-' must not be read as flags
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl MetadataExtractor for YtDlpExtractor {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn lookup(
        &self,
        url: &str,
        mode: LookupMode,
        credentials: Option<&Credentials>,
        timeout: Duration,
    ) -> Result<ExtractionResult, ExtractionError> {
        debug!("Looking up {} ({:?} mode)", url, mode);

        let mut cmd = Command::new(&self.command);
        cmd.args(self.build_args(url, mode, credentials, timeout));
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| ExtractionError::Timeout {
                url: url.to_string(),
                seconds: timeout.as_secs(),
            })?
            .map_err(|e| {
                ExtractionError::unknown(format!("Failed to execute {}: {}", self.command, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let error = classify_failure(url, &stderr, timeout);
            warn!("{} failed for {}: {}", self.command, url, error);
            return Err(error);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_info_json(&stdout)
    }
}

/// Decode yt-dlp info JSON into a tagged result
///
/// Anything carrying `entries` (or typed as a playlist) is a collection;
/// everything else is a single item whose variants come from `formats`, or
/// from the top-level fields when the extractor reports one format only.
pub fn parse_info_json(json: &str) -> Result<ExtractionResult, ExtractionError> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Err(ExtractionError::unknown("extractor produced no output"));
    }

    let info: RawInfo = serde_json::from_str(trimmed)
        .map_err(|e| ExtractionError::unknown(format!("Failed to parse extractor output: {e}")))?;

    let is_collection = info.entries.is_some()
        || matches!(info.kind.as_deref(), Some("playlist") | Some("multi_video"));

    if is_collection {
        let entries = info
            .entries
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(|entry| CollectionEntry {
                title: entry.title.filter(|t| !t.is_empty()),
                url: entry.webpage_url.or(entry.url),
                id: entry.id,
            })
            .collect();

        return Ok(ExtractionResult::Collection(CollectionListing {
            title: info.title,
            entries,
        }));
    }

    let variants = match info.formats {
        Some(formats) if !formats.is_empty() => {
            formats.into_iter().map(StreamVariant::from).collect()
        }
        _ if info.top_level.url.is_some() => vec![StreamVariant::from(info.top_level)],
        _ => Vec::new(),
    };

    Ok(ExtractionResult::Single(ItemMetadata {
        title: info.title,
        variants,
    }))
}

/// Map extractor stderr onto the service failure vocabulary
fn classify_failure(url: &str, stderr: &str, timeout: Duration) -> ExtractionError {
    let lowered = stderr.to_lowercase();
    let message = last_error_line(stderr);

    if AUTH_MARKERS.iter().any(|m| lowered.contains(m)) {
        ExtractionError::auth_required(message)
    } else if NOT_FOUND_MARKERS.iter().any(|m| lowered.contains(m)) {
        ExtractionError::NotFound {
            url: url.to_string(),
        }
    } else if TIMEOUT_MARKERS.iter().any(|m| lowered.contains(m)) {
        ExtractionError::Timeout {
            url: url.to_string(),
            seconds: timeout.as_secs(),
        }
    } else {
        ExtractionError::unknown(message)
    }
}

fn last_error_line(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| lines.last())
        .map(|l| l.trim_start_matches("ERROR:").trim().to_string())
        .unwrap_or_else(|| "extractor exited with an error".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_video() {
        let json = serde_json::json!({
            "id": "abc",
            "title": "Evening News",
            "formats": [
                {"url": "https://cdn/240.m3u8", "protocol": "m3u8_native", "ext": "mp4", "height": 240, "tbr": 300.5},
                {"url": "https://cdn/720.m3u8", "protocol": "m3u8_native", "ext": "mp4", "height": 720, "tbr": 2500.0},
                {"url": "https://cdn/audio.webm", "protocol": "https", "ext": "webm", "format_note": "audio only", "height": null}
            ]
        })
        .to_string();

        let result = parse_info_json(&json).unwrap();
        let ExtractionResult::Single(item) = result else {
            panic!("expected a single item");
        };
        assert_eq!(item.title.as_deref(), Some("Evening News"));
        assert_eq!(item.variants.len(), 3);
        assert_eq!(item.variants[1].height, Some(720));
        assert_eq!(item.variants[1].protocol_tag, "m3u8_native");
        assert_eq!(item.variants[2].height, None);
        assert_eq!(item.variants[2].format_note, "audio only");
    }

    #[test]
    fn test_parse_single_format_without_formats_list() {
        let json = r#"{"title": "Clip", "url": "https://cdn/clip.m3u8", "protocol": "m3u8", "ext": "mp4"}"#;
        let ExtractionResult::Single(item) = parse_info_json(json).unwrap() else {
            panic!("expected a single item");
        };
        assert_eq!(item.variants.len(), 1);
        assert_eq!(item.variants[0].url.as_deref(), Some("https://cdn/clip.m3u8"));
    }

    #[test]
    fn test_parse_flat_playlist() {
        let json = serde_json::json!({
            "_type": "playlist",
            "title": "Morning Shows",
            "entries": [
                {"_type": "url", "id": "v1", "title": "Part 1", "url": "https://www.youtube.com/watch?v=v1"},
                null,
                {"_type": "url", "id": "v2", "title": "", "url": null}
            ]
        })
        .to_string();

        let ExtractionResult::Collection(listing) = parse_info_json(&json).unwrap() else {
            panic!("expected a collection");
        };
        assert_eq!(listing.title.as_deref(), Some("Morning Shows"));
        assert_eq!(listing.entries.len(), 2);
        assert_eq!(listing.entries[0].title.as_deref(), Some("Part 1"));
        assert_eq!(listing.entries[1].title, None);
        assert_eq!(listing.entries[1].id.as_deref(), Some("v2"));
    }

    #[test]
    fn test_parse_empty_playlist_is_collection() {
        let json = r#"{"_type": "playlist", "title": "Nothing here", "entries": []}"#;
        let ExtractionResult::Collection(listing) = parse_info_json(json).unwrap() else {
            panic!("expected a collection");
        };
        assert!(listing.entries.is_empty());
    }

    #[test]
    fn test_parse_garbage_is_unknown() {
        assert!(matches!(
            parse_info_json("not json"),
            Err(ExtractionError::Unknown { .. })
        ));
        assert!(matches!(
            parse_info_json("   "),
            Err(ExtractionError::Unknown { .. })
        ));
    }

    #[test]
    fn test_classify_failure() {
        let timeout = Duration::from_secs(30);
        let url = "https://www.youtube.com/watch?v=x";

        let auth = classify_failure(
            url,
            "ERROR: [youtube] x: Sign in to confirm you're not a bot. Use --cookies-from-browser or --cookies",
            timeout,
        );
        assert!(matches!(auth, ExtractionError::AuthRequired { .. }));

        let missing = classify_failure(url, "ERROR: [youtube] x: Video unavailable", timeout);
        assert_eq!(missing, ExtractionError::NotFound { url: url.to_string() });

        let slow = classify_failure(url, "ERROR: Read timed out.", timeout);
        assert!(matches!(slow, ExtractionError::Timeout { seconds: 30, .. }));

        let other = classify_failure(url, "WARNING: foo\nERROR: Unsupported URL: x\n", timeout);
        assert_eq!(other, ExtractionError::unknown("Unsupported URL: x"));
    }

    #[test]
    fn test_build_args() {
        let extractor = YtDlpExtractor::new(None).with_extra_args(vec!["--no-check-certificates".to_string()]);
        let args = extractor.build_args(
            "https://youtu.be/x",
            LookupMode::Flat,
            None,
            Duration::from_secs(15),
        );

        assert!(args.contains(&"--flat-playlist".to_string()));
        assert!(!args.contains(&"--cookies".to_string()));
        assert!(args.contains(&"--no-check-certificates".to_string()));
        let timeout_pos = args.iter().position(|a| a == "--socket-timeout").unwrap();
        assert_eq!(args[timeout_pos + 1], "15");
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/x"));
    }
}
