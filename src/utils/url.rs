//! URL utilities for consistent URL handling
//!
//! This module provides utilities for URL classification, validation, and
//! normalization that are used throughout the resolver.

use url::Url;

/// Hosts whose ID-only playlist entries expand to a watch page
const YOUTUBE_HOSTS: &[&str] = &["youtube.com", "youtu.be"];

/// Path prefixes that denote a channel or other multi-item page
const COLLECTION_PATH_PREFIXES: &[&str] = &["/playlist", "/channel/", "/c/", "/user/", "/@"];

/// URL utilities for consistent URL handling
pub struct UrlUtils;

impl UrlUtils {
    /// Normalize URL scheme by ensuring it has a proper HTTP/HTTPS prefix
    ///
    /// Users often paste links without a scheme; those default to HTTPS.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use m3u8_resolver::utils::url::UrlUtils;
    ///
    /// assert_eq!(UrlUtils::normalize_scheme("youtu.be/abc"), "https://youtu.be/abc");
    /// assert_eq!(UrlUtils::normalize_scheme("http://example.com"), "http://example.com");
    /// assert_eq!(UrlUtils::normalize_scheme("HTTPS://youtu.be/abc"), "https://youtu.be/abc");
    /// ```
    pub fn normalize_scheme(url: &str) -> String {
        let trimmed = url.trim();

        for scheme in ["http://", "https://"] {
            let prefix = trimmed.get(..scheme.len());
            if prefix.is_some_and(|p| p.eq_ignore_ascii_case(scheme)) {
                return format!("{scheme}{}", &trimmed[scheme.len()..]);
            }
        }

        format!("https://{trimmed}")
    }

    /// Join a base URL with a path segment
    pub fn join(base: &str, path: &str) -> Result<String, url::ParseError> {
        let base_url = Url::parse(base)?;
        let joined = base_url.join(path)?;
        Ok(joined.to_string())
    }

    /// Extract the host from a URL, lowercased
    pub fn extract_domain(url: &str) -> Option<String> {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
    }

    /// Check a URL against a host allow-list
    ///
    /// A host matches an entry when it is equal to it or is a subdomain of
    /// it. An empty allow-list accepts every parseable URL.
    pub fn host_allowed(url: &str, allowed_hosts: &[String]) -> bool {
        let Some(host) = Self::extract_domain(url) else {
            return false;
        };

        if allowed_hosts.is_empty() {
            return true;
        }

        allowed_hosts.iter().any(|allowed| {
            let allowed = allowed.trim().to_ascii_lowercase();
            host == allowed || host.ends_with(&format!(".{allowed}"))
        })
    }

    /// Heuristic: does this URL point at a playlist, channel or other collection?
    ///
    /// A `list` query parameter or a collection-style path marks a collection.
    pub fn looks_like_collection(url: &str) -> bool {
        let Ok(parsed) = Url::parse(url.trim()) else {
            return false;
        };

        if parsed.query_pairs().any(|(key, value)| key == "list" && !value.is_empty()) {
            return true;
        }

        let path = parsed.path();
        COLLECTION_PATH_PREFIXES
            .iter()
            .any(|prefix| path.starts_with(prefix))
    }

    /// Turn a flat-listing entry into a fully-qualified item URL
    ///
    /// Entries may carry an absolute URL, a relative path, or only an ID.
    /// Relative paths are joined against the collection URL. Bare IDs become
    /// a watch URL for YouTube collections and are joined otherwise.
    pub fn normalize_entry_url(
        collection_url: &str,
        entry_url: Option<&str>,
        entry_id: Option<&str>,
    ) -> Option<String> {
        let raw = entry_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .or_else(|| entry_id.map(str::trim).filter(|id| !id.is_empty()))?;

        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Some(raw.to_string());
        }

        if raw.starts_with('/') || raw.contains('?') || raw.contains('/') {
            return Self::join(collection_url, raw).ok();
        }

        if Self::is_youtube_family(collection_url) {
            return Some(format!("https://www.youtube.com/watch?v={raw}"));
        }

        Self::join(collection_url, raw).ok()
    }

    fn is_youtube_family(url: &str) -> bool {
        let hosts: Vec<String> = YOUTUBE_HOSTS.iter().map(|h| h.to_string()).collect();
        Self::host_allowed(url, &hosts)
    }
}
