//! Cookie credentials for sources that require a signed-in session
//!
//! Credentials are Netscape-format cookie files, as exported by browser
//! extensions and accepted by the extractor's `--cookies` flag. They are
//! loaded and validated once before a pipeline run and then shared
//! read-only by every lookup.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::{AppError, AppResult};

const NETSCAPE_HEADERS: &[&str] = &["# Netscape HTTP Cookie File", "# HTTP Cookie File"];
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";
const COOKIE_FIELDS: usize = 7;

/// Where credential material comes from
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// A cookie file already on disk
    File(PathBuf),
    /// Uploaded cookie file contents
    Bytes(Vec<u8>),
}

/// A validated cookie file
///
/// When built from bytes the contents live in a temporary file that is
/// removed when the handle is dropped.
#[derive(Debug)]
pub struct Credentials {
    path: PathBuf,
    cookie_count: usize,
    _temp_file: Option<NamedTempFile>,
}

impl Credentials {
    pub fn load(source: &CredentialSource) -> AppResult<Self> {
        match source {
            CredentialSource::File(path) => Self::from_file(path),
            CredentialSource::Bytes(bytes) => Self::from_bytes(bytes),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let shown = path.display().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|e| AppError::credential(&shown, format!("unreadable: {e}")))?;
        let cookie_count =
            validate_cookie_text(&contents).map_err(|msg| AppError::credential(&shown, msg))?;

        debug!("Loaded {} cookies from {}", cookie_count, shown);
        Ok(Self {
            path: path.to_path_buf(),
            cookie_count,
            _temp_file: None,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> AppResult<Self> {
        let contents = std::str::from_utf8(bytes)
            .map_err(|e| AppError::credential("<uploaded>", format!("not valid UTF-8: {e}")))?;
        let cookie_count = validate_cookie_text(contents)
            .map_err(|msg| AppError::credential("<uploaded>", msg))?;

        let mut temp_file = NamedTempFile::new()?;
        temp_file.write_all(bytes)?;
        temp_file.flush()?;

        debug!(
            "Staged {} uploaded cookies at {}",
            cookie_count,
            temp_file.path().display()
        );
        Ok(Self {
            path: temp_file.path().to_path_buf(),
            cookie_count,
            _temp_file: Some(temp_file),
        })
    }

    /// Path handed to the extractor
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cookie_count(&self) -> usize {
        self.cookie_count
    }
}

/// Check that text looks like a Netscape cookie file and count its cookies
fn validate_cookie_text(contents: &str) -> Result<usize, String> {
    let mut has_header = false;
    let mut cookies = 0;

    for line in contents.lines() {
        let trimmed = line.trim_end_matches('\r');
        if trimmed.trim().is_empty() {
            continue;
        }

        if NETSCAPE_HEADERS.iter().any(|h| trimmed.starts_with(h)) {
            has_header = true;
            continue;
        }

        let row = match trimmed.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => rest,
            None if trimmed.starts_with('#') => continue,
            None => trimmed,
        };

        if row.split('\t').count() == COOKIE_FIELDS {
            cookies += 1;
        }
    }

    if !has_header && cookies == 0 {
        return Err("not a Netscape-format cookie file".to_string());
    }

    Ok(cookies)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Netscape HTTP Cookie File\n\
        # This is a generated file! Do not edit.\n\
        \n\
        .youtube.com\tTRUE\t/\tTRUE\t1893456000\tPREF\tf6=40000000\n\
        #HttpOnly_.youtube.com\tTRUE\t/\tTRUE\t1893456000\tSID\tabc\n";

    #[test]
    fn test_validate_counts_cookie_rows() {
        assert_eq!(validate_cookie_text(SAMPLE), Ok(2));
    }

    #[test]
    fn test_validate_header_only_is_accepted() {
        assert_eq!(validate_cookie_text("# HTTP Cookie File\n"), Ok(0));
    }

    #[test]
    fn test_validate_rejects_other_text() {
        assert!(validate_cookie_text("{\"cookies\": []}").is_err());
        assert!(validate_cookie_text("").is_err());
    }

    #[test]
    fn test_from_bytes_stages_temp_file() {
        let credentials = Credentials::from_bytes(SAMPLE.as_bytes()).unwrap();
        let staged = credentials.path().to_path_buf();
        assert!(staged.exists());
        assert_eq!(credentials.cookie_count(), 2);
        assert_eq!(std::fs::read_to_string(&staged).unwrap(), SAMPLE);

        drop(credentials);
        assert!(!staged.exists());
    }

    #[test]
    fn test_from_file_missing_is_credential_error() {
        let err = Credentials::from_file("/definitely/not/here/cookies.txt").unwrap_err();
        assert!(matches!(err, AppError::Credential { .. }));
    }

    #[test]
    fn test_from_file_keeps_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let credentials = Credentials::load(&CredentialSource::File(file.path().to_path_buf())).unwrap();
        assert_eq!(credentials.path(), file.path());
        assert_eq!(credentials.cookie_count(), 2);
    }
}
