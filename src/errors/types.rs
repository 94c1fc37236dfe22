//! Error type definitions for the resolver
//!
//! This module defines all error types used throughout the crate. It uses
//! `thiserror` to provide the error trait implementations and proper
//! error chaining.

use thiserror::Error;

/// Top-level application error type
///
/// Only setup-level failures are represented here. Anything that can go
/// wrong for a single reference or item is recorded in the playlist instead.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Credential material could not be read or is malformed
    #[error("Credential error: {path} - {message}")]
    Credential { path: String, message: String },

    /// Filesystem errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file parse errors
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Config file serialization errors
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Playback session errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Failures reported by the metadata extraction service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The source requires a signed-in session (cookies)
    #[error("Authentication required: {message}")]
    AuthRequired { message: String },

    /// The source does not exist or is unavailable
    #[error("Not found: {url}")]
    NotFound { url: String },

    /// The lookup did not finish in time
    #[error("Timed out after {seconds}s: {url}")]
    Timeout { url: String, seconds: u64 },

    /// Any other service failure
    #[error("Extraction failed: {message}")]
    Unknown { message: String },
}

/// Errors raised by the playback engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine could not load the given URL
    #[error("Failed to load {url}: {message}")]
    Load { url: String, message: String },

    /// Any other engine failure
    #[error("Playback engine error: {message}")]
    Other { message: String },
}

/// Playback session errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Requested index is outside the item list
    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The engine rejected a command
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a credential error
    pub fn credential<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::Credential {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl ExtractionError {
    /// Create an authentication required error
    pub fn auth_required<S: Into<String>>(message: S) -> Self {
        Self::AuthRequired {
            message: message.into(),
        }
    }

    /// Create an unknown extraction error
    pub fn unknown<S: Into<String>>(message: S) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }
}

impl EngineError {
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}
