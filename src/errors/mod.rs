//! Centralized error handling for the resolver
//!
//! Two families of errors live here:
//!
//! - **Fatal errors** (`AppError`): configuration problems and unreadable
//!   credential material. These stop a run before any per-item work starts.
//! - **Recoverable errors**: `ExtractionError` reported by the metadata
//!   extraction service and `SessionError` reported by playback navigation.
//!   Item-level failures never propagate as errors; they are folded into
//!   [`crate::models::ErrorKind`] values inside the resulting playlist.
//!
//! # Usage
//!
//! ```rust
//! use m3u8_resolver::errors::{AppError, AppResult};
//!
//! fn example_function() -> AppResult<String> {
//!     Err(AppError::configuration("concurrency must be at least 1"))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for playback session Results
pub type SessionResult<T> = Result<T, SessionError>;
