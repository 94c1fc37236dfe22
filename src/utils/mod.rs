//! Utility modules for the resolver
//!
//! This module contains reusable utilities that can be used
//! across different parts of the system.

pub mod url;

pub use url::UrlUtils;
