//! Metadata sources
//!
//! This module holds the abstraction over the metadata extraction service and
//! its implementations.
//!
//! # Architecture
//!
//! - [`MetadataExtractor`]: the async trait every lookup goes through
//! - [`YtDlpExtractor`]: the production implementation, a yt-dlp subprocess
//! - [`Credentials`]: optional cookie material shared by all lookups of a run
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use m3u8_resolver::sources::{LookupMode, MetadataExtractor, YtDlpExtractor};
//!
//! async fn example() {
//!     let extractor = YtDlpExtractor::new(None);
//!     let result = extractor
//!         .lookup(
//!             "https://www.youtube.com/watch?v=abc",
//!             LookupMode::Full,
//!             None,
//!             Duration::from_secs(30),
//!         )
//!         .await;
//!     println!("{:?}", result.map(|r| r.title().map(str::to_string)));
//! }
//! ```

pub mod credentials;
pub mod traits;
pub mod ytdlp;

pub use credentials::{CredentialSource, Credentials};
pub use traits::{
    CollectionEntry, CollectionListing, ExtractionResult, ItemMetadata, LookupMode,
    MetadataExtractor,
};
pub use ytdlp::{YtDlpExtractor, parse_info_json};
