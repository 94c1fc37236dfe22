//! Reference ingestion and resolution
//!
//! - [`PlaylistExpander`] lists collections
//! - [`ItemResolver`] resolves one item to a stream URL
//! - [`ResolutionPipeline`] drives both over a whole input list

pub mod item_resolver;
pub mod pipeline;
pub mod playlist_expander;
pub mod progress;
pub mod report;

pub use item_resolver::ItemResolver;
pub use pipeline::{CancelHandle, PipelineOptions, ResolutionPipeline};
pub use playlist_expander::{ExpansionFailure, PlaylistExpander};
pub use progress::{PipelineProgress, ProgressCallback, ProgressTracker};
pub use report::{PipelineReport, PipelineSummary};
