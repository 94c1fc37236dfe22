pub mod config;
pub mod errors;
pub mod export;
pub mod ingestor;
pub mod models;
pub mod playback;
pub mod sources;
pub mod streaming;
pub mod utils;
