//! Configuration default values
//!
//! This module contains all the default values for configuration options,
//! making them easily changeable in one central location.

// Extractor defaults
pub const DEFAULT_EXTRACTOR_COMMAND: &str = "yt-dlp";
pub const DEFAULT_EXTRACTOR_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
];

// Pipeline defaults
pub const DEFAULT_CONCURRENCY: usize = 4;
pub const DEFAULT_BATCH_SIZE: usize = 20;

// Playback defaults
pub const DEFAULT_AUTOPLAY: bool = true;
pub const DEFAULT_VOLUME: u8 = 100;
pub const MAX_VOLUME: u8 = 100;
