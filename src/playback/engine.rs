//! Playback engine seam
//!
//! The session never decodes anything itself. It drives an engine through
//! [`PlaybackEngine`] and reacts to the [`PlaybackEvent`]s the engine emits.

use serde::{Deserialize, Serialize};

use crate::config::defaults::MAX_VOLUME;
use crate::errors::EngineError;

/// Signals emitted by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// The current stream played to its end
    Ended,
    /// Playback was refused, typically unmuted autoplay blocked by policy
    Blocked { reason: String },
}

/// A stream player the session can drive
pub trait PlaybackEngine {
    fn load(&mut self, url: &str) -> Result<(), EngineError>;

    fn play(&mut self) -> Result<(), EngineError>;

    fn pause(&mut self) -> Result<(), EngineError>;

    fn set_muted(&mut self, muted: bool) -> Result<(), EngineError>;

    /// Set the volume, 0 to 100
    fn set_volume(&mut self, volume: u8) -> Result<(), EngineError>;

    fn volume(&self) -> u8;
}

/// One command received by a [`RecordingEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Load(String),
    Play,
    Pause,
    SetMuted(bool),
    SetVolume(u8),
}

/// Headless engine that records every command it receives
///
/// Useful for dry runs and for asserting what a session asked the player to
/// do. `fail_next_play` makes the next `play` call fail once.
#[derive(Debug, Clone)]
pub struct RecordingEngine {
    calls: Vec<EngineCall>,
    volume: u8,
    muted: bool,
    fail_next_play: Option<String>,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            volume: MAX_VOLUME,
            muted: false,
            fail_next_play: None,
        }
    }
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    /// URLs passed to `load`, in order
    pub fn loaded_urls(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                EngineCall::Load(url) => Some(url.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn last_loaded(&self) -> Option<&str> {
        self.loaded_urls().last().copied()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn fail_next_play<S: Into<String>>(&mut self, reason: S) {
        self.fail_next_play = Some(reason.into());
    }
}

impl PlaybackEngine for RecordingEngine {
    fn load(&mut self, url: &str) -> Result<(), EngineError> {
        self.calls.push(EngineCall::Load(url.to_string()));
        Ok(())
    }

    fn play(&mut self) -> Result<(), EngineError> {
        self.calls.push(EngineCall::Play);
        match self.fail_next_play.take() {
            Some(reason) => Err(EngineError::other(reason)),
            None => Ok(()),
        }
    }

    fn pause(&mut self) -> Result<(), EngineError> {
        self.calls.push(EngineCall::Pause);
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) -> Result<(), EngineError> {
        self.calls.push(EngineCall::SetMuted(muted));
        self.muted = muted;
        Ok(())
    }

    fn set_volume(&mut self, volume: u8) -> Result<(), EngineError> {
        let volume = volume.min(MAX_VOLUME);
        self.calls.push(EngineCall::SetVolume(volume));
        self.volume = volume;
        Ok(())
    }

    fn volume(&self) -> u8 {
        self.volume
    }
}
