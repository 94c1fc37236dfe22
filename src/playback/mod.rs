//! Client-side playback over a resolved playlist

pub mod engine;
pub mod session;

pub use engine::{EngineCall, PlaybackEngine, PlaybackEvent, RecordingEngine};
pub use session::{Neighbors, PlaybackSession, PlaybackStatus, SessionCommand};
