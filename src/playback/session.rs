//! Playback session state machine
//!
//! A [`PlaybackSession`] owns the resolved item list, the current position, a
//! manual play queue and the loop/shuffle modes. It is a plain value owned by
//! one caller; every mutation goes through its methods (or [`SessionCommand`]
//! and [`PlaybackEvent`] values) and is synchronous. The only asynchronous
//! boundary is the engine emitting events.
//!
//! # End of item
//!
//! When the engine reports `Ended`, the queue has priority. Otherwise the
//! session advances like `next`. Without loop or shuffle, wrapping back to
//! the first item means the list has been played once, so the session stops
//! in [`PlaybackStatus::Finished`]. This includes a single-item list. Further
//! `Ended` events while finished do nothing, and `play` starts the list over
//! from the first item.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PlaybackConfig;
use crate::config::defaults::MAX_VOLUME;
use crate::errors::{SessionError, SessionResult};
use crate::models::{Playlist, ResolvedItem};
use crate::playback::engine::{PlaybackEngine, PlaybackEvent};

/// Where the session is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlaybackStatus {
    /// No playable items
    Idle,
    /// Items present, nothing loaded yet
    Ready,
    Playing,
    Paused,
    /// The engine refused to play; an explicit action retries unmuted
    Blocked { reason: String },
    /// The list was played through once
    Finished,
}

/// User-initiated operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "value", rename_all = "snake_case")]
pub enum SessionCommand {
    Select(usize),
    Next,
    Prev,
    /// Queue the item at this index of the list
    Enqueue(usize),
    Remove(usize),
    Play,
    Pause,
    SetLoop(bool),
    SetShuffle(bool),
    SetVolume(u8),
}

/// Titles around the current item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbors {
    pub previous: String,
    pub current: String,
    pub next: String,
}

/// Navigation, queue and mode state over a list of resolved items
pub struct PlaybackSession<E: PlaybackEngine> {
    id: Uuid,
    engine: E,
    items: Vec<ResolvedItem>,
    current: Option<usize>,
    queue: VecDeque<ResolvedItem>,
    loop_enabled: bool,
    shuffle: bool,
    status: PlaybackStatus,
    now_playing: Option<ResolvedItem>,
    rng: StdRng,
}

impl<E: PlaybackEngine> PlaybackSession<E> {
    /// Create an idle session
    pub fn new(engine: E) -> Self {
        Self::with_rng(engine, StdRng::from_os_rng())
    }

    /// Create an idle session whose shuffle order is reproducible
    pub fn with_seed(engine: E, seed: u64) -> Self {
        Self::with_rng(engine, StdRng::seed_from_u64(seed))
    }

    fn with_rng(engine: E, rng: StdRng) -> Self {
        Self {
            id: Uuid::new_v4(),
            engine,
            items: Vec::new(),
            current: None,
            queue: VecDeque::new(),
            loop_enabled: false,
            shuffle: false,
            status: PlaybackStatus::Idle,
            now_playing: None,
            rng,
        }
    }

    /// Replace all state with a fresh item list
    ///
    /// Does not start playback. An empty list leaves the session idle.
    pub fn initialize(&mut self, items: Vec<ResolvedItem>) {
        self.id = Uuid::new_v4();
        self.current = if items.is_empty() { None } else { Some(0) };
        self.status = if items.is_empty() {
            PlaybackStatus::Idle
        } else {
            PlaybackStatus::Ready
        };
        self.items = items;
        self.queue.clear();
        self.loop_enabled = false;
        self.shuffle = false;
        self.now_playing = None;

        info!("Session {} initialized with {} items", self.id, self.items.len());
    }

    /// Initialize from the resolved subset of a playlist
    pub fn load_playlist(&mut self, playlist: &Playlist) {
        self.initialize(playlist.playable());
    }

    /// Apply volume and autoplay preferences
    pub fn apply_config(&mut self, config: &PlaybackConfig) -> SessionResult<()> {
        self.set_volume(config.volume)?;
        if config.autoplay && !self.is_idle() {
            self.play()?;
        }
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_idle(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[ResolvedItem] {
        &self.items
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// The item last handed to the engine, or the current list item
    pub fn current_item(&self) -> Option<&ResolvedItem> {
        self.now_playing
            .as_ref()
            .or_else(|| self.current.and_then(|i| self.items.get(i)))
    }

    pub fn queue(&self) -> impl Iterator<Item = &ResolvedItem> {
        self.queue.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn loop_enabled(&self) -> bool {
        self.loop_enabled
    }

    pub fn shuffle_enabled(&self) -> bool {
        self.shuffle
    }

    pub fn status(&self) -> &PlaybackStatus {
        &self.status
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Jump to `index` and play it
    pub fn select(&mut self, index: usize) -> SessionResult<()> {
        if self.is_idle() {
            return Ok(());
        }
        let Some(item) = self.items.get(index).cloned() else {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        };

        self.current = Some(index);
        self.load_and_play(item)
    }

    pub fn next(&mut self) -> SessionResult<()> {
        match self.step(1) {
            Some(index) => self.select(index),
            None => Ok(()),
        }
    }

    pub fn prev(&mut self) -> SessionResult<()> {
        match self.step(-1) {
            Some(index) => self.select(index),
            None => Ok(()),
        }
    }

    /// Append to the play queue unless an item with the same stream URL is
    /// already queued. Returns whether the item was added.
    pub fn enqueue(&mut self, item: ResolvedItem) -> bool {
        if self.is_idle() {
            return false;
        }
        if self.queue.iter().any(|q| q.stream_url == item.stream_url) {
            debug!("{} already queued", item.title);
            return false;
        }

        debug!("Queued {}", item.title);
        self.queue.push_back(item);
        true
    }

    /// Queue the list item at `index`
    pub fn enqueue_index(&mut self, index: usize) -> SessionResult<bool> {
        if self.is_idle() {
            return Ok(false);
        }
        let item = self
            .items
            .get(index)
            .cloned()
            .ok_or(SessionError::IndexOutOfRange {
                index,
                len: self.items.len(),
            })?;
        Ok(self.enqueue(item))
    }

    /// Delete the list item at `index`
    ///
    /// Removing the current item selects its successor (or the new last item)
    /// and reloads. Removing the last item makes the session idle. Queue
    /// entries are left alone.
    pub fn remove(&mut self, index: usize) -> SessionResult<()> {
        if self.is_idle() {
            return Ok(());
        }
        if index >= self.items.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }

        let removed = self.items.remove(index);
        debug!("Removed {} at {}", removed.title, index);

        if self.items.is_empty() {
            self.reset_to_idle();
            return Ok(());
        }

        match self.current {
            Some(current) if current == index => {
                let replacement = index.min(self.items.len() - 1);
                self.select(replacement)
            }
            Some(current) if index < current => {
                self.current = Some(current - 1);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// User-initiated play, always unmuted
    pub fn play(&mut self) -> SessionResult<()> {
        if self.is_idle() {
            return Ok(());
        }

        match self.status {
            PlaybackStatus::Paused | PlaybackStatus::Blocked { .. } if self.now_playing.is_some() => {
                self.engine.set_muted(false)?;
                self.start_engine()
            }
            PlaybackStatus::Playing => Ok(()),
            PlaybackStatus::Finished => self.select(0),
            _ => {
                let index = self.current.unwrap_or(0);
                self.select(index)
            }
        }
    }

    pub fn pause(&mut self) -> SessionResult<()> {
        if self.status == PlaybackStatus::Playing {
            self.engine.pause()?;
            self.status = PlaybackStatus::Paused;
        }
        Ok(())
    }

    pub fn set_loop(&mut self, enabled: bool) {
        self.loop_enabled = enabled;
    }

    pub fn set_shuffle(&mut self, enabled: bool) {
        self.shuffle = enabled;
    }

    /// Set the engine volume, clamped to 0..=100
    pub fn set_volume(&mut self, volume: u8) -> SessionResult<()> {
        self.engine.set_volume(volume.min(MAX_VOLUME))?;
        Ok(())
    }

    pub fn volume(&self) -> u8 {
        self.engine.volume()
    }

    pub fn dispatch(&mut self, command: SessionCommand) -> SessionResult<()> {
        match command {
            SessionCommand::Select(index) => self.select(index),
            SessionCommand::Next => self.next(),
            SessionCommand::Prev => self.prev(),
            SessionCommand::Enqueue(index) => self.enqueue_index(index).map(|_| ()),
            SessionCommand::Remove(index) => self.remove(index),
            SessionCommand::Play => self.play(),
            SessionCommand::Pause => self.pause(),
            SessionCommand::SetLoop(enabled) => {
                self.set_loop(enabled);
                Ok(())
            }
            SessionCommand::SetShuffle(enabled) => {
                self.set_shuffle(enabled);
                Ok(())
            }
            SessionCommand::SetVolume(volume) => self.set_volume(volume),
        }
    }

    pub fn handle_event(&mut self, event: PlaybackEvent) -> SessionResult<()> {
        match event {
            PlaybackEvent::Ended => self.on_ended(),
            PlaybackEvent::Blocked { reason } => {
                if !self.is_idle() {
                    warn!("Playback blocked: {}", reason);
                    self.status = PlaybackStatus::Blocked { reason };
                }
                Ok(())
            }
        }
    }

    /// Previous, current and next titles in list order
    pub fn neighbors(&self) -> Option<Neighbors> {
        let current = self.current?;
        let len = self.items.len();
        let title = |i: usize| self.items.get(i).map(|item| item.title.clone());

        Some(Neighbors {
            previous: title((current + len - 1) % len)?,
            current: self.current_item()?.title.clone(),
            next: title((current + 1) % len)?,
        })
    }

    fn on_ended(&mut self) -> SessionResult<()> {
        if self.is_idle() || self.status == PlaybackStatus::Finished {
            return Ok(());
        }

        if let Some(queued) = self.queue.pop_front() {
            return match self
                .items
                .iter()
                .position(|item| item.stream_url == queued.stream_url)
            {
                Some(index) => self.select(index),
                None => self.load_and_play(queued),
            };
        }

        let Some(next) = self.step(1) else {
            return Ok(());
        };

        if !self.shuffle && !self.loop_enabled && next == 0 {
            info!("Session {} finished its list", self.id);
            self.status = PlaybackStatus::Finished;
            self.now_playing = None;
            return Ok(());
        }

        self.select(next)
    }

    /// Index `delta` steps away from current, or a random index when shuffling
    fn step(&mut self, delta: isize) -> Option<usize> {
        let len = self.items.len();
        let current = self.current?;
        if len == 0 {
            return None;
        }

        if self.shuffle {
            return Some(self.rng.random_range(0..len));
        }

        let len = len as isize;
        Some((current as isize + delta).rem_euclid(len) as usize)
    }

    fn load_and_play(&mut self, item: ResolvedItem) -> SessionResult<()> {
        debug!("Loading {} ({})", item.title, item.stream_url);
        self.now_playing = Some(item.clone());

        let loaded = self
            .engine
            .set_muted(false)
            .and_then(|_| self.engine.load(&item.stream_url));
        if let Err(e) = loaded {
            warn!("Engine could not load {}: {}", item.stream_url, e);
            self.status = PlaybackStatus::Blocked {
                reason: e.to_string(),
            };
            return Err(e.into());
        }

        self.start_engine()
    }

    fn start_engine(&mut self) -> SessionResult<()> {
        match self.engine.play() {
            Ok(()) => {
                self.status = PlaybackStatus::Playing;
                Ok(())
            }
            Err(e) => {
                warn!("Engine refused to play: {}", e);
                self.status = PlaybackStatus::Blocked {
                    reason: e.to_string(),
                };
                Err(e.into())
            }
        }
    }

    fn reset_to_idle(&mut self) {
        if let Err(e) = self.engine.pause() {
            warn!("Engine did not pause on reset: {}", e);
        }
        self.current = None;
        self.queue.clear();
        self.now_playing = None;
        self.status = PlaybackStatus::Idle;
        info!("Session {} has no items left", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::engine::{EngineCall, RecordingEngine};

    fn items(n: usize) -> Vec<ResolvedItem> {
        (0..n)
            .map(|i| ResolvedItem::new(format!("Item {i}"), format!("https://cdn/{i}.m3u8")))
            .collect()
    }

    fn session(n: usize) -> PlaybackSession<RecordingEngine> {
        let mut session = PlaybackSession::with_seed(RecordingEngine::new(), 7);
        session.initialize(items(n));
        session
    }

    #[test]
    fn test_initialize_does_not_play() {
        let session = session(3);
        assert_eq!(session.current_index(), Some(0));
        assert_eq!(*session.status(), PlaybackStatus::Ready);
        assert!(session.engine().calls().is_empty());
        assert!(!session.loop_enabled());
        assert!(!session.shuffle_enabled());
    }

    #[test]
    fn test_idle_session_ignores_everything() {
        let mut session = session(0);
        assert!(session.is_idle());
        assert!(session.select(0).is_ok());
        assert!(session.next().is_ok());
        assert!(session.prev().is_ok());
        assert!(session.remove(0).is_ok());
        assert!(!session.enqueue(ResolvedItem::new("x", "https://cdn/x.m3u8")));
        assert!(session.handle_event(PlaybackEvent::Ended).is_ok());
        assert_eq!(session.current_index(), None);
        assert_eq!(*session.status(), PlaybackStatus::Idle);
        assert!(session.engine().calls().is_empty());
    }

    #[test]
    fn test_select_loads_unmuted() {
        let mut session = session(3);
        session.select(2).unwrap();

        assert_eq!(
            session.engine().calls(),
            &[
                EngineCall::SetMuted(false),
                EngineCall::Load("https://cdn/2.m3u8".to_string()),
                EngineCall::Play,
            ]
        );
        assert_eq!(*session.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_select_out_of_range() {
        let mut session = session(2);
        assert_eq!(
            session.select(5),
            Err(SessionError::IndexOutOfRange { index: 5, len: 2 })
        );
        assert_eq!(session.current_index(), Some(0));
    }

    #[test]
    fn test_next_prev_wrap() {
        let mut session = session(3);
        session.prev().unwrap();
        assert_eq!(session.current_index(), Some(2));
        session.next().unwrap();
        assert_eq!(session.current_index(), Some(0));
    }

    #[test]
    fn test_shuffle_stays_in_range() {
        let mut session = session(5);
        session.set_shuffle(true);
        for _ in 0..50 {
            session.next().unwrap();
            assert!(session.current_index().unwrap() < 5);
        }
    }

    #[test]
    fn test_enqueue_dedupes_by_stream_url() {
        let mut session = session(3);
        assert!(session.enqueue_index(1).unwrap());
        assert!(!session.enqueue_index(1).unwrap());
        assert!(!session.enqueue(ResolvedItem::new("Renamed", "https://cdn/1.m3u8")));
        assert_eq!(session.queue_len(), 1);
        assert_eq!(session.current_index(), Some(0));
        assert!(session.engine().calls().is_empty());
    }

    #[test]
    fn test_ended_prefers_queue() {
        let mut session = session(4);
        session.select(0).unwrap();
        session.enqueue_index(3).unwrap();

        session.handle_event(PlaybackEvent::Ended).unwrap();
        assert_eq!(session.current_index(), Some(3));
        assert_eq!(session.queue_len(), 0);

        session.handle_event(PlaybackEvent::Ended).unwrap();
        assert_eq!(*session.status(), PlaybackStatus::Finished);
    }

    #[test]
    fn test_ended_plays_foreign_queued_item_directly() {
        let mut session = session(2);
        session.select(0).unwrap();
        session.enqueue(ResolvedItem::new("Extra", "https://cdn/extra.m3u8"));

        session.handle_event(PlaybackEvent::Ended).unwrap();
        assert_eq!(session.current_index(), Some(0));
        assert_eq!(session.engine().last_loaded(), Some("https://cdn/extra.m3u8"));
        assert_eq!(session.current_item().unwrap().title, "Extra");

        session.handle_event(PlaybackEvent::Ended).unwrap();
        assert_eq!(session.current_index(), Some(1));
    }

    #[test]
    fn test_ended_stops_after_one_pass() {
        let mut session = session(2);
        session.select(0).unwrap();
        session.handle_event(PlaybackEvent::Ended).unwrap();
        assert_eq!(session.current_index(), Some(1));

        session.handle_event(PlaybackEvent::Ended).unwrap();
        assert_eq!(*session.status(), PlaybackStatus::Finished);
        assert_eq!(session.engine().loaded_urls().len(), 2);
    }

    #[test]
    fn test_ended_loops_when_enabled() {
        let mut session = session(2);
        session.set_loop(true);
        session.select(1).unwrap();
        session.handle_event(PlaybackEvent::Ended).unwrap();
        assert_eq!(session.current_index(), Some(0));
        assert_eq!(*session.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_blocked_keeps_state_and_play_retries_unmuted() {
        let mut session = session(2);
        session.select(1).unwrap();
        session.engine_mut().clear();

        session
            .handle_event(PlaybackEvent::Blocked {
                reason: "autoplay policy".to_string(),
            })
            .unwrap();
        assert_eq!(session.current_index(), Some(1));
        assert!(matches!(session.status(), PlaybackStatus::Blocked { .. }));
        assert!(session.engine().calls().is_empty());

        session.play().unwrap();
        assert_eq!(
            session.engine().calls(),
            &[EngineCall::SetMuted(false), EngineCall::Play]
        );
        assert_eq!(*session.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_engine_refusal_is_reported_as_blocked() {
        let mut session = session(1);
        session.engine_mut().fail_next_play("NotAllowedError");

        assert!(matches!(session.play(), Err(SessionError::Engine(_))));
        assert!(matches!(session.status(), PlaybackStatus::Blocked { .. }));

        session.play().unwrap();
        assert_eq!(*session.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_remove_current_reselects() {
        let mut session = session(3);
        session.select(2).unwrap();
        session.remove(2).unwrap();
        assert_eq!(session.current_index(), Some(1));
        assert_eq!(session.engine().last_loaded(), Some("https://cdn/1.m3u8"));

        session.select(0).unwrap();
        session.remove(0).unwrap();
        assert_eq!(session.current_index(), Some(0));
        assert_eq!(session.current_item().unwrap().title, "Item 1");
    }

    #[test]
    fn test_remove_before_current_keeps_item() {
        let mut session = session(3);
        session.select(2).unwrap();
        session.engine_mut().clear();

        session.remove(0).unwrap();
        assert_eq!(session.current_index(), Some(1));
        assert_eq!(session.items()[1].title, "Item 2");
        assert!(session.engine().loaded_urls().is_empty());
    }

    #[test]
    fn test_remove_last_item_goes_idle() {
        let mut session = session(1);
        session.enqueue_index(0).unwrap();
        session.remove(0).unwrap();
        assert!(session.is_idle());
        assert_eq!(session.current_index(), None);
        assert_eq!(session.queue_len(), 0);
        assert_eq!(*session.status(), PlaybackStatus::Idle);
    }

    #[test]
    fn test_volume_is_clamped() {
        let mut session = session(1);
        session.dispatch(SessionCommand::SetVolume(250)).unwrap();
        assert_eq!(session.volume(), 100);
        session.dispatch(SessionCommand::SetVolume(30)).unwrap();
        assert_eq!(session.volume(), 30);
    }

    #[test]
    fn test_neighbors() {
        let mut session = session(3);
        let view = session.neighbors().unwrap();
        assert_eq!(view.previous, "Item 2");
        assert_eq!(view.current, "Item 0");
        assert_eq!(view.next, "Item 1");

        session.initialize(Vec::new());
        assert!(session.neighbors().is_none());
    }

    #[test]
    fn test_apply_config_autoplays() {
        let mut session = session(2);
        session
            .apply_config(&PlaybackConfig {
                autoplay: true,
                volume: 40,
            })
            .unwrap();
        assert_eq!(session.volume(), 40);
        assert_eq!(*session.status(), PlaybackStatus::Playing);
        assert_eq!(session.engine().last_loaded(), Some("https://cdn/0.m3u8"));
    }
}
