//! Minimal in-memory collaborator implementations, used by tests, the CLI
//! demo, and doctests. Production embedders wire the traits in
//! `collab::{track, playlist, playback}` up to their real metadata store,
//! playlist, and streamer instead.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::collab::playback::{OutputState, Streamer};
use crate::collab::playlist::{PlayQueue, Playlist};
use crate::collab::track::Track;

/// A track backed by a plain key/value metadata map.
///
/// The map is behind an `RwLock` so `find_meta` brackets each lookup with a
/// read-lock acquire/release, the same discipline the design spec requires
/// of the real metadata backend (§5 "Locking discipline").
pub struct MapTrack {
    meta: RwLock<HashMap<String, String>>,
    start_sample: i64,
    end_sample: i64,
    duration_seconds: Option<f64>,
}

impl MapTrack {
    pub fn new() -> Self {
        MapTrack {
            meta: RwLock::new(HashMap::new()),
            start_sample: 0,
            end_sample: 0,
            duration_seconds: None,
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.write().unwrap().insert(key.into(), value.into());
        self
    }

    pub fn with_duration_seconds(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    pub fn with_samples(mut self, start: i64, end: i64) -> Self {
        self.start_sample = start;
        self.end_sample = end;
        self
    }
}

impl Default for MapTrack {
    fn default() -> Self {
        Self::new()
    }
}

impl Track for MapTrack {
    fn find_meta(&self, key: &str) -> Option<String> {
        let guard = self.meta.read().unwrap();
        let value = guard.get(key).cloned();
        drop(guard);
        value
    }

    fn start_sample(&self) -> i64 {
        self.start_sample
    }

    fn end_sample(&self) -> i64 {
        self.end_sample
    }

    fn duration_seconds(&self) -> Option<f64> {
        self.duration_seconds
    }
}

/// A playlist that is just an ordered list of tracks.
pub struct VecPlaylist {
    items: Vec<Arc<dyn Track>>,
}

impl VecPlaylist {
    pub fn new(items: Vec<Arc<dyn Track>>) -> Self {
        VecPlaylist { items }
    }
}

impl Playlist for VecPlaylist {
    fn item_count(&self, _iter: i32) -> usize {
        self.items.len()
    }

    fn index_of(&self, track: &dyn Track, _iter: i32) -> Option<usize> {
        self.items.iter().position(|t| std::ptr::eq(t.as_ref(), track))
    }
}

/// A play queue that is just an ordered list of queued tracks (a track may
/// appear more than once).
pub struct VecPlayQueue {
    items: Vec<Arc<dyn Track>>,
}

impl VecPlayQueue {
    pub fn new(items: Vec<Arc<dyn Track>>) -> Self {
        VecPlayQueue { items }
    }
}

impl PlayQueue for VecPlayQueue {
    fn len(&self) -> usize {
        self.items.len()
    }

    fn position_of(&self, track: &dyn Track) -> Option<usize> {
        self.items.iter().position(|t| std::ptr::eq(t.as_ref(), track)).map(|i| i + 1)
    }

    fn all_positions_of(&self, track: &dyn Track) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, t)| std::ptr::eq(t.as_ref(), track))
            .map(|(i, _)| i + 1)
            .collect()
    }
}

/// A streamer with a fixed playing track, position, and output state —
/// enough to exercise `playback_time*`/`isplaying`/`ispaused` in tests
/// without a real playback engine.
pub struct StaticStreamer {
    playing: Option<Arc<dyn Track>>,
    position_seconds: Option<f64>,
    state: OutputState,
}

impl StaticStreamer {
    pub fn stopped() -> Self {
        StaticStreamer { playing: None, position_seconds: None, state: OutputState::Stopped }
    }

    pub fn playing(track: Arc<dyn Track>, position_seconds: f64) -> Self {
        StaticStreamer { playing: Some(track), position_seconds: Some(position_seconds), state: OutputState::Playing }
    }

    pub fn paused(track: Arc<dyn Track>, position_seconds: f64) -> Self {
        StaticStreamer { playing: Some(track), position_seconds: Some(position_seconds), state: OutputState::Paused }
    }
}

impl Streamer for StaticStreamer {
    fn playing_track(&self) -> Option<Arc<dyn Track>> {
        self.playing.clone()
    }

    fn play_position_seconds(&self) -> Option<f64> {
        self.position_seconds
    }

    fn output_state(&self) -> OutputState {
        self.state
    }
}
