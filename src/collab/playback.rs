//! The streamer collaborator: currently-playing track, play position, and
//! output device state.

use std::sync::Arc;

use crate::collab::track::Track;

/// Mirrors the original's `output_state()` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Playing,
    Paused,
    Stopped,
}

/// Stands in for `streamer_get_playing_track` / `streamer_get_playpos` /
/// `output_state`.
pub trait Streamer: Send + Sync {
    /// The track currently loaded for playback, if any.
    fn playing_track(&self) -> Option<Arc<dyn Track>>;

    /// Playback position within the current track, in seconds.
    fn play_position_seconds(&self) -> Option<f64>;

    fn output_state(&self) -> OutputState;

    /// `true` if `track` is the one currently loaded and playback is not
    /// stopped. Used by `isplaying`/`ispaused` and `playback_time*`.
    fn is_current(&self, track: &dyn Track) -> bool {
        match self.playing_track() {
            Some(t) => std::ptr::eq(t.as_ref(), track),
            None => false,
        }
    }
}
