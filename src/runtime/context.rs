//! The per-call evaluation context (§3 "Evaluation context").

use std::sync::Arc;

use bitflags::bitflags;

use crate::collab::{empty_play_queue, empty_playlist, empty_track};
use crate::collab::{PlayQueue, Playlist, Streamer, Track};

bitflags! {
    /// Recognized bits of `ctx.flags`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ContextFlags: u32 {
        /// `ctx.id` names a short-circuit column to render directly.
        const HAS_ID = 0b01;
        /// `ctx.idx` is the track's position within the surrounding list.
        const HAS_INDEX = 0b10;
    }
}

/// Short-circuit column identifiers, checked before the bytecode walk
/// (§6 "Short-circuit column IDs").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnId {
    /// 1-based position of the track within the list.
    FileNumber,
    /// The queue-position marker.
    Playing,
    /// Any other caller-defined column id; never short-circuited.
    Other(u32),
}

/// "Never refresh" sentinel for `ctx.update`, matching the original's
/// "very large" default.
pub const UPDATE_NEVER: u32 = u32::MAX;

/// The per-call record bound to one `evaluate()` invocation.
pub struct EvalContext {
    pub track: Option<Arc<dyn Track>>,
    pub playlist: Option<Arc<dyn Playlist>>,
    pub play_queue: Option<Arc<dyn PlayQueue>>,
    pub streamer: Option<Arc<dyn Streamer>>,
    pub iter: i32,
    pub flags: ContextFlags,
    pub id: Option<ColumnId>,
    pub idx: usize,
    /// Smallest refresh interval in milliseconds the rendered value
    /// requires. Only ever tightened (never loosened) by the engine.
    pub update: u32,
}

impl EvalContext {
    pub fn new() -> Self {
        EvalContext {
            track: None,
            playlist: None,
            play_queue: None,
            streamer: None,
            iter: 0,
            flags: ContextFlags::empty(),
            id: None,
            idx: 0,
            update: UPDATE_NEVER,
        }
    }

    pub fn with_track(mut self, track: Arc<dyn Track>) -> Self {
        self.track = Some(track);
        self
    }

    pub fn with_playlist(mut self, playlist: Arc<dyn Playlist>) -> Self {
        self.playlist = Some(playlist);
        self
    }

    pub fn with_play_queue(mut self, queue: Arc<dyn PlayQueue>) -> Self {
        self.play_queue = Some(queue);
        self
    }

    pub fn with_streamer(mut self, streamer: Arc<dyn Streamer>) -> Self {
        self.streamer = Some(streamer);
        self
    }

    pub fn with_index(mut self, idx: usize) -> Self {
        self.idx = idx;
        self.flags |= ContextFlags::HAS_INDEX;
        self
    }

    pub fn with_column_id(mut self, id: ColumnId) -> Self {
        self.id = Some(id);
        self.flags |= ContextFlags::HAS_ID;
        self
    }

    /// Track, substituting the empty-track singleton when absent, exactly
    /// as step 1 of the evaluator's entry point does (§4.2). Returns an
    /// owned `Arc` (a cheap refcount clone) so callers can drop the borrow
    /// of `self` before mutating other fields such as `update`.
    pub(crate) fn track_or_empty(&self) -> Arc<dyn Track> {
        self.track.clone().unwrap_or_else(empty_track)
    }

    pub(crate) fn playlist_or_empty(&self) -> Arc<dyn Playlist> {
        self.playlist.clone().unwrap_or_else(empty_playlist)
    }

    pub(crate) fn play_queue_or_empty(&self) -> Arc<dyn PlayQueue> {
        self.play_queue.clone().unwrap_or_else(empty_play_queue)
    }

    /// Tightens `update` to at most `millis`, never loosening it.
    pub(crate) fn require_update_at_most(&mut self, millis: u32) {
        self.update = self.update.min(millis);
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}
