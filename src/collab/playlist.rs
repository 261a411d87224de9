//! The playlist and play-queue collaborators.

use std::sync::{Arc, OnceLock};

use crate::collab::track::Track;

/// Stands in for the original's `plt_get_item_idx` / `plt_get_item_count`
/// / `pl_get_idx_of_iter` collaborator group.
pub trait Playlist: Send + Sync {
    /// Number of items visible under the given iterator.
    fn item_count(&self, iter: i32) -> usize;

    /// Zero-based position of `track` within the playlist, if present.
    fn index_of(&self, track: &dyn Track, iter: i32) -> Option<usize>;
}

/// Stands in for `playqueue_test` / `playqueue_get_item` /
/// `playqueue_getcount`.
pub trait PlayQueue: Send + Sync {
    /// Number of entries queued, counting duplicates.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First (lowest) 1-based queue position of `track`, if queued.
    fn position_of(&self, track: &dyn Track) -> Option<usize>;

    /// Every 1-based queue position of `track`, in queue order. A track can
    /// be queued more than once.
    fn all_positions_of(&self, track: &dyn Track) -> Vec<usize>;
}

struct EmptyPlaylist;

impl Playlist for EmptyPlaylist {
    fn item_count(&self, _iter: i32) -> usize {
        0
    }

    fn index_of(&self, _track: &dyn Track, _iter: i32) -> Option<usize> {
        None
    }
}

pub(crate) fn empty_playlist() -> Arc<dyn Playlist> {
    static EMPTY: OnceLock<Arc<dyn Playlist>> = OnceLock::new();
    EMPTY.get_or_init(|| Arc::new(EmptyPlaylist) as Arc<dyn Playlist>).clone()
}

struct EmptyPlayQueue;

impl PlayQueue for EmptyPlayQueue {
    fn len(&self) -> usize {
        0
    }

    fn position_of(&self, _track: &dyn Track) -> Option<usize> {
        None
    }

    fn all_positions_of(&self, _track: &dyn Track) -> Vec<usize> {
        Vec::new()
    }
}

pub(crate) fn empty_play_queue() -> Arc<dyn PlayQueue> {
    static EMPTY: OnceLock<Arc<dyn PlayQueue>> = OnceLock::new();
    EMPTY.get_or_init(|| Arc::new(EmptyPlayQueue) as Arc<dyn PlayQueue>).clone()
}
