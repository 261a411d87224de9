//! The track metadata collaborator.

use std::sync::{Arc, OnceLock};

/// A track's metadata, reached through `find_meta` the same way the
/// original design's `find_meta_raw(track, key)` collaborator works.
///
/// Implementors are responsible for whatever internal locking their
/// storage needs; the engine brackets each `%field%` resolution in exactly
/// one `find_meta` call per alias-chain step, so an `RwLock`-per-track
/// implementation (see [`crate::collab::MapTrack`]) only ever takes one
/// read guard at a time.
pub trait Track: Send + Sync {
    /// Raw metadata lookup by key. Keys starting with `:` (e.g. `:URI`,
    /// `:FILE_SIZE`) are synthetic keys the host exposes for container-level
    /// properties rather than tag fields.
    fn find_meta(&self, key: &str) -> Option<String>;

    /// Start sample of this track within its source file.
    fn start_sample(&self) -> i64 {
        0
    }

    /// End sample of this track within its source file.
    fn end_sample(&self) -> i64 {
        0
    }

    /// Duration in seconds, if known independently of sample positions.
    fn duration_seconds(&self) -> Option<f64> {
        None
    }
}

/// The immutable empty-track singleton substituted whenever a context's
/// `track` is absent, so the rest of the engine can always call through a
/// concrete `&dyn Track` (§3 "Lifecycles", §9 "Context singletons").
struct EmptyTrack;

impl Track for EmptyTrack {
    fn find_meta(&self, _key: &str) -> Option<String> {
        None
    }
}

/// The empty-track singleton, as a cheaply-clonable `Arc`. Cloning just
/// bumps a refcount; no allocation happens per call.
pub fn empty_track() -> Arc<dyn Track> {
    static EMPTY: OnceLock<Arc<dyn Track>> = OnceLock::new();
    EMPTY.get_or_init(|| Arc::new(EmptyTrack) as Arc<dyn Track>).clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_track_has_no_metadata() {
        let t = empty_track();
        assert_eq!(t.find_meta("artist"), None);
        assert_eq!(t.start_sample(), 0);
        assert_eq!(t.end_sample(), 0);
    }
}
