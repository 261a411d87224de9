//! Field resolution (§4.3): player-compatible aliasing and synthetic
//! fields, falling through to a raw metadata lookup for anything else.

use crate::collab::{OutputState, Track};
use crate::runtime::context::{ContextFlags, EvalContext};
use crate::runtime::format::{
    basename, directory_level, extension as path_extension, format_filesize_natural, format_hms,
    format_hms_millis, parse_leading_int, stem,
};

/// Build/version string returned by `_deadbeef_version`, kept under that
/// name because it is part of the engine's external field vocabulary
/// (scripts written against the original tool reference it verbatim).
pub const LEGACY_VERSION_FIELD: &str = "_deadbeef_version";
const LEGACY_VERSION_VALUE: &str = "1.0";

fn first_defined(track: &dyn Track, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| track.find_meta(k))
}

const ARTIST_CHAIN: &[&str] = &["artist", "album artist", "albumartist", "composer", "performer"];
const ALBUM_ARTIST_CHAIN: &[&str] =
    &["album artist", "albumartist", "band", "artist", "composer", "performer"];

fn resolve_channels(track: &dyn Track) -> String {
    match track.find_meta(":CHANNELS").as_deref() {
        Some("1") => "mono".to_string(),
        Some("2") => "stereo".to_string(),
        Some(other) => other.to_string(),
        None => "stereo".to_string(),
    }
}

fn resolve_replaygain(track: &dyn Track, name: &str) -> Option<String> {
    let rest = name.strip_prefix("replaygain_")?;
    let (scope, metric) = rest.rsplit_once('_')?;
    let key = match metric {
        "gain" => format!(":REPLAYGAIN_{}GAIN", scope.to_uppercase()),
        "peak" => format!(":REPLAYGAIN_{}PEAK", scope.to_uppercase()),
        _ => return None,
    };
    track.find_meta(&key)
}

fn track_duration_seconds(track: &dyn Track) -> Option<f64> {
    if let Some(d) = track.duration_seconds() {
        return Some(d);
    }
    let samples = track.end_sample() - track.start_sample();
    if samples > 0 {
        track
            .find_meta(":SAMPLERATE")
            .map(|s| parse_leading_int(&s))
            .filter(|&rate| rate > 0)
            .map(|rate| samples as f64 / rate as f64)
    } else {
        None
    }
}

fn resolve_length(track: &dyn Track, with_millis: bool) -> Option<String> {
    let seconds = track_duration_seconds(track)?;
    Some(if with_millis { format_hms_millis(seconds) } else { format_hms(seconds.round() as i64) })
}

fn resolve_playback_time(ctx: &mut EvalContext, name: &str) -> Option<String> {
    let track = ctx.track_or_empty();
    let streamer = ctx.streamer.clone()?;
    if !streamer.is_current(track.as_ref()) {
        return None;
    }
    let position = streamer.play_position_seconds()?;
    ctx.require_update_at_most(1000);

    match name {
        "playback_time" => Some(format_hms(position.round() as i64)),
        "playback_time_seconds" => Some(format!("{:.0}", position)),
        "playback_time_remaining" | "playback_time_remaining_seconds" => {
            let total = track_duration_seconds(track.as_ref())?;
            let remaining = (total - position).max(0.0);
            Some(if name == "playback_time_remaining" {
                format_hms(remaining.round() as i64)
            } else {
                format!("{:.0}", remaining)
            })
        }
        _ => unreachable!(),
    }
}

fn resolve_is_state(ctx: &EvalContext, want: OutputState) -> Option<String> {
    let streamer = ctx.streamer.as_ref()?;
    let track = ctx.track_or_empty();
    if streamer.is_current(track.as_ref()) && streamer.output_state() == want {
        Some("1".to_string())
    } else {
        None
    }
}

fn resolve_list_index(ctx: &EvalContext) -> Option<String> {
    let total = ctx.playlist_or_empty().item_count(ctx.iter);
    let width = total.max(1).to_string().len();
    let one_based = if ctx.flags.contains(ContextFlags::HAS_INDEX) {
        ctx.idx + 1
    } else {
        ctx.playlist_or_empty().index_of(ctx.track_or_empty().as_ref(), ctx.iter)? + 1
    };
    Some(format!("{:0>width$}", one_based, width = width))
}

/// Resolves a `%field%` name to its rendered text, or `None` if undefined.
/// May tighten `ctx.update` as a side effect (time-dependent fields).
pub fn resolve(ctx: &mut EvalContext, name: &str) -> Option<String> {
    match name {
        "album artist" => first_defined(ctx.track_or_empty().as_ref(), ALBUM_ARTIST_CHAIN),
        "artist" => first_defined(ctx.track_or_empty().as_ref(), ARTIST_CHAIN),
        "album" => first_defined(ctx.track_or_empty().as_ref(), &["album", "venue"]),
        "track artist" => {
            let track = ctx.track_or_empty();
            let track_artist = first_defined(track.as_ref(), ARTIST_CHAIN);
            let album_artist = first_defined(track.as_ref(), ALBUM_ARTIST_CHAIN);
            if track_artist == album_artist {
                None
            } else {
                track_artist
            }
        }
        "tracknumber" => {
            let raw = ctx.track_or_empty().find_meta("track")?;
            if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_digit()) {
                Some(format!("{:02}", parse_leading_int(&raw)))
            } else {
                None
            }
        }
        "title" => {
            let track = ctx.track_or_empty();
            track.find_meta("title").or_else(|| track.find_meta(":URI").map(|u| stem(&u).to_string()))
        }
        "discnumber" => ctx.track_or_empty().find_meta("disc"),
        "totaldiscs" => ctx.track_or_empty().find_meta("numdiscs"),
        "track number" => ctx.track_or_empty().find_meta("track"),
        "date" => ctx.track_or_empty().find_meta("year"),
        "samplerate" => ctx.track_or_empty().find_meta(":SAMPLERATE"),
        "bitrate" => ctx.track_or_empty().find_meta(":BITRATE"),
        "filesize" => ctx.track_or_empty().find_meta(":FILE_SIZE"),
        "codec" => ctx.track_or_empty().find_meta(":FILETYPE"),
        "filesize_natural" => ctx
            .track_or_empty()
            .find_meta(":FILE_SIZE")
            .map(|s| format_filesize_natural(parse_leading_int(&s))),
        "channels" => Some(resolve_channels(ctx.track_or_empty().as_ref())),
        name if name.starts_with("replaygain_") => resolve_replaygain(ctx.track_or_empty().as_ref(), name),
        "playback_time" | "playback_time_seconds" | "playback_time_remaining"
        | "playback_time_remaining_seconds" => resolve_playback_time(ctx, name),
        "length" => resolve_length(ctx.track_or_empty().as_ref(), false),
        "length_ex" => resolve_length(ctx.track_or_empty().as_ref(), true),
        "length_seconds" => track_duration_seconds(ctx.track_or_empty().as_ref()).map(|d| (d.round() as i64).to_string()),
        "length_seconds_fp" => track_duration_seconds(ctx.track_or_empty().as_ref()).map(|d| format!("{:.3}", d)),
        "length_samples" => {
            let track = ctx.track_or_empty();
            Some((track.end_sample() - track.start_sample()).to_string())
        }
        "isplaying" => resolve_is_state(ctx, OutputState::Playing),
        "ispaused" => resolve_is_state(ctx, OutputState::Paused),
        "filename" => ctx.track_or_empty().find_meta(":URI").map(|u| stem(&u).to_string()),
        "filename_ext" => ctx.track_or_empty().find_meta(":URI").map(|u| basename(&u).to_string()),
        "directoryname" => ctx.track_or_empty().find_meta(":URI").map(|u| directory_level(&u, 1).to_string()),
        "path" => ctx.track_or_empty().find_meta(":URI"),
        "list_index" => resolve_list_index(ctx),
        "list_total" => Some(ctx.playlist_or_empty().item_count(ctx.iter).to_string()),
        "queue_index" => {
            let track = ctx.track_or_empty();
            ctx.play_queue_or_empty().position_of(track.as_ref()).map(|i| i.to_string())
        }
        "queue_indexes" => {
            let track = ctx.track_or_empty();
            let positions = ctx.play_queue_or_empty().all_positions_of(track.as_ref());
            if positions.is_empty() {
                None
            } else {
                Some(positions.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(","))
            }
        }
        "queue_total" => Some(ctx.play_queue_or_empty().len().to_string()),
        LEGACY_VERSION_FIELD => Some(LEGACY_VERSION_VALUE.to_string()),
        _ => ctx.track_or_empty().find_meta(name),
    }
}

/// Extension helper backing the `ext()` built-in, kept here alongside the
/// rest of field/path logic rather than duplicated in `builtins.rs`.
pub fn ext_of(path: &str) -> &str {
    path_extension(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::MapTrack;
    use std::sync::Arc;

    fn ctx_with(track: MapTrack) -> EvalContext {
        EvalContext::new().with_track(Arc::new(track))
    }

    #[test]
    fn artist_alias_chain_falls_back() {
        let ctx = ctx_with(MapTrack::new().with_meta("composer", "J.S. Bach"));
        let mut ctx = ctx;
        assert_eq!(resolve(&mut ctx, "artist").as_deref(), Some("J.S. Bach"));
    }

    #[test]
    fn tracknumber_is_zero_padded() {
        let mut ctx = ctx_with(MapTrack::new().with_meta("track", "3"));
        assert_eq!(resolve(&mut ctx, "tracknumber").as_deref(), Some("03"));
    }

    #[test]
    fn tracknumber_absent_when_not_numeric() {
        let mut ctx = ctx_with(MapTrack::new().with_meta("track", "3/12"));
        assert_eq!(resolve(&mut ctx, "tracknumber"), None);
    }

    #[test]
    fn tracknumber_reparses_instead_of_padding_the_raw_string() {
        // A raw tag of "007" already has 3 digits; the field still
        // reparses it as an integer and re-pads to width 2, rather than
        // leaving the extra leading zero untouched.
        let mut ctx = ctx_with(MapTrack::new().with_meta("track", "007"));
        assert_eq!(resolve(&mut ctx, "tracknumber").as_deref(), Some("07"));
    }

    #[test]
    fn title_falls_back_to_uri_stem() {
        let mut ctx = ctx_with(MapTrack::new().with_meta(":URI", "/music/Song Title.flac"));
        assert_eq!(resolve(&mut ctx, "title").as_deref(), Some("Song Title"));
    }

    #[test]
    fn track_artist_elides_when_equal_to_album_artist() {
        let mut ctx =
            ctx_with(MapTrack::new().with_meta("artist", "A").with_meta("album artist", "A"));
        assert_eq!(resolve(&mut ctx, "track artist"), None);
        assert_eq!(resolve(&mut ctx, "album artist").as_deref(), Some("A"));
    }

    #[test]
    fn filesize_natural_matches_scenario() {
        let mut ctx = ctx_with(MapTrack::new().with_meta(":FILE_SIZE", "1572864"));
        assert_eq!(resolve(&mut ctx, "filesize_natural").as_deref(), Some("1.500 MB"));
    }

    #[test]
    fn channels_defaults_to_stereo() {
        let mut ctx = ctx_with(MapTrack::new());
        assert_eq!(resolve(&mut ctx, "channels").as_deref(), Some("stereo"));
    }

    #[test]
    fn unknown_field_is_raw_metadata_lookup() {
        let mut ctx = ctx_with(MapTrack::new().with_meta("custom_tag", "value"));
        assert_eq!(resolve(&mut ctx, "custom_tag").as_deref(), Some("value"));
        assert_eq!(resolve(&mut ctx, "nonexistent"), None);
    }
}
