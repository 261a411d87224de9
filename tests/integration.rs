//! Black-box tests against the public `compile`/`evaluate` API (§8).

use std::sync::Arc;

use proptest::prelude::*;

use titlefmt::collab::{MapTrack, StaticStreamer};
use titlefmt::{compile, evaluate, EngineConfig, EvalContext};

fn render_with(script: &str, track: Option<MapTrack>, buf_len: usize) -> String {
    let bc = compile(script).expect("compiles");
    let mut ctx = EvalContext::new();
    if let Some(track) = track {
        ctx = ctx.with_track(Arc::new(track));
    }
    let config = EngineConfig::default();
    let mut buf = vec![0u8; buf_len];
    let n = evaluate(&mut ctx, &bc, &config, &mut buf).expect("evaluates");
    String::from_utf8(buf[..n].to_vec()).expect("valid utf-8")
}

fn render(script: &str, track: Option<MapTrack>) -> String {
    render_with(script, track, 4096)
}

// ---- Concrete end-to-end scenarios (§8) -----------------------------------

#[test]
fn scenario_artist_and_title() {
    let track = MapTrack::new().with_meta("artist", "The Beatles").with_meta("title", "Let It Be");
    assert_eq!(render("%artist% - %title%", Some(track)), "The Beatles - Let It Be");
}

#[test]
fn scenario_missing_artist_elides_bracket() {
    let track = MapTrack::new().with_meta("title", "Untitled");
    assert_eq!(render("[%artist% - ]%title%", Some(track)), "Untitled");
}

#[test]
fn scenario_tracknumber_zero_padded() {
    let track = MapTrack::new().with_meta("track", "3").with_meta("title", "X");
    assert_eq!(render("%tracknumber%. %title%", Some(track)), "03. X");
}

#[test]
fn scenario_filesize_natural() {
    let track = MapTrack::new().with_meta(":FILE_SIZE", "1572864");
    assert_eq!(render("%filesize_natural%", Some(track)), "1.500 MB");
}

#[test]
fn scenario_strcmp_of_two_absent_fields() {
    assert_eq!(render("$if($strcmp(%artist%,%artist%),yes,no)", None), "yes");
}

#[test]
fn scenario_track_artist_elides_when_equal_to_album_artist() {
    let track = MapTrack::new().with_meta("artist", "A").with_meta("album artist", "A");
    assert_eq!(render("[%track artist% / ]%album artist%", Some(track)), "A");
}

// ---- Boundary tests --------------------------------------------------------

#[test]
fn boundary_empty_script_yields_empty_output() {
    assert_eq!(render("", None), "");
}

#[test]
fn boundary_output_truncates_at_utf8_boundary_not_midcodepoint() {
    // Each "é" is 2 bytes; a 3-byte buffer (2 reserved for text, 1 for the
    // NUL terminator) must not split the second character's encoding.
    let out = render_with("héllo", None, 3);
    assert!(out.len() <= 2);
    assert!(std::str::from_utf8(out.as_bytes()).is_ok());
}

#[test]
fn boundary_argument_over_255_bytes_is_a_compile_error() {
    let long_arg = "x".repeat(300);
    let script = format!("$left({long_arg},3)");
    assert!(compile(&script).is_err());
}

#[test]
fn boundary_field_name_over_255_bytes_is_a_compile_error() {
    let script = format!("%{}%", "x".repeat(256));
    assert!(compile(&script).is_err());
}

#[test]
fn boundary_deeply_nested_blocks_compile_and_evaluate() {
    let depth = 32;
    let script = format!("{}%title%{}", "[".repeat(depth), "]".repeat(depth));
    let track = MapTrack::new().with_meta("title", "Deep");
    assert_eq!(render(&script, Some(track)), "Deep");
}

// ---- Playback-dependent fields ---------------------------------------------

#[test]
fn playback_time_only_renders_for_the_currently_playing_track() {
    let track = Arc::new(MapTrack::new().with_meta("title", "Now Playing").with_duration_seconds(200.0));
    let streamer = StaticStreamer::playing(track.clone(), 65.0);
    let bc = compile("%playback_time%").unwrap();
    let mut ctx = EvalContext::new().with_track(track).with_streamer(Arc::new(streamer));
    let config = EngineConfig::default();
    let mut buf = vec![0u8; 64];
    let n = evaluate(&mut ctx, &bc, &config, &mut buf).unwrap();
    assert_eq!(std::str::from_utf8(&buf[..n]).unwrap(), "1:05");
    assert_eq!(ctx.update, 1000);
}

#[test]
fn playback_time_absent_for_a_different_track() {
    let playing = Arc::new(MapTrack::new());
    let other = Arc::new(MapTrack::new());
    let streamer = StaticStreamer::playing(playing, 65.0);
    let bc = compile("[%playback_time%]none").unwrap();
    let mut ctx = EvalContext::new().with_track(other).with_streamer(Arc::new(streamer));
    let config = EngineConfig::default();
    let mut buf = vec![0u8; 64];
    let n = evaluate(&mut ctx, &bc, &config, &mut buf).unwrap();
    assert_eq!(std::str::from_utf8(&buf[..n]).unwrap(), "none");
}

// ---- Property tests (§8 invariants) -----------------------------------------

fn arb_script() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,20}",
        r"%(artist|title|album|tracknumber)%",
        r"\[%(artist|title)%\]",
        r"\$if\(\$strcmp\(a,a\),yes,no\)",
    ]
}

proptest! {
    #[test]
    fn never_writes_past_the_declared_buffer_length(script in arb_script(), len in 0usize..64) {
        if let Ok(bc) = compile(&script) {
            let mut ctx = EvalContext::new();
            let config = EngineConfig::default();
            let mut buf = vec![0xAAu8; len];
            if let Ok(n) = evaluate(&mut ctx, &bc, &config, &mut buf) {
                prop_assert!(n < len.max(1));
                prop_assert!(std::str::from_utf8(&buf[..n]).is_ok());
            }
        }
    }

    #[test]
    fn compiled_bytecode_evaluates_identically_across_calls(script in arb_script()) {
        if let Ok(bc) = compile(&script) {
            let config = EngineConfig::default();
            let mut first = vec![0u8; 256];
            let mut second = vec![0u8; 256];
            let mut ctx1 = EvalContext::new();
            let mut ctx2 = EvalContext::new();
            let n1 = evaluate(&mut ctx1, &bc, &config, &mut first);
            let n2 = evaluate(&mut ctx2, &bc, &config, &mut second);
            match (n1, n2) {
                (Ok(n1), Ok(n2)) => {
                    prop_assert_eq!(&first[..n1], &second[..n2]);
                }
                _ => prop_assert_eq!(n1.is_err(), n2.is_err()),
            }
        }
    }

    #[test]
    fn if_defined_block_over_an_absent_field_contributes_nothing(prefix in "[a-z]{0,5}", suffix in "[a-z]{0,5}") {
        let script = format!("{prefix}[%nonexistent_field_xyz%]{suffix}");
        let bc = compile(&script).unwrap();
        let mut ctx = EvalContext::new();
        let config = EngineConfig::default();
        let mut buf = vec![0u8; 64];
        let n = evaluate(&mut ctx, &bc, &config, &mut buf).unwrap();
        prop_assert_eq!(std::str::from_utf8(&buf[..n]).unwrap(), format!("{prefix}{suffix}"));
    }
}
