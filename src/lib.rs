//! A compiler and evaluator for the title-formatting template language used
//! to render per-track display strings ("%artist% - %title%" and friends)
//! for audio-player UIs.
//!
//! The public surface is deliberately small: [`compile`] a script once,
//! [`evaluate`] it as many times as the display needs refreshing, against
//! an [`EvalContext`] bound to a [`collab::Track`] and the surrounding
//! playlist/queue/streamer state.

pub mod ascii;
pub mod bytecode;
pub mod collab;
pub mod compiler;
pub mod config;
pub mod error;
pub mod registry;
pub mod runtime;

pub use bytecode::Bytecode;
pub use collab::{PlayQueue, Playlist, Streamer, Track};
pub use compiler::compile;
pub use config::EngineConfig;
pub use error::{CompileError, CompileResult, EvalError, EvalResult};
pub use runtime::{evaluate, ColumnId, ContextFlags, EvalContext};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::MapTrack;
    use std::sync::Arc;

    #[test]
    fn public_api_compiles_and_evaluates_a_script() {
        let bc = compile("%artist% - %title%").unwrap();
        let mut ctx = EvalContext::new()
            .with_track(Arc::new(MapTrack::new().with_meta("artist", "The Beatles").with_meta("title", "Let It Be")));
        let config = EngineConfig::default();
        let mut buf = [0u8; 64];
        let n = evaluate(&mut ctx, &bc, &config, &mut buf).unwrap();
        assert_eq!(std::str::from_utf8(&buf[..n]).unwrap(), "The Beatles - Let It Be");
    }
}
