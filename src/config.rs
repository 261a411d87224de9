//! Tunables for the compiler and evaluator.
//!
//! The engine has very little that needs configuring — recursion depth and
//! the compiler's scratch-buffer sizing factor — but embedders that want to
//! tune them can load a small TOML file (`serde` + `toml`, the same
//! combination the teacher lineage uses for its own config files) rather
//! than poking at constants.

use serde::{Deserialize, Serialize};

/// Recursion/nesting depth bound shared by the compiler (nested
/// `[...]` blocks) and the evaluator (nested function calls and
/// if-defined bodies). See Design Notes §9 "Recursion depth".
pub const DEFAULT_MAX_RECURSION_DEPTH: u32 = 64;

/// Upper-bound multiplier used to size the compiler's scratch buffer
/// relative to the input script length (§4.1 "Scanner state").
pub const DEFAULT_SCRATCH_FACTOR: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_recursion_depth: u32,
    pub scratch_factor: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            scratch_factor: DEFAULT_SCRATCH_FACTOR,
        }
    }
}

impl EngineConfig {
    /// Parses a config from TOML text, e.g. the contents of `tf.toml`.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.max_recursion_depth, DEFAULT_MAX_RECURSION_DEPTH);
        assert_eq!(cfg.scratch_factor, DEFAULT_SCRATCH_FACTOR);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg = EngineConfig::from_toml_str("max_recursion_depth = 16\n").unwrap();
        assert_eq!(cfg.max_recursion_depth, 16);
        assert_eq!(cfg.scratch_factor, DEFAULT_SCRATCH_FACTOR);
    }
}
