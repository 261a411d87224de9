//! The bytecode walker (§4.2) and the public `evaluate()` entry point.

use crate::bytecode::{Bytecode, NODE_CALL, NODE_FIELD, NODE_IFDEF, NODE_LITERAL_RUN, SENTINEL};
use crate::config::EngineConfig;
use crate::error::{EvalError, EvalResult};
use crate::registry;
use crate::runtime::context::{ColumnId, ContextFlags, EvalContext};
use crate::runtime::fields;

/// What a built-in or a block produced: rendered text plus the boolean
/// convention carried alongside it (§4.2, §9 "Stringly-typed outputs").
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallOutcome {
    pub text: String,
    pub truthy: bool,
}

impl CallOutcome {
    pub fn value(text: impl Into<String>) -> Self {
        let text = text.into();
        let truthy = !text.is_empty();
        CallOutcome { text, truthy }
    }

    pub fn bool_only(truthy: bool) -> Self {
        CallOutcome { text: String::new(), truthy }
    }

    pub fn empty() -> Self {
        CallOutcome { text: String::new(), truthy: false }
    }
}

/// Signature every registry entry implements. Arguments are each the raw
/// compiled bytes of one call argument — not yet evaluated — so built-ins
/// such as `if`/`and`/`or` can short-circuit (§5 "Ordering guarantees").
pub type BuiltinFn = for<'a> fn(&mut Interp<'a>, &[&[u8]]) -> EvalResult<CallOutcome>;

/// One evaluation in progress: the context being rendered against, the
/// tunables, and the recursion depth counted across nested blocks and call
/// arguments alike.
pub struct Interp<'a> {
    pub ctx: &'a mut EvalContext,
    config: &'a EngineConfig,
    depth: u32,
    fail_on_undef: bool,
    /// Upper bound on how much text any one `eval_block` accumulates
    /// before it stops walking further nodes (§4.2 "every copy is bounded
    /// by remaining outlen"). Set once from the caller's output buffer
    /// length; every block, nested or top-level, is capped by it so a
    /// pathological script can't build an unbounded string in memory only
    /// to have it discarded at the final truncation.
    outlen_cap: usize,
}

fn utf8_len_from_lead_byte(b: u8) -> usize {
    if b & 0x80 == 0 {
        1
    } else if b & 0xE0 == 0xC0 {
        2
    } else if b & 0xF0 == 0xE0 {
        3
    } else if b & 0xF8 == 0xF0 {
        4
    } else {
        1
    }
}

impl<'a> Interp<'a> {
    fn new(ctx: &'a mut EvalContext, config: &'a EngineConfig, outlen_cap: usize) -> Self {
        Interp { ctx, config, depth: 0, fail_on_undef: false, outlen_cap }
    }

    /// Evaluates a raw argument body with the interpreter's current
    /// undefined-field strictness, returning its full outcome.
    pub fn eval_arg(&mut self, bytes: &[u8]) -> EvalResult<CallOutcome> {
        self.eval_block(bytes)
    }

    pub fn eval_arg_text(&mut self, bytes: &[u8]) -> EvalResult<String> {
        Ok(self.eval_arg(bytes)?.text)
    }

    pub fn eval_arg_truthy(&mut self, bytes: &[u8]) -> EvalResult<bool> {
        Ok(self.eval_arg(bytes)?.truthy)
    }

    pub fn max_recursion_depth(&self) -> u32 {
        self.config.max_recursion_depth
    }

    /// Walks one block of bytecode nodes, accumulating rendered text and
    /// the boolean convention (§4.2). Undefined fields fail the whole block
    /// when `self.fail_on_undef` is set (only true inside if-defined
    /// bodies and the call arguments nested within them).
    pub fn eval_block(&mut self, code: &[u8]) -> EvalResult<CallOutcome> {
        self.depth += 1;
        if self.depth > self.max_recursion_depth() {
            self.depth -= 1;
            return Err(EvalError::RecursionLimit(self.max_recursion_depth()));
        }
        let result = self.eval_block_inner(code);
        self.depth -= 1;
        result
    }

    fn eval_block_inner(&mut self, code: &[u8]) -> EvalResult<CallOutcome> {
        let mut text = String::new();
        let mut truthy = false;
        let mut i = 0usize;

        while i < code.len() {
            let b = code[i];
            if b != SENTINEL {
                let len = utf8_len_from_lead_byte(b);
                let end = (i + len).min(code.len());
                match std::str::from_utf8(&code[i..end]) {
                    Ok(s) => text.push_str(s),
                    Err(_) => return Err(EvalError::Truncated { offset: i, expected: len }),
                }
                i = end;
            } else {
                if i + 1 >= code.len() {
                    return Err(EvalError::Truncated { offset: i, expected: 1 });
                }
                let kind = code[i + 1];
                i += 2;

                match kind {
                    NODE_CALL => {
                        let (outcome, next) = self.eval_call_node(code, i)?;
                        if outcome.truthy {
                            truthy = true;
                        }
                        text.push_str(&outcome.text);
                        i = next;
                    }
                    NODE_FIELD => {
                        let (name_len, after_len) = read_u8_len(code, i)?;
                        let name_end = after_len + name_len;
                        if name_end > code.len() {
                            return Err(EvalError::Truncated { offset: after_len, expected: name_len });
                        }
                        let name = std::str::from_utf8(&code[after_len..name_end])
                            .map_err(|_| EvalError::Truncated { offset: after_len, expected: name_len })?;
                        match fields::resolve(self.ctx, name) {
                            Some(value) => {
                                truthy = true;
                                text.push_str(&value.replace('\n', ";"));
                            }
                            None if self.fail_on_undef => {
                                return Err(EvalError::BuiltinFailed("%field%"));
                            }
                            None => {}
                        }
                        i = name_end;
                    }
                    NODE_IFDEF => {
                        let (body_len, after_len) = read_i32_len(code, i)?;
                        let body_end = after_len + body_len;
                        if body_end > code.len() {
                            return Err(EvalError::Truncated { offset: after_len, expected: body_len });
                        }
                        let body = &code[after_len..body_end];
                        let previous = self.fail_on_undef;
                        self.fail_on_undef = true;
                        let outcome = self.eval_block(body);
                        self.fail_on_undef = previous;
                        if let Ok(outcome) = outcome {
                            if outcome.truthy {
                                truthy = true;
                            }
                            text.push_str(&outcome.text);
                        }
                        i = body_end;
                    }
                    NODE_LITERAL_RUN => {
                        let (run_len, after_len) = read_i32_len(code, i)?;
                        let run_end = after_len + run_len;
                        if run_end > code.len() {
                            return Err(EvalError::Truncated { offset: after_len, expected: run_len });
                        }
                        let s = std::str::from_utf8(&code[after_len..run_end])
                            .map_err(|_| EvalError::Truncated { offset: after_len, expected: run_len })?;
                        text.push_str(s);
                        i = run_end;
                    }
                    other => return Err(EvalError::UnknownNodeKind(other)),
                }
            }

            // Bound every block's accumulation by the caller's declared
            // output length (§4.2), not just the final render. Once a
            // block has filled its budget there is nothing left for
            // further nodes to usefully contribute, so the walk stops
            // early rather than continuing to grow `text` unboundedly.
            if text.len() > self.outlen_cap {
                let cut = truncate_to_boundary(&text, self.outlen_cap).len();
                text.truncate(cut);
                break;
            }
        }

        Ok(CallOutcome { text, truthy })
    }

    /// Parses and invokes one `0x00 0x01` call node starting at `pos`
    /// (just past the sentinel+kind bytes). Returns the outcome and the
    /// index just past the node.
    fn eval_call_node(&mut self, code: &[u8], pos: usize) -> EvalResult<(CallOutcome, usize)> {
        if pos + 2 > code.len() {
            return Err(EvalError::Truncated { offset: pos, expected: 2 });
        }
        let func_idx = code[pos];
        let argc = code[pos + 1] as usize;
        let mut cursor = pos + 2;

        if cursor + argc > code.len() {
            return Err(EvalError::Truncated { offset: cursor, expected: argc });
        }
        let arg_lens: Vec<usize> = code[cursor..cursor + argc].iter().map(|&b| b as usize).collect();
        cursor += argc;

        let mut args: Vec<&[u8]> = Vec::with_capacity(argc);
        for len in arg_lens {
            if cursor + len > code.len() {
                return Err(EvalError::Truncated { offset: cursor, expected: len });
            }
            args.push(&code[cursor..cursor + len]);
            cursor += len;
        }

        let entry = registry::get(func_idx).ok_or(EvalError::UnknownFunctionIndex(func_idx))?;
        let outcome = (entry.func)(self, &args)?;
        Ok((outcome, cursor))
    }
}

fn read_u8_len(code: &[u8], pos: usize) -> EvalResult<(usize, usize)> {
    if pos >= code.len() {
        return Err(EvalError::Truncated { offset: pos, expected: 1 });
    }
    Ok((code[pos] as usize, pos + 1))
}

fn read_i32_len(code: &[u8], pos: usize) -> EvalResult<(usize, usize)> {
    if pos + 4 > code.len() {
        return Err(EvalError::Truncated { offset: pos, expected: 4 });
    }
    let len = i32::from_le_bytes(code[pos..pos + 4].try_into().unwrap()).max(0) as usize;
    Ok((len, pos + 4))
}

/// Renders `ctx.idx+1`, or the track's 1-based position in the playlist
/// when no explicit index was supplied (§6 `FILENUMBER`).
fn render_file_number(ctx: &EvalContext) -> String {
    if ctx.flags.contains(ContextFlags::HAS_INDEX) {
        (ctx.idx + 1).to_string()
    } else {
        let track = ctx.track_or_empty();
        ctx.playlist_or_empty().index_of(track.as_ref(), ctx.iter).map(|i| (i + 1).to_string()).unwrap_or_default()
    }
}

/// Renders the queue-position marker (§6 `PLAYING`).
fn render_playing_marker(ctx: &EvalContext) -> String {
    let track = ctx.track_or_empty();
    ctx.play_queue_or_empty().position_of(track.as_ref()).map(|i| i.to_string()).unwrap_or_default()
}

/// Truncates `s` to at most `max_len` bytes without splitting a code point.
fn truncate_to_boundary(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// The public evaluator entry point (§4.2, §6).
///
/// Reserves the final byte of `out` for a NUL terminator and returns the
/// number of bytes written, excluding that terminator.
pub fn evaluate(
    ctx: &mut EvalContext,
    code: &Bytecode,
    config: &EngineConfig,
    out: &mut [u8],
) -> EvalResult<usize> {
    for b in out.iter_mut() {
        *b = 0;
    }
    if out.is_empty() {
        return Ok(0);
    }

    let outlen_cap = out.len() - 1;
    let rendered = if ctx.flags.contains(ContextFlags::HAS_ID) {
        match ctx.id {
            Some(ColumnId::FileNumber) => render_file_number(ctx),
            Some(ColumnId::Playing) => render_playing_marker(ctx),
            _ => {
                let mut interp = Interp::new(ctx, config, outlen_cap);
                interp.eval_block(code.program())?.text
            }
        }
    } else {
        let mut interp = Interp::new(ctx, config, outlen_cap);
        interp.eval_block(code.program())?.text
    };

    let budget = out.len() - 1;
    let truncated = truncate_to_boundary(&rendered, budget);
    let bytes = truncated.as_bytes();
    out[..bytes.len()].copy_from_slice(bytes);
    out[bytes.len()] = 0;
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::MapTrack;
    use crate::compiler;
    use std::sync::Arc;

    fn render(script: &str, track: MapTrack) -> String {
        let bc = compiler::compile(script).expect("compiles");
        let mut ctx = EvalContext::new().with_track(Arc::new(track));
        let config = EngineConfig::default();
        let mut buf = [0u8; 256];
        let n = evaluate(&mut ctx, &bc, &config, &mut buf).expect("evaluates");
        String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    #[test]
    fn literal_and_field_compose() {
        let out = render(
            "%artist% - %title%",
            MapTrack::new().with_meta("artist", "The Beatles").with_meta("title", "Let It Be"),
        );
        assert_eq!(out, "The Beatles - Let It Be");
    }

    #[test]
    fn if_defined_block_elides_when_undefined() {
        let out = render("[%artist% - ]%title%", MapTrack::new().with_meta("title", "Untitled"));
        assert_eq!(out, "Untitled");
    }

    #[test]
    fn output_is_truncated_at_utf8_boundary() {
        let bc = compiler::compile("h\u{00e9}llo").unwrap();
        let mut ctx = EvalContext::new();
        let config = EngineConfig::default();
        let mut buf = [0u8; 3];
        let n = evaluate(&mut ctx, &bc, &config, &mut buf).unwrap();
        assert!(std::str::from_utf8(&buf[..n]).is_ok());
        assert!(n < 2);
    }

    #[test]
    fn empty_script_yields_empty_output() {
        let bc = compiler::compile("").unwrap();
        let mut ctx = EvalContext::new();
        let config = EngineConfig::default();
        let mut buf = [0u8; 16];
        let n = evaluate(&mut ctx, &bc, &config, &mut buf).unwrap();
        assert_eq!(n, 0);
    }
}
