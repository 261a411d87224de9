//! Single-pass recursive-descent compiler (§4.1): turns a script string
//! into length-prefixed [`Bytecode`]. Arguments and if-defined bodies are
//! compiled by recursing into the same scanner machinery, never a separate
//! lexer/parser/AST stage — the grammar is small enough that a single state
//! bit (`eol`, for comment recognition) and a nesting counter are the only
//! state the scanner carries.

use crate::bytecode::{Bytecode, NODE_CALL, NODE_FIELD, NODE_IFDEF, NODE_LITERAL_RUN, SENTINEL};
use crate::error::{CompileError, CompileResult};
use crate::registry;

/// Compile-time nesting bound, well above the evaluator's own
/// `EngineConfig::max_recursion_depth` (default 64) so that legitimately
/// deep scripts (the ≥32-level boundary test) compile, while pathological
/// input still fails cleanly instead of blowing the compiler's own stack.
const MAX_COMPILE_DEPTH: u32 = 256;

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    eol: bool,
    depth: u32,
}

impl Scanner {
    fn new(script: &str) -> Self {
        Scanner { chars: script.chars().collect(), pos: 0, eol: true, depth: 0 }
    }

    fn child(raw: &str, depth: u32, eol: bool) -> Self {
        Scanner { chars: raw.chars().collect(), pos: 0, eol, depth }
    }

    fn remaining_is_comment_start(&self) -> bool {
        self.chars.get(self.pos) == Some(&'/') && self.chars.get(self.pos + 1) == Some(&'/')
    }

    /// Compiles nodes until EOF (`stop == None`) or until the first
    /// unescaped occurrence of `stop` (left unconsumed for the caller).
    /// Returns `(bytes, stopped_at_char)`; `stopped_at_char == false` with
    /// `stop.is_some()` means EOF was reached without finding it.
    fn compile_segment(&mut self, stop: Option<char>) -> CompileResult<(Vec<u8>, bool)> {
        let mut out = Vec::new();
        loop {
            if let Some(t) = stop {
                if self.chars.get(self.pos) == Some(&t) {
                    return Ok((out, true));
                }
            }
            if self.pos >= self.chars.len() {
                return Ok((out, false));
            }

            if self.eol && self.remaining_is_comment_start() {
                while self.pos < self.chars.len() && self.chars[self.pos] != '\n' {
                    self.pos += 1;
                }
                continue;
            }

            let c = self.chars[self.pos];
            match c {
                '\n' => {
                    self.pos += 1;
                    self.eol = true;
                }
                '\\' => {
                    self.pos += 1;
                    self.eol = false;
                    if let Some(&escaped) = self.chars.get(self.pos) {
                        self.pos += 1;
                        push_literal_char(&mut out, escaped);
                    }
                }
                '\'' => {
                    let start = self.pos;
                    self.pos += 1;
                    self.eol = false;
                    loop {
                        match self.chars.get(self.pos) {
                            Some('\'') => {
                                self.pos += 1;
                                break;
                            }
                            Some(&ch) => {
                                push_literal_char(&mut out, ch);
                                self.pos += 1;
                            }
                            None => return Err(CompileError::UnterminatedQuote(start)),
                        }
                    }
                }
                '%' => {
                    let start = self.pos;
                    self.pos += 1;
                    self.eol = false;
                    let name_start = self.pos;
                    while self.chars.get(self.pos).is_some_and(|&c| c != '%') {
                        self.pos += 1;
                    }
                    if self.pos >= self.chars.len() {
                        return Err(CompileError::UnterminatedField(start));
                    }
                    let name: String = self.chars[name_start..self.pos].iter().collect();
                    self.pos += 1;
                    let name_bytes = name.as_bytes();
                    if name_bytes.len() > 255 {
                        return Err(CompileError::FieldNameTooLong(name_bytes.len()));
                    }
                    out.push(SENTINEL);
                    out.push(NODE_FIELD);
                    out.push(name_bytes.len() as u8);
                    out.extend_from_slice(name_bytes);
                }
                '[' => {
                    let start = self.pos;
                    self.pos += 1;
                    self.eol = false;
                    self.depth += 1;
                    if self.depth > MAX_COMPILE_DEPTH {
                        return Err(CompileError::TooDeeplyNested(MAX_COMPILE_DEPTH));
                    }
                    let (body, closed) = self.compile_segment(Some(']'))?;
                    self.depth -= 1;
                    if !closed {
                        return Err(CompileError::UnterminatedBlock(start));
                    }
                    self.pos += 1; // consume ']'
                    if body.len() > i32::MAX as usize {
                        return Err(CompileError::ArgumentTooLong(body.len()));
                    }
                    out.push(SENTINEL);
                    out.push(NODE_IFDEF);
                    out.extend_from_slice(&(body.len() as i32).to_le_bytes());
                    out.extend_from_slice(&body);
                }
                '$' => {
                    let start = self.pos;
                    self.pos += 1;
                    let name_start = self.pos;
                    while self.chars.get(self.pos).is_some_and(|&c| c.is_ascii_alphanumeric() || c == '_') {
                        self.pos += 1;
                    }
                    let name: String = self.chars[name_start..self.pos].iter().collect();
                    if self.chars.get(self.pos) != Some(&'(') {
                        return Err(CompileError::UnterminatedCall(start));
                    }
                    self.pos += 1; // consume '('
                    self.eol = false;
                    let func_idx =
                        registry::index_of(&name).ok_or_else(|| CompileError::UnknownFunction(name.clone()))?;
                    let raw_args = self.read_call_args(start)?;

                    self.depth += 1;
                    if self.depth > MAX_COMPILE_DEPTH {
                        return Err(CompileError::TooDeeplyNested(MAX_COMPILE_DEPTH));
                    }
                    let mut compiled_args = Vec::with_capacity(raw_args.len());
                    for raw in &raw_args {
                        let mut child = Scanner::child(raw, self.depth, self.eol);
                        let (bytes, _) = child.compile_segment(None)?;
                        if bytes.len() > 255 {
                            return Err(CompileError::ArgumentTooLong(bytes.len()));
                        }
                        compiled_args.push(bytes);
                    }
                    self.depth -= 1;

                    out.push(SENTINEL);
                    out.push(NODE_CALL);
                    out.push(func_idx);
                    out.push(compiled_args.len() as u8);
                    for bytes in &compiled_args {
                        out.push(bytes.len() as u8);
                    }
                    for bytes in &compiled_args {
                        out.extend_from_slice(bytes);
                    }
                }
                _ => {
                    push_literal_char(&mut out, c);
                    self.pos += 1;
                    self.eol = false;
                }
            }
        }
    }

    /// Reads a parenthesized, comma-separated argument list starting right
    /// after the opening `(`, respecting nested parens/brackets and quoted
    /// spans, and leaves `self.pos` just past the matching `)`.
    fn read_call_args(&mut self, call_start: usize) -> CompileResult<Vec<String>> {
        let mut args = Vec::new();
        let mut current = String::new();
        let mut depth = 0i32;

        loop {
            match self.chars.get(self.pos) {
                None => return Err(CompileError::UnterminatedCall(call_start)),
                Some('\\') => {
                    current.push('\\');
                    self.pos += 1;
                    if let Some(&escaped) = self.chars.get(self.pos) {
                        current.push(escaped);
                        self.pos += 1;
                    }
                }
                Some('\'') => {
                    current.push('\'');
                    self.pos += 1;
                    loop {
                        match self.chars.get(self.pos) {
                            Some('\'') => {
                                current.push('\'');
                                self.pos += 1;
                                break;
                            }
                            Some(&ch) => {
                                current.push(ch);
                                self.pos += 1;
                            }
                            None => return Err(CompileError::UnterminatedQuote(call_start)),
                        }
                    }
                }
                Some(&c @ ('(' | '[')) => {
                    depth += 1;
                    current.push(c);
                    self.pos += 1;
                }
                Some(&')') if depth == 0 => {
                    self.pos += 1;
                    if !(args.is_empty() && current.is_empty()) {
                        args.push(std::mem::take(&mut current));
                    }
                    return Ok(args);
                }
                Some(&c @ (')' | ']')) => {
                    depth -= 1;
                    current.push(c);
                    self.pos += 1;
                }
                Some(&',') if depth == 0 => {
                    args.push(std::mem::take(&mut current));
                    self.pos += 1;
                }
                Some(&c) => {
                    current.push(c);
                    self.pos += 1;
                }
            }
        }
    }
}

fn push_literal_char(out: &mut Vec<u8>, c: char) {
    if c == '\0' {
        // The sentinel byte is reserved for control nodes; a literal NUL
        // is instead carried as a one-byte pre-interpreted run so it never
        // appears bare in the program stream.
        out.push(SENTINEL);
        out.push(NODE_LITERAL_RUN);
        out.extend_from_slice(&1i32.to_le_bytes());
        out.push(0);
    } else {
        let mut buf = [0u8; 4];
        out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    }
}

/// Compiles a script into bytecode (§4.1, §6 `compile`).
pub fn compile(script: &str) -> CompileResult<Bytecode> {
    let mut scanner = Scanner::new(script);
    let (program, _) = scanner.compile_segment(None)?;
    Ok(Bytecode::from_program(&program))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::HEADER_LEN;

    #[test]
    fn empty_script_compiles_to_empty_program() {
        let bc = compile("").unwrap();
        assert_eq!(bc.declared_len(), 0);
    }

    #[test]
    fn literal_text_passes_through() {
        let bc = compile("hello").unwrap();
        assert_eq!(bc.program(), b"hello");
    }

    #[test]
    fn field_reference_encodes_name_length_prefix() {
        let bc = compile("%artist%").unwrap();
        assert_eq!(bc.program(), &[SENTINEL, NODE_FIELD, 6, b'a', b'r', b't', b'i', b's', b't']);
    }

    #[test]
    fn unknown_function_is_a_compile_error() {
        assert_eq!(compile("$nope(1)"), Err(CompileError::UnknownFunction("nope".to_string())));
    }

    #[test]
    fn unterminated_field_is_a_compile_error() {
        assert!(matches!(compile("%artist"), Err(CompileError::UnterminatedField(_))));
    }

    #[test]
    fn unterminated_block_is_a_compile_error() {
        assert!(matches!(compile("[%artist%"), Err(CompileError::UnterminatedBlock(_))));
    }

    #[test]
    fn empty_call_has_zero_argc() {
        let bc = compile("$crlf()").unwrap();
        // sentinel, call, func_idx, argc=0
        assert_eq!(bc.program()[3], 0);
    }

    #[test]
    fn field_name_over_255_bytes_is_rejected() {
        let long_name = "x".repeat(256);
        let script = format!("%{}%", long_name);
        assert!(matches!(compile(&script), Err(CompileError::FieldNameTooLong(256))));
    }

    #[test]
    fn deeply_nested_blocks_compile() {
        let script = format!("{}X{}", "[".repeat(32), "]".repeat(32));
        assert!(compile(&script).is_ok());
    }

    #[test]
    fn quoted_span_bypasses_metacharacters() {
        let bc = compile("'100% $literal'").unwrap();
        assert_eq!(bc.program(), "100% $literal".as_bytes());
    }

    #[test]
    fn comment_at_start_of_line_is_dropped() {
        let bc = compile("// a comment\nhello").unwrap();
        assert_eq!(bc.program(), b"hello");
    }

    #[test]
    fn nested_call_arguments_round_trip() {
        let bc = compile("$if($strcmp(a,a),yes,no)").unwrap();
        assert!(bc.declared_len() > HEADER_LEN);
    }

    #[test]
    fn comment_marker_inside_a_call_argument_is_not_dropped() {
        // A call argument never starts at beginning-of-line just because
        // it follows '(' or ','; the scanner's `eol` bit must carry over
        // from the enclosing call, not reset to true per argument, or
        // `//x` here would be mistaken for a comment and compile away.
        let bc = compile("$strcmp(//x,//x)").unwrap();
        let program = bc.program();
        assert_eq!(program[3], 2, "argc");
        assert_eq!(program[4], 3, "first arg compiles to \"//x\" (3 bytes)");
        assert_eq!(program[5], 3, "second arg compiles to \"//x\" (3 bytes)");
    }
}
