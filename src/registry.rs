//! The built-in function registry (§3 "Function registry entry", §9
//! "Registry as ABI").
//!
//! Order here is the bytecode ABI: the compiler resolves `$name(...)` to
//! the index of its entry in [`BUILTINS`], and the evaluator dispatches on
//! that index. Never reorder or remove an entry without also invalidating
//! any previously-compiled bytecode — this crate only ever compiles and
//! evaluates against the one static table below, so the invariant holds
//! automatically within a single build.

use crate::runtime::builtins as funcs;
use crate::runtime::interpreter::BuiltinFn;

pub struct RegistryEntry {
    pub name: &'static str,
    pub func: BuiltinFn,
}

/// The ordered, index-stable table. Capacity is implicitly bounded by the
/// one-byte function index encoded in bytecode (§3: "≤ 255 entries").
pub static BUILTINS: &[RegistryEntry] = &[
    RegistryEntry { name: "if", func: funcs::if_ },
    RegistryEntry { name: "if2", func: funcs::if2 },
    RegistryEntry { name: "if3", func: funcs::if3 },
    RegistryEntry { name: "ifequal", func: funcs::ifequal },
    RegistryEntry { name: "ifgreater", func: funcs::ifgreater },
    RegistryEntry { name: "iflonger", func: funcs::iflonger },
    RegistryEntry { name: "select", func: funcs::select },
    RegistryEntry { name: "add", func: funcs::add },
    RegistryEntry { name: "sub", func: funcs::sub },
    RegistryEntry { name: "mul", func: funcs::mul },
    RegistryEntry { name: "div", func: funcs::div },
    RegistryEntry { name: "mod", func: funcs::modulo },
    RegistryEntry { name: "muldiv", func: funcs::muldiv },
    RegistryEntry { name: "min", func: funcs::min },
    RegistryEntry { name: "max", func: funcs::max },
    RegistryEntry { name: "greater", func: funcs::greater },
    RegistryEntry { name: "rand", func: funcs::rand_ },
    RegistryEntry { name: "and", func: funcs::and },
    RegistryEntry { name: "or", func: funcs::or },
    RegistryEntry { name: "not", func: funcs::not },
    RegistryEntry { name: "xor", func: funcs::xor },
    RegistryEntry { name: "abbr", func: funcs::abbr },
    RegistryEntry { name: "caps", func: funcs::caps },
    RegistryEntry { name: "caps2", func: funcs::caps2 },
    RegistryEntry { name: "char", func: funcs::char_ },
    RegistryEntry { name: "crc32", func: funcs::crc32 },
    RegistryEntry { name: "crlf", func: funcs::crlf },
    RegistryEntry { name: "left", func: funcs::left },
    RegistryEntry { name: "cut", func: funcs::left },
    RegistryEntry { name: "directory", func: funcs::directory },
    RegistryEntry { name: "directory_path", func: funcs::directory_path },
    RegistryEntry { name: "ext", func: funcs::ext },
    RegistryEntry { name: "filename", func: funcs::filename },
    RegistryEntry { name: "strcmp", func: funcs::strcmp },
    RegistryEntry { name: "ansi", func: funcs::ansi },
    RegistryEntry { name: "ascii", func: funcs::ascii },
    RegistryEntry { name: "meta", func: funcs::meta },
    RegistryEntry { name: "channels", func: funcs::channels },
];

/// Name-to-index lookup used by the compiler. Exact string equality, as
/// specified (§4.1).
pub fn index_of(name: &str) -> Option<u8> {
    BUILTINS.iter().position(|e| e.name == name).map(|i| i as u8)
}

/// Index-to-implementation dispatch used by the evaluator.
pub fn get(index: u8) -> Option<&'static RegistryEntry> {
    BUILTINS.get(index as usize)
}
