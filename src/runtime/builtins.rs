//! Built-in function implementations (§4.4). Each function matches the
//! [`crate::runtime::interpreter::BuiltinFn`] signature: it receives the
//! raw, unevaluated compiled bytes of each of its call arguments, so it can
//! choose which ones to actually evaluate (short-circuit booleans, `if`'s
//! untaken branch, etc).

use crate::error::{EvalError, EvalResult};
use crate::runtime::fields::ext_of;
use crate::runtime::format::directory_level;
use crate::runtime::interpreter::{CallOutcome, Interp};

fn arity(name: &'static str, expected: &'static str, got: usize) -> EvalError {
    EvalError::Arity { name, expected, got }
}

fn eval_int(interp: &mut Interp, bytes: &[u8]) -> EvalResult<i64> {
    Ok(crate::runtime::format::parse_leading_int(&interp.eval_arg_text(bytes)?))
}

fn eval_float(interp: &mut Interp, bytes: &[u8]) -> EvalResult<f64> {
    Ok(crate::runtime::format::parse_leading_float(&interp.eval_arg_text(bytes)?))
}

// ---- Control flow -------------------------------------------------------

pub fn if_(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() < 2 || args.len() > 3 {
        return Err(arity("if", "2 or 3", args.len()));
    }
    let cond = interp.eval_arg(args[0])?;
    if cond.truthy {
        interp.eval_arg(args[1])
    } else if let Some(else_branch) = args.get(2) {
        interp.eval_arg(else_branch)
    } else {
        Ok(CallOutcome::empty())
    }
}

pub fn if2(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 2 {
        return Err(arity("if2", "2", args.len()));
    }
    let cond = interp.eval_arg(args[0])?;
    if cond.truthy {
        Ok(cond)
    } else {
        interp.eval_arg(args[1])
    }
}

pub fn if3(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.is_empty() {
        return Err(arity("if3", "at least 1", args.len()));
    }
    for (i, arg) in args.iter().enumerate() {
        let outcome = interp.eval_arg(arg)?;
        if outcome.truthy || i == args.len() - 1 {
            return Ok(outcome);
        }
    }
    unreachable!("last argument always returns")
}

pub fn ifequal(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 4 {
        return Err(arity("ifequal", "4", args.len()));
    }
    let a = eval_int(interp, args[0])?;
    let b = eval_int(interp, args[1])?;
    interp.eval_arg(args[if a == b { 2 } else { 3 }])
}

pub fn ifgreater(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 4 {
        return Err(arity("ifgreater", "4", args.len()));
    }
    let a = eval_int(interp, args[0])?;
    let b = eval_int(interp, args[1])?;
    interp.eval_arg(args[if a > b { 2 } else { 3 }])
}

pub fn iflonger(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 4 {
        return Err(arity("iflonger", "4", args.len()));
    }
    let a = interp.eval_arg_text(args[0])?;
    let b = interp.eval_arg_text(args[1])?;
    interp.eval_arg(args[if a.chars().count() > b.chars().count() { 2 } else { 3 }])
}

pub fn select(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() < 2 {
        return Err(arity("select", "at least 2", args.len()));
    }
    let n = eval_int(interp, args[0])?;
    let choices = &args[1..];
    if n >= 1 && (n as usize) <= choices.len() {
        interp.eval_arg(choices[(n - 1) as usize])
    } else {
        Ok(CallOutcome::empty())
    }
}

// ---- Arithmetic ---------------------------------------------------------

pub fn add(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.is_empty() {
        return Err(arity("add", "at least 1", args.len()));
    }
    let mut total = 0i64;
    for a in args {
        total += eval_int(interp, a)?;
    }
    Ok(CallOutcome::value(total.to_string()))
}

pub fn sub(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() < 2 {
        return Err(arity("sub", "at least 2", args.len()));
    }
    let mut total = eval_int(interp, args[0])?;
    for a in &args[1..] {
        total -= eval_int(interp, a)?;
    }
    Ok(CallOutcome::value(total.to_string()))
}

pub fn mul(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() < 2 {
        return Err(arity("mul", "at least 2", args.len()));
    }
    let mut total = eval_int(interp, args[0])?;
    for a in &args[1..] {
        total *= eval_int(interp, a)?;
    }
    Ok(CallOutcome::value(total.to_string()))
}

pub fn div(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 2 {
        return Err(arity("div", "2", args.len()));
    }
    let a = eval_float(interp, args[0])?;
    let b = eval_float(interp, args[1])?;
    if b == 0.0 {
        return Err(EvalError::BuiltinFailed("div"));
    }
    Ok(CallOutcome::value((a / b).round().to_string()))
}

pub fn modulo(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 2 {
        return Err(arity("mod", "2", args.len()));
    }
    let a = eval_int(interp, args[0])?;
    let b = eval_int(interp, args[1])?;
    if b == 0 {
        return Err(EvalError::BuiltinFailed("mod"));
    }
    Ok(CallOutcome::value((a % b).to_string()))
}

pub fn muldiv(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 3 {
        return Err(arity("muldiv", "3", args.len()));
    }
    let a = eval_float(interp, args[0])?;
    let b = eval_float(interp, args[1])?;
    let c = eval_float(interp, args[2])?;
    if c == 0.0 {
        return Err(EvalError::BuiltinFailed("muldiv"));
    }
    Ok(CallOutcome::value((a * b / c).round().to_string()))
}

pub fn min(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.is_empty() {
        return Err(arity("min", "at least 1", args.len()));
    }
    let mut best = eval_int(interp, args[0])?;
    for a in &args[1..] {
        best = best.min(eval_int(interp, a)?);
    }
    Ok(CallOutcome::value(best.to_string()))
}

pub fn max(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.is_empty() {
        return Err(arity("max", "at least 1", args.len()));
    }
    let mut best = eval_int(interp, args[0])?;
    for a in &args[1..] {
        best = best.max(eval_int(interp, a)?);
    }
    Ok(CallOutcome::value(best.to_string()))
}

pub fn greater(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 2 {
        return Err(arity("greater", "2", args.len()));
    }
    let a = eval_int(interp, args[0])?;
    let b = eval_int(interp, args[1])?;
    Ok(CallOutcome::bool_only(a > b))
}

pub fn rand_(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if !args.is_empty() {
        return Err(arity("rand", "0", args.len()));
    }
    let _ = interp;
    let value: u32 = rand::random();
    Ok(CallOutcome::value(value.to_string()))
}

// ---- Boolean -------------------------------------------------------------

pub fn and(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.is_empty() {
        return Err(arity("and", "at least 1", args.len()));
    }
    for a in args {
        if !interp.eval_arg_truthy(a)? {
            return Ok(CallOutcome::bool_only(false));
        }
    }
    Ok(CallOutcome::bool_only(true))
}

pub fn or(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.is_empty() {
        return Err(arity("or", "at least 1", args.len()));
    }
    for a in args {
        if interp.eval_arg_truthy(a)? {
            return Ok(CallOutcome::bool_only(true));
        }
    }
    Ok(CallOutcome::bool_only(false))
}

pub fn not(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 1 {
        return Err(arity("not", "1", args.len()));
    }
    let truthy = interp.eval_arg_truthy(args[0])?;
    Ok(CallOutcome::bool_only(!truthy))
}

pub fn xor(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.is_empty() {
        return Err(arity("xor", "at least 1", args.len()));
    }
    let mut acc = false;
    for a in args {
        acc ^= interp.eval_arg_truthy(a)?;
    }
    Ok(CallOutcome::bool_only(acc))
}

// ---- String --------------------------------------------------------------

fn is_word_boundary(c: char) -> bool {
    matches!(c, '(' | ')' | ' ' | ',' | '/' | '\\' | '|')
}

pub fn abbr(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.is_empty() || args.len() > 2 {
        return Err(arity("abbr", "1 or 2", args.len()));
    }
    let text = interp.eval_arg_text(args[0])?;
    if let Some(n_arg) = args.get(1) {
        let n = eval_int(interp, n_arg)?;
        if n >= 0 && (text.chars().count() as i64) <= n {
            return Ok(CallOutcome::value(text));
        }
    }

    let mut out = String::new();
    let mut in_bracket = false;
    let mut at_word_start = true;
    for c in text.chars() {
        match c {
            '[' => {
                in_bracket = true;
                out.push(c);
            }
            ']' => {
                in_bracket = false;
                out.push(c);
            }
            _ if in_bracket => out.push(c),
            _ if is_word_boundary(c) => {
                at_word_start = true;
            }
            _ if at_word_start => {
                out.push(c);
                at_word_start = false;
            }
            _ => {}
        }
    }
    Ok(CallOutcome::value(out))
}

pub fn caps(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 1 {
        return Err(arity("caps", "1", args.len()));
    }
    Ok(CallOutcome::value(title_case(&interp.eval_arg_text(args[0])?, true)))
}

pub fn caps2(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 1 {
        return Err(arity("caps2", "1", args.len()));
    }
    Ok(CallOutcome::value(title_case(&interp.eval_arg_text(args[0])?, false)))
}

/// Shared by `caps`/`caps2` (§9: bracketed spans are preserved literally,
/// matching `abbr`'s word-boundary handling rather than the inverted
/// casing of the original).
fn title_case(text: &str, lower_tail: bool) -> String {
    let mut out = String::new();
    let mut in_bracket = false;
    let mut at_word_start = true;
    for c in text.chars() {
        match c {
            '[' => {
                in_bracket = true;
                out.push(c);
            }
            ']' => {
                in_bracket = false;
                out.push(c);
            }
            _ if in_bracket => out.push(c),
            _ if is_word_boundary(c) => {
                out.push(c);
                at_word_start = true;
            }
            _ if at_word_start => {
                out.extend(c.to_uppercase());
                at_word_start = false;
            }
            _ if lower_tail => out.extend(c.to_lowercase()),
            _ => out.push(c),
        }
    }
    out
}

pub fn char_(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 1 {
        return Err(arity("char", "1", args.len()));
    }
    let n = eval_int(interp, args[0])?;
    let code_point = u32::try_from(n).map_err(|_| EvalError::BuiltinFailed("char"))?;
    let c = char::from_u32(code_point).ok_or(EvalError::BuiltinFailed("char"))?;
    Ok(CallOutcome::value(c.to_string()))
}

pub fn crc32(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 1 {
        return Err(arity("crc32", "1", args.len()));
    }
    let text = interp.eval_arg_text(args[0])?;
    let checksum = crc32fast::hash(text.as_bytes());
    Ok(CallOutcome::value(checksum.to_string()))
}

pub fn crlf(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if !args.is_empty() {
        return Err(arity("crlf", "0", args.len()));
    }
    let _ = interp;
    Ok(CallOutcome::value("\n"))
}

pub fn left(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 2 {
        return Err(arity("left", "2", args.len()));
    }
    let text = interp.eval_arg_text(args[0])?;
    let n = eval_int(interp, args[1])?.max(0) as usize;
    Ok(CallOutcome::value(text.chars().take(n).collect::<String>()))
}

pub fn directory(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.is_empty() || args.len() > 2 {
        return Err(arity("directory", "1 or 2", args.len()));
    }
    let path = interp.eval_arg_text(args[0])?;
    let levels = match args.get(1) {
        Some(a) => eval_int(interp, a)?.max(1) as usize,
        None => 1,
    };
    Ok(CallOutcome::value(directory_level(&path, levels)))
}

pub fn directory_path(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 1 {
        return Err(arity("directory_path", "1", args.len()));
    }
    let path = interp.eval_arg_text(args[0])?;
    Ok(CallOutcome::value(crate::runtime::format::directory_path(&path)))
}

pub fn ext(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 1 {
        return Err(arity("ext", "1", args.len()));
    }
    let path = interp.eval_arg_text(args[0])?;
    Ok(CallOutcome::value(ext_of(&path)))
}

pub fn filename(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 1 {
        return Err(arity("filename", "1", args.len()));
    }
    let path = interp.eval_arg_text(args[0])?;
    Ok(CallOutcome::value(crate::runtime::format::basename(&path)))
}

pub fn strcmp(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 2 {
        return Err(arity("strcmp", "2", args.len()));
    }
    let a = interp.eval_arg_text(args[0])?;
    let b = interp.eval_arg_text(args[1])?;
    Ok(CallOutcome::bool_only(a == b))
}

pub fn ansi(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 1 {
        return Err(arity("ansi", "1", args.len()));
    }
    interp.eval_arg(args[0])
}

pub fn ascii(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 1 {
        return Err(arity("ascii", "1", args.len()));
    }
    let text = interp.eval_arg_text(args[0])?;
    Ok(CallOutcome::value(crate::ascii::transcode(&text)))
}

// ---- Track info ------------------------------------------------------------

pub fn meta(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if args.len() != 1 {
        return Err(arity("meta", "1", args.len()));
    }
    let key = interp.eval_arg_text(args[0])?;
    match interp.ctx.track_or_empty().find_meta(&key) {
        Some(value) => Ok(CallOutcome::value(value)),
        None => Ok(CallOutcome::empty()),
    }
}

pub fn channels(interp: &mut Interp, args: &[&[u8]]) -> EvalResult<CallOutcome> {
    if !args.is_empty() {
        return Err(arity("channels", "0", args.len()));
    }
    match crate::runtime::fields::resolve(interp.ctx, "channels") {
        Some(value) => Ok(CallOutcome::value(value)),
        None => Ok(CallOutcome::empty()),
    }
}

#[cfg(test)]
mod tests {
    use crate::compiler;
    use crate::config::EngineConfig;
    use crate::runtime::context::EvalContext;
    use crate::runtime::interpreter::evaluate;

    fn render(script: &str) -> String {
        let bc = compiler::compile(script).expect("compiles");
        let mut ctx = EvalContext::new();
        let config = EngineConfig::default();
        let mut buf = [0u8; 256];
        let n = evaluate(&mut ctx, &bc, &config, &mut buf).expect("evaluates");
        String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    #[test]
    fn arithmetic_tolerates_leading_digit_quirk() {
        assert_eq!(render("$add(3abc,2)"), "5");
        assert_eq!(render("$sub(10,3,2)"), "5");
        assert_eq!(render("$mul(2,3,4)"), "24");
    }

    #[test]
    fn div_and_mod_fail_on_zero_inside_brackets() {
        assert_eq!(render("[$div(1,0)]fallback"), "fallback");
        assert_eq!(render("[$mod(1,0)]fallback"), "fallback");
    }

    #[test]
    fn and_short_circuits_before_evaluating_second_argument() {
        assert_eq!(render("$and($strcmp(a,b),[%missing%])"), "");
    }

    #[test]
    fn caps_is_idempotent_on_ascii_words() {
        let once = render("$caps(the quick fox)");
        let twice = render(&format!("$caps({})", once));
        assert_eq!(once, twice);
    }

    #[test]
    fn left_is_idempotent() {
        assert_eq!(render("$left(hello,3)"), "hel");
        assert_eq!(render("$left($left(hello,3),3)"), "hel");
    }

    #[test]
    fn crc32_matches_known_vectors() {
        assert_eq!(render("$crc32('')"), "0");
        assert_eq!(render("$crc32(123456789)"), "3421780262");
    }

    #[test]
    fn select_picks_one_based_argument() {
        assert_eq!(render("$select(2,a,b,c)"), "b");
        assert_eq!(render("$select(9,a,b,c)"), "");
    }

    #[test]
    fn strcmp_of_two_empty_fields_is_true() {
        assert_eq!(render("$if($strcmp(%artist%,%artist%),yes,no)"), "yes");
    }
}
