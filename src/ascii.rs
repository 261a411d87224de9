//! UTF-8 → ASCII transcoding, backing the `ascii()` built-in.
//!
//! Stands in for the original's `iconv(..., "utf-8", "ascii")` collaborator
//! (§6). Characters without a plain ASCII rendering fall back to `?`,
//! matching `iconv`'s `//TRANSLIT`-less default behavior rather than
//! failing the whole conversion.
pub fn transcode(text: &str) -> String {
    text.chars().map(|c| if c.is_ascii() { c } else { '?' }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_chars_pass_through_unchanged() {
        assert_eq!(transcode("Hello, World!"), "Hello, World!");
    }

    #[test]
    fn non_ascii_chars_become_question_marks() {
        assert_eq!(transcode("Caf\u{e9}"), "Caf?");
    }
}
