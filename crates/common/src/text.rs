//! Small text helpers shared by logging call sites.

/// Truncate `s` to at most `max_chars` characters for log previews,
/// appending an ellipsis when anything was cut.
///
/// Operates on characters, not bytes, so multi-byte content is never split.
#[must_use]
pub fn preview(s: &str, max_chars: usize) -> String {
    let mut it = s.chars();
    let head: String = it.by_ref().take(max_chars).collect();
    if it.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_pass_through() {
        assert_eq!(preview("hello", 10), "hello");
        assert_eq!(preview("", 10), "");
    }

    #[test]
    fn long_strings_are_cut_with_ellipsis() {
        assert_eq!(preview("hello world", 5), "hello…");
    }

    #[test]
    fn multibyte_boundaries_are_respected() {
        assert_eq!(preview("áéíóú", 3), "áéí…");
    }

    #[test]
    fn exact_length_has_no_ellipsis() {
        assert_eq!(preview("abcde", 5), "abcde");
    }
}
