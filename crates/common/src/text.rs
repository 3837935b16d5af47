//! Input normalisation for free-text fields.

/// Trim and strip angle brackets so stored text cannot carry markup.
pub fn sanitize_input(input: &str) -> String {
    let stripped: String = input.chars().filter(|c| *c != '<' && *c != '>').collect();
    stripped.trim().to_string()
}

/// Cut `text` to at most `max` characters on a word boundary, appending `suffix`.
pub fn truncate(text: &str, max: usize, suffix: &str) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    let head = match cut.rfind(' ') {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{head}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_brackets_and_trims() {
        assert_eq!(sanitize_input("  <b>Main</b> St "), "bMain/b St");
        assert_eq!(sanitize_input(""), "");
        assert_eq!(sanitize_input(" < > "), "");
    }

    #[test]
    fn truncate_on_word_boundary() {
        assert_eq!(truncate("short", 10, "..."), "short");
        assert_eq!(truncate("leave at the back door", 12, "..."), "leave at...");
        assert_eq!(truncate("abcdefghij", 4, "~"), "abcd~");
    }
}
