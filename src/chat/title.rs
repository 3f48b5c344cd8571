//! Conversation titles derived from the first user message.

/// Appended to a title cut at the length limit.
pub const ELLIPSIS: &str = "...";

/// First `max_chars` characters of `message`, with [`ELLIPSIS`] appended when cut.
///
/// Counts Unicode scalar values, not bytes. A message of exactly `max_chars`
/// characters is kept whole, without ellipsis.
#[must_use]
pub fn derive_title(message: &str, max_chars: usize) -> String {
    let mut chars = message.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}{ELLIPSIS}")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_is_kept() {
        assert_eq!(derive_title("What is the fine for no helmet?", 50), "What is the fine for no helmet?");
    }

    #[test]
    fn boundary_gets_no_ellipsis() {
        let exact = "a".repeat(50);
        assert_eq!(derive_title(&exact, 50), exact);
    }

    #[test]
    fn long_message_is_ellipsized() {
        let long = "b".repeat(51);
        let title = derive_title(&long, 50);
        assert_eq!(title, format!("{}...", "b".repeat(50)));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let title = derive_title("₹₹₹₹", 3);
        assert_eq!(title, "₹₹₹...");
    }
}
