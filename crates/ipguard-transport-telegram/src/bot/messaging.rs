//! Message splitting helpers.
//!
//! Report chunks are built from at most 50 blocks, but a block count
//! says nothing about byte length; long chunks are additionally split
//! on line boundaries before dispatch.

/// Maximum message length for Telegram with safety margin.
/// Telegram's official limit is 4096; 4000 leaves room for the HTML
/// tags added by formatting.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

/// Split `message` into parts of at most `max_length` bytes, breaking
/// on line boundaries. A single line longer than `max_length` becomes
/// its own part rather than being cut mid-line.
#[must_use]
pub fn split_message(message: &str, max_length: usize) -> Vec<String> {
    if message.is_empty() {
        return Vec::new();
    }
    if message.len() <= max_length {
        return vec![message.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    for line in message.lines() {
        if !current.is_empty() && current.len() + line.len() + 1 > max_length {
            parts.push(current.trim_end().to_string());
            current.clear();
        }
        current.push_str(line);
        current.push('\n');
    }
    if !current.trim_end().is_empty() {
        parts.push(current.trim_end().to_string());
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_is_untouched() {
        assert_eq!(split_message("hello", 100), vec!["hello".to_string()]);
    }

    #[test]
    fn empty_message_yields_nothing() {
        assert!(split_message("", 100).is_empty());
    }

    #[test]
    fn long_message_splits_on_line_boundaries() {
        let message = (0..10)
            .map(|i| format!("line number {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        let parts = split_message(&message, 40);
        assert!(parts.len() > 1);
        for part in &parts {
            assert!(part.len() <= 40, "part too long: {part:?}");
        }
        // No line is lost or cut.
        let joined = parts.join("\n");
        assert_eq!(joined, message);
    }

    #[test]
    fn overlong_single_line_becomes_own_part() {
        let long_line = "x".repeat(120);
        let message = format!("short\n{long_line}\ntail");
        let parts = split_message(&message, 50);
        assert!(parts.contains(&long_line));
    }
}
