//! Outgoing text preparation for PRIVMSG.
//!
//! A server truncates anything past 512 bytes per line including the prefix
//! it prepends, so long replies are split before sending.

/// Replace line breaks and NULs so a single `say` can never inject a second command.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\r' | '\n' | '\0' => ' ',
            other => other,
        })
        .collect()
}

/// Split `text` into chunks of at most `max_bytes` bytes, preferring to break
/// on the last space in the window and never cutting a UTF-8 character.
pub fn split_chunks(text: &str, max_bytes: usize) -> Vec<String> {
    if text.len() <= max_bytes {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > max_bytes {
        let mut window_end = max_bytes;
        while !remaining.is_char_boundary(window_end) {
            window_end -= 1;
        }
        let window = &remaining[..window_end];
        let split_at = match window.rfind(' ') {
            Some(i) if i > 0 => i,
            _ => window_end,
        };
        // A single character wider than max_bytes still has to go out.
        let split_at = if split_at == 0 {
            remaining.chars().next().map(char::len_utf8).unwrap_or(1)
        } else {
            split_at
        };

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start_matches(' ');
    }

    if !remaining.is_empty() {
        chunks.push(remaining.to_string());
    }

    chunks
}
