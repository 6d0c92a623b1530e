//! Text chunking for destination message size limits
//!
//! Discord rejects webhook posts whose `content` exceeds 2000 characters, so
//! forwarded text is cut into consecutive pieces before sending. Splitting
//! counts `char`s rather than bytes so multi-byte characters are never cut.

/// Discord's per-message `content` limit
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Split `text` into consecutive chunks of at most `max_len` characters.
///
/// Every chunk except possibly the last holds exactly `max_len` characters,
/// and concatenating the chunks reproduces `text`. An empty input yields no
/// chunks. A `max_len` of 0 disables splitting.
///
/// # Examples
///
/// ```
/// use line_relay::channels::chunking::split;
///
/// assert_eq!(split("abcde", 2), vec!["ab", "cd", "e"]);
/// assert!(split("", 10).is_empty());
/// ```
#[must_use]
pub fn split(text: &str, max_len: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    if max_len == 0 || text.chars().count() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == max_len {
            chunks.push(text[start..idx].to_string());
            start = idx;
            count = 0;
        }
        count += 1;
    }
    chunks.push(text[start..].to_string());

    chunks
}
