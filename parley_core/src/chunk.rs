//! Splitting model output into messages that fit a platform's size limit.
//!
//! Two algorithms, deliberately kept apart:
//! - [`split_lines`] for natural-language replies: greedy, never breaks a
//!   line.
//! - [`split_fixed`] for structured payloads such as JSON reports: hard
//!   slices every `limit` characters.
//!
//! All lengths are measured in characters, not bytes.

/// Chunk size used by every front-end. Leaves headroom under the
/// 2000-character per-message limit of the chat platforms.
pub const DEFAULT_CHUNK_LIMIT: usize = 1900;

/// Greedy line-preserving split.
///
/// Each line of `text` (split on `'\n'`) is appended to the current chunk
/// followed by a newline. When adding a line would push a non-empty chunk
/// past `limit`, the chunk is emitted first. A line longer than `limit` is
/// kept whole and ends up alone in an over-length chunk. The last chunk is
/// always emitted, so empty input yields a single `"\n"`.
///
/// Concatenating the result gives back `text` with one trailing newline.
#[must_use]
pub fn split_lines(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut chunk = String::new();
    let mut chunk_len = 0_usize;

    for line in text.split('\n') {
        let line_len = line.chars().count();
        if chunk_len > 0 && chunk_len + line_len + 1 > limit {
            chunks.push(std::mem::take(&mut chunk));
            chunk_len = 0;
        }
        chunk.push_str(line);
        chunk.push('\n');
        chunk_len += line_len + 1;
    }
    chunks.push(chunk);

    chunks
}

/// Fixed-width split: every chunk is exactly `limit` characters except the
/// last. Empty input yields no chunks.
#[must_use]
pub fn split_fixed(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(limit)
        .map(|slice| slice.iter().collect())
        .collect()
}
