// SPDX-FileCopyrightText: 2026 Kash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Line-boundary splitting of long replies.

/// Splits `text` into chunks of at most `max_len` chars on `sep` boundaries.
///
/// Lines are accumulated greedily; the line that would overflow starts the
/// next chunk. A single line longer than `max_len` becomes its own chunk and
/// is never cut. Joining the result with `sep` gives back `text`.
///
/// An empty `text` yields no chunks. An empty `sep` yields `text` unsplit.
pub fn split(text: &str, max_len: usize, sep: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if sep.is_empty() {
        return vec![text.to_string()];
    }

    let sep_len = sep.chars().count();
    let mut chunks = Vec::new();
    let mut current: Option<(String, usize)> = None;

    for line in text.split(sep) {
        let line_len = line.chars().count();
        current = match current.take() {
            None => Some((line.to_string(), line_len)),
            Some((mut chunk, len)) if len + sep_len + line_len <= max_len => {
                chunk.push_str(sep);
                chunk.push_str(line);
                Some((chunk, len + sep_len + line_len))
            }
            Some((chunk, _)) => {
                chunks.push(chunk);
                Some((line.to_string(), line_len))
            }
        };
    }

    if let Some((chunk, _)) = current {
        chunks.push(chunk);
    }
    chunks
}
