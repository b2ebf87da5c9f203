//! Fixed-size window splitting used on the fallback path and for
//! oversized regions the structural pass cannot subdivide further.

/// Compute byte spans of overlapping character windows over `text`.
///
/// Windows are `chunk_size` characters long and start `step` characters
/// apart, so consecutive windows share `chunk_size - step` characters.
/// Spans always land on char boundaries and the final window runs to the
/// end of the text, possibly shorter than `chunk_size`.
pub fn window_spans(text: &str, chunk_size: usize, step: usize) -> Vec<(usize, usize)> {
    debug_assert!(chunk_size > 0);
    debug_assert!(step > 0 && step <= chunk_size);

    if text.is_empty() {
        return Vec::new();
    }

    // Byte offset of every char boundary, including the end of the text.
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    let total_chars = boundaries.len() - 1;

    let mut spans = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + chunk_size).min(total_chars);
        spans.push((boundaries[start], boundaries[end]));
        if end == total_chars {
            break;
        }
        start += step;
    }

    spans
}
