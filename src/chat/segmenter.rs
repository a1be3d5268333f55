/// Separates consecutive chat bubbles inside one reply body.
pub const BUBBLE_SEPARATOR: &str = "|||";

/// Splits a reply body into display chunks, in order, dropping blanks.
pub fn segment(body: &str) -> Vec<String> {
    body.split(BUBBLE_SEPARATOR)
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(String::from)
        .collect()
}
