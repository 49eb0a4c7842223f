//! String similarity scoring
//!
//! The default [`TokenSortRatio`] lowercases both strings, turns every
//! non-alphanumeric character into a separator, sorts the resulting tokens and
//! compares the rejoined strings with the Indel ratio from `rapidfuzz`,
//! scaled to `0..=100` and rounded. Word order is discarded, so
//! fragments reassembled out of order from several quads still score high.

/// Similarity in `0..=100` between two strings
pub trait Scorer: Send + Sync {
    fn score(&self, a: &str, b: &str) -> u8;
}

/// Token-order-insensitive ratio
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenSortRatio;

impl Scorer for TokenSortRatio {
    fn score(&self, a: &str, b: &str) -> u8 {
        ratio(&normalize(a), &normalize(b))
    }
}

/// Lowercased, punctuation-free tokens sorted and joined by single spaces
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_lowercase().next().unwrap_or(c)
            } else {
                ' '
            }
        })
        .collect();
    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Indel similarity of two strings; `0` when either is empty
pub fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let similarity = rapidfuzz::fuzz::ratio(a.chars(), b.chars());
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}
