//! Paragraph sequences from raw page text
//!
//! The page text is split once on sentence breaks and kept in two parallel
//! forms. The match form flattens newlines so whitespace never affects
//! similarity scores. The structural form keeps newlines so heading prefixes
//! stay on their own line. Index `i` refers to the same paragraph in both.

use serde::Serialize;

/// Separator between paragraph-like units
pub const SENTENCE_BREAK: &str = ". ";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageText {
    /// Newlines collapsed to spaces, trimmed
    pub match_form: Vec<String>,
    /// Newlines preserved, trimmed
    pub structural: Vec<String>,
}

impl PageText {
    pub fn from_raw(raw: &str) -> Self {
        let mut text = PageText::default();
        for piece in raw.split(SENTENCE_BREAK) {
            let structural = piece.trim();
            if structural.is_empty() {
                continue;
            }
            text.match_form
                .push(structural.replace('\n', " ").trim().to_string());
            text.structural.push(structural.to_string());
        }
        text
    }

    pub fn is_empty(&self) -> bool {
        self.match_form.is_empty()
    }

    pub fn len(&self) -> usize {
        self.match_form.len()
    }

    /// Characters of body text on the page
    pub fn char_count(&self) -> usize {
        self.match_form.iter().map(|p| p.chars().count()).sum()
    }

    /// Index of the first paragraph equal to `paragraph` in the match form
    pub fn index_of(&self, paragraph: &str) -> Option<usize> {
        self.match_form.iter().position(|p| p == paragraph)
    }
}
