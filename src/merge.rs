//! Splicing section headings into a page's highlight sequence
//!
//! The merge builds a fresh entry list from a frozen slice of highlights. A
//! heading goes in front of the first highlight that contains it, is stripped
//! from that highlight, and is never inserted again on the same page.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Opening delimiter of a heading marker
pub const HEADING_OPEN: &str = "#######";
/// Closing delimiter of a heading marker
pub const HEADING_CLOSE: &str = "##############";

/// Per-page counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PageStats {
    /// Characters of body text on the page
    pub original_chars: usize,
    /// Characters kept in highlights after heading removal
    pub highlight_chars: usize,
    /// Headings found on the page, inserted or not
    pub headings: usize,
    pub highlights: usize,
}

/// One token of the summary sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SummaryEntry {
    PageHeader(u32),
    Heading(String),
    Highlight(String),
    Stats(PageStats),
    PageBreak,
}

impl SummaryEntry {
    pub fn is_heading(&self) -> bool {
        matches!(self, SummaryEntry::Heading(_))
    }

    pub fn is_highlight(&self) -> bool {
        matches!(self, SummaryEntry::Highlight(_))
    }
}

impl fmt::Display for SummaryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryEntry::PageHeader(page) => write!(f, "Page {}:", page),
            SummaryEntry::Heading(text) => write!(f, "{} {} {}", HEADING_OPEN, text, HEADING_CLOSE),
            SummaryEntry::Highlight(text) => f.write_str(text),
            SummaryEntry::Stats(stats) => write!(
                f,
                "Original Text Length {}      |      Highlighted Text Count: {}",
                stats.original_chars, stats.highlight_chars
            ),
            SummaryEntry::PageBreak => f.write_str(&"=".repeat(62)),
        }
    }
}

/// Recover the heading text from a rendered marker
pub fn parse_heading_marker(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix(HEADING_OPEN)?;
    let inner = rest.strip_suffix(HEADING_CLOSE)?;
    let heading = inner.trim();
    (!heading.is_empty()).then_some(heading)
}

/// Interleave heading markers with the ordered highlights of one page
pub fn merge_headings(highlights: &[String], headings: &[String]) -> Vec<SummaryEntry> {
    let mut inserted: HashSet<&str> = HashSet::new();
    let mut entries = Vec::with_capacity(highlights.len() + headings.len());

    for highlight in highlights {
        let mut found: Vec<(usize, &str)> = headings
            .iter()
            .map(String::as_str)
            .filter(|h| !h.is_empty() && !inserted.contains(h))
            .filter_map(|h| highlight.find(h).map(|pos| (pos, h)))
            .collect();
        // Earlier in the highlight first; the longer heading wins a tie
        found.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.len().cmp(&a.1.len())));

        let mut text = highlight.clone();
        for (_, heading) in found {
            // An overlapping longer heading may already have removed this one
            if !text.contains(heading) {
                continue;
            }
            inserted.insert(heading);
            entries.push(SummaryEntry::Heading(heading.to_string()));
            text = text.replace(heading, " ");
        }

        let text = collapse_whitespace(&text);
        if !text.is_empty() {
            entries.push(SummaryEntry::Highlight(text));
        }
    }

    entries
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
