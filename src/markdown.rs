//! Rendering of document summaries
//!
//! Markdown output maps the summary entries onto:
//! - `## Page N` headers
//! - `###` section headings for heading markers
//! - one paragraph per highlight (bulleted highlights become list items)
//! - a quoted statistics line and a `---` rule between pages
//!
//! Plain text output writes the entries verbatim, heading markers included,
//! so it can be parsed back with [`crate::merge::parse_heading_marker`].

use crate::merge::SummaryEntry;
use crate::summary::DocumentSummary;
use once_cell::sync::Lazy;
use regex::Regex;

/// Options for markdown rendering
#[derive(Debug, Clone)]
pub struct MarkdownOptions {
    /// Emit the per-page statistics line
    pub include_stats: bool,
    /// Emit a header for every page
    pub include_page_headers: bool,
    /// Fix hyphenation (broken words across lines)
    pub fix_hyphenation: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            include_stats: true,
            include_page_headers: true,
            fix_hyphenation: true,
        }
    }
}

/// Render a summary as markdown
pub fn to_markdown(summary: &DocumentSummary, options: &MarkdownOptions) -> String {
    let mut output = String::new();

    for page in &summary.pages {
        for entry in page.entries() {
            match entry {
                SummaryEntry::PageHeader(n) => {
                    if options.include_page_headers {
                        output.push_str(&format!("## Page {}\n\n", n));
                    }
                }
                SummaryEntry::Heading(text) => {
                    output.push_str(&format!("### {}\n\n", text.trim()));
                }
                SummaryEntry::Highlight(text) => {
                    output.push_str(&format_highlight(&text));
                    output.push_str("\n\n");
                }
                SummaryEntry::Stats(stats) => {
                    for caption in &page.captions {
                        output.push_str(&format!("*{}*\n\n", caption.trim()));
                    }
                    if options.include_stats {
                        output.push_str(&format!(
                            "> Original text: {} characters | Highlighted: {} characters | Headings: {}\n\n",
                            stats.original_chars, stats.highlight_chars, stats.headings
                        ));
                    }
                }
                SummaryEntry::PageBreak => output.push_str("---\n\n"),
            }
        }
    }

    clean_markdown(output, options)
}

/// Render a summary as plain text, one entry per block
pub fn to_plain_text(summary: &DocumentSummary) -> String {
    let blocks: Vec<String> = summary
        .entries()
        .iter()
        .map(|entry| match entry {
            SummaryEntry::Heading(_) => format!("\n{}\n", entry),
            _ => entry.to_string(),
        })
        .collect();
    let mut text = blocks.join("\n\n");
    collapse_blank_lines(&mut text);
    text.trim().to_string() + "\n"
}

/// Highlights that start with a bullet glyph become markdown list items
fn format_highlight(text: &str) -> String {
    let trimmed = text.trim_start();
    for bullet in &['•', '○', '●', '◦'] {
        if let Some(rest) = trimmed.strip_prefix(*bullet) {
            return format!("- {}", rest.trim_start());
        }
    }
    trimmed.to_string()
}

/// Clean up markdown output with post-processing
fn clean_markdown(mut text: String, options: &MarkdownOptions) -> String {
    if options.fix_hyphenation {
        text = fix_hyphenation(&text);
    }

    collapse_blank_lines(&mut text);

    // Trim leading and trailing whitespace, ensure ends with single newline
    text = text.trim().to_string();
    text.push('\n');

    text
}

/// Remove excessive newlines (more than 2 in a row)
fn collapse_blank_lines(text: &mut String) {
    while text.contains("\n\n\n") {
        *text = text.replace("\n\n\n", "\n\n");
    }
}

/// Fix words broken across lines with spaces around the hyphen
/// e.g., "opera - ting" -> "opera-ting"
fn fix_hyphenation(text: &str) -> String {
    static SPACED_HYPHEN_RE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"([a-zA-ZáàâãéèêíïóôõöúçñÁÀÂÃÉÈÊÍÏÓÔÕÖÚÇÑ]) - ([a-zA-ZáàâãéèêíïóôõöúçñÁÀÂÃÉÈÊÍÏÓÔÕÖÚÇÑ])").unwrap()
    });

    SPACED_HYPHEN_RE
        .replace_all(text, |caps: &regex::Captures| {
            format!("{}-{}", &caps[1], &caps[2])
        })
        .to_string()
}
