//! Section heading and figure caption heuristics
//!
//! Both work line by line inside structural paragraphs:
//! - a heading line starts with a decimal section number (`1.2`, `3.4.1`);
//!   the heading is that line joined with the next one
//! - a caption line contains `Figure <n>.<m>`; the caption runs from that
//!   token to the end of the line, joined with the next one
//!
//! A line that qualifies as a caption is never also a heading.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

static HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+(\.\d+){1,2}\b").expect("valid heading regex"));

static CAPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bFigure \d+\.\d+(\.\d+)?\b").expect("valid caption regex"));

/// Headings and captions found on one page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageStructure {
    /// Distinct heading texts; order carries no meaning
    pub headings: Vec<String>,
    /// Captions in encounter order
    pub captions: Vec<String>,
}

/// Check if a line opens a numbered section
pub fn is_heading_line(line: &str) -> bool {
    let flat = line.replace('\n', " ");
    !CAPTION_RE.is_match(&flat) && HEADING_RE.is_match(&flat)
}

/// Byte offset of the figure reference in a caption line
pub fn caption_start(line: &str) -> Option<usize> {
    CAPTION_RE.find(line).map(|m| m.start())
}

/// Scan structural paragraphs for headings and captions
pub fn extract_structure(structural: &[String]) -> PageStructure {
    let mut seen = HashSet::new();
    let mut structure = PageStructure::default();

    for paragraph in structural {
        let lines: Vec<&str> = paragraph.split('\n').collect();
        // The text after a marker line lives on the next line, so the last
        // line of a paragraph can never start either
        for pair in lines.windows(2) {
            let (line, next) = (pair[0], pair[1]);
            if let Some(start) = caption_start(line) {
                structure
                    .captions
                    .push(format!("{} {}", line[start..].replace('\n', " "), next));
            } else if is_heading_line(line) {
                let heading = format!("{} {}", line, next);
                if seen.insert(heading.clone()) {
                    structure.headings.push(heading);
                }
            }
        }
    }

    structure
}

/// Distinct headings on a page
pub fn extract_headings(structural: &[String]) -> Vec<String> {
    extract_structure(structural).headings
}

/// Figure captions on a page, in encounter order
pub fn extract_captions(structural: &[String]) -> Vec<String> {
    extract_structure(structural).captions
}
