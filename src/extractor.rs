//! Text extraction from PDF using lopdf
//!
//! This module extracts positioned words from page content streams, rebuilds
//! the page's line structure and clips text to rectangles for highlight
//! recovery.

use crate::document::Rect;
use crate::PdfError;
use lopdf::{Document, Object, ObjectId};

/// Average glyph advance as a fraction of the font size. Glyph widths are not
/// read from font programs, so horizontal extents are estimates.
const AVG_CHAR_WIDTH: f32 = 0.5;

/// Fraction of the font size that glyphs descend below the baseline
const DESCENT: f32 = 0.2;

/// TJ adjustments at or below this (thousandths of an em) are treated as word gaps
const TJ_SPACE_THRESHOLD: f32 = -250.0;

/// A text item with position information
#[derive(Debug, Clone)]
pub struct TextItem {
    /// The text content
    pub text: String,
    /// X position on page
    pub x: f32,
    /// Y position of the baseline (PDF coordinates, origin at bottom-left)
    pub y: f32,
    /// Estimated width of the text
    pub width: f32,
    /// Height (approximated from font size)
    pub height: f32,
    /// Font size
    pub font_size: f32,
    /// Page number (1-indexed)
    pub page: u32,
}

impl TextItem {
    /// Glyph box in top-left page coordinates, given the media box's
    /// left edge and top edge
    fn bounds(&self, origin: (f32, f32)) -> Rect {
        let (left, top) = origin;
        Rect::new(
            self.x - left,
            top - (self.y + self.height),
            self.x - left + self.width,
            top - self.y + self.height * DESCENT,
        )
    }
}

/// A line of text (grouped text items)
#[derive(Debug, Clone)]
pub struct TextLine {
    pub items: Vec<TextItem>,
    pub y: f32,
    pub page: u32,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.items
            .iter()
            .map(|i| i.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Extract the words of one page, in content stream order
pub fn extract_page_words(
    doc: &Document,
    page_id: ObjectId,
    page_num: u32,
) -> Result<Vec<TextItem>, PdfError> {
    let items = extract_page_text_items(doc, page_id, page_num)?;
    Ok(items.iter().flat_map(split_into_words).collect())
}

/// Rebuild the page text: one output line per visual line
pub fn page_text_from_words(words: &[TextItem]) -> String {
    group_into_lines(words.to_vec())
        .iter()
        .map(TextLine::text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text of the words whose glyph boxes overlap `rect`
///
/// `origin` is the media box's (left, top) edge in PDF coordinates, used to
/// move words into the top-left coordinate space `rect` is expressed in.
pub fn text_in_rect(words: &[TextItem], rect: &Rect, origin: (f32, f32)) -> String {
    let clipped: Vec<TextItem> = words
        .iter()
        .filter(|w| w.bounds(origin).intersects(rect))
        .cloned()
        .collect();
    page_text_from_words(&clipped)
}

/// Split a text item into whitespace-separated words with estimated positions
fn split_into_words(item: &TextItem) -> Vec<TextItem> {
    let advance = item.font_size * AVG_CHAR_WIDTH;
    word_spans(&item.text)
        .into_iter()
        .map(|(start, word)| {
            let chars_before = item.text[..start].chars().count();
            TextItem {
                text: word.to_string(),
                x: item.x + chars_before as f32 * advance,
                y: item.y,
                width: word.chars().count() as f32 * advance,
                height: item.height,
                font_size: item.font_size,
                page: item.page,
            }
        })
        .collect()
}

/// Byte offset and slice of every whitespace-separated word
fn word_spans(text: &str) -> Vec<(usize, &str)> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                spans.push((s, &text[s..i]));
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push((s, &text[s..]));
    }
    spans
}

/// Extract text items from a single page
fn extract_page_text_items(
    doc: &Document,
    page_id: ObjectId,
    page_num: u32,
) -> Result<Vec<TextItem>, PdfError> {
    use lopdf::content::Content;

    let mut items = Vec::new();

    // Get fonts for encoding
    let fonts = doc.get_page_fonts(page_id).unwrap_or_default();

    let content_data = doc
        .get_page_content(page_id)
        .map_err(|e| PdfError::Parse(e.to_string()))?;

    let content = Content::decode(&content_data).map_err(|e| PdfError::Parse(e.to_string()))?;

    let mut state = TextState::default();
    let mut ctm_stack: Vec<[f32; 6]> = Vec::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => ctm_stack.push(state.ctm),
            "Q" => {
                if let Some(saved) = ctm_stack.pop() {
                    state.ctm = saved;
                }
            }
            "cm" => {
                if op.operands.len() >= 6 {
                    let m = matrix_operands(&op.operands);
                    state.ctm = multiply_matrices(&m, &state.ctm);
                }
            }
            "BT" => {
                state.in_text_block = true;
                state.text_matrix = IDENTITY;
                state.line_matrix = IDENTITY;
            }
            "ET" => state.in_text_block = false,
            "Tf" => {
                if op.operands.len() >= 2 {
                    if let Ok(name) = op.operands[0].as_name() {
                        state.font = String::from_utf8_lossy(name).to_string();
                    }
                    if let Some(size) = get_number(&op.operands[1]) {
                        state.font_size = size;
                    }
                }
            }
            "TL" => {
                if let Some(leading) = op.operands.first().and_then(get_number) {
                    state.leading = Some(leading);
                }
            }
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                    if op.operator == "TD" {
                        state.leading = Some(-ty);
                    }
                    state.line_matrix[4] += tx;
                    state.line_matrix[5] += ty;
                    state.text_matrix = state.line_matrix;
                }
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    state.text_matrix = matrix_operands(&op.operands);
                    state.line_matrix = state.text_matrix;
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if state.in_text_block {
                    if let Some(text) = op
                        .operands
                        .first()
                        .and_then(|o| extract_text_from_operand(o, doc, &fonts, &state.font))
                    {
                        state.push_item(&mut items, text, page_num);
                    }
                }
            }
            "TJ" => {
                if state.in_text_block {
                    if let Some(Ok(array)) = op.operands.first().map(Object::as_array) {
                        let text = collect_tj_array(array, doc, &fonts, &state.font);
                        state.push_item(&mut items, text, page_num);
                    }
                }
            }
            "'" | "\"" => {
                state.next_line();
                if let Some(text) = op
                    .operands
                    .last()
                    .and_then(|o| extract_text_from_operand(o, doc, &fonts, &state.font))
                {
                    state.push_item(&mut items, text, page_num);
                }
            }
            _ => {}
        }
    }

    Ok(items)
}

const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Graphics and text state tracked while walking a content stream
struct TextState {
    ctm: [f32; 6],
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    font: String,
    font_size: f32,
    leading: Option<f32>,
    in_text_block: bool,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            font: String::new(),
            font_size: 12.0,
            leading: None,
            in_text_block: false,
        }
    }
}

impl TextState {
    fn next_line(&mut self) {
        // Approximate line height when no TL was set
        let leading = self.leading.unwrap_or(self.font_size * 1.2);
        self.line_matrix[5] -= leading;
        self.text_matrix = self.line_matrix;
    }

    fn push_item(&self, items: &mut Vec<TextItem>, text: String, page: u32) {
        if text.trim().is_empty() {
            return;
        }
        let rendered_size = effective_font_size(self.font_size, &self.text_matrix);
        // Transform position through CTM
        let combined = multiply_matrices(&self.text_matrix, &self.ctm);
        let width = text.chars().count() as f32 * rendered_size * AVG_CHAR_WIDTH;
        items.push(TextItem {
            text,
            x: combined[4],
            y: combined[5],
            width,
            height: rendered_size,
            font_size: rendered_size,
            page,
        });
    }
}

/// Concatenate the strings of a TJ array, turning wide negative kerns into spaces
fn collect_tj_array(
    array: &[Object],
    doc: &Document,
    fonts: &std::collections::BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    current_font: &str,
) -> String {
    let mut combined_text = String::new();
    for item in array {
        if let Some(text) = extract_text_from_operand(item, doc, fonts, current_font) {
            combined_text.push_str(&text);
        } else if let Some(kern) = get_number(item) {
            if kern <= TJ_SPACE_THRESHOLD && !combined_text.ends_with(' ') {
                combined_text.push(' ');
            }
        }
    }
    combined_text
}

/// Read six numeric operands as a matrix, defaulting to identity entries
fn matrix_operands(operands: &[Object]) -> [f32; 6] {
    let mut m = IDENTITY;
    for (i, operand) in operands.iter().take(6).enumerate() {
        m[i] = get_number(operand).unwrap_or(IDENTITY[i]);
    }
    m
}

/// Multiply two 2D transformation matrices
/// Matrix format: [a, b, c, d, e, f] representing:
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

/// Helper to get f32 from Object
pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Compute effective font size from base size and text matrix
fn effective_font_size(base_size: f32, text_matrix: &[f32; 6]) -> f32 {
    let scale_x = (text_matrix[0].powi(2) + text_matrix[1].powi(2)).sqrt();
    let scale_y = (text_matrix[2].powi(2) + text_matrix[3].powi(2)).sqrt();
    base_size * scale_x.max(scale_y)
}

/// Extract text from a text operand, handling encoding
fn extract_text_from_operand(
    obj: &Object,
    doc: &Document,
    fonts: &std::collections::BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    current_font: &str,
) -> Option<String> {
    if let Object::String(bytes, _) = obj {
        // Try to decode using font encoding
        if let Some(font_dict) = fonts.get(current_font.as_bytes()) {
            if let Ok(encoding) = font_dict.get_font_encoding(doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return Some(text);
                }
            }
        }

        // Fallback: try UTF-16BE then Latin-1
        if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
            let utf16: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                .collect();
            return Some(String::from_utf16_lossy(&utf16));
        }

        Some(bytes.iter().map(|&b| b as char).collect())
    } else {
        None
    }
}

/// Represents a column region on a page
#[derive(Debug, Clone)]
struct ColumnRegion {
    x_min: f32,
    x_max: f32,
}

/// Detect column boundaries on a page based on X-position gaps
fn detect_columns(page_items: &[TextItem]) -> Vec<ColumnRegion> {
    if page_items.is_empty() {
        return vec![];
    }

    let x_min = page_items.iter().map(|i| i.x).fold(f32::INFINITY, f32::min);
    let x_max = page_items
        .iter()
        .map(|i| i.x + i.width.max(50.0))
        .fold(f32::NEG_INFINITY, f32::max);

    let page_width = x_max - x_min;
    let single = vec![ColumnRegion { x_min, x_max }];

    // Too narrow, or too little text, to tell columns apart reliably
    if page_width < 200.0 || page_items.len() < 20 {
        return single;
    }

    // Left edges of line starts only: word items inside a line would
    // otherwise fill every gap between columns
    let mut x_positions: Vec<f32> = line_starts(page_items);
    x_positions.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    // A gap > 20% of page width suggests a column boundary
    let gap_threshold = page_width * 0.20;
    let mut boundaries = vec![x_min];
    for window in x_positions.windows(2) {
        if window[1] - window[0] > gap_threshold {
            boundaries.push((window[0] + window[1]) / 2.0);
        }
    }
    boundaries.push(x_max + 1.0);

    let columns: Vec<ColumnRegion> = boundaries
        .windows(2)
        .map(|w| ColumnRegion {
            x_min: w[0],
            x_max: w[1],
        })
        .collect();

    // Only two-column layouts are split; each column must carry 20% of the text
    if columns.len() == 2 {
        let counts: Vec<usize> = columns
            .iter()
            .map(|col| {
                page_items
                    .iter()
                    .filter(|i| i.x >= col.x_min && i.x < col.x_max)
                    .count()
            })
            .collect();
        let min_threshold = counts.iter().sum::<usize>() / 5;
        if counts.iter().all(|&c| c >= min_threshold) {
            return columns;
        }
    }

    single
}

/// X position of the first item of each run of items sharing a baseline
fn line_starts(items: &[TextItem]) -> Vec<f32> {
    let mut starts = Vec::new();
    let mut last_y: Option<f32> = None;
    for item in items {
        if last_y.map_or(true, |y| (y - item.y).abs() >= 3.0) {
            starts.push(item.x);
        }
        last_y = Some(item.y);
    }
    starts
}

/// Group text items into lines, with multi-column support
pub fn group_into_lines(items: Vec<TextItem>) -> Vec<TextLine> {
    if items.is_empty() {
        return Vec::new();
    }

    let mut pages: Vec<u32> = items.iter().map(|i| i.page).collect();
    pages.sort();
    pages.dedup();

    let mut all_lines = Vec::new();

    for page in pages {
        let page_items: Vec<TextItem> = items.iter().filter(|i| i.page == page).cloned().collect();
        let columns = detect_columns(&page_items);

        if columns.len() <= 1 {
            all_lines.extend(group_single_column(page_items));
        } else {
            // Multi-column: each column separately, left to right
            for column in &columns {
                let col_items: Vec<TextItem> = page_items
                    .iter()
                    .filter(|i| i.x >= column.x_min && i.x < column.x_max)
                    .cloned()
                    .collect();
                all_lines.extend(group_single_column(col_items));
            }
        }
    }

    all_lines
}

/// Group items from a single column into lines
///
/// Preserves PDF stream order (usually reading order) and only merges
/// consecutive items on the same baseline.
fn group_single_column(items: Vec<TextItem>) -> Vec<TextLine> {
    let mut lines: Vec<TextLine> = Vec::new();
    let y_tolerance = 3.0;

    for item in items {
        match lines.last_mut() {
            Some(last) if last.page == item.page && (last.y - item.y).abs() < y_tolerance => {
                last.items.push(item);
            }
            _ => {
                let (y, page) = (item.y, item.page);
                lines.push(TextLine {
                    items: vec![item],
                    y,
                    page,
                });
            }
        }
    }

    // Left to right within each line
    for line in &mut lines {
        line.items
            .sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));
    }

    lines
}
