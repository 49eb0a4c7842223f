//! Highlight annotation geometry from page dictionaries
//!
//! Quads are read from `/QuadPoints` (falling back to `/Rect`) and moved into
//! top-left page coordinates so they line up with rendered page images.

use crate::document::{HighlightAnnotation, PageSize, Quad};
use crate::extractor::get_number;
use crate::PdfError;
use log::debug;
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Page media box in PDF coordinates (origin bottom-left)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Default for MediaBox {
    fn default() -> Self {
        let letter = PageSize::default();
        Self {
            x0: 0.0,
            y0: 0.0,
            x1: letter.width,
            y1: letter.height,
        }
    }
}

impl MediaBox {
    pub fn size(&self) -> PageSize {
        PageSize {
            width: (self.x1 - self.x0).abs(),
            height: (self.y1 - self.y0).abs(),
        }
    }

    /// Move a PDF-space point into top-left page coordinates
    pub fn to_top_left(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.x0, self.y1 - y)
    }
}

/// Resolve a reference one level deep
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn numbers(obj: &Object) -> Vec<f32> {
    obj.as_array()
        .map(|array| array.iter().filter_map(get_number).collect())
        .unwrap_or_default()
}

/// Media box of a page, following `/Parent` for inherited values
pub fn media_box(doc: &Document, page_id: ObjectId) -> MediaBox {
    let mut current = doc.get_dictionary(page_id).ok();
    // Page trees are shallow; the bound guards against reference cycles
    for _ in 0..32 {
        let Some(dict) = current else { break };
        if let Some(values) = dict
            .get(b"MediaBox")
            .ok()
            .and_then(|o| resolve(doc, o))
            .map(numbers)
        {
            if values.len() == 4 {
                return MediaBox {
                    x0: values[0].min(values[2]),
                    y0: values[1].min(values[3]),
                    x1: values[0].max(values[2]),
                    y1: values[1].max(values[3]),
                };
            }
        }
        current = dict
            .get(b"Parent")
            .ok()
            .and_then(|o| o.as_reference().ok())
            .and_then(|id| doc.get_dictionary(id).ok());
    }
    MediaBox::default()
}

/// Highlight annotations on a page
pub fn highlight_annotations(
    doc: &Document,
    page_id: ObjectId,
    mbox: &MediaBox,
) -> Result<Vec<HighlightAnnotation>, PdfError> {
    let page = doc.get_dictionary(page_id)?;
    let annots = match page.get(b"Annots").ok().and_then(|o| resolve(doc, o)) {
        Some(Object::Array(array)) => array,
        _ => return Ok(Vec::new()),
    };

    let mut highlights = Vec::new();
    for entry in annots {
        let Some(Ok(dict)) = resolve(doc, entry).map(Object::as_dict) else {
            continue;
        };
        if !is_highlight(dict) {
            continue;
        }
        let quads = annotation_quads(doc, dict, mbox);
        if !quads.is_empty() {
            highlights.push(HighlightAnnotation { quads });
        }
    }

    debug!(
        "Found {} highlight annotations on page object {:?}",
        highlights.len(),
        page_id
    );
    Ok(highlights)
}

fn is_highlight(dict: &Dictionary) -> bool {
    matches!(dict.get(b"Subtype").and_then(Object::as_name), Ok(name) if name == b"Highlight")
}

fn annotation_quads(doc: &Document, dict: &Dictionary, mbox: &MediaBox) -> Vec<Quad> {
    let quad_points = dict
        .get(b"QuadPoints")
        .ok()
        .and_then(|o| resolve(doc, o))
        .map(numbers)
        .unwrap_or_default();

    if quad_points.len() >= 8 {
        return quad_points
            .chunks_exact(8)
            .map(|c| Quad {
                points: [
                    mbox.to_top_left(c[0], c[1]),
                    mbox.to_top_left(c[2], c[3]),
                    mbox.to_top_left(c[4], c[5]),
                    mbox.to_top_left(c[6], c[7]),
                ],
            })
            .collect();
    }

    // No quads: the annotation rectangle is the only geometry available
    let rect = dict
        .get(b"Rect")
        .ok()
        .and_then(|o| resolve(doc, o))
        .map(numbers)
        .unwrap_or_default();
    if rect.len() == 4 {
        let (x0, y0) = mbox.to_top_left(rect[0], rect[1]);
        let (x1, y1) = mbox.to_top_left(rect[2], rect[3]);
        return vec![Quad {
            points: [(x0, y0), (x1, y0), (x0, y1), (x1, y1)],
        }];
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Rect;
    use lopdf::dictionary;

    fn page_with_annots(annots: Vec<Object>) -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let mut ids = Vec::new();
        for annot in annots {
            ids.push(Object::Reference(doc.add_object(annot)));
        }
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Annots" => ids,
        });
        (doc, page_id)
    }

    #[test]
    fn test_media_box_default_when_missing() {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.add_object(dictionary! { "Type" => "Page" });
        assert_eq!(media_box(&doc, page_id), MediaBox::default());
    }

    #[test]
    fn test_media_box_inherited_from_parent() {
        let mut doc = Document::with_version("1.5");
        let parent = doc.add_object(dictionary! {
            "Type" => "Pages",
            "MediaBox" => vec![0.into(), 0.into(), 300.into(), 400.into()],
        });
        let page_id = doc.add_object(dictionary! { "Type" => "Page", "Parent" => parent });
        let mbox = media_box(&doc, page_id);
        assert_eq!(mbox.size(), PageSize { width: 300.0, height: 400.0 });
    }

    #[test]
    fn test_highlight_quads_to_top_left() {
        let (doc, page_id) = page_with_annots(vec![
            Object::Dictionary(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Highlight",
                "QuadPoints" => vec![
                    72.into(), 700.into(), 300.into(), 700.into(),
                    72.into(), 688.into(), 300.into(), 688.into(),
                    72.into(), 680.into(), 200.into(), 680.into(),
                    72.into(), 668.into(), 200.into(), 668.into(),
                ],
            }),
            Object::Dictionary(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Text",
                "Rect" => vec![0.into(), 0.into(), 10.into(), 10.into()],
            }),
        ]);
        let mbox = media_box(&doc, page_id);
        let annots = highlight_annotations(&doc, page_id, &mbox).unwrap();
        assert_eq!(annots.len(), 1);
        assert_eq!(annots[0].quads.len(), 2);
        assert_eq!(
            annots[0].quads[0].bounding_rect(),
            Rect::new(72.0, 92.0, 300.0, 104.0)
        );
        assert_eq!(
            annots[0].quads[1].bounding_rect(),
            Rect::new(72.0, 112.0, 200.0, 124.0)
        );
    }

    #[test]
    fn test_highlight_rect_fallback() {
        let (doc, page_id) = page_with_annots(vec![Object::Dictionary(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Highlight",
            "Rect" => vec![100.into(), 500.into(), 200.into(), 512.into()],
        })]);
        let mbox = media_box(&doc, page_id);
        let annots = highlight_annotations(&doc, page_id, &mbox).unwrap();
        assert_eq!(
            annots[0].quads[0].bounding_rect(),
            Rect::new(100.0, 280.0, 200.0, 292.0)
        );
    }

    #[test]
    fn test_page_without_annots() {
        let (doc, page_id) = page_with_annots(vec![]);
        let mbox = media_box(&doc, page_id);
        assert!(highlight_annotations(&doc, page_id, &mbox).unwrap().is_empty());
    }
}
