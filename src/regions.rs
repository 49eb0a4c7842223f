//! Highlighted region detection
//!
//! Two strategies produce [`Region`]s in page-image pixel coordinates:
//! - annotation geometry, when the page carries highlight annotations
//! - color thresholding of the rendered page: HSV range mask, Canny edges,
//!   dilate + close, external contours, polygon approximation, bounding boxes
//!
//! Figure candidates for the image/caption step reuse the same contour
//! machinery without the color mask.

use crate::document::{HighlightAnnotation, PageSize, Rect};
use crate::raster::{masked_luma, rgb_to_hsv};
use image::{GrayImage, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::morphology;
use imageproc::point::Point;
use log::debug;
use serde::Serialize;

/// How a region was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    /// From quad `quad` of highlight annotation `annotation` on the page
    Annotation { annotation: usize, quad: usize },
    /// From the highlighter color in the page image
    Color,
    /// Figure candidate, not a highlight
    Figure,
}

/// Axis-aligned box in page-image pixels; `x2`/`y2` are exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
    pub method: DetectionMethod,
}

impl Region {
    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }

    /// True when the region lies inside a `width` x `height` image
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.x1 < self.x2 && self.x2 <= width && self.y1 < self.y2 && self.y2 <= height
    }

    /// The region in page points, given pixels per point on each axis
    pub fn to_page_rect(&self, scale: (f32, f32)) -> Rect {
        let (sx, sy) = scale;
        Rect::new(
            self.x1 as f32 / sx,
            self.y1 as f32 / sy,
            self.x2 as f32 / sx,
            self.y2 as f32 / sy,
        )
    }

    /// Build a region from float pixel bounds, clamped to the image.
    /// Returns `None` when nothing is left after clamping.
    fn clamped(
        bounds: (f32, f32, f32, f32),
        width: u32,
        height: u32,
        method: DetectionMethod,
    ) -> Option<Self> {
        let (x0, y0, x1, y1) = bounds;
        let clamp = |v: f32, max: u32| v.max(0.0).min(max as f32);
        let region = Region {
            x1: clamp(x0.floor(), width) as u32,
            y1: clamp(y0.floor(), height) as u32,
            x2: clamp(x1.ceil(), width) as u32,
            y2: clamp(y1.ceil(), height) as u32,
            method,
        };
        (region.x1 < region.x2 && region.y1 < region.y2).then_some(region)
    }
}

/// Inclusive HSV bounds on the 8-bit scale (hue `0..180`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HsvRange {
    pub hue: (u8, u8),
    pub saturation: (u8, u8),
    pub value: (u8, u8),
}

impl Default for HsvRange {
    /// Tuned to yellow/orange highlighter ink; white paper and black text fall outside
    fn default() -> Self {
        Self {
            hue: (0, 65),
            saturation: (59, 255),
            value: (0, 255),
        }
    }
}

impl HsvRange {
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        let within = |v: u8, (lo, hi): (u8, u8)| lo <= v && v <= hi;
        within(hsv[0], self.hue) && within(hsv[1], self.saturation) && within(hsv[2], self.value)
    }
}

/// Configuration for color-based region detection
#[derive(Debug, Clone, Serialize)]
pub struct RegionDetectorConfig {
    /// Highlighter color range
    pub hsv: HsvRange,
    /// Minimum enclosed contour area in px²
    pub min_area: f64,
    /// Canny hysteresis thresholds
    pub canny_low: f32,
    pub canny_high: f32,
    /// Radius of the square dilate/close kernel (radius 5 ≈ 10x10 kernel)
    pub kernel_radius: u8,
    /// Polygon approximation tolerance as a fraction of the contour perimeter
    pub approx_epsilon: f64,
    /// Keep only contours whose approximated polygon has this many vertices
    pub vertex_filter: Option<usize>,
}

impl Default for RegionDetectorConfig {
    fn default() -> Self {
        Self {
            hsv: HsvRange::default(),
            min_area: 1000.0,
            canny_low: 100.0,
            canny_high: 150.0,
            kernel_radius: 5,
            approx_epsilon: 0.02,
            vertex_filter: None,
        }
    }
}

/// One region per annotation quad, scaled from page points into an image of
/// `image_size` pixels
pub fn regions_from_annotations(
    annotations: &[HighlightAnnotation],
    page: PageSize,
    image_size: (u32, u32),
) -> Vec<Region> {
    let (width, height) = image_size;
    let sx = width as f32 / page.width.max(1.0);
    let sy = height as f32 / page.height.max(1.0);

    let mut regions = Vec::new();
    for (a, annotation) in annotations.iter().enumerate() {
        for (q, quad) in annotation.quads.iter().enumerate() {
            let r = quad.bounding_rect();
            let method = DetectionMethod::Annotation {
                annotation: a,
                quad: q,
            };
            if let Some(region) =
                Region::clamped((r.x0 * sx, r.y0 * sy, r.x1 * sx, r.y1 * sy), width, height, method)
            {
                regions.push(region);
            }
        }
    }
    regions
}

/// Find highlighter-colored regions in a page image
///
/// Returns an empty list when nothing matches. Regions are ordered top to
/// bottom, then left to right.
pub fn detect_color_regions(image: &RgbImage, config: &RegionDetectorConfig) -> Vec<Region> {
    if image.width() == 0 || image.height() == 0 {
        return Vec::new();
    }
    let masked = masked_luma(image, |p| config.hsv.contains(rgb_to_hsv(p)));
    let edges = imageproc::edges::canny(&masked, config.canny_low, config.canny_high);
    let dilated = morphology::dilate(&edges, Norm::LInf, config.kernel_radius);
    let closed = morphology::close(&dilated, Norm::LInf, config.kernel_radius);

    let mut regions: Vec<Region> = external_contours(&closed)
        .into_iter()
        .filter(|c| polygon_area(&c.points) > config.min_area)
        .filter_map(|contour| {
            let perimeter = arc_length(&contour.points, true);
            let approx =
                approximate_polygon_dp(&contour.points, config.approx_epsilon * perimeter, true);
            if let Some(vertices) = config.vertex_filter {
                if approx.len() != vertices {
                    return None;
                }
            }
            bounding_region(&approx, image.width(), image.height(), DetectionMethod::Color)
        })
        .collect();

    sort_regions(&mut regions);
    debug!("Color detection found {} regions", regions.len());
    regions
}

/// Configuration for figure candidate detection
#[derive(Debug, Clone, Serialize)]
pub struct FigureDetectorConfig {
    pub canny_low: f32,
    pub canny_high: f32,
    pub kernel_radius: u8,
    pub min_area: f64,
    /// Open interval of accepted width / height ratios
    pub aspect_ratio: (f32, f32),
}

impl Default for FigureDetectorConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            kernel_radius: 2,
            min_area: 1000.0,
            aspect_ratio: (0.5, 3.0),
        }
    }
}

/// Find figure-like blocks (roughly square, large) in a page image
pub fn detect_figures(image: &RgbImage, config: &FigureDetectorConfig) -> Vec<Region> {
    if image.width() == 0 || image.height() == 0 {
        return Vec::new();
    }
    let gray = image::imageops::grayscale(image);
    let edges = imageproc::edges::canny(&gray, config.canny_low, config.canny_high);
    let dilated = morphology::dilate(&edges, Norm::LInf, config.kernel_radius);

    let (lo, hi) = config.aspect_ratio;
    let mut regions: Vec<Region> = external_contours(&dilated)
        .into_iter()
        .filter(|c| polygon_area(&c.points) > config.min_area)
        .filter_map(|c| {
            bounding_region(&c.points, image.width(), image.height(), DetectionMethod::Figure)
        })
        .filter(|r| {
            let aspect = r.width() as f32 / r.height() as f32;
            lo < aspect && aspect < hi
        })
        .collect();

    sort_regions(&mut regions);
    regions
}

/// Contour tracing order is not a reading order; sort top to bottom, then left to right
fn sort_regions(regions: &mut [Region]) {
    regions.sort_by_key(|r| (r.y1, r.x1, r.y2, r.x2));
}

/// Outer borders with no enclosing border
fn external_contours(binary: &GrayImage) -> Vec<Contour<i32>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .collect()
}

/// Enclosed area of a closed polygon (shoelace formula)
fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice_area += f64::from(p.x) * f64::from(q.y) - f64::from(q.x) * f64::from(p.y);
    }
    twice_area.abs() / 2.0
}

/// Pixel-inclusive bounding box of a point set as an exclusive-end region
fn bounding_region(
    points: &[Point<i32>],
    width: u32,
    height: u32,
    method: DetectionMethod,
) -> Option<Region> {
    let x0 = points.iter().map(|p| p.x).min()?;
    let y0 = points.iter().map(|p| p.y).min()?;
    let x1 = points.iter().map(|p| p.x).max()? + 1;
    let y1 = points.iter().map(|p| p.y).max()? + 1;
    Region::clamped(
        (x0 as f32, y0 as f32, x1 as f32, y1 as f32),
        width,
        height,
        method,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Quad;
    use image::Rgb;

    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
    const YELLOW: Rgb<u8> = Rgb([255, 240, 60]);

    fn page_with_boxes(boxes: &[(u32, u32, u32, u32)], color: Rgb<u8>) -> RgbImage {
        let mut image = RgbImage::from_pixel(400, 300, WHITE);
        for &(x0, y0, x1, y1) in boxes {
            for y in y0..y1 {
                for x in x0..x1 {
                    image.put_pixel(x, y, color);
                }
            }
        }
        image
    }

    #[test]
    fn test_default_hsv_range() {
        let range = HsvRange::default();
        assert!(range.contains(rgb_to_hsv(&YELLOW)));
        assert!(!range.contains(rgb_to_hsv(&WHITE)));
        assert!(!range.contains(rgb_to_hsv(&Rgb([0, 0, 0]))));
        assert!(!range.contains(rgb_to_hsv(&Rgb([40, 80, 255]))));
    }

    #[test]
    fn test_blank_page_has_no_regions() {
        let image = RgbImage::from_pixel(200, 100, WHITE);
        assert!(detect_color_regions(&image, &RegionDetectorConfig::default()).is_empty());
    }

    #[test]
    fn test_empty_image_has_no_regions() {
        for (w, h) in [(0, 0), (0, 10), (10, 0)] {
            let image = RgbImage::from_pixel(w, h, YELLOW);
            assert!(detect_color_regions(&image, &RegionDetectorConfig::default()).is_empty());
            assert!(detect_figures(&image, &FigureDetectorConfig::default()).is_empty());
        }
    }

    #[test]
    fn test_single_highlight_detected() {
        let image = page_with_boxes(&[(50, 100, 250, 130)], YELLOW);
        let regions = detect_color_regions(&image, &RegionDetectorConfig::default());
        assert_eq!(regions.len(), 1);
        let r = regions[0];
        assert_eq!(r.method, DetectionMethod::Color);
        assert!(r.fits(400, 300));
        // The dilated edge ring encloses the painted box
        assert!(r.x1 <= 50 && r.x2 >= 250, "{:?}", r);
        assert!(r.y1 <= 100 && r.y2 >= 130, "{:?}", r);
        assert!(r.x1 >= 35 && r.x2 <= 265, "{:?}", r);
    }

    #[test]
    fn test_regions_sorted_top_to_bottom() {
        let image = page_with_boxes(&[(40, 200, 300, 230), (60, 40, 320, 70)], YELLOW);
        let regions = detect_color_regions(&image, &RegionDetectorConfig::default());
        assert_eq!(regions.len(), 2);
        assert!(regions[0].y1 < regions[1].y1);
    }

    #[test]
    fn test_small_blobs_filtered_by_area() {
        let image = page_with_boxes(&[(100, 100, 104, 104)], YELLOW);
        let config = RegionDetectorConfig {
            min_area: 5000.0,
            ..Default::default()
        };
        assert!(detect_color_regions(&image, &config).is_empty());
    }

    #[test]
    fn test_non_highlight_color_ignored() {
        let image = page_with_boxes(&[(50, 100, 250, 130)], Rgb([40, 80, 255]));
        assert!(detect_color_regions(&image, &RegionDetectorConfig::default()).is_empty());
    }

    #[test]
    fn test_regions_from_annotations_scaled() {
        let annotations = vec![HighlightAnnotation {
            quads: vec![
                Quad {
                    points: [(72.0, 92.0), (300.0, 92.0), (72.0, 104.0), (300.0, 104.0)],
                },
                Quad {
                    points: [(600.0, 780.0), (700.0, 780.0), (600.0, 800.0), (700.0, 800.0)],
                },
            ],
        }];
        let page = PageSize {
            width: 612.0,
            height: 792.0,
        };
        let regions = regions_from_annotations(&annotations, page, (1224, 1584));
        assert_eq!(regions.len(), 2);
        assert_eq!((regions[0].x1, regions[0].y1), (144, 184));
        assert_eq!((regions[0].x2, regions[0].y2), (600, 208));
        assert_eq!(
            regions[0].method,
            DetectionMethod::Annotation {
                annotation: 0,
                quad: 0
            }
        );
        // Quad running off the page is clamped to the image
        assert!(regions[1].fits(1224, 1584));
        assert_eq!((regions[1].x2, regions[1].y2), (1224, 1584));
    }

    #[test]
    fn test_region_to_page_rect() {
        let region = Region {
            x1: 144,
            y1: 184,
            x2: 600,
            y2: 208,
            method: DetectionMethod::Color,
        };
        assert_eq!(
            region.to_page_rect((2.0, 2.0)),
            Rect::new(72.0, 92.0, 300.0, 104.0)
        );
    }

    #[test]
    fn test_polygon_area() {
        let square = [
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_eq!(polygon_area(&square), 100.0);
        assert_eq!(polygon_area(&square[..2]), 0.0);
    }

    #[test]
    fn test_detect_figures_square_block() {
        let image = page_with_boxes(&[(100, 80, 220, 200)], Rgb([20, 20, 20]));
        let figures = detect_figures(&image, &FigureDetectorConfig::default());
        assert_eq!(figures.len(), 1);
        assert_eq!(figures[0].method, DetectionMethod::Figure);
        assert!(figures[0].fits(400, 300));
    }

    #[test]
    fn test_detect_figures_rejects_text_lines() {
        // A wide, flat block reads as a text line, not a figure
        let image = page_with_boxes(&[(20, 100, 380, 112)], Rgb([20, 20, 20]));
        assert!(detect_figures(&image, &FigureDetectorConfig::default()).is_empty());
    }
}
