//! Quadrilateral presence check.
//!
//! Shape alone cannot tell pads apart, so this strategy never claims a pad
//! id. It reports whether a large convex quadrilateral is visible; the
//! detector records it as corroborating evidence and can optionally require
//! it before accepting a fused decision.

use super::Query;
use crate::trace::{trace_event, trace_span};
use crate::util::math::{is_convex, polygon_signed_area};
use crate::util::PadMatchResult;
use imageproc::contours::{find_contours, BorderType};
use imageproc::edges::canny;
use imageproc::geometry::{approximate_polygon_dp, arc_length};

/// Contour detection parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ContourConfig {
    /// Canny hysteresis low threshold.
    pub canny_low: f32,
    /// Canny hysteresis high threshold.
    pub canny_high: f32,
    /// Polygon approximation tolerance as a fraction of the perimeter.
    pub epsilon_ratio: f64,
    /// Minimum quadrilateral area in canonical pixels.
    pub min_area: f64,
    /// Confidence attached to a detected shape.
    pub shape_confidence: f32,
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            epsilon_ratio: 0.02,
            min_area: 1000.0,
            shape_confidence: 0.3,
        }
    }
}

/// A convex quadrilateral found in the query.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeEvidence {
    pub confidence: f32,
    /// Polygon area in canonical pixels.
    pub area: f64,
    /// Corner points in contour order.
    pub corners: [(i32, i32); 4],
}

/// Finds the largest convex quadrilateral among external contours.
pub fn detect(query: &Query, cfg: &ContourConfig) -> PadMatchResult<Option<ShapeEvidence>> {
    let _span = trace_span!("contour_check").entered();
    let edges = canny(query.canonical(), cfg.canny_low, cfg.canny_high);

    let mut best: Option<ShapeEvidence> = None;
    for contour in find_contours::<i32>(&edges) {
        if !matches!(contour.border_type, BorderType::Outer) || contour.parent.is_some() {
            continue;
        }
        if contour.points.len() < 4 {
            continue;
        }
        let epsilon = cfg.epsilon_ratio * arc_length(&contour.points, true);
        if epsilon <= 0.0 {
            continue;
        }
        let poly = approximate_polygon_dp(&contour.points, epsilon, true);
        let pts = merge_close_vertices(
            poly.iter().map(|p| (p.x as f64, p.y as f64)).collect(),
            epsilon,
        );
        if pts.len() != 4 {
            continue;
        }
        let area = polygon_signed_area(&pts).abs();
        if area < cfg.min_area || !is_convex(&pts) {
            continue;
        }
        if best.as_ref().map_or(true, |b| area > b.area) {
            best = Some(ShapeEvidence {
                confidence: cfg.shape_confidence,
                area,
                corners: [0, 1, 2, 3].map(|i| (pts[i].0 as i32, pts[i].1 as i32)),
            });
        }
    }

    if let Some(shape) = &best {
        trace_event!("quad_found", area = shape.area);
    }
    Ok(best)
}

/// Drops vertices closer than `min_dist` to the previously kept one,
/// including the wrap-around from the last vertex to the first.
fn merge_close_vertices(points: Vec<(f64, f64)>, min_dist: f64) -> Vec<(f64, f64)> {
    let close = |a: (f64, f64), b: (f64, f64)| (a.0 - b.0).hypot(a.1 - b.1) < min_dist;
    let mut kept: Vec<(f64, f64)> = Vec::with_capacity(points.len());
    for p in points {
        if kept.last().map_or(true, |&last| !close(last, p)) {
            kept.push(p);
        }
    }
    while kept.len() > 1 && close(kept[0], kept[kept.len() - 1]) {
        kept.pop();
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::{detect, merge_close_vertices, ContourConfig};
    use crate::strategy::Query;
    use image::{GrayImage, Luma};

    fn square_on_dark(size: u32, x0: u32, side: u32) -> GrayImage {
        let mut img = GrayImage::from_pixel(size, size, Luma([15]));
        for y in x0..x0 + side {
            for x in x0..x0 + side {
                img.put_pixel(x, y, Luma([235]));
            }
        }
        img
    }

    #[test]
    fn large_square_is_found() {
        let query = Query::new(square_on_dark(128, 30, 60), 128).unwrap();
        let shape = detect(&query, &ContourConfig::default()).unwrap().unwrap();
        assert!(shape.area > 3000.0 && shape.area < 4500.0, "area {}", shape.area);
        assert!((shape.confidence - 0.3).abs() < 1e-6);
    }

    #[test]
    fn small_square_is_ignored() {
        let query = Query::new(square_on_dark(128, 50, 20), 128).unwrap();
        assert!(detect(&query, &ContourConfig::default()).unwrap().is_none());
    }

    #[test]
    fn closing_duplicate_vertex_is_merged() {
        let pts = vec![
            (0.0, 0.0),
            (50.0, 0.0),
            (50.0, 50.0),
            (0.0, 50.0),
            (0.0, 1.0),
        ];
        assert_eq!(merge_close_vertices(pts, 3.0).len(), 4);
    }

    #[test]
    fn flat_frame_has_no_shape() {
        let query = Query::new(GrayImage::from_pixel(96, 96, Luma([128])), 96).unwrap();
        assert!(detect(&query, &ContourConfig::default()).unwrap().is_none());
    }
}
