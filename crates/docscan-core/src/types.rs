// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the docscan pipeline.

use serde::{Deserialize, Serialize};

/// Margin used by [`default_bounds`], as a fraction of each dimension.
pub const DEFAULT_BOUNDS_MARGIN: f32 = 0.05;

/// A point in image-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<Point> for (f32, f32) {
    fn from(p: Point) -> Self {
        (p.x, p.y)
    }
}

/// The four corners of a document outline.
///
/// Corners are always held in role order (top-left, top-right,
/// bottom-right, bottom-left). Roles come from each point's position
/// relative to the centroid, never from the order a detector found them in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentBounds {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_right: Point,
    pub bottom_left: Point,
}

impl DocumentBounds {
    pub fn new(top_left: Point, top_right: Point, bottom_right: Point, bottom_left: Point) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// Build from corners already in role order.
    pub fn from_corners(corners: [Point; 4]) -> Self {
        let [top_left, top_right, bottom_right, bottom_left] = corners;
        Self::new(top_left, top_right, bottom_right, bottom_left)
    }

    /// Corners in role order: TL, TR, BR, BL.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Flattened `x, y` pairs in role order, for drawing overlays.
    pub fn to_array(&self) -> [f32; 8] {
        let [tl, tr, br, bl] = self.corners();
        [tl.x, tl.y, tr.x, tr.y, br.x, br.y, bl.x, bl.y]
    }

    /// Scale every coordinate by `scale_x` / `scale_y`.
    ///
    /// Used to move bounds between preview and capture resolutions.
    pub fn scale(&self, scale_x: f32, scale_y: f32) -> Self {
        let s = |p: Point| Point::new(p.x * scale_x, p.y * scale_y);
        Self::new(
            s(self.top_left),
            s(self.top_right),
            s(self.bottom_right),
            s(self.bottom_left),
        )
    }

    /// True when every corner lies within `[0, width] x [0, height]`.
    ///
    /// Callers must reject invalid bounds before handing them to the
    /// processor.
    pub fn is_valid(&self, image_width: u32, image_height: u32) -> bool {
        let (w, h) = (image_width as f32, image_height as f32);
        self.corners().iter().all(|p| {
            p.is_finite() && p.x >= 0.0 && p.x <= w && p.y >= 0.0 && p.y <= h
        })
    }

    /// Larger of the top and bottom edge lengths.
    pub fn max_width(&self) -> f32 {
        self.top_left
            .distance(&self.top_right)
            .max(self.bottom_left.distance(&self.bottom_right))
    }

    /// Larger of the left and right edge lengths.
    pub fn max_height(&self) -> f32 {
        self.top_left
            .distance(&self.bottom_left)
            .max(self.top_right.distance(&self.bottom_right))
    }

    /// Approximate enclosed area: average width times average height.
    ///
    /// Cheap enough for per-frame confidence display; not an exact polygon
    /// area for strongly skewed quads.
    pub fn area(&self) -> f32 {
        let avg_width = (self.top_left.distance(&self.top_right)
            + self.bottom_left.distance(&self.bottom_right))
            / 2.0;
        let avg_height = (self.top_left.distance(&self.bottom_left)
            + self.top_right.distance(&self.bottom_right))
            / 2.0;
        avg_width * avg_height
    }
}

/// Near-full-frame fallback bounds, inset 5% from every image edge.
///
/// Used when detection finds nothing.
pub fn default_bounds(width: u32, height: u32) -> DocumentBounds {
    let (w, h) = (width as f32, height as f32);
    let margin_x = w * DEFAULT_BOUNDS_MARGIN;
    let margin_y = h * DEFAULT_BOUNDS_MARGIN;
    DocumentBounds::new(
        Point::new(margin_x, margin_y),
        Point::new(w - margin_x, margin_y),
        Point::new(w - margin_x, h - margin_y),
        Point::new(margin_x, h - margin_y),
    )
}

/// Average-width times average-height area of `bounds`.
pub fn quadrilateral_area(bounds: &DocumentBounds) -> f32 {
    bounds.area()
}

/// Detection quality/performance preset, chosen per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionTier {
    /// Live camera preview: capped resolution, stricter filters.
    Interactive,
    /// Full-resolution still capture.
    FinalCapture,
}

/// Output colour treatment applied after perspective correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorMode {
    #[default]
    Color,
    Grayscale,
    BlackAndWhite,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds_is_five_percent_inset() {
        let b = default_bounds(1000, 400);
        assert_eq!(b.top_left, Point::new(50.0, 20.0));
        assert_eq!(b.top_right, Point::new(950.0, 20.0));
        assert_eq!(b.bottom_right, Point::new(950.0, 380.0));
        assert_eq!(b.bottom_left, Point::new(50.0, 380.0));
    }

    #[test]
    fn default_bounds_strictly_inside_image() {
        for (w, h) in [(1, 1), (20, 3), (640, 480), (4032, 3024)] {
            let b = default_bounds(w, h);
            for p in b.corners() {
                assert!(p.x > 0.0 && p.x < w as f32, "x={} w={}", p.x, w);
                assert!(p.y > 0.0 && p.y < h as f32, "y={} h={}", p.y, h);
            }
            assert!(b.is_valid(w, h));
        }
    }

    #[test]
    fn area_of_axis_aligned_rectangle() {
        let b = DocumentBounds::new(
            Point::new(10.0, 10.0),
            Point::new(110.0, 10.0),
            Point::new(110.0, 60.0),
            Point::new(10.0, 60.0),
        );
        assert!((quadrilateral_area(&b) - 5000.0).abs() < 1e-3);
    }

    #[test]
    fn is_valid_rejects_out_of_range_corner() {
        let mut b = default_bounds(100, 100);
        assert!(b.is_valid(100, 100));
        b.bottom_right = Point::new(100.5, 90.0);
        assert!(!b.is_valid(100, 100));
        b.bottom_right = Point::new(f32::NAN, 90.0);
        assert!(!b.is_valid(100, 100));
    }

    #[test]
    fn scale_and_to_array_keep_role_order() {
        let b = default_bounds(200, 100).scale(2.0, 0.5);
        assert_eq!(
            b.to_array(),
            [20.0, 2.5, 380.0, 2.5, 380.0, 47.5, 20.0, 47.5]
        );
    }

    #[test]
    fn bounds_serialize_round_trip() {
        let b = default_bounds(300, 200);
        let json = serde_json::to_string(&b).unwrap();
        let back: DocumentBounds = serde_json::from_str(&json).unwrap();
        assert_eq!(b, back);
    }
}
