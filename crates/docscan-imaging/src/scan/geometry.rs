// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour geometry — polygon area and bounding boxes, closed-curve polygon
// approximation, reduction of a polygon to four corners, and assignment of
// corner roles.

use docscan_core::types::Point;
use imageproc::geometry::{approximate_polygon_dp, convex_hull};
use imageproc::point::Point as PixelPoint;

/// Axis-aligned bounding box in pixel coordinates, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl PixelRect {
    pub fn width(&self) -> i32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y + 1
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width() as f64 / self.height() as f64
    }

    /// Corners as `[TL, TR, BR, BL]` using the box's outer edges.
    pub fn corners(&self) -> [Point; 4] {
        let (x0, y0) = (self.min_x as f32, self.min_y as f32);
        let (x1, y1) = ((self.max_x + 1) as f32, (self.max_y + 1) as f32);
        [
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }
}

/// Bounding box of `points`, or `None` if empty.
pub fn bounding_rect(points: &[PixelPoint<i32>]) -> Option<PixelRect> {
    let first = points.first()?;
    let init = PixelRect {
        min_x: first.x,
        min_y: first.y,
        max_x: first.x,
        max_y: first.y,
    };
    Some(points.iter().fold(init, |r, p| PixelRect {
        min_x: r.min_x.min(p.x),
        min_y: r.min_y.min(p.y),
        max_x: r.max_x.max(p.x),
        max_y: r.max_y.max(p.y),
    }))
}

/// Unsigned area enclosed by a closed polygon (shoelace formula).
pub fn polygon_area(points: &[PixelPoint<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();
    twice.abs() as f64 / 2.0
}

/// Shoelace area for floating-point corners.
pub fn corner_area(corners: &[Point]) -> f32 {
    let n = corners.len();
    let mut area = 0.0f32;
    for i in 0..n {
        let j = (i + 1) % n;
        area += corners[i].x * corners[j].y;
        area -= corners[j].x * corners[i].y;
    }
    area.abs() / 2.0
}

/// Douglas-Peucker approximation of a closed curve.
///
/// The curve is split at two mutually distant points: `a`, the point
/// farthest from the first point, and `b`, the point farthest from `a`.
/// Both anchors are extremes of the outline, so wherever tracing started
/// the split never pins a vertex to the middle of an edge. Each half is
/// simplified on its own and vertices left redundant at the seams are
/// dropped. The result does not repeat its first vertex.
pub fn approximate_closed(curve: &[PixelPoint<i32>], epsilon: f64) -> Vec<PixelPoint<i32>> {
    if curve.len() < 3 || epsilon <= 0.0 {
        return curve.to_vec();
    }

    let a = farthest_from(curve, curve[0]);
    let b = farthest_from(curve, curve[a]);
    if a == b {
        return vec![curve[a]];
    }
    let (lo, hi) = (a.min(b), a.max(b));

    let mut polygon = approximate_polygon_dp(&curve[lo..=hi], epsilon, false);
    let wrapped: Vec<PixelPoint<i32>> = curve[hi..].iter().chain(&curve[..=lo]).copied().collect();
    let tail = approximate_polygon_dp(&wrapped, epsilon, false);

    // The halves share `hi`, and the tail ends back on `lo`.
    polygon.pop();
    polygon.extend(tail);
    polygon.pop();

    drop_redundant_vertices(&mut polygon, epsilon);
    polygon
}

/// Index of the point in `curve` farthest from `from` (0 for an empty curve).
fn farthest_from(curve: &[PixelPoint<i32>], from: PixelPoint<i32>) -> usize {
    curve
        .iter()
        .enumerate()
        .max_by_key(|(_, p)| squared_distance(from, **p))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Repeatedly remove the vertex closest to the chord between its
/// neighbours while that distance is within `epsilon`.
fn drop_redundant_vertices(polygon: &mut Vec<PixelPoint<i32>>, epsilon: f64) {
    while polygon.len() > 3 {
        let n = polygon.len();
        let candidate = (0..n)
            .map(|i| {
                let prev = polygon[(i + n - 1) % n];
                let next = polygon[(i + 1) % n];
                (i, distance_to_line(polygon[i], prev, next))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match candidate {
            Some((i, d)) if d <= epsilon => {
                polygon.remove(i);
            }
            _ => break,
        }
    }
}

fn squared_distance(a: PixelPoint<i32>, b: PixelPoint<i32>) -> i64 {
    let dx = (a.x - b.x) as i64;
    let dy = (a.y - b.y) as i64;
    dx * dx + dy * dy
}

/// Distance from `p` to the infinite line through `a` and `b` (or to `a`
/// when the two coincide).
fn distance_to_line(p: PixelPoint<i32>, a: PixelPoint<i32>, b: PixelPoint<i32>) -> f64 {
    let (dx, dy) = ((b.x - a.x) as f64, (b.y - a.y) as f64);
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return (squared_distance(p, a) as f64).sqrt();
    }
    (dy * (p.x - a.x) as f64 - dx * (p.y - a.y) as f64).abs() / len
}

fn to_point(p: PixelPoint<i32>) -> Point {
    Point::new(p.x as f32, p.y as f32)
}

/// Reduce a polygon with more than four vertices to four corner candidates.
///
/// Takes the horizontal and vertical extrema of the convex hull. When those
/// collapse onto fewer than four distinct points, the remaining slots go to
/// the hull points farthest from the hull centroid. Polygons of four or
/// fewer vertices are returned as they are.
pub fn reduce_to_corners(vertices: &[PixelPoint<i32>]) -> Vec<Point> {
    if vertices.len() <= 4 {
        return vertices.iter().copied().map(to_point).collect();
    }

    let hull = convex_hull(vertices);
    if hull.len() < 4 {
        return vertices.iter().take(4).copied().map(to_point).collect();
    }

    extreme_points(&hull).into_iter().map(to_point).collect()
}

fn extreme_points(hull: &[PixelPoint<i32>]) -> Vec<PixelPoint<i32>> {
    if hull.len() <= 4 {
        return hull.to_vec();
    }

    let mut extremes: Vec<PixelPoint<i32>> = Vec::with_capacity(4);
    let candidates = [
        hull.iter().min_by_key(|p| p.x),
        hull.iter().max_by_key(|p| p.x),
        hull.iter().min_by_key(|p| p.y),
        hull.iter().max_by_key(|p| p.y),
    ];
    for p in candidates.into_iter().flatten() {
        if !extremes.contains(p) {
            extremes.push(*p);
        }
    }
    if extremes.len() >= 4 {
        extremes.truncate(4);
        return extremes;
    }

    let n = hull.len() as f64;
    let cx = hull.iter().map(|p| p.x as f64).sum::<f64>() / n;
    let cy = hull.iter().map(|p| p.y as f64).sum::<f64>() / n;
    let dist = |p: &PixelPoint<i32>| {
        let (dx, dy) = (p.x as f64 - cx, p.y as f64 - cy);
        dx * dx + dy * dy
    };

    let mut rest: Vec<PixelPoint<i32>> = hull
        .iter()
        .filter(|p| !extremes.contains(p))
        .copied()
        .collect();
    rest.sort_by(|a, b| dist(b).total_cmp(&dist(a)));

    extremes.extend(rest);
    extremes.truncate(4);
    extremes
}

/// Assign TL/TR/BR/BL roles to four points by their position relative to
/// the centroid.
///
/// Inside each quadrant the winner is the point that is most extreme for
/// that role (TL minimises `x + y`, TR maximises `x - y`, BL maximises
/// `y - x`, BR maximises `x + y`). If some quadrant stays empty the points
/// are instead sorted by polar angle around the centroid (ascending
/// `atan2`, so clockwise on screen starting from the left).
///
/// Returns `None` for fewer than four points.
pub fn order_corners(points: &[Point]) -> Option<[Point; 4]> {
    if points.len() < 4 {
        return None;
    }

    let n = points.len() as f32;
    let cx = points.iter().map(|p| p.x).sum::<f32>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f32>() / n;

    let mut top_left: Option<Point> = None;
    let mut top_right: Option<Point> = None;
    let mut bottom_right: Option<Point> = None;
    let mut bottom_left: Option<Point> = None;

    for &p in points {
        let (left, right) = (p.x < cx, p.x > cx);
        let (top, bottom) = (p.y < cy, p.y > cy);
        if left && top {
            if top_left.is_none_or(|q| p.x + p.y < q.x + q.y) {
                top_left = Some(p);
            }
        } else if right && top {
            if top_right.is_none_or(|q| p.x - p.y > q.x - q.y) {
                top_right = Some(p);
            }
        } else if left && bottom {
            if bottom_left.is_none_or(|q| p.y - p.x > q.y - q.x) {
                bottom_left = Some(p);
            }
        } else if right && bottom && bottom_right.is_none_or(|q| p.x + p.y > q.x + q.y) {
            bottom_right = Some(p);
        }
    }

    if let (Some(tl), Some(tr), Some(br), Some(bl)) = (top_left, top_right, bottom_right, bottom_left)
    {
        return Some([tl, tr, br, bl]);
    }

    // Degenerate layout: fall back to angular order around the centroid.
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| {
        let angle_a = (a.y - cy).atan2(a.x - cx);
        let angle_b = (b.y - cy).atan2(b.x - cx);
        angle_a.total_cmp(&angle_b)
    });
    Some([sorted[0], sorted[1], sorted[2], sorted[3]])
}
