// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document boundary detection — locates the outline of a photographed page
// and returns its four corners in role order.

use docscan_core::config::{DetectionParams, ScanConfig};
use docscan_core::error::{DocScanError, Result};
use docscan_core::types::{DetectionTier, DocumentBounds, Point};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage};
use imageproc::contours::find_contours;
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::arc_length;
use imageproc::morphology::close;
use imageproc::point::Point as PixelPoint;
use tracing::{debug, info, instrument, warn};

use crate::scan::geometry::{
    PixelRect, approximate_closed, bounding_rect, corner_area, order_corners, polygon_area,
    reduce_to_corners,
};

/// Finds the quadrilateral outline of a document in a raster image.
///
/// Holds one parameter table per [`DetectionTier`] and nothing else, so a
/// single detector can be shared freely across threads.
#[derive(Debug, Clone)]
pub struct BoundaryDetector {
    interactive: DetectionParams,
    final_capture: DetectionParams,
}

impl Default for BoundaryDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundaryDetector {
    /// Detector using the built-in tier presets.
    pub fn new() -> Self {
        Self {
            interactive: DetectionParams::interactive(),
            final_capture: DetectionParams::final_capture(),
        }
    }

    /// Detector with custom per-tier tables.
    pub fn with_params(interactive: DetectionParams, final_capture: DetectionParams) -> Self {
        Self {
            interactive,
            final_capture,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::with_params(config.interactive.clone(), config.final_capture.clone())
    }

    /// Parameter table used for `tier`.
    pub fn params(&self, tier: DetectionTier) -> &DetectionParams {
        match tier {
            DetectionTier::Interactive => &self.interactive,
            DetectionTier::FinalCapture => &self.final_capture,
        }
    }

    /// Detect the document outline in `image`.
    ///
    /// Returns `None` when no plausible document is found. Detection is
    /// best effort: internal geometry failures are logged and reported as
    /// a miss, never as an error.
    ///
    /// ## Pipeline
    ///
    /// 1. Downscale to the tier's resolution cap (interactive only)
    /// 2. Grayscale conversion
    /// 3. Gaussian blur
    /// 4. Canny edge detection
    /// 5. Morphological closing to bridge gaps in the outline
    /// 6. Contour tracing
    /// 7. Area / perimeter filtering
    /// 8. Area x aspect-ratio scoring, best candidate wins
    /// 9. Polygon approximation over a table of tolerances
    /// 10. Reduction to four corners when the polygon has more
    /// 11. Corner role assignment
    /// 12. Rescale to the input resolution
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn detect(&self, image: &DynamicImage, tier: DetectionTier) -> Option<DocumentBounds> {
        match detect_with_params(image, self.params(tier)) {
            Ok(Some(bounds)) => {
                info!(corners = ?bounds.to_array(), "Document boundary detected");
                Some(bounds)
            }
            Ok(None) => {
                debug!("No document boundary found");
                None
            }
            Err(err) => {
                warn!(error = %err, "Boundary detection failed; treating as no detection");
                None
            }
        }
    }
}

/// Detect with the built-in preset for `tier`.
pub fn detect(image: &DynamicImage, tier: DetectionTier) -> Option<DocumentBounds> {
    BoundaryDetector::new().detect(image, tier)
}

/// A traced boundary that survived filtering.
#[derive(Debug, Clone)]
struct ContourCandidate {
    points: Vec<PixelPoint<i32>>,
    bbox: PixelRect,
    score: f64,
}

/// Run the detection pipeline with an explicit parameter table.
///
/// `Ok(None)` is an ordinary miss. `Err` signals a geometry or input
/// failure that the public entry point folds into a miss.
pub fn detect_with_params(
    image: &DynamicImage,
    params: &DetectionParams,
) -> Result<Option<DocumentBounds>> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(DocScanError::EmptyImage { width, height });
    }

    // Step 1+2: Optional downscale, then grayscale.
    let (gray, scale_back) = working_gray(image, params.max_dimension);
    let (work_w, work_h) = gray.dimensions();
    debug!(work_w, work_h, scale_back, "Working image prepared");

    // Step 3: Noise suppression.
    let blurred = gaussian_blur_f32(&gray, params.blur_sigma());
    drop(gray);

    // Step 4: Edge map.
    let edges = canny(&blurred, params.canny_low, params.canny_high);
    drop(blurred);

    // Step 5: Close small gaps. A square element of side 2k+1 is the
    // L-infinity ball of radius k.
    let radius = u8::try_from(params.morph_kernel_size / 2).map_err(|_| {
        DocScanError::Config(format!(
            "morph_kernel_size {} is too large",
            params.morph_kernel_size
        ))
    })?;
    let closed = close(&edges, Norm::LInf, radius);
    drop(edges);

    // Step 6: Trace every border, outer and hole alike.
    let contours = find_contours::<i32>(&closed);
    drop(closed);
    debug!(contours = contours.len(), "Contours traced");

    // Steps 7+8: Filter and score.
    let image_area = work_w as f64 * work_h as f64;
    let best = contours
        .into_iter()
        .filter_map(|contour| evaluate_candidate(contour.points, image_area, params))
        .max_by(|a, b| a.score.total_cmp(&b.score));

    let Some(candidate) = best else {
        return Ok(None);
    };
    debug!(
        score = candidate.score,
        points = candidate.points.len(),
        "Best contour selected"
    );

    // Steps 9-11: Corners in role order.
    let corners = document_corners(&candidate, params)?;

    if corner_area(&corners) <= f32::EPSILON {
        return Err(DocScanError::DegenerateGeometry(
            "detected corners enclose no area".into(),
        ));
    }

    // Step 12: Back to input resolution.
    let mut bounds = DocumentBounds::from_corners(corners);
    if scale_back != 1.0 {
        bounds = bounds.scale(scale_back, scale_back);
    }

    if bounds.corners().iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(DocScanError::DegenerateGeometry(
            "non-finite corner coordinate".into(),
        ));
    }

    Ok(Some(bounds))
}

/// Grayscale working copy, downscaled so its longer side is at most
/// `max_dimension`. Also returns the factor that maps working coordinates
/// back to the input.
fn working_gray(image: &DynamicImage, max_dimension: Option<u32>) -> (GrayImage, f32) {
    let (width, height) = (image.width(), image.height());
    let longest = width.max(height);

    match max_dimension {
        Some(cap) if longest > cap => {
            let scale = cap as f64 / longest as f64;
            let new_w = ((width as f64 * scale).round() as u32).max(1);
            let new_h = ((height as f64 * scale).round() as u32).max(1);
            let resized = image.resize_exact(new_w, new_h, FilterType::Triangle);
            (resized.to_luma8(), longest as f32 / cap as f32)
        }
        _ => (image.to_luma8(), 1.0),
    }
}

/// Apply the area / perimeter filters and compute the score, or drop the
/// contour.
fn evaluate_candidate(
    points: Vec<PixelPoint<i32>>,
    image_area: f64,
    params: &DetectionParams,
) -> Option<ContourCandidate> {
    if points.len() < 3 {
        return None;
    }

    let area = polygon_area(&points);
    if area <= image_area * params.min_area_ratio || area >= image_area * params.max_area_ratio {
        return None;
    }

    let perimeter = arc_length(&points, true);
    if perimeter <= params.min_perimeter {
        return None;
    }

    let bbox = bounding_rect(&points)?;
    let score = area * aspect_factor(bbox.aspect_ratio());
    Some(ContourCandidate {
        points,
        bbox,
        score,
    })
}

/// Preference for page-like bounding boxes.
fn aspect_factor(aspect_ratio: f64) -> f64 {
    if aspect_ratio > 0.5 && aspect_ratio < 2.0 {
        1.0
    } else if aspect_ratio > 0.3 && aspect_ratio < 3.0 {
        0.7
    } else {
        0.3
    }
}

/// Approximate the candidate as a polygon and turn it into four ordered
/// corners.
fn document_corners(candidate: &ContourCandidate, params: &DetectionParams) -> Result<[Point; 4]> {
    let perimeter = arc_length(&candidate.points, true);

    let mut best: Option<Vec<PixelPoint<i32>>> = None;
    for &factor in &params.epsilon_factors {
        let approx = approximate_closed(&candidate.points, factor * perimeter);
        debug!(factor, vertices = approx.len(), "Polygon approximation pass");
        if approx.len() == 4 {
            best = Some(approx);
            break;
        }
        if approx.len() > 4 && best.is_none() {
            best = Some(approx);
        }
    }

    let points = match best {
        Some(vertices) => reduce_to_corners(&vertices),
        None => {
            debug!("Approximation collapsed below four vertices; using bounding box");
            candidate.bbox.corners().to_vec()
        }
    };

    order_corners(&points).ok_or_else(|| {
        DocScanError::DegenerateGeometry(format!(
            "expected four corner candidates, found {}",
            points.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn assert_near(actual: Point, expected: (f32, f32), tol: f32) {
        assert!(
            (actual.x - expected.0).abs() <= tol && (actual.y - expected.1).abs() <= tol,
            "expected ~{expected:?}, got {actual:?}"
        );
    }

    fn white_rect_on_black(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> DynamicImage {
        let mut img = GrayImage::from_pixel(w, h, Luma([0u8]));
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, Luma([255u8]));
            }
        }
        DynamicImage::ImageLuma8(img)
    }

    #[test]
    fn detects_rectangle_at_final_capture() {
        let img = white_rect_on_black(1000, 1000, 200, 300, 800, 700);
        let bounds = detect(&img, DetectionTier::FinalCapture).expect("rectangle should be found");
        assert_near(bounds.top_left, (200.0, 300.0), 3.0);
        assert_near(bounds.top_right, (800.0, 300.0), 3.0);
        assert_near(bounds.bottom_right, (800.0, 700.0), 3.0);
        assert_near(bounds.bottom_left, (200.0, 700.0), 3.0);
    }

    #[test]
    fn detects_rectangle_at_interactive_with_downscale() {
        let img = white_rect_on_black(1000, 1000, 200, 300, 800, 700);
        let bounds = detect(&img, DetectionTier::Interactive).expect("rectangle should be found");
        assert_near(bounds.top_left, (200.0, 300.0), 5.0);
        assert_near(bounds.top_right, (800.0, 300.0), 5.0);
        assert_near(bounds.bottom_right, (800.0, 700.0), 5.0);
        assert_near(bounds.bottom_left, (200.0, 700.0), 5.0);
        assert!(bounds.is_valid(1000, 1000));
    }

    #[test]
    fn detects_portrait_page_in_colour_image() {
        let mut img = RgbImage::from_pixel(640, 480, Rgb([40, 45, 50]));
        for y in 60..420 {
            for x in 200..460 {
                img.put_pixel(x, y, Rgb([235, 230, 220]));
            }
        }
        let img = DynamicImage::ImageRgb8(img);
        for tier in [DetectionTier::Interactive, DetectionTier::FinalCapture] {
            let bounds = detect(&img, tier).expect("page should be found");
            assert_near(bounds.top_left, (200.0, 60.0), 3.0);
            assert_near(bounds.bottom_right, (460.0, 420.0), 3.0);
        }
    }

    #[test]
    fn all_black_image_has_no_document() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(400, 300, Luma([0u8])));
        assert!(detect(&img, DetectionTier::FinalCapture).is_none());
        assert!(detect(&img, DetectionTier::Interactive).is_none());
    }

    #[test]
    fn empty_image_is_an_error_internally_and_a_miss_publicly() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        assert!(matches!(
            detect_with_params(&img, &DetectionParams::final_capture()),
            Err(DocScanError::EmptyImage { .. })
        ));
        assert!(detect(&img, DetectionTier::FinalCapture).is_none());
    }

    #[test]
    fn tiny_blob_is_filtered_out() {
        // 20x20 square in a 1000x1000 frame: 0.04% of the area.
        let img = white_rect_on_black(1000, 1000, 500, 500, 520, 520);
        assert!(detect(&img, DetectionTier::FinalCapture).is_none());
    }

    #[test]
    fn custom_params_are_honoured() {
        let img = white_rect_on_black(400, 400, 100, 100, 300, 300);
        let mut strict = DetectionParams::final_capture();
        strict.min_area_ratio = 0.5;
        let detector = BoundaryDetector::with_params(DetectionParams::interactive(), strict);
        assert!(detector.detect(&img, DetectionTier::FinalCapture).is_none());
        assert!(detector.detect(&img, DetectionTier::Interactive).is_some());
    }

    #[test]
    fn aspect_factor_bands() {
        assert_eq!(aspect_factor(1.0), 1.0);
        assert_eq!(aspect_factor(0.4), 0.7);
        assert_eq!(aspect_factor(2.5), 0.7);
        assert_eq!(aspect_factor(5.0), 0.3);
        assert_eq!(aspect_factor(0.5), 0.7);
    }

    #[test]
    fn working_gray_caps_longer_side() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(1600, 900));
        let (gray, scale_back) = working_gray(&img, Some(800));
        assert_eq!(gray.dimensions(), (800, 450));
        assert!((scale_back - 2.0).abs() < 1e-6);

        let (gray, scale_back) = working_gray(&img, None);
        assert_eq!(gray.dimensions(), (1600, 900));
        assert_eq!(scale_back, 1.0);
    }
}
