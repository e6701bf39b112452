// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — loading, clip-to-outline, rotation, fit-within-box
// scaling, and encoding for the export stage. Operates on in-memory images
// using the `image` and `imageproc` crates.

use docscan_core::error::{DocScanError, Result};
use docscan_core::types::DocumentBounds;
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgba, RgbaImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use imageproc::point::Point as PixelPoint;
use tracing::{debug, info, instrument, warn};

/// Auxiliary operations on a single in-memory image.
///
/// Transformations consume `self` and return a new `ImageProcessor`
/// wrapping the result, enabling method chaining.
///
/// ```ignore
/// let thumb = ImageProcessor::open("page.jpg")?
///     .rotate(90.0)
///     .scale_to_fit(1024, 1024)
///     .to_jpeg_bytes(90)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let img = image::open(path.as_ref()).map_err(|err| {
            DocScanError::ImageError(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data).map_err(|err| {
            DocScanError::ImageError(format!("failed to decode image: {}", err))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Downscale uniformly so the image fits within `max_width` x
    /// `max_height`. Never upscales: an image that already fits is returned
    /// unchanged.
    #[instrument(skip(self), fields(max_width, max_height))]
    pub fn scale_to_fit(self, max_width: u32, max_height: u32) -> Self {
        let (width, height) = (self.image.width(), self.image.height());
        if max_width == 0 || max_height == 0 {
            warn!(max_width, max_height, "Empty target box; leaving image unscaled");
            return self;
        }
        if width <= max_width && height <= max_height {
            debug!(width, height, "Image already fits; not scaling");
            return self;
        }

        let resized = self
            .image
            .resize(max_width, max_height, image::imageops::FilterType::Lanczos3);
        info!(
            from_w = width,
            from_h = height,
            new_w = resized.width(),
            new_h = resized.height(),
            "Image scaled to fit"
        );
        Self { image: resized }
    }

    /// Rotate the image by an arbitrary angle in degrees (clockwise).
    ///
    /// For 90/180/270 degree rotations, lossless rotation is used. Other
    /// angles use bilinear interpolation about the centre, and the canvas
    /// expands to the rotated bounding box so no content is cut off;
    /// uncovered areas become transparent.
    #[instrument(skip(self), fields(degrees))]
    pub fn rotate(self, degrees: f32) -> Self {
        info!(degrees, "Rotating image");

        // Fast-path for exact multiples of 90.
        let normalised = degrees.rem_euclid(360.0);
        if (normalised - 90.0).abs() < 0.01 {
            return Self {
                image: self.image.rotate90(),
            };
        }
        if (normalised - 180.0).abs() < 0.01 {
            return Self {
                image: self.image.rotate180(),
            };
        }
        if (normalised - 270.0).abs() < 0.01 {
            return Self {
                image: self.image.rotate270(),
            };
        }
        if normalised.abs() < 0.01 || (normalised - 360.0).abs() < 0.01 {
            return self;
        }

        let rgba = self.image.to_rgba8();
        let (width, height) = (rgba.width() as f32, rgba.height() as f32);
        let theta = degrees.to_radians();
        let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
        let new_w = ((width * cos + height * sin).round() as u32).max(1);
        let new_h = ((width * sin + height * cos).round() as u32).max(1);

        // Move the source centre to the origin, rotate, then onto the
        // centre of the enlarged canvas.
        let projection = Projection::translate(new_w as f32 / 2.0, new_h as f32 / 2.0)
            * Projection::rotate(theta)
            * Projection::translate(-width / 2.0, -height / 2.0);

        let mut rotated = RgbaImage::new(new_w, new_h);
        warp_into(
            &rgba,
            &projection,
            Interpolation::Bilinear,
            Rgba([255u8, 255, 255, 0]),
            &mut rotated,
        );

        debug!(new_w, new_h, "General rotation applied");
        Self {
            image: DynamicImage::ImageRgba8(rotated),
        }
    }

    /// Clip the image to the quadrilateral `bounds`.
    ///
    /// The canvas keeps its size; pixels outside the outline become fully
    /// transparent. Fails when the outline rounds to fewer than three
    /// distinct pixel positions.
    #[instrument(skip(self, bounds))]
    pub fn crop_to_bounds(self, bounds: &DocumentBounds) -> Result<Self> {
        let (width, height) = (self.image.width(), self.image.height());

        let mut outline: Vec<PixelPoint<i32>> = Vec::with_capacity(4);
        for corner in bounds.corners() {
            let p = PixelPoint::new(corner.x.round() as i32, corner.y.round() as i32);
            if !outline.contains(&p) {
                outline.push(p);
            }
        }
        if outline.len() < 3 {
            return Err(DocScanError::DegenerateGeometry(format!(
                "crop outline has only {} distinct corners",
                outline.len()
            )));
        }

        let mut mask = GrayImage::new(width, height);
        draw_polygon_mut(&mut mask, &outline, Luma([255u8]));

        let mut rgba = self.image.to_rgba8();
        for (pixel, inside) in rgba.pixels_mut().zip(mask.pixels()) {
            if inside.0[0] == 0 {
                *pixel = Rgba([0, 0, 0, 0]);
            }
        }

        info!(width, height, "Image clipped to document outline");
        Ok(Self {
            image: DynamicImage::ImageRgba8(rgba),
        })
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder).map_err(|err| {
            DocScanError::ImageError(format!("JPEG encoding failed: {}", err))
        })?;
        Ok(buffer)
    }

    /// Write the image to a file. The format is inferred from the file
    /// extension; JPEG output uses `jpeg_quality`.
    pub fn save(&self, path: impl AsRef<std::path::Path>, jpeg_quality: u8) -> Result<()> {
        let path = path.as_ref();
        let is_jpeg = matches!(
            ImageFormat::from_path(path),
            Ok(ImageFormat::Jpeg)
        );
        if is_jpeg {
            let bytes = self.to_jpeg_bytes(jpeg_quality)?;
            std::fs::write(path, bytes)?;
            return Ok(());
        }
        self.image.save(path).map_err(|err| {
            DocScanError::ImageError(format!(
                "failed to save image to {}: {}",
                path.display(),
                err
            ))
        })
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image.write_to(&mut cursor, format).map_err(|err| {
        DocScanError::ImageError(format!("image encoding failed: {}", err))
    })?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docscan_core::types::{Point, default_bounds};
    use image::{Rgb, RgbImage};

    fn sample(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    #[test]
    fn scale_to_fit_downscales_preserving_aspect() {
        let out = ImageProcessor::from_dynamic(sample(400, 200)).scale_to_fit(100, 100);
        assert_eq!((out.width(), out.height()), (100, 50));
    }

    #[test]
    fn scale_to_fit_never_upscales() {
        let out = ImageProcessor::from_dynamic(sample(40, 20)).scale_to_fit(1000, 1000);
        assert_eq!((out.width(), out.height()), (40, 20));
    }

    #[test]
    fn rotate_quarter_turn_swaps_dimensions() {
        let out = ImageProcessor::from_dynamic(sample(30, 10)).rotate(90.0);
        assert_eq!((out.width(), out.height()), (10, 30));
        let out = ImageProcessor::from_dynamic(sample(30, 10)).rotate(-270.0);
        assert_eq!((out.width(), out.height()), (10, 30));
        let out = ImageProcessor::from_dynamic(sample(30, 10)).rotate(360.0);
        assert_eq!((out.width(), out.height()), (30, 10));
    }

    #[test]
    fn rotate_arbitrary_angle_expands_canvas() {
        let out = ImageProcessor::from_dynamic(sample(100, 50)).rotate(45.0);
        // (100 + 50) * cos 45 = 106.07
        assert_eq!((out.width(), out.height()), (106, 106));

        let rgba = out.into_dynamic().to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0).0[3], 0, "corner should be uncovered");
        assert_eq!(rgba.get_pixel(53, 53).0[3], 255, "centre should be opaque");
    }

    #[test]
    fn rotate_arbitrary_angle_keeps_whole_page() {
        let (w, h) = (120u32, 80u32);
        let out = ImageProcessor::from_dynamic(sample(w, h))
            .rotate(-30.0)
            .into_dynamic()
            .to_rgba8();
        assert!(out.width() > w && out.height() > h);

        // Every source pixel still lands somewhere on the canvas; only the
        // anti-aliased rim is partially transparent.
        let opaque = out.pixels().filter(|p| p.0[3] == 255).count() as f32;
        let covered = out.pixels().filter(|p| p.0[3] > 0).count() as f32;
        let area = (w * h) as f32;
        assert!(opaque > area * 0.9, "opaque {opaque} of {area}");
        assert!(covered < area * 1.1, "covered {covered} of {area}");
    }

    #[test]
    fn crop_to_bounds_makes_outside_transparent() {
        let img = sample(100, 100);
        let bounds = default_bounds(100, 100);
        let out = ImageProcessor::from_dynamic(img)
            .crop_to_bounds(&bounds)
            .unwrap()
            .into_dynamic()
            .to_rgba8();
        assert_eq!(out.dimensions(), (100, 100));
        assert_eq!(out.get_pixel(1, 1).0[3], 0);
        assert_eq!(out.get_pixel(98, 50).0[3], 0);
        assert_eq!(out.get_pixel(50, 50).0, [50, 50, 128, 255]);
    }

    #[test]
    fn crop_to_collapsed_bounds_fails() {
        let p = Point::new(10.0, 10.0);
        let bounds = DocumentBounds::new(p, p, p, Point::new(10.2, 9.8));
        let result = ImageProcessor::from_dynamic(sample(20, 20)).crop_to_bounds(&bounds);
        assert!(matches!(result, Err(DocScanError::DegenerateGeometry(_))));
    }

    #[test]
    fn png_round_trip_keeps_dimensions() {
        let bytes = ImageProcessor::from_dynamic(sample(17, 9)).to_png_bytes().unwrap();
        let decoded = ImageProcessor::from_bytes(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (17, 9));
    }

    #[test]
    fn from_bytes_rejects_garbage() {
        assert!(matches!(
            ImageProcessor::from_bytes(b"definitely not an image"),
            Err(DocScanError::ImageError(_))
        ));
    }

    #[test]
    fn save_jpeg_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.jpg");
        ImageProcessor::from_dynamic(sample(32, 24)).save(&path, 90).unwrap();
        let reopened = ImageProcessor::open(&path).unwrap();
        assert_eq!((reopened.width(), reopened.height()), (32, 24));
    }
}
