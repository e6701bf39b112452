// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement pipeline — perspective correction onto the document
// rectangle, then a colour-mode stage (luminance CLAHE, grayscale, or
// adaptive binarisation).

use std::borrow::Cow;

use docscan_core::config::{EnhanceParams, ScanConfig};
use docscan_core::error::{DocScanError, Result};
use docscan_core::types::{ColorMode, DocumentBounds};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, info, instrument, warn};

use crate::image::processor::ImageProcessor;
use crate::scan::geometry::corner_area;
use crate::scan::tonal::{adaptive_threshold_gaussian, clahe, clahe_rgb, clahe_rgba};

/// Flattens and enhances captured document images.
///
/// Stateless apart from its parameters: every call owns its buffers from
/// start to finish, so one enhancer can serve many threads.
#[derive(Debug, Clone, Default)]
pub struct ScanEnhancer {
    params: EnhanceParams,
}

impl ScanEnhancer {
    // -- Construction ---------------------------------------------------------

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: EnhanceParams) -> Self {
        Self { params }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::with_params(config.enhance.clone())
    }

    pub fn params(&self) -> &EnhanceParams {
        &self.params
    }

    // -- Full pipeline --------------------------------------------------------

    /// Correct perspective (when `bounds` is given) and apply `mode`.
    ///
    /// Never fails: if any stage errors, the original image is returned
    /// unchanged. Bounds that collapse to a line or point skip the warp and
    /// the colour stage still runs.
    #[instrument(
        skip(self, image, bounds),
        fields(width = image.width(), height = image.height(), has_bounds = bounds.is_some())
    )]
    pub fn process(
        &self,
        image: DynamicImage,
        bounds: Option<&DocumentBounds>,
        mode: ColorMode,
        enhance_contrast: bool,
    ) -> DynamicImage {
        if bounds.is_none() && mode == ColorMode::Color && !enhance_contrast {
            debug!("Nothing to do; returning input");
            return image;
        }

        match self.try_process(&image, bounds, mode, enhance_contrast) {
            Ok(processed) => {
                info!(
                    out_w = processed.width(),
                    out_h = processed.height(),
                    "Document processed"
                );
                processed
            }
            Err(err) => {
                warn!(error = %err, "Document processing failed; returning original image");
                image
            }
        }
    }

    fn try_process(
        &self,
        image: &DynamicImage,
        bounds: Option<&DocumentBounds>,
        mode: ColorMode,
        enhance_contrast: bool,
    ) -> Result<DynamicImage> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(DocScanError::EmptyImage { width, height });
        }

        // Step 1: Perspective correction.
        let corrected: Cow<'_, DynamicImage> = match bounds {
            Some(bounds) => match self.correct_perspective(image, bounds) {
                Ok(warped) => Cow::Owned(warped),
                Err(DocScanError::DegenerateGeometry(reason)) => {
                    warn!(%reason, "Degenerate bounds; skipping perspective correction");
                    Cow::Borrowed(image)
                }
                Err(err) => return Err(err),
            },
            None => Cow::Borrowed(image),
        };

        // Step 2: Colour mode.
        Ok(self.apply_color_mode(corrected, mode, enhance_contrast))
    }

    /// Decode `data`, process it, and re-encode as PNG.
    ///
    /// Returns `data` unchanged when it cannot be decoded or the result
    /// cannot be encoded.
    #[instrument(skip(self, data, bounds), fields(data_len = data.len()))]
    pub fn process_bytes(
        &self,
        data: &[u8],
        bounds: Option<&DocumentBounds>,
        mode: ColorMode,
        enhance_contrast: bool,
    ) -> Vec<u8> {
        let image = match ImageProcessor::from_bytes(data) {
            Ok(processor) => processor.into_dynamic(),
            Err(err) => {
                warn!(error = %err, "Undecodable input; returning original bytes");
                return data.to_vec();
            }
        };

        let processed = self.process(image, bounds, mode, enhance_contrast);
        match ImageProcessor::from_dynamic(processed).to_png_bytes() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "Encoding failed; returning original bytes");
                data.to_vec()
            }
        }
    }

    // -- Perspective correction -----------------------------------------------

    /// Warp the quadrilateral `bounds` onto an upright rectangle.
    ///
    /// The output is as wide as the longer of the top and bottom edges and
    /// as tall as the longer of the left and right edges. Luma, RGB and
    /// RGBA inputs keep their pixel type; anything else is warped as RGBA.
    ///
    /// Errors with `InvalidBounds` when a corner lies outside the image and
    /// with `DegenerateGeometry` when the corners enclose no area or no
    /// projective mapping exists.
    #[instrument(skip(self, image, bounds))]
    pub fn correct_perspective(
        &self,
        image: &DynamicImage,
        bounds: &DocumentBounds,
    ) -> Result<DynamicImage> {
        let (width, height) = (image.width(), image.height());
        if !bounds.is_valid(width, height) {
            return Err(DocScanError::InvalidBounds { width, height });
        }

        let out_w = bounds.max_width() as u32;
        let out_h = bounds.max_height() as u32;
        if out_w == 0 || out_h == 0 {
            return Err(DocScanError::DegenerateGeometry(format!(
                "destination rectangle is {out_w}x{out_h}"
            )));
        }
        if corner_area(&bounds.corners()) < 1.0 {
            return Err(DocScanError::DegenerateGeometry(
                "corners are collinear".into(),
            ));
        }

        let src = bounds.corners().map(<(f32, f32)>::from);
        let dest: [(f32, f32); 4] = [
            (0.0, 0.0),                   // top-left
            (out_w as f32, 0.0),          // top-right
            (out_w as f32, out_h as f32), // bottom-right
            (0.0, out_h as f32),          // bottom-left
        ];

        let projection = Projection::from_control_points(src, dest).ok_or_else(|| {
            DocScanError::DegenerateGeometry("no projective transform for these corners".into())
        })?;
        debug!(out_w, out_h, "Projective transform computed");

        let warped = match image {
            DynamicImage::ImageLuma8(gray) => {
                let mut out = GrayImage::new(out_w, out_h);
                warp_into(gray, &projection, Interpolation::Bilinear, Luma([255u8]), &mut out);
                DynamicImage::ImageLuma8(out)
            }
            DynamicImage::ImageRgb8(rgb) => {
                let mut out = RgbImage::new(out_w, out_h);
                warp_into(rgb, &projection, Interpolation::Bilinear, Rgb([255u8, 255, 255]), &mut out);
                DynamicImage::ImageRgb8(out)
            }
            other => {
                let rgba = other.to_rgba8();
                let mut out = RgbaImage::new(out_w, out_h);
                warp_into(
                    &rgba,
                    &projection,
                    Interpolation::Bilinear,
                    Rgba([255u8, 255, 255, 255]),
                    &mut out,
                );
                DynamicImage::ImageRgba8(out)
            }
        };

        info!(out_w, out_h, "Perspective correction applied");
        Ok(warped)
    }

    // -- Colour mode ----------------------------------------------------------

    /// Apply the colour treatment for `mode`.
    pub fn apply_color_mode(
        &self,
        image: Cow<'_, DynamicImage>,
        mode: ColorMode,
        enhance_contrast: bool,
    ) -> DynamicImage {
        match mode {
            ColorMode::Color if enhance_contrast => self.enhance_contrast(&image),
            ColorMode::Color => image.into_owned(),
            ColorMode::Grayscale => {
                let gray = image.to_luma8();
                drop(image);
                if enhance_contrast {
                    DynamicImage::ImageLuma8(self.enhance_gray(&gray))
                } else {
                    DynamicImage::ImageLuma8(gray)
                }
            }
            ColorMode::BlackAndWhite => {
                let gray = image.to_luma8();
                drop(image);
                DynamicImage::ImageLuma8(self.binarize(&gray))
            }
        }
    }

    /// Local contrast enhancement that leaves chrominance alone.
    ///
    /// Single-channel images are equalised directly; colour images have
    /// only their L* channel equalised.
    #[instrument(skip(self, image), fields(color = ?image.color()))]
    pub fn enhance_contrast(&self, image: &DynamicImage) -> DynamicImage {
        let (clip, grid) = (self.params.clahe_clip_limit, self.params.clahe_grid);
        match image {
            DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(clahe(gray, clip, grid)),
            DynamicImage::ImageRgb8(rgb) => DynamicImage::ImageRgb8(clahe_rgb(rgb, clip, grid)),
            other if other.color().has_color() && other.color().has_alpha() => {
                DynamicImage::ImageRgba8(clahe_rgba(&other.to_rgba8(), clip, grid))
            }
            other if other.color().has_color() => {
                DynamicImage::ImageRgb8(clahe_rgb(&other.to_rgb8(), clip, grid))
            }
            other => DynamicImage::ImageLuma8(clahe(&other.to_luma8(), clip, grid)),
        }
    }

    fn enhance_gray(&self, gray: &GrayImage) -> GrayImage {
        clahe(gray, self.params.clahe_clip_limit, self.params.clahe_grid)
    }

    // -- Binarization ---------------------------------------------------------

    /// Black-and-white rendering with a Gaussian-weighted local threshold,
    /// which copes with uneven lighting across the page.
    #[instrument(skip(self, gray), fields(block = self.params.threshold_block_size, offset = self.params.threshold_offset))]
    pub fn binarize(&self, gray: &GrayImage) -> GrayImage {
        let out = adaptive_threshold_gaussian(
            gray,
            self.params.threshold_block_size,
            self.params.threshold_offset,
        );
        debug!("Binarization complete");
        out
    }
}

/// Process with default parameters.
pub fn process(
    image: DynamicImage,
    bounds: Option<&DocumentBounds>,
    mode: ColorMode,
    enhance_contrast: bool,
) -> DynamicImage {
    ScanEnhancer::new().process(image, bounds, mode, enhance_contrast)
}

// -- Tests --------------------------------------------------------------------
