// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tunable pipeline parameters.
//
// The detection thresholds are empirically tuned, so they live here as data
// rather than inside the detector's control flow. Each tier has a preset;
// callers can load overrides from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DocScanError, Result};
use crate::types::DetectionTier;

/// Thresholds and tables driving one detection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionParams {
    /// Longer-side cap in pixels; larger images are downscaled first.
    /// `None` runs at full resolution.
    pub max_dimension: Option<u32>,
    /// Gaussian kernel size (odd).
    pub blur_kernel_size: u32,
    /// Canny low hysteresis threshold.
    pub canny_low: f32,
    /// Canny high hysteresis threshold.
    pub canny_high: f32,
    /// Side of the square structuring element used for closing (odd).
    pub morph_kernel_size: u32,
    /// Smallest accepted contour area, as a fraction of the image area.
    pub min_area_ratio: f64,
    /// Largest accepted contour area, as a fraction of the image area.
    pub max_area_ratio: f64,
    /// Contours with a closed perimeter at or below this are dropped.
    pub min_perimeter: f64,
    /// Polygon approximation tolerances as fractions of the perimeter,
    /// tried in order.
    pub epsilon_factors: Vec<f64>,
}

impl DetectionParams {
    /// Live preview preset: 800 px cap, smaller kernels, tighter filters.
    pub fn interactive() -> Self {
        Self {
            max_dimension: Some(800),
            blur_kernel_size: 3,
            canny_low: 50.0,
            canny_high: 150.0,
            morph_kernel_size: 3,
            min_area_ratio: 0.02,
            max_area_ratio: 0.95,
            min_perimeter: 100.0,
            epsilon_factors: vec![0.01, 0.02, 0.03, 0.05],
        }
    }

    /// Still-capture preset: full resolution, finer edges, looser filters.
    pub fn final_capture() -> Self {
        Self {
            max_dimension: None,
            blur_kernel_size: 5,
            canny_low: 30.0,
            canny_high: 100.0,
            morph_kernel_size: 5,
            min_area_ratio: 0.01,
            max_area_ratio: 0.98,
            min_perimeter: 200.0,
            epsilon_factors: vec![0.008, 0.015, 0.025, 0.04],
        }
    }

    pub fn for_tier(tier: DetectionTier) -> Self {
        match tier {
            DetectionTier::Interactive => Self::interactive(),
            DetectionTier::FinalCapture => Self::final_capture(),
        }
    }

    /// Gaussian sigma for `blur_kernel_size`, using the usual
    /// kernel-size-to-sigma rule for an unspecified sigma.
    pub fn blur_sigma(&self) -> f32 {
        let k = self.blur_kernel_size.max(1) as f32;
        0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8
    }

    /// Check the invariants the detector relies on.
    pub fn validate(&self) -> Result<()> {
        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return Err(DocScanError::Config(format!(
                "blur_kernel_size must be odd, got {}",
                self.blur_kernel_size
            )));
        }
        if self.morph_kernel_size == 0 || self.morph_kernel_size % 2 == 0 {
            return Err(DocScanError::Config(format!(
                "morph_kernel_size must be odd, got {}",
                self.morph_kernel_size
            )));
        }
        if !(self.canny_low > 0.0 && self.canny_low <= self.canny_high) {
            return Err(DocScanError::Config(format!(
                "canny thresholds must satisfy 0 < low <= high, got {}/{}",
                self.canny_low, self.canny_high
            )));
        }
        if !(0.0..1.0).contains(&self.min_area_ratio)
            || !(self.min_area_ratio < self.max_area_ratio && self.max_area_ratio <= 1.0)
        {
            return Err(DocScanError::Config(format!(
                "area ratios must satisfy 0 <= min < max <= 1, got {}/{}",
                self.min_area_ratio, self.max_area_ratio
            )));
        }
        if self.epsilon_factors.is_empty() || self.epsilon_factors.iter().any(|e| *e <= 0.0) {
            return Err(DocScanError::Config(
                "epsilon_factors must be a non-empty list of positive fractions".into(),
            ));
        }
        if self.max_dimension == Some(0) {
            return Err(DocScanError::Config("max_dimension must be positive".into()));
        }
        Ok(())
    }
}

/// Tonal-stage parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhanceParams {
    /// CLAHE clip limit, relative to a uniform histogram.
    pub clahe_clip_limit: f32,
    /// CLAHE tiles per axis.
    pub clahe_grid: u32,
    /// Adaptive threshold neighbourhood size (odd).
    pub threshold_block_size: u32,
    /// Constant subtracted from the weighted local mean.
    pub threshold_offset: i32,
    /// JPEG quality used when exporting processed pages.
    pub jpeg_quality: u8,
}

impl Default for EnhanceParams {
    fn default() -> Self {
        Self {
            clahe_clip_limit: 2.0,
            clahe_grid: 8,
            threshold_block_size: 11,
            threshold_offset: 2,
            jpeg_quality: 90,
        }
    }
}

impl EnhanceParams {
    pub fn validate(&self) -> Result<()> {
        if self.clahe_grid == 0 {
            return Err(DocScanError::Config("clahe_grid must be positive".into()));
        }
        if self.clahe_clip_limit <= 0.0 {
            return Err(DocScanError::Config(format!(
                "clahe_clip_limit must be positive, got {}",
                self.clahe_clip_limit
            )));
        }
        if self.threshold_block_size < 3 || self.threshold_block_size % 2 == 0 {
            return Err(DocScanError::Config(format!(
                "threshold_block_size must be odd and >= 3, got {}",
                self.threshold_block_size
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(DocScanError::Config(format!(
                "jpeg_quality must be 1-100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "DetectionParams::interactive")]
    pub interactive: DetectionParams,
    #[serde(default = "DetectionParams::final_capture")]
    pub final_capture: DetectionParams,
    #[serde(default)]
    pub enhance: EnhanceParams,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interactive: DetectionParams::interactive(),
            final_capture: DetectionParams::final_capture(),
            enhance: EnhanceParams::default(),
        }
    }
}

impl ScanConfig {
    /// Parameters for `tier`.
    pub fn detection(&self, tier: DetectionTier) -> &DetectionParams {
        match tier {
            DetectionTier::Interactive => &self.interactive,
            DetectionTier::FinalCapture => &self.final_capture,
        }
    }

    /// Parse and validate a JSON configuration. Missing sections fall back
    /// to the built-in presets.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.interactive.validate()?;
        self.final_capture.validate()?;
        self.enhance.validate()
    }
}
