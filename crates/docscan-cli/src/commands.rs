// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand implementations.

use std::path::Path;

use anyhow::{Context, bail};
use docscan_core::config::ScanConfig;
use docscan_core::types::{ColorMode, DetectionTier, DocumentBounds, default_bounds};
use docscan_imaging::{BoundaryDetector, ImageProcessor, ScanEnhancer};
use serde::Serialize;
use tracing::{info, warn};

/// JSON report printed by `docscan detect`.
#[derive(Debug, Serialize)]
pub struct DetectReport {
    pub detected: bool,
    pub tier: DetectionTier,
    pub image_width: u32,
    pub image_height: u32,
    pub bounds: DocumentBounds,
    pub area: f32,
}

/// How `process` should obtain its bounds.
#[derive(Debug, Clone, Copy)]
pub enum BoundsSource {
    Explicit(DocumentBounds),
    Detect(DetectionTier),
    Default,
}

pub struct ProcessOptions {
    pub bounds: BoundsSource,
    pub mode: ColorMode,
    pub enhance_contrast: bool,
    pub quality: Option<u8>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<ScanConfig> {
    match path {
        Some(path) => ScanConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(ScanConfig::default()),
    }
}

pub fn detect(image_path: &Path, tier: DetectionTier, config: &ScanConfig) -> anyhow::Result<DetectReport> {
    let image = ImageProcessor::open(image_path)
        .with_context(|| format!("cannot read {}", image_path.display()))?
        .into_dynamic();
    let (width, height) = (image.width(), image.height());

    let found = BoundaryDetector::from_config(config).detect(&image, tier);
    let detected = found.is_some();
    let bounds = found.unwrap_or_else(|| default_bounds(width, height));

    Ok(DetectReport {
        detected,
        tier,
        image_width: width,
        image_height: height,
        area: bounds.area(),
        bounds,
    })
}

pub fn process(
    image_path: &Path,
    output_path: &Path,
    options: &ProcessOptions,
    config: &ScanConfig,
) -> anyhow::Result<()> {
    let image = ImageProcessor::open(image_path)
        .with_context(|| format!("cannot read {}", image_path.display()))?
        .into_dynamic();
    let (width, height) = (image.width(), image.height());

    let bounds = match options.bounds {
        BoundsSource::Explicit(bounds) => bounds,
        BoundsSource::Default => default_bounds(width, height),
        BoundsSource::Detect(tier) => {
            match BoundaryDetector::from_config(config).detect(&image, tier) {
                Some(bounds) => bounds,
                None => {
                    warn!("No document found; using default bounds");
                    default_bounds(width, height)
                }
            }
        }
    };
    if !bounds.is_valid(width, height) {
        bail!(
            "corners {:?} fall outside the {width}x{height} image",
            bounds.to_array()
        );
    }

    let processed = ScanEnhancer::from_config(config).process(
        image,
        Some(&bounds),
        options.mode,
        options.enhance_contrast,
    );

    let quality = options.quality.unwrap_or(config.enhance.jpeg_quality);
    ImageProcessor::from_dynamic(processed)
        .save(output_path, quality)
        .with_context(|| format!("cannot write {}", output_path.display()))?;

    info!(output = %output_path.display(), "Processed document written");
    Ok(())
}
