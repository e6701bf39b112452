// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan-imaging — Image processing for the docscan document scanner.
//
// Provides boundary detection (locating the page quadrilateral in a photo),
// perspective correction with colour-mode enhancement, and auxiliary image
// operations (decode, clip, rotate, scale, encode).

pub mod image;
pub mod scan;

// Re-export the primary structs so callers can use `docscan_imaging::BoundaryDetector` etc.
pub use image::processor::ImageProcessor;
pub use scan::detect::{BoundaryDetector, detect};
pub use scan::enhance::{ScanEnhancer, process};

pub use docscan_core::types::{
    ColorMode, DetectionTier, DocumentBounds, Point, default_bounds, quadrilateral_area,
};
