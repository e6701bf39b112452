// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for docscan.
//
// The detection and processing entry points never surface these to their
// callers: a miss becomes `None` and a processing failure becomes the
// unmodified input. The variants exist for the fallible stages underneath,
// for I/O helpers, and for configuration loading.

use thiserror::Error;

/// Top-level error type for all docscan operations.
#[derive(Debug, Error)]
pub enum DocScanError {
    // -- Raster errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    // -- Geometry errors --
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    #[error("document bounds fall outside the {width}x{height} image")]
    InvalidBounds { width: u32, height: u32 },

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocScanError>;
