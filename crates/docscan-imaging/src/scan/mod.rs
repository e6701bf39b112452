// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — boundary detection, corner geometry, perspective
// correction, and tonal enhancement.

pub mod detect;
pub mod enhance;
pub mod geometry;
pub mod tonal;

pub use detect::BoundaryDetector;
pub use enhance::ScanEnhancer;
