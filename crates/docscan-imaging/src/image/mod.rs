// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — decode, clip to outline, rotate, fit-within-box scaling, encode.

pub mod processor;

pub use processor::ImageProcessor;
