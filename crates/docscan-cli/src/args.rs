// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use docscan_core::types::{ColorMode, DetectionTier, DocumentBounds, Point};

#[derive(Debug, Parser)]
#[command(name = "docscan")]
#[command(version, about = "Find, flatten, and clean up photographed documents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Locate the document outline and print its corners as JSON
    Detect {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        #[arg(long, value_enum, default_value_t = TierArg::Final)]
        tier: TierArg,

        /// JSON file overriding the built-in parameter tables
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },

    /// Flatten the document onto a rectangle and apply a colour mode
    Process {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Output path; the format follows the extension
        #[arg(value_name = "OUTPUT")]
        output_path: PathBuf,

        #[arg(long, value_enum, default_value_t = ModeArg::Color)]
        mode: ModeArg,

        /// Skip local contrast enhancement
        #[arg(long)]
        no_enhance: bool,

        /// Explicit corners as x1,y1,x2,y2,x3,y3,x4,y4 (any order)
        #[arg(long, value_name = "COORDS", value_parser = parse_corners, allow_hyphen_values = true)]
        corners: Option<DocumentBounds>,

        /// Use the default margin bounds instead of detecting
        #[arg(long, conflicts_with = "corners")]
        no_detect: bool,

        #[arg(long, value_enum, default_value_t = TierArg::Final)]
        tier: TierArg,

        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// JPEG quality (1-100); defaults to the configured value
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TierArg {
    Interactive,
    Final,
}

impl From<TierArg> for DetectionTier {
    fn from(tier: TierArg) -> Self {
        match tier {
            TierArg::Interactive => DetectionTier::Interactive,
            TierArg::Final => DetectionTier::FinalCapture,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Color,
    Grayscale,
    Bw,
}

impl From<ModeArg> for ColorMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Color => ColorMode::Color,
            ModeArg::Grayscale => ColorMode::Grayscale,
            ModeArg::Bw => ColorMode::BlackAndWhite,
        }
    }
}

/// Parse eight comma-separated coordinates into bounds.
///
/// Points may be given in any order; they are assigned corner roles the
/// same way detected outlines are.
pub fn parse_corners(raw: &str) -> Result<DocumentBounds, String> {
    let values = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|err| format!("invalid coordinate {:?}: {err}", part.trim()))
        })
        .collect::<Result<Vec<f32>, String>>()?;

    if values.len() != 8 {
        return Err(format!("expected 8 coordinates, got {}", values.len()));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err("coordinates must be finite".into());
    }

    let points: Vec<Point> = values
        .chunks_exact(2)
        .map(|pair| Point::new(pair[0], pair[1]))
        .collect();
    docscan_imaging::scan::geometry::order_corners(&points)
        .map(DocumentBounds::from_corners)
        .ok_or_else(|| "could not assign corner roles".to_string())
}
