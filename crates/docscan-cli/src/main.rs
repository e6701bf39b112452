// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan — document scanner command-line front end.
//
// Entry point. Initialises logging, parses arguments, and dispatches to the
// detect/process subcommands.

mod args;
mod commands;

use clap::Parser;

use args::{Cli, Command};
use commands::{BoundsSource, ProcessOptions};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Detect {
            image_path,
            tier,
            config,
        } => {
            let config = commands::load_config(config.as_deref())?;
            let report = commands::detect(&image_path, tier.into(), &config)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Process {
            image_path,
            output_path,
            mode,
            no_enhance,
            corners,
            no_detect,
            tier,
            config,
            quality,
        } => {
            let config = commands::load_config(config.as_deref())?;
            let bounds = match (corners, no_detect) {
                (Some(bounds), _) => BoundsSource::Explicit(bounds),
                (None, true) => BoundsSource::Default,
                (None, false) => BoundsSource::Detect(tier.into()),
            };
            let options = ProcessOptions {
                bounds,
                mode: mode.into(),
                enhance_contrast: !no_enhance,
                quality,
            };
            commands::process(&image_path, &output_path, &options, &config)?;
        }
    }

    Ok(())
}
