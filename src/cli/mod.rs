//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod info;
mod scale;

use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use glob::glob;

use crate::config::{CliOverrides, LogLevel};

/// Process exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Check if a path has a `.png` extension (any case).
pub fn is_png_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

/// Find all PNG files in a directory (recursively), sorted by path.
pub fn find_png_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let dir_str = dir.display().to_string();

    for pattern in [format!("{}/**/*.png", dir_str), format!("{}/**/*.PNG", dir_str)] {
        if let Ok(paths) = glob(&pattern) {
            files.extend(paths.filter_map(Result::ok));
        }
    }

    files.sort();
    files.dedup();
    files
}

/// Initialise `env_logger`.
///
/// `-v` raises the configured level to debug and `-vv` to trace. `RUST_LOG`
/// still takes precedence when set.
pub(crate) fn init_logging(configured: LogLevel, verbose: u8) {
    let level = match verbose {
        0 => configured,
        1 => configured.max(LogLevel::Debug),
        _ => LogLevel::Trace,
    };
    let env = env_logger::Env::default().default_filter_or(level.as_filter());
    // A second initialisation (tests calling run twice) is harmless.
    let _ = env_logger::Builder::from_env(env).format_timestamp(None).try_init();
}

/// Pixelsmooth - Smooth 2x upscaling for pixel art
#[derive(Parser)]
#[command(name = "pxsmooth")]
#[command(about = "Pixelsmooth - Upscale pixel art 2x with smoothed contours")]
#[command(version)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upscale PNG images to twice their size
    Scale {
        /// Input PNG files or directories (searched recursively for *.png)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file or directory.
        /// If omitted: {input_dir}/{stem}{suffix}.png
        /// If file (single input): output.png
        /// If directory (ends with / or exists): dir/{stem}{suffix}.png
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to pxsmooth.toml (default: discovered from the current directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Suffix appended to the input file stem (default: _2x)
        #[arg(long)]
        suffix: Option<String>,

        /// Directory for outputs when -o is not given
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Also write {output}_distance.png with the distance field
        #[arg(long)]
        dump_distance: bool,

        /// Also write {output}_offsets.png with the edge blend map
        #[arg(long)]
        dump_offsets: bool,

        /// Also write {output}_contours.png with every traced segment
        #[arg(long)]
        dump_contours: bool,

        /// Print one JSON statistics object per image
        #[arg(long)]
        json: bool,
    },

    /// Run the pipeline on one image and print statistics without writing it
    Info {
        /// Input PNG file
        input: PathBuf,

        /// Path to pxsmooth.toml (default: discovered from the current directory)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scale {
            inputs,
            output,
            config,
            suffix,
            out_dir,
            dump_distance,
            dump_offsets,
            dump_contours,
            json,
        } => {
            let overrides = CliOverrides {
                out_dir,
                suffix,
                dump_distance: dump_distance.then_some(true),
                dump_offsets: dump_offsets.then_some(true),
                dump_contours: dump_contours.then_some(true),
                log_level: None,
            };
            scale::run_scale(&inputs, output.as_deref(), config.as_deref(), &overrides, json, cli.verbose)
        }
        Commands::Info { input, config, json } => {
            info::run_info(&input, config.as_deref(), json, cli.verbose)
        }
    }
}
