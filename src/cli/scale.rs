//! Scale command implementation

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

use crate::config::{load_config, merge_cli_overrides, CliOverrides, SmoothConfig};
use crate::output::{
    contours_image, distance_image, dump_path, generate_output_path, load_image, offsets_image,
    save_gray_png, save_png, OutputError, DUMP_KINDS,
};
use crate::upscale::{upscale2x_detailed, UpscaleError, UpscaleStats};

use super::{find_png_files, init_logging, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Why a single image could not be scaled
#[derive(Debug, Error)]
enum ScaleError {
    #[error("cannot read input: {0}")]
    Input(#[source] OutputError),
    #[error("{0}")]
    Upscale(#[from] UpscaleError),
    #[error("cannot write output: {0}")]
    Output(#[source] OutputError),
}

impl ScaleError {
    fn exit_code(&self) -> u8 {
        match self {
            ScaleError::Input(_) => EXIT_INVALID_ARGS,
            ScaleError::Upscale(_) | ScaleError::Output(_) => EXIT_ERROR,
        }
    }
}

/// One line of `--json` output
#[derive(Debug, Serialize)]
struct ScaleReport<'a> {
    input: &'a Path,
    output: &'a Path,
    #[serde(flatten)]
    stats: UpscaleStats,
}

/// Whether `path` looks like an image this command wrote: an upscaled
/// output or one of its debug dumps.
fn is_own_output(path: &Path, suffix: &str) -> bool {
    if suffix.is_empty() {
        return false;
    }
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    stem.ends_with(suffix)
        || DUMP_KINDS.iter().any(|kind| stem.ends_with(&format!("{}_{}", suffix, kind)))
}

/// Expand directories into the PNG files they contain.
///
/// Files found inside directories are skipped when they look like earlier
/// output of this command. Files named directly are always kept.
fn collect_inputs(inputs: &[PathBuf], suffix: &str) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let (skipped, found): (Vec<_>, Vec<_>) =
                find_png_files(input).into_iter().partition(|f| is_own_output(f, suffix));
            log::debug!(
                "{}: {} png files, {} earlier outputs skipped",
                input.display(),
                found.len(),
                skipped.len()
            );
            files.extend(found);
        } else if input.exists() {
            files.push(input.clone());
        } else {
            return Err(format!("Input not found: {}", input.display()));
        }
    }
    Ok(files)
}

/// Whether `a` and `b` name the same file, resolving `.` and symlinks when
/// both exist.
fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Execute the scale command
pub fn run_scale(
    inputs: &[PathBuf],
    output: Option<&Path>,
    config_path: Option<&Path>,
    overrides: &CliOverrides,
    json: bool,
    verbose: u8,
) -> ExitCode {
    let mut config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    if let Err(e) = merge_cli_overrides(&mut config, overrides) {
        eprintln!("Error: {}", e);
        return ExitCode::from(EXIT_INVALID_ARGS);
    }
    init_logging(config.logging.level, verbose);

    let files = match collect_inputs(inputs, &config.output.suffix) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    if files.is_empty() {
        eprintln!("Error: No PNG files found");
        return ExitCode::from(EXIT_INVALID_ARGS);
    }

    let single = files.len() == 1;
    if let Some(out) = output {
        if !single && out.exists() && !out.is_dir() {
            eprintln!("Error: -o must be a directory when scaling {} images", files.len());
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    }

    let mut exit = EXIT_SUCCESS;
    for file in &files {
        let target = generate_output_path(
            file,
            &config.output.suffix,
            config.output.out_dir.as_deref(),
            output,
            single,
        );
        match scale_file(file, &target, &config) {
            Ok(stats) => report(file, &target, stats, json),
            Err(e) => {
                eprintln!("Error: {}: {}", file.display(), e);
                exit = exit.max(e.exit_code());
            }
        }
    }

    ExitCode::from(exit)
}

fn scale_file(input: &Path, target: &Path, config: &SmoothConfig) -> Result<UpscaleStats, ScaleError> {
    if same_file(input, target) {
        return Err(ScaleError::Output(OutputError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "output would overwrite the input",
        ))));
    }

    let image = load_image(input).map_err(ScaleError::Input)?;
    let upscaled = upscale2x_detailed(&image)?;
    save_png(&upscaled.image, target).map_err(ScaleError::Output)?;
    log::info!("wrote {}", target.display());

    if config.debug.dump_distance {
        let path = dump_path(target, "distance");
        save_gray_png(&distance_image(&upscaled.distance), &path).map_err(ScaleError::Output)?;
        log::info!("wrote {}", path.display());
    }
    if config.debug.dump_offsets {
        let path = dump_path(target, "offsets");
        save_gray_png(&offsets_image(&upscaled.offsets), &path).map_err(ScaleError::Output)?;
        log::info!("wrote {}", path.display());
    }
    if config.debug.dump_contours {
        let path = dump_path(target, "contours");
        save_png(&contours_image(&upscaled.distance)?, &path).map_err(ScaleError::Output)?;
        log::info!("wrote {}", path.display());
    }

    Ok(upscaled.stats)
}

fn report(input: &Path, output: &Path, stats: UpscaleStats, json: bool) {
    if json {
        let line = ScaleReport { input, output, stats };
        match serde_json::to_string(&line) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Error: cannot serialize statistics: {}", e),
        }
    } else {
        println!(
            "{} -> {} ({}x{} -> {}x{})",
            input.display(),
            output.display(),
            stats.width,
            stats.height,
            stats.width * 2,
            stats.height * 2
        );
    }
}
