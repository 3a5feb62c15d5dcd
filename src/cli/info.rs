//! Info command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::config::load_config;
use crate::output::load_image;
use crate::upscale::{upscale2x_detailed, UpscaleStats};

use super::{init_logging, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the info command
pub fn run_info(input: &Path, config_path: Option<&Path>, json: bool, verbose: u8) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    init_logging(config.logging.level, verbose);

    let image = match load_image(input) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: {}: {}", input.display(), e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    let stats = match upscale2x_detailed(&image) {
        Ok(upscaled) => upscaled.stats,
        Err(e) => {
            eprintln!("Error: {}: {}", input.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if json {
        match serde_json::to_string_pretty(&stats) {
            Ok(s) => println!("{}", s),
            Err(e) => {
                eprintln!("Error: cannot serialize statistics: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        print!("{}", format_stats(input, &stats));
    }
    ExitCode::from(EXIT_SUCCESS)
}

fn format_stats(input: &Path, stats: &UpscaleStats) -> String {
    format!(
        "{}\n  size:            {}x{}\n  rounds:          {}\n  max level:       {}\n  contours:        {}\n  segments:        {}\n  blended samples: {}\n",
        input.display(),
        stats.width,
        stats.height,
        stats.rounds,
        stats.max_level,
        stats.contours,
        stats.segments,
        stats.blended_samples
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_stats() {
        let stats = UpscaleStats {
            width: 8,
            height: 4,
            rounds: 1,
            max_level: 2,
            contours: 1,
            segments: 4,
            blended_samples: 8,
        };
        let text = format_stats(Path::new("split.png"), &stats);
        assert!(text.starts_with("split.png\n"));
        assert!(text.contains("size:            8x4"));
        assert!(text.contains("segments:        4"));
    }
}
