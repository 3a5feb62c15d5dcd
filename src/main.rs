//! Pixelsmooth - Command-line tool for smooth 2x upscaling of pixel art

use std::process::ExitCode;

use pixelsmooth::cli;

fn main() -> ExitCode {
    cli::run()
}
