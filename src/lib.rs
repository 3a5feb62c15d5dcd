//! Pixelsmooth - Library for smooth 2x upscaling of pixel art
//!
//! This library provides functionality to:
//! - Upscale RGBA images 2x along traced color contours (`upscale`)
//! - Load and save images and debug dumps (`output`)
//! - Load `pxsmooth.toml` configuration (`config`)

pub mod cli;
pub mod config;
pub mod output;
pub mod upscale;
