//! 2x pixel-art upscaling.
//!
//! The pipeline runs in four stages, each consuming the previous one's output:
//!
//! 1. [`DistanceGrid`]: levels from a color-aware wavefront started at the image border
//! 2. [`ContourTracer`]: walks the boundaries between levels as maximal straight runs
//! 3. [`OffsetMap`]: turns every run into per-edge blend coefficients
//! 4. [`render`]: draws the 2x image, blending across edges by those coefficients
//!
//! Most callers only need [`upscale2x`]. [`upscale2x_detailed`] also hands back
//! the intermediate grids for debugging and reporting.
//!
//! ```no_run
//! let input = image::open("sprite.png").unwrap().to_rgba8();
//! let output = pixelsmooth::upscale::upscale2x(&input).unwrap();
//! assert_eq!(output.dimensions(), (input.width() * 2, input.height() * 2));
//! ```

pub mod color_counter;
pub mod distance;
pub mod error;
pub mod offset_map;
pub mod render;
pub mod tracer;

use image::{Rgba, RgbaImage};
use serde::Serialize;

pub use color_counter::RankedColorCounter;
pub use distance::DistanceGrid;
pub use error::{Stage, UpscaleError};
pub use offset_map::{BlendSide, OffsetMap, TraceStats, COEFF_MAX, UNSET};
pub use render::{blend, render};
pub use tracer::{ContourTracer, Corner, Direction, Edge, Segment, SegmentShape};

/// Smallest width or height the pipeline accepts.
pub const MIN_DIMENSION: u32 = 4;

/// Largest width or height; worklist links hold 15-bit coordinates.
pub const MAX_DIMENSION: u32 = 32767;

/// Summary of one upscale, suitable for `--json` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpscaleStats {
    pub width: u32,
    pub height: u32,
    /// Wavefront rounds in the distance field
    pub rounds: u32,
    pub max_level: i32,
    pub contours: usize,
    pub segments: usize,
    /// Edge samples that move color across a pixel edge
    pub blended_samples: usize,
}

/// Output of [`upscale2x_detailed`].
#[derive(Debug, Clone)]
pub struct Upscaled {
    pub distance: DistanceGrid,
    pub offsets: OffsetMap,
    pub image: RgbaImage,
    pub stats: UpscaleStats,
}

/// Pack an RGBA image into row-major `u32` pixels, red in the low byte.
pub fn pack_pixels(image: &RgbaImage) -> Vec<u32> {
    image.pixels().map(|p| u32::from_le_bytes(p.0)).collect()
}

/// Inverse of the packing used by [`pack_pixels`].
pub fn unpack_pixel(pixel: u32) -> Rgba<u8> {
    Rgba(pixel.to_le_bytes())
}

/// Upscale `input` to twice its width and height.
pub fn upscale2x(input: &RgbaImage) -> Result<RgbaImage, UpscaleError> {
    upscale2x_detailed(input).map(|upscaled| upscaled.image)
}

/// Upscale `input` and keep every intermediate stage.
pub fn upscale2x_detailed(input: &RgbaImage) -> Result<Upscaled, UpscaleError> {
    let (width, height) = input.dimensions();
    error::check_dimensions(width, height)?;
    let pixels = pack_pixels(input);

    let distance = DistanceGrid::compute(&pixels, width, height)?;
    log::debug!(
        "distance field {}x{}: {} rounds, max level {}",
        width,
        height,
        distance.rounds(),
        distance.max_level()
    );

    let (offsets, trace) = OffsetMap::build(&distance)?;
    log::debug!(
        "traced {} contours, {} segments, {} edge samples set",
        trace.contours,
        trace.segments,
        offsets.set_samples()
    );

    let image = render(&pixels, &offsets)?;
    log::debug!("rendered {}x{}", image.width(), image.height());

    let stats = UpscaleStats {
        width,
        height,
        rounds: distance.rounds(),
        max_level: distance.max_level(),
        contours: trace.contours,
        segments: trace.segments,
        blended_samples: offsets.blended_samples(),
    };
    Ok(Upscaled { distance, offsets, image, stats })
}
