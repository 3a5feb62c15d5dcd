//! 2x rendering from an [`OffsetMap`].
//!
//! Every source pixel owns the 2x2 block it maps to. The block starts as a
//! copy of the pixel. Vertical edges are applied first: the right column
//! blends toward the right neighbour when the edge on that side blends the
//! near block, the left column toward the left neighbour when the edge on
//! that side blends the far block. Horizontal edges then do the same for the
//! bottom and top rows. Unset samples leave the block alone, so an image
//! without contours comes out as plain pixel doubling.

use image::RgbaImage;
use rayon::prelude::*;

use super::error::{Stage, UpscaleError};
use super::offset_map::{BlendSide, OffsetMap, COEFF_MAX, UNSET};

/// Full weight of the blend, `2 * COEFF_MAX`.
const WEIGHT_SPAN: u32 = 2 * COEFF_MAX as u32;

/// Blend packed RGBA `a` toward `b` by coefficient `v` in `-32767..=32767`.
///
/// Every channel, alpha included, is interpolated with rounding.
pub fn blend(a: u32, b: u32, v: i16) -> u32 {
    let w = (v as i32 + COEFF_MAX as i32).clamp(0, WEIGHT_SPAN as i32) as u32;
    let a = a.to_le_bytes();
    let b = b.to_le_bytes();
    let mut out = [0u8; 4];
    for c in 0..4 {
        let mixed = (a[c] as u32 * (WEIGHT_SPAN - w) + b[c] as u32 * w + COEFF_MAX as u32) / WEIGHT_SPAN;
        out[c] = mixed as u8;
    }
    u32::from_le_bytes(out)
}

/// Blend column `column` of `block` toward `toward`, one sample per row.
fn blend_column(block: &mut [[u32; 2]; 2], column: usize, samples: [i16; 2], toward: u32) {
    for (k, v) in samples.into_iter().enumerate() {
        if v != UNSET {
            block[k][column] = blend(block[k][column], toward, v);
        }
    }
}

/// Blend row `row` of `block` toward `toward`, one sample per column.
fn blend_row(block: &mut [[u32; 2]; 2], row: usize, samples: [i16; 2], toward: u32) {
    for (j, v) in samples.into_iter().enumerate() {
        if v != UNSET {
            block[row][j] = blend(block[row][j], toward, v);
        }
    }
}

/// Colors of the 2x2 block owned by source pixel `(x, y)`, as `[row][column]`.
fn render_block(pixels: &[u32], map: &OffsetMap, x: u32, y: u32) -> [[u32; 2]; 2] {
    let width = map.width() as usize;
    let at = |x: u32, y: u32| pixels[y as usize * width + x as usize];
    let mut block = [[at(x, y); 2]; 2];

    if x + 1 < map.width() && map.vertical_side(x, y) == BlendSide::Near {
        blend_column(&mut block, 1, map.vertical(x, y), at(x + 1, y));
    }
    if x > 0 && map.vertical_side(x - 1, y) == BlendSide::Far {
        blend_column(&mut block, 0, map.vertical(x - 1, y), at(x - 1, y));
    }
    if y + 1 < map.height() && map.horizontal_side(x, y) == BlendSide::Near {
        blend_row(&mut block, 1, map.horizontal(x, y), at(x, y + 1));
    }
    if y > 0 && map.horizontal_side(x, y - 1) == BlendSide::Far {
        blend_row(&mut block, 0, map.horizontal(x, y - 1), at(x, y - 1));
    }
    block
}

/// Render `pixels` (packed, row-major, same size as `map`) at twice the size.
///
/// Output rows are produced in pairs, one source row per task.
pub fn render(pixels: &[u32], map: &OffsetMap) -> Result<RgbaImage, UpscaleError> {
    let (width, height) = (map.width(), map.height());
    let expected = width as usize * height as usize;
    if pixels.len() != expected {
        return Err(UpscaleError::invariant(
            Stage::Render,
            format!("expected {} pixels, got {}", expected, pixels.len()),
        ));
    }

    let mut output = RgbaImage::new(width * 2, height * 2);
    let row_bytes = width as usize * 2 * 4;

    output.par_chunks_mut(row_bytes * 2).enumerate().for_each(|(y, rows)| {
        let (top, bottom) = rows.split_at_mut(row_bytes);
        for x in 0..width {
            let block = render_block(pixels, map, x, y as u32);
            let offset = x as usize * 8;
            top[offset..offset + 4].copy_from_slice(&block[0][0].to_le_bytes());
            top[offset + 4..offset + 8].copy_from_slice(&block[0][1].to_le_bytes());
            bottom[offset..offset + 4].copy_from_slice(&block[1][0].to_le_bytes());
            bottom[offset + 4..offset + 8].copy_from_slice(&block[1][1].to_le_bytes());
        }
    });

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upscale::distance::DistanceGrid;
    use image::Rgba;

    const RED: u32 = u32::from_le_bytes([255, 0, 0, 255]);
    const BLUE: u32 = u32::from_le_bytes([0, 0, 255, 255]);

    #[test]
    fn test_blend_endpoints() {
        assert_eq!(blend(RED, BLUE, -COEFF_MAX), RED);
        assert_eq!(blend(RED, BLUE, COEFF_MAX), BLUE);
        assert_eq!(blend(BLUE, BLUE, 1234), BLUE);
    }

    #[test]
    fn test_blend_midpoint_rounds() {
        assert_eq!(blend(RED, BLUE, 0).to_le_bytes(), [128, 0, 128, 255]);
    }

    #[test]
    fn test_blend_alpha() {
        let clear = u32::from_le_bytes([0, 0, 0, 0]);
        let opaque = u32::from_le_bytes([0, 0, 0, 255]);
        assert_eq!(blend(clear, opaque, 0).to_le_bytes()[3], 128);
    }

    #[test]
    fn test_render_without_samples_doubles_pixels() {
        let pixels: Vec<u32> = (0..16).map(|i| u32::from_le_bytes([i * 10, i, 0, 255])).collect();
        let map = OffsetMap::new(4, 4);
        let out = render(&pixels, &map).unwrap();

        assert_eq!(out.dimensions(), (8, 8));
        for (x, y, px) in out.enumerate_pixels() {
            let source = pixels[(y / 2 * 4 + x / 2) as usize];
            assert_eq!(*px, Rgba(source.to_le_bytes()));
        }
    }

    #[test]
    fn test_lone_pixel_blends_on_all_four_sides() {
        let white = u32::from_le_bytes([255, 255, 255, 255]);
        let black = u32::from_le_bytes([0, 0, 0, 255]);
        let mut pixels = vec![white; 25];
        pixels[2 * 5 + 2] = black;
        let grid = DistanceGrid::compute(&pixels, 5, 5).unwrap();
        let (map, _) = OffsetMap::build(&grid).unwrap();
        let out = render(&pixels, &map).unwrap();

        let gray = Rgba([128, 128, 128, 255]);
        for i in 4..6 {
            assert_eq!(*out.get_pixel(3, i), gray, "left of the pixel");
            assert_eq!(*out.get_pixel(6, i), gray, "right of the pixel");
            assert_eq!(*out.get_pixel(i, 3), gray, "above the pixel");
            assert_eq!(*out.get_pixel(i, 6), gray, "below the pixel");
        }
        for (x, y) in [(4, 4), (5, 4), (4, 5), (5, 5)] {
            assert_eq!(*out.get_pixel(x, y), Rgba([0, 0, 0, 255]));
        }
        assert_eq!(*out.get_pixel(2, 4), Rgba([255, 255, 255, 255]));
        assert_eq!(*out.get_pixel(7, 4), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_render_rejects_size_mismatch() {
        let map = OffsetMap::new(4, 4);
        assert!(matches!(
            render(&[0; 15], &map),
            Err(UpscaleError::InvariantViolation { stage: Stage::Render, .. })
        ));
    }
}
