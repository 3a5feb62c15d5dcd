//! PNG input/output, output path generation and debug dumps

use image::{GrayImage, Luma, Rgba, RgbaImage};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::upscale::{BlendSide, DistanceGrid, OffsetMap, UpscaleError, COEFF_MAX, UNSET};

/// Kinds of debug dump written next to an output, see [`dump_path`].
pub const DUMP_KINDS: [&str; 3] = ["distance", "offsets", "contours"];

/// Colors cycled through by [`contours_image`], one per segment.
const SEGMENT_COLORS: [Rgba<u8>; 6] = [
    Rgba([255, 0, 255, 255]),
    Rgba([255, 255, 0, 255]),
    Rgba([0, 255, 255, 255]),
    Rgba([255, 0, 0, 255]),
    Rgba([0, 255, 0, 255]),
    Rgba([0, 0, 255, 255]),
];

/// Error type for image file operations
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Image decoding or encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Load any image format `image` can decode, converted to RGBA.
pub fn load_image(path: &Path) -> Result<RgbaImage, OutputError> {
    Ok(image::open(path)?.to_rgba8())
}

/// Save an RGBA image to a PNG file, creating parent directories as needed.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), OutputError> {
    create_parent(path)?;
    image.save(path)?;
    Ok(())
}

/// Save a grayscale debug image to a PNG file.
pub fn save_gray_png(image: &GrayImage, path: &Path) -> Result<(), OutputError> {
    create_parent(path)?;
    image.save(path)?;
    Ok(())
}

fn create_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Generate the output path for an upscaled image.
///
/// # Output Naming Rules
///
/// | Scenario | Output |
/// |----------|--------|
/// | No `-o` | `{input_dir}/{stem}{suffix}.png` |
/// | No `-o`, `out_dir` configured | `{out_dir}/{stem}{suffix}.png` |
/// | `-o out.png` (single input) | `out.png` |
/// | `-o dir/` or several inputs | `dir/{stem}{suffix}.png` |
pub fn generate_output_path(
    input: &Path,
    suffix: &str,
    out_dir: Option<&Path>,
    output_arg: Option<&Path>,
    is_single_input: bool,
) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let file_name = format!("{}{}.png", stem, suffix);

    match output_arg {
        Some(output) => {
            let is_dir = output.as_os_str().to_string_lossy().ends_with('/') || output.is_dir();
            if is_dir || !is_single_input {
                output.join(file_name)
            } else {
                output.to_path_buf()
            }
        }
        None => {
            let dir = out_dir.or_else(|| input.parent()).unwrap_or(Path::new(""));
            if dir.as_os_str().is_empty() {
                PathBuf::from(file_name)
            } else {
                dir.join(file_name)
            }
        }
    }
}

/// Path of a debug dump written next to `output`: `{stem}_{kind}.png`.
pub fn dump_path(output: &Path, kind: &str) -> PathBuf {
    let stem = output.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    output.with_file_name(format!("{}_{}.png", stem, kind))
}

/// Distance field as a grayscale image, levels scaled to `0..=255`.
pub fn distance_image(grid: &DistanceGrid) -> GrayImage {
    let max = grid.max_level().max(1) as i64;
    GrayImage::from_fn(grid.width(), grid.height(), |x, y| {
        let level = grid.level(x as i32, y as i32) as i64;
        Luma([(level * 255 / max) as u8])
    })
}

/// Gray level of a blend coefficient in the offsets dump.
fn offset_shade(v: i16) -> u8 {
    ((v as i32 + COEFF_MAX as i32) >> 8) as u8
}

/// Offset map at output resolution.
///
/// Each sample lands on the output pixel it blends: a vertical sample on the
/// right column of the near block or the left column of the far one, a
/// horizontal sample on the bottom or top row. A corner sub-pixel can carry
/// both a vertical and a horizontal sample; it shows the larger of the two.
/// Unset pixels are white; coefficients map to `(v + 32767) >> 8`.
pub fn offsets_image(map: &OffsetMap) -> GrayImage {
    let (width, height) = (map.width() * 2, map.height() * 2);
    let mut strongest = vec![UNSET; width as usize * height as usize];
    let mut mark = |x: u32, y: u32, v: i16| {
        let cell = &mut strongest[y as usize * width as usize + x as usize];
        *cell = (*cell).max(v);
    };

    for y in 0..map.height() {
        for x in 0..map.width() {
            let column = match map.vertical_side(x, y) {
                BlendSide::Near => 2 * x + 1,
                BlendSide::Far => 2 * x + 2,
            };
            for (k, v) in map.vertical(x, y).into_iter().enumerate() {
                if v != UNSET {
                    mark(column, 2 * y + k as u32, v);
                }
            }
            let row = match map.horizontal_side(x, y) {
                BlendSide::Near => 2 * y + 1,
                BlendSide::Far => 2 * y + 2,
            };
            for (j, v) in map.horizontal(x, y).into_iter().enumerate() {
                if v != UNSET {
                    mark(2 * x + j as u32, row, v);
                }
            }
        }
    }

    GrayImage::from_fn(width, height, |x, y| match strongest[y as usize * width as usize + x as usize] {
        UNSET => Luma([255]),
        v => Luma([offset_shade(v)]),
    })
}

/// Traced segments at output resolution, one color per segment.
///
/// Each segment paints the two sub-pixels of every cell it runs along, on
/// the cell's outward side. Everything else is transparent.
pub fn contours_image(grid: &DistanceGrid) -> Result<RgbaImage, UpscaleError> {
    let mut image = RgbaImage::new(grid.width() * 2, grid.height() * 2);
    let mut painted = 0usize;

    OffsetMap::build_with(grid, |segment, _| {
        let color = SEGMENT_COLORS[painted % SEGMENT_COLORS.len()];
        let (ox, oy) = segment.direction().outward().delta();
        for (x, y) in segment.cells() {
            for k in 0..2 {
                let sx = match ox {
                    -1 => 0,
                    1 => 1,
                    _ => k,
                };
                let sy = match oy {
                    -1 => 0,
                    1 => 1,
                    _ => k,
                };
                image.put_pixel(2 * x as u32 + sx, 2 * y as u32 + sy, color);
            }
        }
        painted += 1;
    })?;

    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upscale::pack_pixels;

    fn split_image() -> RgbaImage {
        RgbaImage::from_fn(8, 4, |x, _| {
            if x < 4 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 255])
            }
        })
    }

    #[test]
    fn test_generate_output_path_default() {
        let path = generate_output_path(Path::new("art/hero.png"), "_2x", None, None, true);
        assert_eq!(path, PathBuf::from("art/hero_2x.png"));

        let path = generate_output_path(Path::new("hero.png"), "_2x", None, None, true);
        assert_eq!(path, PathBuf::from("hero_2x.png"));
    }

    #[test]
    fn test_generate_output_path_out_dir() {
        let path =
            generate_output_path(Path::new("art/hero.png"), "", Some(Path::new("hd")), None, true);
        assert_eq!(path, PathBuf::from("hd/hero.png"));
    }

    #[test]
    fn test_generate_output_path_explicit_file() {
        let path = generate_output_path(
            Path::new("art/hero.png"),
            "_2x",
            Some(Path::new("ignored")),
            Some(Path::new("big.png")),
            true,
        );
        assert_eq!(path, PathBuf::from("big.png"));
    }

    #[test]
    fn test_generate_output_path_explicit_dir() {
        let path = generate_output_path(
            Path::new("art/hero.png"),
            "_2x",
            None,
            Some(Path::new("out/")),
            true,
        );
        assert_eq!(path, PathBuf::from("out/hero_2x.png"));

        let path = generate_output_path(
            Path::new("art/hero.png"),
            "_2x",
            None,
            Some(Path::new("out")),
            false,
        );
        assert_eq!(path, PathBuf::from("out/hero_2x.png"));
    }

    #[test]
    fn test_dump_path() {
        assert_eq!(
            dump_path(Path::new("out/hero_2x.png"), "distance"),
            PathBuf::from("out/hero_2x_distance.png")
        );
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp = tempfile::TempDir::new().expect("should create temp dir");
        let path = temp.path().join("nested").join("split.png");
        let image = split_image();

        save_png(&image, &path).expect("should save png");
        let loaded = load_image(&path).expect("should load png");
        assert_eq!(loaded, image);
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_image(Path::new("/nonexistent/definitely/missing.png"));
        assert!(result.is_err());
    }

    #[test]
    fn test_distance_image_scales_levels() {
        let image = split_image();
        let (w, h) = image.dimensions();
        let grid = DistanceGrid::compute(&pack_pixels(&image), w, h).unwrap();
        let dump = distance_image(&grid);

        assert_eq!(dump.dimensions(), (8, 4));
        let mut values: Vec<u8> = dump.pixels().map(|p| p.0[0]).collect();
        values.sort_unstable();
        values.dedup();
        // Levels 1 and 2 out of 2.
        assert_eq!(values, vec![127, 255]);
    }

    #[test]
    fn test_offsets_image_marks_seam() {
        let image = split_image();
        let (w, h) = image.dimensions();
        let grid = DistanceGrid::compute(&pack_pixels(&image), w, h).unwrap();
        let (map, _) = OffsetMap::build(&grid).unwrap();
        let dump = offsets_image(&map);

        assert_eq!(dump.dimensions(), (16, 8));
        for y in 0..8 {
            assert_eq!(dump.get_pixel(7, y).0[0], 127);
            assert_eq!(dump.get_pixel(6, y).0[0], 255);
            assert_eq!(dump.get_pixel(8, y).0[0], 255);
        }
    }

    fn grid_from_rows(rows: &[&str]) -> DistanceGrid {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let pixels: Vec<u32> = rows
            .iter()
            .flat_map(|row| row.bytes().map(|c| 0xFF00_0000 | c as u32))
            .collect();
        DistanceGrid::compute(&pixels, width, height).unwrap()
    }

    #[test]
    fn test_offsets_image_shared_corner_shows_stronger_sample() {
        // Cell (2, 2) has the region both to its right and below it.
        let grid = grid_from_rows(&["aaaaaa", "aaaaaa", "aaabaa", "aabbaa", "aaaaaa", "aaaaaa"]);
        let (map, _) = OffsetMap::build(&grid).unwrap();
        let v = map.vertical(2, 2)[1];
        let h = map.horizontal(2, 2)[1];
        assert_ne!(v, UNSET);
        assert_ne!(h, UNSET);
        assert_eq!(map.vertical_side(2, 2), BlendSide::Near);
        assert_eq!(map.horizontal_side(2, 2), BlendSide::Near);

        let dump = offsets_image(&map);
        assert_eq!(dump.get_pixel(5, 5).0[0], offset_shade(v.max(h)));
    }

    #[test]
    fn test_offsets_image_far_side() {
        // The lone pixel's right and lower edges blend the far blocks.
        let grid = grid_from_rows(&["aaaaa", "aaaaa", "aabaa", "aaaaa", "aaaaa"]);
        let (map, _) = OffsetMap::build(&grid).unwrap();
        let dump = offsets_image(&map);

        for i in 4..6 {
            assert_eq!(dump.get_pixel(3, i).0[0], 127);
            assert_eq!(dump.get_pixel(6, i).0[0], 127);
            assert_eq!(dump.get_pixel(i, 3).0[0], 127);
            assert_eq!(dump.get_pixel(i, 6).0[0], 127);
        }
        assert_eq!(dump.get_pixel(5, 5).0[0], 255);
    }

    #[test]
    fn test_contours_image_solid_is_empty() {
        let grid = grid_from_rows(&["aaaa", "aaaa", "aaaa", "aaaa"]);
        let dump = contours_image(&grid).unwrap();
        assert_eq!(dump.dimensions(), (8, 8));
        assert!(dump.pixels().all(|p| p.0[3] == 0));
    }

    #[test]
    fn test_contours_image_paints_segments() {
        let grid = grid_from_rows(&[
            "aaaaaaaa", //
            "aaaaaaaa", //
            "aaabbaaa", //
            "aabbbbaa", //
            "aabbbbaa", //
            "aaabbaaa", //
            "aaaaaaaa", //
            "aaaaaaaa", //
        ]);
        let dump = contours_image(&grid).unwrap();
        assert_eq!(dump.dimensions(), (16, 16));

        // Middle of the top side belongs to a single segment.
        let top = *dump.get_pixel(7, 4);
        assert_eq!(top.0[3], 255);
        assert_eq!(*dump.get_pixel(8, 4), top);
        assert!(SEGMENT_COLORS.contains(&top));

        // Background and blob interior stay clear.
        assert_eq!(dump.get_pixel(0, 0).0[3], 0);
        assert_eq!(dump.get_pixel(7, 7).0[3], 0);

        let mut colors: Vec<[u8; 4]> =
            dump.pixels().filter(|p| p.0[3] != 0).map(|p| p.0).collect();
        colors.sort_unstable();
        colors.dedup();
        assert!(colors.len() > 1);
    }
}
