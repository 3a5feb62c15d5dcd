//! Per-edge sub-pixel blend coefficients.
//!
//! Each interior pixel edge carries two samples, one per half of the edge at
//! 2x resolution. A sample in `-32767..=32767` says how far the color inside
//! the contour that wrote it spreads into the outside cell: `-32767` keeps the
//! nearest-neighbour result, `0` is an even blend and `32767` takes the inside
//! color outright. The edge's [`BlendSide`] names the block whose facing
//! sub-pixels receive the blend. Samples no contour touched stay [`UNSET`].
//!
//! Layout, all arrays `width * height` and row-major:
//!
//! - `vertical[x, y]` is the edge between `(x, y)` and `(x + 1, y)`; samples are `[top, bottom]`.
//! - `horizontal[x, y]` is the edge between `(x, y)` and `(x, y + 1)`; samples are `[left, right]`.

use serde::Serialize;

use super::distance::DistanceGrid;
use super::error::{Stage, UpscaleError};
use super::tracer::{ContourTracer, Corner, Direction, Edge, Segment, SegmentShape};

/// Sample no contour has written.
pub const UNSET: i16 = i16::MIN;

/// Largest blend coefficient.
pub const COEFF_MAX: i16 = i16::MAX;

/// Contour counts gathered while building an [`OffsetMap`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TraceStats {
    pub contours: usize,
    pub segments: usize,
}

/// Which of the two blocks along an edge its samples blend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlendSide {
    /// Right column or bottom row of the left or upper cell
    #[default]
    Near,
    /// Left column or top row of the right or lower cell
    Far,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetMap {
    width: u32,
    height: u32,
    horizontal: Vec<[i16; 2]>,
    vertical: Vec<[i16; 2]>,
    horizontal_side: Vec<BlendSide>,
    vertical_side: Vec<BlendSide>,
}

impl OffsetMap {
    /// Map with every sample unset.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            horizontal: vec![[UNSET; 2]; len],
            vertical: vec![[UNSET; 2]; len],
            horizontal_side: vec![BlendSide::Near; len],
            vertical_side: vec![BlendSide::Near; len],
        }
    }

    /// Trace every contour of `grid` and record its blend profile.
    ///
    /// Contours are discovered in raster order over the doubled grid. A seed
    /// edge that already carries samples belongs to a contour traced earlier
    /// and is skipped. Where contours of different levels share an edge, the
    /// first one to write a sample keeps it.
    pub fn build(grid: &DistanceGrid) -> Result<(Self, TraceStats), UpscaleError> {
        Self::build_with(grid, |_, _| {})
    }

    /// Same as [`build`](Self::build), calling `visit` for every segment in
    /// trace order once its samples are written.
    pub fn build_with<F>(grid: &DistanceGrid, mut visit: F) -> Result<(Self, TraceStats), UpscaleError>
    where
        F: FnMut(&Segment, SegmentShape),
    {
        let (width, height) = (grid.width(), grid.height());
        let mut map = OffsetMap::new(width, height);
        let mut tracer = ContourTracer::new(grid);
        let mut stats = TraceStats::default();
        let limit = 4 * width as usize * height as usize + 4;

        for y2 in 0..height * 2 {
            for x2 in 0..width * 2 {
                let Some(seed) = tracer.probe(x2, y2) else {
                    continue;
                };
                if map.is_claimed(&seed) || !tracer.begin(x2, y2)? {
                    continue;
                }
                let segments = map.trace_contour(&mut tracer, grid, limit, &mut visit)?;
                log::trace!(
                    "contour at level {:?} from ({}, {}): {} segments",
                    tracer.level(),
                    seed.x,
                    seed.y,
                    segments
                );
                stats.contours += 1;
                stats.segments += segments;
            }
        }

        Ok((map, stats))
    }

    /// Follow the contour under `tracer` once around, filling each segment.
    fn trace_contour<F>(
        &mut self,
        tracer: &mut ContourTracer,
        grid: &DistanceGrid,
        limit: usize,
        visit: &mut F,
    ) -> Result<usize, UpscaleError>
    where
        F: FnMut(&Segment, SegmentShape),
    {
        let mut prev = tracer.next_line()?;
        let mut curr = tracer.next_line()?;
        let mut next = tracer.next_line()?;
        let first = curr;
        let mut count = 0;

        loop {
            let shape = SegmentShape::from_corners(
                Corner::at_start(&prev, &curr, grid),
                Corner::at_end(&curr, &next, grid),
            );
            self.fill(&curr, shape);
            visit(&curr, shape);
            count += 1;
            if count > limit {
                return Err(UpscaleError::invariant(
                    Stage::Offsets,
                    format!(
                        "contour through ({}, {}) did not close after {} segments",
                        first.edge.x, first.edge.y, limit
                    ),
                ));
            }

            prev = curr;
            curr = next;
            next = tracer.next_line()?;
            if curr == first {
                return Ok(count);
            }
        }
    }

    /// Write the samples of `segment` that are still unset.
    ///
    /// The blend lands in the outside cell, which is the far block when the
    /// contour faces right or down. A seam has no inside and always uses the
    /// near block.
    fn fill(&mut self, segment: &Segment, shape: SegmentShape) {
        let n = 2 * segment.len;
        let direction = segment.direction();
        let side = direction.outward();
        let blend_side = if side.is_positive() && !matches!(shape, SegmentShape::Seam) {
            BlendSide::Far
        } else {
            BlendSide::Near
        };

        for (i, (x, y)) in segment.cells().enumerate() {
            let Some((slot, owner)) = self.slot_mut(x, y, side) else {
                continue;
            };
            if *slot == [UNSET; 2] {
                *owner = blend_side;
            }
            for k in 0..2 {
                let sub = if direction.is_positive() { k } else { 1 - k };
                if slot[sub] == UNSET {
                    slot[sub] = shape.sample(2 * i as u32 + k as u32, n);
                }
            }
        }
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    fn index(&self, x: i32, y: i32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Samples and blend side of the edge on `side` of cell `(x, y)`, if both
    /// cells are in the image.
    fn slot_mut(
        &mut self,
        x: i32,
        y: i32,
        side: Direction,
    ) -> Option<(&mut [i16; 2], &mut BlendSide)> {
        let (dx, dy) = side.delta();
        let (ox, oy) = (x + dx, y + dy);
        if !self.contains(x, y) || !self.contains(ox, oy) {
            return None;
        }
        // Edges are stored at the smaller of the two cells.
        let index = self.index(x.min(ox), y.min(oy));
        match side {
            Direction::Left | Direction::Right => {
                Some((&mut self.vertical[index], &mut self.vertical_side[index]))
            }
            Direction::Up | Direction::Down => {
                Some((&mut self.horizontal[index], &mut self.horizontal_side[index]))
            }
        }
    }

    fn is_claimed(&self, seed: &Edge) -> bool {
        let (ox, oy) = seed.outside_cell();
        if !self.contains(ox, oy) {
            return false;
        }
        let index = self.index(seed.x.min(ox), seed.y.min(oy));
        let samples = if seed.direction.is_vertical() {
            self.vertical[index]
        } else {
            self.horizontal[index]
        };
        samples != [UNSET; 2]
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Samples `[left, right]` of the edge below `(x, y)`.
    pub fn horizontal(&self, x: u32, y: u32) -> [i16; 2] {
        self.horizontal[y as usize * self.width as usize + x as usize]
    }

    /// Samples `[top, bottom]` of the edge right of `(x, y)`.
    pub fn vertical(&self, x: u32, y: u32) -> [i16; 2] {
        self.vertical[y as usize * self.width as usize + x as usize]
    }

    /// Block blended by the samples of `horizontal(x, y)`.
    pub fn horizontal_side(&self, x: u32, y: u32) -> BlendSide {
        self.horizontal_side[y as usize * self.width as usize + x as usize]
    }

    /// Block blended by the samples of `vertical(x, y)`.
    pub fn vertical_side(&self, x: u32, y: u32) -> BlendSide {
        self.vertical_side[y as usize * self.width as usize + x as usize]
    }

    /// Number of samples written by any contour.
    pub fn set_samples(&self) -> usize {
        self.samples().filter(|&v| v != UNSET).count()
    }

    /// Number of samples that move color across an edge.
    pub fn blended_samples(&self) -> usize {
        self.samples().filter(|&v| v != UNSET && v > -COEFF_MAX).count()
    }

    fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.horizontal.iter().chain(self.vertical.iter()).flatten().copied()
    }
}

impl SegmentShape {
    /// Sample `j` of the `n` samples along a segment, in travel order.
    pub fn sample(self, j: u32, n: u32) -> i16 {
        let max = COEFF_MAX as i64;
        let (j, n) = (j as i64, n as i64);
        let value = match self {
            SegmentShape::Seam => 0,
            SegmentShape::Straight => -max,
            SegmentShape::Curve => {
                let distance = (2 * j + 1 - n).abs();
                -max + 2 * max * (n - distance) / n
            }
            SegmentShape::Ramp { soft_start } => {
                // A falling ramp is the rising one read backwards, sample for sample.
                let i = if soft_start { n - 1 - j } else { j };
                -max + 2 * max * (2 * i + 1) / (2 * n)
            }
        };
        value as i16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_from_rows(rows: &[&str]) -> DistanceGrid {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let pixels: Vec<u32> = rows
            .iter()
            .flat_map(|row| row.bytes().map(|c| 0xFF00_0000 | c as u32))
            .collect();
        DistanceGrid::compute(&pixels, width, height).unwrap()
    }

    fn build(rows: &[&str]) -> (OffsetMap, TraceStats) {
        OffsetMap::build(&grid_from_rows(rows)).unwrap()
    }

    #[test]
    fn test_solid_image_has_no_samples() {
        let (map, stats) = build(&["aaaa", "aaaa", "aaaa", "aaaa"]);
        assert_eq!(stats, TraceStats { contours: 0, segments: 0 });
        assert_eq!(map.set_samples(), 0);
        assert_eq!(map.horizontal(1, 1), [UNSET; 2]);
    }

    #[test]
    fn test_seam_blends_evenly() {
        let (map, stats) = build(&["aaaabbbb", "aaaabbbb", "aaaabbbb", "aaaabbbb"]);
        assert_eq!(stats, TraceStats { contours: 1, segments: 4 });
        for y in 0..4 {
            assert_eq!(map.vertical(3, y), [0, 0]);
        }
        assert_eq!(map.set_samples(), 8);
        assert_eq!(map.blended_samples(), 8);
        assert!((0..4).all(|y| map.vertical_side(3, y) == BlendSide::Near));
    }

    #[test]
    fn test_l_corner_stays_on_grid() {
        let (map, stats) = build(&[
            "aaaaaaaa", //
            "aaaaaaaa", //
            "aaaaaaaa", //
            "aaaaaaaa", //
            "aaaabbbb", //
            "aaaabbbb", //
            "aaaabbbb", //
            "aaaabbbb", //
        ]);
        assert_eq!(stats.contours, 1);
        assert_eq!(stats.segments, 4);
        for i in 4..8 {
            assert_eq!(map.vertical(3, i), [-COEFF_MAX; 2]);
            assert_eq!(map.horizontal(i, 3), [-COEFF_MAX; 2]);
        }
        assert_eq!(map.blended_samples(), 0);
    }

    #[test]
    fn test_blob_curves() {
        let (map, stats) = build(&[
            "aaaaaaaa", //
            "aaaaaaaa", //
            "aaabbaaa", //
            "aabbbbaa", //
            "aabbbbaa", //
            "aaabbaaa", //
            "aaaaaaaa", //
            "aaaaaaaa", //
        ]);
        assert_eq!(stats, TraceStats { contours: 1, segments: 12 });

        // Top side, travelling left.
        assert_eq!(map.horizontal(3, 1), [-16384, 16383]);
        assert_eq!(map.horizontal(4, 1), [16383, -16384]);
        // Left side, travelling down.
        assert_eq!(map.vertical(1, 3), [-16384, 16383]);
        assert_eq!(map.vertical(1, 4), [16383, -16384]);
        // One-cell steps stay on the grid.
        assert_eq!(map.vertical(2, 2), [-COEFF_MAX; 2]);
        assert_eq!(map.horizontal(2, 2), [-COEFF_MAX; 2]);
        // Untouched interior edge.
        assert_eq!(map.vertical(3, 3), [UNSET; 2]);
    }

    #[test]
    fn test_blob_blends_into_the_outside_cell() {
        let (map, _) = build(&[
            "aaaaaaaa", //
            "aaaaaaaa", //
            "aaabbaaa", //
            "aabbbbaa", //
            "aabbbbaa", //
            "aaabbaaa", //
            "aaaaaaaa", //
            "aaaaaaaa", //
        ]);

        // Outside above and left: the near block.
        assert_eq!(map.horizontal_side(3, 1), BlendSide::Near);
        assert_eq!(map.vertical_side(1, 3), BlendSide::Near);
        // Outside below and right: the far block, with mirrored samples.
        assert_eq!(map.horizontal_side(3, 5), BlendSide::Far);
        assert_eq!(map.vertical_side(5, 3), BlendSide::Far);
        assert_eq!(map.horizontal(3, 5), map.horizontal(3, 1));
        assert_eq!(map.vertical(5, 4), map.vertical(1, 4));
    }

    #[test]
    fn test_build_with_visits_every_segment() {
        let grid = grid_from_rows(&["aaaabbbb", "aaaabbbb", "aaaabbbb", "aaaabbbb"]);
        let mut shapes = Vec::new();
        let (_, stats) =
            OffsetMap::build_with(&grid, |segment, shape| shapes.push((segment.len, shape))).unwrap();

        assert_eq!(shapes.len(), stats.segments);
        // The seam and the frame side opposite it.
        assert_eq!(shapes.iter().filter(|(_, shape)| *shape == SegmentShape::Seam).count(), 2);
        assert!(shapes.iter().all(|&(len, _)| len == 4));
    }

    #[test]
    fn test_staircase_ramps() {
        let (map, stats) = build(&[
            "aaaaaaaa", //
            "aaaaaaab", //
            "aaaaaabb", //
            "aaaaabbb", //
            "aaaabbbb", //
            "aaabbbbb", //
            "aabbbbbb", //
            "abbbbbbb", //
        ]);
        assert_eq!(stats.contours, 1);

        // Top of the step at (4, 4), hard where it comes off the riser.
        assert_eq!(map.horizontal(4, 3), [16383, -16384]);
        // Its riser, soft where it leaves the tread.
        assert_eq!(map.vertical(3, 4), [16383, -16384]);
    }

    #[test]
    fn test_first_contour_keeps_shared_edges() {
        let (map, stats) = build(&[
            "aaaaaaaa", //
            "aaaaaaaa", //
            "aabbbbaa", //
            "aabbbbaa", //
            "aacbbbaa", //
            "aabbbbaa", //
            "aaaaaaaa", //
            "aaaaaaaa", //
        ]);
        // The square at level 2, then the lone c pixel at level 3.
        assert_eq!(stats, TraceStats { contours: 2, segments: 8 });

        // Shared with the square's left side, traced first.
        assert_eq!(map.vertical(1, 4), [-COEFF_MAX; 2]);
        // Only the single-pixel contour reaches these.
        assert_eq!(map.vertical(2, 4), [0, 0]);
        assert_eq!(map.horizontal(2, 3), [0, 0]);
        assert_eq!(map.horizontal(2, 4), [0, 0]);
    }

    #[test]
    fn test_shape_samples() {
        assert_eq!(SegmentShape::Seam.sample(0, 2), 0);
        assert_eq!(SegmentShape::Straight.sample(1, 2), -COEFF_MAX);

        let curve: Vec<i16> = (0..4).map(|j| SegmentShape::Curve.sample(j, 4)).collect();
        assert_eq!(curve, vec![-16384, 16383, 16383, -16384]);

        let ramp: Vec<i16> =
            (0..4).map(|j| SegmentShape::Ramp { soft_start: false }.sample(j, 4)).collect();
        assert!(ramp.windows(2).all(|w| w[0] < w[1]));
        assert!(ramp.iter().all(|&v| v > -COEFF_MAX && v < COEFF_MAX));

        let falling: Vec<i16> =
            (0..4).rev().map(|j| SegmentShape::Ramp { soft_start: true }.sample(j, 4)).collect();
        assert_eq!(falling, ramp);
    }

    #[test]
    fn test_samples_in_range() {
        let (map, _) = build(&[
            "abcabcab", //
            "bcabcabc", //
            "cabcabca", //
            "abcabcab", //
            "aaaabbbb", //
            "aabbbbcc", //
        ]);
        for y in 0..map.height() {
            for x in 0..map.width() {
                for v in map.horizontal(x, y).into_iter().chain(map.vertical(x, y)) {
                    assert!(v == UNSET || (-COEFF_MAX..=COEFF_MAX).contains(&v));
                }
            }
        }
    }
}
