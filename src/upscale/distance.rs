//! Color-aware distance field.
//!
//! Every pixel gets a level: the wavefront round in which it was reached,
//! starting from the image border. Within a round a wavefront floods through
//! all 8-connected pixels of the same color before the next round is seeded
//! from the 4-neighbours of everything finalized. Colors finalized in the same
//! round are told apart by their frequency rank, so two regions at the same
//! depth never share a level.
//!
//! # Worklist encoding
//!
//! While the field is being built a cell holds one of:
//!
//! | value | meaning                                            |
//! |-------|----------------------------------------------------|
//! | `0`   | not reached yet                                    |
//! | `< 0` | queued; the value links to the next queued cell    |
//! | `> 0` | finalized level                                    |
//!
//! A link packs `(x, y)` as `!((1 << 30) | x << 15 | y)`, so every link is
//! negative and distinct from the list terminator `-1`. This is why
//! coordinates are limited to 15 bits.

use super::color_counter::RankedColorCounter;
use super::error::{check_dimensions, Stage, UpscaleError};

/// Terminator of an intrusive worklist.
const END: i32 = -1;

/// Cell value before a wavefront reaches it.
const UNREACHED: i32 = 0;

const NEIGHBOURS_8: [(i32, i32); 8] =
    [(-1, -1), (-1, 0), (-1, 1), (0, -1), (0, 1), (1, -1), (1, 0), (1, 1)];

const NEIGHBOURS_4: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

fn encode_link(x: u32, y: u32) -> i32 {
    debug_assert!(x < 1 << 15 && y < 1 << 15);
    !(((1 << 15 | x) << 15 | y) as i32)
}

fn decode_link(link: i32) -> Option<(u32, u32)> {
    if link == END {
        return None;
    }
    let bits = !link as u32;
    Some(((bits >> 15) & 0x7FFF, bits & 0x7FFF))
}

/// Finalized per-pixel levels of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceGrid {
    width: u32,
    height: u32,
    cells: Vec<i32>,
    rounds: u32,
}

impl DistanceGrid {
    /// Compute the distance field of a packed RGBA image.
    ///
    /// `pixels` is row-major with `width * height` entries.
    pub fn compute(pixels: &[u32], width: u32, height: u32) -> Result<Self, UpscaleError> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(UpscaleError::invariant(
                Stage::Distance,
                format!("expected {} pixels, got {}", expected, pixels.len()),
            ));
        }

        let mut field = Propagation { pixels, width, height, cells: vec![UNREACHED; expected] };
        let mut counter = RankedColorCounter::new();
        let mut worklist = field.seed_border();
        let mut level: i32 = 1;
        let mut rounds = 0;

        while worklist != END {
            rounds += 1;
            worklist = field.flood(worklist);
            field.count_colors(worklist, &mut counter);
            worklist = field.finalize(worklist, level, &counter)?;
            level += counter.distinct_count() as i32;
            log::trace!("distance round {} done, next level {}", rounds, level);
        }

        let grid = DistanceGrid { width, height, cells: field.cells, rounds };
        if let Some(index) = grid.cells.iter().position(|&v| v <= 0) {
            return Err(UpscaleError::invariant(
                Stage::Distance,
                format!("cell {} was never finalized", index),
            ));
        }
        Ok(grid)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of wavefront rounds the propagation took.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Highest level in the grid.
    pub fn max_level(&self) -> i32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Whether `(x, y)` lies inside the image.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Level at `(x, y)`; anything outside the image reads as 0.
    pub fn level(&self, x: i32, y: i32) -> i32 {
        if self.contains(x, y) {
            self.cells[y as usize * self.width as usize + x as usize]
        } else {
            0
        }
    }

    /// Row-major levels.
    pub fn levels(&self) -> &[i32] {
        &self.cells
    }
}

/// Mutable state of the wavefront propagation.
struct Propagation<'a> {
    pixels: &'a [u32],
    width: u32,
    height: u32,
    cells: Vec<i32>,
}

impl Propagation<'_> {
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    fn color(&self, x: u32, y: u32) -> u32 {
        self.pixels[self.index(x, y)]
    }

    /// Offset `(x, y)` by `(dx, dy)` if the result stays inside the image.
    fn neighbour(&self, x: u32, y: u32, dx: i32, dy: i32) -> Option<(u32, u32)> {
        let nx = x.checked_add_signed(dx)?;
        let ny = y.checked_add_signed(dy)?;
        (nx < self.width && ny < self.height).then_some((nx, ny))
    }

    fn push(&mut self, list: i32, x: u32, y: u32) -> i32 {
        let index = self.index(x, y);
        debug_assert_eq!(self.cells[index], UNREACHED);
        self.cells[index] = list;
        encode_link(x, y)
    }

    /// Link following `(x, y)` in its worklist.
    fn next_link(&self, x: u32, y: u32) -> i32 {
        self.cells[self.index(x, y)]
    }

    /// Queue every border pixel once.
    fn seed_border(&mut self) -> i32 {
        let (w, h) = (self.width, self.height);
        let mut list = END;
        for x in 0..w {
            list = self.push(list, x, 0);
            list = self.push(list, x, h - 1);
        }
        for y in 1..h - 1 {
            list = self.push(list, 0, y);
            list = self.push(list, w - 1, y);
        }
        list
    }

    /// Grow the frontier through same-colored 8-neighbours until it stops changing.
    ///
    /// New cells are pushed at the head, so each pass only rescans the cells
    /// added by the previous one.
    fn flood(&mut self, mut list: i32) -> i32 {
        let mut stop = END;
        while list != stop {
            let pass_head = list;
            let mut cursor = list;
            while let Some((x, y)) = decode_link(cursor).filter(|_| cursor != stop) {
                let color = self.color(x, y);
                for (dx, dy) in NEIGHBOURS_8 {
                    if let Some((nx, ny)) = self.neighbour(x, y, dx, dy) {
                        if self.color(nx, ny) == color
                            && self.cells[self.index(nx, ny)] == UNREACHED
                        {
                            list = self.push(list, nx, ny);
                        }
                    }
                }
                cursor = self.next_link(x, y);
            }
            stop = pass_head;
        }
        list
    }

    fn count_colors(&self, list: i32, counter: &mut RankedColorCounter) {
        counter.start();
        let mut cursor = list;
        while let Some((x, y)) = decode_link(cursor) {
            counter.increment(self.color(x, y));
            cursor = self.next_link(x, y);
        }
        counter.rank();
    }

    /// Finalize the frontier at `level + rank` and return the next round's worklist.
    fn finalize(
        &mut self,
        list: i32,
        level: i32,
        counter: &RankedColorCounter,
    ) -> Result<i32, UpscaleError> {
        let mut next = END;
        let mut cursor = list;
        while let Some((x, y)) = decode_link(cursor) {
            for (dx, dy) in NEIGHBOURS_4 {
                if let Some((nx, ny)) = self.neighbour(x, y, dx, dy) {
                    if self.cells[self.index(nx, ny)] == UNREACHED {
                        next = self.push(next, nx, ny);
                    }
                }
            }

            cursor = self.next_link(x, y);
            let color = self.color(x, y);
            let rank = counter.rank_of(color).ok_or_else(|| {
                UpscaleError::invariant(
                    Stage::Distance,
                    format!("color {:#010x} at ({}, {}) has no rank", color, x, y),
                )
            })?;
            let index = self.index(x, y);
            self.cells[index] = level + rank as i32;
        }
        Ok(next)
    }
}
