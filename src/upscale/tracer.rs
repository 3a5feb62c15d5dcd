//! Boundary contour tracing over a [`DistanceGrid`].
//!
//! A contour is the boundary of the set of cells whose level is at least the
//! level of the cell the trace started from. The tracer walks it one straight
//! run at a time, keeping the region on one side and lower levels (or the
//! outside of the image) on its [`outward`](Direction::outward) side.
//!
//! At the far end `E` of a run travelling in direction `d` with outward side
//! `p`, only the 2x2 block around the corner decides where the boundary goes:
//!
//! ```text
//!   E+d+p inside  -> step diagonally onto it and turn toward p (concave corner)
//!   otherwise     -> stay on E and turn away from p           (convex corner)
//! ```
//!
//! The region is 8-connected and its complement 4-connected, so each boundary
//! edge has exactly one successor and every walk closes. The tracer does not
//! report closure; callers stop when a segment repeats.

use super::distance::DistanceGrid;
use super::error::{Stage, UpscaleError};

/// Travel direction along a boundary, in screen coordinates (y grows down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Right,
    Down,
    Left,
    Up,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Right, Direction::Down, Direction::Left, Direction::Up];

    /// Unit step `(dx, dy)`.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Up => (0, -1),
        }
    }

    /// Side of the boundary where the lower levels are: a clockwise quarter-turn.
    pub fn outward(self) -> Direction {
        match self {
            Direction::Right => Direction::Down,
            Direction::Down => Direction::Left,
            Direction::Left => Direction::Up,
            Direction::Up => Direction::Right,
        }
    }

    /// Side of the boundary where the region is: a counter-clockwise quarter-turn.
    pub fn inward(self) -> Direction {
        match self {
            Direction::Right => Direction::Up,
            Direction::Up => Direction::Left,
            Direction::Left => Direction::Down,
            Direction::Down => Direction::Right,
        }
    }

    /// True for directions that increase a coordinate.
    pub fn is_positive(self) -> bool {
        matches!(self, Direction::Right | Direction::Down)
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Direction::Down | Direction::Up)
    }
}

/// A directed boundary edge.
///
/// `(x, y)` is the cell inside the region; the edge is the grid line between
/// it and its neighbour on the [`outward`](Direction::outward) side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
}

impl Edge {
    /// Cell `steps` cells further along the direction of travel.
    pub fn advance(&self, steps: i32) -> (i32, i32) {
        let (dx, dy) = self.direction.delta();
        (self.x + dx * steps, self.y + dy * steps)
    }

    /// Cell on the far side of the edge.
    pub fn outside_cell(&self) -> (i32, i32) {
        let (ox, oy) = self.direction.outward().delta();
        (self.x + ox, self.y + oy)
    }
}

/// A maximal straight run of a contour, `len` cells long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    pub edge: Edge,
    pub len: u32,
}

impl Segment {
    pub fn direction(&self) -> Direction {
        self.edge.direction
    }

    /// Inside cells along the run, in travel order.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        (0..self.len as i32).map(move |i| self.edge.advance(i))
    }

    /// Whether the run lies along the image frame, with nothing but the
    /// outside of the image beyond it.
    pub fn on_frame(&self, grid: &DistanceGrid) -> bool {
        let (ox, oy) = self.edge.outside_cell();
        !grid.contains(ox, oy)
    }
}

/// How a contour turns from one segment to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// Turn toward the outward side; the region wraps around a lower cell.
    Concave,
    /// Turn toward the region; the region has a corner cell here.
    Convex,
}

impl Turn {
    /// Turn from `from` to `to`, if they are perpendicular.
    pub fn between(from: Direction, to: Direction) -> Option<Turn> {
        if to == from.outward() {
            Some(Turn::Concave)
        } else if to == from.inward() {
            Some(Turn::Convex)
        } else {
            None
        }
    }
}

/// Classification of one end of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    /// A real silhouette corner: long neighbour or concave turn
    Hard,
    /// One step of a staircase: single-cell neighbour reached by a convex turn
    Soft,
    /// The neighbouring segment runs along the image frame
    Open,
}

impl Corner {
    /// Classify a segment end from the segment on the other side of it.
    ///
    /// `turn` is the turn between the two in travel order.
    fn classify(neighbour: &Segment, turn: Option<Turn>, grid: &DistanceGrid) -> Corner {
        if neighbour.on_frame(grid) {
            Corner::Open
        } else if neighbour.len == 1 && turn == Some(Turn::Convex) {
            Corner::Soft
        } else {
            Corner::Hard
        }
    }

    /// Corner at the start of `curr`, which follows `prev`.
    pub fn at_start(prev: &Segment, curr: &Segment, grid: &DistanceGrid) -> Corner {
        Corner::classify(prev, Turn::between(prev.direction(), curr.direction()), grid)
    }

    /// Corner at the end of `curr`, which is followed by `next`.
    pub fn at_end(curr: &Segment, next: &Segment, grid: &DistanceGrid) -> Corner {
        Corner::classify(next, Turn::between(curr.direction(), next.direction()), grid)
    }

    /// Open ends pin the boundary like hard ones.
    pub fn is_hard(self) -> bool {
        !matches!(self, Corner::Soft)
    }
}

/// How a segment is drawn, decided by its two corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentShape {
    /// Both ends open: a straight boundary crossing the whole image
    Seam,
    /// Pinned at both ends: kept on the pixel grid
    Straight,
    /// Soft at both ends: bulges at the midpoint
    Curve,
    /// Soft at one end only
    Ramp { soft_start: bool },
}

impl SegmentShape {
    pub fn from_corners(start: Corner, end: Corner) -> SegmentShape {
        match (start, end) {
            (Corner::Open, Corner::Open) => SegmentShape::Seam,
            (Corner::Soft, Corner::Soft) => SegmentShape::Curve,
            (Corner::Soft, _) => SegmentShape::Ramp { soft_start: true },
            (_, Corner::Soft) => SegmentShape::Ramp { soft_start: false },
            _ => SegmentShape::Straight,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    edge: Edge,
    level: i32,
    /// Cells in the run past the first one.
    run: u32,
}

impl Cursor {
    fn end(&self) -> (i32, i32) {
        self.edge.advance(self.run as i32)
    }

    fn segment(&self) -> Segment {
        Segment { edge: self.edge, len: self.run + 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TracerState {
    Idle,
    Tracing(Cursor),
}

/// Cursor walking one contour at a time.
#[derive(Debug, Clone)]
pub struct ContourTracer<'a> {
    grid: &'a DistanceGrid,
    state: TracerState,
}

impl<'a> ContourTracer<'a> {
    pub fn new(grid: &'a DistanceGrid) -> Self {
        Self { grid, state: TracerState::Idle }
    }

    pub fn is_tracing(&self) -> bool {
        matches!(self.state, TracerState::Tracing(_))
    }

    /// Level of the contour being traced.
    pub fn level(&self) -> Option<i32> {
        match self.state {
            TracerState::Tracing(cursor) => Some(cursor.level),
            TracerState::Idle => None,
        }
    }

    /// Segment under the cursor.
    pub fn current(&self) -> Option<Segment> {
        match self.state {
            TracerState::Tracing(cursor) => Some(cursor.segment()),
            TracerState::Idle => None,
        }
    }

    fn inside(&self, level: i32, x: i32, y: i32) -> bool {
        self.grid.level(x, y) >= level
    }

    /// Whether `(x, y)` is inside with its outward neighbour outside.
    fn on_boundary(&self, level: i32, x: i32, y: i32, direction: Direction) -> bool {
        let (ox, oy) = direction.outward().delta();
        self.inside(level, x, y) && !self.inside(level, x + ox, y + oy)
    }

    /// Number of boundary cells following `(x, y)` in `direction`.
    fn extend(&self, level: i32, x: i32, y: i32, direction: Direction) -> u32 {
        let (dx, dy) = direction.delta();
        let mut run = 0;
        while self.on_boundary(level, x + dx * (run as i32 + 1), y + dy * (run as i32 + 1), direction)
        {
            run += 1;
        }
        run
    }

    /// Seed edge for doubled-grid position `(x2, y2)`.
    ///
    /// The position is a sub-pixel of cell `(x2 / 2, y2 / 2)` and only looks
    /// across the cell sides it touches, in the order left, down, right, up.
    /// Cells at level 1 belong to the outermost wavefront and never seed.
    pub fn probe(&self, x2: u32, y2: u32) -> Option<Edge> {
        let (x, y) = ((x2 / 2) as i32, (y2 / 2) as i32);
        if !self.grid.contains(x, y) {
            return None;
        }
        let level = self.grid.level(x, y);
        if level <= 1 {
            return None;
        }

        let facing = [
            (x2 % 2 == 0, Direction::Left),
            (y2 % 2 == 1, Direction::Down),
            (x2 % 2 == 1, Direction::Right),
            (y2 % 2 == 0, Direction::Up),
        ];
        facing.into_iter().filter(|&(touches, _)| touches).find_map(|(_, side)| {
            let (dx, dy) = side.delta();
            let (nx, ny) = (x + dx, y + dy);
            (self.grid.contains(nx, ny) && self.grid.level(nx, ny) < level)
                .then_some(Edge { x, y, direction: side.inward() })
        })
    }

    /// Start a contour at doubled-grid position `(x2, y2)`.
    ///
    /// Returns `Ok(false)` and leaves the tracer idle when the position does
    /// not touch a boundary. Otherwise the cursor holds the maximal run through
    /// the seed edge.
    pub fn begin(&mut self, x2: u32, y2: u32) -> Result<bool, UpscaleError> {
        self.state = TracerState::Idle;
        let Some(seed) = self.probe(x2, y2) else {
            return Ok(false);
        };

        let level = self.grid.level(seed.x, seed.y);
        let direction = seed.direction;
        let (dx, dy) = direction.delta();
        let (mut x, mut y) = (seed.x, seed.y);
        while self.on_boundary(level, x - dx, y - dy, direction) {
            x -= dx;
            y -= dy;
        }

        let run = self.extend(level, x, y, direction);
        let cursor = Cursor { edge: Edge { x, y, direction }, level, run };
        self.check(&cursor)?;
        self.state = TracerState::Tracing(cursor);
        Ok(true)
    }

    /// Turn at the end of the current run and take the next maximal run.
    pub fn next(&mut self) -> Result<(), UpscaleError> {
        let TracerState::Tracing(cursor) = self.state else {
            return Err(UpscaleError::invariant(Stage::Trace, "next() called on an idle tracer"));
        };

        let direction = cursor.edge.direction;
        let (dx, dy) = direction.delta();
        let (ox, oy) = direction.outward().delta();
        let (ex, ey) = cursor.end();
        let (ax, ay) = (ex + dx + ox, ey + dy + oy);

        let (x, y, turned) = if self.inside(cursor.level, ax, ay) {
            (ax, ay, direction.outward())
        } else {
            (ex, ey, direction.inward())
        };

        let run = self.extend(cursor.level, x, y, turned);
        let next = Cursor { edge: Edge { x, y, direction: turned }, level: cursor.level, run };
        self.check(&next)?;
        self.state = TracerState::Tracing(next);
        Ok(())
    }

    /// Return the current segment and advance to the next one.
    pub fn next_line(&mut self) -> Result<Segment, UpscaleError> {
        let segment = self.current().ok_or_else(|| {
            UpscaleError::invariant(Stage::Trace, "next_line() called on an idle tracer")
        })?;
        self.next()?;
        Ok(segment)
    }

    /// Both ends of the run sit on the boundary and neither can be extended.
    fn check(&self, cursor: &Cursor) -> Result<(), UpscaleError> {
        let direction = cursor.edge.direction;
        let level = cursor.level;
        let (sx, sy) = (cursor.edge.x, cursor.edge.y);
        let (ex, ey) = cursor.end();
        let (dx, dy) = direction.delta();

        for (x, y) in [(sx, sy), (ex, ey)] {
            if !self.on_boundary(level, x, y, direction) {
                return Err(UpscaleError::invariant(
                    Stage::Trace,
                    format!("run end ({}, {}) is not on the level {} boundary", x, y, level),
                ));
            }
        }
        if self.on_boundary(level, sx - dx, sy - dy, direction)
            || self.on_boundary(level, ex + dx, ey + dy, direction)
        {
            return Err(UpscaleError::invariant(
                Stage::Trace,
                format!("run from ({}, {}) going {:?} is not maximal", sx, sy, direction),
            ));
        }
        Ok(())
    }
}
