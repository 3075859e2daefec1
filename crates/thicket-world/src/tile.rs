//! Tile coordinates, rectangles, directions and room geometry.
//!
//! The world is a grid of tiles grouped into equally sized rooms. A room is
//! identified by the integer quotient of a tile position by the room size.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// TilePos
// ---------------------------------------------------------------------------

/// A tile position on the world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring tile in `dir`.
    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// TileRect
// ---------------------------------------------------------------------------

/// A half-open rectangle of tiles: `x0 <= x < x1`, `y0 <= y < y1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl TileRect {
    pub const fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> u32 {
        extent(self.x0, self.x1)
    }

    pub fn height(&self) -> u32 {
        extent(self.y0, self.y1)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn contains(&self, tile: TilePos) -> bool {
        tile.x >= self.x0 && tile.x < self.x1 && tile.y >= self.y0 && tile.y < self.y1
    }

    /// The tile at offset `(dx, dy)` from the top-left corner.
    pub fn offset(&self, dx: u32, dy: u32) -> TilePos {
        TilePos::new(self.x0.wrapping_add_unsigned(dx), self.y0.wrapping_add_unsigned(dy))
    }
}

/// Length of the half-open span `lo..hi`; zero when inverted.
fn extent(lo: i32, hi: i32) -> u32 {
    if hi > lo {
        hi.abs_diff(lo)
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// One of the four grid directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Unit offset, with y growing southward.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
        }
    }

    /// The direction from `from` to `to` when both lie on one row or column.
    pub fn toward(from: TilePos, to: TilePos) -> Option<Self> {
        match (to.x - from.x, to.y - from.y) {
            (0, 0) => None,
            (0, dy) if dy < 0 => Some(Direction::North),
            (0, _) => Some(Direction::South),
            (dx, 0) if dx > 0 => Some(Direction::East),
            (_, 0) => Some(Direction::West),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

/// Identifies a room by its column and row on the room grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId {
    pub col: i32,
    pub row: i32,
}

/// Size of every room in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomGeometry {
    pub width: u32,
    pub height: u32,
}

impl Default for RoomGeometry {
    fn default() -> Self {
        Self {
            width: 20,
            height: 12,
        }
    }
}

impl RoomGeometry {
    /// Whether both dimensions are at least one tile.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// The room containing `tile`. Negative coordinates round toward negative
    /// infinity so rooms never straddle the origin. A zero dimension is
    /// treated as one tile.
    pub fn room_of(&self, tile: TilePos) -> RoomId {
        RoomId {
            col: tile.x.div_euclid(divisor(self.width)),
            row: tile.y.div_euclid(divisor(self.height)),
        }
    }

    /// Whether `a` and `b` are closer than one room size on both axes.
    pub fn within_room_window(&self, a: TilePos, b: TilePos) -> bool {
        a.x.abs_diff(b.x) < self.width && a.y.abs_diff(b.y) < self.height
    }
}

fn divisor(size: u32) -> i32 {
    i32::try_from(size).unwrap_or(i32::MAX).max(1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
