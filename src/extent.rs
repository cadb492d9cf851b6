use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Slack used by every float comparison on extents, so rects that merely touch never count as
/// overlapping.
pub const EXTENT_EPSILON: f32 = 1e-4;

/// An axis-aligned rectangle, in either world or room-local space.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Extent {
    pub min: Vec2,
    pub max: Vec2,
}

impl Extent {
    pub fn from_min_and_size(min: Vec2, size: Vec2) -> Self {
        Extent {
            min,
            max: min + size,
        }
    }

    pub fn from_center_and_size(center: Vec2, size: Vec2) -> Self {
        Self::from_min_and_size(center - size / 2.0, size)
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    /// True when there is no room for a point strictly inside.
    pub fn is_empty(&self) -> bool {
        self.max.x <= self.min.x || self.max.y <= self.min.y
    }

    /// Moves every side outward by `amount`. Negative amounts shrink.
    pub fn radial_grow(&self, amount: f32) -> Self {
        Extent {
            min: self.min - Vec2::splat(amount),
            max: self.max + Vec2::splat(amount),
        }
    }

    pub fn translate(&self, by: Vec2) -> Self {
        Extent {
            min: self.min + by,
            max: self.max + by,
        }
    }

    /// Interiors intersect. Shared edges and corners don't count.
    pub fn overlaps(&self, other: &Extent) -> bool {
        self.min.x < other.max.x - EXTENT_EPSILON
            && other.min.x < self.max.x - EXTENT_EPSILON
            && self.min.y < other.max.y - EXTENT_EPSILON
            && other.min.y < self.max.y - EXTENT_EPSILON
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        p.x >= self.min.x - EXTENT_EPSILON
            && p.x <= self.max.x + EXTENT_EPSILON
            && p.y >= self.min.y - EXTENT_EPSILON
            && p.y <= self.max.y + EXTENT_EPSILON
    }

    pub fn contains_extent(&self, other: &Extent) -> bool {
        self.contains_point(other.min) && self.contains_point(other.max)
    }
}

/// All index pairs `(i, j)`, `i < j`, whose extents overlap.
pub fn overlapping_pairs(extents: &[Extent]) -> Vec<(usize, usize)> {
    // PERF: N^2, but a level only has a few dozen rooms and corridors.
    let mut pairs = Vec::new();
    for i in 0..extents.len() {
        for j in i + 1..extents.len() {
            if extents[i].overlaps(&extents[j]) {
                pairs.push((i, j));
            }
        }
    }

    pairs
}

/// Quarter turns, counter-clockwise.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Rotation {
    R0,
    R90,
    R180,
    R270,
}

pub const ALL_ROTATIONS: [Rotation; 4] =
    [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270];

impl Rotation {
    pub fn degrees(self) -> f32 {
        match self {
            Rotation::R0 => 0.0,
            Rotation::R90 => 90.0,
            Rotation::R180 => 180.0,
            Rotation::R270 => 270.0,
        }
    }

    /// The axis-aligned size of a `size` footprint after this rotation.
    pub fn rotate_extents(self, size: Vec2) -> Vec2 {
        match self {
            Rotation::R0 | Rotation::R180 => size,
            Rotation::R90 | Rotation::R270 => Vec2::new(size.y, size.x),
        }
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Rotation::R0
    }
}

/// One of the four walls of a room, which is also one of the four grid neighbors of its cell.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

pub const ALL_SIDES: [Side; 4] = [Side::Top, Side::Bottom, Side::Left, Side::Right];

impl Side {
    pub fn negate(self) -> Self {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn grid_offset(self) -> IVec2 {
        match self {
            Side::Top => IVec2::new(0, 1),
            Side::Bottom => IVec2::new(0, -1),
            Side::Left => IVec2::new(-1, 0),
            Side::Right => IVec2::new(1, 0),
        }
    }

    pub fn from_grid_offset(offset: IVec2) -> Option<Self> {
        ALL_SIDES
            .iter()
            .copied()
            .find(|s| s.grid_offset() == offset)
    }

    pub fn outward(self) -> Vec2 {
        self.grid_offset().as_vec2()
    }

    pub fn inward(self) -> Vec2 {
        -self.outward()
    }

    /// Top and bottom walls run along x.
    pub fn is_horizontal(self) -> bool {
        matches!(self, Side::Top | Side::Bottom)
    }

    /// Rotation of something mounted on this wall and facing into the room.
    pub fn facing_rotation(self) -> Rotation {
        match self {
            Side::Bottom => Rotation::R0,
            Side::Right => Rotation::R90,
            Side::Top => Rotation::R180,
            Side::Left => Rotation::R270,
        }
    }
}
