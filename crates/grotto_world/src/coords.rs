use std::ops::{Add, AddAssign, Sub, SubAssign};

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Edge length of one tile in world pixels.
pub const TILE_SIZE: f32 = 16.0;

/// Grid coordinate of a tile. Row 0 is the top of the world.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Top,
        Direction::Bottom,
        Direction::Left,
        Direction::Right,
        Direction::TopLeft,
        Direction::TopRight,
        Direction::BottomLeft,
        Direction::BottomRight,
    ];

    pub const CARDINALS: [Direction; 4] = [
        Direction::Top,
        Direction::Bottom,
        Direction::Left,
        Direction::Right,
    ];

    pub fn offset(self) -> IVec2 {
        match self {
            Direction::Top => IVec2::new(0, -1),
            Direction::Bottom => IVec2::new(0, 1),
            Direction::Left => IVec2::new(-1, 0),
            Direction::Right => IVec2::new(1, 0),
            Direction::TopLeft => IVec2::new(-1, -1),
            Direction::TopRight => IVec2::new(1, -1),
            Direction::BottomLeft => IVec2::new(-1, 1),
            Direction::BottomRight => IVec2::new(1, 1),
        }
    }

    pub fn from_offset(dx: i32, dy: i32) -> Option<Direction> {
        Direction::ALL
            .into_iter()
            .find(|dir| dir.offset() == IVec2::new(dx, dy))
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Top => Direction::Bottom,
            Direction::Bottom => Direction::Top,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::TopLeft => Direction::BottomRight,
            Direction::TopRight => Direction::BottomLeft,
            Direction::BottomLeft => Direction::TopRight,
            Direction::BottomRight => Direction::TopLeft,
        }
    }

    pub fn is_cardinal(self) -> bool {
        matches!(
            self,
            Direction::Top | Direction::Bottom | Direction::Left | Direction::Right
        )
    }

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dir: Direction) -> TilePos {
        let delta = dir.offset();
        TilePos::new(self.x + delta.x, self.y + delta.y)
    }

    /// Top-left corner of the tile in world pixels.
    pub fn to_world(self) -> Vec2 {
        Vec2::new(self.x as f32 * TILE_SIZE, self.y as f32 * TILE_SIZE)
    }

    pub fn from_world(world: Vec2) -> TilePos {
        TilePos::new(
            (world.x / TILE_SIZE).floor() as i32,
            (world.y / TILE_SIZE).floor() as i32,
        )
    }

    pub fn as_ivec2(self) -> IVec2 {
        IVec2::new(self.x, self.y)
    }
}

impl From<IVec2> for TilePos {
    fn from(value: IVec2) -> Self {
        TilePos::new(value.x, value.y)
    }
}

impl Add<IVec2> for TilePos {
    type Output = TilePos;

    fn add(self, rhs: IVec2) -> Self::Output {
        TilePos::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign<IVec2> for TilePos {
    fn add_assign(&mut self, rhs: IVec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for TilePos {
    type Output = IVec2;

    fn sub(self, rhs: Self) -> Self::Output {
        IVec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign<IVec2> for TilePos {
    fn sub_assign(&mut self, rhs: IVec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

/// Axis-aligned rectangle on an integer grid; used for tile areas and for
/// light-cell regions alike.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl GridRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn around(center: TilePos, radius: i32) -> Self {
        Self::new(
            center.x - radius,
            center.y - radius,
            radius * 2 + 1,
            radius * 2 + 1,
        )
    }

    pub fn left(&self) -> i32 {
        self.x
    }

    pub fn top(&self) -> i32 {
        self.y
    }

    /// Exclusive.
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn area(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.width as usize * self.height as usize
        }
    }

    pub fn contains(&self, pos: TilePos) -> bool {
        pos.x >= self.x && pos.y >= self.y && pos.x < self.right() && pos.y < self.bottom()
    }

    pub fn expand(&self, amount: i32) -> GridRect {
        GridRect::new(
            self.x - amount,
            self.y - amount,
            self.width + amount * 2,
            self.height + amount * 2,
        )
    }

    pub fn intersect(&self, other: &GridRect) -> GridRect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        GridRect::new(x, y, (right - x).max(0), (bottom - y).max(0))
    }

    pub fn overlaps(&self, other: &GridRect) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Row-major walk over every position inside the rectangle.
    pub fn positions(&self) -> impl Iterator<Item = TilePos> {
        let rect = *self;
        (rect.y..rect.bottom())
            .flat_map(move |y| (rect.x..rect.right()).map(move |x| TilePos::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use glam::{IVec2, Vec2};

    use super::{Direction, GridRect, TilePos, TILE_SIZE};

    #[test]
    fn direction_offsets_are_unique_and_reversible() {
        for dir in Direction::ALL {
            let offset = dir.offset();
            assert_eq!(Direction::from_offset(offset.x, offset.y), Some(dir));
            assert_eq!(dir.opposite().offset(), -offset);
        }
        assert_eq!(Direction::from_offset(0, 0), None);
        assert_eq!(Direction::CARDINALS.iter().filter(|d| d.is_cardinal()).count(), 4);
    }

    #[test]
    fn tile_pos_offsets_follow_screen_orientation() {
        let pos = TilePos::new(5, 5);
        assert_eq!(pos.offset(Direction::Top), TilePos::new(5, 4));
        assert_eq!(pos.offset(Direction::BottomRight), TilePos::new(6, 6));
        assert_eq!(pos + IVec2::new(-2, 3), TilePos::new(3, 8));
        assert_eq!(TilePos::new(7, 1) - TilePos::new(2, 4), IVec2::new(5, -3));
    }

    #[test]
    fn world_conversion_floors_into_tiles() {
        let pos = TilePos::new(3, -2);
        assert_eq!(pos.to_world(), Vec2::new(3.0 * TILE_SIZE, -2.0 * TILE_SIZE));
        assert_eq!(TilePos::from_world(pos.to_world() + Vec2::splat(TILE_SIZE - 0.5)), pos);
        assert_eq!(TilePos::from_world(Vec2::new(-0.5, 0.5)), TilePos::new(-1, 0));
    }

    #[test]
    fn rect_intersection_and_containment() {
        let a = GridRect::new(0, 0, 10, 10);
        let b = GridRect::new(8, -2, 5, 5);
        assert_eq!(a.intersect(&b), GridRect::new(8, 0, 2, 3));
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&GridRect::new(10, 0, 2, 2)));
        assert!(a.contains(TilePos::new(9, 9)));
        assert!(!a.contains(TilePos::new(10, 9)));
        assert_eq!(GridRect::around(TilePos::new(4, 4), 2), GridRect::new(2, 2, 5, 5));
        assert_eq!(a.expand(1).area(), 144);
        assert_eq!(GridRect::new(0, 0, 3, 2).positions().count(), 6);
    }
}
