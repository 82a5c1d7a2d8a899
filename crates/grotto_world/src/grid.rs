use serde::{Deserialize, Serialize};

use crate::coords::{Direction, GridRect, TilePos};
use crate::error::WorldGenError;
use crate::tile::{variant_at, Tile, TileType, Wall, WallType};

/// Smallest playable extent accepted on either axis.
pub const MIN_PLAYABLE_SIZE: i32 = 32;
/// Largest accepted width or height, keeping the light grid within `i32` cells.
pub const MAX_WORLD_SIZE: i32 = 16_384;

/// Horizontal bands every generation pass keys off. Values are rows.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layers {
    pub surface: i32,
    pub underground: i32,
    pub cavern: i32,
    pub dirt_height: i32,
}

impl Layers {
    pub fn for_playable(playable: &GridRect) -> Self {
        let top = playable.top();
        let height = playable.height;
        let surface = top + height / 5;
        let dirt_height = (height / 10).max(4);
        let underground = surface + dirt_height;
        let cavern = (underground + height / 4).min(playable.bottom() - 1);

        Self {
            surface,
            underground,
            cavern,
            dirt_height,
        }
    }
}

/// The eight neighbors of a cell, indexed by [`Direction`].
#[derive(Debug)]
pub struct Neighbors<T> {
    slots: [Option<T>; 8],
}

impl<T> Neighbors<T> {
    fn empty() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    pub fn get(&self, dir: Direction) -> Option<&T> {
        self.slots[dir.slot()].as_ref()
    }

    pub fn get_mut(&mut self, dir: Direction) -> Option<&mut T> {
        self.slots[dir.slot()].as_mut()
    }

    pub fn take(&mut self, dir: Direction) -> Option<T> {
        self.slots[dir.slot()].take()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Direction, &T)> {
        Direction::ALL
            .into_iter()
            .filter_map(|dir| self.get(dir).map(|value| (dir, value)))
    }

    pub fn count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

#[derive(Clone, Debug)]
pub struct WorldData {
    pub area: GridRect,
    pub playable_area: GridRect,
    pub layers: Layers,
    pub spawn_point: TilePos,
    pub seed: u64,
    tiles: Box<[Option<Tile>]>,
    walls: Box<[Option<Wall>]>,
}

impl WorldData {
    pub fn new(width: u32, height: u32, margin: i32, seed: u64) -> Result<Self, WorldGenError> {
        let invalid = WorldGenError::InvalidDimensions { width, height };
        let w = i32::try_from(width).map_err(|_| invalid.clone())?;
        let h = i32::try_from(height).map_err(|_| invalid.clone())?;
        let margin = margin.max(0);
        if w > MAX_WORLD_SIZE || h > MAX_WORLD_SIZE {
            return Err(invalid);
        }
        if w - margin * 2 < MIN_PLAYABLE_SIZE || h - margin * 2 < MIN_PLAYABLE_SIZE {
            return Err(invalid);
        }

        let area = GridRect::new(0, 0, w, h);
        let playable_area = GridRect::new(margin, margin, w - margin * 2, h - margin * 2);
        let cells = area.area();
        let layers = Layers::for_playable(&playable_area);

        Ok(Self {
            area,
            playable_area,
            layers,
            spawn_point: TilePos::new(playable_area.x + playable_area.width / 2, layers.surface - 1),
            seed,
            tiles: vec![None; cells].into_boxed_slice(),
            walls: vec![None; cells].into_boxed_slice(),
        })
    }

    pub fn width(&self) -> i32 {
        self.area.width
    }

    pub fn height(&self) -> i32 {
        self.area.height
    }

    pub fn index(&self, pos: TilePos) -> Option<usize> {
        if !self.area.contains(pos) {
            return None;
        }
        Some(pos.y as usize * self.area.width as usize + pos.x as usize)
    }

    pub fn get_block(&self, pos: TilePos) -> Option<&Tile> {
        self.index(pos).and_then(|index| self.tiles[index].as_ref())
    }

    pub fn get_block_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        self.index(pos).and_then(|index| self.tiles[index].as_mut())
    }

    pub fn get_wall(&self, pos: TilePos) -> Option<&Wall> {
        self.index(pos).and_then(|index| self.walls[index].as_ref())
    }

    pub fn get_wall_mut(&mut self, pos: TilePos) -> Option<&mut Wall> {
        self.index(pos).and_then(|index| self.walls[index].as_mut())
    }

    pub fn block_exists(&self, pos: TilePos) -> bool {
        self.get_block(pos).is_some()
    }

    pub fn wall_exists(&self, pos: TilePos) -> bool {
        self.get_wall(pos).is_some()
    }

    pub fn block_type(&self, pos: TilePos) -> Option<TileType> {
        self.get_block(pos).map(|tile| tile.ty)
    }

    /// Places a fresh tile; returns false when `pos` is outside the grid.
    pub fn place_block(&mut self, pos: TilePos, ty: TileType) -> bool {
        let variant = variant_at(self.seed, pos);
        let Some(index) = self.index(pos) else {
            return false;
        };
        self.tiles[index] = Some(Tile::new(ty, variant));
        true
    }

    pub fn take_block(&mut self, pos: TilePos) -> Option<Tile> {
        let index = self.index(pos)?;
        self.tiles[index].take()
    }

    pub fn place_wall(&mut self, pos: TilePos, ty: WallType) -> bool {
        let variant = variant_at(self.seed.rotate_left(17), pos);
        let Some(index) = self.index(pos) else {
            return false;
        };
        self.walls[index] = Some(Wall::new(ty, variant));
        true
    }

    pub fn take_wall(&mut self, pos: TilePos) -> Option<Wall> {
        let index = self.index(pos)?;
        self.walls[index].take()
    }

    /// Fills rows `y_start..y_end` of column `x` with `ty`.
    pub fn fill_line_vertical(&mut self, x: i32, y_start: i32, y_end: i32, ty: TileType) {
        for y in y_start..y_end {
            self.place_block(TilePos::new(x, y), ty);
        }
    }

    pub fn fill_rect_walls(&mut self, rect: GridRect, ty: WallType) {
        for pos in rect.intersect(&self.area).positions() {
            self.place_wall(pos, ty);
        }
    }

    pub fn get_block_neighbors(&self, pos: TilePos) -> Neighbors<&Tile> {
        let mut neighbors = Neighbors::empty();
        for dir in Direction::ALL {
            neighbors.slots[dir.slot()] = self.get_block(pos.offset(dir));
        }
        neighbors
    }

    pub fn get_wall_neighbors(&self, pos: TilePos) -> Neighbors<&Wall> {
        let mut neighbors = Neighbors::empty();
        for dir in Direction::ALL {
            neighbors.slots[dir.slot()] = self.get_wall(pos.offset(dir));
        }
        neighbors
    }

    pub fn get_block_neighbors_mut(&mut self, pos: TilePos) -> Neighbors<&mut Tile> {
        let width = self.area.width as usize;
        neighbors_mut(&mut self.tiles, width, self.area, pos)
    }

    pub fn get_wall_neighbors_mut(&mut self, pos: TilePos) -> Neighbors<&mut Wall> {
        let width = self.area.width as usize;
        neighbors_mut(&mut self.walls, width, self.area, pos)
    }

    /// True when any of the eight neighbors inside the playable area is empty.
    pub fn is_exposed(&self, pos: TilePos) -> bool {
        Direction::ALL.into_iter().any(|dir| {
            let next = pos.offset(dir);
            self.playable_area.contains(next) && !self.block_exists(next)
        })
    }

    pub fn count_blocks(&self, ty: TileType) -> usize {
        self.tiles
            .iter()
            .filter(|tile| tile.map(|tile| tile.ty) == Some(ty))
            .count()
    }

    pub fn count_walls(&self) -> usize {
        self.walls.iter().filter(|wall| wall.is_some()).count()
    }
}

/// Borrows the 3x3 window row by row so each neighbor gets its own `&mut`.
fn neighbors_mut<T>(
    cells: &mut [Option<T>],
    width: usize,
    area: GridRect,
    pos: TilePos,
) -> Neighbors<&mut T> {
    let mut neighbors = Neighbors::empty();
    let first_row = (pos.y - 1).max(0);
    let last_row = (pos.y + 1).min(area.bottom() - 1);
    if first_row > last_row {
        return neighbors;
    }

    let rows = cells
        .chunks_exact_mut(width)
        .enumerate()
        .skip(first_row as usize)
        .take((last_row - first_row + 1) as usize);

    for (row_y, row) in rows {
        let dy = row_y as i32 - pos.y;
        let first_col = (pos.x - 1).max(0);
        let last_col = (pos.x + 1).min(area.right() - 1);
        if first_col > last_col {
            continue;
        }
        let window = row
            .iter_mut()
            .enumerate()
            .skip(first_col as usize)
            .take((last_col - first_col + 1) as usize);
        for (col_x, cell) in window {
            let dx = col_x as i32 - pos.x;
            if let Some(dir) = Direction::from_offset(dx, dy) {
                neighbors.slots[dir.slot()] = cell.as_mut();
            }
        }
    }

    neighbors
}

#[cfg(test)]
mod tests {
    use super::{WorldData, MAX_WORLD_SIZE, MIN_PLAYABLE_SIZE};
    use crate::coords::{Direction, GridRect, TilePos};
    use crate::error::WorldGenError;
    use crate::tile::{TileType, WallType};

    fn empty_world() -> WorldData {
        WorldData::new(64, 64, 4, 7).expect("valid dimensions")
    }

    #[test]
    fn rejects_dimensions_that_leave_no_playable_area() {
        assert_eq!(
            WorldData::new(0, 100, 4, 0).unwrap_err(),
            WorldGenError::InvalidDimensions { width: 0, height: 100 }
        );
        let too_small = (MIN_PLAYABLE_SIZE + 7) as u32;
        assert!(WorldData::new(too_small, 100, 4, 0).is_err());
        assert!(WorldData::new(too_small + 1, 100, 4, 0).is_ok());
    }

    #[test]
    fn rejects_worlds_too_large_for_the_light_grid() {
        let too_large = MAX_WORLD_SIZE as u32 + 1;
        assert_eq!(
            WorldData::new(too_large, 64, 4, 0).unwrap_err(),
            WorldGenError::InvalidDimensions { width: too_large, height: 64 }
        );
        assert!(WorldData::new(64, 40_000, 4, 0).is_err());
        assert!(WorldData::new(u32::MAX, 64, 4, 0).is_err());
    }

    #[test]
    fn playable_area_is_inset_by_margin() {
        let world = empty_world();
        assert_eq!(world.area, GridRect::new(0, 0, 64, 64));
        assert_eq!(world.playable_area, GridRect::new(4, 4, 56, 56));
        let layers = world.layers;
        assert!(layers.surface < layers.underground);
        assert!(layers.underground < layers.cavern);
        assert_eq!(layers.underground - layers.surface, layers.dirt_height);
    }

    #[test]
    fn out_of_range_access_reports_absent() {
        let mut world = empty_world();
        for pos in [TilePos::new(-1, 0), TilePos::new(0, -1), TilePos::new(64, 3), TilePos::new(3, 64)] {
            assert!(world.index(pos).is_none());
            assert!(!world.block_exists(pos));
            assert!(world.get_block_mut(pos).is_none());
            assert!(!world.place_block(pos, TileType::Dirt));
            assert!(world.take_wall(pos).is_none());
        }
    }

    #[test]
    fn place_and_take_round_trip() {
        let mut world = empty_world();
        let pos = TilePos::new(10, 12);
        assert!(world.place_block(pos, TileType::Stone));
        assert!(world.place_wall(pos, WallType::Stone));
        assert_eq!(world.block_type(pos), Some(TileType::Stone));
        assert!(world.wall_exists(pos));

        let tile = world.take_block(pos).expect("tile was placed");
        assert_eq!(tile.ty, TileType::Stone);
        assert!(!world.block_exists(pos));
        assert!(world.wall_exists(pos));
    }

    #[test]
    fn neighbor_lookup_matches_directions() {
        let mut world = empty_world();
        let center = TilePos::new(20, 20);
        world.place_block(center.offset(Direction::Top), TileType::Dirt);
        world.place_block(center.offset(Direction::BottomRight), TileType::Stone);

        let neighbors = world.get_block_neighbors(center);
        assert_eq!(neighbors.count(), 2);
        assert_eq!(neighbors.get(Direction::Top).map(|t| t.ty), Some(TileType::Dirt));
        assert_eq!(neighbors.get(Direction::BottomRight).map(|t| t.ty), Some(TileType::Stone));
        assert!(neighbors.get(Direction::Left).is_none());
    }

    #[test]
    fn mutable_neighbors_are_disjoint_and_clipped_at_edges() {
        let mut world = empty_world();
        let corner = TilePos::new(0, 0);
        for dir in Direction::ALL {
            world.place_block(corner.offset(dir), TileType::Dirt);
        }

        let mut neighbors = world.get_block_neighbors_mut(corner);
        assert_eq!(neighbors.count(), 3);
        for dir in [Direction::Right, Direction::Bottom, Direction::BottomRight] {
            neighbors.get_mut(dir).expect("in-bounds neighbor").hp = 1;
        }
        drop(neighbors);

        assert_eq!(world.get_block(TilePos::new(1, 0)).map(|t| t.hp), Some(1));
        assert_eq!(world.get_block(TilePos::new(1, 1)).map(|t| t.hp), Some(1));
        assert!(world.get_block(corner).is_none());
    }

    #[test]
    fn exposure_ignores_the_margin() {
        let mut world = empty_world();
        let playable = world.playable_area;
        for pos in playable.positions() {
            world.place_block(pos, TileType::Dirt);
        }
        let edge = TilePos::new(playable.x, playable.y + 5);
        assert!(!world.is_exposed(edge));

        let inner = TilePos::new(30, 30);
        world.take_block(inner.offset(Direction::TopLeft));
        assert!(world.is_exposed(inner));
    }
}
