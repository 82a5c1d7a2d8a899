use serde::{Deserialize, Serialize};

use crate::coords::TilePos;

/// Number of sprite variants per autotile frame.
pub const TILE_VARIANTS: u8 = 3;

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TileType {
    Dirt,
    Stone,
    Grass,
    Wood,
}

impl TileType {
    pub const ALL: [TileType; 4] = [TileType::Dirt, TileType::Stone, TileType::Grass, TileType::Wood];

    /// The type this tile blends toward at its edges.
    pub fn merge_target(self) -> Option<TileType> {
        match self {
            TileType::Grass | TileType::Stone => Some(TileType::Dirt),
            TileType::Dirt | TileType::Wood => None,
        }
    }

    /// Symmetric: true when either side is the other's merge target.
    pub fn merges_with(self, other: TileType) -> bool {
        self.merge_target() == Some(other) || other.merge_target() == Some(self)
    }

    pub fn shares_merge_target(self, other: TileType) -> bool {
        self != other && self.merge_target().is_some() && self.merge_target() == other.merge_target()
    }

    pub fn max_hp(self) -> i16 {
        match self {
            TileType::Dirt | TileType::Grass => 50,
            TileType::Wood => 80,
            TileType::Stone => 100,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TileType::Dirt => "dirt",
            TileType::Stone => "stone",
            TileType::Grass => "grass",
            TileType::Wood => "wood",
        }
    }
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WallType {
    Dirt,
    Stone,
    Wood,
}

impl WallType {
    pub fn max_hp(self) -> i16 {
        match self {
            WallType::Dirt => 30,
            WallType::Wood => 50,
            WallType::Stone => 60,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WallType::Dirt => "dirt_wall",
            WallType::Stone => "stone_wall",
            WallType::Wood => "wood_wall",
        }
    }
}

/// Cell of the sprite atlas, in frame units.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AtlasPos {
    pub x: u16,
    pub y: u16,
}

impl AtlasPos {
    /// Rendered when no rule of a table matches.
    pub const UNMATCHED: AtlasPos = AtlasPos::new(0, 22);

    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

/// 4-bit code of cardinal neighbors that are merge-capable toward a tile.
/// Bit layout matches the autotile bucket index: right=1, top=2, left=4, bottom=8.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergeId(u8);

impl MergeId {
    pub const RIGHT: u8 = 1;
    pub const TOP: u8 = 2;
    pub const LEFT: u8 = 4;
    pub const BOTTOM: u8 = 8;

    pub fn new(bits: u8) -> Self {
        Self(bits & 0x0F)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn count(self) -> u32 {
        self.0.count_ones()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub ty: TileType,
    pub hp: i16,
    pub variant: u8,
    pub atlas_pos: Option<AtlasPos>,
    pub merge_id: Option<MergeId>,
    pub is_merged: bool,
}

impl Tile {
    pub fn new(ty: TileType, variant: u8) -> Self {
        Self {
            ty,
            hp: ty.max_hp(),
            variant: variant % TILE_VARIANTS,
            atlas_pos: None,
            merge_id: None,
            is_merged: false,
        }
    }

    /// Clears merge state so the next resolve starts from scratch.
    pub fn reset_merge(&mut self) {
        self.merge_id = None;
        self.is_merged = false;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wall {
    pub ty: WallType,
    pub hp: i16,
    pub variant: u8,
    pub atlas_pos: Option<AtlasPos>,
}

impl Wall {
    pub fn new(ty: WallType, variant: u8) -> Self {
        Self {
            ty,
            hp: ty.max_hp(),
            variant: variant % TILE_VARIANTS,
            atlas_pos: None,
        }
    }
}

/// Deterministic sprite variant for a position.
pub fn variant_at(seed: u64, pos: TilePos) -> u8 {
    let hash = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add((pos.x as i64 as u64).wrapping_mul(2654435761))
        .wrapping_add((pos.y as i64 as u64).wrapping_mul(40503));

    ((hash >> 16) % u64::from(TILE_VARIANTS)) as u8
}

#[cfg(test)]
mod tests {
    use super::{variant_at, MergeId, Tile, TileType, TILE_VARIANTS};
    use crate::coords::TilePos;

    #[test]
    fn merge_relations_are_symmetric() {
        for a in TileType::ALL {
            for b in TileType::ALL {
                assert_eq!(a.merges_with(b), b.merges_with(a), "{a:?} vs {b:?}");
                assert_eq!(a.shares_merge_target(b), b.shares_merge_target(a));
            }
        }
        assert!(TileType::Grass.merges_with(TileType::Dirt));
        assert!(TileType::Grass.shares_merge_target(TileType::Stone));
        assert!(!TileType::Wood.merges_with(TileType::Dirt));
        assert!(!TileType::Stone.shares_merge_target(TileType::Stone));
    }

    #[test]
    fn variants_are_deterministic_and_in_range() {
        let mut seen = [false; TILE_VARIANTS as usize];
        for x in 0..64 {
            let pos = TilePos::new(x, x * 3 - 7);
            let variant = variant_at(42, pos);
            assert!(variant < TILE_VARIANTS);
            assert_eq!(variant, variant_at(42, pos));
            seen[variant as usize] = true;
        }
        assert!(seen.iter().all(|hit| *hit));
    }

    #[test]
    fn new_tile_starts_unresolved_with_full_hp() {
        let tile = Tile::new(TileType::Stone, 5);
        assert_eq!(tile.hp, TileType::Stone.max_hp());
        assert_eq!(tile.variant, 2);
        assert!(tile.atlas_pos.is_none());
        assert!(tile.merge_id.is_none());
        assert!(!tile.is_merged);
        assert_eq!(MergeId::new(0xFF).bits(), 0x0F);
    }
}
