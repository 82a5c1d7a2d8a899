use tracing::{debug, warn};

use crate::coords::{Direction, GridRect, TilePos};
use crate::grid::{Neighbors, WorldData};
use crate::rules::{NeighborMask, RuleTables};
use crate::tile::{AtlasPos, MergeId, Tile, TileType};

/// Half-size of the window whose merge state is cleared around an edit.
pub const MERGE_RESET_RADIUS: i32 = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Resolved(AtlasPos),
    /// A seam neighbor has no merge id yet; retried on the next sweep.
    Deferred,
    /// No rule matched; the tile shows [`AtlasPos::UNMATCHED`].
    Unmatched,
    Empty,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub first_pass_deferred: usize,
    pub resolved: usize,
    pub deferred: usize,
    pub unmatched: usize,
}

pub fn direction_mask(dir: Direction) -> NeighborMask {
    match dir {
        Direction::Top => NeighborMask::TOP,
        Direction::Bottom => NeighborMask::BOTTOM,
        Direction::Left => NeighborMask::LEFT,
        Direction::Right => NeighborMask::RIGHT,
        Direction::TopLeft => NeighborMask::TOP_LEFT,
        Direction::TopRight => NeighborMask::TOP_RIGHT,
        Direction::BottomLeft => NeighborMask::BOTTOM_LEFT,
        Direction::BottomRight => NeighborMask::BOTTOM_RIGHT,
    }
}

/// Whether `other` belongs to the same visual group as `ty`.
pub fn connects(ty: TileType, other: TileType) -> bool {
    ty == other || ty.merges_with(other) || ty.shares_merge_target(other)
}

pub fn block_neighbor_mask(ty: TileType, neighbors: &Neighbors<&Tile>) -> NeighborMask {
    neighbors
        .iter()
        .filter(|(_, tile)| connects(ty, tile.ty))
        .fold(NeighborMask::empty(), |mask, (dir, _)| mask | direction_mask(dir))
}

/// Cardinal neighbors that are the merge target or blend toward the same one.
pub fn compute_merge_id(ty: TileType, neighbors: &Neighbors<&Tile>) -> MergeId {
    let Some(target) = ty.merge_target() else {
        return MergeId::default();
    };
    let mask = neighbors
        .iter()
        .filter(|(dir, tile)| {
            dir.is_cardinal() && (tile.ty == target || ty.shares_merge_target(tile.ty))
        })
        .fold(NeighborMask::empty(), |mask, (dir, _)| mask | direction_mask(dir));
    MergeId::new(mask.bucket() as u8)
}

/// Lower (merge count, type) owns a seam between two tiles sharing a target.
fn owns_seam(ty: TileType, merge_id: MergeId, other: TileType, other_id: MergeId) -> bool {
    (merge_id.count(), ty as u8) < (other_id.count(), other as u8)
}

/// `None` when a seam neighbor is still unresolved.
pub fn blend_mask(ty: TileType, merge_id: MergeId, neighbors: &Neighbors<&Tile>) -> Option<NeighborMask> {
    let Some(target) = ty.merge_target() else {
        return Some(NeighborMask::empty());
    };

    let mut mask = NeighborMask::empty();
    for (dir, tile) in neighbors.iter() {
        if tile.ty == target {
            mask |= direction_mask(dir);
        } else if dir.is_cardinal() && ty.shares_merge_target(tile.ty) {
            let other_id = tile.merge_id?;
            if owns_seam(ty, merge_id, tile.ty, other_id) {
                mask |= direction_mask(dir);
            }
        }
    }
    Some(mask)
}

pub fn resolve_block(data: &mut WorldData, tables: &RuleTables, pos: TilePos) -> Resolution {
    let Some(tile) = data.get_block(pos).copied() else {
        return Resolution::Empty;
    };

    let neighbors = data.get_block_neighbors(pos);
    let mask = block_neighbor_mask(tile.ty, &neighbors);
    let merge_id = compute_merge_id(tile.ty, &neighbors);
    let blend = blend_mask(tile.ty, merge_id, &neighbors);

    let Some(blend) = blend else {
        if let Some(tile) = data.get_block_mut(pos) {
            tile.merge_id = Some(merge_id);
            tile.is_merged = false;
        }
        return Resolution::Deferred;
    };

    let rules = tables.for_tile(tile.ty);
    let mut rule = rules.find(mask, blend);
    if rule.is_none() && tile.ty == TileType::Grass {
        rule = rules.find_relaxed(mask, blend);
    }

    let (atlas_pos, resolution) = match rule {
        Some(rule) => {
            let frame = rule.frame(tile.variant);
            (frame, Resolution::Resolved(frame))
        }
        None => {
            warn!(
                "No {} rule for bucket {} (neighbors {:?}, blend {:?}) at {:?}",
                tile.ty.name(),
                mask.bucket(),
                mask,
                blend,
                pos
            );
            (AtlasPos::UNMATCHED, Resolution::Unmatched)
        }
    };

    if let Some(tile) = data.get_block_mut(pos) {
        tile.merge_id = Some(merge_id);
        tile.is_merged = true;
        tile.atlas_pos = Some(atlas_pos);
    }
    resolution
}

pub fn resolve_wall(data: &mut WorldData, tables: &RuleTables, pos: TilePos) -> Resolution {
    let Some(wall) = data.get_wall(pos).copied() else {
        return Resolution::Empty;
    };

    let mask = data
        .get_wall_neighbors(pos)
        .iter()
        .fold(NeighborMask::empty(), |mask, (dir, _)| mask | direction_mask(dir));

    let (atlas_pos, resolution) = match tables.base.find(mask, NeighborMask::empty()) {
        Some(rule) => {
            let frame = rule.frame(wall.variant);
            (frame, Resolution::Resolved(frame))
        }
        None => {
            warn!("No wall rule for bucket {} at {:?}", mask.bucket(), pos);
            (AtlasPos::UNMATCHED, Resolution::Unmatched)
        }
    };

    if let Some(wall) = data.get_wall_mut(pos) {
        wall.atlas_pos = Some(atlas_pos);
    }
    resolution
}

/// Clears merge state in the window around `center`; returns the clipped window.
pub fn reset_tiles(data: &mut WorldData, center: TilePos, radius: i32) -> GridRect {
    let window = GridRect::around(center, radius).intersect(&data.area);
    for pos in window.positions() {
        if let Some(tile) = data.get_block_mut(pos) {
            tile.reset_merge();
        }
    }
    window
}

fn sweep(data: &mut WorldData, tables: &RuleTables, rect: GridRect) -> ResolveStats {
    let mut stats = ResolveStats::default();
    for pos in rect.positions() {
        match resolve_block(data, tables, pos) {
            Resolution::Resolved(_) => stats.resolved += 1,
            Resolution::Deferred => stats.deferred += 1,
            Resolution::Unmatched => stats.unmatched += 1,
            Resolution::Empty => {}
        }
        if resolve_wall(data, tables, pos) == Resolution::Unmatched {
            stats.unmatched += 1;
        }
    }
    stats
}

/// Two sweeps over `rect`; the second settles every tile the first deferred.
pub fn resolve_region(data: &mut WorldData, tables: &RuleTables, rect: GridRect) -> ResolveStats {
    let rect = rect.intersect(&data.area);
    let first = sweep(data, tables, rect);
    let mut stats = sweep(data, tables, rect);
    stats.first_pass_deferred = first.deferred;

    if stats.deferred > 0 {
        warn!(
            "{} tiles still deferred after two sweeps over {:?}",
            stats.deferred, rect
        );
    }
    stats
}

pub fn resolve_all(data: &mut WorldData, tables: &RuleTables) -> ResolveStats {
    let stats = resolve_region(data, tables, data.area);
    debug!(
        "Autotiled {} tiles ({} deferred on the first sweep, {} unmatched)",
        stats.resolved, stats.first_pass_deferred, stats.unmatched
    );
    stats
}
