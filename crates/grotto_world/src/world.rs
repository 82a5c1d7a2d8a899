use std::sync::Arc;
use std::time::Instant;

use grotto_core::JobSystem;
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::autotile::{self, MERGE_RESET_RADIUS};
use crate::config::{LightingConfig, WorldConfig};
use crate::coords::{GridRect, TilePos};
use crate::error::WorldError;
use crate::grid::{Layers, Neighbors, WorldData};
use crate::lighting::{
    Light, LightBackend, LightMap, LightRegion, LightTaskId, LightTaskQueue,
    LIGHT_AIR_DECAY_STEPS,
};
use crate::rules::RuleTables;
use crate::tile::{Tile, TileType, Wall, WallType};
use crate::worldgen::WorldGenerator;

/// Owns the grid, its light map and the lighting backend. Every edit goes
/// through here so merge state, atlas frames and light stay consistent.
pub struct World {
    data: WorldData,
    tables: &'static RuleTables,
    light_map: LightMap,
    backend: LightBackend,
    light_tasks: LightTaskQueue,
    lights: Vec<Light>,
    lit_last_frame: Vec<GridRect>,
    dirty_light: Vec<GridRect>,
    changed: FxHashSet<TilePos>,
}

impl World {
    pub fn generate(width: u32, height: u32, seed: u64) -> Result<Self, WorldError> {
        Self::generate_with(width, height, seed, &WorldConfig::default())
    }

    pub fn generate_with(
        width: u32,
        height: u32,
        seed: u64,
        config: &WorldConfig,
    ) -> Result<Self, WorldError> {
        let data = WorldGenerator::with_config(seed, config.generation.clone()).generate(width, height)?;
        Self::from_data(data, &config.lighting)
    }

    /// Autotiles and lights an already populated grid.
    pub fn from_data(mut data: WorldData, lighting: &LightingConfig) -> Result<Self, WorldError> {
        let started = Instant::now();
        let lighting = lighting.clone().sanitize();
        let tables = RuleTables::global();

        let stats = autotile::resolve_all(&mut data, tables);

        let jobs = Arc::new(JobSystem::named(Some(lighting.workers), "grotto-light")?);
        let backend = LightBackend::select(lighting.backend, &jobs);
        let mut light_map = LightMap::new(&data, lighting.ambient);
        backend.resolve_full(&mut light_map, &[]);

        info!(
            "World ready in {:.2?}: {} tiles autotiled, {} light backend, {:.0}% lit",
            started.elapsed(),
            stats.resolved,
            backend.name(),
            light_map.coverage() * 100.0
        );

        Ok(Self {
            data,
            tables,
            light_map,
            backend,
            light_tasks: LightTaskQueue::new(jobs),
            lights: Vec::new(),
            lit_last_frame: Vec::new(),
            dirty_light: Vec::new(),
            changed: FxHashSet::default(),
        })
    }

    pub fn data(&self) -> &WorldData {
        &self.data
    }

    pub fn light_map(&self) -> &LightMap {
        &self.light_map
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn spawn_point(&self) -> TilePos {
        self.data.spawn_point
    }

    pub fn layers(&self) -> Layers {
        self.data.layers
    }

    pub fn area(&self) -> GridRect {
        self.data.area
    }

    pub fn playable_area(&self) -> GridRect {
        self.data.playable_area
    }

    pub fn block_exists(&self, pos: TilePos) -> bool {
        self.data.block_exists(pos)
    }

    pub fn wall_exists(&self, pos: TilePos) -> bool {
        self.data.wall_exists(pos)
    }

    pub fn get_block(&self, pos: TilePos) -> Option<&Tile> {
        self.data.get_block(pos)
    }

    pub fn get_block_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        self.data.get_block_mut(pos)
    }

    pub fn get_wall(&self, pos: TilePos) -> Option<&Wall> {
        self.data.get_wall(pos)
    }

    pub fn get_wall_mut(&mut self, pos: TilePos) -> Option<&mut Wall> {
        self.data.get_wall_mut(pos)
    }

    pub fn get_block_neighbors(&self, pos: TilePos) -> Neighbors<&Tile> {
        self.data.get_block_neighbors(pos)
    }

    pub fn get_block_neighbors_mut(&mut self, pos: TilePos) -> Neighbors<&mut Tile> {
        self.data.get_block_neighbors_mut(pos)
    }

    pub fn get_wall_neighbors(&self, pos: TilePos) -> Neighbors<&Wall> {
        self.data.get_wall_neighbors(pos)
    }

    pub fn get_wall_neighbors_mut(&mut self, pos: TilePos) -> Neighbors<&mut Wall> {
        self.data.get_wall_neighbors_mut(pos)
    }

    /// Returns false when `pos` is outside the world.
    pub fn set_block(&mut self, pos: TilePos, ty: TileType) -> bool {
        if !self.data.place_block(pos, ty) {
            return false;
        }
        self.after_edit(pos);
        true
    }

    pub fn remove_block(&mut self, pos: TilePos) -> Option<Tile> {
        let removed = self.data.take_block(pos)?;
        self.after_edit(pos);
        Some(removed)
    }

    pub fn set_wall(&mut self, pos: TilePos, ty: WallType) -> bool {
        if !self.data.place_wall(pos, ty) {
            return false;
        }
        self.after_edit(pos);
        true
    }

    pub fn remove_wall(&mut self, pos: TilePos) -> Option<Wall> {
        let removed = self.data.take_wall(pos)?;
        self.after_edit(pos);
        Some(removed)
    }

    /// Damages a tile; returns it once its hit points run out.
    pub fn hit_block(&mut self, pos: TilePos, damage: i16) -> Option<Tile> {
        let tile = self.data.get_block_mut(pos)?;
        tile.hp = tile.hp.saturating_sub(damage.max(0));
        if tile.hp > 0 {
            return None;
        }
        self.remove_block(pos)
    }

    // Merge reset, re-resolve, light mask refresh, dirty rect. In that order.
    fn after_edit(&mut self, pos: TilePos) {
        let window = autotile::reset_tiles(&mut self.data, pos, MERGE_RESET_RADIUS);
        autotile::resolve_region(&mut self.data, self.tables, window);

        let cells = self.light_map.refresh_tile(&self.data, pos);
        self.dirty_light.push(cells.expand(LIGHT_AIR_DECAY_STEPS));
        self.changed.extend(window.positions());
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn clear_lights(&mut self) {
        self.lights.clear();
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Recomputes edited areas, last frame's lights (so removed ones fade)
    /// and this frame's lights. Returns the number of regions updated.
    pub fn update_lighting(&mut self) -> usize {
        let current: Vec<GridRect> = self.lights.iter().map(Light::influence).collect();
        let mut rects = std::mem::take(&mut self.dirty_light);
        rects.append(&mut self.lit_last_frame);
        rects.extend(current.iter().copied());

        for rect in &rects {
            self.backend.update(&mut self.light_map, *rect, &self.lights);
        }
        self.lit_last_frame = current;
        rects.len()
    }

    /// Recomputes `rect` (light cells) on a worker; see [`World::poll_light_tasks`].
    pub fn rebuild_light_async(&mut self, rect: GridRect) -> LightTaskId {
        let region = LightRegion::capture(&self.light_map, rect, &self.lights);
        self.light_tasks.submit(region)
    }

    /// Applies finished background regions; returns how many were applied.
    pub fn poll_light_tasks(&mut self) -> usize {
        let done = self.light_tasks.poll();
        for completed in &done {
            completed.region.apply(&mut self.light_map);
        }
        done.len()
    }

    pub fn wait_light_tasks(&mut self) -> usize {
        let done = self.light_tasks.wait();
        for completed in &done {
            completed.region.apply(&mut self.light_map);
        }
        done.len()
    }

    pub fn pending_light_tasks(&self) -> usize {
        self.light_tasks.pending()
    }

    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Tiles whose block, wall or frame changed since the last call, sorted.
    pub fn take_changes(&mut self) -> Vec<TilePos> {
        let mut changes: Vec<TilePos> = self.changed.drain().collect();
        changes.sort_unstable();
        changes
    }
}

impl Drop for World {
    fn drop(&mut self) {
        if self.light_tasks.pending() > 0 {
            debug!("Waiting for {} light tasks", self.light_tasks.pending());
        }
        self.light_tasks.shutdown();
    }
}
