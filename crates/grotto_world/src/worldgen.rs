use std::time::Instant;

use tracing::{debug, info};

use crate::config::GenerationConfig;
use crate::coords::{GridRect, TilePos};
use crate::error::WorldGenError;
use crate::flood;
use crate::grid::WorldData;
use crate::noise_field::{NoiseField, NoiseParams};
use crate::tile::{TileType, WallType};

/// Open rows kept above the tallest hill.
const SKY_CLEARANCE: i32 = 2;

#[derive(Debug, Clone)]
pub struct WorldGenerator {
    pub seed: u64,
    pub config: GenerationConfig,
}

impl WorldGenerator {
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, GenerationConfig::default())
    }

    pub fn with_config(seed: u64, config: GenerationConfig) -> Self {
        Self {
            seed,
            config: config.sanitize(),
        }
    }

    /// Builds the terrain, walls, grass and spawn point. Autotiling and
    /// lighting are left to the caller.
    pub fn generate(&self, width: u32, height: u32) -> Result<WorldData, WorldGenError> {
        let started = Instant::now();
        let mut data = WorldData::new(width, height, self.config.margin, self.seed)?;

        run_pass("layers", &mut data, |data| self.fill_layers(data));
        run_pass("hills", &mut data, |data| self.raise_hills(data));
        run_pass("walls", &mut data, |data| self.fill_walls(data));
        run_pass("cavern border", &mut data, |data| self.roughen_cavern_border(data));
        run_pass("caves", &mut data, |data| self.carve_caves(data));
        run_pass("inclusions", &mut data, |data| self.mix_inclusions(data));
        run_pass("grass", &mut data, |data| {
            let converted = flood::grassify(data);
            debug!("Grassified {converted} tiles");
        });
        let slack = self.config.wall_lateral_slack;
        run_pass("wall strip", &mut data, |data| {
            let removed = flood::strip_walls(data, slack);
            debug!("Stripped {removed} open-air walls");
        });
        run_pass("spawn", &mut data, place_spawn);

        info!(
            "Generated {}x{} world (seed {}) in {:.2?}, spawn at ({}, {})",
            width,
            height,
            self.seed,
            started.elapsed(),
            data.spawn_point.x,
            data.spawn_point.y
        );
        Ok(data)
    }

    fn field(&self, params: &NoiseParams) -> NoiseField {
        NoiseField::new(params, self.seed)
    }

    // Step 1: dirt band over solid stone.
    fn fill_layers(&self, data: &mut WorldData) {
        let playable = data.playable_area;
        let layers = data.layers;
        for x in playable.left()..playable.right() {
            data.fill_line_vertical(x, layers.surface, layers.underground, TileType::Dirt);
            data.fill_line_vertical(x, layers.underground, playable.bottom(), TileType::Stone);
        }
    }

    // Step 2: per-column dirt raised above the surface row.
    fn raise_hills(&self, data: &mut WorldData) {
        let playable = data.playable_area;
        let surface = data.layers.surface;
        let hills = self.field(&self.config.hill_noise);
        let ceiling = playable.top() + SKY_CLEARANCE;

        for x in playable.left()..playable.right() {
            let n = hills.sample_column(x);
            let rise = ((n + 1.0) * 0.5 * self.config.hill_height as f32).round() as i32;
            let top = (surface - rise).max(ceiling);
            data.fill_line_vertical(x, top, surface, TileType::Dirt);
        }
    }

    // Step 3: coarse background walls, dirt over the hill band and stone below.
    fn fill_walls(&self, data: &mut WorldData) {
        let playable = data.playable_area;
        let layers = data.layers;
        let wall_top = (layers.surface - self.config.hill_height).max(playable.top());

        data.fill_rect_walls(
            GridRect::new(playable.x, wall_top, playable.width, layers.underground - wall_top),
            WallType::Dirt,
        );
        data.fill_rect_walls(
            GridRect::new(
                playable.x,
                layers.underground,
                playable.width,
                playable.bottom() - layers.underground,
            ),
            WallType::Stone,
        );
    }

    // Step 4: jitter the dirt/stone seam.
    fn roughen_cavern_border(&self, data: &mut WorldData) {
        let playable = data.playable_area;
        let underground = data.layers.underground;
        let border = self.field(&self.config.border_noise);
        let roughness = self.config.cavern_roughness as f32;

        for x in playable.left()..playable.right() {
            let offset = (border.sample_column(x) * roughness).round() as i32;
            if offset > 0 {
                let end = (underground + offset).min(playable.bottom());
                data.fill_line_vertical(x, underground, end, TileType::Dirt);
            } else if offset < 0 {
                data.fill_line_vertical(x, underground + offset, underground, TileType::Stone);
            }
        }
    }

    // Step 5: two thresholded fields carve voids below the surface row.
    fn carve_caves(&self, data: &mut WorldData) {
        let playable = data.playable_area;
        let big = self.field(&self.config.big_cave_noise);
        let small = self.field(&self.config.small_cave_noise);
        let rows = GridRect::new(
            playable.x,
            data.layers.surface,
            playable.width,
            playable.bottom() - data.layers.surface,
        );

        let mut carved = 0usize;
        for pos in rows.positions() {
            let (x, y) = (pos.x as f32, pos.y as f32);
            let open = big.sample(x, y) > self.config.big_cave_threshold
                || small.sample(x, y) > self.config.small_cave_threshold;
            if open && data.take_block(pos).is_some() {
                carved += 1;
            }
        }
        debug!("Carved {carved} cave tiles");
    }

    // Step 6: depth-dependent dirt pockets in rock and rock pockets in dirt.
    fn mix_inclusions(&self, data: &mut WorldData) {
        let layers = data.layers;
        let top = (layers.surface - self.config.hill_height).max(data.playable_area.top());

        let dirt_in_rock = self.field(&self.config.dirt_in_rock_noise);
        swap_band(
            data,
            &dirt_in_rock,
            layers.underground..layers.cavern + 1,
            self.config.dirt_in_rock_thresholds,
            TileType::Stone,
            TileType::Dirt,
        );

        let rock_in_dirt = self.field(&self.config.rock_in_dirt_noise);
        swap_band(
            data,
            &rock_in_dirt,
            top..layers.underground,
            self.config.rock_in_dirt_thresholds,
            TileType::Dirt,
            TileType::Stone,
        );
    }
}

fn run_pass(name: &str, data: &mut WorldData, pass: impl FnOnce(&mut WorldData)) {
    let started = Instant::now();
    pass(data);
    debug!("Worldgen pass '{name}' took {:.2?}", started.elapsed());
}

/// Threshold moves linearly from `thresholds.0` at the first row to
/// `thresholds.1` at the last.
fn swap_band(
    data: &mut WorldData,
    field: &NoiseField,
    rows: std::ops::Range<i32>,
    thresholds: (f32, f32),
    from: TileType,
    to: TileType,
) {
    let playable = data.playable_area;
    let rows = rows.start.max(playable.top())..rows.end.min(playable.bottom());
    let span = (rows.end - rows.start - 1).max(1) as f32;

    for y in rows.clone() {
        let t = (y - rows.start) as f32 / span;
        let threshold = thresholds.0 + (thresholds.1 - thresholds.0) * t;
        for x in playable.left()..playable.right() {
            let pos = TilePos::new(x, y);
            if data.block_type(pos) == Some(from) && field.sample(x as f32, y as f32) > threshold {
                data.place_block(pos, to);
            }
        }
    }
}

// Step 9: stand on the first solid tile of the centre column.
fn place_spawn(data: &mut WorldData) {
    let playable = data.playable_area;
    let x = playable.x + playable.width / 2;
    let ground = (playable.top()..playable.bottom())
        .map(|y| TilePos::new(x, y))
        .find(|pos| data.block_exists(*pos));

    let ground = match ground {
        Some(pos) => pos,
        None => {
            let floor = TilePos::new(x, playable.bottom() - 1);
            data.place_block(floor, TileType::Dirt);
            floor
        }
    };
    data.spawn_point = TilePos::new(x, ground.y - 1);
}

#[cfg(test)]
mod tests {
    use super::WorldGenerator;
    use crate::config::GenerationConfig;
    use crate::coords::TilePos;
    use crate::error::WorldGenError;
    use crate::tile::TileType;

    fn block_types(data: &crate::grid::WorldData) -> Vec<Option<TileType>> {
        data.area.positions().map(|pos| data.block_type(pos)).collect()
    }

    #[test]
    fn same_seed_produces_the_same_terrain() {
        let a = WorldGenerator::new(77).generate(96, 128).expect("generate a");
        let b = WorldGenerator::new(77).generate(96, 128).expect("generate b");
        let c = WorldGenerator::new(78).generate(96, 128).expect("generate c");

        assert_eq!(block_types(&a), block_types(&b));
        assert_eq!(a.spawn_point, b.spawn_point);
        assert_ne!(block_types(&a), block_types(&c));
    }

    #[test]
    fn margin_is_left_untouched() {
        let data = WorldGenerator::new(5).generate(96, 128).expect("generate");
        for pos in data.area.positions() {
            if !data.playable_area.contains(pos) {
                assert!(!data.block_exists(pos), "block in margin at {pos:?}");
                assert!(!data.wall_exists(pos), "wall in margin at {pos:?}");
            }
        }
    }

    #[test]
    fn deep_rows_hold_only_ground_types() {
        let data = WorldGenerator::new(9).generate(96, 160).expect("generate");
        let underground = data.layers.underground;
        for pos in data.area.positions().filter(|pos| pos.y >= underground) {
            assert!(matches!(
                data.block_type(pos),
                None | Some(TileType::Stone | TileType::Dirt | TileType::Grass)
            ));
        }
        assert!(data.count_blocks(TileType::Stone) > 0);
        assert!(data.count_blocks(TileType::Grass) > 0);
    }

    #[test]
    fn spawn_stands_on_ground_under_open_sky() {
        for seed in [0, 1, 42, 9001] {
            let data = WorldGenerator::new(seed).generate(80, 120).expect("generate");
            let spawn = data.spawn_point;
            assert!(data.block_exists(TilePos::new(spawn.x, spawn.y + 1)), "seed {seed}");
            for y in data.area.top()..=spawn.y {
                assert!(!data.block_exists(TilePos::new(spawn.x, y)), "seed {seed} row {y}");
            }
        }
    }

    #[test]
    fn flat_world_without_noise_features_still_spawns() {
        let config = GenerationConfig {
            hill_height: 0,
            cavern_roughness: 0,
            big_cave_threshold: 1.0,
            small_cave_threshold: 1.0,
            dirt_in_rock_thresholds: (1.0, 1.0),
            rock_in_dirt_thresholds: (1.0, 1.0),
            ..GenerationConfig::default()
        };
        let data = WorldGenerator::with_config(3, config)
            .generate(64, 64)
            .expect("generate");
        assert_eq!(data.spawn_point.y, data.layers.surface - 1);
        assert_eq!(
            data.block_type(TilePos::new(data.spawn_point.x, data.layers.surface)),
            Some(TileType::Grass)
        );
    }

    #[test]
    fn rejects_degenerate_dimensions() {
        assert_eq!(
            WorldGenerator::new(0).generate(0, 0).unwrap_err(),
            WorldGenError::InvalidDimensions { width: 0, height: 0 }
        );
        assert!(WorldGenerator::new(0).generate(200, 20).is_err());
    }
}
