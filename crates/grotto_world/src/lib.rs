pub mod autotile;
pub mod config;
pub mod coords;
pub mod error;
pub mod flood;
pub mod grid;
pub mod lighting;
pub mod noise_field;
pub mod rules;
pub mod tile;
pub mod world;
pub mod worldgen;

pub use autotile::{Resolution, ResolveStats, MERGE_RESET_RADIUS};
pub use config::{BackendPreference, GenerationConfig, LightingConfig, WorldConfig};
pub use coords::{Direction, GridRect, TilePos, TILE_SIZE};
pub use error::{ConfigError, WorldError, WorldGenError};
pub use grid::{Layers, Neighbors, WorldData, MAX_WORLD_SIZE, MIN_PLAYABLE_SIZE};
pub use lighting::{Light, LightBackend, LightMap, LightTaskId, LightTexel};
pub use rules::{NeighborMask, RuleSet, RuleTables, TileRule};
pub use tile::{AtlasPos, MergeId, Tile, TileType, Wall, WallType};
pub use world::World;
pub use worldgen::WorldGenerator;
