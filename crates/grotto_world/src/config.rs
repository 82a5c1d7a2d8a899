use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::noise_field::{NoiseKind, NoiseParams};

const MIN_MARGIN: i32 = 1;
const MAX_MARGIN: i32 = 64;
const MAX_HILL_HEIGHT: i32 = 48;
const MAX_CAVERN_ROUGHNESS: i32 = 24;
const MIN_LATERAL_SLACK: i32 = 1;
const MAX_LATERAL_SLACK: i32 = 32;
const MAX_AMBIENT: f32 = 4.0;
const MAX_LIGHT_WORKERS: usize = 16;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub lighting: LightingConfig,
}

impl WorldConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded world config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        let parsed = toml::from_str::<Self>(contents)?;
        Ok(parsed.sanitize())
    }

    pub fn sanitize(mut self) -> Self {
        self.generation = self.generation.sanitize();
        self.lighting = self.lighting.sanitize();
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Untouched border around the playable area, in tiles.
    #[serde(default = "default_margin")]
    pub margin: i32,
    #[serde(default = "default_hill_height")]
    pub hill_height: i32,
    #[serde(default = "default_cavern_roughness")]
    pub cavern_roughness: i32,
    #[serde(default = "default_hill_noise")]
    pub hill_noise: NoiseParams,
    #[serde(default = "default_border_noise")]
    pub border_noise: NoiseParams,
    #[serde(default = "default_big_cave_noise")]
    pub big_cave_noise: NoiseParams,
    #[serde(default = "default_big_cave_threshold")]
    pub big_cave_threshold: f32,
    #[serde(default = "default_small_cave_noise")]
    pub small_cave_noise: NoiseParams,
    #[serde(default = "default_small_cave_threshold")]
    pub small_cave_threshold: f32,
    #[serde(default = "default_dirt_in_rock_noise")]
    pub dirt_in_rock_noise: NoiseParams,
    /// Threshold at the top and bottom of the dirt-in-rock band.
    #[serde(default = "default_dirt_in_rock_thresholds")]
    pub dirt_in_rock_thresholds: (f32, f32),
    #[serde(default = "default_rock_in_dirt_noise")]
    pub rock_in_dirt_noise: NoiseParams,
    #[serde(default = "default_rock_in_dirt_thresholds")]
    pub rock_in_dirt_thresholds: (f32, f32),
    /// Base sideways allowance of the wall stripper.
    #[serde(default = "default_wall_lateral_slack")]
    pub wall_lateral_slack: i32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            margin: default_margin(),
            hill_height: default_hill_height(),
            cavern_roughness: default_cavern_roughness(),
            hill_noise: default_hill_noise(),
            border_noise: default_border_noise(),
            big_cave_noise: default_big_cave_noise(),
            big_cave_threshold: default_big_cave_threshold(),
            small_cave_noise: default_small_cave_noise(),
            small_cave_threshold: default_small_cave_threshold(),
            dirt_in_rock_noise: default_dirt_in_rock_noise(),
            dirt_in_rock_thresholds: default_dirt_in_rock_thresholds(),
            rock_in_dirt_noise: default_rock_in_dirt_noise(),
            rock_in_dirt_thresholds: default_rock_in_dirt_thresholds(),
            wall_lateral_slack: default_wall_lateral_slack(),
        }
    }
}

impl GenerationConfig {
    pub fn sanitize(mut self) -> Self {
        self.margin = self.margin.clamp(MIN_MARGIN, MAX_MARGIN);
        self.hill_height = self.hill_height.clamp(0, MAX_HILL_HEIGHT);
        self.cavern_roughness = self.cavern_roughness.clamp(0, MAX_CAVERN_ROUGHNESS);
        self.hill_noise = self.hill_noise.sanitize();
        self.border_noise = self.border_noise.sanitize();
        self.big_cave_noise = self.big_cave_noise.sanitize();
        self.small_cave_noise = self.small_cave_noise.sanitize();
        self.dirt_in_rock_noise = self.dirt_in_rock_noise.sanitize();
        self.rock_in_dirt_noise = self.rock_in_dirt_noise.sanitize();
        self.big_cave_threshold = self.big_cave_threshold.clamp(-1.0, 1.0);
        self.small_cave_threshold = self.small_cave_threshold.clamp(-1.0, 1.0);
        self.dirt_in_rock_thresholds = clamp_pair(self.dirt_in_rock_thresholds);
        self.rock_in_dirt_thresholds = clamp_pair(self.rock_in_dirt_thresholds);
        self.wall_lateral_slack = self
            .wall_lateral_slack
            .clamp(MIN_LATERAL_SLACK, MAX_LATERAL_SLACK);
        self
    }
}

fn clamp_pair((a, b): (f32, f32)) -> (f32, f32) {
    (a.clamp(-1.0, 1.0), b.clamp(-1.0, 1.0))
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    #[default]
    Auto,
    Cpu,
    Compute,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightingConfig {
    #[serde(default)]
    pub backend: BackendPreference,
    /// Sky light injected into open cells with neither tile nor wall.
    #[serde(default = "default_ambient")]
    pub ambient: f32,
    /// Background light workers; 0 lets rayon pick.
    #[serde(default)]
    pub workers: usize,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            backend: BackendPreference::default(),
            ambient: default_ambient(),
            workers: 0,
        }
    }
}

impl LightingConfig {
    pub fn sanitize(mut self) -> Self {
        self.ambient = if self.ambient.is_finite() {
            self.ambient.clamp(0.0, MAX_AMBIENT)
        } else {
            default_ambient()
        };
        self.workers = self.workers.min(MAX_LIGHT_WORKERS);
        self
    }
}

fn default_margin() -> i32 {
    8
}

fn default_hill_height() -> i32 {
    12
}

fn default_cavern_roughness() -> i32 {
    4
}

fn default_hill_noise() -> NoiseParams {
    NoiseParams::fbm(NoiseKind::Perlin, 4, 0.015, 101)
}

fn default_border_noise() -> NoiseParams {
    NoiseParams::fbm(NoiseKind::Perlin, 3, 0.08, 202)
}

fn default_big_cave_noise() -> NoiseParams {
    NoiseParams::fbm(NoiseKind::Perlin, 3, 0.025, 303)
}

fn default_big_cave_threshold() -> f32 {
    0.38
}

fn default_small_cave_noise() -> NoiseParams {
    NoiseParams::fbm(NoiseKind::Simplex, 4, 0.07, 404)
}

fn default_small_cave_threshold() -> f32 {
    0.5
}

fn default_dirt_in_rock_noise() -> NoiseParams {
    NoiseParams::fbm(NoiseKind::Perlin, 2, 0.09, 505)
}

fn default_dirt_in_rock_thresholds() -> (f32, f32) {
    (0.35, 0.6)
}

fn default_rock_in_dirt_noise() -> NoiseParams {
    NoiseParams::fbm(NoiseKind::Simplex, 2, 0.1, 606)
}

fn default_rock_in_dirt_thresholds() -> (f32, f32) {
    (0.65, 0.35)
}

fn default_wall_lateral_slack() -> i32 {
    5
}

fn default_ambient() -> f32 {
    1.0
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{BackendPreference, WorldConfig};
    use crate::error::ConfigError;

    #[test]
    fn empty_document_yields_defaults() {
        let config = WorldConfig::from_toml_str("").expect("empty config parses");
        assert_eq!(config, WorldConfig::default());
    }

    #[test]
    fn partial_document_keeps_other_defaults_and_clamps() {
        let config = WorldConfig::from_toml_str(
            r#"
            [generation]
            margin = 500
            hill_height = 20

            [lighting]
            backend = "cpu"
            ambient = -3.0
            "#,
        )
        .expect("partial config parses");

        assert_eq!(config.generation.margin, 64);
        assert_eq!(config.generation.hill_height, 20);
        assert_eq!(config.generation.cavern_roughness, 4);
        assert_eq!(config.lighting.backend, BackendPreference::Cpu);
        assert_eq!(config.lighting.ambient, 0.0);
    }

    #[test]
    fn noise_tables_round_trip_through_toml() {
        let original = WorldConfig::default();
        let text = toml::to_string_pretty(&original).expect("serialize config");
        let parsed = WorldConfig::from_toml_str(&text).expect("parse config");
        assert_eq!(parsed, original);
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = std::env::temp_dir().join(format!("grotto-config-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create temp dir");

        let missing = dir.join("missing.toml");
        assert!(matches!(
            WorldConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));

        let broken = dir.join("broken.toml");
        fs::write(&broken, "[generation\nmargin = ").expect("write broken config");
        assert!(matches!(
            WorldConfig::load(&broken),
            Err(ConfigError::Parse { .. })
        ));

        let _ = fs::remove_dir_all(&dir);
    }
}
