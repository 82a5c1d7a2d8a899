use noise::{Fbm, MultiFractal, NoiseFn, Perlin, Simplex};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseKind {
    Perlin,
    Simplex,
}

/// Fractal noise parameters. `seed_offset` decorrelates fields built from
/// the same world seed.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    pub kind: NoiseKind,
    pub octaves: usize,
    pub frequency: f64,
    pub gain: f64,
    pub lacunarity: f64,
    pub seed_offset: u32,
}

impl NoiseParams {
    pub const fn fbm(kind: NoiseKind, octaves: usize, frequency: f64, seed_offset: u32) -> Self {
        Self {
            kind,
            octaves,
            frequency,
            gain: 0.5,
            lacunarity: 2.0,
            seed_offset,
        }
    }

    pub fn sanitize(mut self) -> Self {
        self.octaves = self.octaves.clamp(1, 8);
        self.frequency = self.frequency.clamp(0.0001, 1.0);
        self.gain = self.gain.clamp(0.05, 1.0);
        self.lacunarity = self.lacunarity.clamp(1.0, 4.0);
        self
    }
}

/// Seeded `f(x, y) -> [-1, 1]` sampler.
pub struct NoiseField {
    source: Box<dyn NoiseFn<f64, 2> + Send + Sync>,
}

impl NoiseField {
    pub fn new(params: &NoiseParams, world_seed: u64) -> Self {
        let folded = (world_seed ^ (world_seed >> 32)) as u32;
        let seed = folded.wrapping_add(params.seed_offset);

        let source: Box<dyn NoiseFn<f64, 2> + Send + Sync> = match params.kind {
            NoiseKind::Perlin => Box::new(
                Fbm::<Perlin>::new(seed)
                    .set_octaves(params.octaves)
                    .set_frequency(params.frequency)
                    .set_persistence(params.gain)
                    .set_lacunarity(params.lacunarity),
            ),
            NoiseKind::Simplex => Box::new(
                Fbm::<Simplex>::new(seed)
                    .set_octaves(params.octaves)
                    .set_frequency(params.frequency)
                    .set_persistence(params.gain)
                    .set_lacunarity(params.lacunarity),
            ),
        };

        Self { source }
    }

    pub fn sample(&self, x: f32, y: f32) -> f32 {
        self.source.get([f64::from(x), f64::from(y)]).clamp(-1.0, 1.0) as f32
    }

    /// Sample for one column, used by the per-column passes.
    pub fn sample_column(&self, x: i32) -> f32 {
        self.sample(x as f32, 0.0)
    }
}
