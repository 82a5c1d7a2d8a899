use std::sync::Arc;

use bitvec::prelude::*;
use glam::Vec3;
use grotto_core::JobSystem;
use rayon::prelude::*;

use super::{sweep_line, Decay, LightRegion, RESOLVE_ORDER};

/// Data-parallel formulation of the sweeps: one invocation per row or
/// column, dispatched on the job pool. Column passes run over a transposed
/// copy so every invocation walks contiguous memory.
pub struct ComputeLighting {
    jobs: Arc<JobSystem>,
    decay: Decay,
}

impl ComputeLighting {
    pub fn new(jobs: Arc<JobSystem>) -> Self {
        Self {
            jobs,
            decay: Decay::standard(),
        }
    }

    pub fn resolve(&self, region: &mut LightRegion) {
        let (width, height) = (region.width(), region.height());
        if width == 0 || height == 0 {
            return;
        }

        let decay = self.decay;
        let solid_columns = transpose_bits(&region.solid, width, height);
        let mut columns = vec![Vec3::ZERO; width * height];

        self.jobs.install(|| {
            for pass in RESOLVE_ORDER {
                if pass.is_horizontal() {
                    dispatch(&mut region.colors, &region.solid, width, pass.is_reverse(), &decay);
                } else {
                    transpose(&region.colors, &mut columns, width, height);
                    dispatch(&mut columns, &solid_columns, height, pass.is_reverse(), &decay);
                    transpose(&columns, &mut region.colors, height, width);
                }
            }
        });
    }
}

fn dispatch(cells: &mut [Vec3], solid: &BitSlice, line_len: usize, reverse: bool, decay: &Decay) {
    cells
        .par_chunks_mut(line_len)
        .enumerate()
        .for_each(|(line, chunk)| {
            let start = line * line_len;
            sweep_line(chunk, &solid[start..start + line_len], reverse, decay);
        });
}

/// `src` is `height` rows of `width`; `dst` becomes `width` rows of `height`.
fn transpose(src: &[Vec3], dst: &mut [Vec3], width: usize, height: usize) {
    dst.par_chunks_mut(height).enumerate().for_each(|(x, column)| {
        for (y, cell) in column.iter_mut().enumerate() {
            *cell = src[y * width + x];
        }
    });
}

fn transpose_bits(src: &BitSlice, width: usize, height: usize) -> BitVec {
    (0..width * height)
        .map(|index| {
            let (x, y) = (index / height, index % height);
            src[y * width + x]
        })
        .collect()
}
