use glam::Vec3;

use super::{propagate_cell, sweep_line, Decay, LightRegion, Pass, RESOLVE_ORDER};

/// Single-threaded sweeps straight over the region arrays.
#[derive(Clone, Debug)]
pub struct CpuLighting {
    decay: Decay,
}

impl Default for CpuLighting {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuLighting {
    pub fn new() -> Self {
        Self {
            decay: Decay::standard(),
        }
    }

    pub fn resolve(&self, region: &mut LightRegion) {
        for pass in RESOLVE_ORDER {
            self.run_pass(region, pass);
        }
    }

    fn run_pass(&self, region: &mut LightRegion, pass: Pass) {
        let (width, height) = (region.width(), region.height());
        if width == 0 || height == 0 {
            return;
        }

        if pass.is_horizontal() {
            for row in 0..height {
                let span = row * width..(row + 1) * width;
                sweep_line(
                    &mut region.colors[span.clone()],
                    &region.solid[span],
                    pass.is_reverse(),
                    &self.decay,
                );
            }
            return;
        }

        for column in 0..width {
            let mut carried = Vec3::ZERO;
            let mut step = |row: usize| {
                let index = row * width + column;
                let lit = propagate_cell(
                    region.colors[index],
                    carried,
                    region.solid[index],
                    &self.decay,
                );
                region.colors[index] = lit;
                carried = lit;
            };
            if pass.is_reverse() {
                (0..height).rev().for_each(&mut step);
            } else {
                (0..height).for_each(&mut step);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{IVec2, UVec2, Vec3};

    use super::CpuLighting;
    use crate::coords::{GridRect, TilePos};
    use crate::grid::WorldData;
    use crate::lighting::{Light, LightMap, LightRegion, SUBDIVISION};
    use crate::tile::{TileType, WallType};

    #[test]
    fn light_wraps_around_an_obstacle_corner() {
        let mut data = WorldData::new(48, 48, 4, 2).expect("valid dimensions");
        data.fill_rect_walls(data.area, WallType::Dirt);
        // vertical stone bar between the light and the probe
        for y in 10..30 {
            data.place_block(TilePos::new(20, y), TileType::Stone);
        }
        let map = LightMap::new(&data, 0.0);
        let light = Light::new(Vec3::ONE, IVec2::new(18 * SUBDIVISION, 28 * SUBDIVISION), UVec2::ONE);

        let mut region = LightRegion::capture(&map, map.cell_rect(), &[light]);
        CpuLighting::new().resolve(&mut region);

        // reachable only by going down past the bar's end and back up
        let probe = IVec2::new(22 * SUBDIVISION, 28 * SUBDIVISION);
        let lit = region.get(probe).expect("probe inside region");
        assert!(lit.x > 0.0);
        assert!(lit.x < region.get(light.pos).expect("source").x);
    }

    #[test]
    fn empty_region_is_a_no_op() {
        let data = WorldData::new(40, 40, 4, 2).expect("valid dimensions");
        let map = LightMap::new(&data, 1.0);
        let mut region = LightRegion::capture(&map, GridRect::new(-500, -500, 4, 4), &[]);
        assert_eq!(region.width(), 0);
        CpuLighting::new().resolve(&mut region);
    }
}
