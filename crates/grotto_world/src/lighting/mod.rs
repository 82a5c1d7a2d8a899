pub mod compute;
pub mod cpu;
pub mod tasks;

use bitvec::prelude::*;
use bytemuck::{Pod, Zeroable};
use glam::{IVec2, UVec2, Vec3};
use grotto_core::JobSystem;
use tracing::debug;

use crate::config::BackendPreference;
use crate::coords::{GridRect, TilePos};
use crate::grid::WorldData;

pub use compute::ComputeLighting;
pub use cpu::CpuLighting;
pub use tasks::{CompletedLight, LightTaskId, LightTaskQueue};

pub const SUBDIVISION: i32 = 2;
pub const LIGHT_EPSILON: f32 = 0.0185;
pub const LIGHT_AIR_DECAY_STEPS: i32 = 32;
pub const LIGHT_SOLID_DECAY_STEPS: i32 = SUBDIVISION;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Decay {
    pub air: f32,
    pub solid: f32,
}

impl Decay {
    pub fn for_steps(air_steps: i32, solid_steps: i32) -> Self {
        Self {
            air: LIGHT_EPSILON.powf(1.0 / air_steps.max(1) as f32),
            solid: LIGHT_EPSILON.powf(1.0 / solid_steps.max(1) as f32),
        }
    }

    pub fn standard() -> Self {
        Self::for_steps(LIGHT_AIR_DECAY_STEPS, LIGHT_SOLID_DECAY_STEPS)
    }

    #[inline]
    pub fn factor(&self, solid: bool) -> f32 {
        if solid {
            self.solid
        } else {
            self.air
        }
    }
}

#[inline]
pub fn propagate_cell(own: Vec3, carried: Vec3, solid: bool, decay: &Decay) -> Vec3 {
    let incoming = carried * decay.factor(solid);
    if incoming.max_element() >= LIGHT_EPSILON {
        own.max(incoming)
    } else {
        own
    }
}

pub(crate) fn sweep_line(cells: &mut [Vec3], solid: &BitSlice, reverse: bool, decay: &Decay) {
    let len = cells.len();
    let mut carried = Vec3::ZERO;
    let mut step = |index: usize| {
        let lit = propagate_cell(cells[index], carried, solid[index], decay);
        cells[index] = lit;
        carried = lit;
    };
    if reverse {
        (0..len).rev().for_each(&mut step);
    } else {
        (0..len).for_each(&mut step);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Pass {
    LeftToRight,
    TopToBottom,
    RightToLeft,
    BottomToTop,
}

impl Pass {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Pass::LeftToRight | Pass::RightToLeft)
    }

    pub fn is_reverse(self) -> bool {
        matches!(self, Pass::RightToLeft | Pass::BottomToTop)
    }
}

/// Two full rounds, then a half round to settle the directional bias.
pub const RESOLVE_ORDER: [Pass; 10] = [
    Pass::LeftToRight,
    Pass::TopToBottom,
    Pass::RightToLeft,
    Pass::BottomToTop,
    Pass::LeftToRight,
    Pass::TopToBottom,
    Pass::RightToLeft,
    Pass::BottomToTop,
    Pass::LeftToRight,
    Pass::TopToBottom,
];

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct LightTexel(pub [u8; 4]);

impl LightTexel {
    pub fn from_color(color: Vec3) -> Self {
        let quantize = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self([quantize(color.x), quantize(color.y), quantize(color.z), u8::MAX])
    }
}

pub fn texel_bytes(texels: &[LightTexel]) -> &[u8] {
    bytemuck::cast_slice(texels)
}

/// Point (or area) light in light-cell units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Light {
    pub color: Vec3,
    pub pos: IVec2,
    pub size: UVec2,
}

impl Light {
    pub fn new(color: Vec3, pos: IVec2, size: UVec2) -> Self {
        Self { color, pos, size }
    }

    pub fn at_tile(pos: TilePos, color: Vec3) -> Self {
        Self::new(
            color,
            pos.as_ivec2() * SUBDIVISION,
            UVec2::splat(SUBDIVISION as u32),
        )
    }

    pub fn rect(&self) -> GridRect {
        GridRect::new(
            self.pos.x,
            self.pos.y,
            self.size.x.max(1) as i32,
            self.size.y.max(1) as i32,
        )
    }

    /// Cells this light can reach before it fades below epsilon.
    pub fn influence(&self) -> GridRect {
        self.rect().expand(LIGHT_AIR_DECAY_STEPS)
    }
}

#[derive(Clone, Debug)]
pub struct LightMap {
    width: i32,
    height: i32,
    colors: Vec<Vec3>,
    solid: BitVec,
    sky: BitVec,
    ambient: Vec3,
}

impl LightMap {
    pub fn new(data: &WorldData, ambient: f32) -> Self {
        let width = data.width() * SUBDIVISION;
        let height = data.height() * SUBDIVISION;
        let cells = width as usize * height as usize;

        let mut map = Self {
            width,
            height,
            colors: vec![Vec3::ZERO; cells],
            solid: bitvec![0; cells],
            sky: bitvec![0; cells],
            ambient: Vec3::splat(ambient),
        };
        for pos in data.area.positions() {
            map.refresh_tile(data, pos);
        }
        debug!(
            "Allocated {}x{} light map ({} solid cells)",
            width,
            height,
            map.solid.count_ones()
        );
        map
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn ambient(&self) -> Vec3 {
        self.ambient
    }

    pub fn cell_rect(&self) -> GridRect {
        GridRect::new(0, 0, self.width, self.height)
    }

    pub fn index(&self, cell: IVec2) -> Option<usize> {
        if cell.x < 0 || cell.y < 0 || cell.x >= self.width || cell.y >= self.height {
            return None;
        }
        Some(cell.y as usize * self.width as usize + cell.x as usize)
    }

    pub fn get(&self, cell: IVec2) -> Vec3 {
        self.index(cell).map_or(Vec3::ZERO, |index| self.colors[index])
    }

    pub fn is_solid(&self, cell: IVec2) -> bool {
        self.index(cell).is_some_and(|index| self.solid[index])
    }

    pub fn is_sky(&self, cell: IVec2) -> bool {
        self.index(cell).is_some_and(|index| self.sky[index])
    }

    pub fn tile_cells(pos: TilePos) -> GridRect {
        GridRect::new(
            pos.x * SUBDIVISION,
            pos.y * SUBDIVISION,
            SUBDIVISION,
            SUBDIVISION,
        )
    }

    pub fn tile_light(&self, pos: TilePos) -> Vec3 {
        let cells = Self::tile_cells(pos);
        let sum = cells
            .positions()
            .fold(Vec3::ZERO, |sum, cell| sum + self.get(cell.as_ivec2()));
        sum / cells.area() as f32
    }

    /// Re-derives solidity and sky emission for one tile; returns its cells.
    pub fn refresh_tile(&mut self, data: &WorldData, pos: TilePos) -> GridRect {
        let solid = data.block_exists(pos);
        let sky = !solid && !data.wall_exists(pos);
        let cells = Self::tile_cells(pos).intersect(&self.cell_rect());
        for cell in cells.positions() {
            if let Some(index) = self.index(cell.as_ivec2()) {
                self.solid.set(index, solid);
                self.sky.set(index, sky);
            }
        }
        cells
    }

    pub fn texels(&self) -> Vec<LightTexel> {
        self.colors.iter().copied().map(LightTexel::from_color).collect()
    }

    /// Fraction of cells lit above epsilon.
    pub fn coverage(&self) -> f32 {
        if self.colors.is_empty() {
            return 0.0;
        }
        let lit = self
            .colors
            .iter()
            .filter(|color| color.max_element() >= LIGHT_EPSILON)
            .count();
        lit as f32 / self.colors.len() as f32
    }
}

/// Copy of `rect` grown by the air decay distance; only `rect` is written back.
#[derive(Clone, Debug)]
pub struct LightRegion {
    inner: GridRect,
    outer: GridRect,
    pub(crate) colors: Vec<Vec3>,
    pub(crate) solid: BitVec,
}

impl LightRegion {
    pub fn capture(map: &LightMap, rect: GridRect, lights: &[Light]) -> Self {
        let bounds = map.cell_rect();
        let inner = rect.intersect(&bounds);
        let outer = rect.expand(LIGHT_AIR_DECAY_STEPS).intersect(&bounds);
        let cells = outer.area();

        let mut colors = Vec::with_capacity(cells);
        let mut solid = BitVec::with_capacity(cells);
        for cell in outer.positions() {
            let index = map.index(cell.as_ivec2());
            let sky = index.is_some_and(|index| map.sky[index]);
            colors.push(if sky { map.ambient } else { Vec3::ZERO });
            solid.push(index.is_some_and(|index| map.solid[index]));
        }

        let mut region = Self {
            inner,
            outer,
            colors,
            solid,
        };
        for light in lights {
            region.seed(light);
        }
        region
    }

    fn seed(&mut self, light: &Light) {
        let covered = light.rect().intersect(&self.outer);
        for cell in covered.positions() {
            if let Some(index) = self.local_index(cell.as_ivec2()) {
                self.colors[index] = self.colors[index].max(light.color);
            }
        }
    }

    pub fn inner(&self) -> GridRect {
        self.inner
    }

    pub fn outer(&self) -> GridRect {
        self.outer
    }

    pub fn width(&self) -> usize {
        self.outer.width.max(0) as usize
    }

    pub fn height(&self) -> usize {
        self.outer.height.max(0) as usize
    }

    fn local_index(&self, cell: IVec2) -> Option<usize> {
        if !self.outer.contains(TilePos::new(cell.x, cell.y)) {
            return None;
        }
        let x = (cell.x - self.outer.x) as usize;
        let y = (cell.y - self.outer.y) as usize;
        Some(y * self.width() + x)
    }

    pub fn get(&self, cell: IVec2) -> Option<Vec3> {
        self.local_index(cell).map(|index| self.colors[index])
    }

    pub fn apply(&self, map: &mut LightMap) {
        for cell in self.inner.positions() {
            let cell = cell.as_ivec2();
            if let (Some(local), Some(global)) = (self.local_index(cell), map.index(cell)) {
                map.colors[global] = self.colors[local];
            }
        }
    }
}

/// Lighting backend, chosen once per world.
pub enum LightBackend {
    Cpu(CpuLighting),
    Compute(ComputeLighting),
}

impl LightBackend {
    pub fn select(preference: BackendPreference, jobs: &std::sync::Arc<JobSystem>) -> Self {
        let backend = match preference {
            BackendPreference::Cpu => Self::Cpu(CpuLighting::new()),
            BackendPreference::Compute => Self::Compute(ComputeLighting::new(jobs.clone())),
            BackendPreference::Auto if jobs.thread_count() > 1 => {
                Self::Compute(ComputeLighting::new(jobs.clone()))
            }
            BackendPreference::Auto => Self::Cpu(CpuLighting::new()),
        };
        debug!("Using {} light backend", backend.name());
        backend
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Cpu(_) => "cpu",
            Self::Compute(_) => "compute",
        }
    }

    pub fn resolve(&self, region: &mut LightRegion) {
        match self {
            Self::Cpu(backend) => backend.resolve(region),
            Self::Compute(backend) => backend.resolve(region),
        }
    }

    pub fn update(&self, map: &mut LightMap, rect: GridRect, lights: &[Light]) {
        let mut region = LightRegion::capture(map, rect, lights);
        self.resolve(&mut region);
        region.apply(map);
    }

    pub fn resolve_full(&self, map: &mut LightMap, lights: &[Light]) {
        let rect = map.cell_rect();
        self.update(map, rect, lights);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bitvec::prelude::*;
    use glam::{IVec2, UVec2, Vec3};
    use grotto_core::JobSystem;

    use super::{
        propagate_cell, sweep_line, texel_bytes, CpuLighting, Decay, Light, LightBackend, LightMap,
        LightRegion, LightTexel, LIGHT_AIR_DECAY_STEPS, LIGHT_EPSILON, LIGHT_SOLID_DECAY_STEPS,
        SUBDIVISION,
    };
    use crate::config::BackendPreference;
    use crate::coords::{GridRect, TilePos};
    use crate::grid::WorldData;
    use crate::tile::{TileType, WallType};

    fn open_world() -> WorldData {
        WorldData::new(64, 64, 4, 1).expect("valid dimensions")
    }

    #[test]
    fn decay_reaches_epsilon_after_the_step_budget() {
        let decay = Decay::standard();
        let after_air = decay.air.powi(LIGHT_AIR_DECAY_STEPS);
        let after_solid = decay.solid.powi(LIGHT_SOLID_DECAY_STEPS);
        assert!((after_air - LIGHT_EPSILON).abs() < 1e-4);
        assert!((after_solid - LIGHT_EPSILON).abs() < 1e-4);
        assert!(decay.solid < decay.air);
    }

    #[test]
    fn propagation_keeps_brighter_own_light() {
        let decay = Decay::standard();
        let own = Vec3::new(0.9, 0.0, 0.0);
        let lit = propagate_cell(own, Vec3::splat(1.0), false, &decay);
        assert_eq!(lit.x, 0.9);
        assert!((lit.y - decay.air).abs() < 1e-6);

        let faint = Vec3::splat(LIGHT_EPSILON * 0.5);
        assert_eq!(propagate_cell(Vec3::ZERO, faint, false, &decay), Vec3::ZERO);
    }

    #[test]
    fn sweep_line_carries_light_one_direction_at_a_time() {
        let decay = Decay::standard();
        let solid = bitvec![0, 0, 0, 0, 1];
        let mut cells = [Vec3::ZERO, Vec3::ZERO, Vec3::ONE, Vec3::ZERO, Vec3::ZERO];

        sweep_line(&mut cells, &solid, false, &decay);
        assert_eq!(cells[0], Vec3::ZERO);
        assert_eq!(cells[1], Vec3::ZERO);
        assert!((cells[3].x - decay.air).abs() < 1e-6);
        assert!((cells[4].x - decay.air * decay.solid).abs() < 1e-6);

        sweep_line(&mut cells, &solid, true, &decay);
        assert!((cells[1].x - decay.air).abs() < 1e-6);
        assert!(cells[0].x < cells[1].x);
        assert_eq!(cells[2], Vec3::ONE);
    }

    #[test]
    fn point_light_falls_off_monotonically_in_open_air() {
        let mut data = open_world();
        data.fill_rect_walls(data.area, WallType::Dirt);
        let mut map = LightMap::new(&data, 0.0);
        let source = TilePos::new(32, 32);
        let light = Light::new(Vec3::ONE, source.as_ivec2() * SUBDIVISION, UVec2::ONE);
        LightBackend::Cpu(CpuLighting::new()).resolve_full(&mut map, &[light]);

        let origin = light.pos;
        for dir in [IVec2::X, IVec2::NEG_X, IVec2::Y, IVec2::NEG_Y] {
            let mut previous = map.get(origin).x;
            assert_eq!(previous, 1.0);
            for distance in 1..50 {
                let value = map.get(origin + dir * distance).x;
                assert!(value <= previous, "{dir:?} at {distance}");
                if distance > LIGHT_AIR_DECAY_STEPS {
                    assert!(value <= LIGHT_EPSILON);
                }
                previous = value;
            }
        }
    }

    #[test]
    fn region_writes_back_only_its_inner_rect() {
        let mut data = open_world();
        data.fill_rect_walls(data.area, WallType::Stone);
        let mut map = LightMap::new(&data, 0.0);
        let light = Light::new(Vec3::ONE, IVec2::new(60, 60), UVec2::new(2, 2));

        let inner = GridRect::new(58, 58, 6, 6);
        let region = {
            let mut region = LightRegion::capture(&map, inner, &[light]);
            CpuLighting::new().resolve(&mut region);
            region
        };
        assert!(region.get(IVec2::new(70, 60)).is_some_and(|c| c.x > 0.0));
        region.apply(&mut map);

        assert_eq!(map.get(IVec2::new(60, 60)), Vec3::ONE);
        assert!(map.get(IVec2::new(63, 60)).x > 0.0);
        assert_eq!(map.get(IVec2::new(64, 60)), Vec3::ZERO);
    }

    #[test]
    fn sky_cells_emit_ambient_and_solids_block_it() {
        let mut data = open_world();
        let pos = TilePos::new(20, 20);
        data.place_block(pos, TileType::Stone);
        data.place_wall(TilePos::new(21, 20), WallType::Dirt);
        let mut map = LightMap::new(&data, 0.8);

        let cell = pos.as_ivec2() * SUBDIVISION;
        assert!(map.is_solid(cell));
        assert!(!map.is_sky(cell));
        assert!(!map.is_sky(TilePos::new(21, 20).as_ivec2() * SUBDIVISION));
        assert!(map.is_sky(IVec2::ZERO));

        LightBackend::Cpu(CpuLighting::new()).resolve_full(&mut map, &[]);
        assert_eq!(map.get(IVec2::ZERO), Vec3::splat(0.8));
        assert!(map.tile_light(pos).x < 0.8);
        assert!(map.coverage() > 0.9);

        data.take_block(pos);
        let dirty = map.refresh_tile(&data, pos);
        assert_eq!(dirty, LightMap::tile_cells(pos));
        assert!(!map.is_solid(cell));
    }

    #[test]
    fn texels_are_opaque_quantized_bytes() {
        let texel = LightTexel::from_color(Vec3::new(1.0, 0.5, -1.0));
        assert_eq!(texel.0, [255, 128, 0, 255]);
        let texels = [texel, LightTexel::default()];
        assert_eq!(texel_bytes(&texels), &[255, 128, 0, 255, 0, 0, 0, 0]);

        let data = open_world();
        let map = LightMap::new(&data, 1.0);
        assert_eq!(map.texels().len(), (map.width() * map.height()) as usize);
    }

    #[test]
    fn backend_selection_honors_preference() {
        let jobs = Arc::new(JobSystem::new(Some(2)).expect("pool"));
        assert_eq!(LightBackend::select(BackendPreference::Cpu, &jobs).name(), "cpu");
        assert_eq!(LightBackend::select(BackendPreference::Compute, &jobs).name(), "compute");
        assert_eq!(LightBackend::select(BackendPreference::Auto, &jobs).name(), "compute");

        let single = Arc::new(JobSystem::new(Some(1)).expect("pool"));
        assert_eq!(LightBackend::select(BackendPreference::Auto, &single).name(), "cpu");
    }
}
