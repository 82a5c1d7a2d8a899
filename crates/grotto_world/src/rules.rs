use std::sync::OnceLock;

use bitflags::bitflags;

use crate::tile::{AtlasPos, TileType};

bitflags! {
    /// One bit per neighbor. Cardinal bits sit four apart so the bucket
    /// index can be read with shifts (see [`NeighborMask::bucket`]).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NeighborMask: u16 {
        const RIGHT        = 1 << 0;
        const TOP_RIGHT    = 1 << 2;
        const TOP          = 1 << 4;
        const TOP_LEFT     = 1 << 6;
        const LEFT         = 1 << 8;
        const BOTTOM_LEFT  = 1 << 10;
        const BOTTOM       = 1 << 12;
        const BOTTOM_RIGHT = 1 << 14;

        const CARDINALS = Self::RIGHT.bits() | Self::TOP.bits() | Self::LEFT.bits() | Self::BOTTOM.bits();
        const DIAGONALS = Self::TOP_RIGHT.bits()
            | Self::TOP_LEFT.bits()
            | Self::BOTTOM_LEFT.bits()
            | Self::BOTTOM_RIGHT.bits();
    }
}

pub const BUCKET_COUNT: usize = 16;

/// Diagonals in rule priority order.
const CORNER_ORDER: [NeighborMask; 4] = [
    NeighborMask::TOP_LEFT,
    NeighborMask::TOP_RIGHT,
    NeighborMask::BOTTOM_LEFT,
    NeighborMask::BOTTOM_RIGHT,
];

impl NeighborMask {
    /// 0..16, one per combination of same-group cardinal neighbors.
    pub fn bucket(self) -> usize {
        let bits = self.bits();
        let bottom = (bits & Self::BOTTOM.bits()) >> 9;
        let left = (bits & Self::LEFT.bits()) >> 6;
        let top = (bits & Self::TOP.bits()) >> 3;
        let right = bits & Self::RIGHT.bits();
        usize::from(bottom + left + top + right)
    }

    /// Inverse of [`NeighborMask::bucket`] for the cardinal bits.
    pub fn from_bucket(bucket: usize) -> NeighborMask {
        let bucket = (bucket & 0x0F) as u16;
        let mut mask = NeighborMask::empty();
        if bucket & 1 != 0 {
            mask |= NeighborMask::RIGHT;
        }
        if bucket & 2 != 0 {
            mask |= NeighborMask::TOP;
        }
        if bucket & 4 != 0 {
            mask |= NeighborMask::LEFT;
        }
        if bucket & 8 != 0 {
            mask |= NeighborMask::BOTTOM;
        }
        mask
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TileRule {
    /// One frame per sprite variant.
    pub indexes: [AtlasPos; 3],
    pub corner_exclusion_mask: NeighborMask,
    pub corner_inclusion_mask: NeighborMask,
    pub blend_exclusion_mask: NeighborMask,
    pub blend_inclusion_mask: NeighborMask,
}

impl TileRule {
    fn plain(indexes: [AtlasPos; 3]) -> Self {
        Self {
            indexes,
            corner_exclusion_mask: NeighborMask::empty(),
            corner_inclusion_mask: NeighborMask::empty(),
            blend_exclusion_mask: NeighborMask::empty(),
            blend_inclusion_mask: NeighborMask::empty(),
        }
    }

    fn corner_excluded(mut self, corner: NeighborMask) -> Self {
        self.corner_exclusion_mask |= corner;
        self
    }

    fn blend(mut self, include: NeighborMask, exclude: NeighborMask) -> Self {
        self.blend_inclusion_mask |= include;
        self.blend_exclusion_mask |= exclude;
        self
    }

    pub fn frame(&self, variant: u8) -> AtlasPos {
        self.indexes[usize::from(variant) % self.indexes.len()]
    }

    pub fn matches(&self, neighbors: NeighborMask, blend: NeighborMask) -> bool {
        neighbors.contains(self.corner_inclusion_mask)
            && !neighbors.intersects(self.corner_exclusion_mask)
            && blend.contains(self.blend_inclusion_mask)
            && !blend.intersects(self.blend_exclusion_mask)
    }

    /// Diagonal exclusions are waived and a diagonal inclusion counts when
    /// either mask carries it. Cardinal predicates stay strict.
    pub fn matches_relaxed(&self, neighbors: NeighborMask, blend: NeighborMask) -> bool {
        let either = neighbors | blend;
        let cardinal = NeighborMask::CARDINALS;
        let diagonal = NeighborMask::DIAGONALS;

        neighbors.contains(self.corner_inclusion_mask & cardinal)
            && either.contains(self.corner_inclusion_mask & diagonal)
            && !neighbors.intersects(self.corner_exclusion_mask & cardinal)
            && blend.contains(self.blend_inclusion_mask & cardinal)
            && either.contains(self.blend_inclusion_mask & diagonal)
            && !blend.intersects(self.blend_exclusion_mask & cardinal)
    }
}

/// Ordered rule lists, one per bucket. First match wins.
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    buckets: [Vec<TileRule>; BUCKET_COUNT],
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bucket: usize, rule: TileRule) {
        self.buckets[bucket & 0x0F].push(rule);
    }

    pub fn rules(&self, bucket: usize) -> &[TileRule] {
        &self.buckets[bucket & 0x0F]
    }

    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, neighbors: NeighborMask, blend: NeighborMask) -> Option<&TileRule> {
        self.rules(neighbors.bucket())
            .iter()
            .find(|rule| rule.matches(neighbors, blend))
    }

    pub fn find_relaxed(&self, neighbors: NeighborMask, blend: NeighborMask) -> Option<&TileRule> {
        self.rules(neighbors.bucket())
            .iter()
            .find(|rule| rule.matches_relaxed(neighbors, blend))
    }
}

/// The three process-wide tables. Built once; tests may build their own.
#[derive(Clone, Debug)]
pub struct RuleTables {
    pub base: RuleSet,
    pub blend: RuleSet,
    pub grass: RuleSet,
}

static TABLES: OnceLock<RuleTables> = OnceLock::new();

impl RuleTables {
    pub fn global() -> &'static RuleTables {
        TABLES.get_or_init(RuleTables::build)
    }

    pub fn build() -> Self {
        let base = build_base_rules();
        let blend = build_blend_rules(&base);
        let grass = build_grass_rules(&base);
        Self { base, blend, grass }
    }

    pub fn for_tile(&self, ty: TileType) -> &RuleSet {
        match ty {
            TileType::Grass => &self.grass,
            _ if ty.merge_target().is_some() => &self.blend,
            _ => &self.base,
        }
    }
}

fn frames(cells: [(u16, u16); 3]) -> [AtlasPos; 3] {
    cells.map(|(x, y)| AtlasPos::new(x, y))
}

/// Classic 16-frame sheet, indexed by bucket (right=1, top=2, left=4, bottom=8).
const BASE_FRAMES: [[(u16, u16); 3]; BUCKET_COUNT] = [
    [(9, 3), (10, 3), (11, 3)],
    [(9, 0), (9, 1), (9, 2)],
    [(6, 3), (7, 3), (8, 3)],
    [(0, 4), (2, 4), (4, 4)],
    [(12, 0), (12, 1), (12, 2)],
    [(6, 4), (7, 4), (8, 4)],
    [(1, 4), (3, 4), (5, 4)],
    [(1, 2), (2, 2), (3, 2)],
    [(6, 0), (7, 0), (8, 0)],
    [(0, 3), (2, 3), (4, 3)],
    [(5, 0), (5, 1), (5, 2)],
    [(0, 0), (0, 1), (0, 2)],
    [(1, 3), (3, 3), (5, 3)],
    [(1, 0), (2, 0), (3, 0)],
    [(4, 0), (4, 1), (4, 2)],
    [(1, 1), (2, 1), (3, 1)],
];

const FULL_BUCKET: usize = BUCKET_COUNT - 1;
const DIAGONAL_BLEND_ROW: u16 = 20;
const GRASS_CORNER_ROW: u16 = 21;

fn inner_corner_frames(corner_index: usize) -> [AtlasPos; 3] {
    let row = corner_index as u16;
    frames([(13, row), (14, row), (15, row)])
}

fn row_frames(row: u16, column_group: usize) -> [AtlasPos; 3] {
    let first = column_group as u16 * 3;
    frames([(first, row), (first + 1, row), (first + 2, row)])
}

/// Cardinal blend frames: three columns per bucket, one row per blended side set.
fn cardinal_blend_frames(bucket: usize, sides: usize) -> [AtlasPos; 3] {
    row_frames(4 + sides as u16, bucket)
}

fn build_base_rules() -> RuleSet {
    let mut set = RuleSet::new();
    for (bucket, cells) in BASE_FRAMES.iter().enumerate() {
        if bucket == FULL_BUCKET {
            for (index, corner) in CORNER_ORDER.iter().enumerate() {
                set.push(
                    bucket,
                    TileRule::plain(inner_corner_frames(index)).corner_excluded(*corner),
                );
            }
        }
        set.push(bucket, TileRule::plain(frames(*cells)));
    }
    set
}

/// Non-empty subsets of `bucket`, most specific first.
fn blend_side_sets(bucket: usize) -> Vec<usize> {
    let mut sides: Vec<usize> = (1..BUCKET_COUNT)
        .filter(|sides| sides & !bucket == 0)
        .collect();
    sides.sort_by(|a, b| b.count_ones().cmp(&a.count_ones()).then(b.cmp(a)));
    sides
}

fn push_cardinal_blends(set: &mut RuleSet, bucket: usize) {
    let bucket_mask = NeighborMask::from_bucket(bucket);
    for sides in blend_side_sets(bucket) {
        let include = NeighborMask::from_bucket(sides);
        set.push(
            bucket,
            TileRule::plain(cardinal_blend_frames(bucket, sides)).blend(include, bucket_mask - include),
        );
    }
}

fn build_blend_rules(base: &RuleSet) -> RuleSet {
    let mut set = RuleSet::new();
    for bucket in 0..BUCKET_COUNT {
        push_cardinal_blends(&mut set, bucket);
        if bucket == FULL_BUCKET {
            for (index, corner) in CORNER_ORDER.iter().enumerate() {
                set.push(
                    bucket,
                    TileRule::plain(row_frames(DIAGONAL_BLEND_ROW, index))
                        .blend(*corner, NeighborMask::CARDINALS),
                );
            }
        }
        for rule in base.rules(bucket) {
            set.push(bucket, *rule);
        }
    }
    set
}

fn build_grass_rules(base: &RuleSet) -> RuleSet {
    let mut set = RuleSet::new();
    for bucket in 0..BUCKET_COUNT {
        push_cardinal_blends(&mut set, bucket);
        if bucket == FULL_BUCKET {
            for (index, corner) in CORNER_ORDER.iter().enumerate() {
                let others = NeighborMask::DIAGONALS - *corner;
                set.push(
                    bucket,
                    TileRule::plain(row_frames(GRASS_CORNER_ROW, index))
                        .blend(*corner, NeighborMask::CARDINALS | others),
                );
            }
            for rule in base.rules(bucket) {
                set.push(bucket, rule.blend(NeighborMask::empty(), NeighborMask::DIAGONALS));
            }
        } else {
            for rule in base.rules(bucket) {
                set.push(bucket, *rule);
            }
        }
    }
    set
}
