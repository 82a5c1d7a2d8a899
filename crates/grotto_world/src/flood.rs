use std::collections::VecDeque;

use bitvec::prelude::*;

use crate::coords::{Direction, TilePos};
use crate::grid::WorldData;
use crate::tile::TileType;

/// Turns surface-exposed dirt into grass. Seeds are the top-most solid tile
/// of every playable column; the fill follows 8-connected exposed dirt.
/// Returns the number of converted tiles.
pub fn grassify(data: &mut WorldData) -> usize {
    let playable = data.playable_area;
    let mut visited = bitvec![0; data.area.area()];
    let mut queue = VecDeque::new();

    for x in playable.left()..playable.right() {
        let first_solid = (playable.top()..playable.bottom())
            .map(|y| TilePos::new(x, y))
            .find(|pos| data.block_exists(*pos));
        if let Some(pos) = first_solid {
            enqueue(data, &mut visited, &mut queue, pos);
        }
    }

    let mut converted = 0;
    while let Some(pos) = queue.pop_front() {
        data.place_block(pos, TileType::Grass);
        converted += 1;

        for dir in Direction::ALL {
            enqueue(data, &mut visited, &mut queue, pos.offset(dir));
        }
    }
    converted
}

fn enqueue(data: &WorldData, visited: &mut BitVec, queue: &mut VecDeque<TilePos>, pos: TilePos) {
    if !data.playable_area.contains(pos) {
        return;
    }
    let Some(index) = data.index(pos) else {
        return;
    };
    if visited[index] {
        return;
    }
    if data.block_type(pos) == Some(TileType::Dirt) && data.is_exposed(pos) {
        visited.set(index, true);
        queue.push_back(pos);
    }
}

/// Removes background walls reachable from open air at the top of each
/// column. Sideways spread is bounded by depth so cave mouths do not strip
/// whole cave systems. Returns the number of removed walls.
pub fn strip_walls(data: &mut WorldData, lateral_slack: i32) -> usize {
    let playable = data.playable_area;

    let origins: Vec<TilePos> = (playable.left()..playable.right())
        .filter_map(|x| {
            (playable.top()..playable.bottom())
                .map(|y| TilePos::new(x, y))
                .find(|pos| data.wall_exists(*pos))
        })
        .filter(|pos| !data.block_exists(*pos))
        .collect();

    let mut removed = 0;
    let mut queue = VecDeque::new();
    for origin in origins {
        if data.take_wall(origin).is_none() {
            continue;
        }
        removed += 1;
        queue.push_back(origin);

        while let Some(pos) = queue.pop_front() {
            for dir in Direction::CARDINALS {
                let next = pos.offset(dir);
                if !playable.contains(next) || data.block_exists(next) || !data.wall_exists(next) {
                    continue;
                }
                let depth = next - origin;
                let sideways = matches!(dir, Direction::Left | Direction::Right);
                if sideways && depth.x.abs() >= depth.y / 2 + lateral_slack {
                    continue;
                }
                data.take_wall(next);
                removed += 1;
                queue.push_back(next);
            }
        }
    }
    removed
}
