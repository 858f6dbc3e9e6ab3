//! Breadth-first and cost-weighted search from the agent's cell.
//! This module exists so every cascade rule shares one pruning policy.
//! It does not own rule ordering or target costs.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, VecDeque};

use super::threat::Surroundings;
use crate::types::{Direction, Occupancy, Pos};

/// Depth limit for searches that may cover the whole known map.
pub(super) const UNBOUNDED: u32 = u32::MAX;

pub(super) fn neighbors(pos: Pos) -> [Pos; 4] {
    Direction::ALL.map(|dir| pos.step(dir))
}

fn is_pruned(s: &Surroundings<'_>, pos: Pos) -> bool {
    s.map.get(pos).occupancy.value == Occupancy::Occupied || s.blocks_search(pos)
}

/// Walks parent links back from `end` to the cell adjacent to the start.
fn first_step(parents: &BTreeMap<Pos, Pos>, end: Pos) -> Option<Pos> {
    let mut current = end;
    let mut parent = *parents.get(&current)?;
    while let Some(&next) = parents.get(&parent) {
        current = parent;
        parent = next;
    }
    Some(current)
}

/// First step toward the nearest cell satisfying `is_endpoint`.
///
/// Cells outside the map bounds may be endpoints but are never expanded.
pub(super) fn bfs(s: &Surroundings<'_>, is_endpoint: impl Fn(Pos) -> bool, max_depth: u32) -> Option<Pos> {
    let mut depth = BTreeMap::from([(s.origin, 0u32)]);
    let mut parents = BTreeMap::new();
    let mut queue = VecDeque::from([s.origin]);

    while let Some(pos) = queue.pop_front() {
        if is_pruned(s, pos) {
            continue;
        }
        if is_endpoint(pos) {
            return first_step(&parents, pos);
        }
        let d = depth[&pos];
        if !s.map.has_any_info_about(pos) || d >= max_depth {
            continue;
        }
        for next in neighbors(pos) {
            if !depth.contains_key(&next) {
                depth.insert(next, d + 1);
                parents.insert(next, pos);
                queue.push_back(next);
            }
        }
    }
    None
}

#[derive(Clone, Copy, Debug)]
struct Frontier {
    cost: f32,
    seq: u64,
    depth: u32,
    pos: Pos,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    /// Reversed so the max-heap pops the cheapest, earliest-discovered node.
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.total_cmp(&self.cost).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// First step toward the cheapest endpoint by cumulative `cost`.
///
/// Without `is_endpoint`, any cell at `max_depth` qualifies. A cell's cost is
/// fixed when it is first discovered.
pub(super) fn dijkstra(
    s: &Surroundings<'_>,
    max_depth: u32,
    cost: impl Fn(Pos) -> f32,
    is_endpoint: Option<&dyn Fn(Pos) -> bool>,
) -> Option<Pos> {
    let mut seen = BTreeSet::from([s.origin]);
    let mut parents = BTreeMap::new();
    let mut heap = BinaryHeap::from([Frontier { cost: 0.0, seq: 0, depth: 0, pos: s.origin }]);
    let mut seq = 1;

    while let Some(node) = heap.pop() {
        if is_pruned(s, node.pos) {
            continue;
        }
        let reached = match is_endpoint {
            Some(is_endpoint) => is_endpoint(node.pos),
            None => node.depth >= max_depth,
        };
        if reached {
            return first_step(&parents, node.pos);
        }
        if node.depth >= max_depth || !s.map.has_any_info_about(node.pos) {
            continue;
        }
        for next in neighbors(node.pos) {
            if !seen.insert(next) {
                continue;
            }
            parents.insert(next, node.pos);
            heap.push(Frontier { cost: node.cost + cost(next), seq, depth: node.depth + 1, pos: next });
            seq += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn bfs_steps_toward_nearest_endpoint() {
        let agent = room_agent(&["#####", "#@..#", "#.#.#", "#..>#", "#####"]);
        let s = agent.surroundings().unwrap();
        let step = bfs(&s, |p| s.map.get(p).exit.value, UNBOUNDED);
        assert_eq!(step, Some(Pos::new(2, 1)));
    }

    #[test]
    fn bfs_respects_depth_and_walls() {
        let agent = room_agent(&["#####", "#@#>#", "#####"]);
        let s = agent.surroundings().unwrap();
        assert_eq!(bfs(&s, |p| s.map.get(p).exit.value, UNBOUNDED), None);

        let agent = room_agent(&["#####", "#@..>", "#####"]);
        let s = agent.surroundings().unwrap();
        assert_eq!(bfs(&s, |p| s.map.get(p).exit.value, 2), None);
        assert_eq!(bfs(&s, |p| s.map.get(p).exit.value, 3), Some(Pos::new(2, 1)));
    }

    #[test]
    fn endpoint_at_start_yields_no_step() {
        let agent = room_agent(&["...", ".@.", "..."]);
        let s = agent.surroundings().unwrap();
        assert_eq!(bfs(&s, |p| p == s.origin, UNBOUNDED), None);
    }

    #[test]
    fn bfs_routes_around_stronger_entity() {
        let mut agent = room_agent(&["#####", "#@.>#", "#...#", "#####"]);
        add_entity(&mut agent, "troll", Pos::new(2, 1), 50.0);
        let s = agent.surroundings().unwrap();
        assert_eq!(bfs(&s, |p| s.map.get(p).exit.value, UNBOUNDED), Some(Pos::new(1, 2)));
    }

    #[test]
    fn dijkstra_prefers_cheap_path() {
        let mut agent = room_agent(&["#####", "#@..#", "#...#", "#####"]);
        add_entity(&mut agent, "rat", Pos::new(2, 1), 4.0);
        let s = agent.surroundings().unwrap();
        let target = Pos::new(3, 1);
        let endpoint = |p: Pos| p == target;
        let step = dijkstra(&s, UNBOUNDED, |p| s.enemy_health_around(p) + 1.0, Some(&endpoint));
        assert_eq!(step, Some(Pos::new(1, 2)));
    }

    #[test]
    fn dijkstra_without_endpoint_stops_at_depth() {
        let agent = room_agent(&["#######", "#..@..#", "#######"]);
        let s = agent.surroundings().unwrap();
        assert_eq!(dijkstra(&s, 2, |_| 0.0, None), Some(Pos::new(4, 1)));
        assert_eq!(dijkstra(&s, 3, |_| 0.0, None), None);
    }
}
