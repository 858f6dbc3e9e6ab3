//! Partial-knowledge grid map for a single dungeon level.
//! This module exists to own cell storage, bound growth, and the contradiction rule.
//! It does not own level matching policy or the per-tick observation pipeline.

mod codec;
mod window_hash;


use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::cell::{Cell, HistoricalValue};
use crate::rect::IntRect;
use crate::types::{EntityId, EntityKind, Knowledge, Occupancy, Pos};

pub use codec::{FORMAT_VERSION, MapDecodeError};
use window_hash::HashIndex;

/// Last sighting of a tracked entity at a grid position.
#[derive(Clone, Debug, PartialEq)]
pub struct SeenEntity {
    pub entity: EntityId,
    pub name: String,
    pub kind: EntityKind,
    pub health: f32,
    pub tick: u64,
}

impl SeenEntity {
    pub fn seen_within(&self, now: u64, ticks: u64) -> bool {
        self.tick + ticks > now
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contradiction {
    pub pos: Pos,
    pub stored: Occupancy,
    pub observed: Occupancy,
}

#[derive(Clone, Debug)]
pub struct Map {
    bounds: IntRect,
    cells: Vec<Cell>,
    level: i32,
    format_version: i32,
    level_votes: Vec<i32>,
    inherited_votes: Vec<i32>,
    units: BTreeMap<Pos, SeenEntity>,
    matched: BTreeSet<usize>,
    hash_index: Option<HashIndex>,
    archive_id: u64,
}

impl Map {
    pub fn new(level: i32) -> Self {
        Map {
            bounds: IntRect::EMPTY,
            cells: Vec::new(),
            level,
            format_version: FORMAT_VERSION,
            level_votes: Vec::new(),
            inherited_votes: Vec::new(),
            units: BTreeMap::new(),
            matched: BTreeSet::new(),
            hash_index: None,
            archive_id: 0,
        }
    }

    /// A fresh level map whose identity starts from carried-over votes.
    pub fn with_inherited_votes(level: i32, inherited_votes: Vec<i32>) -> Self {
        let mut map = Map::new(level);
        map.inherited_votes = inherited_votes;
        map.update_votes();
        map
    }

    pub fn bounds(&self) -> IntRect {
        self.bounds
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn format_version(&self) -> i32 {
        self.format_version
    }

    pub fn archive_id(&self) -> u64 {
        self.archive_id
    }

    pub fn set_archive_id(&mut self, archive_id: u64) {
        self.archive_id = archive_id;
    }

    pub fn level_votes(&self) -> &[i32] {
        &self.level_votes
    }

    pub fn inherited_votes(&self) -> &[i32] {
        &self.inherited_votes
    }

    /// Every vote this map holds about its own level, live ones first.
    pub fn all_votes(&self) -> impl Iterator<Item = i32> + '_ {
        self.level_votes.iter().chain(self.inherited_votes.iter()).copied()
    }

    pub fn get(&self, pos: Pos) -> Cell {
        self.bounds.index_of(pos).map_or_else(Cell::default, |idx| self.cells[idx])
    }

    pub fn has_any_info_about(&self, pos: Pos) -> bool {
        self.bounds.contains(pos)
    }

    pub fn cells(&self) -> impl Iterator<Item = (Pos, &Cell)> + '_ {
        self.bounds.positions().zip(self.cells.iter())
    }

    /// Grows bounds to cover `rect`, keeping every stored cell at its coordinate.
    pub fn expand(&mut self, rect: IntRect) {
        let new_bounds = self.bounds.union(&rect);
        if new_bounds == self.bounds {
            return;
        }
        let mut cells = vec![Cell::default(); new_bounds.area()];
        for (pos, cell) in self.bounds.positions().zip(self.cells.iter()) {
            if let Some(idx) = new_bounds.index_of(pos) {
                cells[idx] = *cell;
            }
        }
        self.cells = cells;
        self.bounds = new_bounds;
        self.hash_index = None;
    }

    /// Applies `f` to the cell at `pos`, growing the map if `pos` lies outside it.
    pub fn update<R>(&mut self, pos: Pos, f: impl FnOnce(&mut Cell) -> R) -> R {
        self.expand(IntRect::point(pos));
        self.hash_index = None;
        let Some(idx) = self.bounds.index_of(pos) else {
            unreachable!("expand must cover the updated position");
        };
        let cell = &mut self.cells[idx];
        let result = f(cell);
        debug_assert!(
            !(cell.occupancy.knowledge > Knowledge::Unknown
                && cell.occupancy.value == Occupancy::Unknown),
            "trusted occupancy must carry a concrete value at {pos:?}"
        );
        result
    }

    pub fn set_visited(&mut self, pos: Pos) {
        self.update(pos, |cell| cell.visited = HistoricalValue::known(true));
    }

    pub fn set_exit(&mut self, pos: Pos, has_exit: bool) {
        self.update(pos, |cell| cell.exit = HistoricalValue::known(has_exit));
    }

    /// Writes a live observation window into the map as `Known` occupancy.
    ///
    /// `observed` is row-major over `window`. A cell whose stored occupancy is
    /// concrete but differs from the observation is a contradiction: every
    /// historical fact in the map is discarded before the live value is written.
    /// Visible-entity records inside the window are cleared.
    pub fn absorb(&mut self, window: IntRect, observed: &[Occupancy]) -> Vec<Contradiction> {
        debug_assert_eq!(window.area(), observed.len(), "observation must cover its window");
        self.expand(window);
        let mut contradictions = Vec::new();
        for (pos, &value) in window.positions().zip(observed.iter()) {
            self.units.remove(&pos);
            let stored = self.get(pos).occupancy.value;
            if stored != value && stored != Occupancy::Unknown {
                debug!(?pos, ?stored, observed = ?value, "live observation contradicts map");
                contradictions.push(Contradiction { pos, stored, observed: value });
                self.clear_historical();
            }
            self.update(pos, |cell| cell.occupancy = HistoricalValue::known(value));
        }
        contradictions
    }

    /// Drops every matched-in fact along with match and vote bookkeeping.
    pub fn clear_historical(&mut self) {
        for cell in &mut self.cells {
            cell.forget_historical();
        }
        self.matched.clear();
        self.level_votes.clear();
        self.hash_index = None;
        self.update_votes();
    }

    pub fn has_historical(&self) -> bool {
        self.cells.iter().any(Cell::has_historical)
    }

    /// One point per visited cell and 1000 per exit cell.
    pub fn exploration_score(&self) -> u32 {
        self.cells
            .iter()
            .map(|cell| u32::from(cell.visited.value) + 1000 * u32::from(cell.exit.value))
            .sum()
    }

    /// Re-derives `level` as the rounded mean of every vote, if there are any.
    pub fn update_votes(&mut self) {
        let (sum, count) = self.all_votes().fold((0i64, 0i64), |(s, c), v| (s + i64::from(v), c + 1));
        if count > 0 {
            self.level = (sum as f64 / count as f64).round_ties_even() as i32;
        }
    }

    /// Shrinks bounds to the tightest rectangle around cells that hold any knowledge.
    pub fn trim(&mut self) {
        let mut tight = IntRect::EMPTY;
        for (pos, cell) in self.cells() {
            if cell.has_any_knowledge() {
                tight = tight.union(&IntRect::point(pos));
            }
        }
        if tight == self.bounds {
            return;
        }
        let cells = tight.positions().map(|pos| self.get(pos)).collect();
        self.cells = cells;
        self.bounds = tight;
        self.hash_index = None;
    }

    /// Turns a stored map into a read-only match candidate: first-hand facts become
    /// historical, facts that were already historical are dropped.
    pub fn into_match_candidate(mut self) -> Map {
        if self.format_version >= 1 {
            for cell in &mut self.cells {
                *cell = cell.demoted();
            }
        }
        self.units.clear();
        self.matched.clear();
        self.hash_index = None;
        self.trim();
        self
    }

    /// Merges `other` into this map as historical data, where `other`'s cell at
    /// `p + offset` lines up with this map's cell at `p`.
    pub fn merge_historical(&mut self, other: &Map, offset: Pos) {
        self.expand(other.bounds.offset(offset.negate()));
        if other.format_version >= 4 {
            self.level_votes.push(other.level);
            self.level_votes.extend_from_slice(&other.inherited_votes);
        }
        for (pos, cell) in self.bounds.positions().zip(self.cells.iter_mut()) {
            cell.merge_historical(&other.get(pos.translate(offset)));
        }
        self.hash_index = None;
        self.update_votes();
    }

    pub fn is_matched(&self, candidate: usize) -> bool {
        self.matched.contains(&candidate)
    }

    pub fn mark_matched(&mut self, candidate: usize) {
        self.matched.insert(candidate);
    }

    pub fn unit_at(&self, pos: Pos) -> Option<&SeenEntity> {
        self.units.get(&pos)
    }

    #[cfg(test)]
    pub(crate) fn units(&self) -> impl Iterator<Item = (Pos, &SeenEntity)> + '_ {
        self.units.iter().map(|(pos, seen)| (*pos, seen))
    }

    pub fn record_unit(&mut self, pos: Pos, seen: SeenEntity) {
        self.units.insert(pos, seen);
    }

    pub fn retain_units(&mut self, mut keep: impl FnMut(Pos, &SeenEntity) -> bool) {
        self.units.retain(|pos, seen| keep(*pos, seen));
    }
}
