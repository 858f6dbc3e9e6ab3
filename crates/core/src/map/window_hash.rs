//! Separable base-31 rolling fingerprints over square windows of occupancy.
//! This module exists so the matcher can look up candidate alignments in O(1) per anchor.
//! It does not verify candidates; callers must compare cells before trusting a hit.

use super::Map;
use crate::cell::Cell;
use crate::types::Pos;

const BASE: i32 = 31;

/// Precomputed window hashes for every anchor that can see a cell of the map.
#[derive(Clone, Debug)]
pub(super) struct HashIndex {
    radius: i32,
    origin: Pos,
    width: usize,
    hashes: Vec<i32>,
}

impl HashIndex {
    fn anchor(&self, idx: usize) -> Pos {
        let tx = (idx % self.width) as i32;
        let ty = (idx / self.width) as i32;
        Pos { y: self.origin.y + ty, x: self.origin.x + tx }
    }

    fn height(&self) -> usize {
        self.hashes.len() / self.width
    }
}

fn term(cell: &Cell) -> i32 {
    cell.comparable_occupancy().map_or(0, |value| value.tag() + 1)
}

impl Map {
    /// Fingerprint of the `(2r+1)²` window centered at `center`, computed directly.
    pub fn window_hash(&self, center: Pos, radius: i32) -> i32 {
        let mut hash = 0i32;
        for y in center.y - radius..=center.y + radius {
            for x in center.x - radius..=center.x + radius {
                hash = hash.wrapping_mul(BASE).wrapping_add(term(&self.get(Pos { y, x })));
            }
        }
        hash
    }

    /// Every window center whose fingerprint equals `hash`, scanning columns outermost.
    pub fn matching_anchors(&mut self, hash: i32, radius: i32) -> Vec<Pos> {
        let index = self.hash_index(radius);
        let height = index.height();
        let mut anchors = Vec::new();
        for tx in 0..index.width {
            for ty in 0..height {
                let idx = ty * index.width + tx;
                if index.hashes[idx] == hash {
                    anchors.push(index.anchor(idx));
                }
            }
        }
        anchors
    }

    /// Every `(anchor, hash)` pair held by the cached index.
    pub fn window_hash_table(&mut self, radius: i32) -> Vec<(Pos, i32)> {
        let index = self.hash_index(radius);
        index.hashes.iter().enumerate().map(|(idx, hash)| (index.anchor(idx), *hash)).collect()
    }

    fn hash_index(&mut self, radius: i32) -> &HashIndex {
        if self.hash_index.as_ref().is_none_or(|index| index.radius != radius) {
            self.hash_index = Some(self.build_hash_index(radius));
        }
        match &self.hash_index {
            Some(index) => index,
            None => unreachable!("hash index was just built"),
        }
    }

    fn build_hash_index(&self, radius: i32) -> HashIndex {
        let window = 2 * radius + 1;
        let bounds = self.bounds;
        let width = (bounds.width() + window) as usize;
        let height = (bounds.height() + window) as usize;
        let row_exp = BASE.wrapping_pow(window as u32);
        let col_exp = row_exp.wrapping_pow(window as u32);

        // Row pass: each entry is the hash of the `window` cells ending at that column.
        let mut rows = vec![0i32; width * height];
        for ty in 0..height {
            let y = bounds.ymin + ty as i32;
            let mut rolling = 0i32;
            for tx in 0..width {
                let x = bounds.xmin + tx as i32;
                rolling = rolling.wrapping_mul(BASE).wrapping_add(term(&self.get(Pos { y, x })));
                let trailing = term(&self.get(Pos { y, x: x - window }));
                rolling = rolling.wrapping_sub(row_exp.wrapping_mul(trailing));
                rows[ty * width + tx] = rolling;
            }
        }

        // Column pass over the row hashes, with `row_exp` as the base.
        let mut hashes = vec![0i32; width * height];
        for tx in 0..width {
            let mut rolling = 0i32;
            for ty in 0..height {
                rolling = rolling.wrapping_mul(row_exp).wrapping_add(rows[ty * width + tx]);
                if ty >= window as usize {
                    let trailing = rows[(ty - window as usize) * width + tx];
                    rolling = rolling.wrapping_sub(col_exp.wrapping_mul(trailing));
                }
                hashes[ty * width + tx] = rolling;
            }
        }

        HashIndex {
            radius,
            origin: Pos { y: bounds.ymin - radius, x: bounds.xmin - radius },
            width,
            hashes,
        }
    }
}
