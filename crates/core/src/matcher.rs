//! Incremental alignment of the active level map against stored maps.
//! This module exists to turn the long-running match search into a resumable state
//! machine that does a bounded slice of work per `step`.
//! It does not own the candidate pool, persistence, or when matching is restarted.

use std::mem;

use rand_chacha::{ChaCha8Rng, rand_core::Rng};
use tracing::{debug, info};

use crate::map::Map;
use crate::types::Pos;

/// Rounds of probe-then-scan per matcher lifetime.
pub const MATCH_ROUNDS: u32 = 5;
/// Attempts at finding a probe window that contains any trusted occupancy.
pub const PROBE_ATTEMPTS: u32 = 10;
/// Distance kept between a probe anchor and the map edge.
pub const PROBE_MARGIN: i32 = 4;
/// A verified alignment must agree on strictly more cells than this.
pub const MIN_MATCHING_CELLS: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchHit {
    pub candidate: usize,
    /// Candidate cell `p + offset` lines up with active cell `p`.
    pub offset: Pos,
    pub matching: u32,
    pub score: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MatchProgress {
    Pending,
    Merged(MatchHit),
    Finished,
}

#[derive(Clone, Debug)]
enum Phase {
    Probe { round: u32 },
    Scan { round: u32, probe: Pos, hash: i32, order: Vec<(usize, u32)>, cursor: usize, best: Option<MatchHit> },
    Done,
}

#[derive(Clone, Debug)]
pub struct LevelMatcher {
    radius: i32,
    phase: Phase,
}

impl LevelMatcher {
    pub fn new(radius: i32) -> Self {
        LevelMatcher { radius, phase: Phase::Probe { round: 0 } }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }

    /// Advances by one checkpoint: a probe selection or one candidate scan.
    pub fn step(&mut self, active: &mut Map, pool: &mut [Map], rng: &mut ChaCha8Rng) -> MatchProgress {
        match mem::replace(&mut self.phase, Phase::Done) {
            Phase::Done => MatchProgress::Finished,
            Phase::Probe { round } => {
                let Some((probe, hash)) = pick_probe(active, self.radius, rng) else {
                    debug!(round, "no informative probe window, matcher gives up");
                    return MatchProgress::Finished;
                };
                let mut order: Vec<(usize, u32)> =
                    pool.iter().enumerate().map(|(idx, map)| (idx, map.exploration_score())).collect();
                order.sort_by(|a, b| b.1.cmp(&a.1));
                self.phase = Phase::Scan { round, probe, hash, order, cursor: 0, best: None };
                MatchProgress::Pending
            }
            Phase::Scan { round, probe, hash, order, mut cursor, mut best } => {
                while let Some(&(candidate, exploration)) = order.get(cursor) {
                    cursor += 1;
                    if active.is_matched(candidate) {
                        continue;
                    }
                    if let Some(hit) =
                        best_alignment(active, pool, candidate, exploration, probe, hash, self.radius)
                        && best.is_none_or(|b| hit.score > b.score)
                    {
                        best = Some(hit);
                    }
                    self.phase = Phase::Scan { round, probe, hash, order, cursor, best };
                    return MatchProgress::Pending;
                }

                if round + 1 < MATCH_ROUNDS {
                    self.phase = Phase::Probe { round: round + 1 };
                }
                let Some(hit) = best else {
                    return MatchProgress::Pending;
                };
                info!(
                    candidate = hit.candidate,
                    offset = ?hit.offset,
                    matching = hit.matching,
                    score = hit.score,
                    "merging historical map"
                );
                active.mark_matched(hit.candidate);
                active.merge_historical(&pool[hit.candidate], hit.offset);
                MatchProgress::Merged(hit)
            }
        }
    }

    /// Steps until the matcher finishes, collecting every merge.
    pub fn run_to_end(&mut self, active: &mut Map, pool: &mut [Map], rng: &mut ChaCha8Rng) -> Vec<MatchHit> {
        let mut hits = Vec::new();
        loop {
            match self.step(active, pool, rng) {
                MatchProgress::Pending => {}
                MatchProgress::Merged(hit) => hits.push(hit),
                MatchProgress::Finished => return hits,
            }
        }
    }
}

fn pick_probe(active: &Map, radius: i32, rng: &mut ChaCha8Rng) -> Option<(Pos, i32)> {
    let bounds = active.bounds();
    for _ in 0..PROBE_ATTEMPTS {
        let probe = Pos {
            y: sample_range(rng, bounds.ymin + PROBE_MARGIN, bounds.ymax - PROBE_MARGIN),
            x: sample_range(rng, bounds.xmin + PROBE_MARGIN, bounds.xmax - PROBE_MARGIN),
        };
        let hash = active.window_hash(probe, radius);
        if hash != 0 {
            return Some((probe, hash));
        }
    }
    None
}

/// Uniform in `lo..hi`, collapsing to `lo` when the range is empty.
fn sample_range(rng: &mut ChaCha8Rng, lo: i32, hi: i32) -> i32 {
    if hi <= lo {
        return lo;
    }
    let span = (i64::from(hi) - i64::from(lo)) as u64;
    lo + (rng.next_u64() % span) as i32
}

fn best_alignment(
    active: &Map,
    pool: &mut [Map],
    candidate: usize,
    exploration: u32,
    probe: Pos,
    hash: i32,
    radius: i32,
) -> Option<MatchHit> {
    let anchors = pool[candidate].matching_anchors(hash, radius);
    let other = &pool[candidate];
    let mut best: Option<MatchHit> = None;
    for anchor in anchors {
        let offset = probe.delta_to(anchor);
        let Some(matching) = verify_overlap(active, other, offset) else {
            continue;
        };
        if matching <= MIN_MATCHING_CELLS {
            continue;
        }
        let score = matching as f32 + 0.1 * exploration as f32;
        if best.is_none_or(|b| score > b.score) {
            best = Some(MatchHit { candidate, offset, matching, score });
        }
    }
    best
}

/// Counts agreeing cells where both maps trust a concrete occupancy; any
/// disagreement rejects the alignment.
pub fn verify_overlap(active: &Map, other: &Map, offset: Pos) -> Option<u32> {
    let overlap = active.bounds().offset(offset).intersection(&other.bounds()).offset(offset.negate());
    let mut matching = 0;
    for pos in overlap.positions() {
        let ours = active.get(pos).comparable_occupancy();
        let theirs = other.get(pos.translate(offset)).comparable_occupancy();
        if let (Some(a), Some(b)) = (ours, theirs) {
            if a != b {
                return None;
            }
            matching += 1;
        }
    }
    Some(matching)
}
