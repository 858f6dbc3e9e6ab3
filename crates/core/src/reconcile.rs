//! Greedy cost-ordered matching of fresh observation records onto tracked objects.
//! This module exists so entities, inventory, and equip state share one algorithm.
//! It does not own what a cost means or what happens to matched objects.

use std::collections::BTreeSet;

use slotmap::{Key, SlotMap};

/// What to do with a tracked object that no observation matched this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    Keep,
    Remove,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileReport<K> {
    /// `(tracked, observed index)` pairs committed by the greedy pass.
    pub matched: Vec<(K, usize)>,
    pub created: Vec<K>,
    /// Observed indices the constructor declined to turn into tracked objects.
    pub unplaced: Vec<usize>,
    pub kept: Vec<K>,
    pub removed: Vec<K>,
}

impl<K> Default for ReconcileReport<K> {
    fn default() -> Self {
        ReconcileReport {
            matched: Vec::new(),
            created: Vec::new(),
            unplaced: Vec::new(),
            kept: Vec::new(),
            removed: Vec::new(),
        }
    }
}

/// Matches `observed` records onto `tracked` objects by ascending cost.
///
/// Every compatible pair is costed, pairs are committed cheapest first with each
/// side used at most once, and equal costs resolve in observation order then
/// tracked order. Leftover observations go through `create`; `update` runs for
/// every matched or created pair. Leftover tracked objects are handed to
/// `dispose` newest first and dropped when it answers `Remove`.
pub fn reconcile<K, A, B, Cost, Create, Update, Dispose>(
    tracked: &mut SlotMap<K, A>,
    observed: &[B],
    mut cost: Cost,
    mut create: Create,
    mut update: Update,
    mut dispose: Dispose,
) -> ReconcileReport<K>
where
    K: Key + Ord,
    Cost: FnMut(&A, &B) -> Option<f32>,
    Create: FnMut(&B) -> Option<A>,
    Update: FnMut(K, &mut A, &B),
    Dispose: FnMut(K, &mut A) -> Disposition,
{
    let existing: Vec<K> = tracked.keys().collect();
    let mut pairs = Vec::new();
    for (obs_idx, record) in observed.iter().enumerate() {
        for &key in &existing {
            if let Some(c) = cost(&tracked[key], record) {
                pairs.push((c, obs_idx, key));
            }
        }
    }
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut report = ReconcileReport::default();
    let mut used_tracked = BTreeSet::new();
    let mut used_observed = vec![false; observed.len()];
    for (_, obs_idx, key) in pairs {
        if used_observed[obs_idx] || used_tracked.contains(&key) {
            continue;
        }
        used_observed[obs_idx] = true;
        used_tracked.insert(key);
        update(key, &mut tracked[key], &observed[obs_idx]);
        report.matched.push((key, obs_idx));
    }

    for (obs_idx, record) in observed.iter().enumerate() {
        if used_observed[obs_idx] {
            continue;
        }
        let Some(object) = create(record) else {
            report.unplaced.push(obs_idx);
            continue;
        };
        let key = tracked.insert(object);
        used_tracked.insert(key);
        update(key, &mut tracked[key], record);
        report.created.push(key);
    }

    for &key in existing.iter().rev() {
        if used_tracked.contains(&key) {
            continue;
        }
        let Some(object) = tracked.get_mut(key) else { continue };
        match dispose(key, object) {
            Disposition::Keep => report.kept.push(key),
            Disposition::Remove => {
                tracked.remove(key);
                report.removed.push(key);
            }
        }
    }

    report
}
