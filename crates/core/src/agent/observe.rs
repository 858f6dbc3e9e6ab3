//! Per-tick observation pipeline.
//! This module exists to fold one sensor record into tracked objects and the map.
//! It does not own move selection; see `policy`.

use tracing::{debug, info, warn};

use super::{Agent, FRESH_RUN_VOTES, TickReport};
use crate::map::SeenEntity;
use crate::matcher::{LevelMatcher, MatchHit, MatchProgress};
use crate::observation::{EVENT_DESCENDED, EVENT_MOVED, Observation, ObservationError, ObservedEntity};
use crate::rect::IntRect;
use crate::reconcile::{Disposition, reconcile};
use crate::state::{TrackedEntity, TrackedItem};
use crate::types::{LogEvent, Pos};

/// Two sightings farther apart than this (squared) are different entities.
const MAX_TRACKING_DISTANCE_SQUARED: i64 = 4;

impl Agent {
    /// Folds one observation into the agent's state.
    ///
    /// A server-reported error leaves every piece of state untouched.
    pub fn apply_observation(&mut self, obs: &Observation) -> Result<TickReport, ObservationError> {
        if let Some(message) = &obs.error {
            warn!(error = %message, "server reported an error, tick discarded");
            return Err(ObservationError::ServerReported(message.clone()));
        }
        let expected = obs.window(Pos::ORIGIN).area();
        if obs.grid.len() != expected {
            return Err(ObservationError::GridHeight { rows: obs.grid.len(), expected });
        }

        let descended = obs.has_event(EVENT_DESCENDED);
        if let Some(direction) = obs.issued_move
            && (descended || obs.has_event(EVENT_MOVED))
        {
            self.state.player_pos = self.state.player_pos.step(direction);
        }
        self.state.tick += 1;
        let mut report = TickReport { tick: self.state.tick, ..TickReport::default() };

        let had_items = !self.state.items.is_empty();
        self.reconcile_items(obs);
        let born_event = format!("{} was born", self.config.agent_name);
        if (had_items && self.state.items.is_empty()) || obs.has_event(&born_event) {
            self.restart_run();
            report.restarted = true;
        }

        self.reconcile_entities(obs);

        if descended {
            self.descend();
            report.descended = true;
        }

        self.reconcile_equipped(obs);

        let player_pos = self.state.player_pos;
        let window = obs.window(player_pos);
        let margin = self.config.view_margin;
        self.state.active_map_mut().expand(window.expand(margin));

        for text in &obs.events {
            self.state.log.push(LogEvent::ServerEvent { text: text.clone() });
        }
        self.state.events.extend(obs.events.iter().cloned());

        report.contradictions = self.state.active_map_mut().absorb(window, &obs.grid);
        for c in &report.contradictions {
            warn!(pos = ?c.pos, stored = ?c.stored, observed = ?c.observed, "map contradiction");
            self.state.log.push(LogEvent::Contradiction { pos: c.pos, stored: c.stored, observed: c.observed });
        }
        self.record_sightings(window);

        let map = self.state.active_map_mut();
        map.set_visited(player_pos);
        let exit = map.get(player_pos).exit;
        if exit.is_historical() && exit.value {
            debug!(pos = ?player_pos, "historical exit is not here");
            map.clear_historical();
            self.state.log.push(LogEvent::StaleHistoricalExit { pos: player_pos });
        }
        self.state.active_map_mut().set_exit(player_pos, false);

        report.merges = self.advance_matcher();

        self.state.self_id = self.state.active_map().unit_at(player_pos).map(|seen| seen.entity);
        self.persist_active_map();
        Ok(report)
    }

    fn reconcile_items(&mut self, obs: &Observation) {
        reconcile(
            &mut self.state.items,
            &obs.item_names,
            |item, name: &String| equipped_first(item, name),
            |name| Some(TrackedItem { name: name.clone(), equipped: false }),
            |_, _, _| {},
            |_, _| Disposition::Remove,
        );
    }

    fn reconcile_entities(&mut self, obs: &Observation) {
        let player_pos = self.state.player_pos;
        let tick = self.state.tick;
        let absolute = |seen: &ObservedEntity| player_pos.translate(seen.offset);
        reconcile(
            &mut self.state.entities,
            &obs.entities,
            |tracked, seen| {
                let distance = tracked.pos.distance_squared(absolute(seen));
                (tracked.name == seen.name && tracked.kind == seen.kind && distance < MAX_TRACKING_DISTANCE_SQUARED)
                    .then_some(distance as f32)
            },
            |seen| {
                Some(TrackedEntity {
                    name: seen.name.clone(),
                    kind: seen.kind,
                    pos: absolute(seen),
                    health: seen.health,
                    max_seen_health: seen.health,
                    last_seen_tick: tick,
                })
            },
            |_, tracked, seen| {
                tracked.pos = absolute(seen);
                tracked.health = seen.health;
                tracked.max_seen_health = tracked.max_seen_health.max(seen.health);
                tracked.last_seen_tick = tick;
            },
            |_, _| Disposition::Remove,
        );
    }

    fn reconcile_equipped(&mut self, obs: &Observation) {
        let report = reconcile(
            &mut self.state.items,
            &obs.equipped,
            |item, name: &String| equipped_first(item, name),
            |_| None,
            |_, item, _| item.equipped = true,
            |_, item| {
                item.equipped = false;
                Disposition::Keep
            },
        );
        for idx in report.unplaced {
            warn!(item = %obs.equipped[idx], "equipped item is not in the inventory");
        }
    }

    fn restart_run(&mut self) {
        info!(tick = self.state.tick, "run restarted");
        let self_id = self.state.self_id;
        self.state.entities.retain(|id, _| Some(id) == self_id);
        let map = self.new_archive_map(0, FRESH_RUN_VOTES.to_vec());
        self.state.maps = vec![map];
        self.state.current_map = 0;
        if let Some(archive) = &self.archive {
            match archive.load_pool() {
                Ok(pool) => self.pool = pool,
                Err(err) => warn!(error = %err, "could not reload historical maps"),
            }
        }
        self.matcher = None;
        self.state.log.push(LogEvent::RunRestarted);
    }

    fn descend(&mut self) {
        let player_pos = self.state.player_pos;
        self.state.active_map_mut().set_exit(player_pos, true);
        self.persist_active_map();

        let finished = self.state.active_map();
        let level = finished.level() + 1;
        let votes = finished.all_votes().map(|vote| vote + 1).collect();
        let map = self.new_archive_map(level, votes);
        self.state.maps.push(map);
        self.state.current_map = self.state.maps.len() - 1;
        self.matcher = None;
        info!(level, "descended");
        self.state.log.push(LogEvent::LevelDescended { level });
    }

    /// Drops sightings now inside `window`, then records every tracked entity.
    fn record_sightings(&mut self, window: IntRect) {
        let tick = self.state.tick;
        let entities = &self.state.entities;
        let map = &mut self.state.maps[self.state.current_map];
        map.retain_units(|pos, seen| {
            let current = entities.get(seen.entity).map_or(pos, |tracked| tracked.pos);
            !window.contains(current)
        });
        for (id, tracked) in entities {
            map.record_unit(
                tracked.pos,
                SeenEntity {
                    entity: id,
                    name: tracked.name.clone(),
                    kind: tracked.kind,
                    health: tracked.health,
                    tick,
                },
            );
        }
    }

    fn advance_matcher(&mut self) -> Vec<MatchHit> {
        let mut merges = Vec::new();
        let mut finished = false;
        let matcher = self.matcher.get_or_insert_with(|| LevelMatcher::new(self.config.match_radius));
        let map = &mut self.state.maps[self.state.current_map];
        for _ in 0..self.config.matcher_steps_per_tick {
            match matcher.step(map, &mut self.pool, &mut self.rng) {
                MatchProgress::Pending => {}
                MatchProgress::Merged(hit) => merges.push(hit),
                MatchProgress::Finished => {
                    finished = true;
                    break;
                }
            }
        }
        // A finished matcher is rebuilt next tick with fresh probes.
        if finished {
            self.matcher = None;
        }
        for hit in &merges {
            self.state.log.push(LogEvent::HistoricalMerged {
                candidate: hit.candidate,
                offset: hit.offset,
                matching: hit.matching,
                score: hit.score,
            });
        }
        merges
    }
}

/// Same-named items match equipped copies first.
fn equipped_first(item: &TrackedItem, name: &str) -> Option<f32> {
    item.is_named(name).then_some(if item.equipped { 0.0 } else { 1.0 })
}
