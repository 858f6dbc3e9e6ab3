//! Per-run agent: owns game state, the match pool and the decision cascade.
//! This module exists to expose the tick API consumed by transports and tools.
//! It does not own wire decoding or the binary map format.

mod equipment;
mod hash;
mod observe;
mod policy;
mod search;
mod threat;

#[cfg(test)]
mod test_support;

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::{Rng, SeedableRng};
use tracing::warn;

use crate::archive::MapArchive;
use crate::config::AgentConfig;
use crate::content;
use crate::map::{Contradiction, Map};
use crate::matcher::{LevelMatcher, MatchHit};
use crate::state::{GameState, TrackedEntity, TrackedItem};
use crate::types::{Direction, EntityId, ItemId, LogEvent, Status};
use crate::view::MapView;

pub use equipment::{EquipmentTag, classify, potion_score};

/// Levels a fresh run starts voting for.
const FRESH_RUN_VOTES: [i32; 7] = [0; 7];

/// Outcome of one `Agent::apply_observation` call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub contradictions: Vec<Contradiction>,
    pub merges: Vec<MatchHit>,
    pub descended: bool,
    pub restarted: bool,
}

/// The cascade's choice for one tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decision {
    pub status: Status,
    pub step: Option<Direction>,
    /// Items to `use` before moving, in request order.
    pub item_uses: Vec<String>,
}

pub struct Agent {
    config: AgentConfig,
    state: GameState,
    pool: Vec<Map>,
    archive: Option<MapArchive>,
    matcher: Option<LevelMatcher>,
    rng: ChaCha8Rng,
    status: Status,
}

impl Agent {
    /// Builds an agent and loads the historical pool from `config.maps_dir`.
    pub fn new(config: AgentConfig) -> Self {
        let archive = config.maps_dir.clone().map(MapArchive::open);
        let pool = match archive.as_ref().map(MapArchive::load_pool) {
            Some(Ok(pool)) => pool,
            Some(Err(err)) => {
                warn!(error = %err, "could not load historical maps");
                Vec::new()
            }
            None => Vec::new(),
        };
        let mut agent = Self::with_pool(config, pool);
        agent.archive = archive;
        agent
    }

    /// Builds an agent with an explicit candidate pool and no persistence.
    pub fn with_pool(config: AgentConfig, pool: Vec<Map>) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let state = GameState::new(fresh_map(0, FRESH_RUN_VOTES.to_vec(), &mut rng));
        Agent { config, state, pool, archive: None, matcher: None, rng, status: Status::Idle }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn pool(&self) -> &[Map] {
        &self.pool
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn log(&self) -> &[LogEvent] {
        &self.state.log
    }

    pub fn current_map_view(&self) -> MapView {
        MapView::of(self.state.active_map(), Some(self.state.player_pos))
    }

    pub fn tracked_entities(&self) -> impl Iterator<Item = (EntityId, &TrackedEntity)> + '_ {
        self.state.entities.iter()
    }

    pub fn tracked_items(&self) -> impl Iterator<Item = (ItemId, &TrackedItem)> + '_ {
        self.state.items.iter()
    }

    /// Flavor lines for the current status; UI picks one.
    pub fn narration(&self) -> &'static [&'static str] {
        content::narration(self.status)
    }

    fn set_status(&mut self, status: Status, step: Option<Direction>) {
        if self.status != status {
            self.state.log.push(LogEvent::StatusChanged { status, step });
        }
        self.status = status;
    }

    fn new_archive_map(&mut self, level: i32, inherited_votes: Vec<i32>) -> Map {
        fresh_map(level, inherited_votes, &mut self.rng)
    }

    fn persist_active_map(&self) {
        let Some(archive) = &self.archive else {
            return;
        };
        if let Err(err) = archive.save(self.state.current_map, self.state.active_map()) {
            warn!(error = %err, "failed to persist map");
        }
    }
}

fn fresh_map(level: i32, inherited_votes: Vec<i32>, rng: &mut ChaCha8Rng) -> Map {
    let mut map = Map::with_inherited_votes(level, inherited_votes);
    map.set_archive_id(rng.next_u64());
    map
}
