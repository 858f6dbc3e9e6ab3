use slotmap::SlotMap;

use crate::map::Map;
use crate::types::{EntityId, EntityKind, ItemId, LogEvent, Pos};

#[derive(Clone, Debug, PartialEq)]
pub struct TrackedEntity {
    pub name: String,
    pub kind: EntityKind,
    pub pos: Pos,
    pub health: f32,
    pub max_seen_health: f32,
    pub last_seen_tick: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedItem {
    pub name: String,
    pub equipped: bool,
}

impl TrackedItem {
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Run-level aggregate: every level map of the run plus tracked objects.
#[derive(Clone, Debug)]
pub struct GameState {
    /// Level visits of this run in order; not the true level numbers.
    pub maps: Vec<Map>,
    pub current_map: usize,
    pub player_pos: Pos,
    pub tick: u64,
    pub entities: SlotMap<EntityId, TrackedEntity>,
    pub items: SlotMap<ItemId, TrackedItem>,
    pub self_id: Option<EntityId>,
    /// Raw server event strings, append-only.
    pub events: Vec<String>,
    pub log: Vec<LogEvent>,
}

impl GameState {
    pub fn new(first_map: Map) -> Self {
        GameState {
            maps: vec![first_map],
            current_map: 0,
            player_pos: Pos::ORIGIN,
            tick: 0,
            entities: SlotMap::with_key(),
            items: SlotMap::with_key(),
            self_id: None,
            events: Vec::new(),
            log: Vec::new(),
        }
    }

    pub fn active_map(&self) -> &Map {
        &self.maps[self.current_map]
    }

    pub fn active_map_mut(&mut self) -> &mut Map {
        &mut self.maps[self.current_map]
    }

    pub fn self_entity(&self) -> Option<&TrackedEntity> {
        self.self_id.and_then(|id| self.entities.get(id))
    }

    pub fn has_item(&self, name: &str) -> bool {
        self.items.values().any(|item| item.is_named(name))
    }
}
