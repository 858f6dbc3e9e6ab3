use std::collections::{BTreeSet, VecDeque};

use delver_core::{
    Agent, AgentConfig, Direction, Knowledge, LogEvent, Observation, Occupancy, Pos, parse_raw_observation,
};
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use serde_json::json;
use tempfile::tempdir;

const VIEW_RADIUS: i32 = 4;
const AGENT_NAME: &str = "voxelbot";

/// Server stand-in: a walled random grid the agent walks through.
struct Dungeon {
    width: i32,
    height: i32,
    walls: Vec<bool>,
    exit: Option<Pos>,
    player: Pos,
}

impl Dungeon {
    fn generate(seed: u64, width: i32, height: i32) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut walls = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let border = x == 0 || y == 0 || x == width - 1 || y == height - 1;
                walls.push(border || rng.next_u64() % 100 < 18);
            }
        }
        Dungeon { width, height, walls, exit: None, player: Pos::ORIGIN }
    }

    fn is_wall(&self, p: Pos) -> bool {
        if p.x < 0 || p.y < 0 || p.x >= self.width || p.y >= self.height {
            return true;
        }
        self.walls[(p.y * self.width + p.x) as usize]
    }

    fn reachable_from(&self, start: Pos) -> BTreeSet<Pos> {
        let mut seen = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(p) = queue.pop_front() {
            for dir in Direction::ALL {
                let next = p.step(dir);
                if !self.is_wall(next) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// A free cell, picked by `seed`, from which a sizeable area is reachable.
    fn roomy_start(&self, seed: u64) -> Pos {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        loop {
            let p = Pos::new(
                (rng.next_u64() % self.width as u64) as i32,
                (rng.next_u64() % self.height as u64) as i32,
            );
            if !self.is_wall(p) && self.reachable_from(p).len() > 80 {
                return p;
            }
        }
    }

    fn respond(&mut self, step: Option<Direction>) -> Observation {
        let mut events = Vec::new();
        if let Some(dir) = step {
            let target = self.player.step(dir);
            if !self.is_wall(target) {
                self.player = target;
                events.push(if self.exit == Some(target) { "you fell down a ladder" } else { "you moved" });
            }
        }
        let surrounding: Vec<String> = (-VIEW_RADIUS..=VIEW_RADIUS)
            .map(|dy| {
                (-VIEW_RADIUS..=VIEW_RADIUS)
                    .map(|dx| if self.is_wall(self.player.translate(Pos::new(dx, dy))) { '#' } else { '.' })
                    .collect()
            })
            .collect();
        let body = json!({
            "itemNames": [],
            "surrounding": surrounding,
            "radius": VIEW_RADIUS,
            "players": [{"relativePos": {"row": 0, "col": 0}, "name": AGENT_NAME, "health": 10}],
            "monsters": [],
            "equipped": [],
            "events": events,
        });
        let parsed = parse_raw_observation(&body.to_string()).unwrap();
        assert!(parsed.unexpected_keys.is_empty());
        Observation::from_raw(parsed.raw, step).unwrap()
    }
}

fn run(agent: &mut Agent, dungeon: &mut Dungeon, ticks: u32, mut stop: impl FnMut(&Agent) -> bool) -> bool {
    let mut step = None;
    for _ in 0..ticks {
        let obs = dungeon.respond(step);
        agent.apply_observation(&obs).unwrap();
        if stop(agent) {
            return true;
        }
        step = agent.decide_next_move().step;
    }
    false
}

fn config(seed: u64) -> AgentConfig {
    AgentConfig { agent_name: AGENT_NAME.to_string(), seed, ..AgentConfig::default() }
}

#[test]
fn exploration_builds_a_faithful_map() {
    let mut dungeon = Dungeon::generate(7, 20, 20);
    let start = dungeon.roomy_start(1);
    dungeon.player = start;
    let mut agent = Agent::with_pool(config(11), Vec::new());

    run(&mut agent, &mut dungeon, 2500, |_| false);

    let map = agent.state().active_map();
    let mut visited = 0;
    for (pos, cell) in map.cells() {
        if cell.occupancy.knowledge == Knowledge::Known {
            let wall = dungeon.is_wall(pos.translate(start));
            assert_eq!(cell.occupancy.value == Occupancy::Occupied, wall, "cell {pos:?} disagrees");
        }
        if cell.visited.value {
            visited += 1;
        }
    }
    let reachable = dungeon.reachable_from(start).len();
    assert!(visited * 10 >= reachable * 9, "visited {visited} of {reachable} reachable cells");
    assert_eq!(agent.state().player_pos.translate(start), dungeon.player);
}

#[test]
fn stored_level_is_recognized_on_a_later_run() {
    let dir = tempdir().unwrap();
    let mut dungeon = Dungeon::generate(21, 20, 20);
    let first_start = dungeon.roomy_start(2);
    dungeon.player = first_start;
    let mut first = Agent::new(AgentConfig { maps_dir: Some(dir.path().to_path_buf()), ..config(3) });
    run(&mut first, &mut dungeon, 2500, |_| false);

    let second_start = dungeon.roomy_start(99);
    dungeon.player = second_start;
    let mut second = Agent::new(AgentConfig { maps_dir: Some(dir.path().to_path_buf()), ..config(4) });
    assert_eq!(second.pool().len(), 1);

    let merged = run(&mut second, &mut dungeon, 600, |agent| {
        agent.log().iter().any(|event| matches!(event, LogEvent::HistoricalMerged { .. }))
    });

    assert!(merged, "the second run never matched the stored level");
    let offset = second
        .log()
        .iter()
        .find_map(|event| match event {
            LogEvent::HistoricalMerged { offset, .. } => Some(*offset),
            _ => None,
        })
        .unwrap();
    assert_eq!(offset, first_start.delta_to(second_start));
    let map = second.state().active_map();
    assert!(map.cells().any(|(_, cell)| cell.occupancy.knowledge == Knowledge::Historical));

    // Walking over cells the first run visited must not discard the merged level.
    run(&mut second, &mut dungeon, 40, |_| false);
    let map = second.state().active_map();
    assert!(map.cells().any(|(_, cell)| cell.visited.knowledge == Knowledge::Historical));
    assert!(!second.log().iter().any(|event| matches!(event, LogEvent::StaleHistoricalExit { .. })));
}

#[test]
fn exploring_onto_a_ladder_descends() {
    let mut dungeon = Dungeon::generate(5, 20, 20);
    let start = dungeon.roomy_start(8);
    let exit = dungeon
        .reachable_from(start)
        .into_iter()
        .filter(|p| p.distance_squared(start) >= 9)
        .min_by_key(|p| p.distance_squared(start))
        .unwrap();
    dungeon.exit = Some(exit);
    dungeon.player = start;
    let mut agent = Agent::with_pool(config(1), Vec::new());

    let descended = run(&mut agent, &mut dungeon, 2000, |agent| agent.state().maps.len() > 1);

    assert!(descended);
    assert_eq!(agent.state().active_map().level(), 1);
    assert!(agent.log().contains(&LogEvent::LevelDescended { level: 1 }));
    let previous = &agent.state().maps[0];
    assert!(previous.get(exit.translate(start.negate())).exit.value);
}

#[test]
fn identical_inputs_produce_identical_hashes() {
    let hash_after = |seed: u64| {
        let mut dungeon = Dungeon::generate(13, 20, 20);
        dungeon.player = dungeon.roomy_start(5);
        let mut agent = Agent::with_pool(config(seed), Vec::new());
        run(&mut agent, &mut dungeon, 200, |_| false);
        agent.snapshot_hash()
    };
    assert_eq!(hash_after(9), hash_after(9));
}
