use std::collections::BTreeMap;

use anyhow::{Context, Result, bail, ensure};
use clap::Parser;
use delver_core::{
    Agent, AgentConfig, Direction, Knowledge, Observation, Occupancy, Pos, parse_raw_observation,
};
use rand_chacha::{
    ChaCha8Rng,
    rand_core::{Rng, SeedableRng},
};
use serde_json::json;

const AGENT_NAME: &str = "fuzzbot";
const PLAYER_HEALTH: i32 = 10;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    #[arg(short, long, default_value_t = 1000)]
    ticks: u32,
    #[arg(long, default_value_t = 24)]
    size: i32,
    #[arg(long, default_value_t = 4)]
    radius: i32,
}

/// A walled random level with one ladder and a few stationary monsters.
struct Level {
    size: i32,
    walls: Vec<bool>,
    exit: Pos,
    monsters: BTreeMap<Pos, i32>,
}

impl Level {
    fn generate(rng: &mut ChaCha8Rng, size: i32) -> Self {
        let mut walls = Vec::with_capacity((size * size) as usize);
        for y in 0..size {
            for x in 0..size {
                let border = x == 0 || y == 0 || x == size - 1 || y == size - 1;
                walls.push(border || rng.next_u64() % 100 < 20);
            }
        }
        let mut level = Level { size, walls, exit: Pos::ORIGIN, monsters: BTreeMap::new() };
        level.exit = level.random_floor(rng);
        for _ in 0..3 {
            let pos = level.random_floor(rng);
            if pos != level.exit {
                level.monsters.insert(pos, 1 + (rng.next_u64() % 5) as i32);
            }
        }
        level
    }

    fn is_wall(&self, p: Pos) -> bool {
        if p.x < 0 || p.y < 0 || p.x >= self.size || p.y >= self.size {
            return true;
        }
        self.walls[(p.y * self.size + p.x) as usize]
    }

    fn random_floor(&self, rng: &mut ChaCha8Rng) -> Pos {
        loop {
            let p = Pos::new((rng.next_u64() % self.size as u64) as i32, (rng.next_u64() % self.size as u64) as i32);
            if !self.is_wall(p) {
                return p;
            }
        }
    }
}

struct Dungeon {
    rng: ChaCha8Rng,
    size: i32,
    radius: i32,
    level: Level,
    player: Pos,
}

impl Dungeon {
    fn new(seed: u64, size: i32, radius: i32) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut level = Level::generate(&mut rng, size);
        let player = level.random_floor(&mut rng);
        level.monsters.remove(&player);
        Dungeon { rng, size, radius, level, player }
    }

    /// Applies `step` and answers with the view from the new position.
    fn respond(&mut self, step: Option<Direction>) -> Result<Observation> {
        let mut events: Vec<String> = Vec::new();
        if let Some(dir) = step {
            let target = self.player.step(dir);
            if let Some(health) = self.level.monsters.get_mut(&target) {
                *health -= 1;
                events.push("you hit a monster".to_string());
                if *health <= 0 {
                    self.level.monsters.remove(&target);
                }
            } else if target == self.level.exit {
                self.level = Level::generate(&mut self.rng, self.size);
                self.player = self.level.random_floor(&mut self.rng);
                self.level.monsters.remove(&self.player);
                events.push("you fell down a ladder".to_string());
            } else if !self.level.is_wall(target) {
                self.player = target;
                events.push("you moved".to_string());
            }
        }

        let r = self.radius;
        let surrounding: Vec<String> = (-r..=r)
            .map(|dy| {
                (-r..=r).map(|dx| if self.level.is_wall(self.player.translate(Pos::new(dx, dy))) { '#' } else { '.' }).collect()
            })
            .collect();
        let monsters: Vec<_> = self
            .level
            .monsters
            .iter()
            .filter(|(pos, _)| (pos.x - self.player.x).abs() <= r && (pos.y - self.player.y).abs() <= r)
            .map(|(pos, health)| {
                json!({
                    "relativePos": {"row": pos.y - self.player.y, "col": pos.x - self.player.x},
                    "name": "rat",
                    "health": health,
                })
            })
            .collect();
        let body = json!({
            "itemNames": [],
            "surrounding": surrounding,
            "radius": r,
            "players": [{"relativePos": {"row": 0, "col": 0}, "name": AGENT_NAME, "health": PLAYER_HEALTH}],
            "monsters": monsters,
            "equipped": [],
            "events": events,
        });
        let parsed = parse_raw_observation(&body.to_string())?;
        Ok(Observation::from_raw(parsed.raw, step)?)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    ensure!(args.size > 4 && args.radius > 0, "size must exceed 4 and radius must be positive");

    println!("Starting fuzz harness on seed {} for max {} ticks...", args.seed, args.ticks);
    let config = AgentConfig { agent_name: AGENT_NAME.to_string(), seed: args.seed, ..AgentConfig::default() };
    let mut agent = Agent::with_pool(config, Vec::new());
    let mut dungeon = Dungeon::new(args.seed, args.size, args.radius);

    let mut step = None;
    let mut origin = dungeon.player;
    let mut levels = agent.state().maps.len();
    for tick in 0..args.ticks {
        let obs = dungeon.respond(step)?;
        agent.apply_observation(&obs).with_context(|| format!("tick {tick} rejected"))?;

        let state = agent.state();
        if state.maps.len() != levels {
            levels = state.maps.len();
            origin = dungeon.player.translate(state.player_pos.negate());
        }
        if state.player_pos.translate(origin) != dungeon.player {
            bail!("tick {tick}: agent believes it is at {:?}, dungeon has {:?}", state.player_pos, dungeon.player);
        }
        for (pos, cell) in state.active_map().cells() {
            if cell.occupancy.knowledge == Knowledge::Known
                && (cell.occupancy.value == Occupancy::Occupied) != dungeon.level.is_wall(pos.translate(origin))
            {
                bail!("tick {tick}: known cell {pos:?} disagrees with the dungeon");
            }
        }

        let decision = agent.decide_next_move();
        if let Some(dir) = decision.step {
            let target = agent.state().player_pos.step(dir);
            if agent.state().active_map().get(target).occupancy.value == Occupancy::Occupied {
                bail!("tick {tick}: agent chose to walk into a known wall at {target:?}");
            }
        }
        step = decision.step;
    }

    println!(
        "Fuzzing completed successfully: level {}, status {}, hash {:016x}",
        agent.state().active_map().level(),
        agent.status().label(),
        agent.snapshot_hash()
    );
    Ok(())
}
