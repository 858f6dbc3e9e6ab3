use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use delver_core::{
    Agent, AgentConfig, Direction, LevelMatcher, MapArchive, MapView, Observation, ObservationError,
    parse_raw_observation,
};
use directories::ProjectDirs;
use rand_chacha::{ChaCha8Rng, rand_core::SeedableRng};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const APP_NAME: &str = "delver";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log filter, e.g. `debug` or `delver_core=trace`; falls back to RUST_LOG, then `info`
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Feed a recorded session (one JSON object per line) through the agent
    Replay {
        file: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory of stored maps; defaults to the per-user data directory
        #[arg(long)]
        maps_dir: Option<PathBuf>,
        #[arg(short, long)]
        seed: Option<u64>,
    },
    /// Print a stored map file
    Inspect { map: PathBuf },
    /// Run the level matcher between a stored map and a directory of stored maps
    Match {
        active: PathBuf,
        #[arg(long)]
        pool: Option<PathBuf>,
        #[arg(short, long, default_value_t = 0)]
        seed: u64,
    },
}

/// One recorded exchange: the move that was sent and the server's answer.
#[derive(Deserialize)]
struct ReplayLine {
    #[serde(rename = "move")]
    issued: Option<Direction>,
    response: serde_json::Value,
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry().with(filter).with(fmt::layer().with_writer(io::stderr)).init();
}

fn default_maps_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.data_dir().join("maps"))
}

fn replay(file: &Path, config: Option<&Path>, maps_dir: Option<PathBuf>, seed: Option<u64>) -> Result<()> {
    let mut config = match config {
        Some(path) => AgentConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => AgentConfig::default(),
    };
    config.maps_dir = maps_dir.or(config.maps_dir).or_else(default_maps_dir);
    if let Some(seed) = seed {
        config.seed = seed;
    }
    info!(maps_dir = ?config.maps_dir, seed = config.seed, "starting replay");

    let reader = BufReader::new(
        fs::File::open(file).with_context(|| format!("failed to open {}", file.display()))?,
    );
    let mut agent = Agent::new(config);
    let mut skipped = 0u32;
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {} line {}", file.display(), line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ReplayLine =
            serde_json::from_str(&line).with_context(|| format!("malformed record on line {}", line_no + 1))?;
        let applied = parse_raw_observation(&record.response.to_string())
            .and_then(|parsed| Observation::from_raw(parsed.raw, record.issued))
            .and_then(|obs| agent.apply_observation(&obs));
        let report = match applied {
            Ok(report) => report,
            Err(ObservationError::ServerReported(_)) => {
                skipped += 1;
                continue;
            }
            Err(err) => {
                warn!(line = line_no + 1, %err, "unusable observation, tick skipped");
                skipped += 1;
                continue;
            }
        };
        let decision = agent.decide_next_move();
        let step = decision.step.map_or("-", |dir| dir.label());
        println!("{:>6}  {:<20} {step}", report.tick, decision.status.label());
        for item in &decision.item_uses {
            println!("        use {item}");
        }
    }

    println!("Replay complete.");
    println!("Final Tick: {}", agent.state().tick);
    println!("Skipped: {skipped}");
    println!("Snapshot Hash: {:016x}", agent.snapshot_hash());
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let map = MapArchive::load(path).with_context(|| format!("inspecting {}", path.display()))?;
    let bounds = map.bounds();
    println!("version:     {}", map.format_version());
    println!("level:       {}", map.level());
    println!("archive id:  {:016x}", map.archive_id());
    println!("bounds:      x {}..={} y {}..={}", bounds.xmin, bounds.xmax, bounds.ymin, bounds.ymax);
    println!("exploration: {}", map.exploration_score());
    print!("{}", MapView::of(&map, None).render_ascii());
    Ok(())
}

fn match_maps(active: &Path, pool_dir: Option<PathBuf>, seed: u64) -> Result<()> {
    let mut active_map = MapArchive::load(active).with_context(|| format!("loading {}", active.display()))?;
    let pool_dir = pool_dir
        .or_else(|| active.parent().map(Path::to_path_buf))
        .context("no pool directory given and the active map has no parent directory")?;
    let mut pool = MapArchive::open(&pool_dir)
        .load_pool()
        .with_context(|| format!("loading pool {}", pool_dir.display()))?;
    // Maps written by the same run never match each other.
    if let Some(run_id) = MapArchive::archive_id_of(active) {
        pool.retain(|candidate| candidate.archive_id() != run_id);
    }
    info!(candidates = pool.len(), pool = %pool_dir.display(), "matching");

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let radius = AgentConfig::default().match_radius;
    let hits = LevelMatcher::new(radius).run_to_end(&mut active_map, &mut pool, &mut rng);
    if hits.is_empty() {
        println!("no alignment found");
    }
    for hit in hits {
        println!(
            "candidate {:>3}  offset ({}, {})  matching {}  score {:.3}",
            hit.candidate, hit.offset.x, hit.offset.y, hit.matching, hit.score
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    match args.command {
        Command::Replay { file, config, maps_dir, seed } => replay(&file, config.as_deref(), maps_dir, seed),
        Command::Inspect { map } => inspect(&map),
        Command::Match { active, pool, seed } => match_maps(&active, pool, seed),
    }
}
