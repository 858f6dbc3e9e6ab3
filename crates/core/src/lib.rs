pub mod agent;
pub mod archive;
pub mod cell;
pub mod config;
pub mod content;
pub mod map;
pub mod matcher;
pub mod observation;
pub mod reconcile;
pub mod rect;
pub mod state;
pub mod types;
pub mod view;

pub use agent::{Agent, Decision, TickReport};
pub use archive::{ArchiveError, MapArchive};
pub use cell::{Cell, HistoricalValue};
pub use config::{AgentConfig, ConfigError};
pub use map::{Map, MapDecodeError};
pub use matcher::{LevelMatcher, MatchHit, MatchProgress};
pub use observation::{Observation, ObservationError, ParsedObservation, RawObservation, parse_raw_observation};
pub use rect::IntRect;
pub use state::GameState;
pub use types::*;
pub use view::{CellView, MapView};
