//! Decoding of the transport's per-tick JSON response into an observation.
//! This module exists to keep wire-shape concerns out of the agent pipeline.
//! It does not own state updates; see `Agent::apply_observation`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::rect::IntRect;
use crate::types::{Direction, EntityKind, Occupancy, Pos};

/// Every key the transport is known to send, at any nesting depth.
pub const EXPECTED_KEYS: &[&str] = &[
    "itemNames",
    "surrounding",
    "radius",
    "players",
    "events",
    "monsters",
    "equipped",
    "row",
    "col",
    "name",
    "relativePos",
    "health",
    "error",
];

pub const EVENT_MOVED: &str = "you moved";
pub const EVENT_DESCENDED: &str = "you fell down a ladder";

#[derive(Debug, Error)]
pub enum ObservationError {
    #[error("malformed observation json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("negative view radius {0}")]
    NegativeRadius(i32),
    #[error("view radius {0} is too large")]
    RadiusTooLarge(i32),
    #[error("grid has {rows} rows, expected {expected}")]
    GridHeight { rows: usize, expected: usize },
    #[error("grid row {row} has {width} cells, expected {expected}")]
    GridWidth { row: usize, width: usize, expected: usize },
    #[error("server reported error: {0}")]
    ServerReported(String),
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativePos {
    pub row: i32,
    pub col: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawEntity {
    pub relative_pos: RelativePos,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    pub health: f32,
}

/// Transport record exactly as received.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawObservation {
    #[serde(deserialize_with = "null_as_default")]
    pub item_names: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub surrounding: Vec<String>,
    pub radius: i32,
    #[serde(deserialize_with = "null_as_default")]
    pub players: Vec<RawEntity>,
    #[serde(deserialize_with = "null_as_default")]
    pub monsters: Vec<RawEntity>,
    #[serde(deserialize_with = "null_as_default")]
    pub equipped: Vec<String>,
    pub error: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub events: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedObservation {
    pub raw: RawObservation,
    pub unexpected_keys: Vec<String>,
}

/// Parses a response body, reporting (not rejecting) keys outside `EXPECTED_KEYS`.
pub fn parse_raw_observation(json: &str) -> Result<ParsedObservation, ObservationError> {
    let value: Value = serde_json::from_str(json)?;
    let mut unexpected_keys = Vec::new();
    collect_unexpected_keys(&value, &mut unexpected_keys);
    for key in &unexpected_keys {
        warn!(key = %key, "unexpected key in observation");
    }
    let raw = serde_json::from_value(value)?;
    Ok(ParsedObservation { raw, unexpected_keys })
}

fn collect_unexpected_keys(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(fields) => {
            for (key, inner) in fields {
                if !EXPECTED_KEYS.contains(&key.as_str()) && !out.contains(key) {
                    out.push(key.clone());
                }
                collect_unexpected_keys(inner, out);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_unexpected_keys(item, out)),
        _ => {}
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObservedEntity {
    pub name: String,
    pub kind: EntityKind,
    /// Position relative to the observer, `x` = column and `y` = row.
    pub offset: Pos,
    pub health: f32,
}

/// One tick of sensor input with the grid decoded to occupancy.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub radius: i32,
    /// Row-major, `(2 * radius + 1)²` cells centered on the observer.
    pub grid: Vec<Occupancy>,
    pub item_names: Vec<String>,
    pub equipped: Vec<String>,
    pub entities: Vec<ObservedEntity>,
    pub events: Vec<String>,
    pub error: Option<String>,
    /// Move request this response answers, if any.
    pub issued_move: Option<Direction>,
}

impl Observation {
    pub fn from_raw(raw: RawObservation, issued_move: Option<Direction>) -> Result<Self, ObservationError> {
        let entities = raw
            .players
            .into_iter()
            .map(|e| (e, EntityKind::Player))
            .chain(raw.monsters.into_iter().map(|e| (e, EntityKind::Monster)))
            .map(|(e, kind)| ObservedEntity {
                name: e.name,
                kind,
                offset: Pos { y: e.relative_pos.row, x: e.relative_pos.col },
                health: e.health,
            })
            .collect();

        // An error response carries no usable grid; it is rejected when applied.
        let grid = if raw.error.is_some() {
            Vec::new()
        } else {
            decode_grid(&raw.surrounding, raw.radius)?
        };

        Ok(Observation {
            radius: raw.radius,
            grid,
            item_names: raw.item_names,
            equipped: raw.equipped,
            entities,
            events: raw.events,
            error: raw.error,
            issued_move,
        })
    }

    pub fn has_event(&self, event: &str) -> bool {
        self.events.iter().any(|e| e == event)
    }

    /// Grid cells covered by this observation when the observer stands at `center`.
    pub fn window(&self, center: Pos) -> IntRect {
        IntRect::around(center, self.radius)
    }
}

fn decode_grid(rows: &[String], radius: i32) -> Result<Vec<Occupancy>, ObservationError> {
    if radius < 0 {
        return Err(ObservationError::NegativeRadius(radius));
    }
    let side = radius
        .checked_mul(2)
        .and_then(|diameter| diameter.checked_add(1))
        .ok_or(ObservationError::RadiusTooLarge(radius))? as usize;
    if rows.len() != side {
        return Err(ObservationError::GridHeight { rows: rows.len(), expected: side });
    }
    let mut grid = Vec::with_capacity(side * side);
    for (row, line) in rows.iter().enumerate() {
        let width = line.chars().count();
        if width != side {
            return Err(ObservationError::GridWidth { row, width, expected: side });
        }
        grid.extend(line.chars().map(Occupancy::from_glyph));
    }
    Ok(grid)
}
