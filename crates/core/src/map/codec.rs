//! Versioned little-endian binary encoding for stored maps.
//!
//! Layout (every integer is a little-endian `i32`, every bool one byte):
//! - `version`, `level`, `xmin`, `ymin`, `xmax`, `ymax`, `cell_count`
//! - per cell: occupancy knowledge + value, exit knowledge + bool, visited knowledge + bool
//! - `vote_count` followed by the inherited level votes (version 4 and later)
//!
//! Version 0 cells carry bare values only: occupancy `i32`, exit bool, visited bool.

use thiserror::Error;

use super::Map;
use crate::cell::{Cell, HistoricalValue};
use crate::rect::IntRect;
use crate::types::{Knowledge, Occupancy};

/// Version written by `encode`.
pub const FORMAT_VERSION: i32 = 5;

const FIRST_VOTES_VERSION: i32 = 4;

const CELL_BYTES: usize = 18;
const LEGACY_CELL_BYTES: usize = 6;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MapDecodeError {
    #[error("map data truncated at byte {offset}")]
    Truncated { offset: usize },
    #[error("unsupported map format version {0}")]
    UnsupportedVersion(i32),
    #[error("cell count {count} does not fit bounds of {width}x{height}")]
    CellCountMismatch { count: i32, width: i64, height: i64 },
    #[error("unknown knowledge tag {tag} at byte {offset}")]
    BadKnowledge { tag: i32, offset: usize },
    #[error("unknown occupancy tag {tag} at byte {offset}")]
    BadOccupancy { tag: i32, offset: usize },
    #[error("negative vote count {0}")]
    BadVoteCount(i32),
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        ByteReader { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], MapDecodeError> {
        let end = self.offset + N;
        let Some(slice) = self.bytes.get(self.offset..end) else {
            return Err(MapDecodeError::Truncated { offset: self.offset });
        };
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.offset = end;
        Ok(out)
    }

    fn i32(&mut self) -> Result<i32, MapDecodeError> {
        self.take::<4>().map(i32::from_le_bytes)
    }

    fn bool(&mut self) -> Result<bool, MapDecodeError> {
        self.take::<1>().map(|[b]| b != 0)
    }

    fn knowledge(&mut self) -> Result<Knowledge, MapDecodeError> {
        let offset = self.offset;
        let tag = self.i32()?;
        Knowledge::from_tag(tag).ok_or(MapDecodeError::BadKnowledge { tag, offset })
    }

    fn occupancy(&mut self) -> Result<Occupancy, MapDecodeError> {
        let offset = self.offset;
        let tag = self.i32()?;
        Occupancy::from_tag(tag).ok_or(MapDecodeError::BadOccupancy { tag, offset })
    }
}

fn put_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

impl Map {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + self.cells.len() * CELL_BYTES + self.inherited_votes.len() * 4);
        put_i32(&mut out, FORMAT_VERSION);
        put_i32(&mut out, self.level);
        put_i32(&mut out, self.bounds.xmin);
        put_i32(&mut out, self.bounds.ymin);
        put_i32(&mut out, self.bounds.xmax);
        put_i32(&mut out, self.bounds.ymax);
        put_i32(&mut out, self.cells.len() as i32);
        for cell in &self.cells {
            put_i32(&mut out, cell.occupancy.knowledge.tag());
            put_i32(&mut out, cell.occupancy.value.tag());
            put_i32(&mut out, cell.exit.knowledge.tag());
            out.push(u8::from(cell.exit.value));
            put_i32(&mut out, cell.visited.knowledge.tag());
            out.push(u8::from(cell.visited.value));
        }
        put_i32(&mut out, self.inherited_votes.len() as i32);
        for vote in &self.inherited_votes {
            put_i32(&mut out, *vote);
        }
        out
    }

    /// Decodes any supported version and trims the result to its known cells.
    pub fn decode(bytes: &[u8]) -> Result<Map, MapDecodeError> {
        let mut reader = ByteReader::new(bytes);
        let version = reader.i32()?;
        if !(0..=FORMAT_VERSION).contains(&version) {
            return Err(MapDecodeError::UnsupportedVersion(version));
        }
        let level = reader.i32()?;
        let (xmin, ymin, xmax, ymax) = (reader.i32()?, reader.i32()?, reader.i32()?, reader.i32()?);
        let bounds = IntRect::new(xmin, ymin, xmax, ymax);
        let (width, height) = if bounds.is_empty() {
            (0, 0)
        } else {
            (i64::from(xmax) - i64::from(xmin) + 1, i64::from(ymax) - i64::from(ymin) + 1)
        };
        let count = reader.i32()?;
        if count < 0 || width.checked_mul(height) != Some(i64::from(count)) {
            return Err(MapDecodeError::CellCountMismatch { count, width, height });
        }
        let cell_bytes = if version == 0 { LEGACY_CELL_BYTES } else { CELL_BYTES };
        if (count as usize).saturating_mul(cell_bytes) > reader.remaining() {
            return Err(MapDecodeError::Truncated { offset: bytes.len() });
        }

        let mut cells = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let cell = if version == 0 { read_legacy_cell(&mut reader)? } else { read_cell(&mut reader)? };
            cells.push(cell);
        }

        let mut inherited_votes = Vec::new();
        if version >= FIRST_VOTES_VERSION {
            let votes = reader.i32()?;
            if votes < 0 {
                return Err(MapDecodeError::BadVoteCount(votes));
            }
            for _ in 0..votes {
                inherited_votes.push(reader.i32()?);
            }
        }

        let mut map = Map::new(level);
        map.format_version = version;
        map.bounds = bounds;
        map.cells = cells;
        map.inherited_votes = inherited_votes;
        map.trim();
        Ok(map)
    }
}

fn read_cell(reader: &mut ByteReader<'_>) -> Result<Cell, MapDecodeError> {
    let occupancy = HistoricalValue { knowledge: reader.knowledge()?, value: reader.occupancy()? };
    let exit = HistoricalValue { knowledge: reader.knowledge()?, value: reader.bool()? };
    let visited = HistoricalValue { knowledge: reader.knowledge()?, value: reader.bool()? };
    Ok(Cell { occupancy, visited, exit })
}

/// Version 0 stored only historical values; an unknown occupancy erases the whole cell.
fn read_legacy_cell(reader: &mut ByteReader<'_>) -> Result<Cell, MapDecodeError> {
    let occupancy = reader.occupancy()?;
    let exit = reader.bool()?;
    let visited = reader.bool()?;
    if occupancy == Occupancy::Unknown {
        return Ok(Cell {
            occupancy: HistoricalValue::unknown(),
            visited: HistoricalValue { knowledge: Knowledge::Unknown, value: visited },
            exit: HistoricalValue { knowledge: Knowledge::Unknown, value: exit },
        });
    }
    Ok(Cell {
        occupancy: HistoricalValue::historical(occupancy),
        visited: HistoricalValue::historical(visited),
        exit: HistoricalValue::historical(exit),
    })
}
