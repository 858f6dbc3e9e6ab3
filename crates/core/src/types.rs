use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    pub struct EntityId;
    pub struct ItemId;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos {
    pub y: i32,
    pub x: i32,
}

impl Pos {
    pub const ORIGIN: Pos = Pos { y: 0, x: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Pos { y, x }
    }

    pub fn step(self, direction: Direction) -> Pos {
        let delta = direction.delta();
        Pos { y: self.y + delta.y, x: self.x + delta.x }
    }

    pub fn translate(self, delta: Pos) -> Pos {
        Pos { y: self.y + delta.y, x: self.x + delta.x }
    }

    pub fn delta_to(self, other: Pos) -> Pos {
        Pos { y: other.y - self.y, x: other.x - self.x }
    }

    pub fn negate(self) -> Pos {
        Pos { y: -self.y, x: -self.x }
    }

    pub fn distance_squared(self, other: Pos) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] =
        [Direction::North, Direction::East, Direction::South, Direction::West];

    /// Grid delta for one step. North is toward smaller `y`.
    pub const fn delta(self) -> Pos {
        match self {
            Direction::North => Pos { y: -1, x: 0 },
            Direction::East => Pos { y: 0, x: 1 },
            Direction::South => Pos { y: 1, x: 0 },
            Direction::West => Pos { y: 0, x: -1 },
        }
    }

    /// Name sent to the server for a move request.
    pub fn label(self) -> &'static str {
        match self {
            Direction::North => "North",
            Direction::East => "East",
            Direction::South => "South",
            Direction::West => "West",
        }
    }

    pub fn between(from: Pos, to: Pos) -> Option<Direction> {
        Direction::ALL.into_iter().find(|dir| from.step(*dir) == to)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Monster,
}

/// Trust tier of a single map fact, ordered `Unknown < Historical < Known`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Knowledge {
    #[default]
    Unknown,
    Historical,
    Known,
}

impl Knowledge {
    pub const fn tag(self) -> i32 {
        match self {
            Knowledge::Unknown => 0,
            Knowledge::Historical => 1,
            Knowledge::Known => 2,
        }
    }

    pub const fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Knowledge::Unknown),
            1 => Some(Knowledge::Historical),
            2 => Some(Knowledge::Known),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Occupancy {
    Free,
    Occupied,
    #[default]
    Unknown,
    Error,
}

impl Occupancy {
    pub const fn tag(self) -> i32 {
        match self {
            Occupancy::Free => 0,
            Occupancy::Occupied => 1,
            Occupancy::Unknown => 2,
            Occupancy::Error => 3,
        }
    }

    pub const fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(Occupancy::Free),
            1 => Some(Occupancy::Occupied),
            2 => Some(Occupancy::Unknown),
            3 => Some(Occupancy::Error),
            _ => None,
        }
    }

    pub fn from_glyph(glyph: char) -> Self {
        match glyph {
            '#' => Occupancy::Occupied,
            '.' => Occupancy::Free,
            _ => Occupancy::Error,
        }
    }
}

/// Name of the decision rule that produced the current move.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Idle,
    FleeingFromBoss,
    Fleeing,
    AttackingMonster,
    MovingToExit,
    LookingForExit,
    LookingForMonsters,
}

impl Status {
    pub fn label(self) -> &'static str {
        match self {
            Status::Idle => "idle",
            Status::FleeingFromBoss => "fleeing from boss",
            Status::Fleeing => "fleeing",
            Status::AttackingMonster => "attacking monster",
            Status::MovingToExit => "moving to exit",
            Status::LookingForExit => "looking for exit",
            Status::LookingForMonsters => "looking for monsters",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum LogEvent {
    StatusChanged { status: Status, step: Option<Direction> },
    ServerEvent { text: String },
    Contradiction { pos: Pos, stored: Occupancy, observed: Occupancy },
    StaleHistoricalExit { pos: Pos },
    HistoricalMerged { candidate: usize, offset: Pos, matching: u32, score: f32 },
    LevelDescended { level: i32 },
    RunRestarted,
    EquipRequested { item: String },
    PotionRequested { item: String },
}
