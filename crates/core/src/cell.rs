//! Per-cell knowledge model: three independently trusted facts per grid cell.
//! This module exists to keep the precedence merge rule in one place.
//! It does not own cell storage, bounds, or contradiction handling.

use crate::types::{Knowledge, Occupancy};

/// A value tagged with how much it can be trusted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct HistoricalValue<T> {
    pub knowledge: Knowledge,
    pub value: T,
}

impl<T: Copy + Default> HistoricalValue<T> {
    pub fn unknown() -> Self {
        HistoricalValue { knowledge: Knowledge::Unknown, value: T::default() }
    }

    pub fn known(value: T) -> Self {
        HistoricalValue { knowledge: Knowledge::Known, value }
    }

    pub fn historical(value: T) -> Self {
        HistoricalValue { knowledge: Knowledge::Historical, value }
    }

    /// Keeps the operand with higher knowledge; ties keep `self`.
    pub fn merge(self, other: Self) -> Self {
        if other.knowledge > self.knowledge { other } else { self }
    }

    /// In-place `merge`. Returns whether `other` replaced the stored value.
    pub fn try_apply(&mut self, other: Self) -> bool {
        if other.knowledge > self.knowledge {
            *self = other;
            true
        } else {
            false
        }
    }

    pub fn is_historical(&self) -> bool {
        self.knowledge == Knowledge::Historical
    }

    /// Erases the value if it came from a matched map.
    pub fn forget_historical(&mut self) {
        if self.is_historical() {
            *self = Self::unknown();
        }
    }

    /// Caps knowledge at `Historical` for data that did not come from live sensing.
    pub fn second_hand(self) -> Self {
        match self.knowledge {
            Knowledge::Known => Self::historical(self.value),
            _ => self,
        }
    }

    /// Second-hand data is dropped and first-hand data becomes second-hand.
    pub fn demoted(self) -> Self {
        match self.knowledge {
            Knowledge::Unknown => self,
            Knowledge::Historical => Self::unknown(),
            Knowledge::Known => Self::historical(self.value),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Cell {
    pub occupancy: HistoricalValue<Occupancy>,
    pub visited: HistoricalValue<bool>,
    pub exit: HistoricalValue<bool>,
}

impl Cell {
    pub fn has_any_knowledge(&self) -> bool {
        self.occupancy.knowledge != Knowledge::Unknown
            || self.visited.knowledge != Knowledge::Unknown
            || self.exit.knowledge != Knowledge::Unknown
    }

    pub fn has_historical(&self) -> bool {
        self.occupancy.is_historical() || self.visited.is_historical() || self.exit.is_historical()
    }

    pub fn forget_historical(&mut self) {
        self.occupancy.forget_historical();
        self.visited.forget_historical();
        self.exit.forget_historical();
    }

    pub fn demoted(self) -> Cell {
        Cell {
            occupancy: self.occupancy.demoted(),
            visited: self.visited.demoted(),
            exit: self.exit.demoted(),
        }
    }

    /// Occupancy value that a matcher may compare, if any is trusted at all.
    pub fn comparable_occupancy(&self) -> Option<Occupancy> {
        (self.occupancy.knowledge != Knowledge::Unknown
            && self.occupancy.value != Occupancy::Unknown)
            .then_some(self.occupancy.value)
    }

    /// Folds a matched map's cell in as historical data.
    pub fn merge_historical(&mut self, other: &Cell) {
        self.occupancy.try_apply(other.occupancy.second_hand());
        self.visited.try_apply(other.visited.second_hand());
        self.exit.try_apply(other.exit.second_hand());
    }
}
