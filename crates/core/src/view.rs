//! Read-only map snapshot for renderers.

use crate::map::Map;
use crate::rect::IntRect;
use crate::types::{Occupancy, Pos};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellView {
    pub occupancy: Occupancy,
    pub exit: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapView {
    pub bounds: IntRect,
    pub level: i32,
    /// Row-major over `bounds`.
    pub cells: Vec<CellView>,
    pub agent: Option<Pos>,
}

impl MapView {
    pub fn of(map: &Map, agent: Option<Pos>) -> Self {
        let cells = map
            .cells()
            .map(|(_, cell)| CellView { occupancy: cell.occupancy.value, exit: cell.exit.value })
            .collect();
        MapView { bounds: map.bounds(), level: map.level(), cells, agent }
    }

    pub fn cell(&self, pos: Pos) -> Option<CellView> {
        self.bounds.index_of(pos).map(|idx| self.cells[idx])
    }

    /// One line per row: `#` occupied, `.` free, `>` exit, `?` unknown, `!` error, `@` agent.
    pub fn render_ascii(&self) -> String {
        let mut out = String::with_capacity(self.cells.len() + self.bounds.height().max(0) as usize);
        for y in self.bounds.ymin..=self.bounds.ymax {
            for x in self.bounds.xmin..=self.bounds.xmax {
                let pos = Pos { y, x };
                let glyph = if self.agent == Some(pos) {
                    '@'
                } else {
                    match self.cell(pos) {
                        Some(CellView { exit: true, .. }) => '>',
                        Some(CellView { occupancy: Occupancy::Occupied, .. }) => '#',
                        Some(CellView { occupancy: Occupancy::Free, .. }) => '.',
                        Some(CellView { occupancy: Occupancy::Error, .. }) => '!',
                        Some(CellView { occupancy: Occupancy::Unknown, .. }) | None => '?',
                    }
                };
                out.push(glyph);
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::HistoricalValue;

    #[test]
    fn renders_rows_top_down() {
        let mut map = Map::new(0);
        map.update(Pos::new(0, 0), |c| c.occupancy = HistoricalValue::known(Occupancy::Occupied));
        map.update(Pos::new(1, 0), |c| c.occupancy = HistoricalValue::known(Occupancy::Free));
        map.update(Pos::new(2, 1), |c| c.occupancy = HistoricalValue::historical(Occupancy::Free));
        map.set_exit(Pos::new(2, 1), true);
        map.update(Pos::new(0, 1), |c| c.occupancy = HistoricalValue::known(Occupancy::Error));

        let view = MapView::of(&map, Some(Pos::new(1, 0)));
        assert_eq!(view.bounds, IntRect::new(0, 0, 2, 1));
        assert_eq!(view.render_ascii(), "#@?\n!?>\n");
        assert_eq!(view.cell(Pos::new(2, 1)), Some(CellView { occupancy: Occupancy::Free, exit: true }));
        assert_eq!(view.cell(Pos::new(5, 5)), None);
    }
}
