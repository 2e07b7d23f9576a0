//! Grid representation, collision rules and center-biased line clearing

use crate::player::PlayerId;
use crate::shape::{Point, Shape};
use serde::{Deserialize, Serialize};

/// Default grid dimensions
pub const GRID_WIDTH: usize = 10;
pub const GRID_HEIGHT: usize = 10;

/// Whether a mark is tentative or committed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellState {
    Solid,
    Drawing,
}

/// An occupied cell. Empty cells are `None` in the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub owner: PlayerId,
    pub color: String,
    pub state: CellState,
}

impl Cell {
    pub fn solid(owner: &str, color: &str) -> Self {
        Self {
            owner: owner.to_string(),
            color: color.to_string(),
            state: CellState::Solid,
        }
    }

    pub fn drawing(owner: &str, color: &str) -> Self {
        Self {
            owner: owner.to_string(),
            color: color.to_string(),
            state: CellState::Drawing,
        }
    }

    pub fn is_solid(&self) -> bool {
        self.state == CellState::Solid
    }

    /// A tentative mark of `player`, which that player may overwrite
    pub fn is_drawing_of(&self, player: &str) -> bool {
        self.state == CellState::Drawing && self.owner == player
    }
}

/// The shared grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    /// Stored as [y][x], row 0 is the top
    cells: Vec<Vec<Option<Cell>>>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(GRID_WIDTH, GRID_HEIGHT)
    }
}

impl Grid {
    /// Create an empty grid
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![vec![None; width]; height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn rows(&self) -> &[Vec<Option<Cell>>] {
        &self.cells
    }

    pub fn in_bounds(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.width && (p.y as usize) < self.height
    }

    /// The occupant of a cell; `None` when empty or out of bounds
    pub fn get(&self, p: Point) -> Option<&Cell> {
        if !self.in_bounds(p) {
            return None;
        }
        self.cells[p.y as usize][p.x as usize].as_ref()
    }

    /// Set a cell. Returns false if out of bounds
    pub fn set(&mut self, p: Point, cell: Option<Cell>) -> bool {
        if !self.in_bounds(p) {
            return false;
        }
        self.cells[p.y as usize][p.x as usize] = cell;
        true
    }

    /// In bounds, and either empty or the player's own drawing mark
    pub fn is_claimable(&self, p: Point, player: &str) -> bool {
        if !self.in_bounds(p) {
            return false;
        }
        match self.get(p) {
            None => true,
            Some(cell) => cell.is_drawing_of(player),
        }
    }

    /// Whether `shape` in its stored orientation fits with its origin at `origin`
    pub fn fits(&self, shape: &Shape, origin: Point, player: &str) -> bool {
        shape
            .cells
            .iter()
            .all(|c| self.is_claimable(Point::new(origin.x + c.x, origin.y + c.y), player))
    }

    /// Scan every origin for a spot where `shape` fits
    pub fn can_place_anywhere(&self, shape: &Shape, player: &str) -> bool {
        (0..self.height as i32).any(|y| {
            (0..self.width as i32).any(|x| self.fits(shape, Point::new(x, y), player))
        })
    }

    /// Commit points as solid cells owned by `player`
    pub fn commit(&mut self, points: &[Point], player: &str, color: &str) {
        for &p in points {
            debug_assert!(
                self.get(p).is_none_or(|c| c.is_drawing_of(player)),
                "commit over a cell owned by someone else at {:?}",
                p
            );
            self.set(p, Some(Cell::solid(player, color)));
        }
    }

    /// Remove all of a player's drawing marks, returning how many were removed
    pub fn clear_drawing(&mut self, player: &str) -> usize {
        let mut removed = 0;
        for cell in self.cells.iter_mut().flatten() {
            if cell.as_ref().is_some_and(|c| c.is_drawing_of(player)) {
                *cell = None;
                removed += 1;
            }
        }
        removed
    }

    /// Repaint a player's drawing marks
    pub fn recolor_drawing(&mut self, player: &str, color: &str) {
        for cell in self.cells.iter_mut().flatten().flatten() {
            if cell.is_drawing_of(player) {
                cell.color = color.to_string();
            }
        }
    }

    /// Whether any committed cell remains
    pub fn has_solid_cells(&self) -> bool {
        self.cells
            .iter()
            .flatten()
            .flatten()
            .any(|cell| cell.is_solid())
    }

    /// Check if the grid is completely empty
    pub fn is_empty(&self) -> bool {
        self.cells.iter().flatten().all(|cell| cell.is_none())
    }

    /// Reset every cell to empty
    pub fn clear(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            *cell = None;
        }
    }

    /// Clear full rows and full columns, returning how many lines were cleared.
    ///
    /// Rows and columns are detected independently on the same grid, so a cell
    /// at the crossing of a full row and a full column is cleared once but both
    /// lines count. Remaining lines move toward the center instead of falling:
    /// a cleared line above (left of) the center pulls the lines above it one
    /// step down (right), and one below (right of) the center pulls the lines
    /// below it one step up (left). The center index is `dimension / 2`.
    pub fn clear_lines(&mut self) -> u32 {
        let full_rows: Vec<usize> = (0..self.height)
            .filter(|&y| self.cells[y].iter().all(Option::is_some))
            .collect();
        let full_cols: Vec<usize> = (0..self.width)
            .filter(|&x| self.cells.iter().all(|row| row[x].is_some()))
            .collect();

        if full_rows.is_empty() && full_cols.is_empty() {
            return 0;
        }

        let width = self.width;
        if !full_rows.is_empty() {
            let rows = std::mem::take(&mut self.cells);
            self.cells = collapse_toward_center(rows, &full_rows, self.height / 2, || vec![None; width]);
        }
        if !full_cols.is_empty() {
            for row in self.cells.iter_mut() {
                let cells = std::mem::take(row);
                *row = collapse_toward_center(cells, &full_cols, width / 2, || None);
            }
        }

        (full_rows.len() + full_cols.len()) as u32
    }
}

/// Drop the `cleared` indices and pad with empties on the outer edge of
/// whichever half each cleared index was in, so survivors close in on `center`.
fn collapse_toward_center<T>(
    items: Vec<T>,
    cleared: &[usize],
    center: usize,
    empty: impl Fn() -> T,
) -> Vec<T> {
    let len = items.len();
    let mut near = Vec::with_capacity(len);
    let mut far = Vec::with_capacity(len);
    let mut near_cleared = 0;
    let mut far_cleared = 0;

    for (i, item) in items.into_iter().enumerate() {
        let removed = cleared.contains(&i);
        match (i < center, removed) {
            (true, true) => near_cleared += 1,
            (true, false) => near.push(item),
            (false, true) => far_cleared += 1,
            (false, false) => far.push(item),
        }
    }

    let mut out = Vec::with_capacity(len);
    out.extend((0..near_cleared).map(|_| empty()));
    out.extend(near);
    out.extend(far);
    out.extend((0..far_cleared).map(|_| empty()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeType;

    fn fill_row(grid: &mut Grid, y: i32) {
        for x in 0..grid.width() as i32 {
            grid.set(Point::new(x, y), Some(Cell::solid("a", "#f00")));
        }
    }

    fn fill_col(grid: &mut Grid, x: i32) {
        for y in 0..grid.height() as i32 {
            grid.set(Point::new(x, y), Some(Cell::solid("a", "#f00")));
        }
    }

    fn marker(owner: &str) -> Option<Cell> {
        Some(Cell::solid(owner, "#0f0"))
    }

    #[test]
    fn test_new_grid_is_empty() {
        let grid = Grid::default();
        assert!(grid.is_empty());
        assert_eq!((grid.width(), grid.height()), (10, 10));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut grid = Grid::default();
        assert!(!grid.in_bounds(Point::new(-1, 0)));
        assert!(!grid.in_bounds(Point::new(0, 10)));
        assert!(!grid.set(Point::new(10, 0), marker("a")));
        assert_eq!(grid.get(Point::new(0, -1)), None);
    }

    #[test]
    fn test_claimable_rules() {
        let mut grid = Grid::default();
        grid.set(Point::new(1, 1), Some(Cell::drawing("a", "#f00")));
        grid.set(Point::new(2, 2), Some(Cell::solid("a", "#f00")));
        assert!(grid.is_claimable(Point::new(0, 0), "a"));
        assert!(grid.is_claimable(Point::new(1, 1), "a"));
        assert!(!grid.is_claimable(Point::new(1, 1), "b"));
        assert!(!grid.is_claimable(Point::new(2, 2), "a"));
        assert!(!grid.is_claimable(Point::new(-1, 2), "a"));
    }

    #[test]
    fn test_fits_respects_bounds() {
        let grid = Grid::default();
        let bar = Shape::new(ShapeType::I);
        assert!(grid.fits(&bar, Point::new(6, 9), "a"));
        assert!(!grid.fits(&bar, Point::new(7, 9), "a"));
    }

    #[test]
    fn test_no_full_lines_leaves_grid_unchanged() {
        let mut grid = Grid::default();
        for x in 0..9 {
            grid.set(Point::new(x, 4), marker("a"));
        }
        grid.set(Point::new(3, 0), Some(Cell::drawing("b", "#00f")));
        let before = grid.clone();
        assert_eq!(grid.clear_lines(), 0);
        assert_eq!(grid, before);
    }

    #[test]
    fn test_top_half_row_pulls_rows_above_down() {
        let mut grid = Grid::default();
        fill_row(&mut grid, 2);
        grid.set(Point::new(0, 1), marker("above"));
        grid.set(Point::new(0, 7), marker("below"));

        assert_eq!(grid.clear_lines(), 1);
        assert_eq!(grid.get(Point::new(0, 2)).map(|c| c.owner.as_str()), Some("above"));
        assert_eq!(grid.get(Point::new(0, 1)), None);
        assert_eq!(grid.get(Point::new(0, 7)).map(|c| c.owner.as_str()), Some("below"));
        assert!(grid.rows()[0].iter().all(Option::is_none));
    }

    #[test]
    fn test_bottom_half_row_pulls_rows_below_up() {
        let mut grid = Grid::default();
        fill_row(&mut grid, 7);
        grid.set(Point::new(4, 8), marker("below"));
        grid.set(Point::new(4, 3), marker("above"));

        assert_eq!(grid.clear_lines(), 1);
        assert_eq!(grid.get(Point::new(4, 7)).map(|c| c.owner.as_str()), Some("below"));
        assert_eq!(grid.get(Point::new(4, 8)), None);
        assert_eq!(grid.get(Point::new(4, 3)).map(|c| c.owner.as_str()), Some("above"));
        assert!(grid.rows()[9].iter().all(Option::is_none));
    }

    #[test]
    fn test_center_row_belongs_to_bottom_half() {
        let mut grid = Grid::new(5, 5);
        fill_row(&mut grid, 2);
        grid.set(Point::new(0, 3), marker("x"));
        grid.set(Point::new(0, 1), marker("y"));

        assert_eq!(grid.clear_lines(), 1);
        assert_eq!(grid.get(Point::new(0, 2)).map(|c| c.owner.as_str()), Some("x"));
        assert_eq!(grid.get(Point::new(0, 1)).map(|c| c.owner.as_str()), Some("y"));
    }

    #[test]
    fn test_columns_converge_toward_center() {
        let mut grid = Grid::default();
        fill_col(&mut grid, 1);
        fill_col(&mut grid, 8);
        grid.set(Point::new(0, 5), marker("left"));
        grid.set(Point::new(9, 5), marker("right"));

        assert_eq!(grid.clear_lines(), 2);
        assert_eq!(grid.get(Point::new(1, 5)).map(|c| c.owner.as_str()), Some("left"));
        assert_eq!(grid.get(Point::new(8, 5)).map(|c| c.owner.as_str()), Some("right"));
        assert_eq!(grid.get(Point::new(0, 5)), None);
        assert_eq!(grid.get(Point::new(9, 5)), None);
    }

    #[test]
    fn test_row_and_column_share_a_cell() {
        let mut grid = Grid::default();
        fill_row(&mut grid, 0);
        fill_col(&mut grid, 0);

        assert_eq!(grid.clear_lines(), 2);
        assert!(grid.is_empty());
    }

    #[test]
    fn test_clear_drawing_only_touches_owner() {
        let mut grid = Grid::default();
        grid.set(Point::new(0, 0), Some(Cell::drawing("a", "#f00")));
        grid.set(Point::new(1, 0), Some(Cell::drawing("b", "#00f")));
        grid.set(Point::new(2, 0), Some(Cell::solid("a", "#f00")));

        assert_eq!(grid.clear_drawing("a"), 1);
        assert_eq!(grid.get(Point::new(0, 0)), None);
        assert!(grid.get(Point::new(1, 0)).is_some());
        assert!(grid.has_solid_cells());
    }
}
