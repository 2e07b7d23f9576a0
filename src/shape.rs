//! Figure catalog: the 7 shape types, their base cells and rotations
//!
//! Offsets use grid coordinates: x increases rightward, y increases downward.
//! Every shape is kept normalized so its smallest x and y are both 0.

use serde::{Deserialize, Serialize};

/// A grid coordinate or a shape offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// The 7 shape types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ShapeType {
    I, // long bar
    O, // square
    T,
    S,
    Z,
    J,
    L,
}

impl ShapeType {
    /// All shape types in catalog order
    pub fn all() -> [ShapeType; 7] {
        [
            ShapeType::I,
            ShapeType::O,
            ShapeType::T,
            ShapeType::S,
            ShapeType::Z,
            ShapeType::J,
            ShapeType::L,
        ]
    }

    /// Number of visually distinct orientations
    pub fn rotation_count(&self) -> u8 {
        match self {
            ShapeType::O => 1,
            ShapeType::I | ShapeType::S | ShapeType::Z => 2,
            ShapeType::T | ShapeType::J | ShapeType::L => 4,
        }
    }

    /// Base orientation, already normalized
    //  I: ####   O: ##   T: ###   S: .##   Z: ##.   J: #..   L: ..#
    //            ##       .#.      ##.      .##      ###      ###
    pub fn base_cells(&self) -> [Point; 4] {
        let p = Point::new;
        match self {
            ShapeType::I => [p(0, 0), p(1, 0), p(2, 0), p(3, 0)],
            ShapeType::O => [p(0, 0), p(1, 0), p(0, 1), p(1, 1)],
            ShapeType::T => [p(0, 0), p(1, 0), p(2, 0), p(1, 1)],
            ShapeType::S => [p(1, 0), p(2, 0), p(0, 1), p(1, 1)],
            ShapeType::Z => [p(0, 0), p(1, 0), p(1, 1), p(2, 1)],
            ShapeType::J => [p(0, 0), p(0, 1), p(1, 1), p(2, 1)],
            ShapeType::L => [p(2, 0), p(0, 1), p(1, 1), p(2, 1)],
        }
    }
}

/// A held piece: a type plus its normalized cells in one orientation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    #[serde(rename = "type")]
    pub shape_type: ShapeType,
    pub cells: Vec<Point>,
}

impl Shape {
    /// The base orientation of a shape type
    pub fn new(shape_type: ShapeType) -> Self {
        Self {
            shape_type,
            cells: normalize(&shape_type.base_cells()),
        }
    }

    /// Rotate a quarter turn, mapping (x, y) to (y, -x), and re-normalize
    pub fn rotate(&self) -> Shape {
        let rotated: Vec<Point> = self.cells.iter().map(|c| Point::new(c.y, -c.x)).collect();
        Shape {
            shape_type: self.shape_type,
            cells: normalize(&rotated),
        }
    }

    /// Apply `times` quarter turns
    pub fn rotated(&self, times: u8) -> Shape {
        let mut shape = self.clone();
        for _ in 0..times % 4 {
            shape = shape.rotate();
        }
        shape
    }

    /// Width and height of the bounding box
    pub fn extent(&self) -> (i32, i32) {
        let w = self.cells.iter().map(|c| c.x).max().map_or(0, |x| x + 1);
        let h = self.cells.iter().map(|c| c.y).max().map_or(0, |y| y + 1);
        (w, h)
    }
}

/// Shift a set of points so min x and min y are 0, sorted and deduplicated
pub fn normalize(points: &[Point]) -> Vec<Point> {
    let Some(min_x) = points.iter().map(|p| p.x).min() else {
        return Vec::new();
    };
    let min_y = points.iter().map(|p| p.y).min().unwrap_or(0);

    let mut cells: Vec<Point> = points
        .iter()
        .map(|p| Point::new(p.x.saturating_sub(min_x), p.y.saturating_sub(min_y)))
        .collect();
    cells.sort();
    cells.dedup();
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_four_rotations_return_to_start() {
        for shape_type in ShapeType::all() {
            let shape = Shape::new(shape_type);
            assert_eq!(shape.rotated(4), shape, "{:?}", shape_type);
            assert_eq!(shape.rotate().rotate().rotate().rotate(), shape);
        }
    }

    #[test]
    fn test_rotation_counts_match_distinct_orientations() {
        for shape_type in ShapeType::all() {
            let shape = Shape::new(shape_type);
            let distinct: HashSet<Vec<Point>> = (0..4).map(|r| shape.rotated(r).cells).collect();
            assert_eq!(distinct.len(), shape_type.rotation_count() as usize, "{:?}", shape_type);
        }
    }

    #[test]
    fn test_rotated_shapes_stay_normalized() {
        for shape_type in ShapeType::all() {
            for r in 0..4 {
                let shape = Shape::new(shape_type).rotated(r);
                assert_eq!(shape.cells.len(), 4);
                assert_eq!(shape.cells.iter().map(|c| c.x).min(), Some(0));
                assert_eq!(shape.cells.iter().map(|c| c.y).min(), Some(0));
            }
        }
    }

    #[test]
    fn test_i_rotates_to_vertical() {
        let vertical = Shape::new(ShapeType::I).rotate();
        assert_eq!(vertical.extent(), (1, 4));
    }

    #[test]
    fn test_normalize_shifts_and_dedups() {
        let points = [Point::new(5, 7), Point::new(6, 7), Point::new(5, 7)];
        assert_eq!(normalize(&points), vec![Point::new(0, 0), Point::new(1, 0)]);
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn test_normalize_extreme_span_does_not_overflow() {
        let points = [Point::new(i32::MAX, 0), Point::new(i32::MIN, i32::MIN)];
        let cells = normalize(&points);
        assert_eq!(cells.len(), 2);
        assert!(cells.contains(&Point::new(0, 0)));
        assert!(cells.iter().all(|c| c.x >= 0 && c.y >= 0));
    }
}
