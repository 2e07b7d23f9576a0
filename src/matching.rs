//! Matching a drawn pixel set against held shapes

use crate::shape::{normalize, Point, Shape};

/// Whether `pixels` is exactly `shape` up to translation, trying all four
/// rotations when `rotateable` and only the stored orientation otherwise
pub fn matches_shape(pixels: &[Point], shape: &Shape, rotateable: bool) -> bool {
    let drawn = normalize(pixels);
    if drawn.len() != pixels.len() || drawn.len() != shape.cells.len() {
        return false;
    }
    let orientations = if rotateable { 4 } else { 1 };
    (0..orientations).any(|r| shape.rotated(r).cells == drawn)
}

/// Index of the first held shape the pixels match, in held order
pub fn match_figure(pixels: &[Point], held: &[Shape], rotateable: bool) -> Option<usize> {
    held.iter()
        .position(|shape| matches_shape(pixels, shape, rotateable))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeType;

    fn translate(shape: &Shape, dx: i32, dy: i32) -> Vec<Point> {
        shape.cells.iter().map(|c| Point::new(c.x + dx, c.y + dy)).collect()
    }

    #[test]
    fn test_translated_shape_matches_without_rotation() {
        for shape_type in ShapeType::all() {
            let shape = Shape::new(shape_type).rotate();
            let pixels = translate(&shape, 3, 5);
            assert!(matches_shape(&pixels, &shape, false), "{:?}", shape_type);
            assert!(matches_shape(&pixels, &shape, true), "{:?}", shape_type);
        }
    }

    #[test]
    fn test_rotation_gated_by_flag() {
        let held = Shape::new(ShapeType::L);
        let pixels = translate(&held.rotate(), 2, 2);
        assert!(!matches_shape(&pixels, &held, false));
        assert!(matches_shape(&pixels, &held, true));
    }

    #[test]
    fn test_first_matching_slot_wins() {
        let held = [Shape::new(ShapeType::T), Shape::new(ShapeType::T)];
        let pixels = translate(&held[1], 1, 1);
        assert_eq!(match_figure(&pixels, &held, false), Some(0));
    }

    #[test]
    fn test_second_slot() {
        let held = [Shape::new(ShapeType::O), Shape::new(ShapeType::I)];
        let pixels = translate(&held[1], 0, 9);
        assert_eq!(match_figure(&pixels, &held, false), Some(1));
    }

    #[test]
    fn test_wrong_size_or_duplicates_never_match() {
        let held = [Shape::new(ShapeType::O)];
        let three = [Point::new(0, 0), Point::new(1, 0), Point::new(0, 1)];
        assert_eq!(match_figure(&three, &held, true), None);

        let with_dup = [Point::new(0, 0), Point::new(1, 0), Point::new(0, 1), Point::new(0, 1)];
        assert_eq!(match_figure(&with_dup, &held, true), None);
        assert_eq!(match_figure(&[], &held, true), None);

        let far_apart = [Point::new(i32::MAX, 0), Point::new(i32::MIN, 0), Point::new(0, 1), Point::new(1, 1)];
        assert_eq!(match_figure(&far_apart, &held, true), None);
    }
}
