//! Scoring rules

/// Points for any successfully placed figure
pub const FIGURE_POINTS: u64 = 4;
/// Points per cleared line (row or column)
pub const LINE_POINTS: u64 = 10;

/// Points earned by one placement that cleared `lines` lines.
/// Clearing more than one line at once doubles the line points.
pub fn placement_points(lines: u32) -> u64 {
    let lines = lines as u64;
    let mut points = FIGURE_POINTS;
    if lines > 0 {
        points += LINE_POINTS * lines;
    }
    if lines > 1 {
        points += LINE_POINTS * lines;
    }
    points
}

/// Short label for a clear, for logs
pub fn clear_name(lines: u32) -> &'static str {
    match lines {
        0 => "None",
        1 => "Single",
        2 => "Double",
        3 => "Triple",
        _ => "Multi",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_placement() {
        assert_eq!(placement_points(0), 4);
    }

    #[test]
    fn test_single_clear() {
        assert_eq!(placement_points(1), 14);
    }

    #[test]
    fn test_multi_line_bonus() {
        assert_eq!(placement_points(2), 44);
        assert_eq!(placement_points(3), 64);
    }
}
