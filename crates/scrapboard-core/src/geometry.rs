//! Anchor-relative resize math, rotation helpers and zoom-step quantization.
//!
//! Angles are in degrees, clockwise on screen (y grows downwards).
//! Object positions are centers.

use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

/// One of the eight resize handles around a selected object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResizeHandle {
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::Top,
        ResizeHandle::Bottom,
        ResizeHandle::Left,
        ResizeHandle::Right,
        ResizeHandle::TopLeft,
        ResizeHandle::TopRight,
        ResizeHandle::BottomLeft,
        ResizeHandle::BottomRight,
    ];

    /// Which side of the center the handle sits on, per local axis (-1, 0 or 1).
    pub fn side(self) -> Vec2 {
        match self {
            ResizeHandle::Top => Vec2::new(0.0, -1.0),
            ResizeHandle::Bottom => Vec2::new(0.0, 1.0),
            ResizeHandle::Left => Vec2::new(-1.0, 0.0),
            ResizeHandle::Right => Vec2::new(1.0, 0.0),
            ResizeHandle::TopLeft => Vec2::new(-1.0, -1.0),
            ResizeHandle::TopRight => Vec2::new(1.0, -1.0),
            ResizeHandle::BottomLeft => Vec2::new(-1.0, 1.0),
            ResizeHandle::BottomRight => Vec2::new(1.0, 1.0),
        }
    }

    /// Edge handles resize a single axis.
    pub fn is_edge(self) -> bool {
        matches!(
            self,
            ResizeHandle::Top | ResizeHandle::Bottom | ResizeHandle::Left | ResizeHandle::Right
        )
    }

    /// The point held fixed while this handle is dragged, in unit coordinates.
    pub fn anchor(self) -> UnitPoint {
        let side = self.side();
        UnitPoint::new((1.0 - side.x) / 2.0, (1.0 - side.y) / 2.0)
    }
}

/// A point in an object's unit square: (0, 0) is top-left, (1, 1) bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitPoint {
    pub x: f64,
    pub y: f64,
}

impl UnitPoint {
    pub const CENTER: UnitPoint = UnitPoint { x: 0.5, y: 0.5 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset of this unit point from the center of a box of `size`.
    pub fn offset_in(self, size: Size) -> Vec2 {
        Vec2::new((self.x - 0.5) * size.width, (self.y - 0.5) * size.height)
    }
}

/// Rotate a vector clockwise by `degrees`.
pub fn rotate_vec(v: Vec2, degrees: f64) -> Vec2 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    Vec2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Express a board-space delta in an object's unrotated frame.
pub fn to_local(delta: Vec2, degrees: f64) -> Vec2 {
    rotate_vec(delta, -degrees)
}

/// Size after dragging `handle` by `local_delta` (already in the object frame).
///
/// Edge handles ignore the component along their edge. The result never
/// drops below `min_size`.
pub fn resized(size: Size, handle: ResizeHandle, local_delta: Vec2, min_size: Size) -> Size {
    let side = handle.side();
    let dx = if side.x == 0.0 { 0.0 } else { side.x * local_delta.x };
    let dy = if side.y == 0.0 { 0.0 } else { side.y * local_delta.y };
    let width = if side.x == 0.0 {
        size.width
    } else {
        (size.width + dx).max(min_size.width)
    };
    let height = if side.y == 0.0 {
        size.height
    } else {
        (size.height + dy).max(min_size.height)
    };
    Size::new(width, height)
}

/// Center that keeps the anchor of `handle` fixed when `size` becomes `new_size`.
pub fn anchored_center(
    center: Point,
    size: Size,
    new_size: Size,
    handle: ResizeHandle,
    degrees: f64,
) -> Point {
    let side = handle.side();
    let local_shift = Vec2::new(
        side.x * (new_size.width - size.width) / 2.0,
        side.y * (new_size.height - size.height) / 2.0,
    );
    center + rotate_vec(local_shift, degrees)
}

/// Board-space location of a unit point on a rotated box.
pub fn unit_point_location(center: Point, size: Size, degrees: f64, unit: UnitPoint) -> Point {
    center + rotate_vec(unit.offset_in(size), degrees)
}

/// Board-space location of a handle on a rotated box.
pub fn handle_location(center: Point, size: Size, degrees: f64, handle: ResizeHandle) -> Point {
    let side = handle.side();
    let unit = UnitPoint::new((1.0 + side.x) / 2.0, (1.0 + side.y) / 2.0);
    unit_point_location(center, size, degrees, unit)
}

/// Index of the step closest to `value`. Ties resolve to the lower step.
///
/// `steps` must be non-empty and sorted ascending.
pub fn closest_step_index(steps: &[f64], value: f64) -> usize {
    let mut best = 0;
    let mut best_diff = f64::INFINITY;
    for (i, step) in steps.iter().enumerate() {
        let diff = (step - value).abs();
        if diff < best_diff {
            best = i;
            best_diff = diff;
        }
    }
    best
}

/// The step after the one closest to `value`, or `value` at the top of the table.
pub fn next_step(steps: &[f64], value: f64) -> f64 {
    let index = closest_step_index(steps, value);
    steps.get(index + 1).copied().unwrap_or(value)
}

/// The step before the one closest to `value`, or `value` at the bottom of the table.
pub fn previous_step(steps: &[f64], value: f64) -> f64 {
    match closest_step_index(steps, value) {
        0 => value,
        index => steps[index - 1],
    }
}

/// The largest step not above `value`, or the smallest step.
pub fn floor_step(steps: &[f64], value: f64) -> f64 {
    steps
        .iter()
        .rev()
        .find(|&&step| step <= value)
        .or_else(|| steps.first())
        .copied()
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZOOM_STEPS;

    const MIN_SIZE: Size = Size::new(16.0, 16.0);

    fn approx(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    #[test]
    fn test_anchor_is_opposite() {
        assert_eq!(ResizeHandle::BottomRight.anchor(), UnitPoint::new(0.0, 0.0));
        assert_eq!(ResizeHandle::TopLeft.anchor(), UnitPoint::new(1.0, 1.0));
        assert_eq!(ResizeHandle::Top.anchor(), UnitPoint::new(0.5, 1.0));
        assert_eq!(ResizeHandle::Left.anchor(), UnitPoint::new(1.0, 0.5));
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let v = rotate_vec(Vec2::new(1.0, 0.0), 90.0);
        assert!(v.x.abs() < 1e-12);
        assert!((v.y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_edge_ignores_orthogonal_component() {
        let size = Size::new(100.0, 50.0);
        let result = resized(size, ResizeHandle::Right, Vec2::new(10.0, 40.0), MIN_SIZE);
        assert_eq!(result, Size::new(110.0, 50.0));
        let result = resized(size, ResizeHandle::Top, Vec2::new(10.0, -20.0), MIN_SIZE);
        assert_eq!(result, Size::new(100.0, 70.0));
    }

    #[test]
    fn test_minimum_size_floor() {
        let size = Size::new(100.0, 50.0);
        let result = resized(size, ResizeHandle::BottomRight, Vec2::new(-500.0, -500.0), MIN_SIZE);
        assert_eq!(result, MIN_SIZE);
    }

    #[test]
    fn test_anchored_center_unrotated() {
        let center = Point::new(50.0, 25.0);
        let size = Size::new(100.0, 50.0);
        let new_size = Size::new(120.0, 70.0);
        let new_center = anchored_center(center, size, new_size, ResizeHandle::BottomRight, 0.0);
        assert!(approx(new_center, Point::new(60.0, 35.0)));
        // Top-left corner stays at the origin
        let top_left = handle_location(new_center, new_size, 0.0, ResizeHandle::TopLeft);
        assert!(approx(top_left, Point::ZERO));
    }

    #[test]
    fn test_closest_step() {
        assert_eq!(closest_step_index(&ZOOM_STEPS, 1.0), 9);
        assert_eq!(closest_step_index(&ZOOM_STEPS, 0.8), 8);
        assert_eq!(closest_step_index(&ZOOM_STEPS, 100.0), ZOOM_STEPS.len() - 1);
        assert_eq!(closest_step_index(&ZOOM_STEPS, 0.0), 0);
    }

    #[test]
    fn test_step_navigation() {
        assert_eq!(next_step(&ZOOM_STEPS, 1.0), 1.25);
        assert_eq!(previous_step(&ZOOM_STEPS, 1.0), 0.75);
        assert_eq!(next_step(&ZOOM_STEPS, 4.0), 4.0);
        assert_eq!(previous_step(&ZOOM_STEPS, 0.02), 0.02);
        assert_eq!(floor_step(&ZOOM_STEPS, 0.6), 0.5);
        assert_eq!(floor_step(&ZOOM_STEPS, 0.001), 0.02);
    }
}
