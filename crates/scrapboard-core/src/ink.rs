//! Ink payload exchanged with the drawing engine.
//!
//! The engine owns stroke capture and rendering. The board only needs to
//! measure, move and scale the ink, and to ask the engine for its own undo
//! stack while a drawing is being edited.

use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};

/// A single stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InkStroke {
    pub points: Vec<Point>,
    /// Nominal pen width.
    pub width: f64,
}

impl InkStroke {
    pub fn new(points: Vec<Point>, width: f64) -> Self {
        Self { points, width }
    }
}

/// An ink drawing: a list of strokes in board coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InkDrawing {
    pub strokes: Vec<InkStroke>,
}

impl InkDrawing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_strokes(strokes: Vec<InkStroke>) -> Self {
        Self { strokes }
    }

    /// A drawing with no points is empty.
    pub fn is_empty(&self) -> bool {
        self.strokes.iter().all(|s| s.points.is_empty())
    }

    /// Content bounds of all stroke points. Zero rect when empty.
    pub fn bounds(&self) -> Rect {
        let mut points = self.strokes.iter().flat_map(|s| s.points.iter());
        let Some(first) = points.next() else {
            return Rect::ZERO;
        };
        points.fold(Rect::from_points(*first, *first), |rect, p| rect.union_pt(*p))
    }

    /// Apply an affine transform to every point.
    ///
    /// Pen widths are left as they are.
    pub fn transform(&mut self, affine: Affine) {
        for stroke in &mut self.strokes {
            for point in &mut stroke.points {
                *point = affine * *point;
            }
        }
    }
}

/// The drawing engine's own undo stack for the drawing being edited.
pub trait InkHistory {
    fn can_undo(&self) -> bool;
    fn can_redo(&self) -> bool;
    fn undo(&mut self);
    fn redo(&mut self);
}
