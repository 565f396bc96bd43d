//! Ink drawing objects.

use super::{Geometry, GeometrySnapshot, ObjectId, ObjectTrait};
use crate::ink::InkDrawing;
use kurbo::{Affine, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A drawing whose geometry is derived from its ink bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingObject {
    pub(crate) id: ObjectId,
    pub ink: InkDrawing,
}

impl DrawingObject {
    pub fn new(ink: InkDrawing) -> Self {
        Self {
            id: Uuid::new_v4(),
            ink,
        }
    }

    pub fn empty() -> Self {
        Self::new(InkDrawing::new())
    }
}

impl ObjectTrait for DrawingObject {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn geometry(&self) -> Geometry {
        let bounds = self.ink.bounds();
        Geometry::new(bounds.center(), bounds.size(), 0.0)
    }

    /// Scales the ink about its bounds center, then moves it to the new center.
    /// Degenerate axes keep their scale.
    fn set_geometry(&mut self, geometry: Geometry) {
        if self.ink.is_empty() {
            return;
        }
        let bounds = self.ink.bounds();
        let sx = if bounds.width() > 0.0 {
            geometry.size.width / bounds.width()
        } else {
            1.0
        };
        let sy = if bounds.height() > 0.0 {
            geometry.size.height / bounds.height()
        } else {
            1.0
        };
        let affine = Affine::translate(geometry.position.to_vec2())
            * Affine::scale_non_uniform(sx, sy)
            * Affine::translate(-bounds.center().to_vec2());
        self.ink.transform(affine);
    }

    fn capture_geometry(&self) -> GeometrySnapshot {
        GeometrySnapshot::Ink(self.ink.clone())
    }

    fn restore_geometry(&mut self, snapshot: &GeometrySnapshot) -> bool {
        match snapshot {
            GeometrySnapshot::Ink(ink) => {
                self.ink = ink.clone();
                true
            }
            GeometrySnapshot::Stored(_) => false,
        }
    }

    fn translate(&mut self, delta: Vec2) {
        self.ink.transform(Affine::translate(delta));
    }
}
