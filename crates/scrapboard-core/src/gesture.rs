//! Move, resize and rotate gestures.
//!
//! A gesture keeps the geometry the object had when it started and the
//! accumulated input. While it runs it only exposes a transient visual
//! transform; the model is touched once, when the finished gesture is
//! committed.

use crate::geometry::{ResizeHandle, UnitPoint, anchored_center, resized, to_local, unit_point_location};
use crate::objects::{Geometry, ObjectId};
use kurbo::{Affine, Size, Vec2};

/// Visual-only transform applied on top of an object's committed geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransientTransform {
    /// Translation in board units.
    pub offset: Vec2,
    /// Scale in the object frame, about `anchor`.
    pub scale: Vec2,
    pub anchor: UnitPoint,
    /// Rotation about the center, in degrees, added to the committed angle.
    pub rotation_degrees: f64,
}

impl Default for TransientTransform {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: Vec2::new(1.0, 1.0),
            anchor: UnitPoint::CENTER,
            rotation_degrees: 0.0,
        }
    }
}

impl TransientTransform {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }

    /// Board-space transform mapping the committed object onto its preview.
    pub fn affine(&self, base: &Geometry) -> Affine {
        let angle = base.angle_degrees.to_radians();
        let anchor = unit_point_location(base.position, base.size, base.angle_degrees, self.anchor).to_vec2();
        let center = base.position.to_vec2();

        let scale = Affine::translate(anchor)
            * Affine::rotate(angle)
            * Affine::scale_non_uniform(self.scale.x, self.scale.y)
            * Affine::rotate(-angle)
            * Affine::translate(-anchor);
        let rotation = Affine::translate(center)
            * Affine::rotate(self.rotation_degrees.to_radians())
            * Affine::translate(-center);

        Affine::translate(self.offset) * rotation * scale
    }
}

/// Dragging a whole object.
#[derive(Debug, Clone)]
pub struct MoveGesture {
    pub object_id: ObjectId,
    pub start: Geometry,
    /// Total translation since the gesture began, in board units.
    pub translation: Vec2,
}

impl MoveGesture {
    pub fn new(object_id: ObjectId, start: Geometry) -> Self {
        Self {
            object_id,
            start,
            translation: Vec2::ZERO,
        }
    }

    pub fn update(&mut self, translation: Vec2) {
        self.translation = translation;
    }

    pub fn transient(&self) -> TransientTransform {
        TransientTransform {
            offset: self.translation,
            ..TransientTransform::default()
        }
    }

    pub fn preview(&self) -> Geometry {
        Geometry {
            position: self.start.position + self.translation,
            ..self.start
        }
    }
}

/// Dragging one of the eight resize handles.
#[derive(Debug, Clone)]
pub struct ResizeGesture {
    pub object_id: ObjectId,
    pub handle: ResizeHandle,
    pub start: Geometry,
    min_size: Size,
    size: Size,
}

impl ResizeGesture {
    pub fn new(object_id: ObjectId, handle: ResizeHandle, start: Geometry, min_size: Size) -> Self {
        Self {
            object_id,
            handle,
            start,
            min_size,
            size: start.size,
        }
    }

    /// Update with the total board-space drag since the gesture began.
    ///
    /// An axis that starts at zero length (a straight drawing stroke) stays
    /// flat; there is nothing along it to stretch.
    pub fn update(&mut self, translation: Vec2) {
        let local = to_local(translation, self.start.angle_degrees);
        let mut size = resized(self.start.size, self.handle, local, self.min_size);
        if self.start.size.width == 0.0 {
            size.width = 0.0;
        }
        if self.start.size.height == 0.0 {
            size.height = 0.0;
        }
        self.size = size;
    }

    /// Current per-axis scale relative to the starting size.
    pub fn scale(&self) -> Vec2 {
        let sx = if self.start.size.width > 0.0 {
            self.size.width / self.start.size.width
        } else {
            1.0
        };
        let sy = if self.start.size.height > 0.0 {
            self.size.height / self.start.size.height
        } else {
            1.0
        };
        Vec2::new(sx, sy)
    }

    pub fn transient(&self) -> TransientTransform {
        TransientTransform {
            scale: self.scale(),
            anchor: self.handle.anchor(),
            ..TransientTransform::default()
        }
    }

    /// Geometry with the new size and the center moved so the anchor stays put.
    pub fn preview(&self) -> Geometry {
        let start = self.start;
        Geometry {
            position: anchored_center(start.position, start.size, self.size, self.handle, start.angle_degrees),
            size: self.size,
            angle_degrees: start.angle_degrees,
        }
    }
}

/// Two-finger rotation.
#[derive(Debug, Clone)]
pub struct RotateGesture {
    pub object_id: ObjectId,
    pub start: Geometry,
    /// Accumulated rotation since the gesture began, in degrees.
    pub rotation_degrees: f64,
}

impl RotateGesture {
    pub fn new(object_id: ObjectId, start: Geometry) -> Self {
        Self {
            object_id,
            start,
            rotation_degrees: 0.0,
        }
    }

    pub fn update(&mut self, rotation_degrees: f64) {
        self.rotation_degrees = rotation_degrees;
    }

    pub fn transient(&self) -> TransientTransform {
        TransientTransform {
            rotation_degrees: self.rotation_degrees,
            ..TransientTransform::default()
        }
    }

    pub fn preview(&self) -> Geometry {
        Geometry {
            angle_degrees: self.start.angle_degrees + self.rotation_degrees,
            ..self.start
        }
    }
}

/// The gesture in progress on the selected object.
#[derive(Debug, Clone)]
pub enum Gesture {
    Move(MoveGesture),
    Resize(ResizeGesture),
    Rotate(RotateGesture),
}

impl Gesture {
    pub fn object_id(&self) -> ObjectId {
        match self {
            Gesture::Move(g) => g.object_id,
            Gesture::Resize(g) => g.object_id,
            Gesture::Rotate(g) => g.object_id,
        }
    }

    pub fn start(&self) -> Geometry {
        match self {
            Gesture::Move(g) => g.start,
            Gesture::Resize(g) => g.start,
            Gesture::Rotate(g) => g.start,
        }
    }

    pub fn transient(&self) -> TransientTransform {
        match self {
            Gesture::Move(g) => g.transient(),
            Gesture::Resize(g) => g.transient(),
            Gesture::Rotate(g) => g.transient(),
        }
    }

    pub fn preview(&self) -> Geometry {
        match self {
            Gesture::Move(g) => g.preview(),
            Gesture::Resize(g) => g.preview(),
            Gesture::Rotate(g) => g.preview(),
        }
    }

    /// Final geometry to commit, or `None` when nothing changed.
    pub fn finish(&self) -> Option<Geometry> {
        let end = self.preview();
        (end != self.start()).then_some(end)
    }
}
