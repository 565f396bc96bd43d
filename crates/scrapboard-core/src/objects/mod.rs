//! Board objects: ink drawings and media (images, link cards).

mod drawing;
mod media;

pub use drawing::DrawingObject;
pub use media::{ImageContent, ImageFormat, LinkContent, MediaContent, MediaObject};

use crate::ink::InkDrawing;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for board objects.
pub type ObjectId = Uuid;

/// Center position, size and rotation of an object in board coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Center of the object.
    pub position: Point,
    pub size: Size,
    /// Clockwise rotation in degrees.
    pub angle_degrees: f64,
}

impl Geometry {
    pub fn new(position: Point, size: Size, angle_degrees: f64) -> Self {
        Self {
            position,
            size,
            angle_degrees,
        }
    }

    /// Axis-aligned box around the center, ignoring rotation.
    pub fn frame(&self) -> Rect {
        Rect::from_center_size(self.position, self.size)
    }
}

/// Exact saved geometry of an object, used by undo.
///
/// Drawings keep their ink so that restoring is lossless even after
/// repeated scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GeometrySnapshot {
    Stored(Geometry),
    Ink(InkDrawing),
}

/// Kind tag for an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Drawing,
    Image,
    Link,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ObjectKind::Drawing => "drawing",
            ObjectKind::Image => "image",
            ObjectKind::Link => "link",
        };
        f.write_str(name)
    }
}

/// Behaviour shared by every object kind.
pub trait ObjectTrait {
    fn id(&self) -> ObjectId;

    fn geometry(&self) -> Geometry;

    /// Move and resize to `geometry`. Kinds without rotation ignore the angle.
    fn set_geometry(&mut self, geometry: Geometry);

    fn capture_geometry(&self) -> GeometrySnapshot;

    /// Restore a snapshot taken by `capture_geometry`. Returns false when the
    /// snapshot belongs to another kind.
    fn restore_geometry(&mut self, snapshot: &GeometrySnapshot) -> bool;

    fn translate(&mut self, delta: Vec2);
}

/// An object on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoardObject {
    Drawing(DrawingObject),
    Media(MediaObject),
}

impl BoardObject {
    pub fn id(&self) -> ObjectId {
        match self {
            BoardObject::Drawing(o) => o.id(),
            BoardObject::Media(o) => o.id(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            BoardObject::Drawing(_) => ObjectKind::Drawing,
            BoardObject::Media(m) => match m.content {
                MediaContent::Image(_) => ObjectKind::Image,
                MediaContent::Link(_) => ObjectKind::Link,
            },
        }
    }

    pub fn geometry(&self) -> Geometry {
        match self {
            BoardObject::Drawing(o) => o.geometry(),
            BoardObject::Media(o) => o.geometry(),
        }
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        match self {
            BoardObject::Drawing(o) => o.set_geometry(geometry),
            BoardObject::Media(o) => o.set_geometry(geometry),
        }
    }

    pub fn capture_geometry(&self) -> GeometrySnapshot {
        match self {
            BoardObject::Drawing(o) => o.capture_geometry(),
            BoardObject::Media(o) => o.capture_geometry(),
        }
    }

    pub fn restore_geometry(&mut self, snapshot: &GeometrySnapshot) -> bool {
        match self {
            BoardObject::Drawing(o) => o.restore_geometry(snapshot),
            BoardObject::Media(o) => o.restore_geometry(snapshot),
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        match self {
            BoardObject::Drawing(o) => o.translate(delta),
            BoardObject::Media(o) => o.translate(delta),
        }
    }

    /// Whether this object can be rotated.
    pub fn supports_rotation(&self) -> bool {
        matches!(self, BoardObject::Media(_))
    }

    /// Drawings with no ink are removed when editing ends.
    pub fn is_empty_drawing(&self) -> bool {
        matches!(self, BoardObject::Drawing(d) if d.ink.is_empty())
    }

    pub fn as_drawing(&self) -> Option<&DrawingObject> {
        match self {
            BoardObject::Drawing(d) => Some(d),
            BoardObject::Media(_) => None,
        }
    }

    pub fn as_media(&self) -> Option<&MediaObject> {
        match self {
            BoardObject::Media(m) => Some(m),
            BoardObject::Drawing(_) => None,
        }
    }

    pub fn as_media_mut(&mut self) -> Option<&mut MediaObject> {
        match self {
            BoardObject::Media(m) => Some(m),
            BoardObject::Drawing(_) => None,
        }
    }

    /// Copy with a fresh id.
    pub fn duplicated(&self) -> Self {
        let mut copy = self.clone();
        match &mut copy {
            BoardObject::Drawing(d) => d.id = Uuid::new_v4(),
            BoardObject::Media(m) => m.id = Uuid::new_v4(),
        }
        copy
    }
}

impl From<DrawingObject> for BoardObject {
    fn from(drawing: DrawingObject) -> Self {
        BoardObject::Drawing(drawing)
    }
}

impl From<MediaObject> for BoardObject {
    fn from(media: MediaObject) -> Self {
        BoardObject::Media(media)
    }
}
