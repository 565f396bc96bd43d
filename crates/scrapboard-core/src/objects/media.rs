//! Media objects: images and link cards.

use super::{Geometry, GeometrySnapshot, ObjectId, ObjectTrait};
use crate::error::ImportError;
use base64::{Engine, engine::general_purpose::STANDARD};
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use uuid::Uuid;

/// Image format for stored image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    /// Detect format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 4 {
            return None;
        }
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(ImageFormat::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(ImageFormat::Jpeg);
        }
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(ImageFormat::WebP);
        }
        None
    }
}

/// Compressed image bytes plus what was learned from probing them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    pub format: ImageFormat,
    /// Source size in pixels.
    pub pixel_width: u32,
    pub pixel_height: u32,
    /// Compressed bytes, base64 encoded.
    pub data_base64: String,
}

impl ImageContent {
    /// Probe `data` for format and pixel size.
    ///
    /// Only the header is decoded.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ImportError> {
        let format = ImageFormat::from_magic_bytes(data).ok_or(ImportError::UnsupportedFormat)?;
        let (pixel_width, pixel_height) = image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ImportError::Unreadable(e.to_string()))?
            .into_dimensions()?;
        if pixel_width == 0 || pixel_height == 0 {
            return Err(ImportError::Unreadable("image has no pixels".to_string()));
        }
        Ok(Self {
            format,
            pixel_width,
            pixel_height,
            data_base64: STANDARD.encode(data),
        })
    }

    /// Decoded bytes, or `None` if the stored base64 is corrupt.
    pub fn data(&self) -> Option<Vec<u8>> {
        STANDARD.decode(&self.data_base64).ok()
    }

    /// Display size for a given width, keeping the aspect ratio.
    pub fn size_for_width(&self, width: f64) -> Size {
        let aspect = self.pixel_height as f64 / self.pixel_width as f64;
        Size::new(width, width * aspect)
    }
}

/// A link card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkContent {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Preview image bytes, base64 encoded.
    #[serde(default)]
    pub preview_base64: Option<String>,
}

impl LinkContent {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            preview_base64: None,
        }
    }

    pub fn set_preview_image(&mut self, bytes: Option<&[u8]>) {
        self.preview_base64 = bytes.map(|b| STANDARD.encode(b));
    }

    pub fn preview_image(&self) -> Option<Vec<u8>> {
        self.preview_base64
            .as_ref()
            .and_then(|encoded| STANDARD.decode(encoded).ok())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MediaContent {
    Image(ImageContent),
    Link(LinkContent),
}

/// An image or link with explicit geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaObject {
    pub(crate) id: ObjectId,
    /// Center position.
    pub position: Point,
    pub size: Size,
    pub angle_degrees: f64,
    pub content: MediaContent,
}

impl MediaObject {
    pub fn new(position: Point, size: Size, content: MediaContent) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            size,
            angle_degrees: 0.0,
            content,
        }
    }

    pub fn image(position: Point, width: f64, content: ImageContent) -> Self {
        let size = content.size_for_width(width);
        Self::new(position, size, MediaContent::Image(content))
    }

    pub fn link(position: Point, size: Size, url: impl Into<String>) -> Self {
        Self::new(position, size, MediaContent::Link(LinkContent::new(url)))
    }

    pub fn link_content(&self) -> Option<&LinkContent> {
        match &self.content {
            MediaContent::Link(link) => Some(link),
            MediaContent::Image(_) => None,
        }
    }

    pub fn link_content_mut(&mut self) -> Option<&mut LinkContent> {
        match &mut self.content {
            MediaContent::Link(link) => Some(link),
            MediaContent::Image(_) => None,
        }
    }
}

impl ObjectTrait for MediaObject {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn geometry(&self) -> Geometry {
        Geometry::new(self.position, self.size, self.angle_degrees)
    }

    fn set_geometry(&mut self, geometry: Geometry) {
        self.position = geometry.position;
        self.size = geometry.size;
        self.angle_degrees = geometry.angle_degrees;
    }

    fn capture_geometry(&self) -> GeometrySnapshot {
        GeometrySnapshot::Stored(self.geometry())
    }

    fn restore_geometry(&mut self, snapshot: &GeometrySnapshot) -> bool {
        match snapshot {
            GeometrySnapshot::Stored(geometry) => {
                self.set_geometry(*geometry);
                true
            }
            GeometrySnapshot::Ink(_) => false,
        }
    }

    fn translate(&mut self, delta: Vec2) {
        self.position += delta;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::png_bytes;

    #[test]
    fn test_probe_png() {
        let content = ImageContent::from_bytes(&png_bytes(40, 20)).unwrap();
        assert_eq!(content.format, ImageFormat::Png);
        assert_eq!((content.pixel_width, content.pixel_height), (40, 20));
        assert_eq!(content.size_for_width(200.0), Size::new(200.0, 100.0));
        assert_eq!(content.data().unwrap(), png_bytes(40, 20));
    }

    #[test]
    fn test_probe_rejects_garbage() {
        let result = ImageContent::from_bytes(b"definitely not an image");
        assert_eq!(result, Err(ImportError::UnsupportedFormat));
    }

    #[test]
    fn test_probe_rejects_truncated_png() {
        let bytes = png_bytes(8, 8);
        let result = ImageContent::from_bytes(&bytes[..10]);
        assert!(matches!(result, Err(ImportError::Unreadable(_))));
    }

    #[test]
    fn test_link_preview_image_round_trip() {
        let mut link = LinkContent::new("https://example.com");
        assert!(link.preview_image().is_none());
        link.set_preview_image(Some(&[1, 2, 3]));
        assert_eq!(link.preview_image(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_media_geometry() {
        let mut media = MediaObject::link(Point::new(10.0, 20.0), Size::new(200.0, 150.0), "x");
        media.set_geometry(Geometry::new(Point::new(1.0, 2.0), Size::new(3.0, 4.0), 45.0));
        assert_eq!(media.angle_degrees, 45.0);
        media.translate(Vec2::new(1.0, 1.0));
        assert_eq!(media.position, Point::new(2.0, 3.0));
    }
}
