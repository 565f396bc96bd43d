//! Scrapboard Core Library
//!
//! Board model, object geometry, transform gestures, undo coordination and
//! persistence for Scrapboard boards. Rendering and ink capture live outside
//! this crate.

pub mod board;
pub mod config;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod history;
pub mod ink;
pub mod objects;
pub mod selection;
pub mod services;
pub mod session;
pub mod storage;
pub mod viewport;

pub use board::{Board, ResolvedObject};
pub use config::{BoardConfig, ConfigError};
pub use error::{ImportError, LinkPreviewError};
pub use geometry::{ResizeHandle, UnitPoint};
pub use gesture::TransientTransform;
pub use history::{UndoAuthority, UndoCoordinator};
pub use ink::{InkDrawing, InkHistory, InkStroke};
pub use objects::{BoardObject, Geometry, ObjectId, ObjectKind};
pub use selection::Selection;
pub use services::{ImageSource, LinkPreview, LinkPreviewProvider};
pub use session::{BoardEvent, BoardSession};
pub use storage::{BoardSummary, Storage, StorageError};
