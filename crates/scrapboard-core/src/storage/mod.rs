//! Storage abstraction for persisting boards.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::board::Board;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Board not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// What the board list shows without loading every object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardSummary {
    pub id: String,
    pub name: String,
    pub last_modified: u64,
    pub is_favorite: bool,
    pub object_count: usize,
}

impl From<&Board> for BoardSummary {
    fn from(board: &Board) -> Self {
        Self {
            id: board.id.clone(),
            name: board.name.clone(),
            last_modified: board.last_modified,
            is_favorite: board.is_favorite,
            object_count: board.len(),
        }
    }
}

/// Newest first; ties broken by id so the order is stable.
pub(crate) fn sort_summaries(summaries: &mut [BoardSummary]) {
    summaries.sort_by(|a, b| {
        b.last_modified
            .cmp(&a.last_modified)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Trait for board storage backends.
pub trait Storage: Send + Sync {
    /// Save a board under `id`.
    fn save(&self, id: &str, board: &Board) -> BoxFuture<'_, StorageResult<()>>;

    /// Load a board.
    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<Board>>;

    /// Delete a board. Deleting a missing board is not an error.
    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List stored boards, most recently modified first.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<BoardSummary>>>;

    /// Check if a board exists.
    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}
