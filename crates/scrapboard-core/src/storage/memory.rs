//! In-memory storage.
//!
//! Boards are kept in their saved JSON form, so a load goes through the same
//! parsing and order repair as a board read from disk.

use super::{BoardSummary, BoxFuture, Storage, StorageError, StorageResult, sort_summaries};
use crate::board::Board;
use std::collections::HashMap;
use std::sync::RwLock;

struct StoredBoard {
    summary: BoardSummary,
    json: String,
}

/// Storage for tests and boards that are never written to disk.
#[derive(Default)]
pub struct MemoryStorage {
    boards: RwLock<HashMap<String, StoredBoard>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, board: &Board) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        let stored = board
            .to_json()
            .map(|json| StoredBoard {
                summary: BoardSummary {
                    id: id.clone(),
                    ..BoardSummary::from(board)
                },
                json,
            })
            .map_err(|e| StorageError::Serialization(e.to_string()));
        Box::pin(async move {
            let stored = stored?;
            self.boards.write().map_err(poisoned)?.insert(id, stored);
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<Board>> {
        let id = id.to_string();
        Box::pin(async move {
            let boards = self.boards.read().map_err(poisoned)?;
            let stored = boards.get(&id).ok_or_else(|| StorageError::NotFound(id.clone()))?;
            Board::from_json(&stored.json).map_err(|e| StorageError::Serialization(format!("{id}: {e}")))
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            self.boards.write().map_err(poisoned)?.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<BoardSummary>>> {
        Box::pin(async move {
            let boards = self.boards.read().map_err(poisoned)?;
            let mut summaries: Vec<BoardSummary> = boards.values().map(|b| b.summary.clone()).collect();
            sort_summaries(&mut summaries);
            Ok(summaries)
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move { Ok(self.boards.read().map_err(poisoned)?.contains_key(&id)) })
    }
}
