//! Undo/redo.
//!
//! Structural edits (adding, removing, reordering and reshaping objects,
//! board metadata) are recorded as invertible commands grouped per user
//! action. While a drawing is being edited the ink engine's own stack takes
//! over; `UndoCoordinator` routes undo/redo to whichever stack is in charge.

use crate::board::Board;
use crate::ink::InkHistory;
use crate::objects::{BoardObject, GeometrySnapshot, MediaContent, ObjectId};
use crate::viewport::Viewport;

/// Default maximum number of undo groups to keep.
pub const MAX_UNDO_HISTORY: usize = 50;

/// One invertible edit, holding both old and new values.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddObject { object: BoardObject, index: usize },
    RemoveObject { object: BoardObject, index: usize },
    /// Move the order entry at `from` to `to`. `to` is already resolved to a
    /// valid index.
    Reorder { from: usize, to: usize },
    Reshape {
        id: ObjectId,
        before: GeometrySnapshot,
        after: GeometrySnapshot,
    },
    ReplaceContent {
        id: ObjectId,
        before: MediaContent,
        after: MediaContent,
    },
    Rename { before: String, after: String },
    SetFavorite { before: bool, after: bool },
    SetGridVisible { before: bool, after: bool },
    SetViewport { before: Viewport, after: Viewport },
}

impl Command {
    pub fn apply(&self, board: &mut Board) {
        match self {
            Command::AddObject { object, index } => {
                board.add_object(object.clone(), Some(*index));
            }
            Command::RemoveObject { object, .. } => {
                board.remove_object(object.id());
            }
            Command::Reorder { from, to } => {
                board.reorder(*from, *to);
            }
            Command::Reshape { id, after, .. } => restore_geometry(board, *id, after),
            Command::ReplaceContent { id, after, .. } => replace_content(board, *id, after),
            Command::Rename { after, .. } => board.name = after.clone(),
            Command::SetFavorite { after, .. } => board.is_favorite = *after,
            Command::SetGridVisible { after, .. } => board.grid_visible = *after,
            Command::SetViewport { after, .. } => board.viewport = *after,
        }
    }

    pub fn revert(&self, board: &mut Board) {
        match self {
            Command::AddObject { object, .. } => {
                board.remove_object(object.id());
            }
            Command::RemoveObject { object, index } => {
                board.add_object(object.clone(), Some(*index));
            }
            Command::Reorder { from, to } => {
                board.reorder(*to, *from);
            }
            Command::Reshape { id, before, .. } => restore_geometry(board, *id, before),
            Command::ReplaceContent { id, before, .. } => replace_content(board, *id, before),
            Command::Rename { before, .. } => board.name = before.clone(),
            Command::SetFavorite { before, .. } => board.is_favorite = *before,
            Command::SetGridVisible { before, .. } => board.grid_visible = *before,
            Command::SetViewport { before, .. } => board.viewport = *before,
        }
    }

    /// The object this command is about, if any.
    pub fn object_id(&self) -> Option<ObjectId> {
        match self {
            Command::AddObject { object, .. } | Command::RemoveObject { object, .. } => Some(object.id()),
            Command::Reshape { id, .. } | Command::ReplaceContent { id, .. } => Some(*id),
            _ => None,
        }
    }
}

fn restore_geometry(board: &mut Board, id: ObjectId, snapshot: &GeometrySnapshot) {
    match board.object_mut(id) {
        Some(object) => {
            if !object.restore_geometry(snapshot) {
                log::debug!("Geometry snapshot does not match object {id}");
            }
        }
        None => log::debug!("Reshape of missing object {id} ignored"),
    }
}

fn replace_content(board: &mut Board, id: ObjectId, content: &MediaContent) {
    match board.object_mut(id).and_then(BoardObject::as_media_mut) {
        Some(media) => media.content = content.clone(),
        None => log::debug!("Content replacement for missing media {id} ignored"),
    }
}

/// Commands recorded for a single user action.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoGroup {
    pub label: &'static str,
    pub commands: Vec<Command>,
}

impl UndoGroup {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            commands: Vec::new(),
        }
    }

    pub fn single(label: &'static str, command: Command) -> Self {
        Self {
            label,
            commands: vec![command],
        }
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Structural undo and redo stacks.
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<UndoGroup>,
    redo_stack: Vec<UndoGroup>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(MAX_UNDO_HISTORY)
    }
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record `group` and apply it to `board`. Clears the redo stack and
    /// drops the oldest group past the limit. Empty groups are ignored.
    pub fn commit(&mut self, group: UndoGroup, board: &mut Board) -> bool {
        if group.is_empty() {
            return false;
        }
        self.undo_stack.push(group);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.limit {
            self.undo_stack.remove(0);
        }
        if let Some(group) = self.undo_stack.last() {
            for command in &group.commands {
                command.apply(board);
            }
        }
        true
    }

    /// Revert the most recent group. Returns false if there is nothing to undo.
    pub fn undo(&mut self, board: &mut Board) -> bool {
        let Some(group) = self.undo_stack.pop() else {
            return false;
        };
        for command in group.commands.iter().rev() {
            command.revert(board);
        }
        log::debug!("Undo {}", group.label);
        self.redo_stack.push(group);
        true
    }

    /// Re-apply the most recently undone group.
    pub fn redo(&mut self, board: &mut Board) -> bool {
        let Some(group) = self.redo_stack.pop() else {
            return false;
        };
        for command in &group.commands {
            command.apply(board);
        }
        log::debug!("Redo {}", group.label);
        self.undo_stack.push(group);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// The group `undo` would revert next.
    pub fn last(&self) -> Option<&UndoGroup> {
        self.undo_stack.last()
    }

    /// The group `redo` would re-apply next.
    pub fn next_redo(&self) -> Option<&UndoGroup> {
        self.redo_stack.last()
    }

    /// Drop the newest group without reverting it, if `predicate` matches.
    pub fn discard_last_if(&mut self, predicate: impl FnOnce(&UndoGroup) -> bool) -> bool {
        if self.undo_stack.last().is_some_and(predicate) {
            self.undo_stack.pop();
            true
        } else {
            false
        }
    }
}

/// Which stack answers undo and redo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoAuthority {
    Structural,
    Ink,
}

/// Routes undo/redo between the structural history and the ink engine.
pub struct UndoCoordinator {
    history: History,
    ink: Option<Box<dyn InkHistory>>,
    authority: UndoAuthority,
}

impl std::fmt::Debug for UndoCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UndoCoordinator")
            .field("history", &self.history)
            .field("ink_attached", &self.ink.is_some())
            .field("authority", &self.authority)
            .finish()
    }
}

impl UndoCoordinator {
    pub fn new(limit: usize) -> Self {
        Self {
            history: History::new(limit),
            ink: None,
            authority: UndoAuthority::Structural,
        }
    }

    pub fn authority(&self) -> UndoAuthority {
        self.authority
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Hand undo over to the ink engine.
    pub fn begin_ink_editing(&mut self) {
        self.authority = UndoAuthority::Ink;
    }

    /// Attach or replace the ink engine's stack for the edited drawing.
    pub fn attach_ink_history(&mut self, ink: Box<dyn InkHistory>) {
        self.ink = Some(ink);
    }

    /// Return undo to the structural stack and drop the ink stack.
    pub fn end_ink_editing(&mut self) {
        self.authority = UndoAuthority::Structural;
        self.ink = None;
    }

    pub fn commit(&mut self, group: UndoGroup, board: &mut Board) -> bool {
        self.history.commit(group, board)
    }

    pub fn can_undo(&self) -> bool {
        match self.authority {
            UndoAuthority::Structural => self.history.can_undo(),
            UndoAuthority::Ink => self.ink.as_ref().is_some_and(|ink| ink.can_undo()),
        }
    }

    pub fn can_redo(&self) -> bool {
        match self.authority {
            UndoAuthority::Structural => self.history.can_redo(),
            UndoAuthority::Ink => self.ink.as_ref().is_some_and(|ink| ink.can_redo()),
        }
    }

    /// Undo on the authoritative stack. Returns true if the structural
    /// stack changed the board.
    pub fn undo(&mut self, board: &mut Board) -> bool {
        match self.authority {
            UndoAuthority::Structural => self.history.undo(board),
            UndoAuthority::Ink => {
                if let Some(ink) = self.ink.as_mut().filter(|ink| ink.can_undo()) {
                    ink.undo();
                }
                false
            }
        }
    }

    /// Redo on the authoritative stack. Returns true if the structural
    /// stack changed the board.
    pub fn redo(&mut self, board: &mut Board) -> bool {
        match self.authority {
            UndoAuthority::Structural => self.history.redo(board),
            UndoAuthority::Ink => {
                if let Some(ink) = self.ink.as_mut().filter(|ink| ink.can_redo()) {
                    ink.redo();
                }
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::MediaObject;
    use kurbo::{Point, Size};
    use std::cell::Cell;
    use std::rc::Rc;

    fn link() -> BoardObject {
        MediaObject::link(Point::new(10.0, 10.0), Size::new(20.0, 20.0), "https://example.com").into()
    }

    #[test]
    fn test_add_undo_redo() {
        let mut board = Board::default();
        let mut history = History::default();
        let object = link();
        let id = object.id();

        history.commit(UndoGroup::single("add", Command::AddObject { object, index: 0 }), &mut board);
        assert!(board.contains(id));
        assert!(history.undo(&mut board));
        assert!(!board.contains(id));
        assert!(history.redo(&mut board));
        assert!(board.contains(id));
        assert!(!history.redo(&mut board));
    }

    #[test]
    fn test_commit_clears_redo() {
        let mut board = Board::default();
        let mut history = History::default();
        history.commit(
            UndoGroup::single("fav", Command::SetFavorite { before: false, after: true }),
            &mut board,
        );
        history.undo(&mut board);
        assert!(history.can_redo());
        history.commit(
            UndoGroup::single("grid", Command::SetGridVisible { before: true, after: false }),
            &mut board,
        );
        assert!(!history.can_redo());
        assert!(!board.grid_visible);
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut board = Board::default();
        let mut history = History::new(3);
        for i in 0..5 {
            history.commit(
                UndoGroup::single(
                    "rename",
                    Command::Rename {
                        before: format!("{i}"),
                        after: format!("{}", i + 1),
                    },
                ),
                &mut board,
            );
        }
        assert_eq!(history.undo_len(), 3);
        while history.undo(&mut board) {}
        assert_eq!(board.name, "2");
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut board = Board::default();
        let mut history = History::default();
        assert!(!history.undo(&mut board));
        assert!(!history.redo(&mut board));
        assert!(!history.commit(UndoGroup::new("nothing"), &mut board));
    }

    #[test]
    fn test_group_reverts_in_reverse_order() {
        let mut board = Board::default();
        let mut history = History::default();
        let object = link();
        let id = object.id();
        let before = object.capture_geometry();
        let mut moved = object.clone();
        moved.translate(kurbo::Vec2::new(5.0, 5.0));
        let after = moved.capture_geometry();

        let mut group = UndoGroup::new("add and move");
        group.push(Command::AddObject { object, index: 0 });
        group.push(Command::Reshape { id, before, after });
        history.commit(group, &mut board);
        assert_eq!(board.object(id).unwrap().geometry().position, Point::new(15.0, 15.0));

        history.undo(&mut board);
        assert!(board.is_empty());
        history.redo(&mut board);
        assert_eq!(board.object(id).unwrap().geometry().position, Point::new(15.0, 15.0));
    }

    struct FakeInk {
        undos: Rc<Cell<usize>>,
        depth: usize,
    }

    impl InkHistory for FakeInk {
        fn can_undo(&self) -> bool {
            self.depth > self.undos.get()
        }
        fn can_redo(&self) -> bool {
            self.undos.get() > 0
        }
        fn undo(&mut self) {
            self.undos.set(self.undos.get() + 1);
        }
        fn redo(&mut self) {
            self.undos.set(self.undos.get() - 1);
        }
    }

    #[test]
    fn test_coordinator_routes_to_ink_while_editing() {
        let mut board = Board::default();
        let mut coordinator = UndoCoordinator::new(50);
        coordinator.commit(
            UndoGroup::single("fav", Command::SetFavorite { before: false, after: true }),
            &mut board,
        );
        assert!(coordinator.can_undo());

        let undos = Rc::new(Cell::new(0));
        coordinator.begin_ink_editing();
        // Editing without an ink stack yet: nothing to undo
        assert!(!coordinator.can_undo());
        coordinator.attach_ink_history(Box::new(FakeInk {
            undos: undos.clone(),
            depth: 1,
        }));
        assert_eq!(coordinator.authority(), UndoAuthority::Ink);
        assert!(coordinator.can_undo());
        assert!(!coordinator.undo(&mut board));
        assert_eq!(undos.get(), 1);
        // Structural state untouched
        assert!(board.is_favorite);
        assert!(!coordinator.can_undo());
        assert!(coordinator.can_redo());

        coordinator.end_ink_editing();
        assert_eq!(coordinator.authority(), UndoAuthority::Structural);
        assert!(coordinator.can_undo());
        assert!(!coordinator.can_redo());
        assert!(coordinator.undo(&mut board));
        assert!(!board.is_favorite);
    }

    #[test]
    fn test_discard_last_if() {
        let mut board = Board::default();
        let mut history = History::default();
        let object = link();
        let id = object.id();
        history.commit(UndoGroup::single("add", Command::AddObject { object, index: 0 }), &mut board);
        assert!(!history.discard_last_if(|g| g.commands[0].object_id() == Some(ObjectId::nil())));
        assert!(history.discard_last_if(|g| g.commands[0].object_id() == Some(id)));
        assert!(!history.can_undo());
        assert!(board.contains(id));
    }
}
