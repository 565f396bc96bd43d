//! Selection and interaction modes.
//!
//! At most one object is selected. A selected object is either being
//! transformed (move, resize, rotate) or, for drawings only, edited with the
//! ink engine.

use crate::objects::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection {
    /// Nothing selected.
    #[default]
    Idle,
    /// Selected with transform handles.
    Transform(ObjectId),
    /// Drawing open in the ink engine.
    Editing(ObjectId),
}

/// What a selection change did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub previous: Selection,
    pub current: Selection,
    /// The drawing whose editing ended, if any.
    pub exited_editing: Option<ObjectId>,
}

impl Transition {
    fn between(previous: Selection, current: Selection) -> Self {
        let exited_editing = match (previous, current) {
            (Selection::Editing(a), Selection::Editing(b)) if a == b => None,
            (Selection::Editing(a), _) => Some(a),
            _ => None,
        };
        Self {
            previous,
            current,
            exited_editing,
        }
    }

    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

impl Selection {
    pub fn selected(&self) -> Option<ObjectId> {
        match *self {
            Selection::Idle => None,
            Selection::Transform(id) | Selection::Editing(id) => Some(id),
        }
    }

    pub fn editing(&self) -> Option<ObjectId> {
        match *self {
            Selection::Editing(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_selected(&self, id: ObjectId) -> bool {
        self.selected() == Some(id)
    }

    fn go(&mut self, next: Selection) -> Transition {
        let transition = Transition::between(*self, next);
        *self = next;
        transition
    }

    /// Tap on empty board area.
    pub fn tap_empty(&mut self) -> Transition {
        self.go(Selection::Idle)
    }

    /// Tap or drag start on an object. The current selection is kept when
    /// it already targets `id`.
    pub fn select(&mut self, id: ObjectId) -> Transition {
        if self.is_selected(id) {
            return self.go(*self);
        }
        self.go(Selection::Transform(id))
    }

    /// Open the selected drawing for editing.
    ///
    /// Returns `None` when nothing is selected or the target is not a drawing.
    pub fn enter_editing(&mut self, target_is_drawing: bool) -> Option<Transition> {
        match *self {
            Selection::Transform(id) if target_is_drawing => Some(self.go(Selection::Editing(id))),
            Selection::Editing(_) => Some(self.go(*self)),
            _ => None,
        }
    }

    /// Finish the current interaction.
    pub fn done(&mut self) -> Transition {
        self.go(Selection::Idle)
    }

    /// Deselect `id` if it is the selected object.
    pub fn forget(&mut self, id: ObjectId) -> Option<Transition> {
        self.is_selected(id).then(|| self.go(Selection::Idle))
    }
}
