//! Board document: objects, z-order and board-level metadata.

use crate::config::DEFAULT_BOARD_NAME;
use crate::objects::{BoardObject, Geometry, ObjectId, ObjectKind};
use crate::viewport::Viewport;
use base64::{Engine, engine::general_purpose::STANDARD};
use kurbo::Rect;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// An object with its z-order resolved, for export and compositing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub geometry: Geometry,
}

/// A board containing all objects and their order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    /// Unique board identifier.
    pub id: String,
    pub name: String,
    /// Last modification time in milliseconds since the Unix epoch.
    pub last_modified: u64,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default = "default_grid_visible")]
    pub grid_visible: bool,
    #[serde(default)]
    pub viewport: Viewport,
    /// Cached PNG thumbnail, base64 encoded.
    #[serde(default)]
    thumbnail_base64: Option<String>,
    objects: HashMap<ObjectId, BoardObject>,
    /// Object ids, back to front.
    order: Vec<ObjectId>,
}

fn default_grid_visible() -> bool {
    true
}

impl Default for Board {
    fn default() -> Self {
        Self::new(DEFAULT_BOARD_NAME)
    }
}

impl Board {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            last_modified: now_millis(),
            is_favorite: false,
            grid_visible: true,
            viewport: Viewport::default(),
            thumbnail_base64: None,
            objects: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn object(&self, id: ObjectId) -> Option<&BoardObject> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut BoardObject> {
        self.objects.get_mut(&id)
    }

    /// Object ids, back to front.
    pub fn order(&self) -> &[ObjectId] {
        &self.order
    }

    pub fn order_of(&self, id: ObjectId) -> Option<usize> {
        self.order.iter().position(|&o| o == id)
    }

    /// Insert an object at `index` in the order list (end when `None` or out
    /// of range). Returns the index it landed at.
    ///
    /// An object whose id is already present replaces the old one and takes
    /// the new position.
    pub fn add_object(&mut self, object: BoardObject, index: Option<usize>) -> usize {
        let id = object.id();
        if self.objects.contains_key(&id) {
            self.order.retain(|&o| o != id);
        }
        let index = index.unwrap_or(self.order.len()).min(self.order.len());
        self.order.insert(index, id);
        self.objects.insert(id, object);
        index
    }

    /// Remove an object and its order entry. Returns the object and the
    /// index it had, or `None` if the id is unknown.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<(BoardObject, usize)> {
        let object = self.objects.remove(&id)?;
        let index = self.order_of(id).unwrap_or(0);
        self.order.retain(|&o| o != id);
        Some((object, index))
    }

    /// Move the entry at `from` so it ends up at `to`.
    ///
    /// Does nothing when `from == to`, `from` is out of range, or `to` is
    /// beyond the end. A `to` equal to the length lands at the last slot.
    /// Returns the index the entry landed at.
    pub fn reorder(&mut self, from: usize, to: usize) -> Option<usize> {
        let count = self.order.len();
        if from == to || from >= count || to > count {
            return None;
        }
        let id = self.order.remove(from);
        let dest = to.min(count - 1);
        self.order.insert(dest, id);
        Some(dest)
    }

    /// Objects back to front. Objects missing from the order list come first.
    pub fn objects_in_order(&self) -> impl Iterator<Item = &BoardObject> + Clone + '_ {
        let strays = self
            .objects
            .values()
            .filter(move |o| !self.order.contains(&o.id()));
        strays.chain(self.order.iter().filter_map(move |id| self.objects.get(id)))
    }

    /// Union of all object frames, rotation ignored. Zero rect when empty.
    pub fn bounds(&self) -> Rect {
        let mut frames = self.objects.values().map(|o| o.geometry().frame());
        let Some(first) = frames.next() else {
            return Rect::ZERO;
        };
        frames.fold(first, |acc, frame| acc.union(frame))
    }

    /// Ids, kinds and geometry back to front.
    pub fn resolved_objects(&self) -> Vec<ResolvedObject> {
        self.objects_in_order()
            .map(|o| ResolvedObject {
                id: o.id(),
                kind: o.kind(),
                geometry: o.geometry(),
            })
            .collect()
    }

    /// Deep copy with fresh ids for the board and every object.
    pub fn duplicate(&self) -> Self {
        let mut copy = Board::new(format!("{} copy", self.name));
        copy.is_favorite = self.is_favorite;
        copy.viewport = self.viewport;
        copy.thumbnail_base64 = self.thumbnail_base64.clone();
        for object in self.objects_in_order() {
            copy.add_object(object.duplicated(), None);
        }
        copy
    }

    /// Remove drawings without ink. Returns the removed ids.
    pub fn remove_empty_drawings(&mut self) -> Vec<ObjectId> {
        let empty: Vec<ObjectId> = self
            .order
            .iter()
            .copied()
            .filter(|id| self.objects.get(id).is_some_and(BoardObject::is_empty_drawing))
            .collect();
        for id in &empty {
            self.remove_object(*id);
        }
        if !empty.is_empty() {
            log::debug!("Removed {} empty drawings from board {}", empty.len(), self.id);
        }
        empty
    }

    /// Mark the board as modified now. Drops the cached thumbnail.
    pub fn touch(&mut self) {
        self.last_modified = now_millis();
        self.thumbnail_base64 = None;
    }

    pub fn set_thumbnail(&mut self, png: &[u8]) {
        self.thumbnail_base64 = Some(STANDARD.encode(png));
    }

    pub fn thumbnail(&self) -> Option<Vec<u8>> {
        self.thumbnail_base64
            .as_ref()
            .and_then(|encoded| STANDARD.decode(encoded).ok())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse a board. The order list is repaired so that every object
    /// appears exactly once; unlisted objects go to the back.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut board: Self = serde_json::from_str(json)?;
        board.repair_order();
        Ok(board)
    }

    fn repair_order(&mut self) {
        let mut seen = HashSet::new();
        let objects = &self.objects;
        self.order
            .retain(|id| objects.contains_key(id) && seen.insert(*id));
        let mut strays: Vec<ObjectId> = objects
            .keys()
            .filter(|id| !seen.contains(*id))
            .copied()
            .collect();
        if !strays.is_empty() {
            log::warn!("Board {} had {} objects missing from its order", self.id, strays.len());
            strays.sort();
            strays.append(&mut self.order);
            self.order = strays;
        }
    }
}
