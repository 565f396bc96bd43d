//! The editing session for one open board.
//!
//! `BoardSession` is the only owner of a board while it is open. Every user
//! action goes through it and becomes one undoable commit; change
//! notifications queue up for [`take_events`](BoardSession::take_events).
//! Background results are applied only from [`poll_background`](BoardSession::poll_background),
//! on the thread that owns the session.

use crate::board::Board;
use crate::config::BoardConfig;
use crate::error::{ImportError, LinkPreviewError};
use crate::geometry::ResizeHandle;
use crate::gesture::{Gesture, MoveGesture, ResizeGesture, RotateGesture, TransientTransform};
use crate::history::{Command, UndoCoordinator, UndoGroup};
use crate::ink::{InkDrawing, InkHistory};
use crate::objects::{
    BoardObject, DrawingObject, Geometry, ImageContent, LinkContent, MediaContent, MediaObject, ObjectId,
    ObjectKind,
};
use crate::selection::{Selection, Transition};
use crate::services::{BackgroundWorker, ImageSource, LinkPreview, LinkPreviewProvider, WorkerMessage, parse_link};
use crate::viewport::Viewport;
use kurbo::{Size, Vec2};
use std::sync::Arc;
use std::time::Duration;

/// Change notifications for observers of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    /// An object was added, removed or modified. Look it up to tell which.
    ObjectChanged(ObjectId),
    OrderChanged,
    /// Name, favorite flag or grid visibility changed.
    MetadataChanged,
    ViewportChanged,
    SelectionChanged { previous: Selection, current: Selection },
    /// Undo or redo availability may have changed.
    HistoryChanged,
    /// A background operation failed.
    Error(String),
}

fn event_for(command: &Command) -> BoardEvent {
    match command {
        Command::Reorder { .. } => BoardEvent::OrderChanged,
        Command::Rename { .. } | Command::SetFavorite { .. } | Command::SetGridVisible { .. } => {
            BoardEvent::MetadataChanged
        }
        Command::SetViewport { .. } => BoardEvent::ViewportChanged,
        Command::AddObject { object, .. } | Command::RemoveObject { object, .. } => {
            BoardEvent::ObjectChanged(object.id())
        }
        Command::Reshape { id, .. } | Command::ReplaceContent { id, .. } => BoardEvent::ObjectChanged(*id),
    }
}

/// An open board with its selection, undo state and background work.
pub struct BoardSession {
    board: Board,
    config: BoardConfig,
    selection: Selection,
    undo: UndoCoordinator,
    gesture: Option<Gesture>,
    worker: BackgroundWorker,
    events: Vec<BoardEvent>,
    last_error: Option<String>,
}

impl BoardSession {
    /// Open `board`. Empty drawings left over from earlier sessions are
    /// removed and the stored viewport is brought back onto the zoom steps.
    pub fn new(mut board: Board, config: BoardConfig) -> Self {
        board.remove_empty_drawings();
        board.viewport.normalize(&config);
        log::info!("Opened board {} ({} objects)", board.id, board.len());
        Self {
            undo: UndoCoordinator::new(config.max_undo_history),
            worker: BackgroundWorker::new(config.link_fetch_timeout()),
            board,
            config,
            selection: Selection::Idle,
            gesture: None,
            events: Vec::new(),
            last_error: None,
        }
    }

    pub fn set_link_provider(&mut self, provider: Arc<dyn LinkPreviewProvider>) {
        self.worker.set_link_provider(provider);
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Drain queued change notifications.
    pub fn take_events(&mut self) -> Vec<BoardEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of background imports and fetches not yet applied.
    pub fn pending_background(&self) -> usize {
        self.worker.pending()
    }

    fn emit(&mut self, event: BoardEvent) {
        self.events.push(event);
    }

    fn report_error(&mut self, message: String) {
        log::warn!("{}", message);
        self.last_error = Some(message.clone());
        self.emit(BoardEvent::Error(message));
    }

    /// Record and apply one user action.
    fn commit(&mut self, group: UndoGroup) -> bool {
        let events: Vec<BoardEvent> = group.commands.iter().map(event_for).collect();
        let label = group.label;
        if !self.undo.commit(group, &mut self.board) {
            return false;
        }
        log::debug!("Committed {}", label);
        self.board.touch();
        self.events.extend(events);
        self.emit(BoardEvent::HistoryChanged);
        true
    }

    // Selection

    fn apply_transition(&mut self, transition: Transition) {
        if let Some(drawing) = transition.exited_editing {
            self.leave_editing(drawing);
        }
        if transition.changed() {
            self.emit(BoardEvent::SelectionChanged {
                previous: transition.previous,
                current: transition.current,
            });
        }
    }

    /// Tap or drag start on an object.
    pub fn tap_object(&mut self, id: ObjectId) {
        if !self.board.contains(id) {
            log::debug!("Tap on unknown object {id} ignored");
            return;
        }
        let transition = self.selection.select(id);
        self.apply_transition(transition);
    }

    /// Tap on empty board area.
    pub fn tap_empty(&mut self) {
        self.cancel_gesture();
        let transition = self.selection.tap_empty();
        self.apply_transition(transition);
    }

    /// Open the selected drawing in the ink engine. Returns false for media
    /// or when nothing is selected.
    pub fn enter_editing(&mut self) -> bool {
        let is_drawing = self
            .selection
            .selected()
            .and_then(|id| self.board.object(id))
            .is_some_and(|object| object.kind() == ObjectKind::Drawing);
        let Some(transition) = self.selection.enter_editing(is_drawing) else {
            log::debug!("Editing rejected for {:?}", self.selection);
            return false;
        };
        if transition.changed() {
            self.cancel_gesture();
            self.undo.begin_ink_editing();
            self.emit(BoardEvent::HistoryChanged);
        }
        self.apply_transition(transition);
        true
    }

    /// Finish the current interaction and return to idle.
    pub fn done_editing(&mut self) {
        self.cancel_gesture();
        let transition = self.selection.done();
        self.apply_transition(transition);
    }

    /// Hand the structural stack back control after editing `id`.
    ///
    /// Ink edits stay with the engine's stack and leave nothing behind here.
    /// An empty drawing is removed silently, together with the commit that
    /// added it.
    fn leave_editing(&mut self, id: ObjectId) {
        self.undo.end_ink_editing();
        self.emit(BoardEvent::HistoryChanged);

        if !self.board.object(id).is_some_and(BoardObject::is_empty_drawing) {
            return;
        }
        self.board.remove_object(id);
        let discarded = self.undo.history_mut().discard_last_if(|group| {
            matches!(group.commands.as_slice(), [Command::AddObject { object, .. }] if object.id() == id)
        });
        log::debug!("Removed empty drawing {id} (add discarded: {discarded})");
        self.emit(BoardEvent::ObjectChanged(id));
        self.emit(BoardEvent::OrderChanged);
    }

    /// Ink update from the engine for the drawing being edited.
    ///
    /// The engine's own undo stack comes along and answers undo/redo until
    /// editing ends.
    pub fn update_drawing(&mut self, id: ObjectId, ink: InkDrawing, history: Option<Box<dyn InkHistory>>) {
        if self.selection.editing() != Some(id) {
            log::debug!("Ink update for {id} outside editing ignored");
            return;
        }
        let Some(BoardObject::Drawing(drawing)) = self.board.object_mut(id) else {
            return;
        };
        drawing.ink = ink;
        if let Some(history) = history {
            self.undo.attach_ink_history(history);
        }
        self.board.touch();
        self.emit(BoardEvent::ObjectChanged(id));
        self.emit(BoardEvent::HistoryChanged);
    }

    // Adding objects

    /// Add an empty drawing, select it and open it for editing.
    pub fn add_new_drawing(&mut self) -> ObjectId {
        let object = BoardObject::from(DrawingObject::empty());
        let id = object.id();
        let index = self.board.len();
        self.commit(UndoGroup::single("add drawing", Command::AddObject { object, index }));
        self.tap_object(id);
        self.enter_editing();
        id
    }

    /// Add a link card, or point the selected link card at a new URL, and
    /// start fetching its metadata. The link is stored as entered.
    pub fn add_link(&mut self, link: &str) -> Result<ObjectId, LinkPreviewError> {
        parse_link(link)?;
        let link = link.trim();

        let selected_link = self
            .selection
            .selected()
            .filter(|&id| self.board.object(id).map(BoardObject::kind) == Some(ObjectKind::Link));

        let id = match selected_link {
            Some(id) => {
                self.replace_content(id, MediaContent::Link(LinkContent::new(link)));
                id
            }
            None => {
                let position = self.board.viewport.center_in_board(0, &self.config);
                let object = BoardObject::from(MediaObject::link(position, self.config.initial_link_size, link));
                let id = object.id();
                let index = self.board.len();
                self.commit(UndoGroup::single("add link", Command::AddObject { object, index }));
                id
            }
        };
        self.start_link_fetch(id);
        Ok(id)
    }

    /// Fetch metadata again for the selected link card.
    pub fn reload_link_metadata(&mut self) -> bool {
        match self.selection.selected() {
            Some(id) if self.board.object(id).map(BoardObject::kind) == Some(ObjectKind::Link) => {
                self.start_link_fetch(id)
            }
            _ => false,
        }
    }

    fn start_link_fetch(&mut self, id: ObjectId) -> bool {
        if !self.worker.has_link_provider() {
            log::debug!("No link preview provider; skipping metadata for {id}");
            return false;
        }
        let Some(link) = self
            .board
            .object(id)
            .and_then(BoardObject::as_media)
            .and_then(MediaObject::link_content)
        else {
            return false;
        };
        match self.worker.fetch_link(id, &link.url) {
            Ok(_) => true,
            Err(e) => {
                self.report_error(format!("Error fetching link metadata: {e}"));
                false
            }
        }
    }

    /// Load images in the background. They are placed in order as they
    /// arrive; the first failure stops the batch.
    pub fn import_images(&mut self, sources: Vec<Box<dyn ImageSource>>) -> u64 {
        self.worker.import_images(sources)
    }

    /// Place already loaded images, in order.
    ///
    /// Stops at the first image that cannot be read; images placed before it
    /// stay on the board.
    pub fn place_images(&mut self, images: &[Vec<u8>]) -> Result<Vec<ObjectId>, ImportError> {
        let mut placed = Vec::with_capacity(images.len());
        for (index, bytes) in images.iter().enumerate() {
            match ImageContent::from_bytes(bytes) {
                Ok(content) => placed.push(self.place_image(index, content)),
                Err(e) => {
                    self.report_error(format!("Failed to import image: {e}"));
                    return Err(e);
                }
            }
        }
        Ok(placed)
    }

    /// Put an image on the board, or into the selected image object.
    fn place_image(&mut self, index: usize, content: ImageContent) -> ObjectId {
        let selected_image = self
            .selection
            .selected()
            .filter(|&id| self.board.object(id).map(BoardObject::kind) == Some(ObjectKind::Image));
        if let Some(id) = selected_image {
            self.replace_content(id, MediaContent::Image(content));
            return id;
        }

        let position = self.board.viewport.center_in_board(index, &self.config);
        let object = BoardObject::from(MediaObject::image(position, self.config.initial_image_width, content));
        let id = object.id();
        let index = self.board.len();
        self.commit(UndoGroup::single("add image", Command::AddObject { object, index }));
        id
    }

    fn replace_content(&mut self, id: ObjectId, content: MediaContent) -> bool {
        let Some(before) = self
            .board
            .object(id)
            .and_then(BoardObject::as_media)
            .map(|m| m.content.clone())
        else {
            return false;
        };
        if before == content {
            return false;
        }
        self.commit(UndoGroup::single(
            "replace content",
            Command::ReplaceContent {
                id,
                before,
                after: content,
            },
        ))
    }

    // Background results

    /// Apply background results that have arrived. Returns how many were applied.
    pub fn poll_background(&mut self) -> usize {
        let messages = self.worker.poll();
        let count = messages.len();
        for message in messages {
            self.apply_background(message);
        }
        count
    }

    /// Block for up to `timeout` for one background result and apply it.
    pub fn wait_background(&mut self, timeout: Duration) -> bool {
        match self.worker.wait(timeout) {
            Some(message) => {
                self.apply_background(message);
                true
            }
            None => false,
        }
    }

    fn apply_background(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::Image { index, content, .. } => {
                self.place_image(index, content);
            }
            WorkerMessage::ImageFailed { error, .. } => {
                self.report_error(format!("Failed to import image: {error}"));
            }
            WorkerMessage::ImageBatchDone { batch } => {
                log::debug!("Image batch {batch} finished");
            }
            WorkerMessage::Link {
                object_id,
                url,
                result,
                ..
            } => match result {
                Ok(preview) => self.apply_link_preview(object_id, &url, preview),
                Err(LinkPreviewError::Cancelled) => {
                    log::debug!("Link fetch for {object_id} cancelled");
                }
                Err(e) => self.report_error(format!("Error fetching link metadata: {e}")),
            },
        }
    }

    /// Metadata is not undoable. It is dropped if the card is gone or now
    /// points elsewhere.
    fn apply_link_preview(&mut self, id: ObjectId, url: &str, preview: LinkPreview) {
        let link = self
            .board
            .object_mut(id)
            .and_then(BoardObject::as_media_mut)
            .and_then(MediaObject::link_content_mut)
            .filter(|link| link.url == url);
        let Some(link) = link else {
            log::warn!("Dropping link metadata for {id}: card gone or URL changed");
            return;
        };
        link.title = preview.title;
        link.set_preview_image(preview.image.as_deref());
        self.board.touch();
        self.emit(BoardEvent::ObjectChanged(id));
    }

    // Editing objects

    /// Copy an object, offset from the original, on top of everything.
    pub fn duplicate_object(&mut self, id: ObjectId) -> Option<ObjectId> {
        let mut copy = self.board.object(id)?.duplicated();
        copy.translate(self.config.duplicate_offset);
        let copy_id = copy.id();
        let index = self.board.len();
        self.commit(UndoGroup::single("duplicate", Command::AddObject { object: copy, index }));
        Some(copy_id)
    }

    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        let Some(index) = self.board.order_of(id) else {
            log::debug!("Remove of unknown object {id} ignored");
            return false;
        };
        if self.gesture.as_ref().is_some_and(|g| g.object_id() == id) {
            self.gesture = None;
        }
        if let Some(transition) = self.selection.forget(id) {
            self.apply_transition(transition);
        }
        // Leaving editing may already have removed an empty drawing
        let Some(object) = self.board.object(id).cloned() else {
            return true;
        };
        self.worker.cancel_link(id);
        self.commit(UndoGroup::single("remove", Command::RemoveObject { object, index }))
    }

    fn reorder(&mut self, from: usize, to: usize) -> bool {
        let count = self.board.len();
        if from >= count || to > count {
            log::debug!("Reorder {from} -> {to} out of range");
            return false;
        }
        let dest = to.min(count - 1);
        if dest == from {
            return false;
        }
        self.commit(UndoGroup::single("reorder", Command::Reorder { from, to: dest }))
    }

    pub fn bring_forward(&mut self, id: ObjectId) -> bool {
        self.board.order_of(id).is_some_and(|from| self.reorder(from, from + 1))
    }

    pub fn send_backward(&mut self, id: ObjectId) -> bool {
        match self.board.order_of(id) {
            Some(from) if from > 0 => self.reorder(from, from - 1),
            _ => false,
        }
    }

    pub fn bring_to_front(&mut self, id: ObjectId) -> bool {
        let last = self.board.len().saturating_sub(1);
        self.board.order_of(id).is_some_and(|from| self.reorder(from, last))
    }

    pub fn send_to_back(&mut self, id: ObjectId) -> bool {
        self.board.order_of(id).is_some_and(|from| self.reorder(from, 0))
    }

    /// Set an object's geometry directly, as one undoable step.
    pub fn commit_geometry(&mut self, id: ObjectId, geometry: Geometry) -> bool {
        let Some(object) = self.board.object(id) else {
            return false;
        };
        let before = object.capture_geometry();
        let mut changed = object.clone();
        changed.set_geometry(geometry);
        let after = changed.capture_geometry();
        if before == after {
            return false;
        }
        self.commit(UndoGroup::single("reshape", Command::Reshape { id, before, after }))
    }

    // Gestures

    fn begin_gesture(&mut self, id: ObjectId, make: impl FnOnce(&BoardObject) -> Option<Gesture>) -> bool {
        if self.selection.editing() == Some(id) {
            log::debug!("Gesture on drawing {id} while editing ignored");
            return false;
        }
        let Some(gesture) = self.board.object(id).and_then(make) else {
            return false;
        };
        self.tap_object(id);
        self.gesture = Some(gesture);
        true
    }

    pub fn begin_move(&mut self, id: ObjectId) -> bool {
        self.begin_gesture(id, |object| Some(Gesture::Move(MoveGesture::new(id, object.geometry()))))
    }

    pub fn begin_resize(&mut self, id: ObjectId, handle: ResizeHandle) -> bool {
        let min_size = self.config.min_object_size;
        self.begin_gesture(id, |object| {
            Some(Gesture::Resize(ResizeGesture::new(id, handle, object.geometry(), min_size)))
        })
    }

    /// Drawings cannot be rotated.
    pub fn begin_rotate(&mut self, id: ObjectId) -> bool {
        self.begin_gesture(id, |object| {
            object
                .supports_rotation()
                .then(|| Gesture::Rotate(RotateGesture::new(id, object.geometry())))
        })
    }

    /// Total drag translation since the gesture began, in screen points.
    pub fn update_drag(&mut self, screen_translation: Vec2) {
        let translation = self.board.viewport.screen_delta_to_board(screen_translation);
        match &mut self.gesture {
            Some(Gesture::Move(g)) => g.update(translation),
            Some(Gesture::Resize(g)) => g.update(translation),
            _ => log::debug!("Drag update without a drag gesture"),
        }
    }

    /// Total rotation since the gesture began, in degrees.
    pub fn update_rotation(&mut self, degrees: f64) {
        match &mut self.gesture {
            Some(Gesture::Rotate(g)) => g.update(degrees),
            _ => log::debug!("Rotation update without a rotate gesture"),
        }
    }

    /// The visual transform of the gesture in progress.
    pub fn transient(&self) -> Option<(ObjectId, TransientTransform)> {
        self.gesture.as_ref().map(|g| (g.object_id(), g.transient()))
    }

    /// Commit the gesture in progress. Returns false if nothing changed.
    pub fn end_gesture(&mut self) -> bool {
        let Some(gesture) = self.gesture.take() else {
            return false;
        };
        match gesture.finish() {
            Some(geometry) => self.commit_geometry(gesture.object_id(), geometry),
            None => false,
        }
    }

    pub fn cancel_gesture(&mut self) {
        self.gesture = None;
    }

    // Board metadata and view

    pub fn rename(&mut self, name: impl Into<String>) -> bool {
        let after = name.into();
        if after == self.board.name {
            return false;
        }
        let before = self.board.name.clone();
        self.commit(UndoGroup::single("rename", Command::Rename { before, after }))
    }

    pub fn set_favorite(&mut self, favorite: bool) -> bool {
        let before = self.board.is_favorite;
        if before == favorite {
            return false;
        }
        self.commit(UndoGroup::single("favorite", Command::SetFavorite { before, after: favorite }))
    }

    pub fn set_grid_visible(&mut self, visible: bool) -> bool {
        let before = self.board.grid_visible;
        if before == visible {
            return false;
        }
        self.commit(UndoGroup::single("grid", Command::SetGridVisible { before, after: visible }))
    }

    fn commit_viewport(&mut self, label: &'static str, change: impl FnOnce(&mut Viewport, &BoardConfig)) -> bool {
        let before = self.board.viewport;
        let mut after = before;
        change(&mut after, &self.config);
        if after == before {
            return false;
        }
        self.commit(UndoGroup::single(label, Command::SetViewport { before, after }))
    }

    pub fn zoom_in(&mut self) -> bool {
        self.commit_viewport("zoom in", Viewport::zoom_in)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.commit_viewport("zoom out", Viewport::zoom_out)
    }

    pub fn fit_to_content(&mut self) -> bool {
        let bounds = self.board.bounds();
        self.commit_viewport("fit to content", |viewport, config| viewport.fit_to_content(bounds, config))
    }

    /// Continuous pan; not recorded.
    pub fn scroll_to(&mut self, offset: Vec2) {
        let before = self.board.viewport;
        self.board.viewport.scroll_to(offset, &self.config);
        if self.board.viewport != before {
            self.emit(BoardEvent::ViewportChanged);
        }
    }

    /// Continuous pinch zoom, snapped to a step; not recorded.
    pub fn set_zoom(&mut self, zoom: f64) {
        let before = self.board.viewport;
        self.board.viewport.set_zoom(zoom, &self.config);
        if self.board.viewport != before {
            self.emit(BoardEvent::ViewportChanged);
        }
    }

    pub fn set_view_size(&mut self, size: Size) {
        self.config.view_size = size;
        self.board.viewport.clamp(&self.config);
    }

    // Undo

    pub fn can_undo(&self) -> bool {
        self.undo.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.undo.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        self.cancel_gesture();
        let events: Vec<BoardEvent> = self
            .undo
            .history()
            .last()
            .map(|g| g.commands.iter().map(event_for).collect())
            .unwrap_or_default();
        let changed = self.undo.undo(&mut self.board);
        self.after_history_step(changed, events);
        changed
    }

    pub fn redo(&mut self) -> bool {
        self.cancel_gesture();
        let events: Vec<BoardEvent> = self
            .undo
            .history()
            .next_redo()
            .map(|g| g.commands.iter().map(event_for).collect())
            .unwrap_or_default();
        let changed = self.undo.redo(&mut self.board);
        self.after_history_step(changed, events);
        changed
    }

    fn after_history_step(&mut self, changed: bool, events: Vec<BoardEvent>) {
        if changed {
            self.board.touch();
            self.events.extend(events);
            if let Some(id) = self.selection.selected().filter(|&id| !self.board.contains(id)) {
                if let Some(transition) = self.selection.forget(id) {
                    self.apply_transition(transition);
                }
            }
        }
        self.emit(BoardEvent::HistoryChanged);
    }

    /// End the session: stop background work, close any editing and drop
    /// empty drawings. Returns the board for saving.
    pub fn close(mut self) -> Board {
        self.worker.cancel_all();
        self.done_editing();
        self.board.remove_empty_drawings();
        log::info!("Closed board {}", self.board.id);
        self.board
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ink::InkStroke;
    use crate::services::BytesSource;
    use crate::test_support::{FixedLinkProvider, png_bytes};
    use kurbo::Point;
    use proptest::prelude::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Instant;

    fn config() -> BoardConfig {
        BoardConfig {
            view_size: Size::new(1000.0, 800.0),
            ..BoardConfig::default()
        }
    }

    fn session() -> BoardSession {
        BoardSession::new(Board::new("Test"), config())
    }

    /// A session on a board that already holds `objects`, back to front.
    fn open_with(objects: Vec<BoardObject>) -> BoardSession {
        let mut board = Board::new("Test");
        for object in objects {
            board.add_object(object, None);
        }
        BoardSession::new(board, config())
    }

    fn settle(session: &mut BoardSession) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while session.pending_background() > 0 && Instant::now() < deadline {
            session.wait_background(Duration::from_millis(50));
        }
    }

    fn stroke_ink() -> InkDrawing {
        InkDrawing::from_strokes(vec![InkStroke::new(
            vec![Point::new(10.0, 10.0), Point::new(60.0, 40.0)],
            2.0,
        )])
    }

    struct FakeInk {
        can_undo: Rc<Cell<bool>>,
    }

    impl InkHistory for FakeInk {
        fn can_undo(&self) -> bool {
            self.can_undo.get()
        }
        fn can_redo(&self) -> bool {
            false
        }
        fn undo(&mut self) {
            self.can_undo.set(false);
        }
        fn redo(&mut self) {}
    }

    #[test]
    fn test_reorder_undo_redo() {
        let mut session = session();
        let a = session.add_link("https://a.example").unwrap();
        let b = session.add_link("https://b.example").unwrap();
        let c = session.add_link("https://c.example").unwrap();
        assert_eq!(session.board().order(), &[a, b, c]);

        assert!(session.bring_to_front(a));
        assert_eq!(session.board().order(), &[b, c, a]);
        assert!(session.undo());
        assert_eq!(session.board().order(), &[a, b, c]);
        assert!(session.redo());
        assert_eq!(session.board().order(), &[b, c, a]);

        assert!(session.send_to_back(a));
        assert_eq!(session.board().order(), &[a, b, c]);
        assert!(!session.send_backward(a));
        assert!(!session.bring_forward(c));
        assert!(session.bring_forward(a));
        assert_eq!(session.board().order(), &[b, a, c]);
    }

    #[test]
    fn test_link_placeholder_then_title() {
        let mut session = session();
        session.set_link_provider(Arc::new(FixedLinkProvider::new("Example Domain")));
        let id = session.add_link("https://example.com/").unwrap();

        let link = session.board().object(id).unwrap().as_media().unwrap().link_content().unwrap();
        assert_eq!(link.url, "https://example.com/");
        assert!(link.title.is_none());
        assert_eq!(session.board().object(id).unwrap().geometry().size, Size::new(200.0, 150.0));

        settle(&mut session);
        let link = session.board().object(id).unwrap().as_media().unwrap().link_content().unwrap();
        assert_eq!(link.title.as_deref(), Some("Example Domain"));
        assert_eq!(link.preview_image(), Some(vec![7, 7, 7]));
        assert!(session.take_events().contains(&BoardEvent::ObjectChanged(id)));

        // Metadata is not part of history: undo removes the card
        assert!(session.undo());
        assert!(!session.board().contains(id));
    }

    #[test]
    fn test_link_kept_as_entered() {
        let mut session = session();
        session.set_link_provider(Arc::new(FixedLinkProvider::new("Example Domain")));
        let id = session.add_link("  https://example.com ").unwrap();
        settle(&mut session);
        let link = session.board().object(id).unwrap().as_media().unwrap().link_content().unwrap();
        assert_eq!(link.url, "https://example.com");
        assert_eq!(link.title.as_deref(), Some("Example Domain"));
    }

    #[test]
    fn test_reload_metadata_for_stored_link() {
        let card = BoardObject::from(MediaObject::link(
            Point::new(100.0, 100.0),
            Size::new(200.0, 150.0),
            "https://example.com",
        ));
        let id = card.id();
        let mut session = open_with(vec![card]);
        session.set_link_provider(Arc::new(FixedLinkProvider::new("Reloaded")));
        session.tap_object(id);
        assert!(session.reload_link_metadata());
        settle(&mut session);
        let link = session.board().object(id).unwrap().as_media().unwrap().link_content().unwrap();
        assert_eq!(link.title.as_deref(), Some("Reloaded"));
        // Metadata alone is not an undo step
        assert!(!session.can_undo());
    }

    #[test]
    fn test_same_link_on_selected_card_is_not_recorded() {
        let mut session = session();
        let id = session.add_link("https://example.com").unwrap();
        session.tap_object(id);
        assert_eq!(session.add_link("https://example.com").unwrap(), id);
        assert!(session.undo());
        assert!(!session.board().contains(id));
        assert!(!session.can_undo());
    }

    #[test]
    fn test_stale_link_metadata_is_dropped() {
        let mut session = session();
        session.set_link_provider(Arc::new(FixedLinkProvider::new("Old")));
        let id = session.add_link("https://old.example/").unwrap();
        session.remove_object(id);
        settle(&mut session);
        assert!(!session.board().contains(id));
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_invalid_link_is_rejected() {
        let mut session = session();
        assert!(session.add_link("not a link").is_err());
        assert!(session.board().is_empty());
    }

    #[test]
    fn test_selected_link_is_replaced() {
        let mut session = session();
        let id = session.add_link("https://first.example/").unwrap();
        session.tap_object(id);
        let same = session.add_link("https://second.example/").unwrap();
        assert_eq!(same, id);
        assert_eq!(session.board().len(), 1);
        let link = session.board().object(id).unwrap().as_media().unwrap().link_content().unwrap();
        assert_eq!(link.url, "https://second.example/");
        session.undo();
        let link = session.board().object(id).unwrap().as_media().unwrap().link_content().unwrap();
        assert_eq!(link.url, "https://first.example/");
    }

    #[test]
    fn test_editing_exit_returns_undo_to_structural_stack() {
        let mut session = session();
        let id = session.add_new_drawing();
        assert_eq!(session.selection(), Selection::Editing(id));
        // Only the ink stack counts while editing
        assert!(!session.can_undo());

        let ink_can_undo = Rc::new(Cell::new(true));
        session.update_drawing(
            id,
            stroke_ink(),
            Some(Box::new(FakeInk {
                can_undo: ink_can_undo.clone(),
            })),
        );
        assert!(session.can_undo());
        session.undo();
        assert!(!ink_can_undo.get());
        assert!(!session.can_undo());
        // The drawing itself is untouched by the structural stack
        assert!(session.board().contains(id));

        session.done_editing();
        assert_eq!(session.selection(), Selection::Idle);
        // Only the drawing's creation is on the structural stack
        assert!(session.can_undo());
        assert!(session.undo());
        assert!(!session.board().contains(id));
        assert!(!session.can_undo());
    }

    #[test]
    fn test_ink_edits_leave_no_structural_step() {
        let line = InkDrawing::from_strokes(vec![InkStroke::new(
            vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)],
            2.0,
        )]);
        let drawing = BoardObject::from(DrawingObject::new(line));
        let id = drawing.id();
        let mut session = open_with(vec![drawing]);

        session.tap_object(id);
        assert!(session.enter_editing());
        session.update_drawing(
            id,
            stroke_ink(),
            Some(Box::new(FakeInk {
                can_undo: Rc::new(Cell::new(true)),
            })),
        );
        assert!(session.can_undo());

        session.done_editing();
        assert_eq!(session.selection(), Selection::Idle);
        assert!(!session.can_undo());
        assert!(!session.can_redo());
        assert_eq!(session.board().object(id).unwrap().as_drawing().unwrap().ink, stroke_ink());
    }

    #[test]
    fn test_empty_drawing_removed_on_exit() {
        let mut session = session();
        let id = session.add_new_drawing();
        session.tap_empty();
        assert!(!session.board().contains(id));
        assert!(!session.can_undo());
        assert!(!session.can_redo());
    }

    #[test]
    fn test_editing_rejected_for_media() {
        let mut session = session();
        let id = session.add_link("https://example.com").unwrap();
        session.tap_object(id);
        assert!(!session.enter_editing());
        assert_eq!(session.selection(), Selection::Transform(id));
    }

    #[test]
    fn test_import_images_in_order() {
        let mut session = session();
        let sources: Vec<Box<dyn ImageSource>> = vec![
            Box::new(BytesSource::new("wide", png_bytes(40, 20))),
            Box::new(BytesSource::new("tall", png_bytes(20, 40))),
        ];
        session.import_images(sources);
        settle(&mut session);

        let objects = session.board().resolved_objects();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].geometry.size, Size::new(200.0, 100.0));
        assert_eq!(objects[1].geometry.size, Size::new(200.0, 400.0));
        // Later images shift down and right
        assert_eq!(objects[0].geometry.position, Point::new(500.0, 400.0));
        assert_eq!(objects[1].geometry.position, Point::new(520.0, 420.0));
    }

    #[test]
    fn test_import_failure_keeps_earlier_images() {
        let mut session = session();
        let sources: Vec<Box<dyn ImageSource>> = vec![
            Box::new(BytesSource::new("good", png_bytes(8, 8))),
            Box::new(BytesSource::new("bad", b"nope".to_vec())),
            Box::new(BytesSource::new("never", png_bytes(8, 8))),
        ];
        session.import_images(sources);
        settle(&mut session);

        assert_eq!(session.board().len(), 1);
        assert!(session.last_error().is_some());
        let errors = session
            .take_events()
            .into_iter()
            .filter(|e| matches!(e, BoardEvent::Error(_)))
            .count();
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_place_images_replaces_selected_image() {
        let mut session = session();
        let placed = session.place_images(&[png_bytes(10, 10)]).unwrap();
        let id = placed[0];
        session.tap_object(id);
        let replaced = session.place_images(&[png_bytes(30, 10)]).unwrap();
        assert_eq!(replaced, vec![id]);
        assert_eq!(session.board().len(), 1);
        let object = session.board().object(id).unwrap().as_media().unwrap();
        match &object.content {
            MediaContent::Image(image) => assert_eq!(image.pixel_width, 30),
            other => panic!("unexpected content {other:?}"),
        }
        // Size is kept
        assert_eq!(object.size, Size::new(200.0, 200.0));
    }

    #[test]
    fn test_duplicate_object() {
        let mut session = session();
        let id = session.add_link("https://example.com").unwrap();
        let copy = session.duplicate_object(id).unwrap();
        let original = session.board().object(id).unwrap().geometry();
        let duplicated = session.board().object(copy).unwrap().geometry();
        assert_eq!(duplicated.position, original.position + Vec2::new(80.0, -80.0));
        assert_eq!(session.board().order(), &[id, copy]);
    }

    #[test]
    fn test_remove_selected_object() {
        let mut session = session();
        let id = session.add_link("https://example.com").unwrap();
        session.tap_object(id);
        assert!(session.remove_object(id));
        assert_eq!(session.selection(), Selection::Idle);
        assert!(session.undo());
        assert_eq!(session.board().order(), &[id]);
        assert!(!session.remove_object(ObjectId::nil()));
    }

    #[test]
    fn test_move_gesture_uses_zoom() {
        let mut session = session();
        let id = session.add_link("https://example.com").unwrap();
        session.set_zoom(2.0);
        let start = session.board().object(id).unwrap().geometry();

        assert!(session.begin_move(id));
        session.update_drag(Vec2::new(20.0, 10.0));
        let (moving, transient) = session.transient().unwrap();
        assert_eq!(moving, id);
        assert_eq!(transient.offset, Vec2::new(10.0, 5.0));
        // The model is untouched until the gesture ends
        assert_eq!(session.board().object(id).unwrap().geometry(), start);

        assert!(session.end_gesture());
        let end = session.board().object(id).unwrap().geometry();
        assert_eq!(end.position, start.position + Vec2::new(10.0, 5.0));
        assert!(session.undo());
        assert_eq!(session.board().object(id).unwrap().geometry(), start);
    }

    #[test]
    fn test_gesture_without_change_commits_nothing() {
        let mut session = session();
        let id = session.add_link("https://example.com").unwrap();
        session.begin_rotate(id);
        assert!(!session.end_gesture());
        session.undo();
        assert!(!session.board().contains(id));
    }

    #[test]
    fn test_drawings_do_not_rotate() {
        let mut session = session();
        let id = session.add_new_drawing();
        session.update_drawing(id, stroke_ink(), None);
        session.done_editing();
        assert!(!session.begin_rotate(id));
        assert!(session.begin_resize(id, ResizeHandle::BottomRight));
        session.update_drag(Vec2::new(50.0, 30.0));
        assert!(session.end_gesture());
        let geometry = session.board().object(id).unwrap().geometry();
        assert!((geometry.size.width - 100.0).abs() < 1e-9);
        assert!((geometry.size.height - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_resize_straight_drawing_keeps_anchor() {
        let line = InkDrawing::from_strokes(vec![InkStroke::new(
            vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)],
            2.0,
        )]);
        let drawing = BoardObject::from(DrawingObject::new(line));
        let id = drawing.id();
        let mut session = open_with(vec![drawing]);

        assert!(session.begin_resize(id, ResizeHandle::BottomRight));
        session.update_drag(Vec2::new(30.0, 30.0));
        assert!(session.end_gesture());

        let bounds = session.board().object(id).unwrap().as_drawing().unwrap().ink.bounds();
        assert!(bounds.x0.abs() < 1e-9);
        assert!(bounds.y0.abs() < 1e-9);
        assert!((bounds.x1 - 130.0).abs() < 1e-9);
        assert!(bounds.y1.abs() < 1e-9);
    }

    #[test]
    fn test_open_snaps_stored_zoom() {
        let mut board = Board::new("Stored");
        board.viewport = Viewport::new(Vec2::ZERO, 0.7);
        let session = BoardSession::new(board, config());
        assert_eq!(session.board().viewport.zoom, 0.75);

        let mut board = Board::new("Broken");
        board.viewport = Viewport::new(Vec2::ZERO, 0.0);
        let mut session = BoardSession::new(board, config());
        assert_eq!(session.board().viewport.zoom, 1.0);
        let id = session.add_link("https://example.com").unwrap();
        let position = session.board().object(id).unwrap().geometry().position;
        assert_eq!(position, Point::new(500.0, 400.0));
    }

    #[test]
    fn test_metadata_undo() {
        let mut session = session();
        assert!(session.rename("Holiday"));
        assert!(!session.rename("Holiday"));
        assert!(session.set_favorite(true));
        assert!(session.set_grid_visible(false));
        session.undo();
        session.undo();
        session.undo();
        assert_eq!(session.board().name, "Test");
        assert!(!session.board().is_favorite);
        assert!(session.board().grid_visible);
    }

    #[test]
    fn test_zoom_is_undoable() {
        let mut session = session();
        assert!(session.zoom_in());
        assert_eq!(session.board().viewport.zoom, 1.25);
        assert!(session.undo());
        assert_eq!(session.board().viewport.zoom, 1.0);
    }

    #[test]
    fn test_close_drops_empty_drawing() {
        let mut session = session();
        session.add_new_drawing();
        let board = session.close();
        assert!(board.is_empty());
    }

    #[test]
    fn test_closed_board_reopens_from_storage() {
        use crate::storage::{MemoryStorage, Storage};

        let storage = MemoryStorage::new();
        let mut session = session();
        let link = session.add_link("https://example.com").unwrap();
        let drawing = session.add_new_drawing();
        session.update_drawing(drawing, stroke_ink(), None);
        session.done_editing();
        assert!(session.bring_to_front(link));
        let board = session.close();
        pollster::block_on(storage.save(&board.id, &board)).unwrap();

        let loaded = pollster::block_on(storage.load(&board.id)).unwrap();
        let session = BoardSession::new(loaded, config());
        assert_eq!(session.board().order(), &[drawing, link]);
        assert_eq!(session.board().resolved_objects(), board.resolved_objects());
        assert!(!session.can_undo());
    }

    #[derive(Debug, Clone)]
    enum Action {
        AddLink(u8),
        Move(usize, f64, f64),
        Resize(usize, usize, f64, f64),
        Rotate(usize, f64),
        Reorder(usize, usize),
        Remove(usize),
        Duplicate(usize),
        Rename(u8),
        Favorite(bool),
    }

    fn action() -> impl Strategy<Value = Action> {
        prop_oneof![
            (0u8..3).prop_map(Action::AddLink),
            (0usize..6, -200.0f64..200.0, -200.0f64..200.0).prop_map(|(i, x, y)| Action::Move(i, x, y)),
            (0usize..6, 0usize..8, -100.0f64..100.0, -100.0f64..100.0)
                .prop_map(|(i, h, x, y)| Action::Resize(i, h, x, y)),
            (0usize..6, -180.0f64..180.0).prop_map(|(i, r)| Action::Rotate(i, r)),
            (0usize..6, 0usize..7).prop_map(|(f, t)| Action::Reorder(f, t)),
            (0usize..6).prop_map(Action::Remove),
            (0usize..6).prop_map(Action::Duplicate),
            any::<u8>().prop_map(Action::Rename),
            any::<bool>().prop_map(Action::Favorite),
        ]
    }

    type State = (String, bool, Vec<ObjectId>, Vec<BoardObject>);

    fn state(session: &BoardSession) -> State {
        let board = session.board();
        (
            board.name.clone(),
            board.is_favorite,
            board.order().to_vec(),
            board.objects_in_order().cloned().collect(),
        )
    }

    fn nth(session: &BoardSession, i: usize) -> Option<ObjectId> {
        session.board().order().get(i).copied()
    }

    fn run(session: &mut BoardSession, action: &Action) {
        match *action {
            // Replaces the link of a selected card instead of adding one
            Action::AddLink(n) => {
                session.add_link(&format!("https://site{n}.example")).unwrap();
            }
            Action::Move(i, x, y) => {
                if let Some(id) = nth(session, i) {
                    session.begin_move(id);
                    session.update_drag(Vec2::new(x, y));
                    session.end_gesture();
                }
            }
            Action::Resize(i, h, x, y) => {
                if let Some(id) = nth(session, i) {
                    session.begin_resize(id, ResizeHandle::ALL[h]);
                    session.update_drag(Vec2::new(x, y));
                    session.end_gesture();
                }
            }
            Action::Rotate(i, r) => {
                if let Some(id) = nth(session, i) {
                    session.begin_rotate(id);
                    session.update_rotation(r);
                    session.end_gesture();
                }
            }
            Action::Reorder(from, to) => {
                session.reorder(from, to);
            }
            Action::Remove(i) => {
                if let Some(id) = nth(session, i) {
                    session.remove_object(id);
                }
            }
            Action::Duplicate(i) => {
                if let Some(id) = nth(session, i) {
                    session.duplicate_object(id);
                }
            }
            Action::Rename(n) => {
                session.rename(format!("Board {n}"));
            }
            Action::Favorite(f) => {
                session.set_favorite(f);
            }
        }
    }

    proptest! {
        #[test]
        fn prop_undo_redo_round_trip(actions in proptest::collection::vec(action(), 1..30)) {
            let mut session = session();
            let mut states = vec![state(&session)];
            for action in &actions {
                run(&mut session, action);
                let current = state(&session);
                if states.last() != Some(&current) {
                    states.push(current);
                }
            }

            for expected in states.iter().rev().skip(1) {
                prop_assert!(session.undo());
                prop_assert_eq!(&state(&session), expected);
            }
            prop_assert!(!session.can_undo());

            for expected in states.iter().skip(1) {
                prop_assert!(session.redo());
                prop_assert_eq!(&state(&session), expected);
            }
            prop_assert!(!session.can_redo());
        }
    }
}
