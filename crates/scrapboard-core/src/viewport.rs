//! Zoom and pan state of a board.
//!
//! The view shows the board scaled by `zoom`, scrolled by `offset`:
//! `screen = board * zoom - offset`. Zoom only ever takes values from the
//! configured step table, and the offset stays inside the virtual canvas.

use crate::config::BoardConfig;
use crate::geometry::{closest_step_index, floor_step, next_step, previous_step};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Scroll offset in screen points.
    pub offset: Vec2,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn new(offset: Vec2, zoom: f64) -> Self {
        Self { offset, zoom }
    }

    /// Board to screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(-self.offset) * Affine::scale(self.zoom)
    }

    pub fn screen_to_board(&self, point: Point) -> Point {
        self.transform().inverse() * point
    }

    pub fn board_to_screen(&self, point: Point) -> Point {
        self.transform() * point
    }

    /// Convert a gesture translation from screen points to board units.
    pub fn screen_delta_to_board(&self, delta: Vec2) -> Vec2 {
        delta / self.zoom
    }

    /// Step up the zoom table, keeping the view center fixed.
    pub fn zoom_in(&mut self, config: &BoardConfig) {
        let zoom = next_step(&config.zoom_steps, self.zoom);
        self.zoom_about_center(zoom, config);
    }

    /// Step down the zoom table, keeping the view center fixed.
    pub fn zoom_out(&mut self, config: &BoardConfig) {
        let zoom = previous_step(&config.zoom_steps, self.zoom);
        self.zoom_about_center(zoom, config);
    }

    /// Set the zoom to the step closest to `zoom`.
    pub fn set_zoom(&mut self, zoom: f64, config: &BoardConfig) {
        let index = closest_step_index(&config.zoom_steps, zoom);
        let snapped = config.zoom_steps.get(index).copied().unwrap_or(self.zoom);
        self.zoom_about_center(snapped, config);
    }

    fn zoom_about_center(&mut self, zoom: f64, config: &BoardConfig) {
        let view_center = Point::new(config.view_size.width / 2.0, config.view_size.height / 2.0);
        let board_center = self.screen_to_board(view_center);
        self.zoom = zoom;
        self.offset = board_center.to_vec2() * zoom - view_center.to_vec2();
        self.clamp(config);
    }

    /// Scroll to an absolute offset, clamped to the canvas.
    pub fn scroll_to(&mut self, offset: Vec2, config: &BoardConfig) {
        self.offset = offset;
        self.clamp(config);
    }

    /// Repair a viewport read from storage: the zoom is snapped to the step
    /// table (unusable values fall back to 1) and the offset is clamped.
    pub fn normalize(&mut self, config: &BoardConfig) {
        if !self.zoom.is_finite() || self.zoom <= 0.0 {
            self.zoom = Viewport::default().zoom;
        }
        let index = closest_step_index(&config.zoom_steps, self.zoom);
        if let Some(&step) = config.zoom_steps.get(index) {
            self.zoom = step;
        }
        if !self.offset.x.is_finite() || !self.offset.y.is_finite() {
            self.offset = Vec2::ZERO;
        }
        self.clamp(config);
    }

    /// Keep the offset within `[0, canvas * zoom - view]` on each axis.
    pub fn clamp(&mut self, config: &BoardConfig) {
        let canvas = config.canvas_size();
        let max_x = (canvas.width * self.zoom - config.view_size.width).max(0.0);
        let max_y = (canvas.height * self.zoom - config.view_size.height).max(0.0);
        self.offset = Vec2::new(self.offset.x.clamp(0.0, max_x), self.offset.y.clamp(0.0, max_y));
    }

    /// Zoom and scroll so that `bounds` fills most of the view.
    ///
    /// Empty bounds reset to the default view.
    pub fn fit_to_content(&mut self, bounds: Rect, config: &BoardConfig) {
        if bounds.width() <= 0.0 && bounds.height() <= 0.0 {
            *self = Viewport::default();
            self.clamp(config);
            return;
        }

        let view = config.view_size;
        let ratio = (bounds.width() / view.width).max(bounds.height() / view.height);
        let scale = (0.8 / ratio).clamp(config.min_zoom(), config.max_zoom());
        self.zoom = floor_step(&config.zoom_steps, scale);

        let center = bounds.center().to_vec2() * self.zoom;
        self.offset = center - Vec2::new(view.width / 2.0, view.height / 2.0);
        self.clamp(config);
    }

    /// Where the `index`-th object of a placement batch goes: the view
    /// center, shifted diagonally per index.
    pub fn center_in_board(&self, index: usize, config: &BoardConfig) -> Point {
        let shift = config.placement_shift * index as f64;
        Point::new(
            (self.offset.x + config.view_size.width / 2.0 + shift) / self.zoom,
            (self.offset.y + config.view_size.height / 2.0 + shift) / self.zoom,
        )
    }
}
