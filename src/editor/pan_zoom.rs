//! Canvas transform: zoom scale plus pan translation.
//!
//! The scale stored here is the single source of truth every other
//! controller divides pointer deltas by to convert screen pixels into
//! canvas units.

use crate::model::Position;

pub const ZOOM_STEP: f64 = 0.25;
pub const DEFAULT_MIN_ZOOM: f64 = 0.5;
pub const DEFAULT_MAX_ZOOM: f64 = 2.0;

/// The 2-D affine transform applied to the canvas content.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanZoom {
    /// Translation, screen pixels.
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for PanZoom {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM)
    }
}

impl PanZoom {
    pub fn new(min_zoom: f64, max_zoom: f64) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            min_zoom,
            max_zoom,
        }
    }

    /// Set the scale, clamped into `[min_zoom, max_zoom]`.
    pub fn set_scale(&mut self, scale: f64) {
        self.scale = scale.max(self.min_zoom).min(self.max_zoom);
    }

    pub fn zoom_in(&mut self) {
        self.set_scale(self.scale + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(self.scale - ZOOM_STEP);
    }

    /// Restore the identity transform.
    pub fn zoom_reset(&mut self) {
        self.scale = 1.0;
        self.x = 0.0;
        self.y = 0.0;
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    /// Map a screen-space point into unscaled canvas coordinates.
    pub fn screen_to_canvas(&self, point: Position) -> Position {
        Position {
            x: (point.x - self.x) / self.scale,
            y: (point.y - self.y) / self.scale,
        }
    }
}

/// Drag-to-pan gesture. Refuses to start while the marquee modifier is
/// held so the two gestures never fight over the pointer.
#[derive(Debug, Default)]
pub struct PanController {
    last: Option<Position>,
}

impl PanController {
    /// Returns true when the gesture was accepted.
    pub fn begin(&mut self, at: Position, modifier_held: bool) -> bool {
        if modifier_held || self.last.is_some() {
            return false;
        }
        self.last = Some(at);
        true
    }

    pub fn motion(&mut self, transform: &mut PanZoom, at: Position) {
        if let Some(last) = self.last {
            transform.pan_by(at.x - last.x, at.y - last.y);
            self.last = Some(at);
        }
    }

    /// Ends the gesture; also used for pointer-cancel.
    pub fn end(&mut self) {
        self.last = None;
    }

    pub fn is_panning(&self) -> bool {
        self.last.is_some()
    }
}
