//! Marquee selection gesture.
//!
//! Modifier-key + pointer-down on empty canvas anchors a rectangle that
//! tracks the pointer; release intersects it with every node rectangle and
//! produces a full replacement selection map (every node id mapped to
//! true or false), so marquee selection is exclusive rather than additive.

use indexmap::IndexMap;

use crate::geometry::{rects_intersect, Rect};
use crate::model::{Chart, Position};

/// State machine for one marquee gesture at a time. All coordinates are
/// unscaled canvas units.
#[derive(Debug, Default)]
pub struct AreaSelectController {
    anchor: Option<Position>,
    current: Option<Position>,
}

impl AreaSelectController {
    /// Enter the gesture. Refused without the modifier key, so plain
    /// canvas drags stay available for panning.
    pub fn begin(&mut self, at: Position, modifier_held: bool) -> bool {
        if !modifier_held || self.anchor.is_some() {
            return false;
        }
        self.anchor = Some(at);
        self.current = Some(at);
        true
    }

    pub fn motion(&mut self, at: Position) {
        if self.anchor.is_some() {
            self.current = Some(at);
        }
    }

    /// The marquee rectangle spanned so far, for the rendering layer.
    pub fn marquee(&self) -> Option<Rect> {
        Some(Rect::from_corners(self.anchor?, self.current?))
    }

    /// Exit on pointer-up: intersect the marquee with every node and
    /// return the replacement selection map. `None` when no gesture was
    /// active.
    pub fn end(&mut self, chart: &Chart) -> Option<IndexMap<String, bool>> {
        let marquee = self.marquee()?;
        self.anchor = None;
        self.current = None;

        Some(
            chart
                .nodes
                .values()
                .map(|node| {
                    let rect = Rect::from_position_size(node.position, node.size_or_zero());
                    (node.id.clone(), rects_intersect(marquee, rect))
                })
                .collect(),
        )
    }

    /// Pointer-cancel: abandon the gesture without producing a selection.
    pub fn cancel(&mut self) {
        self.anchor = None;
        self.current = None;
    }
}
