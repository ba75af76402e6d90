//! Node drag gesture: Idle → Dragging → Idle.
//!
//! While a drag is live the controller produces ephemeral visual positions
//! and broadcasts them over the bus, without touching the chart; the
//! authoritative position reaches the reducer only once, in the
//! [`DragNodeStop`] payload built on release. This keeps per-frame motion
//! out of the undo history.

use std::time::{Duration, Instant};

use indexmap::IndexMap;

use crate::bus::{BusEvent, EventBus, NodeDragBroadcast};
use crate::geometry::{clamp_to_bounds, multi_select_offsets, Rect, SelectionOffsets};
use crate::model::{Chart, Position, Size};

use super::actions::DragNodeStop;

/// Animation-frame cadence for motion broadcasts.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Minimum-interval gate for pointer-move floods.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True when enough time has passed since the last accepted event.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Drag controller
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct DragState {
    node_id: String,
    /// Pointer position at gesture start, screen pixels.
    start_pointer: Position,
    /// Committed node position at gesture start, canvas units.
    start_position: Position,
    node_size: Size,
    /// Canvas size converted to unscaled units at gesture start.
    canvas_size: Size,
    offsets: IndexMap<String, SelectionOffsets>,
    multi: bool,
    scale: f64,
    /// Last broadcast (clamped) position of the lead node.
    visual: Position,
}

/// State machine for one node-drag gesture at a time.
#[derive(Debug)]
pub struct NodeDragController {
    state: Option<DragState>,
    throttle: Throttle,
}

impl Default for NodeDragController {
    fn default() -> Self {
        Self {
            state: None,
            throttle: Throttle::new(FRAME_INTERVAL),
        }
    }
}

impl NodeDragController {
    pub fn is_dragging(&self) -> bool {
        self.state.is_some()
    }

    /// The lead node's live (uncommitted) position, while dragging.
    pub fn visual_position(&self) -> Option<Position> {
        self.state.as_ref().map(|s| s.visual)
    }

    /// Enter the gesture on pointer-down over a node. Returns false when
    /// the gesture is refused (secondary button, unknown node, or another
    /// drag already owns the pointer).
    ///
    /// `selection_rects` are the measured screen rectangles of all
    /// currently selected nodes; they drive the multi-select offsets.
    #[allow(clippy::too_many_arguments)]
    pub fn begin(
        &mut self,
        chart: &Chart,
        node_id: &str,
        pointer: Position,
        canvas_screen: Size,
        selection_rects: &IndexMap<String, Rect>,
        scale: f64,
        primary_button: bool,
    ) -> bool {
        if !primary_button || self.state.is_some() {
            return false;
        }
        let Some(node) = chart.nodes.get(node_id) else {
            return false;
        };
        let scale = if scale == 0.0 { 1.0 } else { scale };

        let multi = chart.selected.get(node_id).copied().unwrap_or(false)
            && chart.selected_ids().len() > 1;
        let offsets = if multi {
            multi_select_offsets(selection_rects, scale)
        } else {
            IndexMap::new()
        };

        self.throttle.reset();
        self.state = Some(DragState {
            node_id: node_id.to_string(),
            start_pointer: pointer,
            start_position: node.position,
            node_size: node.size_or_zero(),
            canvas_size: Size::new(canvas_screen.w / scale, canvas_screen.h / scale),
            offsets,
            multi,
            scale,
            visual: node.position,
        });
        true
    }

    fn clamped_candidate(state: &DragState, pointer: Position) -> Position {
        let x = state.start_position.x + (pointer.x - state.start_pointer.x) / state.scale;
        let y = state.start_position.y + (pointer.y - state.start_pointer.y) / state.scale;
        clamp_to_bounds(
            state.canvas_size,
            state.node_size,
            state.offsets.get(&state.node_id).copied(),
            x,
            y,
        )
    }

    /// Pointer motion. Broadcasts the clamped candidate position over the
    /// bus (throttled to frame cadence) and returns it as the new
    /// ephemeral visual position.
    pub fn motion(&mut self, bus: &EventBus, pointer: Position, now: Instant) -> Option<Position> {
        let state = self.state.as_mut()?;
        if !self.throttle.ready(now) {
            return Some(state.visual);
        }
        let position = Self::clamped_candidate(state, pointer);
        let delta = Position::new(position.x - state.visual.x, position.y - state.visual.y);
        state.visual = position;
        bus.emit(&BusEvent::NodeDrag(NodeDragBroadcast {
            id: state.node_id.clone(),
            position,
            delta,
            canvas_size: state.canvas_size,
            offsets: state.offsets.clone(),
            multi: state.multi,
        }));
        Some(position)
    }

    /// Exit on pointer-up or pointer-cancel. Returns the commit payload
    /// for the reducer; `None` when no gesture was active.
    pub fn end(&mut self, pointer: Position) -> Option<DragNodeStop> {
        let state = self.state.take()?;
        let position = Self::clamped_candidate(&state, pointer);
        Some(DragNodeStop {
            id: state.node_id,
            position,
            canvas_size: state.canvas_size,
            multi_select_offsets: state.offsets,
            final_delta: Position::new(
                position.x - state.start_position.x,
                position.y - state.start_position.y,
            ),
            multi: state.multi,
        })
    }
}

/// Live position of a co-selected node mirroring a lead-node broadcast.
///
/// Returns `None` when the broadcast does not apply (single drag, or the
/// follower is the lead itself). The follower accumulates the per-frame
/// delta and clamps with its own offsets.
pub fn follower_position(
    evt: &NodeDragBroadcast,
    follower_id: &str,
    current: Position,
    size: Size,
) -> Option<Position> {
    if !evt.multi || follower_id == evt.id {
        return None;
    }
    Some(clamp_to_bounds(
        evt.canvas_size,
        size,
        evt.offsets.get(follower_id).copied(),
        current.x + evt.delta.x,
        current.y + evt.delta.y,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn chart_with_node(id: &str, x: f64, y: f64) -> Chart {
        let mut chart = Chart::default();
        chart.nodes.insert(
            id.to_string(),
            Node::new(id, id, Position::new(x, y)).with_size(100.0, 50.0),
        );
        chart
    }

    fn later(start: Instant, ms: u64) -> Instant {
        start + Duration::from_millis(ms)
    }

    #[test]
    fn test_begin_refuses_secondary_button_and_unknown_node() {
        let chart = chart_with_node("A", 10.0, 10.0);
        let mut drag = NodeDragController::default();
        let canvas = Size::new(1000.0, 800.0);
        let rects = IndexMap::new();
        assert!(!drag.begin(&chart, "A", Position::new(0.0, 0.0), canvas, &rects, 1.0, false));
        assert!(!drag.begin(&chart, "nope", Position::new(0.0, 0.0), canvas, &rects, 1.0, true));
        assert!(drag.begin(&chart, "A", Position::new(0.0, 0.0), canvas, &rects, 1.0, true));
        assert!(drag.is_dragging());
    }

    #[test]
    fn test_motion_scales_and_clamps() {
        let chart = chart_with_node("A", 10.0, 10.0);
        let mut drag = NodeDragController::default();
        let bus = EventBus::new();
        let t0 = Instant::now();
        // zoom 2: screen deltas are halved in canvas units
        assert!(drag.begin(
            &chart,
            "A",
            Position::new(0.0, 0.0),
            Size::new(2000.0, 1600.0),
            &IndexMap::new(),
            2.0,
            true,
        ));
        let pos = drag.motion(&bus, Position::new(40.0, 20.0), t0).unwrap();
        assert_eq!(pos, Position::new(30.0, 20.0));
        // far past the right edge: clamped to canvas minus node size
        let pos = drag
            .motion(&bus, Position::new(1e6, 1e6), later(t0, 20))
            .unwrap();
        assert_eq!(pos, Position::new(1000.0 - 100.0, 800.0 - 50.0));
    }

    #[test]
    fn test_motion_is_throttled_but_end_is_not() {
        let chart = chart_with_node("A", 0.0, 0.0);
        let mut drag = NodeDragController::default();
        let bus = EventBus::new();
        let broadcasts = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&broadcasts);
        bus.subscribe(crate::bus::Topic::NodeDrag, move |evt| {
            if let BusEvent::NodeDrag(b) = evt {
                sink.borrow_mut().push(b.position);
            }
        });

        let t0 = Instant::now();
        drag.begin(
            &chart,
            "A",
            Position::new(0.0, 0.0),
            Size::new(1000.0, 800.0),
            &IndexMap::new(),
            1.0,
            true,
        );
        drag.motion(&bus, Position::new(10.0, 0.0), t0);
        // 1 ms later: inside the frame interval, no second broadcast
        let held = drag.motion(&bus, Position::new(20.0, 0.0), later(t0, 1)).unwrap();
        assert_eq!(held, Position::new(10.0, 0.0));
        assert_eq!(broadcasts.borrow().len(), 1);

        // release uses the raw pointer, not the throttled visual
        let stop = drag.end(Position::new(20.0, 0.0)).unwrap();
        assert_eq!(stop.position, Position::new(20.0, 0.0));
        assert_eq!(stop.final_delta, Position::new(20.0, 0.0));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_multi_drag_carries_offsets() {
        let mut chart = chart_with_node("A", 100.0, 100.0);
        chart.nodes.insert(
            "B".to_string(),
            Node::new("B", "B", Position::new(300.0, 200.0)).with_size(100.0, 50.0),
        );
        chart.selected.insert("A".into(), true);
        chart.selected.insert("B".into(), true);

        let mut rects = IndexMap::new();
        rects.insert("A".to_string(), Rect::new(100.0, 100.0, 200.0, 150.0));
        rects.insert("B".to_string(), Rect::new(300.0, 200.0, 400.0, 250.0));

        let mut drag = NodeDragController::default();
        drag.begin(
            &chart,
            "A",
            Position::new(0.0, 0.0),
            Size::new(1000.0, 800.0),
            &rects,
            1.0,
            true,
        );
        let stop = drag.end(Position::new(-1e6, 0.0)).unwrap();
        assert!(stop.multi);
        // A sits on the selection box's left edge, so it stops at 0
        assert_eq!(stop.position.x, 0.0);
        assert_eq!(stop.multi_select_offsets["B"].left, 200.0);
    }

    #[test]
    fn test_follower_mirrors_clamped_delta() {
        let mut offsets = IndexMap::new();
        offsets.insert("B".to_string(), SelectionOffsets::default());
        let evt = NodeDragBroadcast {
            id: "A".into(),
            position: Position::new(50.0, 50.0),
            delta: Position::new(10.0, 5.0),
            canvas_size: Size::new(1000.0, 800.0),
            offsets,
            multi: true,
        };
        assert_eq!(
            follower_position(&evt, "B", Position::new(200.0, 200.0), Size::new(100.0, 50.0)),
            Some(Position::new(210.0, 205.0))
        );
        // the lead itself and single drags are not mirrored
        assert_eq!(
            follower_position(&evt, "A", Position::new(0.0, 0.0), Size::new(1.0, 1.0)),
            None
        );
        let single = NodeDragBroadcast { multi: false, ..evt };
        assert_eq!(
            follower_position(&single, "B", Position::new(0.0, 0.0), Size::new(1.0, 1.0)),
            None
        );
    }
}
