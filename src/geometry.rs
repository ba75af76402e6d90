//! Pure geometry utilities for the diagram core.
//!
//! Everything in this module is a stateless function over plain values:
//! bound-clamping of dragged nodes, hit testing for link completion, marquee
//! intersection tests, multi-select offset computation and link curve
//! generation. Interaction controllers and the reducer share these so drag
//! previews and committed positions can never disagree.

use indexmap::IndexMap;

use crate::model::{Node, Port, Position, Size};

/// Vertical space occupied by one port row inside a node.
pub const PORT_HEIGHT: f64 = 30.0;
/// Total row height including spacing; link targets anchor this far below
/// the node's top-left corner.
pub const PORT_OFFSET_Y: f64 = 35.0;

// ────────────────────────────────────────────────────────────────────────────
// Rectangles
// ────────────────────────────────────────────────────────────────────────────

/// An axis-aligned rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle of a placed node (position plus measured size).
    pub fn from_position_size(position: Position, size: Size) -> Self {
        Self {
            left: position.x,
            top: position.y,
            right: position.x + size.w,
            bottom: position.y + size.h,
        }
    }

    /// Rectangle spanned by two arbitrary corner points.
    pub fn from_corners(a: Position, b: Position) -> Self {
        Self {
            left: a.x.min(b.x),
            top: a.y.min(b.y),
            right: a.x.max(b.x),
            bottom: a.y.max(b.y),
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// 1-D interval overlap (inclusive at the boundary).
fn spans_overlap(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> bool {
    a_max >= b_min && b_max >= a_min
}

/// 2-D rectangle intersection: the boxes intersect iff their projections
/// onto both axes overlap.
pub fn rects_intersect(a: Rect, b: Rect) -> bool {
    spans_overlap(a.left, a.right, b.left, b.right)
        && spans_overlap(a.top, a.bottom, b.top, b.bottom)
}

/// Strict interior containment used for link-completion hit testing:
/// landing exactly on a boundary pixel is a miss.
pub fn point_in_node(node: &Node, point: Position) -> bool {
    let size = node.size_or_zero();
    let x2 = node.position.x + size.w;
    let y2 = node.position.y + size.h;
    point.x > node.position.x && point.x < x2 && point.y > node.position.y && point.y < y2
}

/// First node whose interior contains `point`, in chart insertion order.
pub fn node_at_point<'a>(
    nodes: impl IntoIterator<Item = &'a Node>,
    point: Position,
) -> Option<&'a Node> {
    nodes.into_iter().find(|n| point_in_node(n, point))
}

// ────────────────────────────────────────────────────────────────────────────
// Drag clamping
// ────────────────────────────────────────────────────────────────────────────

/// A node's positional offsets relative to the bounding rectangle of the
/// whole current selection, in unscaled canvas units.
///
/// During a multi-drag every member is clamped with its own offsets, so the
/// selection's combined bounding box respects the canvas edges rather than
/// each node individually.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SelectionOffsets {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Clamp a candidate node position so the node (widened by its selection
/// offsets) stays inside the canvas.
///
/// The lower bound wins when the canvas is smaller than the node, keeping
/// the node pinned to the top-left rather than oscillating.
pub fn clamp_to_bounds(
    canvas: Size,
    node: Size,
    offsets: Option<SelectionOffsets>,
    x: f64,
    y: f64,
) -> Position {
    let off = offsets.unwrap_or_default();
    let left = off.left;
    let right = canvas.w - (node.w + off.right);
    let top = off.top;
    let bottom = canvas.h - (node.h + off.bottom);

    let x = x.min(right).max(left);
    let y = y.min(bottom).max(top);
    Position::new(x, y)
}

/// Compute per-node [`SelectionOffsets`] from the screen rectangles of the
/// selected nodes.
///
/// `rects` are in screen pixels (as measured by the rendering layer); the
/// offsets are divided by `scale` to land back in canvas units.
pub fn multi_select_offsets(
    rects: &IndexMap<String, Rect>,
    scale: f64,
) -> IndexMap<String, SelectionOffsets> {
    if rects.is_empty() {
        return IndexMap::new();
    }
    let scale = if scale == 0.0 { 1.0 } else { scale };

    let mut bounds = Rect::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
    for rect in rects.values() {
        bounds.left = bounds.left.min(rect.left);
        bounds.top = bounds.top.min(rect.top);
        bounds.right = bounds.right.max(rect.right);
        bounds.bottom = bounds.bottom.max(rect.bottom);
    }

    rects
        .iter()
        .map(|(id, rect)| {
            let offsets = SelectionOffsets {
                left: (rect.left - bounds.left).abs() / scale,
                right: (rect.right - bounds.right).abs() / scale,
                top: (rect.top - bounds.top).abs() / scale,
                bottom: (rect.bottom - bounds.bottom).abs() / scale,
            };
            (id.clone(), offsets)
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Link curves
// ────────────────────────────────────────────────────────────────────────────

/// Pull of the cubic control points towards the horizontal midline.
const BEZIER_WEIGHT: f64 = 0.675;
/// Horizontal inset of the arrow head from the target position.
const LINK_END_INSET_X: f64 = 5.0;

/// Geometry of one rendered link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkPath {
    /// Self-loop: drawn as a cycle marker at the origin port instead of a curve.
    Cycle { at: Position },
    /// Cubic bezier from the origin port towards the target.
    Curve {
        start: Position,
        ctrl1: Position,
        ctrl2: Position,
        end: Position,
    },
}

impl LinkPath {
    /// SVG path data for this link (`M … C …`), empty for cycle markers.
    pub fn svg_path(&self) -> String {
        match self {
            LinkPath::Cycle { .. } => String::new(),
            LinkPath::Curve {
                start,
                ctrl1,
                ctrl2,
                end,
            } => format!(
                "M {} {} C {} {} {} {} {} {}",
                start.x, start.y, ctrl1.x, ctrl1.y, ctrl2.x, ctrl2.y, end.x, end.y
            ),
        }
    }
}

/// Anchor point of an outgoing link on its origin port.
///
/// Ports stack bottom-up: higher `index` anchors closer to the node's top
/// edge. An index of zero (or below) is treated as 1.
pub fn port_anchor(node: &Node, port: &Port) -> Position {
    let size = node.size_or_zero();
    let index = if port.index <= 0 { 1 } else { port.index } as f64;
    Position::new(
        node.position.x + size.w,
        node.position.y + size.h - index * PORT_HEIGHT + (PORT_HEIGHT - 2.0) / 2.0,
    )
}

/// Default curved path between an origin port anchor and a target point.
///
/// `creating` is true while the link is still a rubber band following the
/// cursor; committed links aim at the target node's first port row instead
/// of its top-left corner.
pub fn curved_path(start: Position, target: Position, creating: bool) -> LinkPath {
    let end = Position::new(
        target.x - LINK_END_INSET_X,
        target.y + if creating { 0.0 } else { PORT_OFFSET_Y },
    );
    let reach = (end.x - start.x).abs() * BEZIER_WEIGHT;
    LinkPath::Curve {
        start,
        ctrl1: Position::new(start.x + reach, start.y),
        ctrl2: Position::new(end.x - reach, end.y),
        end,
    }
}

/// Straight-line path variant (host-selectable alternative to [`curved_path`]).
pub fn straight_path(start: Position, end: Position) -> String {
    format!("M {} {} {} {}", start.x, start.y, end.x, end.y)
}

/// Full link geometry: origin anchor plus curve or self-loop marker.
///
/// `to_node` is the resolved target for committed links; `pos_to` the live
/// cursor position for in-progress ones. Returns `None` when neither is
/// available.
pub fn link_path(
    from_node: &Node,
    from_port: &Port,
    to_node: Option<&Node>,
    pos_to: Option<Position>,
) -> Option<LinkPath> {
    let start = port_anchor(from_node, from_port);
    match (to_node, pos_to) {
        (Some(target), _) if target.id == from_node.id => Some(LinkPath::Cycle { at: start }),
        (Some(target), _) => Some(curved_path(start, target.position, false)),
        (None, Some(pos)) => Some(curved_path(start, pos, true)),
        (None, None) => None,
    }
}
