//! The dispatch contract of the editor.
//!
//! Every user-visible mutation is expressed as an [`Action`] value handed to
//! the reducer. Each variant corresponds to one wire kind (the string the
//! host sees in change notifications and diagnostics), reachable via
//! [`Action::kind`].

use indexmap::IndexMap;

use crate::geometry::SelectionOffsets;
use crate::model::{Link, Node, Position, Size};

// ────────────────────────────────────────────────────────────────────────────
// Payloads
// ────────────────────────────────────────────────────────────────────────────

/// Commit payload of a finished node-drag gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct DragNodeStop {
    /// Id of the lead node (the one grabbed by the pointer).
    pub id: String,
    /// Final clamped position of the lead node.
    pub position: Position,
    /// Canvas size in unscaled units, as captured at gesture start.
    pub canvas_size: Size,
    /// Per-node offsets relative to the selection bounding box, present
    /// only for multi-drags.
    pub multi_select_offsets: IndexMap<String, SelectionOffsets>,
    /// Total translation from gesture start to release.
    pub final_delta: Position,
    /// True when the lead node was part of a multi-selection.
    pub multi: bool,
}

/// Begin a connection gesture from a port.
#[derive(Debug, Clone, PartialEq)]
pub struct StartConnection {
    /// The rubber-band link: `from` filled in, `to` empty, `pos_to`
    /// tracking the pointer.
    pub new_link: Link,
}

/// Resolve a connection gesture at its release point.
#[derive(Debug, Clone, PartialEq)]
pub struct EndConnection {
    /// The in-progress link; `pos_to` is the release point used for the
    /// hit test.
    pub link: Link,
    /// Links already leaving the origin port, for the one-per-port guard.
    pub port_links: Vec<Link>,
}

/// One measured node rectangle from the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeSizeObservation {
    pub width: f64,
    pub height: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// Action
// ────────────────────────────────────────────────────────────────────────────

/// Everything that can be dispatched into the editor.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Insert a node under its own id. A colliding id is rejected as a
    /// no-op and reported through the diagnostic callback.
    NodeAdded { node: Node },
    /// Merge caller-edited fields into an existing node. The stored
    /// position and size always win; links from ports removed by the edit
    /// are cascaded away.
    UpdateNode { node: Node },
    /// Remove the listed nodes (those flagged `prevent_removal` are
    /// skipped) and every link touching them; clears the selection.
    DeleteNodes { ids: Vec<String> },
    /// Set one flag in the selection map.
    NodeSelectionChanged { node_id: String, selected: bool },
    /// Replace the entire selection map (marquee selection is exclusive).
    AreaSelectionChanged { selection: IndexMap<String, bool> },
    /// Commit the final position of a drag gesture; co-selected nodes
    /// receive the same delta, each clamped with its own offsets.
    DragNodeStop(DragNodeStop),
    StartConnection(StartConnection),
    EndConnection(EndConnection),
    /// Remove one link by id.
    DeleteLink { id: String },
    /// A batch of resize observations; position is never touched.
    NodeSizeChanged {
        observations: IndexMap<String, NodeSizeObservation>,
    },
    Undo,
    Redo,
    /// Update the chart display name only.
    NameChange { name: String },
    /// Translate the canvas. Handled by the pan/zoom layer; the chart
    /// passes through unchanged.
    PanChange { x: f64, y: f64 },
    ZoomIn,
    ZoomOut,
    ZoomReset,
    ToggleSidebar,
    /// Open the property panel for one node.
    NodeSettings { id: String },
    /// Host-supplied action kind the editor does not recognize. Passed
    /// through as a no-op but surfaced through the diagnostic callback.
    Unknown { kind: String },
}

impl Action {
    /// The wire kind of this action, as seen by change notifications,
    /// diagnostics and the history allow-list.
    pub fn kind(&self) -> &str {
        match self {
            Action::NodeAdded { .. } => "onNodeAdded",
            Action::UpdateNode { .. } => "onUpdateNode",
            Action::DeleteNodes { .. } => "onDeleteNodes",
            Action::NodeSelectionChanged { .. } => "onNodeSelectionChanged",
            Action::AreaSelectionChanged { .. } => "onAreaSelectionChanged",
            Action::DragNodeStop(_) => "onDragNodeStop",
            Action::StartConnection(_) => "onStartConnection",
            Action::EndConnection(_) => "onEndConnection",
            Action::DeleteLink { .. } => "onDeleteLink",
            Action::NodeSizeChanged { .. } => "onNodeSizeChanged",
            Action::Undo => "onUndo",
            Action::Redo => "onRedo",
            Action::NameChange { .. } => "onNameChange",
            Action::PanChange { .. } => "onPanChange",
            Action::ZoomIn => "onZoomIn",
            Action::ZoomOut => "onZoomOut",
            Action::ZoomReset => "onZoomReset",
            Action::ToggleSidebar => "toggleSidebar",
            Action::NodeSettings { .. } => "onNodeSettings",
            Action::Unknown { kind } => kind,
        }
    }
}
