//! Pure chart reducer.
//!
//! Every function here takes the current [`Chart`] by reference and returns
//! a brand-new value; nothing is mutated in place. Rejected mutations (link
//! to an occupied target, removal of a protected node, duplicate node id)
//! come back as the unchanged chart, never as an error. The dispatcher
//! [`reduce`] additionally reports the rejections worth surfacing through
//! a [`Diagnostic`] so hosts can observe what would otherwise be silent.

use indexmap::IndexMap;

use crate::geometry::{clamp_to_bounds, node_at_point};
use crate::model::{Chart, Node, Size};

use super::actions::{Action, DragNodeStop, EndConnection, NodeSizeObservation};

// ────────────────────────────────────────────────────────────────────────────
// Diagnostics
// ────────────────────────────────────────────────────────────────────────────

/// Non-fatal observations produced by [`reduce`]. The chart is still
/// returned (unchanged or pass-through); these exist so permissive
/// behavior does not mask caller bugs entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// `onNodeAdded` with an id that already exists; the insert was
    /// rejected instead of overwriting the stored node.
    DuplicateNodeId(String),
    /// `onUpdateNode` for an id the chart does not contain.
    UnknownNodeId(String),
    /// An action kind the reducer does not recognize; state passed
    /// through unchanged.
    UnknownAction(String),
}

/// Outcome of one reducer step.
#[derive(Debug, Clone, PartialEq)]
pub struct Reduced {
    pub chart: Chart,
    pub diagnostic: Option<Diagnostic>,
}

impl Reduced {
    fn changed(chart: Chart) -> Self {
        Self {
            chart,
            diagnostic: None,
        }
    }

    fn unchanged(chart: &Chart) -> Self {
        Self {
            chart: chart.clone(),
            diagnostic: None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Node operations
// ────────────────────────────────────────────────────────────────────────────

/// Insert a node under its own id. Returns `None` when the id is already
/// taken; the caller decides how to report that.
pub fn add_node(chart: &Chart, node: Node) -> Option<Chart> {
    if chart.nodes.contains_key(&node.id) {
        return None;
    }
    let mut next = chart.clone();
    next.nodes.insert(node.id.clone(), node);
    Some(next)
}

/// Merge an edited node into the chart. The stored position and size are
/// always kept, so editing title, content or ports can never move or
/// resize a node. Links leaving a port the edit removed are dropped.
pub fn update_node(chart: &Chart, mut node: Node) -> Option<Chart> {
    let stored = chart.nodes.get(&node.id)?;
    node.position = stored.position;
    node.size = stored.size;

    let mut next = chart.clone();
    next.links.retain(|_, link| {
        link.from.node_id != node.id || node.ports.contains_key(&link.from.port_id)
    });
    next.nodes.insert(node.id.clone(), node);
    next.rebuild_paths();
    Some(next)
}

/// Remove the listed nodes and every link touching them. Nodes flagged
/// `prevent_removal` are skipped without comment. The selection is cleared
/// entirely, even when nothing was actually removed.
pub fn delete_nodes(chart: &Chart, ids: &[String]) -> Chart {
    let removed: Vec<&String> = ids
        .iter()
        .filter(|id| {
            chart
                .nodes
                .get(*id)
                .is_some_and(|node| !node.prevent_removal)
        })
        .collect();

    let mut next = chart.clone();
    for id in &removed {
        next.nodes.shift_remove(*id);
    }
    next.links.retain(|_, link| {
        !removed
            .iter()
            .any(|id| link.from.node_id == **id || link.to == **id)
    });
    next.selected.clear();
    next.rebuild_paths();
    next
}

/// Set one flag in the selection map.
pub fn set_node_selection(chart: &Chart, node_id: &str, selected: bool) -> Chart {
    let mut next = chart.clone();
    next.selected.insert(node_id.to_string(), selected);
    next
}

/// Replace the whole selection map. Marquee selection is exclusive, so
/// ids absent from `selection` lose their flag too.
pub fn replace_selection(chart: &Chart, selection: IndexMap<String, bool>) -> Chart {
    let mut next = chart.clone();
    next.selected = selection;
    next
}

/// Commit the final position of a drag gesture. In a multi-drag every
/// other selected node receives the same delta, independently clamped
/// with its own offsets so the group's bounding box respects the canvas.
pub fn drag_node_stop(chart: &Chart, evt: &DragNodeStop) -> Chart {
    let mut next = chart.clone();
    if let Some(lead) = next.nodes.get_mut(&evt.id) {
        lead.position = evt.position;
    }
    if evt.multi {
        let followers: Vec<String> = chart
            .selected_ids()
            .into_iter()
            .filter(|id| *id != evt.id)
            .collect();
        for id in followers {
            if let Some(node) = next.nodes.get_mut(&id) {
                node.position = clamp_to_bounds(
                    evt.canvas_size,
                    node.size_or_zero(),
                    evt.multi_select_offsets.get(&id).copied(),
                    node.position.x + evt.final_delta.x,
                    node.position.y + evt.final_delta.y,
                );
            }
        }
    }
    next
}

/// Record measured sizes from the rendering layer without touching
/// positions. Unknown ids are skipped.
pub fn node_size_changed(
    chart: &Chart,
    observations: &IndexMap<String, NodeSizeObservation>,
) -> Chart {
    let mut next = chart.clone();
    for (id, obs) in observations {
        if let Some(node) = next.nodes.get_mut(id) {
            node.size = Some(Size {
                w: obs.width,
                h: obs.height,
            });
        }
    }
    next
}

// ────────────────────────────────────────────────────────────────────────────
// Link operations
// ────────────────────────────────────────────────────────────────────────────

/// A candidate link may land when the release point is strictly inside
/// some node, the origin port has no other outgoing link, and the target
/// node has no incoming link yet. Self-loops pass all three checks.
fn resolve_connection_target(chart: &Chart, evt: &EndConnection) -> Option<String> {
    let point = evt.link.pos_to?;
    let target = node_at_point(chart.nodes.values(), point)?.id.clone();
    if evt
        .port_links
        .iter()
        .any(|link| link.id != evt.link.id && !link.is_in_progress())
    {
        return None;
    }
    if chart
        .links
        .values()
        .any(|link| link.id != evt.link.id && link.to == target)
    {
        return None;
    }
    Some(target)
}

/// Resolve a connection gesture. On a miss or a rejected target the
/// chart comes back unchanged (the rubber band lives in the controller,
/// never in the chart); on a hit the link is committed and `paths`
/// recomputed.
pub fn end_connection(chart: &Chart, evt: &EndConnection) -> Chart {
    match resolve_connection_target(chart, evt) {
        Some(target) => {
            let mut next = chart.clone();
            let mut link = evt.link.clone();
            link.to = target;
            next.links.insert(link.id.clone(), link);
            next.rebuild_paths();
            next
        }
        None => chart.clone(),
    }
}

/// Remove one link by id; unknown ids are a no-op.
pub fn delete_link(chart: &Chart, id: &str) -> Chart {
    let mut next = chart.clone();
    if next.links.shift_remove(id).is_some() {
        next.rebuild_paths();
    }
    next
}

// ────────────────────────────────────────────────────────────────────────────
// Dispatcher
// ────────────────────────────────────────────────────────────────────────────

/// Apply one action to a chart. Actions the chart reducer does not handle
/// (undo/redo, pan/zoom, sidebar, unknown kinds) pass the chart through
/// unchanged; unknown kinds additionally yield a diagnostic.
pub fn reduce(chart: &Chart, action: &Action) -> Reduced {
    match action {
        Action::NodeAdded { node } => match add_node(chart, node.clone()) {
            Some(next) => Reduced::changed(next),
            None => Reduced {
                chart: chart.clone(),
                diagnostic: Some(Diagnostic::DuplicateNodeId(node.id.clone())),
            },
        },
        Action::UpdateNode { node } => match update_node(chart, node.clone()) {
            Some(next) => Reduced::changed(next),
            None => Reduced {
                chart: chart.clone(),
                diagnostic: Some(Diagnostic::UnknownNodeId(node.id.clone())),
            },
        },
        Action::DeleteNodes { ids } => Reduced::changed(delete_nodes(chart, ids)),
        Action::NodeSelectionChanged { node_id, selected } => {
            Reduced::changed(set_node_selection(chart, node_id, *selected))
        }
        Action::AreaSelectionChanged { selection } => {
            Reduced::changed(replace_selection(chart, selection.clone()))
        }
        Action::DragNodeStop(evt) => Reduced::changed(drag_node_stop(chart, evt)),
        Action::EndConnection(evt) => Reduced::changed(end_connection(chart, evt)),
        Action::DeleteLink { id } => Reduced::changed(delete_link(chart, id)),
        Action::NodeSizeChanged { observations } => {
            Reduced::changed(node_size_changed(chart, observations))
        }
        Action::Unknown { kind } => Reduced {
            chart: chart.clone(),
            diagnostic: Some(Diagnostic::UnknownAction(kind.clone())),
        },
        // Handled outside the chart reducer (history, pan/zoom layer,
        // UI state, the connection controller's rubber band); the chart
        // itself is untouched.
        Action::StartConnection(_)
        | Action::Undo
        | Action::Redo
        | Action::NameChange { .. }
        | Action::PanChange { .. }
        | Action::ZoomIn
        | Action::ZoomOut
        | Action::ZoomReset
        | Action::ToggleSidebar
        | Action::NodeSettings { .. } => Reduced::unchanged(chart),
    }
}
