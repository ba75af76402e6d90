//! Editor facade: owns the live state and wires the reducer, the history
//! manager, the interaction controllers and the event bus together.
//!
//! Hosts drive it two ways: dispatch [`Action`]s directly, or feed pointer
//! events into the gesture methods, which build the right actions
//! themselves. After every dispatch the change callback fires with the new
//! state and the action kind, so the host can persist or react.

use std::rc::Rc;
use std::time::Instant;

use indexmap::IndexMap;

use crate::bus::{BusEvent, EventBus};
use crate::geometry::{port_anchor, Rect};
use crate::model::{Chart, Position, PropertyBag, Size};

use super::actions::Action;
use super::area_select::AreaSelectController;
use super::connection::ConnectionController;
use super::drag::NodeDragController;
use super::history::{UndoRedoManager, DEFAULT_MAX_HISTORY};
use super::pan_zoom::{PanController, PanZoom};
use super::reducer::{reduce, Diagnostic};

// ────────────────────────────────────────────────────────────────────────────
// State and configuration
// ────────────────────────────────────────────────────────────────────────────

/// Transient UI flags living next to the chart but outside the history.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UiState {
    pub sidebar_opened: bool,
    /// Node whose property panel is open, if any.
    pub settings_node_id: Option<String>,
}

/// The full editor state handed to change callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowchartState {
    pub name: String,
    pub chart: Chart,
    pub ui: UiState,
}

/// Dispatch counter; incremented on every action, including no-ops and
/// unrecognized kinds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChangeSummary {
    pub dispatches: u64,
    pub last_action: Option<String>,
}

/// Caller-supplied property check: returns an error message when the
/// candidate bag must not be committed.
pub type PropertiesValidator = Rc<dyn Fn(&PropertyBag) -> Option<String>>;

#[derive(Default, Clone)]
pub struct EditorConfig {
    pub max_history: Option<usize>,
    pub allow_multiple_links_per_port: bool,
    /// Consulted by the property panel before it commits a node edit.
    pub node_properties_validator: Option<PropertiesValidator>,
    pub port_properties_validator: Option<PropertiesValidator>,
    /// Fired after every dispatch with the new state and the action kind.
    pub on_changed: Option<Rc<dyn Fn(&FlowchartState, &str)>>,
    /// Observes rejections and unknown action kinds that are otherwise
    /// silent no-ops.
    pub on_diagnostic: Option<Rc<dyn Fn(&Diagnostic)>>,
}

// ────────────────────────────────────────────────────────────────────────────
// Editor
// ────────────────────────────────────────────────────────────────────────────

pub struct FlowchartEditor {
    state: FlowchartState,
    history: UndoRedoManager,
    transform: PanZoom,
    bus: Rc<EventBus>,
    drag: NodeDragController,
    connection: ConnectionController,
    area_select: AreaSelectController,
    pan: PanController,
    summary: ChangeSummary,
    config: EditorConfig,
}

impl FlowchartEditor {
    pub fn new(name: impl Into<String>, chart: Chart, config: EditorConfig) -> Self {
        let history = UndoRedoManager::new(
            chart.clone(),
            config.max_history.unwrap_or(DEFAULT_MAX_HISTORY),
        );
        Self {
            state: FlowchartState {
                name: name.into(),
                chart,
                ui: UiState::default(),
            },
            history,
            transform: PanZoom::default(),
            bus: Rc::new(EventBus::new()),
            drag: NodeDragController::default(),
            connection: ConnectionController::new(config.allow_multiple_links_per_port),
            area_select: AreaSelectController::default(),
            pan: PanController::default(),
            summary: ChangeSummary::default(),
            config,
        }
    }

    pub fn state(&self) -> &FlowchartState {
        &self.state
    }

    pub fn chart(&self) -> &Chart {
        &self.state.chart
    }

    pub fn bus(&self) -> &Rc<EventBus> {
        &self.bus
    }

    pub fn transform(&self) -> &PanZoom {
        &self.transform
    }

    pub fn change_summary(&self) -> &ChangeSummary {
        &self.summary
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Run the configured node-properties check; `Ok` when no validator
    /// is installed.
    pub fn validate_node_properties(&self, properties: &PropertyBag) -> Result<(), String> {
        match &self.config.node_properties_validator {
            Some(validator) => match validator(properties) {
                Some(error) => Err(error),
                None => Ok(()),
            },
            None => Ok(()),
        }
    }

    pub fn validate_port_properties(&self, properties: &PropertyBag) -> Result<(), String> {
        match &self.config.port_properties_validator {
            Some(validator) => match validator(properties) {
                Some(error) => Err(error),
                None => Ok(()),
            },
            None => Ok(()),
        }
    }

    fn report(&self, diagnostic: &Diagnostic) {
        if let Some(cb) = &self.config.on_diagnostic {
            cb(diagnostic);
        }
    }

    fn emit_scale(&self) {
        self.bus.emit(&BusEvent::ScaleChanged {
            scale: self.transform.scale,
        });
    }

    /// Apply one action: chart actions go through the reducer and the
    /// history gate, the rest are handled here. Fires the change callback
    /// afterwards in every case.
    pub fn dispatch(&mut self, action: Action) {
        let kind = action.kind().to_string();
        self.summary.dispatches += 1;
        self.summary.last_action = Some(kind.clone());

        match &action {
            Action::Undo => {
                self.state.chart = self.history.undo().clone();
            }
            Action::Redo => {
                self.state.chart = self.history.redo().clone();
            }
            Action::NameChange { name } => {
                self.state.name = name.clone();
            }
            Action::PanChange { x, y } => {
                self.transform.x = *x;
                self.transform.y = *y;
            }
            Action::ZoomIn => {
                self.transform.zoom_in();
                self.emit_scale();
            }
            Action::ZoomOut => {
                self.transform.zoom_out();
                self.emit_scale();
            }
            Action::ZoomReset => {
                self.transform.zoom_reset();
                self.emit_scale();
            }
            Action::ToggleSidebar => {
                self.state.ui.sidebar_opened = !self.state.ui.sidebar_opened;
                self.bus.emit(&BusEvent::SidebarToggled {
                    opened: self.state.ui.sidebar_opened,
                });
            }
            Action::NodeSettings { id } => {
                self.state.ui.settings_node_id = Some(id.clone());
                if !self.state.ui.sidebar_opened {
                    self.state.ui.sidebar_opened = true;
                    self.bus.emit(&BusEvent::SidebarToggled { opened: true });
                }
            }
            _ => {
                let reduced = reduce(&self.state.chart, &action);
                if let Some(diagnostic) = &reduced.diagnostic {
                    self.report(diagnostic);
                }
                self.history.save(reduced.chart, &kind);
                self.state.chart = self.history.present().clone();
            }
        }

        if let Some(cb) = self.config.on_changed.clone() {
            cb(&self.state, &kind);
        }
    }

    // ── gesture plumbing ────────────────────────────────────────────────

    /// Pointer-down on a node. `selection_rects` are the measured screen
    /// rectangles of the current selection.
    pub fn begin_node_drag(
        &mut self,
        node_id: &str,
        pointer: Position,
        canvas_screen: Size,
        selection_rects: &IndexMap<String, Rect>,
        primary_button: bool,
    ) -> bool {
        self.drag.begin(
            &self.state.chart,
            node_id,
            pointer,
            canvas_screen,
            selection_rects,
            self.transform.scale,
            primary_button,
        )
    }

    /// Pointer motion during a node drag; returns the live visual
    /// position of the lead node.
    pub fn node_drag_motion(&mut self, pointer: Position, now: Instant) -> Option<Position> {
        self.drag.motion(&self.bus, pointer, now)
    }

    /// Pointer-up or pointer-cancel: commits the drag through the reducer.
    pub fn end_node_drag(&mut self, pointer: Position) {
        if let Some(stop) = self.drag.end(pointer) {
            self.dispatch(Action::DragNodeStop(stop));
        }
    }

    /// Pointer-down on a port glyph. The rubber band stays inside the
    /// controller; the dispatched action only announces the gesture to
    /// change listeners.
    pub fn begin_connection(&mut self, node_id: &str, port_id: &str) -> bool {
        let Some(node) = self.state.chart.nodes.get(node_id) else {
            return false;
        };
        let Some(port) = node.ports.get(port_id) else {
            return false;
        };
        let anchor = port_anchor(node, port);
        match self.connection.begin(&self.state.chart, node_id, port_id, anchor) {
            Some(start) => {
                self.dispatch(Action::StartConnection(start));
                true
            }
            None => false,
        }
    }

    pub fn connection_motion(&mut self, pointer: Position, now: Instant) {
        self.connection.motion(&self.bus, pointer, now);
    }

    /// Pointer-up: resolves the connection through the reducer and arms
    /// the delayed cleared signal.
    pub fn end_connection(&mut self, pointer: Position, now: Instant) {
        if let Some(end) = self.connection.end(pointer, now) {
            self.dispatch(Action::EndConnection(end));
        }
    }

    /// Host clock tick; drives the delayed connection-cleared signal.
    pub fn tick(&mut self, now: Instant) {
        self.connection.poll_clear(&self.bus, now);
    }

    pub fn begin_area_select(&mut self, at: Position, modifier_held: bool) -> bool {
        self.area_select.begin(at, modifier_held)
    }

    pub fn area_select_motion(&mut self, at: Position) {
        self.area_select.motion(at);
    }

    pub fn marquee(&self) -> Option<Rect> {
        self.area_select.marquee()
    }

    /// Pointer-up: replaces the selection map with the marquee result.
    pub fn end_area_select(&mut self) {
        if let Some(selection) = self.area_select.end(&self.state.chart) {
            self.dispatch(Action::AreaSelectionChanged { selection });
        }
    }

    pub fn begin_pan(&mut self, at: Position, modifier_held: bool) -> bool {
        self.pan.begin(at, modifier_held)
    }

    pub fn pan_motion(&mut self, at: Position) {
        self.pan.motion(&mut self.transform, at);
    }

    pub fn end_pan(&mut self) {
        self.pan.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::actions::EndConnection;
    use crate::model::{Link, LinkEndpoint, Node, Port};
    use std::cell::RefCell;

    fn two_node_chart() -> Chart {
        let mut chart = Chart::default();
        for (id, x, y) in [("A", 0.0, 0.0), ("B", 300.0, 300.0)] {
            chart.nodes.insert(
                id.to_string(),
                Node::new(id, id, Position::new(x, y))
                    .with_size(100.0, 50.0)
                    .with_port(Port::new("p1", 1)),
            );
        }
        chart
    }

    fn end_connection_into_b(from_node: &str) -> Action {
        Action::EndConnection(EndConnection {
            link: Link {
                id: format!("link-{from_node}"),
                from: LinkEndpoint::new(from_node, "p1"),
                to: String::new(),
                pos_to: Some(Position::new(320.0, 310.0)),
            },
            port_links: Vec::new(),
        })
    }

    #[test]
    fn test_dispatch_scenario_with_undo_redo() {
        let mut editor = FlowchartEditor::new("demo", two_node_chart(), EditorConfig::default());

        editor.dispatch(end_connection_into_b("A"));
        assert_eq!(editor.chart().paths.get("A-p1").map(String::as_str), Some("B"));
        let after_link = editor.chart().clone();

        // second incoming link into B is rejected without history churn
        editor.dispatch(end_connection_into_b("B"));
        assert_eq!(editor.chart(), &after_link);

        editor.dispatch(Action::DeleteNodes { ids: vec!["A".into()] });
        assert_eq!(editor.chart().nodes.len(), 1);
        assert!(editor.chart().links.is_empty());
        assert!(editor.chart().paths.is_empty());

        editor.dispatch(Action::Undo);
        assert_eq!(editor.chart(), &after_link);
        editor.dispatch(Action::Redo);
        assert_eq!(editor.chart().nodes.len(), 1);
        assert!(editor.can_undo());
        assert!(!editor.can_redo());
    }

    #[test]
    fn test_diagnostic_callback_observes_unknown_action() {
        let seen: Rc<RefCell<Vec<Diagnostic>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let config = EditorConfig {
            on_diagnostic: Some(Rc::new(move |d: &Diagnostic| sink.borrow_mut().push(d.clone()))),
            ..Default::default()
        };
        let mut editor = FlowchartEditor::new("demo", two_node_chart(), config);
        editor.dispatch(Action::Unknown {
            kind: "onTypo".into(),
        });
        assert_eq!(
            seen.borrow().as_slice(),
            &[Diagnostic::UnknownAction("onTypo".into())]
        );
        // the chart passed through, the dispatch still counted
        assert_eq!(editor.change_summary().dispatches, 1);
    }

    #[test]
    fn test_change_callback_fires_with_action_kind() {
        let kinds: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&kinds);
        let config = EditorConfig {
            on_changed: Some(Rc::new(move |_state: &FlowchartState, kind: &str| {
                sink.borrow_mut().push(kind.to_string());
            })),
            ..Default::default()
        };
        let mut editor = FlowchartEditor::new("demo", two_node_chart(), config);
        editor.dispatch(Action::NameChange {
            name: "renamed".into(),
        });
        editor.dispatch(Action::ZoomIn);
        assert_eq!(kinds.borrow().as_slice(), &["onNameChange", "onZoomIn"]);
        assert_eq!(editor.state().name, "renamed");
    }

    #[test]
    fn test_zoom_actions_update_transform_and_bus() {
        let mut editor = FlowchartEditor::new("demo", Chart::default(), EditorConfig::default());
        editor.dispatch(Action::ZoomIn);
        assert_eq!(editor.transform().scale, 1.25);
        assert_eq!(editor.bus().zoom_scale(), 1.25);
        editor.dispatch(Action::ZoomReset);
        assert_eq!(editor.transform().scale, 1.0);
    }

    #[test]
    fn test_node_settings_opens_sidebar() {
        let mut editor = FlowchartEditor::new("demo", two_node_chart(), EditorConfig::default());
        editor.dispatch(Action::NodeSettings { id: "A".into() });
        assert!(editor.state().ui.sidebar_opened);
        assert_eq!(editor.state().ui.settings_node_id.as_deref(), Some("A"));
        editor.dispatch(Action::ToggleSidebar);
        assert!(!editor.state().ui.sidebar_opened);
    }

    #[test]
    fn test_connection_gesture_end_to_end() {
        let mut editor = FlowchartEditor::new("demo", two_node_chart(), EditorConfig::default());
        assert!(editor.begin_connection("A", "p1"));
        // the rubber band never enters the chart while connecting
        assert!(editor.chart().links.is_empty());
        let t0 = Instant::now();
        editor.connection_motion(Position::new(200.0, 200.0), t0);
        editor.end_connection(Position::new(320.0, 310.0), t0);
        assert_eq!(editor.chart().links.len(), 1);
        let link = editor.chart().links.values().next().unwrap();
        assert_eq!(link.to, "B");

        // A's port now has an outgoing link: a second gesture is refused
        assert!(!editor.begin_connection("A", "p1"));
    }

    #[test]
    fn test_drag_gesture_commits_through_reducer() {
        let mut editor = FlowchartEditor::new("demo", two_node_chart(), EditorConfig::default());
        assert!(editor.begin_node_drag(
            "A",
            Position::new(0.0, 0.0),
            Size::new(1000.0, 800.0),
            &IndexMap::new(),
            true,
        ));
        editor.end_node_drag(Position::new(40.0, 30.0));
        assert_eq!(editor.chart().nodes["A"].position, Position::new(40.0, 30.0));
        assert!(editor.can_undo());
    }

    #[test]
    fn test_property_validators() {
        let config = EditorConfig {
            node_properties_validator: Some(Rc::new(|bag: &PropertyBag| {
                if bag.contains_key("forbidden") {
                    Some("forbidden key".to_string())
                } else {
                    None
                }
            })),
            ..Default::default()
        };
        let editor = FlowchartEditor::new("demo", Chart::default(), config);
        assert!(editor.validate_node_properties(&PropertyBag::new()).is_ok());
        let mut bad = PropertyBag::new();
        bad.insert("forbidden".into(), serde_json::Value::Null);
        assert_eq!(
            editor.validate_node_properties(&bad),
            Err("forbidden key".to_string())
        );
        assert!(editor.validate_port_properties(&bad).is_ok());
    }
}
