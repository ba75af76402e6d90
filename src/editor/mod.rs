//! Interactive flowchart editing core.
//!
//! This module builds the stateful editor on top of the plain chart model.
//! It provides:
//!
//! - **Actions**: the `{type, payload}` dispatch contract every mutation goes through
//! - **Reducer**: pure per-action chart transformations with silent no-op rejection
//! - **History**: bounded undo/redo snapshots gated by structural equality
//! - **Drag**: node drag gesture with multi-select rigid-body clamping
//! - **Connection**: port-to-node link gesture with a delayed cleared signal
//! - **Area select**: modifier-key marquee producing a replacement selection map
//! - **Pan/zoom**: bounded canvas transform shared by all pointer math
//! - **State**: the `FlowchartEditor` facade wiring all of the above together

pub mod actions;
pub mod area_select;
pub mod connection;
pub mod drag;
pub mod history;
pub mod pan_zoom;
pub mod reducer;
pub mod state;

pub use actions::{Action, DragNodeStop, EndConnection, NodeSizeObservation, StartConnection};
pub use area_select::AreaSelectController;
pub use connection::ConnectionController;
pub use drag::{follower_position, NodeDragController, Throttle};
pub use history::{UndoRedoManager, DEFAULT_MAX_HISTORY, HISTORY_ACTIONS};
pub use pan_zoom::{PanController, PanZoom};
pub use reducer::{reduce, Diagnostic, Reduced};
pub use state::{ChangeSummary, EditorConfig, FlowchartEditor, FlowchartState, UiState};
