use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use rustyflow::bus::{BusEvent, Topic};
use rustyflow::editor::{follower_position, Action, EditorConfig, FlowchartEditor};
use rustyflow::geometry::Rect;
use rustyflow::model::{Chart, Node, Port, Position, Size};

fn make_chart() -> Chart {
    let mut chart = Chart::new();
    for (id, x, y) in [("A", 100.0, 100.0), ("B", 300.0, 200.0)] {
        chart.nodes.insert(
            id.to_string(),
            Node::new(id, id, Position::new(x, y))
                .with_size(100.0, 50.0)
                .with_port(Port::new("p1", 1)),
        );
    }
    chart
}

fn screen_rects(chart: &Chart) -> IndexMap<String, Rect> {
    chart
        .nodes
        .values()
        .map(|n| {
            (
                n.id.clone(),
                Rect::from_position_size(n.position, n.size_or_zero()),
            )
        })
        .collect()
}

#[test]
fn multi_select_drag_keeps_group_rigid() {
    let mut chart = make_chart();
    chart.selected.insert("A".to_string(), true);
    chart.selected.insert("B".to_string(), true);
    let rects = screen_rects(&chart);
    let mut editor = FlowchartEditor::new("drag", chart, EditorConfig::default());

    let canvas = Size::new(1000.0, 800.0);
    assert!(editor.begin_node_drag("A", Position::new(150.0, 125.0), canvas, &rects, true));

    // live broadcasts drive follower nodes without touching the chart
    let followers = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&followers);
    editor.bus().subscribe(Topic::NodeDrag, move |evt| {
        if let BusEvent::NodeDrag(broadcast) = evt {
            if let Some(pos) = follower_position(
                broadcast,
                "B",
                Position::new(300.0, 200.0),
                Size::new(100.0, 50.0),
            ) {
                sink.borrow_mut().push(pos);
            }
        }
    });
    let t0 = Instant::now();
    editor.node_drag_motion(Position::new(170.0, 135.0), t0);
    assert_eq!(editor.chart().nodes["A"].position, Position::new(100.0, 100.0));
    assert_eq!(followers.borrow().as_slice(), &[Position::new(320.0, 210.0)]);

    // release far to the left: the selection box edge, not A's own edge,
    // hits the canvas boundary (A sits on the box's left edge, offset 0)
    editor.end_node_drag(Position::new(-1e6, 125.0));
    let a = editor.chart().nodes["A"].position;
    let b = editor.chart().nodes["B"].position;
    assert_eq!(a, Position::new(0.0, 100.0));
    assert_eq!(b.x - a.x, 200.0, "relative layout preserved");
    assert!(editor.can_undo());
}

#[test]
fn connection_gesture_lands_and_clears() {
    let mut editor = FlowchartEditor::new("connect", make_chart(), EditorConfig::default());
    let cleared = Rc::new(RefCell::new(0u32));
    let sink = Rc::clone(&cleared);
    editor.bus().subscribe(Topic::ConnectionCleared, move |_| {
        *sink.borrow_mut() += 1;
    });

    assert!(editor.begin_connection("A", "p1"));
    let t0 = Instant::now();
    editor.connection_motion(Position::new(250.0, 180.0), t0);
    editor.end_connection(Position::new(320.0, 210.0), t0);

    let link = editor.chart().links.values().next().unwrap();
    assert_eq!(link.to, "B");
    assert_eq!(editor.chart().paths.get("A-p1").map(String::as_str), Some("B"));

    // the cleared signal waits for the race-guard deadline
    editor.tick(t0 + Duration::from_millis(10));
    assert_eq!(*cleared.borrow(), 0);
    editor.tick(t0 + Duration::from_millis(100));
    assert_eq!(*cleared.borrow(), 1);
}

#[test]
fn missed_connection_gesture_leaves_chart_and_history_untouched() {
    let mut editor = FlowchartEditor::new("miss", make_chart(), EditorConfig::default());
    let before = editor.chart().clone();

    assert!(editor.begin_connection("A", "p1"));
    let t0 = Instant::now();
    editor.connection_motion(Position::new(-200.0, -200.0), t0);
    // release over empty canvas: the attempted link is discarded
    editor.end_connection(Position::new(-500.0, -500.0), t0);

    assert_eq!(editor.chart(), &before);
    assert!(!editor.can_undo(), "a discarded link must not be undoable");
    editor.chart().validate().unwrap();
}

#[test]
fn undo_after_connection_restores_pre_gesture_chart() {
    let mut editor = FlowchartEditor::new("undo", make_chart(), EditorConfig::default());
    let before = editor.chart().clone();

    assert!(editor.begin_connection("A", "p1"));
    let t0 = Instant::now();
    editor.end_connection(Position::new(320.0, 210.0), t0);
    assert_eq!(editor.chart().links.len(), 1);
    let committed = editor.chart().clone();
    committed.validate().unwrap();

    // undo must reach the chart as it was before the gesture started,
    // with no in-progress link and consistent paths
    editor.dispatch(Action::Undo);
    assert_eq!(editor.chart(), &before);
    assert!(editor.chart().links.values().all(|l| !l.is_in_progress()));
    editor.chart().validate().unwrap();

    editor.dispatch(Action::Redo);
    assert_eq!(editor.chart(), &committed);
}

#[test]
fn marquee_selection_then_exclusive_replacement() {
    let mut chart = make_chart();
    chart.selected.insert("B".to_string(), true);
    let mut editor = FlowchartEditor::new("marquee", chart, EditorConfig::default());

    // marquee over A only; B loses its flag because the map is replaced
    assert!(editor.begin_area_select(Position::new(50.0, 50.0), true));
    editor.area_select_motion(Position::new(150.0, 150.0));
    assert!(editor.marquee().is_some());
    editor.end_area_select();

    assert_eq!(editor.chart().selected.get("A"), Some(&true));
    assert_eq!(editor.chart().selected.get("B"), Some(&false));
}

#[test]
fn pan_and_zoom_drive_pointer_math() {
    let mut editor = FlowchartEditor::new("panzoom", make_chart(), EditorConfig::default());

    // modifier held: marquee wins, pan refuses
    assert!(!editor.begin_pan(Position::new(0.0, 0.0), true));
    assert!(editor.begin_pan(Position::new(0.0, 0.0), false));
    editor.pan_motion(Position::new(30.0, 40.0));
    editor.end_pan();
    assert_eq!((editor.transform().x, editor.transform().y), (30.0, 40.0));

    editor.dispatch(Action::ZoomIn);
    editor.dispatch(Action::ZoomIn);
    assert_eq!(editor.transform().scale, 1.5);
    assert_eq!(editor.bus().zoom_scale(), 1.5);

    let canvas_point = editor.transform().screen_to_canvas(Position::new(180.0, 190.0));
    assert_eq!(canvas_point, Position::new(100.0, 100.0));

    editor.dispatch(Action::ZoomReset);
    assert_eq!(editor.transform().scale, 1.0);
    assert_eq!((editor.transform().x, editor.transform().y), (0.0, 0.0));
}
