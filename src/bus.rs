//! Per-editor publish/subscribe channel.
//!
//! Interaction controllers broadcast ephemeral gesture data (live drag
//! positions, rubber-band links, resize observations) here so presentational
//! collaborators and co-selected nodes can react without a reducer round
//! trip. One bus is created per editor instance and passed by reference —
//! it is deliberately not a process-wide global.
//!
//! The bus is single-threaded (`Rc`/`RefCell`), matching the cooperative
//! event-driven model of the core. Callbacks are cloned out of the registry
//! before being invoked, so a callback may emit or (un)subscribe without
//! tripping a borrow.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::geometry::SelectionOffsets;
use crate::model::{Link, Position, Size};

// ────────────────────────────────────────────────────────────────────────────
// Events and topics
// ────────────────────────────────────────────────────────────────────────────

/// Live node-drag broadcast, emitted at animation-frame cadence while a
/// drag gesture is in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDragBroadcast {
    /// The lead node (the one grabbed by the pointer).
    pub id: String,
    /// Clamped candidate position of the lead node, canvas units.
    pub position: Position,
    /// Translation since the previous broadcast.
    pub delta: Position,
    /// Canvas size in unscaled units.
    pub canvas_size: Size,
    /// Per-node offsets of every selected node, for follower clamping.
    pub offsets: IndexMap<String, SelectionOffsets>,
    /// True when the lead node is part of a multi-selection.
    pub multi: bool,
}

/// Rubber-band link broadcast while a connection gesture is in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionDragBroadcast {
    pub link: Link,
}

/// Everything that can travel over the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum BusEvent {
    NodeDrag(NodeDragBroadcast),
    ConnectionDrag(ConnectionDragBroadcast),
    /// The connection gesture ended (successfully or not); rubber bands
    /// must be removed.
    ConnectionCleared,
    LinkHighlight { link_id: String, on: bool },
    SidebarToggled { opened: bool },
    ScaleChanged { scale: f64 },
    /// Element-resize observation stream from the rendering layer.
    NodeResized { id: String, width: f64, height: f64 },
}

/// Subscription key: one topic per event variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    NodeDrag,
    ConnectionDrag,
    ConnectionCleared,
    LinkHighlight,
    SidebarToggled,
    ScaleChanged,
    NodeResized,
}

impl BusEvent {
    pub fn topic(&self) -> Topic {
        match self {
            BusEvent::NodeDrag(_) => Topic::NodeDrag,
            BusEvent::ConnectionDrag(_) => Topic::ConnectionDrag,
            BusEvent::ConnectionCleared => Topic::ConnectionCleared,
            BusEvent::LinkHighlight { .. } => Topic::LinkHighlight,
            BusEvent::SidebarToggled { .. } => Topic::SidebarToggled,
            BusEvent::ScaleChanged { .. } => Topic::ScaleChanged,
            BusEvent::NodeResized { .. } => Topic::NodeResized,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// EventBus
// ────────────────────────────────────────────────────────────────────────────

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type Callback = Rc<dyn Fn(&BusEvent)>;

struct Subscriber {
    id: u64,
    topic: Topic,
    callback: Callback,
}

/// In-memory topic router decoupling interaction controllers from the
/// reducer dispatch and from presentational collaborators.
pub struct EventBus {
    subscribers: RefCell<Vec<Subscriber>>,
    next_id: Cell<u64>,
    /// The active zoom scale, stored here so every controller divides
    /// pointer deltas by the same value.
    scale: Cell<f64>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            scale: Cell::new(1.0),
        }
    }

    /// Register a callback for one topic.
    pub fn subscribe(&self, topic: Topic, callback: impl Fn(&BusEvent) + 'static) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.subscribers.borrow_mut().push(Subscriber {
            id,
            topic,
            callback: Rc::new(callback),
        });
        Subscription(id)
    }

    /// Remove a subscription; unknown handles are ignored.
    pub fn unsubscribe(&self, subscription: Subscription) {
        self.subscribers
            .borrow_mut()
            .retain(|s| s.id != subscription.0);
    }

    /// Deliver an event to every subscriber of its topic, in subscription
    /// order.
    pub fn emit(&self, event: &BusEvent) {
        if let BusEvent::ScaleChanged { scale } = event {
            self.scale.set(*scale);
        }
        let topic = event.topic();
        let callbacks: Vec<Callback> = self
            .subscribers
            .borrow()
            .iter()
            .filter(|s| s.topic == topic)
            .map(|s| Rc::clone(&s.callback))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    /// The last zoom scale stored via [`BusEvent::ScaleChanged`].
    pub fn zoom_scale(&self) -> f64 {
        self.scale.get()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}
