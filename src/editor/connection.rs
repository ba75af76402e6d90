//! Link-connection gesture: Idle → Connecting → Idle.
//!
//! Pointer-down on a port creates a rubber-band link following the cursor;
//! release hands an [`EndConnection`] payload to the reducer, which applies
//! the validity rules. The "connection cleared" signal is deliberately
//! delayed by a short deadline so the release is fully processed before the
//! next press can start, which would otherwise leave a stray duplicate line.

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::bus::{BusEvent, ConnectionDragBroadcast, EventBus};
use crate::model::{Chart, Link, LinkEndpoint, Position};

use super::actions::{EndConnection, StartConnection};
use super::drag::{Throttle, FRAME_INTERVAL};

/// Delay between release and the cleared signal.
pub const CLEAR_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
struct ConnectingState {
    link: Link,
    /// Committed links already leaving the origin port, captured at
    /// gesture start for the reducer's one-per-port check.
    port_links: Vec<Link>,
}

/// State machine for one connection gesture at a time.
#[derive(Debug)]
pub struct ConnectionController {
    state: Option<ConnectingState>,
    clear_deadline: Option<Instant>,
    throttle: Throttle,
    allow_multiple_links_per_port: bool,
}

impl Default for ConnectionController {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ConnectionController {
    pub fn new(allow_multiple_links_per_port: bool) -> Self {
        Self {
            state: None,
            clear_deadline: None,
            throttle: Throttle::new(FRAME_INTERVAL),
            allow_multiple_links_per_port,
        }
    }

    pub fn is_connecting(&self) -> bool {
        self.state.is_some()
    }

    /// The rubber-band link, while the gesture is live.
    pub fn live_link(&self) -> Option<&Link> {
        self.state.as_ref().map(|s| &s.link)
    }

    /// Enter the gesture on pointer-down over a port. An occupied port
    /// refuses new attempts unless multiple links per port are allowed.
    /// Returns the action registering the rubber band.
    pub fn begin(
        &mut self,
        chart: &Chart,
        node_id: &str,
        port_id: &str,
        anchor: Position,
    ) -> Option<StartConnection> {
        if self.state.is_some() {
            return None;
        }
        let port_links: Vec<Link> = chart
            .port_links(node_id, port_id)
            .into_iter()
            .filter(|link| !link.is_in_progress())
            .collect();
        if !port_links.is_empty() && !self.allow_multiple_links_per_port {
            return None;
        }

        let link = Link {
            id: Uuid::new_v4().to_string(),
            from: LinkEndpoint::new(node_id, port_id),
            to: String::new(),
            pos_to: Some(anchor),
        };
        self.throttle.reset();
        self.state = Some(ConnectingState {
            link: link.clone(),
            port_links,
        });
        Some(StartConnection { new_link: link })
    }

    /// Pointer motion in canvas units. Broadcasts the rubber band at frame
    /// cadence so the rendering layer can draw it.
    pub fn motion(&mut self, bus: &EventBus, pointer: Position, now: Instant) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if !self.throttle.ready(now) {
            return;
        }
        state.link.pos_to = Some(pointer);
        bus.emit(&BusEvent::ConnectionDrag(ConnectionDragBroadcast {
            link: state.link.clone(),
        }));
    }

    /// Exit on pointer-up or pointer-cancel. Returns the resolve payload
    /// and arms the clear deadline; the gesture always clears, whether or
    /// not the link lands.
    pub fn end(&mut self, pointer: Position, now: Instant) -> Option<EndConnection> {
        let mut state = self.state.take()?;
        state.link.pos_to = Some(pointer);
        self.clear_deadline = Some(now + CLEAR_DELAY);
        Some(EndConnection {
            link: state.link,
            port_links: state.port_links,
        })
    }

    /// Host-driven clock tick. Once the deadline has passed, emits the
    /// cleared signal exactly once and returns true.
    pub fn poll_clear(&mut self, bus: &EventBus, now: Instant) -> bool {
        match self.clear_deadline {
            Some(deadline) if now >= deadline => {
                self.clear_deadline = None;
                bus.emit(&BusEvent::ConnectionCleared);
                true
            }
            _ => false,
        }
    }
}
