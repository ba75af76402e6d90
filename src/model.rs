use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// ChartDoc – JSON document wrapper
// ────────────────────────────────────────────────────────────────────────────

/// A chart plus its display name, as persisted by host applications.
///
/// The wire shape is plain camelCase JSON so documents produced by other
/// flowchart tooling round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDoc {
    pub name: String,
    pub chart: Chart,
}

impl ChartDoc {
    /// Save the document as pretty-printed JSON.
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Load a document from a JSON file.
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let doc: ChartDoc = serde_json::from_reader(reader)?;
        Ok(doc)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry value types
// ────────────────────────────────────────────────────────────────────────────

/// A point in continuous canvas coordinates (unscaled, pre-zoom units).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A measured width/height pair in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub w: f64,
    pub h: f64,
}

impl Size {
    pub fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }
}

/// Open-ended key/value bag attached to nodes, ports and charts.
///
/// Values are opaque to the core; external property panels edit them after
/// consulting the caller-supplied validators.
pub type PropertyBag = IndexMap<String, Value>;

// ────────────────────────────────────────────────────────────────────────────
// Port
// ────────────────────────────────────────────────────────────────────────────

/// An outgoing connection point on a node.
///
/// `index` determines the vertical stacking order: higher indices anchor
/// closer to the node's top edge. Indices need not be contiguous; ties are
/// broken by insertion order of the node's `ports` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub id: String,
    #[serde(default)]
    pub bg_color: String,
    #[serde(default)]
    pub text: String,
    pub index: i64,
    #[serde(default)]
    pub properties: PropertyBag,
}

impl Port {
    pub fn new(id: impl Into<String>, index: i64) -> Self {
        Self {
            id: id.into(),
            bg_color: String::new(),
            text: String::new(),
            index,
            properties: PropertyBag::new(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Node
// ────────────────────────────────────────────────────────────────────────────

/// A node on the canvas.
///
/// `id` is immutable once created and unique within the chart. `size` is
/// measured by the rendering layer and reported back through
/// `onNodeSizeChanged`; nodes that have never been measured carry `None` and
/// hit-test as an empty rectangle. `extra` preserves arbitrary fields owned
/// by external renderers (node "type" keys, icons, …).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    /// Opaque payload rendered by the host (e.g. markdown text).
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub properties: PropertyBag,
    #[serde(default)]
    pub ports: IndexMap<String, Port>,
    /// Nodes with this flag are silently skipped by delete operations.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub prevent_removal: bool,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, title: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            position,
            size: None,
            content: String::new(),
            properties: PropertyBag::new(),
            ports: IndexMap::new(),
            prevent_removal: false,
            extra: IndexMap::new(),
        }
    }

    /// Builder-style helper used heavily in tests and demo charts.
    pub fn with_size(mut self, w: f64, h: f64) -> Self {
        self.size = Some(Size::new(w, h));
        self
    }

    pub fn with_port(mut self, port: Port) -> Self {
        self.ports.insert(port.id.clone(), port);
        self
    }

    /// The node's measured size, falling back to an empty rectangle when the
    /// rendering layer has not reported one yet.
    pub fn size_or_zero(&self) -> Size {
        self.size.unwrap_or_default()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Link
// ────────────────────────────────────────────────────────────────────────────

/// The origin of a link: a specific port on a specific node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkEndpoint {
    pub node_id: String,
    pub port_id: String,
}

impl LinkEndpoint {
    pub fn new(node_id: impl Into<String>, port_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            port_id: port_id.into(),
        }
    }
}

/// A directed connection from a port to a target node.
///
/// While a connection gesture is in progress, `to` is empty and `pos_to`
/// carries the live cursor position (the rubber-band endpoint). Committed
/// links have a non-empty `to` and no `pos_to`. A link whose `from.node_id`
/// equals `to` is a valid self-loop, rendered as a cycle marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: String,
    pub from: LinkEndpoint,
    #[serde(default)]
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pos_to: Option<Position>,
}

impl Link {
    /// Key under which this link's connectivity is recorded in `Chart::paths`.
    pub fn path_key(&self) -> String {
        format!("{}-{}", self.from.node_id, self.from.port_id)
    }

    /// True while the link is being dragged and has no resolved target.
    pub fn is_in_progress(&self) -> bool {
        self.to.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Chart
// ────────────────────────────────────────────────────────────────────────────

/// The normalized graph value: single source of truth for the diagram.
///
/// `selected` maps node ids to selection flags; absent ids are unselected.
/// `paths` is derived from `links` (see [`chart_paths`]) and must be
/// recomputed whenever `links` changes, never mutated independently.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub nodes: IndexMap<String, Node>,
    #[serde(default)]
    pub links: IndexMap<String, Link>,
    #[serde(default)]
    pub selected: IndexMap<String, bool>,
    #[serde(default)]
    pub paths: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "PropertyBag::is_empty")]
    pub properties: PropertyBag,
}

/// Derive the `"{fromNodeId}-{fromPortId}" → toNodeId` connectivity index
/// from a link map. Pure and deterministic: recomputing from the same links
/// always yields the same map.
pub fn chart_paths(links: &IndexMap<String, Link>) -> IndexMap<String, String> {
    links
        .values()
        .map(|link| (link.path_key(), link.to.clone()))
        .collect()
}

impl Chart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the derived `paths` index from the current links.
    pub fn rebuild_paths(&mut self) {
        self.paths = chart_paths(&self.links);
    }

    /// Ids of currently selected nodes.
    pub fn selected_ids(&self) -> Vec<String> {
        self.selected
            .iter()
            .filter(|&(_, &on)| on)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// All links originating from one port of one node.
    pub fn port_links(&self, node_id: &str, port_id: &str) -> Vec<Link> {
        self.links
            .values()
            .filter(|l| l.from.node_id == node_id && l.from.port_id == port_id)
            .cloned()
            .collect()
    }

    /// True if some committed link already targets `node_id`.
    pub fn has_incoming_link(&self, node_id: &str) -> bool {
        self.links.values().any(|l| l.to == node_id)
    }

    /// Check structural consistency of the chart value.
    ///
    /// The reducer preserves these properties by construction; this is the
    /// boundary check run on caller-supplied initial charts and by the CLI.
    pub fn validate(&self) -> Result<(), ChartError> {
        for (key, node) in &self.nodes {
            if key != &node.id {
                return Err(ChartError::NodeKeyMismatch {
                    key: key.clone(),
                    id: node.id.clone(),
                });
            }
            for (port_key, port) in &node.ports {
                if port_key != &port.id {
                    return Err(ChartError::PortKeyMismatch {
                        node_id: node.id.clone(),
                        key: port_key.clone(),
                        id: port.id.clone(),
                    });
                }
            }
        }

        let mut incoming: IndexMap<&str, &str> = IndexMap::new();
        for link in self.links.values() {
            let from_node = self.nodes.get(&link.from.node_id).ok_or_else(|| {
                ChartError::UnknownLinkSource {
                    link_id: link.id.clone(),
                    node_id: link.from.node_id.clone(),
                }
            })?;
            if !from_node.ports.contains_key(&link.from.port_id) {
                return Err(ChartError::UnknownSourcePort {
                    link_id: link.id.clone(),
                    node_id: link.from.node_id.clone(),
                    port_id: link.from.port_id.clone(),
                });
            }
            if !link.is_in_progress() {
                if !self.nodes.contains_key(&link.to) {
                    return Err(ChartError::UnknownLinkTarget {
                        link_id: link.id.clone(),
                        node_id: link.to.clone(),
                    });
                }
                if let Some(other) = incoming.insert(link.to.as_str(), link.id.as_str()) {
                    return Err(ChartError::MultipleIncomingLinks {
                        node_id: link.to.clone(),
                        link_a: other.to_string(),
                        link_b: link.id.clone(),
                    });
                }
            }
        }

        if self.paths != chart_paths(&self.links) {
            return Err(ChartError::StalePaths);
        }

        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Structural problems in a chart document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartError {
    #[error("node map key '{key}' does not match node id '{id}'")]
    NodeKeyMismatch { key: String, id: String },
    #[error("port map key '{key}' on node '{node_id}' does not match port id '{id}'")]
    PortKeyMismatch {
        node_id: String,
        key: String,
        id: String,
    },
    #[error("link '{link_id}' originates from unknown node '{node_id}'")]
    UnknownLinkSource { link_id: String, node_id: String },
    #[error("link '{link_id}' originates from unknown port '{node_id}.{port_id}'")]
    UnknownSourcePort {
        link_id: String,
        node_id: String,
        port_id: String,
    },
    #[error("link '{link_id}' targets unknown node '{node_id}'")]
    UnknownLinkTarget { link_id: String, node_id: String },
    #[error("node '{node_id}' has multiple incoming links ('{link_a}', '{link_b}')")]
    MultipleIncomingLinks {
        node_id: String,
        link_a: String,
        link_b: String,
    },
    #[error("derived paths index is out of sync with links")]
    StalePaths,
}
