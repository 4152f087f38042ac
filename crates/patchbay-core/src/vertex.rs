//! Vertices and their ports.
//!
//! A [`Vertex`] owns two ordered port lists, one per [`Direction`]. Port
//! order is meaningful: it drives positional pairing at component bridges
//! and the input numbering of simulated gates. A [`Port`] optionally
//! references the edge it is connected to; that reference is the only
//! authoritative record of connectivity (links are derived from it).

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{EdgeId, PortId};

/// Port direction relative to its vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Direction::In => Direction::Out,
            Direction::Out => Direction::In,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => write!(f, "in"),
            Direction::Out => write!(f, "out"),
        }
    }
}

/// A named, directed, typed attachment point on a vertex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    /// Unique within the owning vertex.
    pub id: PortId,
    pub label: String,
    pub direction: Direction,
    /// Edge type tag; a port only ever connects to an edge of the same type.
    #[serde(rename = "type")]
    pub ty: String,
    /// The edge this port is connected to, absent when unconnected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge_id: Option<EdgeId>,
}

impl Port {
    /// Creates an unconnected port.
    pub fn new(
        id: impl Into<PortId>,
        label: impl Into<String>,
        direction: Direction,
        ty: impl Into<String>,
    ) -> Self {
        Port {
            id: id.into(),
            label: label.into(),
            direction,
            ty: ty.into(),
            edge_id: None,
        }
    }
}

/// Ordered ports partitioned by direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Ports {
    #[serde(default)]
    pub inbound: SmallVec<[Port; 2]>,
    #[serde(default)]
    pub outbound: SmallVec<[Port; 2]>,
}

/// A graph node representing an operation, gate, or component instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Operation kind (`AND`, `NOT`, `PROBE b`, a component name, ...).
    pub label: String,
    pub ports: Ports,
    /// Free-form display metadata. Round-tripped, never interpreted.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub display: serde_json::Map<String, serde_json::Value>,
}

impl Vertex {
    pub fn new(label: impl Into<String>) -> Self {
        Vertex {
            label: label.into(),
            ports: Ports::default(),
            display: serde_json::Map::new(),
        }
    }

    /// Appends `port` to the list matching its direction. Builder-style.
    pub fn with_port(mut self, port: Port) -> Self {
        self.push_port(port);
        self
    }

    /// Appends `port` to the list matching its direction.
    pub fn push_port(&mut self, port: Port) {
        match port.direction {
            Direction::In => self.ports.inbound.push(port),
            Direction::Out => self.ports.outbound.push(port),
        }
    }

    /// Looks a port up by id, searching inbound then outbound.
    pub fn port(&self, id: &PortId) -> Option<&Port> {
        self.all_ports().find(|p| &p.id == id)
    }

    pub fn port_mut(&mut self, id: &PortId) -> Option<&mut Port> {
        self.ports
            .inbound
            .iter_mut()
            .chain(self.ports.outbound.iter_mut())
            .find(|p| &p.id == id)
    }

    /// All ports in stable order: inbound first, then outbound.
    pub fn all_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.inbound.iter().chain(self.ports.outbound.iter())
    }

    pub fn port_count(&self) -> usize {
        self.ports.inbound.len() + self.ports.outbound.len()
    }
}
