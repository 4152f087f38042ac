//! The circuit document: vertices and edges keyed by id.
//!
//! [`Circuit`] is the authoritative model. It holds insertion-ordered maps
//! of [`Vertex`] and [`Edge`] and nothing else -- link records are derived
//! state owned by the link index, and layout is an external UI document
//! ([`Layout`]) the core tolerates but never interprets.
//!
//! The mutating methods here are primitives. Editing sessions must go
//! through the operation layer (`edit` + `history`), which records inverses
//! for undo; calling the primitives directly is reserved for document
//! construction (fixtures, deserialization, flattening output).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::edge::Edge;
use crate::error::GraphError;
use crate::id::{EdgeId, PortId, VertexId};
use crate::vertex::{Port, Vertex};

/// Addresses one port on one vertex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub vertex: VertexId,
    pub port: PortId,
}

impl PortRef {
    pub fn new(vertex: impl Into<VertexId>, port: impl Into<PortId>) -> Self {
        PortRef {
            vertex: vertex.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.vertex, self.port)
    }
}

// ---------------------------------------------------------------------------
// Circuit
// ---------------------------------------------------------------------------

/// A directed multigraph document: operations (vertices) wired together by
/// typed hyperedges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Circuit {
    pub vertices: IndexMap<VertexId, Vertex>,
    pub edges: IndexMap<EdgeId, Edge>,
}

impl Circuit {
    pub fn new() -> Self {
        Circuit::default()
    }

    // -- read access --------------------------------------------------------

    pub fn vertex(&self, id: &VertexId) -> Option<&Vertex> {
        self.vertices.get(id)
    }

    pub fn vertex_mut(&mut self, id: &VertexId) -> Option<&mut Vertex> {
        self.vertices.get_mut(id)
    }

    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.get(id)
    }

    pub fn port(&self, port: &PortRef) -> Option<&Port> {
        self.vertices.get(&port.vertex)?.port(&port.port)
    }

    pub fn port_mut(&mut self, port: &PortRef) -> Option<&mut Port> {
        self.vertex_mut(&port.vertex)?.port_mut(&port.port)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All ports currently referencing `edge`, with their addresses, in
    /// vertex insertion order.
    pub fn ports_on_edge<'a>(
        &'a self,
        edge: &'a EdgeId,
    ) -> impl Iterator<Item = (PortRef, &'a Port)> + 'a {
        self.vertices.iter().flat_map(move |(vid, vertex)| {
            vertex
                .all_ports()
                .filter(move |port| port.edge_id.as_ref() == Some(edge))
                .map(move |port| (PortRef::new(vid.clone(), port.id.clone()), port))
        })
    }

    // -- primitive mutation -------------------------------------------------

    pub fn insert_vertex(&mut self, id: VertexId, vertex: Vertex) -> Result<(), GraphError> {
        if self.vertices.contains_key(&id) {
            return Err(GraphError::DuplicateVertex { id });
        }
        self.vertices.insert(id, vertex);
        Ok(())
    }

    pub fn remove_vertex(&mut self, id: &VertexId) -> Result<Vertex, GraphError> {
        self.vertices
            .shift_remove(id)
            .ok_or_else(|| GraphError::VertexNotFound { id: id.clone() })
    }

    pub fn insert_edge(&mut self, id: EdgeId, edge: Edge) -> Result<(), GraphError> {
        if self.edges.contains_key(&id) {
            return Err(GraphError::DuplicateEdge { id });
        }
        self.edges.insert(id, edge);
        Ok(())
    }

    pub fn remove_edge(&mut self, id: &EdgeId) -> Result<Edge, GraphError> {
        self.edges
            .shift_remove(id)
            .ok_or_else(|| GraphError::EdgeNotFound { id: id.clone() })
    }

    // -- id allocation ------------------------------------------------------

    /// First free `{base}{n}` vertex id, n counting from 1.
    pub fn alloc_vertex_id(&self, base: &str) -> VertexId {
        let mut n = 1u64;
        loop {
            let candidate = VertexId(format!("{base}{n}"));
            if !self.vertices.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// First free `{ty}{n}` edge id -- edge ids are derived from the
    /// connecting type (`WIRE1`, `WIRE2`, ...).
    pub fn alloc_edge_id(&self, ty: &str) -> EdgeId {
        let mut n = 1u64;
        loop {
            let candidate = EdgeId(format!("{ty}{n}"));
            if !self.edges.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    // -- consistency --------------------------------------------------------

    /// Verifies the document invariants: every port edge reference names an
    /// existing edge of the port's own type, and every edge is referenced by
    /// at least one port. Violations indicate corruption (mutation that
    /// bypassed the operation layer), not user error.
    pub fn verify_consistency(&self) -> Result<(), GraphError> {
        for (vid, vertex) in &self.vertices {
            for port in vertex.all_ports() {
                if let Some(edge_id) = &port.edge_id {
                    let edge = self.edges.get(edge_id).ok_or_else(|| {
                        GraphError::Inconsistency {
                            reason: format!(
                                "port {vid}:{} references missing edge '{edge_id}'",
                                port.id
                            ),
                        }
                    })?;
                    if edge.ty != port.ty {
                        return Err(GraphError::Inconsistency {
                            reason: format!(
                                "port {vid}:{} of type '{}' references edge '{edge_id}' of type '{}'",
                                port.id, port.ty, edge.ty
                            ),
                        });
                    }
                }
            }
        }
        for edge_id in self.edges.keys() {
            if self.ports_on_edge(edge_id).next().is_none() {
                return Err(GraphError::Inconsistency {
                    reason: format!("edge '{edge_id}' is referenced by no port"),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Layout (external UI document)
// ---------------------------------------------------------------------------

/// A coordinate pair supplied by an external layout provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub left: f64,
    pub top: f64,
}

/// Vertex/edge id to position. Partial coverage is expected: entities
/// created by edit operations have no entry until a provider adds one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Layout(pub IndexMap<String, Position>);

impl Layout {
    pub fn position(&self, id: &str) -> Option<Position> {
        self.0.get(id).copied()
    }
}
