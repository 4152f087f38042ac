//! Connection planners: connect, disconnect, cut, and the delete
//! operations.
//!
//! Every function here is deferred -- it reads the workbench, validates,
//! and returns an [`EditOp`] without mutating anything. The caller applies
//! the operation (usually through a `History`), and the same value undoes
//! it. Invalid requests return a [`Rejection`] instead of an operation;
//! [`or_noop`] adapts that to the permissive style where a rejected edit
//! is simply an empty operation.
//!
//! Planning works against an overlay: while a planner composes steps it
//! tracks the port references, links, and edges those steps will have
//! changed, so a single operation can disconnect, evict, and reconnect
//! coherently. Plans assume a single writer -- an operation planned against
//! a workbench that changes before the plan is applied fails cleanly at
//! apply time rather than corrupting the document.
//!
//! Connection rules, by endpoint shape:
//! - port to port: types must match and directions must differ. A port
//!   already holding a connection is disconnected first unless its type is
//!   simple with a cardinality cap of 1 on its side, in which case it keeps
//!   its edge and the counterpart joins it (point-to-point replacement
//!   happens by eviction instead). With neither port connected a fresh
//!   edge is created, materializing one direct link for simple types or a
//!   link per port through the edge node otherwise.
//! - port to edge: types must match; joining an edge at its cardinality
//!   cap for the port's side first cuts the oldest links on that side, in
//!   edge-link iteration order, until the new connection fits.
//! - edge to edge: always rejected.
//!
//! Undoing a connect that created an edge removes the edge and its links
//! entirely; undoing a join removes only the links the join added.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use thiserror::Error;

use crate::circuit::PortRef;
use crate::edge::Edge;
use crate::id::{EdgeId, LinkId, PortId, VertexId};
use crate::link::{Endpoint, Link};
use crate::op::{EditOp, EditStep};
use crate::types::TypeConfig;
use crate::vertex::{Direction, Port, Vertex};
use crate::workbench::Workbench;

/// Why a requested edit was not turned into an operation. A rejection
/// guarantees nothing was planned and nothing will mutate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("vertex not found: '{id}'")]
    MissingVertex { id: VertexId },
    #[error("port not found: '{vertex}:{port}'")]
    MissingPort { vertex: VertexId, port: PortId },
    #[error("edge not found: '{id}'")]
    MissingEdge { id: EdgeId },
    #[error("link not found: LinkId({id})")]
    MissingLink { id: LinkId },
    #[error("connection types differ: '{first}' vs '{second}'")]
    TypeMismatch { first: String, second: String },
    #[error("both ports face '{direction}'")]
    DirectionConflict { direction: Direction },
    #[error("cannot connect an edge to an edge")]
    EdgeToEdge,
    #[error("already connected through edge '{edge}'")]
    AlreadyConnected { edge: EdgeId },
    #[error("vertex id already taken: '{id}'")]
    DuplicateVertex { id: VertexId },
}

// ---------------------------------------------------------------------------
// Public planners
// ---------------------------------------------------------------------------

/// Plans a connection between two endpoints. See the module docs for the
/// per-shape rules.
pub fn connect(bench: &Workbench, a: Endpoint, b: Endpoint) -> Result<EditOp, Rejection> {
    let mut planner = Planner::new(bench);
    planner.connect(a, b)?;
    Ok(planner.finish())
}

/// Plans cutting every link on `port`. Returns an empty operation when the
/// port has no links.
pub fn disconnect(bench: &Workbench, port: &PortRef) -> Result<EditOp, Rejection> {
    let mut planner = Planner::new(bench);
    planner.disconnect_port(port)?;
    Ok(planner.finish())
}

/// Plans removing one link. Port endpoints left without links on the edge
/// get their edge references cleared, and an edge left without links is
/// deleted -- the deletion is captured in the operation, so undoing the cut
/// recreates the edge under its original id, type, and label.
pub fn cut(bench: &Workbench, link: LinkId) -> Result<EditOp, Rejection> {
    let mut planner = Planner::new(bench);
    planner.cut_link(link, false, &[])?;
    Ok(planner.finish())
}

/// Plans cutting every link on `edge`, which removes the edge itself with
/// the last cut.
pub fn delete_edge(bench: &Workbench, edge: &EdgeId) -> Result<EditOp, Rejection> {
    let mut planner = Planner::new(bench);
    planner.delete_edge(edge)?;
    Ok(planner.finish())
}

/// Plans disconnecting every port of `vertex` and removing it. The
/// operation captures the disconnected vertex, so undo restores it
/// verbatim and the composed disconnect-undos then restore its
/// connections.
pub fn delete_vertex(bench: &Workbench, vertex: &VertexId) -> Result<EditOp, Rejection> {
    let mut planner = Planner::new(bench);
    planner.delete_vertex(vertex)?;
    Ok(planner.finish())
}

/// Plans inserting a new vertex. Edge references on the given ports are
/// stripped; connections are made afterwards with [`connect`].
pub fn add_vertex(bench: &Workbench, id: VertexId, vertex: Vertex) -> Result<EditOp, Rejection> {
    if bench.circuit().vertex(&id).is_some() {
        return Err(Rejection::DuplicateVertex { id });
    }
    let mut clean = vertex;
    for port in clean
        .ports
        .inbound
        .iter_mut()
        .chain(clean.ports.outbound.iter_mut())
    {
        port.edge_id = None;
    }
    Ok(EditOp::from_steps(vec![EditStep::InsertVertex {
        id,
        vertex: clean,
    }]))
}

/// Adapts a planning result to the permissive style: a rejected edit
/// becomes the empty operation, which applies without effect.
pub fn or_noop(planned: Result<EditOp, Rejection>) -> EditOp {
    planned.unwrap_or_else(|_| EditOp::noop())
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

/// Composes steps against a read-only workbench, tracking the effects of
/// the steps emitted so far.
struct Planner<'a> {
    bench: &'a Workbench,
    op: EditOp,
    port_edges: HashMap<PortRef, Option<EdgeId>>,
    removed_links: BTreeSet<LinkId>,
    added_links: BTreeMap<LinkId, Link>,
    added_edges: HashMap<EdgeId, Edge>,
    removed_edges: HashSet<EdgeId>,
    next_link: u64,
}

impl<'a> Planner<'a> {
    fn new(bench: &'a Workbench) -> Self {
        Planner {
            bench,
            op: EditOp::noop(),
            port_edges: HashMap::new(),
            removed_links: BTreeSet::new(),
            added_links: BTreeMap::new(),
            added_edges: HashMap::new(),
            removed_edges: HashSet::new(),
            next_link: bench.links().peek_next_id().0,
        }
    }

    fn finish(self) -> EditOp {
        self.op
    }

    /// Appends a step and records its effect in the overlay.
    fn emit(&mut self, step: EditStep) {
        match &step {
            EditStep::SetPortEdge { port, to, .. } => {
                self.port_edges.insert(port.clone(), to.clone());
            }
            EditStep::AttachLink { link } => {
                self.added_links.insert(link.id, link.clone());
            }
            EditStep::DetachLink { link } => {
                if self.added_links.remove(&link.id).is_none() {
                    self.removed_links.insert(link.id);
                }
            }
            EditStep::InsertEdge { id, edge } => {
                self.removed_edges.remove(id);
                self.added_edges.insert(id.clone(), edge.clone());
            }
            EditStep::RemoveEdge { id, .. } => {
                if self.added_edges.remove(id).is_none() {
                    self.removed_edges.insert(id.clone());
                }
            }
            EditStep::InsertVertex { .. } | EditStep::RemoveVertex { .. } => {}
        }
        self.op.push(step);
    }

    // -- overlay reads ------------------------------------------------------

    fn port(&self, port_ref: &PortRef) -> Result<&Port, Rejection> {
        let vertex = self
            .bench
            .circuit()
            .vertex(&port_ref.vertex)
            .ok_or_else(|| Rejection::MissingVertex {
                id: port_ref.vertex.clone(),
            })?;
        vertex
            .port(&port_ref.port)
            .ok_or_else(|| Rejection::MissingPort {
                vertex: port_ref.vertex.clone(),
                port: port_ref.port.clone(),
            })
    }

    fn port_edge(&self, port_ref: &PortRef) -> Option<EdgeId> {
        if let Some(pending) = self.port_edges.get(port_ref) {
            return pending.clone();
        }
        self.bench
            .circuit()
            .port(port_ref)
            .and_then(|port| port.edge_id.clone())
    }

    fn edge_exists(&self, id: &EdgeId) -> bool {
        if self.removed_edges.contains(id) {
            return false;
        }
        self.added_edges.contains_key(id) || self.bench.circuit().edge(id).is_some()
    }

    fn edge_record(&self, id: &EdgeId) -> Option<Edge> {
        if self.removed_edges.contains(id) {
            return None;
        }
        self.added_edges
            .get(id)
            .cloned()
            .or_else(|| self.bench.circuit().edge(id).cloned())
    }

    fn resolve_link(&self, id: LinkId) -> Option<Link> {
        if let Some(link) = self.added_links.get(&id) {
            return Some(link.clone());
        }
        if self.removed_links.contains(&id) {
            return None;
        }
        self.bench.links().get(id).cloned()
    }

    /// The edge's links under the overlay, ascending by id.
    fn links_on_edge(&self, edge: &EdgeId) -> Vec<Link> {
        let mut links: Vec<Link> = self
            .bench
            .links()
            .by_edge(edge)
            .filter(|id| !self.removed_links.contains(id))
            .filter_map(|id| self.bench.links().get(id).cloned())
            .collect();
        links.extend(
            self.added_links
                .values()
                .filter(|link| link.edge == *edge)
                .cloned(),
        );
        links.sort_by_key(|link| link.id);
        links
    }

    /// Ports whose effective edge reference is `edge`, in vertex insertion
    /// order, split into sources and destinations.
    fn members(&self, edge: &EdgeId) -> (Vec<PortRef>, Vec<PortRef>) {
        let mut sources = Vec::new();
        let mut dests = Vec::new();
        for (vid, vertex) in &self.bench.circuit().vertices {
            for port in vertex.all_ports() {
                let port_ref = PortRef::new(vid.clone(), port.id.clone());
                if self.port_edge(&port_ref).as_ref() == Some(edge) {
                    match port.direction {
                        Direction::Out => sources.push(port_ref),
                        Direction::In => dests.push(port_ref),
                    }
                }
            }
        }
        (sources, dests)
    }

    fn alloc_link_id(&mut self) -> LinkId {
        let id = LinkId(self.next_link);
        self.next_link += 1;
        id
    }

    fn alloc_edge_id(&self, ty: &str) -> EdgeId {
        let mut n = 1u64;
        loop {
            let candidate = EdgeId::new(format!("{ty}{n}"));
            if !self.edge_exists(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    // -- operations ---------------------------------------------------------

    fn connect(&mut self, a: Endpoint, b: Endpoint) -> Result<(), Rejection> {
        match (a, b) {
            (Endpoint::Edge(_), Endpoint::Edge(_)) => Err(Rejection::EdgeToEdge),
            (Endpoint::Port { vertex, port }, Endpoint::Edge(edge))
            | (Endpoint::Edge(edge), Endpoint::Port { vertex, port }) => {
                self.connect_port_edge(&PortRef::new(vertex, port), &edge)
            }
            (
                Endpoint::Port {
                    vertex: va,
                    port: pa,
                },
                Endpoint::Port {
                    vertex: vb,
                    port: pb,
                },
            ) => self.connect_ports(&PortRef::new(va, pa), &PortRef::new(vb, pb)),
        }
    }

    fn connect_port_edge(&mut self, port_ref: &PortRef, edge_id: &EdgeId) -> Result<(), Rejection> {
        let port = self.port(port_ref)?.clone();
        let edge = self
            .edge_record(edge_id)
            .ok_or_else(|| Rejection::MissingEdge {
                id: edge_id.clone(),
            })?;
        if port.ty != edge.ty {
            return Err(Rejection::TypeMismatch {
                first: port.ty,
                second: edge.ty,
            });
        }
        match self.port_edge(port_ref) {
            Some(held) if held == *edge_id => {
                return Err(Rejection::AlreadyConnected { edge: held })
            }
            Some(_) => self.disconnect_port(port_ref)?,
            None => {}
        }
        self.join(port_ref, edge_id, &[port_ref.clone()])
    }

    fn connect_ports(&mut self, ra: &PortRef, rb: &PortRef) -> Result<(), Rejection> {
        let a = self.port(ra)?.clone();
        let b = self.port(rb)?.clone();
        if a.ty != b.ty {
            return Err(Rejection::TypeMismatch {
                first: a.ty,
                second: b.ty,
            });
        }
        if a.direction == b.direction {
            return Err(Rejection::DirectionConflict {
                direction: a.direction,
            });
        }
        let (src_ref, dst_ref) = match a.direction {
            Direction::Out => (ra, rb),
            Direction::In => (rb, ra),
        };

        // A held connection survives only in the point-to-point regime,
        // where the upcoming join replaces it by eviction instead.
        let config = self.bench.types().config(&a.ty);
        for (port_ref, direction) in [(src_ref, Direction::Out), (dst_ref, Direction::In)] {
            if self.port_edge(port_ref).is_some() && !config.simple_unit(direction) {
                self.disconnect_port(port_ref)?;
            }
        }

        let protected = [src_ref.clone(), dst_ref.clone()];
        match (self.port_edge(src_ref), self.port_edge(dst_ref)) {
            (None, None) => self.create_edge_between(src_ref, dst_ref, &a.ty, &config),
            (Some(edge), None) => self.join(dst_ref, &edge, &protected),
            (None, Some(edge)) => self.join(src_ref, &edge, &protected),
            (Some(held), Some(other)) if held == other => {
                Err(Rejection::AlreadyConnected { edge: held })
            }
            (Some(held), Some(_)) => {
                self.disconnect_port(dst_ref)?;
                self.join(dst_ref, &held, &protected)
            }
        }
    }

    /// Creates a fresh edge between two unconnected ports.
    fn create_edge_between(
        &mut self,
        src_ref: &PortRef,
        dst_ref: &PortRef,
        ty: &str,
        config: &TypeConfig,
    ) -> Result<(), Rejection> {
        let edge_id = self.alloc_edge_id(ty);
        self.emit(EditStep::InsertEdge {
            id: edge_id.clone(),
            edge: Edge::new(ty, config.label.clone()),
        });
        self.emit(EditStep::SetPortEdge {
            port: src_ref.clone(),
            from: None,
            to: Some(edge_id.clone()),
        });
        self.emit(EditStep::SetPortEdge {
            port: dst_ref.clone(),
            from: None,
            to: Some(edge_id.clone()),
        });
        if config.simple {
            let link = Link {
                id: self.alloc_link_id(),
                source: Endpoint::from(src_ref.clone()),
                dest: Endpoint::from(dst_ref.clone()),
                edge: edge_id,
            };
            self.emit(EditStep::AttachLink { link });
        } else {
            let source = Link {
                id: self.alloc_link_id(),
                source: Endpoint::from(src_ref.clone()),
                dest: Endpoint::Edge(edge_id.clone()),
                edge: edge_id.clone(),
            };
            self.emit(EditStep::AttachLink { link: source });
            let dest = Link {
                id: self.alloc_link_id(),
                source: Endpoint::Edge(edge_id.clone()),
                dest: Endpoint::from(dst_ref.clone()),
                edge: edge_id,
            };
            self.emit(EditStep::AttachLink { link: dest });
        }
        Ok(())
    }

    /// Joins an unconnected port onto an existing edge, evicting the
    /// oldest links on the port's side while the edge is at its cap.
    /// `protected` ports never lose their edge reference to an eviction.
    fn join(
        &mut self,
        port_ref: &PortRef,
        edge_id: &EdgeId,
        protected: &[PortRef],
    ) -> Result<(), Rejection> {
        let port = self.port(port_ref)?.clone();
        let config = self.bench.types().config(&port.ty);

        if let Some(limit) = config.side_limit(port.direction) {
            loop {
                let side: Vec<LinkId> = self
                    .links_on_edge(edge_id)
                    .into_iter()
                    .filter(|link| occupies(link, port.direction))
                    .map(|link| link.id)
                    .collect();
                if (side.len() as u32) < limit {
                    break;
                }
                self.cut_link(side[0], true, protected)?;
            }
        }

        self.emit(EditStep::SetPortEdge {
            port: port_ref.clone(),
            from: None,
            to: Some(edge_id.clone()),
        });

        if config.simple {
            self.restructure_simple(edge_id);
        } else {
            let link = match port.direction {
                Direction::Out => Link {
                    id: self.alloc_link_id(),
                    source: Endpoint::from(port_ref.clone()),
                    dest: Endpoint::Edge(edge_id.clone()),
                    edge: edge_id.clone(),
                },
                Direction::In => Link {
                    id: self.alloc_link_id(),
                    source: Endpoint::Edge(edge_id.clone()),
                    dest: Endpoint::from(port_ref.clone()),
                    edge: edge_id.clone(),
                },
            };
            self.emit(EditStep::AttachLink { link });
        }
        Ok(())
    }

    /// Brings a simple edge's links to canonical form: direct links fanned
    /// out through a single-port side, edge-node links otherwise. Links
    /// already in canonical position keep their ids.
    fn restructure_simple(&mut self, edge_id: &EdgeId) {
        let (sources, dests) = self.members(edge_id);
        let canonical: Vec<(Endpoint, Endpoint)> = if sources.len() == 1 && !dests.is_empty() {
            dests
                .iter()
                .map(|dest| {
                    (
                        Endpoint::from(sources[0].clone()),
                        Endpoint::from(dest.clone()),
                    )
                })
                .collect()
        } else if dests.len() == 1 && !sources.is_empty() {
            sources
                .iter()
                .map(|source| {
                    (
                        Endpoint::from(source.clone()),
                        Endpoint::from(dests[0].clone()),
                    )
                })
                .collect()
        } else {
            sources
                .iter()
                .map(|source| {
                    (
                        Endpoint::from(source.clone()),
                        Endpoint::Edge(edge_id.clone()),
                    )
                })
                .chain(dests.iter().map(|dest| {
                    (
                        Endpoint::Edge(edge_id.clone()),
                        Endpoint::from(dest.clone()),
                    )
                }))
                .collect()
        };

        let current = self.links_on_edge(edge_id);
        let kept: Vec<(Endpoint, Endpoint)> = current
            .iter()
            .filter(|link| canonical.contains(&(link.source.clone(), link.dest.clone())))
            .map(|link| (link.source.clone(), link.dest.clone()))
            .collect();
        for link in &current {
            if !kept.contains(&(link.source.clone(), link.dest.clone())) {
                self.emit(EditStep::DetachLink { link: link.clone() });
            }
        }
        for (source, dest) in canonical {
            if !kept.contains(&(source.clone(), dest.clone())) {
                let link = Link {
                    id: self.alloc_link_id(),
                    source,
                    dest,
                    edge: edge_id.clone(),
                };
                self.emit(EditStep::AttachLink { link });
            }
        }
    }

    /// Removes one link, clearing port references left without links on
    /// the edge and deleting the edge when its last link goes (suppressed
    /// with `keep_edge` while a join still needs it).
    fn cut_link(
        &mut self,
        id: LinkId,
        keep_edge: bool,
        protected: &[PortRef],
    ) -> Result<(), Rejection> {
        let link = self.resolve_link(id).ok_or(Rejection::MissingLink { id })?;
        self.emit(EditStep::DetachLink { link: link.clone() });

        for endpoint in [&link.source, &link.dest] {
            let port_ref = match endpoint.as_port_ref() {
                Some(port_ref) => port_ref,
                None => continue,
            };
            if protected.contains(&port_ref) {
                continue;
            }
            let still_linked = self
                .links_on_edge(&link.edge)
                .iter()
                .any(|other| other.source.is_port(&port_ref) || other.dest.is_port(&port_ref));
            if !still_linked && self.port_edge(&port_ref) == Some(link.edge.clone()) {
                self.emit(EditStep::SetPortEdge {
                    port: port_ref,
                    from: Some(link.edge.clone()),
                    to: None,
                });
            }
        }

        if !keep_edge && self.links_on_edge(&link.edge).is_empty() {
            if let Some(edge) = self.edge_record(&link.edge) {
                self.emit(EditStep::RemoveEdge {
                    id: link.edge.clone(),
                    edge,
                });
            }
        }
        Ok(())
    }

    fn disconnect_port(&mut self, port_ref: &PortRef) -> Result<(), Rejection> {
        self.port(port_ref)?;
        let edge = match self.port_edge(port_ref) {
            Some(edge) => edge,
            None => return Ok(()),
        };
        loop {
            let next = self
                .links_on_edge(&edge)
                .into_iter()
                .find(|link| link.source.is_port(port_ref) || link.dest.is_port(port_ref));
            match next {
                Some(link) => self.cut_link(link.id, false, &[])?,
                None => break,
            }
        }
        // A reference not witnessed by any link still gets cleared.
        if self.port_edge(port_ref) == Some(edge.clone()) {
            self.emit(EditStep::SetPortEdge {
                port: port_ref.clone(),
                from: Some(edge),
                to: None,
            });
        }
        Ok(())
    }

    fn delete_edge(&mut self, edge_id: &EdgeId) -> Result<(), Rejection> {
        if !self.edge_exists(edge_id) {
            return Err(Rejection::MissingEdge {
                id: edge_id.clone(),
            });
        }
        loop {
            match self.links_on_edge(edge_id).first().cloned() {
                Some(link) => self.cut_link(link.id, false, &[])?,
                None => break,
            }
        }
        // An edge no link witnessed: clear member references, then drop it.
        if self.edge_exists(edge_id) {
            let (sources, dests) = self.members(edge_id);
            for port_ref in sources.into_iter().chain(dests) {
                self.emit(EditStep::SetPortEdge {
                    port: port_ref,
                    from: Some(edge_id.clone()),
                    to: None,
                });
            }
            if let Some(edge) = self.edge_record(edge_id) {
                self.emit(EditStep::RemoveEdge {
                    id: edge_id.clone(),
                    edge,
                });
            }
        }
        Ok(())
    }

    fn delete_vertex(&mut self, id: &VertexId) -> Result<(), Rejection> {
        let vertex = self
            .bench
            .circuit()
            .vertex(id)
            .ok_or_else(|| Rejection::MissingVertex { id: id.clone() })?
            .clone();
        let port_refs: Vec<PortRef> = vertex
            .all_ports()
            .map(|port| PortRef::new(id.clone(), port.id.clone()))
            .collect();
        for port_ref in &port_refs {
            self.disconnect_port(port_ref)?;
        }
        // Captured in its disconnected shape; undo re-inserts it first and
        // the disconnect-undos then restore its edge references.
        let mut captured = vertex;
        for port in captured
            .ports
            .inbound
            .iter_mut()
            .chain(captured.ports.outbound.iter_mut())
        {
            port.edge_id = None;
        }
        self.emit(EditStep::RemoveVertex {
            id: id.clone(),
            vertex: captured,
        });
        Ok(())
    }
}

fn occupies(link: &Link, side: Direction) -> bool {
    match side {
        Direction::Out => matches!(link.source, Endpoint::Port { .. }),
        Direction::In => matches!(link.dest, Endpoint::Port { .. }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    fn wire_out(id: &str) -> Port {
        Port::new(id, id, Direction::Out, "WIRE")
    }

    fn wire_in(id: &str) -> Port {
        Port::new(id, id, Direction::In, "WIRE")
    }

    /// TRUE, FALSE, NOT, AND gates plus a channel pair, all unconnected.
    fn bench() -> Workbench {
        let mut bench = Workbench::standard();
        let circuit = bench.circuit_mut();
        circuit
            .insert_vertex(
                "true1".into(),
                Vertex::new("TRUE").with_port(wire_out("out")),
            )
            .unwrap();
        circuit
            .insert_vertex(
                "false1".into(),
                Vertex::new("FALSE").with_port(wire_out("out")),
            )
            .unwrap();
        circuit
            .insert_vertex(
                "not1".into(),
                Vertex::new("NOT")
                    .with_port(wire_in("in"))
                    .with_port(wire_out("out")),
            )
            .unwrap();
        circuit
            .insert_vertex(
                "and1".into(),
                Vertex::new("AND")
                    .with_port(wire_in("a"))
                    .with_port(wire_in("b"))
                    .with_port(wire_out("out")),
            )
            .unwrap();
        circuit
            .insert_vertex(
                "timer1".into(),
                Vertex::new("TIMER")
                    .with_port(Port::new("tick", "tick", Direction::Out, "CHANNEL")),
            )
            .unwrap();
        circuit
            .insert_vertex(
                "log1".into(),
                Vertex::new("LOG").with_port(Port::new("msg", "msg", Direction::In, "CHANNEL")),
            )
            .unwrap();
        circuit
            .insert_vertex(
                "log2".into(),
                Vertex::new("LOG").with_port(Port::new("msg", "msg", Direction::In, "CHANNEL")),
            )
            .unwrap();
        bench
    }

    /// SET/CLEAR vertices over a simple point-to-point `FLAG` type.
    fn flag_bench(max_destinations: Option<u32>) -> Workbench {
        let mut registry = TypeRegistry::standard();
        registry.register(
            "FLAG",
            TypeConfig {
                simple: true,
                max_sources: Some(1),
                max_destinations,
                hidden: true,
                label: "flag".to_string(),
            },
        );
        let mut bench = Workbench::new(registry);
        let circuit = bench.circuit_mut();
        for id in ["set1", "set2"] {
            circuit
                .insert_vertex(
                    id.into(),
                    Vertex::new("SET").with_port(Port::new("flag", "flag", Direction::Out, "FLAG")),
                )
                .unwrap();
        }
        for id in ["clear1", "clear2"] {
            circuit
                .insert_vertex(
                    id.into(),
                    Vertex::new("CLEAR")
                        .with_port(Port::new("flag", "flag", Direction::In, "FLAG")),
                )
                .unwrap();
        }
        bench
    }

    fn apply(bench: &mut Workbench, planned: Result<EditOp, Rejection>) -> EditOp {
        let op = planned.unwrap();
        op.apply(bench).unwrap();
        bench.verify().unwrap();
        op
    }

    fn held_edge(bench: &Workbench, vertex: &str, port: &str) -> Option<EdgeId> {
        bench
            .circuit()
            .port(&PortRef::new(vertex, port))
            .unwrap()
            .edge_id
            .clone()
    }

    #[test]
    fn connect_creates_wire_edge_with_two_links() {
        let mut bench = bench();
        let before = bench.clone();

        let plan = connect(
            &bench,
            Endpoint::port("true1", "out"),
            Endpoint::port("not1", "in"),
        );
        let op = apply(&mut bench, plan);

        let edge_id = EdgeId::new("WIRE1");
        let edge = bench.circuit().edge(&edge_id).unwrap();
        assert_eq!(edge.ty, "WIRE");
        assert_eq!(edge.label, "wire");
        assert_eq!(bench.links().by_edge(&edge_id).count(), 2);
        assert_eq!(held_edge(&bench, "true1", "out"), Some(edge_id.clone()));
        assert_eq!(held_edge(&bench, "not1", "in"), Some(edge_id));

        op.revert(&mut bench).unwrap();
        assert_eq!(bench.circuit(), before.circuit());
        assert_eq!(bench.links(), before.links());
    }

    #[test]
    fn connect_rejects_type_mismatch() {
        let mut bench = bench();
        let err = connect(
            &bench,
            Endpoint::port("true1", "out"),
            Endpoint::port("log1", "msg"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            Rejection::TypeMismatch {
                first: "WIRE".to_string(),
                second: "CHANNEL".to_string(),
            }
        );

        let before = bench.clone();
        or_noop(Err(err)).apply(&mut bench).unwrap();
        assert_eq!(bench.circuit(), before.circuit());
    }

    #[test]
    fn connect_rejects_same_direction() {
        let bench = bench();
        let err = connect(
            &bench,
            Endpoint::port("true1", "out"),
            Endpoint::port("not1", "out"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            Rejection::DirectionConflict {
                direction: Direction::Out,
            }
        );
    }

    #[test]
    fn connect_rejects_edge_to_edge() {
        let mut bench = bench();
        let plan = connect(
            &bench,
            Endpoint::port("true1", "out"),
            Endpoint::port("not1", "in"),
        );
        apply(&mut bench, plan);
        let plan = connect(
            &bench,
            Endpoint::port("timer1", "tick"),
            Endpoint::port("log1", "msg"),
        );
        apply(&mut bench, plan);

        let err =
            connect(&bench, Endpoint::edge("WIRE1"), Endpoint::edge("CHANNEL1")).unwrap_err();
        assert_eq!(err, Rejection::EdgeToEdge);
    }

    #[test]
    fn connect_rejects_missing_endpoints() {
        let bench = bench();
        assert!(matches!(
            connect(
                &bench,
                Endpoint::port("ghost", "out"),
                Endpoint::port("not1", "in")
            ),
            Err(Rejection::MissingVertex { .. })
        ));
        assert!(matches!(
            connect(
                &bench,
                Endpoint::port("true1", "sideways"),
                Endpoint::port("not1", "in")
            ),
            Err(Rejection::MissingPort { .. })
        ));
        assert!(matches!(
            connect(
                &bench,
                Endpoint::port("true1", "out"),
                Endpoint::edge("WIRE9")
            ),
            Err(Rejection::MissingEdge { .. })
        ));
    }

    #[test]
    fn connecting_port_to_its_own_edge_is_rejected() {
        let mut bench = bench();
        let plan = connect(
            &bench,
            Endpoint::port("true1", "out"),
            Endpoint::port("not1", "in"),
        );
        apply(&mut bench, plan);

        let err = connect(
            &bench,
            Endpoint::port("true1", "out"),
            Endpoint::edge("WIRE1"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            Rejection::AlreadyConnected {
                edge: EdgeId::new("WIRE1"),
            }
        );
    }

    #[test]
    fn joining_an_edge_adds_one_link_and_undo_removes_only_it() {
        let mut bench = bench();
        let plan = connect(
            &bench,
            Endpoint::port("true1", "out"),
            Endpoint::port("not1", "in"),
        );
        apply(&mut bench, plan);

        let plan = connect(&bench, Endpoint::port("and1", "a"), Endpoint::edge("WIRE1"));
        let join = apply(&mut bench, plan);
        assert_eq!(bench.links().by_edge(&EdgeId::new("WIRE1")).count(), 3);

        join.revert(&mut bench).unwrap();
        bench.verify().unwrap();
        assert_eq!(bench.links().by_edge(&EdgeId::new("WIRE1")).count(), 2);
        assert_eq!(held_edge(&bench, "and1", "a"), None);
        // The original pair is untouched.
        assert_eq!(
            held_edge(&bench, "true1", "out"),
            Some(EdgeId::new("WIRE1"))
        );
    }

    #[test]
    fn joining_a_full_source_side_evicts_the_oldest_driver() {
        let mut bench = bench();
        let plan = connect(
            &bench,
            Endpoint::port("true1", "out"),
            Endpoint::port("not1", "in"),
        );
        apply(&mut bench, plan);
        let plan = connect(
            &bench,
            Endpoint::port("false1", "out"),
            Endpoint::edge("WIRE1"),
        );
        apply(&mut bench, plan);

        // Exactly one source link remains, belonging to the newest driver.
        let edge_id = EdgeId::new("WIRE1");
        let sources: Vec<&Link> = bench
            .links()
            .by_edge(&edge_id)
            .filter_map(|id| bench.links().get(id))
            .filter(|link| matches!(link.source, Endpoint::Port { .. }))
            .collect();
        assert_eq!(sources.len(), 1);
        assert!(sources[0].source.is_port(&PortRef::new("false1", "out")));
        assert_eq!(held_edge(&bench, "true1", "out"), None);
        // The reader never noticed the swap.
        assert_eq!(held_edge(&bench, "not1", "in"), Some(edge_id));
    }

    #[test]
    fn reconnecting_the_same_ports_rebuilds_the_connection() {
        let mut bench = bench();
        let plan = connect(
            &bench,
            Endpoint::port("true1", "out"),
            Endpoint::port("not1", "in"),
        );
        apply(&mut bench, plan);

        let plan = connect(
            &bench,
            Endpoint::port("true1", "out"),
            Endpoint::port("not1", "in"),
        );
        let again = apply(&mut bench, plan);
        assert!(!again.is_noop());
        assert_eq!(bench.links().by_edge(&EdgeId::new("WIRE1")).count(), 2);
        assert_eq!(
            held_edge(&bench, "true1", "out"),
            Some(EdgeId::new("WIRE1"))
        );
    }

    #[test]
    fn cutting_the_last_link_deletes_the_edge_and_undo_restores_it() {
        let mut bench = bench();
        let plan = connect(
            &bench,
            Endpoint::port("true1", "out"),
            Endpoint::port("not1", "in"),
        );
        apply(&mut bench, plan);
        let edge_id = EdgeId::new("WIRE1");
        let links: Vec<LinkId> = bench.links().by_edge(&edge_id).collect();

        let plan = cut(&bench, links[0]);
        let first = apply(&mut bench, plan);
        assert!(bench.circuit().edge(&edge_id).is_some());
        assert_eq!(held_edge(&bench, "true1", "out"), None);

        let plan = cut(&bench, links[1]);
        let second = apply(&mut bench, plan);
        assert!(bench.circuit().edge(&edge_id).is_none());
        assert_eq!(held_edge(&bench, "not1", "in"), None);

        second.revert(&mut bench).unwrap();
        bench.verify().unwrap();
        let edge = bench.circuit().edge(&edge_id).unwrap();
        assert_eq!(edge.ty, "WIRE");
        assert_eq!(edge.label, "wire");

        first.revert(&mut bench).unwrap();
        bench.verify().unwrap();
        assert_eq!(bench.links().by_edge(&edge_id).count(), 2);
    }

    #[test]
    fn cut_rejects_unknown_link() {
        let bench = bench();
        assert_eq!(
            cut(&bench, LinkId(41)).unwrap_err(),
            Rejection::MissingLink { id: LinkId(41) }
        );
    }

    #[test]
    fn disconnect_cuts_every_link_on_the_port() {
        let mut bench = bench();
        let plan = connect(
            &bench,
            Endpoint::port("timer1", "tick"),
            Endpoint::port("log1", "msg"),
        );
        apply(&mut bench, plan);
        let plan = connect(
            &bench,
            Endpoint::port("log2", "msg"),
            Endpoint::edge("CHANNEL1"),
        );
        apply(&mut bench, plan);
        assert_eq!(bench.links().by_edge(&EdgeId::new("CHANNEL1")).count(), 3);

        let plan = disconnect(&bench, &PortRef::new("timer1", "tick"));
        apply(&mut bench, plan);
        // The channel survives on its two receivers.
        assert_eq!(bench.links().by_edge(&EdgeId::new("CHANNEL1")).count(), 2);
        assert_eq!(held_edge(&bench, "timer1", "tick"), None);

        // Disconnecting an unconnected port plans nothing.
        let op = disconnect(&bench, &PortRef::new("timer1", "tick")).unwrap();
        assert!(op.is_noop());
        assert!(matches!(
            disconnect(&bench, &PortRef::new("ghost", "tick")),
            Err(Rejection::MissingVertex { .. })
        ));
    }

    #[test]
    fn delete_edge_clears_all_members() {
        let mut bench = bench();
        let plan = connect(
            &bench,
            Endpoint::port("true1", "out"),
            Endpoint::port("not1", "in"),
        );
        apply(&mut bench, plan);
        let before = bench.clone();

        let plan = delete_edge(&bench, &EdgeId::new("WIRE1"));
        let op = apply(&mut bench, plan);
        assert!(bench.circuit().edge(&EdgeId::new("WIRE1")).is_none());
        assert!(bench.links().is_empty());
        assert_eq!(held_edge(&bench, "true1", "out"), None);

        op.revert(&mut bench).unwrap();
        assert_eq!(bench.circuit(), before.circuit());
        assert_eq!(bench.links(), before.links());

        assert!(matches!(
            delete_edge(&bench, &EdgeId::new("WIRE9")),
            Err(Rejection::MissingEdge { .. })
        ));
    }

    #[test]
    fn delete_vertex_undo_restores_it_verbatim() {
        let mut bench = bench();
        let plan = connect(
            &bench,
            Endpoint::port("true1", "out"),
            Endpoint::port("not1", "in"),
        );
        apply(&mut bench, plan);
        let plan = connect(
            &bench,
            Endpoint::port("not1", "out"),
            Endpoint::port("and1", "a"),
        );
        apply(&mut bench, plan);
        let before = bench.clone();

        let plan = delete_vertex(&bench, &"not1".into());
        let op = apply(&mut bench, plan);
        assert!(bench.circuit().vertex(&"not1".into()).is_none());
        // Its edges survive on their remaining members.
        assert!(bench.circuit().edge(&EdgeId::new("WIRE1")).is_some());
        assert!(bench.circuit().edge(&EdgeId::new("WIRE2")).is_some());

        op.revert(&mut bench).unwrap();
        bench.verify().unwrap();
        assert_eq!(bench.circuit(), before.circuit());
        assert_eq!(bench.links(), before.links());
    }

    #[test]
    fn add_vertex_strips_edge_references() {
        let mut bench = bench();
        let mut probe = Vertex::new("PROBE q").with_port(wire_in("in"));
        probe.ports.inbound[0].edge_id = Some(EdgeId::new("WIRE9"));

        let plan = add_vertex(&bench, "probe1".into(), probe);
        apply(&mut bench, plan);
        assert_eq!(held_edge(&bench, "probe1", "in"), None);

        assert!(matches!(
            add_vertex(&bench, "probe1".into(), Vertex::new("PROBE q")),
            Err(Rejection::DuplicateVertex { .. })
        ));
    }

    #[test]
    fn simple_type_connects_with_a_single_direct_link() {
        let mut bench = flag_bench(None);
        let plan = connect(
            &bench,
            Endpoint::port("set1", "flag"),
            Endpoint::port("clear1", "flag"),
        );
        apply(&mut bench, plan);

        let edge_id = EdgeId::new("FLAG1");
        let links: Vec<&Link> = bench
            .links()
            .by_edge(&edge_id)
            .filter_map(|id| bench.links().get(id))
            .collect();
        assert_eq!(links.len(), 1);
        assert!(links[0].source.is_port(&PortRef::new("set1", "flag")));
        assert!(links[0].dest.is_port(&PortRef::new("clear1", "flag")));
    }

    #[test]
    fn simple_join_restructures_to_canonical_links() {
        let mut bench = flag_bench(None);
        let plan = connect(
            &bench,
            Endpoint::port("set1", "flag"),
            Endpoint::port("clear1", "flag"),
        );
        apply(&mut bench, plan);

        // A second driver evicts the first; with no surviving reader the
        // lone source links against the edge node.
        let plan = connect(
            &bench,
            Endpoint::port("set2", "flag"),
            Endpoint::edge("FLAG1"),
        );
        apply(&mut bench, plan);
        let edge_id = EdgeId::new("FLAG1");
        let links: Vec<Link> = bench
            .links()
            .by_edge(&edge_id)
            .filter_map(|id| bench.links().get(id).cloned())
            .collect();
        assert_eq!(links.len(), 1);
        assert!(links[0].source.is_port(&PortRef::new("set2", "flag")));
        assert_eq!(links[0].dest, Endpoint::Edge(edge_id.clone()));

        // A reader joining afterwards collapses that into a direct link.
        let plan = connect(
            &bench,
            Endpoint::port("clear1", "flag"),
            Endpoint::edge("FLAG1"),
        );
        let rejoin = apply(&mut bench, plan);
        let links: Vec<Link> = bench
            .links()
            .by_edge(&edge_id)
            .filter_map(|id| bench.links().get(id).cloned())
            .collect();
        assert_eq!(links.len(), 1);
        assert!(links[0].source.is_port(&PortRef::new("set2", "flag")));
        assert!(links[0].dest.is_port(&PortRef::new("clear1", "flag")));

        rejoin.revert(&mut bench).unwrap();
        bench.verify().unwrap();
        let links: Vec<Link> = bench
            .links()
            .by_edge(&edge_id)
            .filter_map(|id| bench.links().get(id).cloned())
            .collect();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].dest, Endpoint::Edge(edge_id));
    }

    #[test]
    fn point_to_point_replacement_keeps_the_held_port() {
        let mut bench = flag_bench(Some(1));
        let plan = connect(
            &bench,
            Endpoint::port("set1", "flag"),
            Endpoint::port("clear1", "flag"),
        );
        apply(&mut bench, plan);

        // set1 is in the point-to-point regime: it keeps its edge and the
        // old reader is evicted rather than set1 being disconnected.
        let plan = connect(
            &bench,
            Endpoint::port("set1", "flag"),
            Endpoint::port("clear2", "flag"),
        );
        apply(&mut bench, plan);

        let edge_id = EdgeId::new("FLAG1");
        assert_eq!(held_edge(&bench, "set1", "flag"), Some(edge_id.clone()));
        assert_eq!(held_edge(&bench, "clear1", "flag"), None);
        let links: Vec<&Link> = bench
            .links()
            .by_edge(&edge_id)
            .filter_map(|id| bench.links().get(id))
            .collect();
        assert_eq!(links.len(), 1);
        assert!(links[0].source.is_port(&PortRef::new("set1", "flag")));
        assert!(links[0].dest.is_port(&PortRef::new("clear2", "flag")));
    }
}
