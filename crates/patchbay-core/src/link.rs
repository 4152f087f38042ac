//! Derived link records and their index.
//!
//! A [`Link`] is one concrete connection between two endpoints -- a port or
//! an edge node. Links are not authoritative (the ports' `edge_id` fields
//! are); they exist so edit operations can undo precisely and UIs can look
//! connections up by vertex, edge, or port. The whole index is recomputable
//! from a circuit via [`LinkIndex::rebuild`].
//!
//! Every link is indexed under the vertex bucket of each port endpoint and
//! under the bucket of its mediating edge. For complex edge types the edge
//! endpoint and the mediating edge coincide; for simple types (direct
//! port-to-port links) the mediating-edge bucket is the extra index that
//! keeps `byEdge` lookups working without a materialized edge node.
//!
//! Buckets are ordered sets of ascending [`LinkId`], and ids are allocated
//! from a monotone counter, so per-edge iteration order is creation order.
//! Cardinality eviction leans on that: "oldest first" is "lowest id first".

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::circuit::{Circuit, PortRef};
use crate::error::GraphError;
use crate::id::{EdgeId, LinkId, PortId, VertexId};
use crate::types::TypeRegistry;
use crate::vertex::Direction;

/// One end of a link: a port on a vertex, or an edge node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Endpoint {
    Port { vertex: VertexId, port: PortId },
    Edge(EdgeId),
}

impl Endpoint {
    pub fn port(vertex: impl Into<VertexId>, port: impl Into<PortId>) -> Self {
        Endpoint::Port {
            vertex: vertex.into(),
            port: port.into(),
        }
    }

    pub fn edge(id: impl Into<EdgeId>) -> Self {
        Endpoint::Edge(id.into())
    }

    pub fn as_port_ref(&self) -> Option<PortRef> {
        match self {
            Endpoint::Port { vertex, port } => {
                Some(PortRef::new(vertex.clone(), port.clone()))
            }
            Endpoint::Edge(_) => None,
        }
    }

    pub fn vertex(&self) -> Option<&VertexId> {
        match self {
            Endpoint::Port { vertex, .. } => Some(vertex),
            Endpoint::Edge(_) => None,
        }
    }

    /// True when this endpoint is exactly the given port.
    pub fn is_port(&self, port_ref: &PortRef) -> bool {
        matches!(
            self,
            Endpoint::Port { vertex, port }
                if *vertex == port_ref.vertex && *port == port_ref.port
        )
    }
}

impl From<PortRef> for Endpoint {
    fn from(port: PortRef) -> Self {
        Endpoint::Port {
            vertex: port.vertex,
            port: port.port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Port { vertex, port } => write!(f, "{vertex}:{port}"),
            Endpoint::Edge(id) => write!(f, "edge '{id}'"),
        }
    }
}

/// A directed connection record: `source` feeds `dest` through `edge`.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub source: Endpoint,
    pub dest: Endpoint,
    /// The mediating edge, present for simple and complex links alike.
    pub edge: EdgeId,
}

// ---------------------------------------------------------------------------
// LinkIndex
// ---------------------------------------------------------------------------

/// Lookup structure over the current link records.
#[derive(Debug, Clone, Default)]
pub struct LinkIndex {
    links: BTreeMap<LinkId, Link>,
    by_vertex: HashMap<VertexId, BTreeSet<LinkId>>,
    by_edge: HashMap<EdgeId, BTreeSet<LinkId>>,
    next_id: u64,
}

/// Index equality is link-record equality. Buckets are derived from the
/// records and the id counter is an allocation detail, so neither takes
/// part -- undoing an operation restores equality even though the counter
/// has moved on.
impl PartialEq for LinkIndex {
    fn eq(&self, other: &Self) -> bool {
        self.links == other.links
    }
}

impl LinkIndex {
    pub fn new() -> Self {
        LinkIndex::default()
    }

    /// The id the next created link will get. Planners pre-assign ids from
    /// here without mutating; see the single-writer note on the edit layer.
    pub fn peek_next_id(&self) -> LinkId {
        LinkId(self.next_id)
    }

    // -- lookups ------------------------------------------------------------

    pub fn get(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Links touching `vertex`, ascending by id. Empty for unknown ids.
    pub fn by_vertex<'a>(&'a self, vertex: &VertexId) -> impl Iterator<Item = LinkId> + 'a {
        self.by_vertex.get(vertex).into_iter().flatten().copied()
    }

    /// Links mediated by `edge`, ascending by id (creation order -- the
    /// eviction order of the edit layer). Empty for unknown ids.
    pub fn by_edge<'a>(&'a self, edge: &EdgeId) -> impl Iterator<Item = LinkId> + 'a {
        self.by_edge.get(edge).into_iter().flatten().copied()
    }

    /// Links whose source or dest is exactly this port, ascending by id.
    pub fn by_port(&self, port: &PortRef) -> Vec<LinkId> {
        self.by_vertex(&port.vertex)
            .filter(|id| {
                let link = &self.links[id];
                link.source.is_port(port) || link.dest.is_port(port)
            })
            .collect()
    }

    // -- mutation -----------------------------------------------------------

    /// Creates a link between `a` and `b`, normalizing direction: the
    /// endpoint whose port direction is `in` becomes dest. The mediating
    /// edge comes from an edge endpoint or from the ports' edge references,
    /// which must agree. Returns the fresh link id.
    pub fn create(
        &mut self,
        circuit: &Circuit,
        a: Endpoint,
        b: Endpoint,
    ) -> Result<LinkId, GraphError> {
        let link = self.resolve(circuit, a, b)?;
        let id = link.id;
        self.insert(link)?;
        Ok(id)
    }

    /// Inserts a fully formed link record, for example one captured by an
    /// undo step. The id must be unused; the allocation counter advances
    /// past it.
    pub fn insert(&mut self, link: Link) -> Result<(), GraphError> {
        if self.links.contains_key(&link.id) {
            return Err(GraphError::LinkIdCollision { id: link.id });
        }
        for endpoint in [&link.source, &link.dest] {
            if let Endpoint::Port { vertex, .. } = endpoint {
                self.by_vertex
                    .entry(vertex.clone())
                    .or_default()
                    .insert(link.id);
            }
        }
        self.by_edge
            .entry(link.edge.clone())
            .or_default()
            .insert(link.id);
        self.next_id = self.next_id.max(link.id.0 + 1);
        self.links.insert(link.id, link);
        Ok(())
    }

    /// Removes a link from every bucket, returning the record.
    pub fn remove(&mut self, id: LinkId) -> Result<Link, GraphError> {
        let link = self
            .links
            .remove(&id)
            .ok_or(GraphError::LinkNotFound { id })?;
        for endpoint in [&link.source, &link.dest] {
            if let Endpoint::Port { vertex, .. } = endpoint {
                if let Some(bucket) = self.by_vertex.get_mut(vertex) {
                    bucket.remove(&id);
                    if bucket.is_empty() {
                        self.by_vertex.remove(vertex);
                    }
                }
            }
        }
        if let Some(bucket) = self.by_edge.get_mut(&link.edge) {
            bucket.remove(&id);
            if bucket.is_empty() {
                self.by_edge.remove(&link.edge);
            }
        }
        Ok(link)
    }

    /// Recomputes the whole index from a circuit. Simple edges with a
    /// single port on one side become direct links fanned out through that
    /// port; every other shape gets one link per referencing port through
    /// the edge node. The edit layer maintains the same canonical form
    /// incrementally, so after any complete operation the live index and a
    /// rebuild describe identical connections.
    pub fn rebuild(circuit: &Circuit, types: &TypeRegistry) -> Result<Self, GraphError> {
        let mut index = LinkIndex::new();
        for (edge_id, edge) in &circuit.edges {
            let config = types.config(&edge.ty);
            let mut sources: Vec<PortRef> = Vec::new();
            let mut dests: Vec<PortRef> = Vec::new();
            for (port_ref, port) in circuit.ports_on_edge(edge_id) {
                match port.direction {
                    Direction::Out => sources.push(port_ref),
                    Direction::In => dests.push(port_ref),
                }
            }
            if config.simple && sources.len() == 1 && !dests.is_empty() {
                for dest in dests {
                    index.create(
                        circuit,
                        Endpoint::from(sources[0].clone()),
                        Endpoint::from(dest),
                    )?;
                }
            } else if config.simple && dests.len() == 1 && !sources.is_empty() {
                for source in sources {
                    index.create(
                        circuit,
                        Endpoint::from(source),
                        Endpoint::from(dests[0].clone()),
                    )?;
                }
            } else {
                for source in sources {
                    index.create(
                        circuit,
                        Endpoint::from(source),
                        Endpoint::Edge(edge_id.clone()),
                    )?;
                }
                for dest in dests {
                    index.create(
                        circuit,
                        Endpoint::Edge(edge_id.clone()),
                        Endpoint::from(dest),
                    )?;
                }
            }
        }
        Ok(index)
    }

    // -- internals ----------------------------------------------------------

    /// Orients `a`/`b` into source/dest and determines the mediating edge.
    fn resolve(
        &self,
        circuit: &Circuit,
        a: Endpoint,
        b: Endpoint,
    ) -> Result<Link, GraphError> {
        let direction_of = |endpoint: &Endpoint| -> Result<Option<Direction>, GraphError> {
            match endpoint {
                Endpoint::Port { vertex, port } => {
                    let port_ref = PortRef::new(vertex.clone(), port.clone());
                    let port = circuit.port(&port_ref).ok_or(GraphError::PortNotFound {
                        vertex: vertex.clone(),
                        port: port_ref.port.clone(),
                    })?;
                    Ok(Some(port.direction))
                }
                Endpoint::Edge(_) => Ok(None),
            }
        };

        let (source, dest) = match (direction_of(&a)?, direction_of(&b)?) {
            (Some(Direction::Out), Some(Direction::In)) => (a, b),
            (Some(Direction::In), Some(Direction::Out)) => (b, a),
            (Some(Direction::Out), None) | (None, Some(Direction::In)) => (a, b),
            (Some(Direction::In), None) | (None, Some(Direction::Out)) => (b, a),
            (Some(d), Some(_)) => {
                return Err(GraphError::Inconsistency {
                    reason: format!("cannot link two '{d}' ports: {a} and {b}"),
                })
            }
            (None, None) => {
                return Err(GraphError::Inconsistency {
                    reason: format!("cannot link two edges: {a} and {b}"),
                })
            }
        };

        let mut edge: Option<EdgeId> = None;
        for endpoint in [&source, &dest] {
            let candidate = match endpoint {
                Endpoint::Edge(id) => Some(id.clone()),
                Endpoint::Port { vertex, port } => circuit
                    .port(&PortRef::new(vertex.clone(), port.clone()))
                    .and_then(|p| p.edge_id.clone()),
            };
            match (&edge, candidate) {
                (None, Some(id)) => edge = Some(id),
                (Some(held), Some(id)) if *held != id => {
                    return Err(GraphError::Inconsistency {
                        reason: format!(
                            "endpoints disagree on mediating edge: '{held}' vs '{id}'"
                        ),
                    })
                }
                _ => {}
            }
        }
        let edge = edge.ok_or_else(|| GraphError::Inconsistency {
            reason: format!("no mediating edge between {source} and {dest}"),
        })?;

        Ok(Link {
            id: self.peek_next_id(),
            source,
            dest,
            edge,
        })
    }
}

// ---------------------------------------------------------------------------
// ControllerMap
// ---------------------------------------------------------------------------

/// Per-link observer state keyed by link id -- an extension point for UI
/// layers (repaint handles and the like). Not consulted by the model.
#[derive(Debug, Clone, Default)]
pub struct ControllerMap<T> {
    entries: HashMap<LinkId, T>,
}

impl<T> ControllerMap<T> {
    pub fn new() -> Self {
        ControllerMap {
            entries: HashMap::new(),
        }
    }

    pub fn set(&mut self, id: LinkId, controller: T) -> Option<T> {
        self.entries.insert(id, controller)
    }

    pub fn get(&self, id: LinkId) -> Option<&T> {
        self.entries.get(&id)
    }

    pub fn get_mut(&mut self, id: LinkId) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    pub fn remove(&mut self, id: LinkId) -> Option<T> {
        self.entries.remove(&id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
