//! Edit steps and their composition into undoable operations.
//!
//! An [`EditStep`] is the smallest mutation the editor performs: insert or
//! remove a vertex, edge, or link, or repoint a port's edge reference.
//! Each step carries enough captured state to know its own [`inverse`].
//! An [`EditOp`] is an ordered list of steps; operations compose by
//! concatenation and revert by applying inverses in reverse order, so
//! every user-facing edit -- however many steps the planner emitted --
//! undoes as a single unit.
//!
//! Steps validate against the live document as they apply. A step that no
//! longer matches (a stale plan, an undo after external surgery) fails,
//! and [`EditOp::apply`] unwinds the already-applied prefix so a failed
//! operation leaves no trace.
//!
//! [`inverse`]: EditStep::inverse

use crate::circuit::PortRef;
use crate::edge::Edge;
use crate::error::GraphError;
use crate::id::{EdgeId, VertexId};
use crate::link::Link;
use crate::vertex::Vertex;
use crate::workbench::Workbench;

/// One primitive mutation, carrying the state its inverse restores.
#[derive(Debug, Clone, PartialEq)]
pub enum EditStep {
    InsertVertex { id: VertexId, vertex: Vertex },
    RemoveVertex { id: VertexId, vertex: Vertex },
    InsertEdge { id: EdgeId, edge: Edge },
    RemoveEdge { id: EdgeId, edge: Edge },
    /// Repoints one port's edge reference from `from` to `to`.
    SetPortEdge {
        port: PortRef,
        from: Option<EdgeId>,
        to: Option<EdgeId>,
    },
    AttachLink { link: Link },
    DetachLink { link: Link },
}

impl EditStep {
    /// The step that exactly undoes this one.
    pub fn inverse(&self) -> EditStep {
        match self {
            EditStep::InsertVertex { id, vertex } => EditStep::RemoveVertex {
                id: id.clone(),
                vertex: vertex.clone(),
            },
            EditStep::RemoveVertex { id, vertex } => EditStep::InsertVertex {
                id: id.clone(),
                vertex: vertex.clone(),
            },
            EditStep::InsertEdge { id, edge } => EditStep::RemoveEdge {
                id: id.clone(),
                edge: edge.clone(),
            },
            EditStep::RemoveEdge { id, edge } => EditStep::InsertEdge {
                id: id.clone(),
                edge: edge.clone(),
            },
            EditStep::SetPortEdge { port, from, to } => EditStep::SetPortEdge {
                port: port.clone(),
                from: to.clone(),
                to: from.clone(),
            },
            EditStep::AttachLink { link } => EditStep::DetachLink { link: link.clone() },
            EditStep::DetachLink { link } => EditStep::AttachLink { link: link.clone() },
        }
    }

    pub(crate) fn apply(&self, bench: &mut Workbench) -> Result<(), GraphError> {
        match self {
            EditStep::InsertVertex { id, vertex } => bench
                .circuit_mut()
                .insert_vertex(id.clone(), vertex.clone()),
            EditStep::RemoveVertex { id, vertex } => {
                let removed = bench.circuit_mut().remove_vertex(id)?;
                debug_assert_eq!(&removed, vertex, "removed vertex differs from captured state");
                Ok(())
            }
            EditStep::InsertEdge { id, edge } => {
                bench.circuit_mut().insert_edge(id.clone(), edge.clone())
            }
            EditStep::RemoveEdge { id, edge } => {
                let removed = bench.circuit_mut().remove_edge(id)?;
                debug_assert_eq!(&removed, edge, "removed edge differs from captured state");
                Ok(())
            }
            EditStep::SetPortEdge { port, from, to } => {
                let slot = bench
                    .circuit_mut()
                    .port_mut(port)
                    .ok_or_else(|| GraphError::PortNotFound {
                        vertex: port.vertex.clone(),
                        port: port.port.clone(),
                    })?;
                if slot.edge_id != *from {
                    return Err(GraphError::Inconsistency {
                        reason: format!(
                            "port {port} holds {:?}, step expected {:?}",
                            slot.edge_id, from
                        ),
                    });
                }
                slot.edge_id = to.clone();
                Ok(())
            }
            EditStep::AttachLink { link } => bench.links_mut().insert(link.clone()),
            EditStep::DetachLink { link } => {
                let removed = bench.links_mut().remove(link.id)?;
                debug_assert_eq!(&removed, link, "removed link differs from captured state");
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EditOp
// ---------------------------------------------------------------------------

/// An ordered list of steps forming one undoable operation.
///
/// Composition is concatenation, so it is associative with [`EditOp::noop`]
/// as identity. The inverse of a composition applies the inverses in
/// reverse order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditOp {
    steps: Vec<EditStep>,
}

impl EditOp {
    /// The empty operation. Applying it changes nothing, and histories
    /// discard it rather than record it.
    pub fn noop() -> Self {
        EditOp::default()
    }

    pub fn from_steps(steps: Vec<EditStep>) -> Self {
        EditOp { steps }
    }

    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[EditStep] {
        &self.steps
    }

    pub fn push(&mut self, step: EditStep) {
        self.steps.push(step);
    }

    /// Concatenates: applying `a.compose(b)` equals applying `a` then `b`.
    pub fn compose(mut self, other: EditOp) -> EditOp {
        self.steps.extend(other.steps);
        self
    }

    /// The operation that undoes this one: inverse steps, reverse order.
    pub fn inverted(&self) -> EditOp {
        EditOp {
            steps: self.steps.iter().rev().map(EditStep::inverse).collect(),
        }
    }

    /// Applies every step in order. On a mid-sequence failure the applied
    /// prefix is unwound before the error returns, so the workbench is
    /// left as it was.
    pub fn apply(&self, bench: &mut Workbench) -> Result<(), GraphError> {
        for (applied, step) in self.steps.iter().enumerate() {
            if let Err(err) = step.apply(bench) {
                for done in self.steps[..applied].iter().rev() {
                    if let Err(unwind) = done.inverse().apply(bench) {
                        return Err(GraphError::Inconsistency {
                            reason: format!("unwind failed after '{err}': {unwind}"),
                        });
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Undoes a previously applied operation.
    pub fn revert(&self, bench: &mut Workbench) -> Result<(), GraphError> {
        self.inverted().apply(bench)
    }
}
