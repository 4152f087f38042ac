//! Core error types for patchbay-core.
//!
//! Uses `thiserror` for structured, matchable error variants. `GraphError`
//! signals model corruption or misuse of the primitive mutation layer; a
//! user-level "this edit is not allowed" outcome is a [`Rejection`]
//! (see `edit`), never a `GraphError`.

use crate::id::{EdgeId, LinkId, PortId, VertexId};
use thiserror::Error;

/// Errors produced by the patchbay-core crate.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A vertex id was not found in the circuit.
    #[error("vertex not found: '{id}'")]
    VertexNotFound { id: VertexId },

    /// An edge id was not found in the circuit.
    #[error("edge not found: '{id}'")]
    EdgeNotFound { id: EdgeId },

    /// A port id was not found on the named vertex.
    #[error("port not found: '{port}' on vertex '{vertex}'")]
    PortNotFound { vertex: VertexId, port: PortId },

    /// Attempting to insert a vertex under an id that already exists.
    #[error("duplicate vertex id: '{id}'")]
    DuplicateVertex { id: VertexId },

    /// Attempting to insert an edge under an id that already exists.
    #[error("duplicate edge id: '{id}'")]
    DuplicateEdge { id: EdgeId },

    /// A link id was not found in the link index.
    #[error("link not found: LinkId({id})")]
    LinkNotFound { id: LinkId },

    /// Attempting to insert a link under an id that is already indexed.
    #[error("link id collision: LinkId({id})")]
    LinkIdCollision { id: LinkId },

    /// A model/index invariant was violated.
    #[error("graph inconsistency: {reason}")]
    Inconsistency { reason: String },
}
