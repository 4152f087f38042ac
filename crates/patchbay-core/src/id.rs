//! ID newtypes for graph entities.
//!
//! Vertex, edge, and port identifiers are distinct newtype wrappers over
//! `String` -- string keys are required because circuit flattening derives
//! scoped identifiers (`"a1/x"`) from ancestor paths. `LinkId` wraps a `u64`
//! allocated from a per-index counter; ascending ids double as link age.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a vertex within a circuit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VertexId(pub String);

/// Identifies an edge within a circuit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub String);

/// Identifies a port within its owning vertex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PortId(pub String);

/// Identifies a link in the derived link index. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkId(pub u64);

impl VertexId {
    pub fn new(id: impl Into<String>) -> Self {
        VertexId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a copy of this id prefixed with `scope` (empty scope is a no-op).
    pub fn scoped(&self, scope: &str) -> Self {
        VertexId(format!("{scope}{}", self.0))
    }
}

impl EdgeId {
    pub fn new(id: impl Into<String>) -> Self {
        EdgeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn scoped(&self, scope: &str) -> Self {
        EdgeId(format!("{scope}{}", self.0))
    }
}

impl PortId {
    pub fn new(id: impl Into<String>) -> Self {
        PortId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn scoped(&self, scope: &str) -> Self {
        PortId(format!("{scope}{}", self.0))
    }
}

// Display implementations -- print the inner value.

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Conversions from borrowed and owned strings.

impl From<&str> for VertexId {
    fn from(id: &str) -> Self {
        VertexId(id.to_string())
    }
}

impl From<String> for VertexId {
    fn from(id: String) -> Self {
        VertexId(id)
    }
}

impl From<&str> for EdgeId {
    fn from(id: &str) -> Self {
        EdgeId(id.to_string())
    }
}

impl From<String> for EdgeId {
    fn from(id: String) -> Self {
        EdgeId(id)
    }
}

impl From<&str> for PortId {
    fn from(id: &str) -> Self {
        PortId(id.to_string())
    }
}

impl From<String> for PortId {
    fn from(id: String) -> Self {
        PortId(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_id_display() {
        assert_eq!(format!("{}", VertexId::new("and1")), "and1");
    }

    #[test]
    fn link_id_display() {
        assert_eq!(format!("{}", LinkId(99)), "99");
    }

    #[test]
    fn scoped_prefixes_the_id() {
        let id = EdgeId::new("x");
        assert_eq!(id.scoped("a1/"), EdgeId::new("a1/x"));
        assert_eq!(id.scoped(""), id);
    }

    #[test]
    fn id_types_are_distinct() {
        // Same inner value, different types; confusion is a compile error.
        let vertex = VertexId::new("x");
        let edge = EdgeId::new("x");
        let port = PortId::new("x");
        assert_eq!(vertex.0, edge.0);
        assert_eq!(edge.0, port.0);
    }

    #[test]
    fn serde_roundtrip() {
        let vertex = VertexId::new("probe3");
        let json = serde_json::to_string(&vertex).unwrap();
        assert_eq!(json, "\"probe3\"");
        let back: VertexId = serde_json::from_str(&json).unwrap();
        assert_eq!(vertex, back);

        let link = LinkId(42);
        let json = serde_json::to_string(&link).unwrap();
        let back: LinkId = serde_json::from_str(&json).unwrap();
        assert_eq!(link, back);
    }
}
