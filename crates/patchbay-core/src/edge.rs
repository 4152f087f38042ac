//! Typed multi-endpoint edges.
//!
//! An [`Edge`] is a hyperedge: any number of ports may reference it through
//! their `edge_id`, giving fan-in and fan-out without auxiliary nodes. The
//! edge itself carries no endpoint list -- connectivity is read off the
//! ports, and an edge no port references is deleted rather than kept
//! dangling.

use serde::{Deserialize, Serialize};

/// A typed connection shared by any number of ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(rename = "type")]
    pub ty: String,
    pub label: String,
}

impl Edge {
    pub fn new(ty: impl Into<String>, label: impl Into<String>) -> Self {
        Edge {
            ty: ty.into(),
            label: label.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_shape_uses_type_field() {
        let edge = Edge::new("WIRE", "wire");
        let value = serde_json::to_value(&edge).unwrap();
        assert_eq!(value, serde_json::json!({ "type": "WIRE", "label": "wire" }));
        let back: Edge = serde_json::from_value(value).unwrap();
        assert_eq!(back, edge);
    }
}
