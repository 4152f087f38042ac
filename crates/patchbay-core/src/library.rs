//! Component library: named sub-circuits usable as vertices.
//!
//! A component is a full [`Circuit`] document registered under a label.
//! Inside the body, designated `INPUT` and `OUTPUT` interface vertices
//! declare the external contract: the `INPUT` vertex's outbound ports and
//! the `OUTPUT` vertex's inbound ports are what a call site sees (mirrored
//! into the placeholder vertex built by [`ComponentLibrary::instance`]).
//!
//! Expansion itself lives in the flattening pass; this module adds the
//! static view of the library, including the component-reference digraph
//! used to detect mutual recursion that the expansion-time ancestor guard
//! silently truncates.

use indexmap::IndexMap;
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};

use crate::circuit::Circuit;
use crate::id::VertexId;
use crate::vertex::{Port, Vertex};

/// Label of the interface vertex collecting a component's inputs.
pub const INPUT_LABEL: &str = "INPUT";
/// Label of the interface vertex collecting a component's outputs.
pub const OUTPUT_LABEL: &str = "OUTPUT";

/// Finds the first vertex in `body` carrying the given label.
pub fn labeled_vertex<'a>(body: &'a Circuit, label: &str) -> Option<(&'a VertexId, &'a Vertex)> {
    body.vertices.iter().find(|(_, v)| v.label == label)
}

/// Named component bodies, keyed by the label call sites use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ComponentLibrary {
    pub components: IndexMap<String, Circuit>,
}

impl ComponentLibrary {
    pub fn new() -> Self {
        ComponentLibrary::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, body: Circuit) {
        self.components.insert(label.into(), body);
    }

    pub fn get(&self, label: &str) -> Option<&Circuit> {
        self.components.get(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.components.contains_key(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Builds the call-site placeholder vertex for `label`: the component
    /// `INPUT` vertex's outbound ports become the placeholder's inbound
    /// ports and the `OUTPUT` vertex's inbound ports its outbound ports,
    /// all unconnected. Returns `None` for unknown labels.
    pub fn instance(&self, label: &str) -> Option<Vertex> {
        let body = self.components.get(label)?;
        let mut vertex = Vertex::new(label);
        if let Some((_, input)) = labeled_vertex(body, INPUT_LABEL) {
            for port in &input.ports.outbound {
                vertex.push_port(mirrored(port));
            }
        }
        if let Some((_, output)) = labeled_vertex(body, OUTPUT_LABEL) {
            for port in &output.ports.inbound {
                vertex.push_port(mirrored(port));
            }
        }
        Some(vertex)
    }

    /// Groups of component labels that reference each other cyclically.
    ///
    /// The expansion-time guard only refuses to re-enter a label already on
    /// the current ancestor path, so `A -> B -> A` expands to a silently
    /// truncated circuit. This analysis reports every such group (including
    /// direct self-references) without changing expansion behavior. Groups
    /// and their members are sorted for deterministic output.
    pub fn reference_cycles(&self) -> Vec<Vec<String>> {
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for label in self.components.keys() {
            graph.add_node(label.as_str());
        }
        for (label, body) in &self.components {
            for vertex in body.vertices.values() {
                if self.components.contains_key(&vertex.label) {
                    graph.add_edge(label.as_str(), vertex.label.as_str(), ());
                }
            }
        }

        let mut cycles: Vec<Vec<String>> = Vec::new();
        for component in tarjan_scc(&graph) {
            let cyclic = component.len() > 1
                || (component.len() == 1 && graph.contains_edge(component[0], component[0]));
            if cyclic {
                let mut group: Vec<String> =
                    component.iter().map(|label| label.to_string()).collect();
                group.sort();
                cycles.push(group);
            }
        }
        cycles.sort();
        cycles
    }
}

/// Copies `port` with its direction flipped and its connection cleared.
fn mirrored(port: &Port) -> Port {
    Port::new(
        port.id.clone(),
        port.label.clone(),
        port.direction.flipped(),
        port.ty.clone(),
    )
}
