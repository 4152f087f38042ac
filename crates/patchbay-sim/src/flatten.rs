//! Component expansion: rewrites a circuit with component-instance vertices
//! into an equivalent flat circuit of primitive vertices only.
//!
//! Instances expand depth-first. Every identifier that crosses into an
//! instance body -- vertex ids, edge ids, port ids, and port edge
//! references -- is prefixed with the path of ancestor instance ids joined
//! by [`PATH_SEPARATOR`], so two instances of the same component keep
//! disjoint internals. At each instance boundary two [`BRIDGE_LABEL`]
//! vertices are synthesized, splicing the call site's edges to the body's
//! edges: the external port group is copied from the placeholder vertex in
//! the parent (parent-path qualified), the internal group from the body's
//! `INPUT`/`OUTPUT` interface vertex (instance-path qualified). Interface
//! placeholders themselves are dropped.
//!
//! A component already on the current ancestor path is not re-entered; the
//! guard compares labels only, so mutually recursive definitions expand
//! until a label repeats ([`ComponentLibrary::reference_cycles`] reports
//! such groups ahead of time).

use patchbay_core::circuit::Circuit;
use patchbay_core::id::VertexId;
use patchbay_core::library::{labeled_vertex, ComponentLibrary, INPUT_LABEL, OUTPUT_LABEL};
use patchbay_core::vertex::{Port, Vertex};

/// Joins ancestor instance ids into qualified identifiers.
pub const PATH_SEPARATOR: &str = "/";

/// Label of the synthesized boundary vertices.
pub const BRIDGE_LABEL: &str = "BRIDGE";

/// One level of the instance stack: the instance vertex id in the parent
/// circuit and the placeholder vertex sitting there.
struct Frame<'a> {
    instance: &'a VertexId,
    placeholder: &'a Vertex,
}

/// Expands every component instance in `circuit` against `library`,
/// returning a circuit of primitive vertices with collision-free ids.
pub fn flatten(circuit: &Circuit, library: &ComponentLibrary) -> Circuit {
    let mut flat = Circuit::new();
    let mut ancestors = Vec::new();
    expand(&mut flat, circuit, &mut ancestors, library);
    flat
}

fn expand<'a>(
    flat: &mut Circuit,
    circuit: &'a Circuit,
    ancestors: &mut Vec<Frame<'a>>,
    library: &'a ComponentLibrary,
) {
    let scope = scope_of(ancestors);

    for (id, edge) in &circuit.edges {
        flat.edges.insert(id.scoped(&scope), edge.clone());
    }

    // Inside a component body, splice the call site to the body through a
    // pair of boundary vertices standing in for the interface placeholders.
    if let Some(call) = ancestors.last() {
        let parent_scope = scope_of(&ancestors[..ancestors.len() - 1]);

        if let Some((interface_id, interface)) = labeled_vertex(circuit, INPUT_LABEL) {
            let mut bridge = Vertex::new(BRIDGE_LABEL);
            for port in &call.placeholder.ports.inbound {
                bridge.push_port(scoped_port(&parent_scope, port));
            }
            for port in &interface.ports.outbound {
                bridge.push_port(scoped_port(&scope, port));
            }
            flat.vertices.insert(interface_id.scoped(&scope), bridge);
        }

        if let Some((interface_id, interface)) = labeled_vertex(circuit, OUTPUT_LABEL) {
            let mut bridge = Vertex::new(BRIDGE_LABEL);
            for port in &interface.ports.inbound {
                bridge.push_port(scoped_port(&scope, port));
            }
            for port in &call.placeholder.ports.outbound {
                bridge.push_port(scoped_port(&parent_scope, port));
            }
            flat.vertices.insert(interface_id.scoped(&scope), bridge);
        }
    }

    for (id, vertex) in &circuit.vertices {
        if let Some(body) = library.get(&vertex.label) {
            let on_path = ancestors
                .iter()
                .any(|frame| frame.placeholder.label == vertex.label);
            if !on_path {
                ancestors.push(Frame {
                    instance: id,
                    placeholder: vertex,
                });
                expand(flat, body, ancestors, library);
                ancestors.pop();
                continue;
            }
            // A label recurring on its own ancestor path is copied verbatim
            // instead of expanded, truncating the recursion.
        }

        if vertex.label != INPUT_LABEL && vertex.label != OUTPUT_LABEL {
            let mut copy = Vertex::new(vertex.label.clone());
            copy.display = vertex.display.clone();
            for port in vertex.all_ports() {
                copy.push_port(scoped_port(&scope, port));
            }
            flat.vertices.insert(id.scoped(&scope), copy);
        }
    }
}

/// Ancestor instance ids rendered as an id prefix, separator included
/// (`"b1/"`, `"d1/inner/"`), empty at the top level.
fn scope_of(frames: &[Frame]) -> String {
    let mut scope = String::new();
    for frame in frames {
        scope.push_str(frame.instance.as_str());
        scope.push_str(PATH_SEPARATOR);
    }
    scope
}

/// Copies `port` with its id and edge reference prefixed by `scope`.
fn scoped_port(scope: &str, port: &Port) -> Port {
    let mut copy = Port::new(
        port.id.scoped(scope),
        port.label.clone(),
        port.direction,
        port.ty.clone(),
    );
    copy.edge_id = port.edge_id.as_ref().map(|edge| edge.scoped(scope));
    copy
}
