//! Elaboration of a flat circuit into simulation structures.
//!
//! [`Netlist::from_circuit`] resolves every edge to a connection slot (a
//! stateful wire or a broadcast channel, keyed by the edge's type tag) and
//! every vertex to a [`Gate`] whose label has been parsed into a closed
//! [`GateKind`]. Each gate's connected ports are resolved to slot indexes
//! and partitioned into wire inputs, wire outputs, channel inputs, and
//! channel outputs; a port without an edge reference is unconnected and
//! simply absent from the lists.
//!
//! Elaboration never fails. An unrecognized edge type or vertex label is
//! recorded as a [`Diagnostic`] (and logged), the offending edge's ports
//! behave as unconnected, and an unrecognized vertex is carried as
//! [`GateKind::Unknown`] so the rest of the circuit still runs.

use std::collections::HashMap;

use smallvec::SmallVec;
use thiserror::Error;

use patchbay_core::circuit::Circuit;
use patchbay_core::id::{EdgeId, VertexId};
use patchbay_core::vertex::Direction;

/// Edge type tag carried by boolean wires.
pub const WIRE_TYPE: &str = "WIRE";
/// Edge type tag carried by message channels.
pub const CHANNEL_TYPE: &str = "CHANNEL";

/// Index of a wire slot, in flat-circuit edge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WireId(pub usize);

/// Index of a channel slot, in flat-circuit edge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub usize);

/// Index of a gate, in flat-circuit vertex order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GateId(pub usize);

/// Gate behavior, parsed from the vertex label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateKind {
    True,
    False,
    Not,
    And,
    Or,
    Xor,
    Bridge,
    Log,
    Probe { name: String },
    /// Label missing from the gate table. Inert during the run.
    Unknown { label: String },
}

impl GateKind {
    /// Parses a vertex label. `PROBE` takes the rest of the label, if any,
    /// as the probe's display name.
    pub fn parse(label: &str) -> GateKind {
        match label {
            "TRUE" => GateKind::True,
            "FALSE" => GateKind::False,
            "NOT" => GateKind::Not,
            "AND" => GateKind::And,
            "OR" => GateKind::Or,
            "XOR" => GateKind::Xor,
            "BRIDGE" => GateKind::Bridge,
            "LOG" => GateKind::Log,
            "PROBE" => GateKind::Probe {
                name: String::new(),
            },
            other => match other.strip_prefix("PROBE ") {
                Some(name) => GateKind::Probe {
                    name: name.trim().to_string(),
                },
                None => GateKind::Unknown {
                    label: other.to_string(),
                },
            },
        }
    }
}

/// One vertex with its connected ports resolved to slot indexes.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    pub vertex: VertexId,
    pub kind: GateKind,
    pub wire_ins: SmallVec<[WireId; 2]>,
    pub wire_outs: SmallVec<[WireId; 2]>,
    pub chan_ins: SmallVec<[ChannelId; 2]>,
    pub chan_outs: SmallVec<[ChannelId; 2]>,
}

/// A problem found during elaboration. Never fatal to the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    #[error("edge '{edge}' has unrecognized type '{ty}'; its ports are treated as unconnected")]
    UnknownEdgeType { edge: EdgeId, ty: String },
    #[error("vertex '{vertex}' has unrecognized label '{label}'; it stays inert during the run")]
    UnknownGateLabel { vertex: VertexId, label: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connection {
    Wire(WireId),
    Channel(ChannelId),
}

/// The elaborated form of a flat circuit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Netlist {
    /// Originating edge id per wire slot.
    pub wires: Vec<EdgeId>,
    /// Originating edge id per channel slot.
    pub channels: Vec<EdgeId>,
    pub gates: Vec<Gate>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Netlist {
    pub fn from_circuit(circuit: &Circuit) -> Netlist {
        let mut netlist = Netlist::default();
        let mut connections: HashMap<&EdgeId, Connection> = HashMap::new();

        for (id, edge) in &circuit.edges {
            match edge.ty.as_str() {
                WIRE_TYPE => {
                    connections.insert(id, Connection::Wire(WireId(netlist.wires.len())));
                    netlist.wires.push(id.clone());
                }
                CHANNEL_TYPE => {
                    connections.insert(id, Connection::Channel(ChannelId(netlist.channels.len())));
                    netlist.channels.push(id.clone());
                }
                other => netlist.diagnose(Diagnostic::UnknownEdgeType {
                    edge: id.clone(),
                    ty: other.to_string(),
                }),
            }
        }

        for (id, vertex) in &circuit.vertices {
            let kind = GateKind::parse(&vertex.label);
            if let GateKind::Unknown { label } = &kind {
                netlist.diagnose(Diagnostic::UnknownGateLabel {
                    vertex: id.clone(),
                    label: label.clone(),
                });
            }
            let mut gate = Gate {
                vertex: id.clone(),
                kind,
                wire_ins: SmallVec::new(),
                wire_outs: SmallVec::new(),
                chan_ins: SmallVec::new(),
                chan_outs: SmallVec::new(),
            };
            for port in vertex.all_ports() {
                let edge = match port.edge_id.as_ref() {
                    Some(edge) => edge,
                    None => continue,
                };
                match connections.get(edge) {
                    Some(Connection::Wire(wire)) => match port.direction {
                        Direction::In => gate.wire_ins.push(*wire),
                        Direction::Out => gate.wire_outs.push(*wire),
                    },
                    Some(Connection::Channel(channel)) => match port.direction {
                        Direction::In => gate.chan_ins.push(*channel),
                        Direction::Out => gate.chan_outs.push(*channel),
                    },
                    None => {}
                }
            }
            netlist.gates.push(gate);
        }

        netlist
    }

    fn diagnose(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }
}
