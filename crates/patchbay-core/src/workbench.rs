//! The editing context: one circuit, its derived [`LinkIndex`], and the
//! [`TypeRegistry`] the edits consult.
//!
//! A [`Workbench`] owns all three and keeps them in sync. Reads are open;
//! mutation goes through the operation layer (`ops`, `edit`, `history`),
//! which is why the `_mut` accessors are crate-private. Callers whose
//! document changed by other means (deserializing, an external editor)
//! swap it in with [`Workbench::resync`].

use crate::circuit::Circuit;
use crate::error::GraphError;
use crate::id::EdgeId;
use crate::link::{Endpoint, LinkIndex};
use crate::types::TypeRegistry;

#[derive(Debug, Clone)]
pub struct Workbench {
    circuit: Circuit,
    links: LinkIndex,
    types: TypeRegistry,
}

impl Workbench {
    /// An empty circuit under the given registry.
    pub fn new(types: TypeRegistry) -> Self {
        Workbench {
            circuit: Circuit::new(),
            links: LinkIndex::new(),
            types,
        }
    }

    /// An empty circuit under the standard `WIRE`/`CHANNEL` registry.
    pub fn standard() -> Self {
        Workbench::new(TypeRegistry::standard())
    }

    /// Adopts an existing circuit, verifying it and deriving its link
    /// index. This is the entry point for deserialized documents.
    pub fn from_circuit(circuit: Circuit, types: TypeRegistry) -> Result<Self, GraphError> {
        circuit.verify_consistency()?;
        let links = LinkIndex::rebuild(&circuit, &types)?;
        Ok(Workbench {
            circuit,
            links,
            types,
        })
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn links(&self) -> &LinkIndex {
        &self.links
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn into_circuit(self) -> Circuit {
        self.circuit
    }

    pub(crate) fn circuit_mut(&mut self) -> &mut Circuit {
        &mut self.circuit
    }

    pub(crate) fn links_mut(&mut self) -> &mut LinkIndex {
        &mut self.links
    }

    /// Swaps in an externally produced document and rederives the link
    /// index wholesale, discarding live link ids. On error the workbench
    /// keeps its current circuit and index.
    pub fn resync(&mut self, circuit: Circuit) -> Result<(), GraphError> {
        circuit.verify_consistency()?;
        self.links = LinkIndex::rebuild(&circuit, &self.types)?;
        self.circuit = circuit;
        Ok(())
    }

    /// Checks the circuit's internal consistency and that the live index
    /// describes the same connections a rebuild would. Link ids are ignored
    /// in the comparison; only the connection triples matter.
    pub fn verify(&self) -> Result<(), GraphError> {
        self.circuit.verify_consistency()?;
        let rebuilt = LinkIndex::rebuild(&self.circuit, &self.types)?;
        let live = connection_triples(&self.links);
        let expected = connection_triples(&rebuilt);
        if live != expected {
            return Err(GraphError::Inconsistency {
                reason: format!(
                    "link index drift: {} live links, {} expected from circuit",
                    live.len(),
                    expected.len()
                ),
            });
        }
        Ok(())
    }

    /// Debug-build sync assertion, run after each complete operation.
    #[cfg(debug_assertions)]
    pub(crate) fn debug_verify(&self) {
        if let Err(err) = self.verify() {
            panic!("workbench out of sync after operation: {err}");
        }
    }

    #[cfg(not(debug_assertions))]
    pub(crate) fn debug_verify(&self) {}
}

fn connection_triples(index: &LinkIndex) -> Vec<(Endpoint, Endpoint, EdgeId)> {
    let mut triples: Vec<_> = index
        .links()
        .map(|link| (link.source.clone(), link.dest.clone(), link.edge.clone()))
        .collect();
    triples.sort();
    triples
}
