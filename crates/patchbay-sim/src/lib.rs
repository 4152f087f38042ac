pub mod agenda;
pub mod flatten;
pub mod netlist;
pub mod engine;

// Re-export commonly used types
pub use agenda::{Agenda, Time};
pub use engine::{RunOutcome, RunReport, SimConfig, Simulation};
pub use flatten::{flatten, BRIDGE_LABEL, PATH_SEPARATOR};
pub use netlist::{Diagnostic, Gate, GateId, GateKind, Netlist};
