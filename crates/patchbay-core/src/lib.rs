pub mod circuit;
pub mod vertex;
pub mod edge;
pub mod link;
pub mod types;
pub mod op;
pub mod edit;
pub mod history;
pub mod workbench;
pub mod library;
pub mod id;
pub mod error;

// Re-export commonly used types
pub use circuit::{Circuit, Layout, PortRef, Position};
pub use edge::Edge;
pub use edit::Rejection;
pub use error::GraphError;
pub use history::{History, Transaction};
pub use id::{EdgeId, LinkId, PortId, VertexId};
pub use library::ComponentLibrary;
pub use link::{ControllerMap, Endpoint, Link, LinkIndex};
pub use op::{EditOp, EditStep};
pub use types::{TypeConfig, TypeRegistry};
pub use vertex::{Direction, Port, Ports, Vertex};
pub use workbench::Workbench;
