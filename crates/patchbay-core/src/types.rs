//! Edge type configuration.
//!
//! Connection semantics are parameterized by edge type: whether the type is
//! "simple" (drawn and indexed as direct vertex-to-vertex links, no edge node
//! materialized), how many source/destination ports an edge of the type may
//! carry, and the display label given to freshly created edges. The
//! configuration is consumed from an external collaborator as a map from type
//! tag to [`TypeConfig`]; [`TypeRegistry`] wraps that map and answers lookups
//! for unknown tags with a permissive fallback.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::vertex::Direction;

/// Connection rules for one edge type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeConfig {
    /// Simple types connect two ports directly without materializing an edge
    /// node in the link graph.
    pub simple: bool,
    /// Maximum number of source-side (outbound-port) connections on one edge.
    /// `None` means uncapped. Values below 1 are treated as 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sources: Option<u32>,
    /// Maximum number of destination-side (inbound-port) connections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_destinations: Option<u32>,
    /// UI hint: edge nodes of this type are not rendered. Carried, not
    /// interpreted.
    pub hidden: bool,
    /// Display label stamped onto edges created with this type.
    pub label: String,
}

impl TypeConfig {
    /// Fallback configuration for tags missing from the registry: complex,
    /// uncapped, visible, labeled with the tag itself.
    pub fn fallback(tag: &str) -> Self {
        TypeConfig {
            simple: false,
            max_sources: None,
            max_destinations: None,
            hidden: false,
            label: tag.to_string(),
        }
    }

    /// The connection cap for the side a port of `direction` attaches to:
    /// outbound ports feed an edge (sources), inbound ports drain it
    /// (destinations).
    pub fn side_limit(&self, direction: Direction) -> Option<u32> {
        let raw = match direction {
            Direction::Out => self.max_sources,
            Direction::In => self.max_destinations,
        };
        raw.map(|n| n.max(1))
    }

    /// True when a port of `direction` on an edge of this type is in the
    /// "simple with max cardinality 1" regime -- point-to-point, replaced by
    /// eviction rather than disconnected ahead of a reconnect.
    pub fn simple_unit(&self, direction: Direction) -> bool {
        self.simple && self.side_limit(direction) == Some(1)
    }
}

/// Registry of edge type configurations, keyed by type tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct TypeRegistry {
    configs: IndexMap<String, TypeConfig>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    /// The built-in circuit set: `WIRE` (single driver, any number of
    /// readers) and `CHANNEL` (uncapped broadcast).
    pub fn standard() -> Self {
        let mut registry = TypeRegistry::new();
        registry.register(
            "WIRE",
            TypeConfig {
                simple: false,
                max_sources: Some(1),
                max_destinations: None,
                hidden: false,
                label: "wire".to_string(),
            },
        );
        registry.register(
            "CHANNEL",
            TypeConfig {
                simple: false,
                max_sources: None,
                max_destinations: None,
                hidden: false,
                label: "channel".to_string(),
            },
        );
        registry
    }

    /// Registers (or replaces) the configuration for `tag`.
    pub fn register(&mut self, tag: impl Into<String>, config: TypeConfig) {
        self.configs.insert(tag.into(), config);
    }

    /// Returns the registered configuration, if any.
    pub fn get(&self, tag: &str) -> Option<&TypeConfig> {
        self.configs.get(tag)
    }

    /// Returns the effective configuration for `tag`, falling back to
    /// [`TypeConfig::fallback`] for unknown tags.
    pub fn config(&self, tag: &str) -> TypeConfig {
        self.configs
            .get(tag)
            .cloned()
            .unwrap_or_else(|| TypeConfig::fallback(tag))
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}
