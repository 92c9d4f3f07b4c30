use super::value::Scalar;
use std::collections::HashMap;

/// Whether a node is driven externally (`Input`) or derives its value from
/// an operation applied to its parents (`Compute`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
pub enum NodeKind {
    Input,
    Compute,
}

/// A user-facing, immutable description of one node in the graph.
///
/// `NodeDefinition`s are produced by the caller and consumed exactly once
/// by the compiler (`flux_engine::compiler::Compiler::compile`); they are
/// never mutated in place, and insertion order among a definition list is
/// significant — it becomes the node id assignment (see
/// `flux_engine::graph::CompiledGraph`).
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDefinition {
    /// Non-empty, unique across the whole definition list.
    pub name: String,
    pub kind: NodeKind,
    /// Registered operation identifier. Ignored for `NodeKind::Input`.
    pub operation: String,
    /// Ordered parent names. Empty for `NodeKind::Input`.
    pub parents: Vec<String>,
    /// Seed value written into `CompiledGraph::values` at compile time.
    pub initial_value: Scalar,
    /// Per-node integer configuration for operations that need it, e.g.
    /// `SMA`'s `lookback`. Ignored by operations that don't look any key
    /// up. Empty for most nodes.
    pub parameters: HashMap<String, i64>,
}

impl NodeDefinition {
    /// Convenience constructor for an input node.
    pub fn input(name: impl Into<String>, initial_value: Scalar) -> NodeDefinition {
        NodeDefinition {
            name: name.into(),
            kind: NodeKind::Input,
            operation: String::new(),
            parents: Vec::new(),
            initial_value,
            parameters: HashMap::new(),
        }
    }

    /// Convenience constructor for a compute node.
    pub fn compute(
        name: impl Into<String>,
        operation: impl Into<String>,
        parents: Vec<impl Into<String>>,
    ) -> NodeDefinition {
        NodeDefinition {
            name: name.into(),
            kind: NodeKind::Compute,
            operation: operation.into(),
            parents: parents.into_iter().map(Into::into).collect(),
            initial_value: 0.0,
            parameters: HashMap::new(),
        }
    }

    /// Convenience constructor for an `SMA(lookback)` node over one
    /// parent.
    pub fn sma(name: impl Into<String>, parent: impl Into<String>, lookback: i64) -> NodeDefinition {
        let mut def = NodeDefinition::compute(name, "SMA", vec![parent.into()]);
        def.parameters.insert("lookback".to_string(), lookback);
        def
    }

    pub fn with_initial_value(mut self, value: Scalar) -> NodeDefinition {
        self.initial_value = value;
        self
    }
}
