use crate::error::EvalError;
use flux_shared::kernel::{GraphContext, Kernel, NodeId};
use flux_shared::node_def::NodeKind;
use flux_shared::value::Scalar;
use std::collections::HashMap;

/// The immutable-structure, mutable-values runtime representation a
/// `Compiler` produces from a list of `NodeDefinition`s.
///
/// Structural arrays (`names`, the CSR pairs, the topological orders) are
/// fixed for the lifetime of the graph; only `values` (and whatever
/// internal state a stateful kernel carries) changes across evaluations.
/// `CompiledGraph` implements `GraphContext` so kernels can read parent
/// values through the one legal path: ask the graph for parent ids, then
/// ask the graph for each id's value.
pub struct CompiledGraph {
    pub(crate) node_count: usize,
    pub(crate) input_count: usize,
    pub(crate) compute_count: usize,

    pub(crate) names: Vec<String>,
    pub(crate) name_to_id: HashMap<String, NodeId>,
    pub(crate) input_name_to_id: HashMap<String, NodeId>,
    pub(crate) kinds: Vec<NodeKind>,
    /// Whether the compute node at this id was bound to a stateful
    /// operation. `false` (meaningless) for input nodes.
    pub(crate) stateful: Vec<bool>,

    pub(crate) values: Vec<Scalar>,
    pub(crate) kernels: Vec<Option<Box<dyn Kernel>>>,

    pub(crate) parent_counts: Vec<u32>,
    pub(crate) parent_offsets: Vec<u32>,
    pub(crate) parent_ids: Vec<NodeId>,

    pub(crate) child_offsets: Vec<u32>,
    pub(crate) child_ids: Vec<NodeId>,

    pub(crate) compute_order: Vec<NodeId>,
    pub(crate) full_topo_order: Vec<NodeId>,

    pub(crate) edge_count: usize,
}

/// Byte footprint of the graph's structural and value arrays, broken
/// down by array, for diagnostics (spec.md §4.2: "a structural
/// memory-footprint accessor for diagnostics").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryFootprint {
    pub values_bytes: usize,
    pub parent_csr_bytes: usize,
    pub child_csr_bytes: usize,
    pub topo_order_bytes: usize,
    pub names_bytes: usize,
}

impl MemoryFootprint {
    pub fn total_bytes(&self) -> usize {
        self.values_bytes
            + self.parent_csr_bytes
            + self.child_csr_bytes
            + self.topo_order_bytes
            + self.names_bytes
    }
}

impl CompiledGraph {
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn compute_count(&self) -> usize {
        self.compute_count
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn compute_order(&self) -> &[NodeId] {
        &self.compute_order
    }

    pub fn full_topo_order(&self) -> &[NodeId] {
        &self.full_topo_order
    }

    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.name_to_id.get(name).copied()
    }

    pub fn name_of(&self, id: NodeId) -> &str {
        &self.names[id as usize]
    }

    pub fn is_input(&self, name: &str) -> bool {
        self.input_name_to_id.contains_key(name)
    }

    pub fn is_input_id(&self, id: NodeId) -> bool {
        self.kinds[id as usize] == NodeKind::Input
    }

    pub fn is_stateful(&self, id: NodeId) -> bool {
        self.stateful[id as usize]
    }

    /// `O(1)` value lookup by id.
    pub fn get_value(&self, id: NodeId) -> Scalar {
        self.values[id as usize]
    }

    /// `O(1)` value lookup by name.
    pub fn get_value_by_name(&self, name: &str) -> Result<Scalar, EvalError> {
        let id = self
            .name_to_id
            .get(name)
            .ok_or_else(|| EvalError::UnknownInput(name.to_string()))?;
        Ok(self.values[*id as usize])
    }

    /// Writes `values[id]` directly, bypassing dirty tracking. Used by
    /// `Evaluator::set_input`/`set_inputs`, which layer dirty tracking on
    /// top for `EvaluationMode::Incremental`.
    pub fn set_input(&mut self, id: NodeId, value: Scalar) -> Result<(), EvalError> {
        if !self.is_input_id(id) {
            return Err(EvalError::UnknownInput(self.names[id as usize].clone()));
        }
        self.values[id as usize] = value;
        Ok(())
    }

    pub fn set_input_by_name(&mut self, name: &str, value: Scalar) -> Result<(), EvalError> {
        let id = *self
            .input_name_to_id
            .get(name)
            .ok_or_else(|| EvalError::UnknownInput(name.to_string()))?;
        self.values[id as usize] = value;
        Ok(())
    }

    /// Half-open index range into `parent_ids` for node `id`.
    /// Allocation-free.
    pub fn parent_range(&self, id: NodeId) -> std::ops::Range<usize> {
        let i = id as usize;
        self.parent_offsets[i] as usize..self.parent_offsets[i + 1] as usize
    }

    /// Half-open index range into `child_ids` for node `id`.
    /// Allocation-free.
    pub fn child_range(&self, id: NodeId) -> std::ops::Range<usize> {
        let i = id as usize;
        self.child_offsets[i] as usize..self.child_offsets[i + 1] as usize
    }

    pub fn parents_of(&self, id: NodeId) -> &[NodeId] {
        &self.parent_ids[self.parent_range(id)]
    }

    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        &self.child_ids[self.child_range(id)]
    }

    /// Runs the kernel bound to `id` and writes its result into
    /// `values[id]`. Panics if `id` is not a compute node — callers
    /// (`Evaluator`) only ever invoke this for ids drawn from
    /// `compute_order`, which contains only compute nodes by
    /// construction.
    pub(crate) fn recompute(&mut self, id: NodeId) {
        let mut kernel = self.kernels[id as usize]
            .take()
            .expect("recompute called on a node with no kernel");
        let value = kernel.compute(id, &*self);
        self.kernels[id as usize] = Some(kernel);
        self.values[id as usize] = value;
    }

    pub fn memory_footprint(&self) -> MemoryFootprint {
        use std::mem::size_of;
        MemoryFootprint {
            values_bytes: self.values.len() * size_of::<Scalar>(),
            parent_csr_bytes: self.parent_offsets.len() * size_of::<u32>()
                + self.parent_ids.len() * size_of::<NodeId>(),
            child_csr_bytes: self.child_offsets.len() * size_of::<u32>()
                + self.child_ids.len() * size_of::<NodeId>(),
            topo_order_bytes: (self.compute_order.len() + self.full_topo_order.len())
                * size_of::<NodeId>(),
            names_bytes: self.names.iter().map(|n| n.len()).sum(),
        }
    }
}

impl GraphContext for CompiledGraph {
    fn value(&self, id: NodeId) -> Scalar {
        self.values[id as usize]
    }

    fn parent_ids(&self, id: NodeId) -> &[NodeId] {
        self.parents_of(id)
    }
}
