use super::value::Scalar;

/// Identifies a node within a compiled graph. Assigned by the compiler as
/// the node's position in the original definition list, `0..node_count`.
pub type NodeId = u32;

/// The read-only surface a `Kernel` is allowed to see of the graph it
/// belongs to.
///
/// This is the *only* legal path a kernel has to its parents' values: it
/// asks the graph for its own parent id list, then asks the graph for
/// each parent's value. A kernel never holds a pointer or index into the
/// values buffer itself, which is what lets the whole value plane live in
/// one contiguous, relocatable buffer (`flux_engine::graph::CompiledGraph`
/// owns it; kernels only ever see it through this trait).
pub trait GraphContext {
    /// Current value of `id`. `O(1)`, allocation-free.
    fn value(&self, id: NodeId) -> Scalar;

    /// The ordered parent ids of `id`. `O(1)`, allocation-free — a slice
    /// into the graph's CSR `parent_ids` array.
    fn parent_ids(&self, id: NodeId) -> &[NodeId];
}

/// The computation attached to one compute node.
///
/// Stateless kernels (the arithmetic/variadic built-ins) are pure
/// functions of their parents' current values and may be shared across
/// nodes if an operation's factory chooses to. Stateful kernels (e.g. the
/// simple moving average) additionally carry per-node state that
/// advances on every `compute` call; the operation registry's contract
/// guarantees a stateful operation's factory is invoked once per node so
/// no two nodes ever alias the same kernel instance.
///
/// `compute` is contracted to be non-blocking and allocation-free on the
/// hot path: no I/O, no heap allocation, no locking.
pub trait Kernel: Send {
    /// Compute this node's new value given the current values of its
    /// parents, reachable only through `graph`.
    fn compute(&mut self, node_id: NodeId, graph: &dyn GraphContext) -> Scalar;

    /// Clears any per-node state back to its just-constructed baseline.
    /// A no-op for stateless kernels.
    fn reset(&mut self) {}

    /// Whether this kernel has seen enough `compute` calls to report a
    /// fully warmed-up value. Stateless kernels are always ready.
    fn is_ready(&self) -> bool {
        true
    }

    /// Number of times `compute` has been called on this instance.
    /// Stateless kernels do not track this and report 0.
    fn evaluation_count(&self) -> u64 {
        0
    }
}
