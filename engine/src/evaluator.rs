use crate::bitset::Bitset;
use crate::error::EvalError;
use crate::graph::CompiledGraph;
use flux_shared::kernel::NodeId;
use flux_shared::value::{bits_eq, Scalar};
use log::trace;
use std::time::Instant;

/// Which traversal strategy `Evaluator::evaluate` uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationMode {
    /// Recomputes every compute node, in topological order, on every tick.
    Full,
    /// Recomputes only the compute nodes reachable from the inputs set
    /// since the last `evaluate()` call, via a mark-and-sweep pass.
    Incremental,
}

/// Running counters an `Evaluator` accumulates across calls to
/// `evaluate()`, reset on demand via `reset_stats`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluatorStats {
    pub mode: EvaluationMode,
    pub evaluation_count: u64,
    pub total_nodes_computed: u64,
    pub total_elapsed_nanos: u64,
}

impl EvaluatorStats {
    fn new(mode: EvaluationMode) -> EvaluatorStats {
        EvaluatorStats {
            mode,
            evaluation_count: 0,
            total_nodes_computed: 0,
            total_elapsed_nanos: 0,
        }
    }
}

/// Drives repeated evaluation of a `CompiledGraph`: tracks which inputs
/// changed since the last tick, and recomputes only what those changes
/// could have affected when running in `EvaluationMode::Incremental`.
pub struct Evaluator {
    graph: CompiledGraph,
    mode: EvaluationMode,
    dirty_inputs: Bitset,
    needs_recompute: Bitset,
    dfs_stack: Vec<NodeId>,
    unconditional_stateful_dirtying: bool,
    stats: EvaluatorStats,
}

impl Evaluator {
    /// Builds an evaluator for `graph` in `mode`.
    ///
    /// `EvaluationMode::Incremental` requires every stateful kernel to be
    /// dirtied unconditionally on each tick, because a stateful kernel's
    /// output depends on how many times it has been called, not only on
    /// whether its declared inputs changed; skipping a call silently
    /// desynchronizes its internal state from wall-clock ticks. An
    /// evaluator built with `new` refuses that combination outright; use
    /// `new_with_unconditional_stateful_dirtying` once you've decided
    /// that's the behavior you want.
    pub fn new(graph: CompiledGraph, mode: EvaluationMode) -> Result<Evaluator, EvalError> {
        if mode == EvaluationMode::Incremental
            && graph.compute_order().iter().any(|&id| graph.is_stateful(id))
        {
            return Err(EvalError::StatefulIncrementalUnguarded);
        }
        Ok(Evaluator::build(graph, mode, false))
    }

    /// Like `new`, but allows `EvaluationMode::Incremental` with stateful
    /// kernels present, by marking every stateful compute node dirty on
    /// every `evaluate()` call regardless of which inputs changed.
    pub fn new_with_unconditional_stateful_dirtying(
        graph: CompiledGraph,
        mode: EvaluationMode,
    ) -> Evaluator {
        Evaluator::build(graph, mode, true)
    }

    fn build(graph: CompiledGraph, mode: EvaluationMode, unconditional_stateful_dirtying: bool) -> Evaluator {
        let node_count = graph.node_count();
        trace!(
            "evaluator constructed in {:?} mode (unconditional_stateful_dirtying={})",
            mode, unconditional_stateful_dirtying
        );
        Evaluator {
            dirty_inputs: Bitset::new(node_count),
            needs_recompute: Bitset::new(node_count),
            dfs_stack: Vec::with_capacity(node_count),
            unconditional_stateful_dirtying,
            stats: EvaluatorStats::new(mode),
            mode,
            graph,
        }
    }

    pub fn graph(&self) -> &CompiledGraph {
        &self.graph
    }

    pub fn mode(&self) -> EvaluationMode {
        self.mode
    }

    pub fn set_input(&mut self, id: NodeId, value: Scalar) -> Result<(), EvalError> {
        let old = self.graph.get_value(id);
        self.graph.set_input(id, value)?;
        if self.mode == EvaluationMode::Incremental && !bits_eq(old, value) {
            self.dirty_inputs.set(id);
        }
        Ok(())
    }

    pub fn set_input_by_name(&mut self, name: &str, value: Scalar) -> Result<(), EvalError> {
        let id = self
            .graph
            .id_of(name)
            .ok_or_else(|| EvalError::UnknownInput(name.to_string()))?;
        self.set_input(id, value)
    }

    pub fn set_inputs(&mut self, ids: &[NodeId], values: &[Scalar]) -> Result<(), EvalError> {
        if ids.len() != values.len() {
            return Err(EvalError::BatchLengthMismatch {
                ids: ids.len(),
                values: values.len(),
            });
        }
        for (&id, &value) in ids.iter().zip(values.iter()) {
            self.set_input(id, value)?;
        }
        Ok(())
    }

    /// Marks `id` as needing recomputation on the next `evaluate()`
    /// without changing its value. Has no effect in `EvaluationMode::Full`.
    pub fn mark_dirty(&mut self, id: NodeId) {
        if self.mode == EvaluationMode::Incremental {
            self.dirty_inputs.set(id);
        }
    }

    pub fn get_value(&self, id: NodeId) -> Scalar {
        self.graph.get_value(id)
    }

    pub fn get_value_by_name(&self, name: &str) -> Result<Scalar, EvalError> {
        self.graph.get_value_by_name(name)
    }

    pub fn is_input(&self, name: &str) -> bool {
        self.graph.is_input(name)
    }

    pub fn stats(&self) -> EvaluatorStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = EvaluatorStats::new(self.mode);
    }

    /// Recomputes the graph for the current tick and returns the number
    /// of compute nodes actually recomputed.
    pub fn evaluate(&mut self) -> u32 {
        let started = Instant::now();
        let computed = match self.mode {
            EvaluationMode::Full => self.evaluate_full(),
            EvaluationMode::Incremental => self.evaluate_incremental(),
        };
        self.dirty_inputs.clear();

        self.stats.evaluation_count += 1;
        self.stats.total_nodes_computed += computed as u64;
        self.stats.total_elapsed_nanos += started.elapsed().as_nanos() as u64;
        trace!("evaluate() in {:?} mode recomputed {} nodes", self.mode, computed);
        computed
    }

    fn evaluate_full(&mut self) -> u32 {
        let order_len = self.graph.compute_order().len();
        for i in 0..order_len {
            let id = self.graph.compute_order()[i];
            self.graph.recompute(id);
        }
        order_len as u32
    }

    fn evaluate_incremental(&mut self) -> u32 {
        self.mark_reachable_from_dirty_inputs();
        if self.unconditional_stateful_dirtying {
            for i in 0..self.graph.compute_order().len() {
                let id = self.graph.compute_order()[i];
                if self.graph.is_stateful(id) {
                    self.needs_recompute.set(id);
                }
            }
        }

        let mut computed = 0u32;
        let order_len = self.graph.compute_order().len();
        for i in 0..order_len {
            let id = self.graph.compute_order()[i];
            if self.needs_recompute.get(id) {
                self.graph.recompute(id);
                computed += 1;
            }
        }
        computed
    }

    /// Depth-first mark phase: walks forward from every dirty input
    /// through the child relation, setting `needs_recompute` on every
    /// compute node reachable from a changed input. Children are pushed
    /// in reverse index order so the DFS visits them in their natural
    /// (ascending id) order, keeping the mark phase deterministic.
    fn mark_reachable_from_dirty_inputs(&mut self) {
        self.needs_recompute.clear();
        self.dfs_stack.clear();

        for id in self.dirty_inputs.iter_ones() {
            for &child in self.graph.children_of(id).iter().rev() {
                self.dfs_stack.push(child);
            }
        }

        while let Some(node) = self.dfs_stack.pop() {
            if self.needs_recompute.get(node) {
                continue;
            }
            self.needs_recompute.set(node);
            for &child in self.graph.children_of(node).iter().rev() {
                self.dfs_stack.push(child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use flux_shared::node_def::NodeDefinition;
    use flux_shared::operation_registry::OperationRegistry;

    fn trivial_sum_graph() -> CompiledGraph {
        let registry = OperationRegistry::standard();
        let defs = vec![
            NodeDefinition::input("a", 1.0),
            NodeDefinition::input("b", 2.0),
            NodeDefinition::compute("sum", "ADD", vec!["a", "b"]),
        ];
        Compiler::compile(&defs, &registry).unwrap()
    }

    #[test]
    fn full_mode_recomputes_every_compute_node() {
        let graph = trivial_sum_graph();
        let mut evaluator = Evaluator::new(graph, EvaluationMode::Full).unwrap();
        let computed = evaluator.evaluate();
        assert_eq!(computed, 1);
        assert_eq!(evaluator.get_value_by_name("sum").unwrap(), 3.0);
    }

    #[test]
    fn incremental_mode_recomputes_only_dirty_reachable_nodes() {
        let registry = OperationRegistry::standard();
        let defs = vec![
            NodeDefinition::input("a", 1.0),
            NodeDefinition::input("b", 2.0),
            NodeDefinition::compute("left", "ADD", vec!["a", "a"]),
            NodeDefinition::compute("right", "ADD", vec!["b", "b"]),
        ];
        let graph = Compiler::compile(&defs, &registry).unwrap();
        let mut evaluator = Evaluator::new(graph, EvaluationMode::Incremental).unwrap();
        evaluator.evaluate();

        let a_id = evaluator.graph().id_of("a").unwrap();
        evaluator.set_input(a_id, 10.0).unwrap();
        let computed = evaluator.evaluate();
        assert_eq!(computed, 1);
        assert_eq!(evaluator.get_value_by_name("left").unwrap(), 20.0);
        assert_eq!(evaluator.get_value_by_name("right").unwrap(), 4.0);
    }

    #[test]
    fn incremental_mode_rejects_stateful_kernels_without_the_guard() {
        let registry = OperationRegistry::standard();
        let defs = vec![
            NodeDefinition::input("price", 1.0),
            NodeDefinition::sma("avg", "price", 3),
        ];
        let graph = Compiler::compile(&defs, &registry).unwrap();
        let err = Evaluator::new(graph, EvaluationMode::Incremental).unwrap_err();
        assert_eq!(err, EvalError::StatefulIncrementalUnguarded);
    }

    #[test]
    fn unconditional_stateful_dirtying_recomputes_sma_every_tick() {
        let registry = OperationRegistry::standard();
        let defs = vec![
            NodeDefinition::input("price", 1.0),
            NodeDefinition::input("unrelated", 0.0),
            NodeDefinition::sma("avg", "price", 3),
        ];
        let graph = Compiler::compile(&defs, &registry).unwrap();
        let mut evaluator =
            Evaluator::new_with_unconditional_stateful_dirtying(graph, EvaluationMode::Incremental);
        evaluator.evaluate();

        let unrelated_id = evaluator.graph().id_of("unrelated").unwrap();
        evaluator.set_input(unrelated_id, 5.0).unwrap();
        let computed = evaluator.evaluate();
        assert_eq!(computed, 1);
    }

    #[test]
    fn stats_accumulate_across_evaluations() {
        let graph = trivial_sum_graph();
        let mut evaluator = Evaluator::new(graph, EvaluationMode::Full).unwrap();
        evaluator.evaluate();
        evaluator.evaluate();
        let stats = evaluator.stats();
        assert_eq!(stats.evaluation_count, 2);
        assert_eq!(stats.total_nodes_computed, 2);

        evaluator.reset_stats();
        assert_eq!(evaluator.stats().evaluation_count, 0);
    }

    #[test]
    fn set_inputs_rejects_batch_length_mismatch() {
        let graph = trivial_sum_graph();
        let mut evaluator = Evaluator::new(graph, EvaluationMode::Full).unwrap();
        let a_id = evaluator.graph().id_of("a").unwrap();
        let err = evaluator.set_inputs(&[a_id], &[1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            EvalError::BatchLengthMismatch { ids: 1, values: 2 }
        );
    }

    #[test]
    fn setting_an_input_to_its_current_value_does_not_dirty_it() {
        let graph = trivial_sum_graph();
        let mut evaluator = Evaluator::new(graph, EvaluationMode::Incremental).unwrap();
        evaluator.evaluate();

        let a_id = evaluator.graph().id_of("a").unwrap();
        let current = evaluator.get_value(a_id);
        evaluator.set_input(a_id, current).unwrap();
        assert_eq!(evaluator.evaluate(), 0);
    }

    #[test]
    fn setting_an_input_to_nan_always_dirties_it() {
        let graph = trivial_sum_graph();
        let mut evaluator = Evaluator::new(graph, EvaluationMode::Incremental).unwrap();
        evaluator.evaluate();

        let a_id = evaluator.graph().id_of("a").unwrap();
        evaluator.set_input(a_id, f64::NAN).unwrap();
        evaluator.evaluate();
        evaluator.set_input(a_id, f64::NAN).unwrap();
        assert_eq!(evaluator.evaluate(), 1);
    }
}
