use crate::graph::CompiledGraph;
use flux_shared::kernel::NodeId;
use flux_shared::node_def::{NodeDefinition, NodeKind};
use flux_shared::operation_registry::{Arity, OperationRegistry};
use log::debug;
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

/// Compile-time structural errors. The compiler returns these without
/// producing a graph; no partial graph is ever exposed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("duplicate node name \"{name}\" at definitions {first_index} and {second_index}")]
    DuplicateName {
        name: String,
        first_index: usize,
        second_index: usize,
    },

    #[error("node \"{node}\" references unknown parent \"{parent}\"")]
    UnknownParent { node: String, parent: String },

    #[error("node \"{node}\" references unknown operation \"{operation}\"")]
    UnknownOperation { node: String, operation: String },

    #[error("node \"{node}\" operation \"{operation}\" expects {expected} parents, got {got}")]
    ArityMismatch {
        node: String,
        operation: String,
        expected: usize,
        got: usize,
    },

    #[error("cycle detected; nodes with unresolved dependencies: {nodes:?}")]
    Cycle { nodes: Vec<String> },

    #[error("node \"{node}\" has a non-positive lookback ({lookback})")]
    NonPositiveLookback { node: String, lookback: i64 },
}

/// Transforms a non-empty, ordered list of `NodeDefinition`s into a
/// `CompiledGraph`. Deterministic: identical inputs (same definitions in
/// the same order, same registry contents) always produce an identical
/// compiled graph.
pub struct Compiler;

impl Compiler {
    pub fn compile(
        definitions: &[NodeDefinition],
        registry: &OperationRegistry,
    ) -> Result<CompiledGraph, CompileError> {
        let node_count = definitions.len();

        // --- Step 1: ID assignment -----------------------------------
        let mut names = Vec::with_capacity(node_count);
        let mut name_to_id = HashMap::with_capacity(node_count);
        let mut input_name_to_id = HashMap::new();
        let mut kinds = Vec::with_capacity(node_count);

        for (index, def) in definitions.iter().enumerate() {
            if let Some(&first_id) = name_to_id.get(&def.name) {
                return Err(CompileError::DuplicateName {
                    name: def.name.clone(),
                    first_index: first_id as usize,
                    second_index: index,
                });
            }
            let id = index as NodeId;
            name_to_id.insert(def.name.clone(), id);
            if def.kind == NodeKind::Input {
                input_name_to_id.insert(def.name.clone(), id);
            }
            names.push(def.name.clone());
            kinds.push(def.kind);
        }

        // --- Step 2: parent CSR + arity validation -------------------
        let mut parent_counts = vec![0u32; node_count];
        let mut parent_id_lists: Vec<Vec<NodeId>> = Vec::with_capacity(node_count);

        for def in definitions.iter() {
            let mut parent_ids = Vec::with_capacity(def.parents.len());
            for parent_name in &def.parents {
                let parent_id = name_to_id.get(parent_name).copied().ok_or_else(|| {
                    CompileError::UnknownParent {
                        node: def.name.clone(),
                        parent: parent_name.clone(),
                    }
                })?;
                parent_ids.push(parent_id);
            }
            parent_id_lists.push(parent_ids);
        }
        for (id, parents) in parent_id_lists.iter().enumerate() {
            parent_counts[id] = parents.len() as u32;
        }

        let mut parent_offsets = vec![0u32; node_count + 1];
        for i in 0..node_count {
            parent_offsets[i + 1] = parent_offsets[i] + parent_counts[i];
        }
        let edge_count = parent_offsets[node_count] as usize;
        let mut parent_ids = vec![0 as NodeId; edge_count];
        for (id, parents) in parent_id_lists.iter().enumerate() {
            let start = parent_offsets[id] as usize;
            parent_ids[start..start + parents.len()].copy_from_slice(parents);
        }

        let mut stateful = vec![false; node_count];
        for (id, def) in definitions.iter().enumerate() {
            if def.kind != NodeKind::Compute {
                continue;
            }
            let arity = registry.arity(&def.operation).ok_or_else(|| CompileError::UnknownOperation {
                node: def.name.clone(),
                operation: def.operation.clone(),
            })?;
            if let Arity::Fixed(expected) = arity {
                let got = parent_counts[id] as usize;
                if expected != got {
                    return Err(CompileError::ArityMismatch {
                        node: def.name.clone(),
                        operation: def.operation.clone(),
                        expected,
                        got,
                    });
                }
            }
            if let Some(&lookback) = def.parameters.get("lookback") {
                if lookback <= 0 {
                    return Err(CompileError::NonPositiveLookback {
                        node: def.name.clone(),
                        lookback,
                    });
                }
            }
            stateful[id] = registry.is_stateful(&def.operation).unwrap_or(false);
        }

        // --- Step 3: child CSR (transpose of the parent relation) ----
        let mut child_counts = vec![0u32; node_count];
        for &parent_id in parent_ids.iter() {
            child_counts[parent_id as usize] += 1;
        }
        let mut child_offsets = vec![0u32; node_count + 1];
        for i in 0..node_count {
            child_offsets[i + 1] = child_offsets[i] + child_counts[i];
        }
        let mut child_ids = vec![0 as NodeId; edge_count];
        let mut cursor = child_offsets.clone();
        for (child_id, parents) in parent_id_lists.iter().enumerate() {
            for &parent_id in parents {
                let slot = cursor[parent_id as usize] as usize;
                child_ids[slot] = child_id as NodeId;
                cursor[parent_id as usize] += 1;
            }
        }

        // --- Step 4: Kahn's topological sort --------------------------
        let mut in_degree: Vec<u32> = parent_counts.clone();
        let mut queue: VecDeque<NodeId> = VecDeque::new();
        for id in 0..node_count {
            if in_degree[id] == 0 {
                queue.push_back(id as NodeId);
            }
        }
        let mut full_topo_order = Vec::with_capacity(node_count);
        while let Some(n) = queue.pop_front() {
            full_topo_order.push(n);
            let start = child_offsets[n as usize] as usize;
            let end = child_offsets[n as usize + 1] as usize;
            for &child in &child_ids[start..end] {
                in_degree[child as usize] -= 1;
                if in_degree[child as usize] == 0 {
                    queue.push_back(child);
                }
            }
        }
        if full_topo_order.len() != node_count {
            let residual: Vec<String> = (0..node_count)
                .filter(|&id| in_degree[id] > 0)
                .map(|id| names[id].clone())
                .collect();
            return Err(CompileError::Cycle { nodes: residual });
        }

        debug!(
            "compiled graph: {} nodes, {} edges, topo order {:?}",
            node_count, edge_count, full_topo_order
        );

        // --- Step 5: kernel binding ------------------------------------
        let mut kernels = Vec::with_capacity(node_count);
        let mut compute_order = Vec::new();
        for &id in &full_topo_order {
            let def = &definitions[id as usize];
            match def.kind {
                NodeKind::Input => kernels.push(None),
                NodeKind::Compute => {
                    let kernel = registry
                        .create_kernel(&def.operation, def)
                        .expect("operation existence already validated in step 2");
                    kernels.push(Some(kernel));
                    compute_order.push(id);
                }
            }
        }
        // `kernels` above was pushed in topo order, but `CompiledGraph`
        // indexes it by node id; re-sort into id order.
        let mut kernels_by_id: Vec<Option<Box<dyn flux_shared::kernel::Kernel>>> =
            (0..node_count).map(|_| None).collect();
        for (topo_pos, &id) in full_topo_order.iter().enumerate() {
            kernels_by_id[id as usize] = kernels[topo_pos].take();
        }

        // --- Step 6: value initialization ------------------------------
        let values: Vec<f64> = definitions.iter().map(|def| def.initial_value).collect();

        let input_count = kinds.iter().filter(|k| **k == NodeKind::Input).count();
        let compute_count = compute_order.len();

        Ok(CompiledGraph {
            node_count,
            input_count,
            compute_count,
            names,
            name_to_id,
            input_name_to_id,
            kinds,
            stateful,
            values,
            kernels: kernels_by_id,
            parent_counts,
            parent_offsets,
            parent_ids,
            child_offsets,
            child_ids,
            compute_order,
            full_topo_order,
            edge_count,
        })
    }
}
