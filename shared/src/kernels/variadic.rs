use super::super::kernel::{GraphContext, Kernel, NodeId};
use super::super::operation_registry::OperationRegistry;

// Factories below ignore the `&NodeDefinition` argument: none of these
// operations take per-node configuration.

fn parent_values(node_id: NodeId, graph: &dyn GraphContext) -> impl Iterator<Item = f64> + '_ {
    graph
        .parent_ids(node_id)
        .iter()
        .map(move |&id| graph.value(id))
}

/// `SUM`: empty-input identity is `0.0`.
struct Sum;
impl Kernel for Sum {
    fn compute(&mut self, node_id: NodeId, graph: &dyn GraphContext) -> f64 {
        parent_values(node_id, graph).sum()
    }
}

/// `PRODUCT`: empty-input identity is `1.0`.
struct Product;
impl Kernel for Product {
    fn compute(&mut self, node_id: NodeId, graph: &dyn GraphContext) -> f64 {
        parent_values(node_id, graph).product()
    }
}

/// `MIN`: empty input returns `NaN`.
struct Min;
impl Kernel for Min {
    fn compute(&mut self, node_id: NodeId, graph: &dyn GraphContext) -> f64 {
        let mut values = parent_values(node_id, graph);
        match values.next() {
            None => f64::NAN,
            Some(first) => values.fold(first, f64::min),
        }
    }
}

/// `MAX`: empty input returns `NaN`.
struct Max;
impl Kernel for Max {
    fn compute(&mut self, node_id: NodeId, graph: &dyn GraphContext) -> f64 {
        let mut values = parent_values(node_id, graph);
        match values.next() {
            None => f64::NAN,
            Some(first) => values.fold(first, f64::max),
        }
    }
}

/// `AVG`: empty input returns `NaN`.
struct Avg;
impl Kernel for Avg {
    fn compute(&mut self, node_id: NodeId, graph: &dyn GraphContext) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for v in parent_values(node_id, graph) {
            sum += v;
            count += 1;
        }
        if count == 0 {
            f64::NAN
        } else {
            sum / count as f64
        }
    }
}

pub(crate) fn register(registry: &OperationRegistry) {
    registry
        .register_variadic("SUM", |_| Box::new(Sum), false, "Sum of all parent values")
        .unwrap();
    registry
        .register_variadic("PRODUCT", |_| Box::new(Product), false, "Product of all parent values")
        .unwrap();
    registry
        .register_variadic("MIN", |_| Box::new(Min), false, "Minimum of all parent values")
        .unwrap();
    registry
        .register_variadic("MAX", |_| Box::new(Max), false, "Maximum of all parent values")
        .unwrap();
    registry
        .register_variadic("AVG", |_| Box::new(Avg), false, "Mean of all parent values")
        .unwrap();
}
