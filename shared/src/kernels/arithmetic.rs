use super::super::kernel::{GraphContext, Kernel, NodeId};
use super::super::node_def::NodeDefinition;
use super::super::operation_registry::OperationRegistry;

fn parent(graph: &dyn GraphContext, node_id: NodeId, index: usize) -> f64 {
    let id = graph.parent_ids(node_id)[index];
    graph.value(id)
}

macro_rules! binary_kernel {
    ($struct_name:ident, $op:expr) => {
        struct $struct_name;
        impl Kernel for $struct_name {
            fn compute(&mut self, node_id: NodeId, graph: &dyn GraphContext) -> f64 {
                let a = parent(graph, node_id, 0);
                let b = parent(graph, node_id, 1);
                let op: fn(f64, f64) -> f64 = $op;
                op(a, b)
            }
        }
    };
}

macro_rules! unary_kernel {
    ($struct_name:ident, $op:expr) => {
        struct $struct_name;
        impl Kernel for $struct_name {
            fn compute(&mut self, node_id: NodeId, graph: &dyn GraphContext) -> f64 {
                let x = parent(graph, node_id, 0);
                let op: fn(f64) -> f64 = $op;
                op(x)
            }
        }
    };
}

// Division by zero and other exceptional results follow IEEE-754 float
// semantics (±∞ or NaN); none of these kernels treat that as an error.
binary_kernel!(Add, |a, b| a + b);
binary_kernel!(Sub, |a, b| a - b);
binary_kernel!(Mul, |a, b| a * b);
binary_kernel!(Div, |a, b| a / b);
binary_kernel!(Pow, |a, b| a.powf(b));
binary_kernel!(Mod, |a, b| a % b);

unary_kernel!(Sqrt, |x: f64| x.sqrt());
unary_kernel!(Abs, |x: f64| x.abs());
unary_kernel!(Neg, |x: f64| -x);
unary_kernel!(Sin, |x: f64| x.sin());
unary_kernel!(Cos, |x: f64| x.cos());
unary_kernel!(Log, |x: f64| x.ln());
unary_kernel!(Exp, |x: f64| x.exp());

/// `CLAMP(x, lo, hi)`.
struct Clamp;
impl Kernel for Clamp {
    fn compute(&mut self, node_id: NodeId, graph: &dyn GraphContext) -> f64 {
        let x = parent(graph, node_id, 0);
        let lo = parent(graph, node_id, 1);
        let hi = parent(graph, node_id, 2);
        x.max(lo).min(hi)
    }
}

/// `LERP(a, b, t) = a + (b - a) * t`.
struct Lerp;
impl Kernel for Lerp {
    fn compute(&mut self, node_id: NodeId, graph: &dyn GraphContext) -> f64 {
        let a = parent(graph, node_id, 0);
        let b = parent(graph, node_id, 1);
        let t = parent(graph, node_id, 2);
        a + (b - a) * t
    }
}

pub(crate) fn add_factory(_def: &NodeDefinition) -> Box<dyn Kernel> {
    Box::new(Add)
}

pub(crate) fn register(registry: &OperationRegistry) {
    registry.register_fixed("ADD", 2, add_factory, false, "a + b").unwrap();
    registry.register_fixed("SUB", 2, |_| Box::new(Sub), false, "a - b").unwrap();
    registry.register_fixed("MUL", 2, |_| Box::new(Mul), false, "a * b").unwrap();
    registry.register_fixed("DIV", 2, |_| Box::new(Div), false, "a / b").unwrap();
    registry.register_fixed("POW", 2, |_| Box::new(Pow), false, "a ^ b").unwrap();
    registry.register_fixed("MOD", 2, |_| Box::new(Mod), false, "a % b").unwrap();

    registry.register_fixed("SQRT", 1, |_| Box::new(Sqrt), false, "sqrt(x)").unwrap();
    registry.register_fixed("ABS", 1, |_| Box::new(Abs), false, "|x|").unwrap();
    registry.register_fixed("NEG", 1, |_| Box::new(Neg), false, "-x").unwrap();
    registry.register_fixed("SIN", 1, |_| Box::new(Sin), false, "sin(x)").unwrap();
    registry.register_fixed("COS", 1, |_| Box::new(Cos), false, "cos(x)").unwrap();
    registry.register_fixed("LOG", 1, |_| Box::new(Log), false, "ln(x)").unwrap();
    registry.register_fixed("EXP", 1, |_| Box::new(Exp), false, "e^x").unwrap();

    registry
        .register_fixed("CLAMP", 3, |_| Box::new(Clamp), false, "clamp(x, lo, hi)")
        .unwrap();
    registry
        .register_fixed("LERP", 3, |_| Box::new(Lerp), false, "a + (b - a) * t")
        .unwrap();
}
