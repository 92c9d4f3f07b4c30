pub mod bitset;
pub mod compiler;
pub mod error;
pub mod evaluator;
pub mod graph;

#[cfg(test)]
#[macro_use]
mod macros;

pub use compiler::{CompileError, Compiler};
pub use error::EvalError;
pub use evaluator::{EvaluationMode, EvaluatorStats, Evaluator};
pub use graph::CompiledGraph;

pub use flux_shared::error::RegistryError;
pub use flux_shared::kernel::{GraphContext, Kernel, NodeId};
pub use flux_shared::kernels::sma::SimpleMovingAverage;
pub use flux_shared::node_def::{NodeDefinition, NodeKind};
pub use flux_shared::operation_registry::{Arity, OperationRegistry};
pub use flux_shared::value::{bits_eq, Scalar};
