use thiserror::Error;

/// Runtime call errors: returned at the call site, leaving the graph's
/// values untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("\"{0}\" is not a known input")]
    UnknownInput(String),

    #[error("batch length mismatch: {ids} ids but {values} values")]
    BatchLengthMismatch { ids: usize, values: usize },

    #[error(
        "one or more compute nodes are stateful; construct the evaluator with \
         `Evaluator::new_with_unconditional_stateful_dirtying` or use `EvaluationMode::Full`"
    )]
    StatefulIncrementalUnguarded,
}
