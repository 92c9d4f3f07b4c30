use thiserror::Error;

/// Errors returned by `OperationRegistry` mutators.
///
/// These are the only two failure modes the registry itself can produce;
/// on either one, registry state is left unchanged (the attempted
/// mutation never lands).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("operation \"{0}\" is already registered")]
    DuplicateOperationRegistration(String),

    #[error("operation \"{0}\" declared a negative arity")]
    NegativeArity(String),
}
