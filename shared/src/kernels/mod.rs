pub mod arithmetic;
pub mod sma;
pub mod variadic;

use super::operation_registry::OperationRegistry;

/// Wires up every built-in operation onto a freshly constructed registry.
/// Called by `OperationRegistry::standard`.
pub(crate) fn register_standard(registry: &OperationRegistry) {
    variadic::register(registry);
    arithmetic::register(registry);
    sma::register(registry);
}
