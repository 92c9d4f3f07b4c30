use super::error::RegistryError;
use super::kernel::Kernel;
use super::kernels;
use super::node_def::NodeDefinition;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;

/// How many parent values an operation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    Variadic,
}

/// A factory that produces a fresh `Kernel` instance for one node. The
/// node's own `NodeDefinition` is passed through so operations that take
/// per-node configuration (e.g. `SMA`'s `lookback`, read from
/// `parameters`) can size their state accordingly; stateless factories
/// simply ignore it. For stateless operations a factory may hand back
/// equivalent independent instances cheaply (they carry no state to
/// alias); for stateful operations the registry's contract requires each
/// call to return an instance that owns its own state, since the
/// compiler invokes the factory once per compute node (see
/// `flux_engine::compiler::Compiler::compile` step 5).
pub type KernelFactory = fn(&NodeDefinition) -> Box<dyn Kernel>;

struct OperationEntry {
    arity: Arity,
    factory: KernelFactory,
    stateful: bool,
    description: String,
}

/// Maps operation names to kernel factories, arities, and the stateful
/// flag the compiler and evaluator both need.
///
/// A registry is built once (typically via `OperationRegistry::standard`,
/// optionally followed by caller `register_fixed`/`register_variadic`
/// calls to add domain-specific operations) and then handed to the
/// compiler by reference. Nothing in this engine ever mutates a registry
/// after compilation begins; the `RwLock` exists only so one registry can
/// still be safely shared, read-only, across independently compiling
/// threads, not to support runtime reconfiguration of a live graph.
pub struct OperationRegistry {
    entries: RwLock<HashMap<String, OperationEntry>>,
}

/// A distinguished arity marker callers can match against instead of
/// hand-rolling the "variadic" check.
pub const VARIADIC: Arity = Arity::Variadic;

impl OperationRegistry {
    pub fn new() -> OperationRegistry {
        OperationRegistry {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// The standard preset: `SUM PRODUCT MIN MAX AVG`, fixed binary
    /// `ADD SUB MUL DIV POW MOD`, fixed unary `SQRT ABS NEG SIN COS LOG
    /// EXP`, and fixed ternary `CLAMP LERP`.
    pub fn standard() -> OperationRegistry {
        let registry = OperationRegistry::new();
        kernels::register_standard(&registry);
        registry
    }

    /// `arity` is signed so a negative value can be rejected as
    /// `RegistryError::NegativeArity` rather than silently wrapping, the
    /// way it would if callers had to pre-validate before casting to
    /// `usize` themselves.
    pub fn register_fixed(
        &self,
        name: impl Into<String>,
        arity: i64,
        factory: KernelFactory,
        stateful: bool,
        description: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if arity < 0 {
            return Err(RegistryError::NegativeArity(name));
        }
        self.register(name, Arity::Fixed(arity as usize), factory, stateful, description.into())
    }

    pub fn register_variadic(
        &self,
        name: impl Into<String>,
        factory: KernelFactory,
        stateful: bool,
        description: impl Into<String>,
    ) -> Result<(), RegistryError> {
        self.register(name.into(), Arity::Variadic, factory, stateful, description.into())
    }

    fn register(
        &self,
        name: String,
        arity: Arity,
        factory: KernelFactory,
        stateful: bool,
        description: String,
    ) -> Result<(), RegistryError> {
        if self.entries.read().contains_key(&name) {
            return Err(RegistryError::DuplicateOperationRegistration(name));
        }
        debug!("registering operation \"{}\" (stateful={})", name, stateful);
        self.entries.write().insert(
            name.clone(),
            OperationEntry {
                arity,
                factory,
                stateful,
                description,
            },
        );
        Ok(())
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    pub fn arity(&self, name: &str) -> Option<Arity> {
        self.entries.read().get(name).map(|e| e.arity)
    }

    pub fn is_stateful(&self, name: &str) -> Option<bool> {
        self.entries.read().get(name).map(|e| e.stateful)
    }

    pub fn create_kernel(&self, name: &str, def: &NodeDefinition) -> Option<Box<dyn Kernel>> {
        self.entries.read().get(name).map(|e| (e.factory)(def))
    }

    pub fn description(&self, name: &str) -> Option<String> {
        self.entries.read().get(name).map(|e| e.description.clone())
    }

    /// All registered operation names, in no particular order.
    pub fn list_operations(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        OperationRegistry::new()
    }
}
