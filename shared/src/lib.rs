extern crate strum;
#[macro_use]
extern crate strum_macros;

pub mod error;
pub mod kernel;
pub mod kernels;
pub mod node_def;
pub mod operation_registry;
pub mod value;
