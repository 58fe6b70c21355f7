//! Strato function model: descriptors, bodies, and the function directory.

pub mod descriptor;
pub mod handler;
pub mod registry;

pub use descriptor::{AuthLevel, FunctionDescriptor};
pub use handler::{CancellationToken, InvocationContext, StratoError, StratoFunction};
pub use registry::{FunctionDirectory, FunctionRegistry, RegisteredFunction};
