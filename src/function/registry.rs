//! Function directory contract and the in-process registry.
//!
//! The directory is the dispatcher's read side: an ordered set of
//! descriptors resolved by name. The registry is the in-process
//! implementation, holding an atomically swapped snapshot that is rebuilt
//! wholesale when the host reloads.

use crate::function::descriptor::FunctionDescriptor;
use crate::function::handler::StratoFunction;
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Read-side contract over the set of registered functions.
///
/// Lookup is a linear scan over [`descriptors`](Self::descriptors) in
/// registration order: the first case-insensitive name match wins, and an
/// unknown name yields `None`.
pub trait FunctionDirectory: Send + Sync {
    /// All registered descriptors, in registration order.
    fn descriptors(&self) -> Vec<Arc<FunctionDescriptor>>;

    /// Resolve a descriptor by name.
    fn lookup(&self, name: &str) -> Option<Arc<FunctionDescriptor>> {
        self.descriptors()
            .into_iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// The body registered for a descriptor, if any.
    fn body(&self, name: &str) -> Option<Arc<dyn StratoFunction>>;

    /// Whether the host can currently run this descriptor.
    fn can_execute(&self, descriptor: &FunctionDescriptor) -> bool;
}

/// A descriptor paired with its body.
#[derive(Clone)]
pub struct RegisteredFunction {
    /// Function metadata.
    pub descriptor: Arc<FunctionDescriptor>,
    /// Function implementation.
    pub body: Arc<dyn StratoFunction>,
}

impl RegisteredFunction {
    /// Pair a descriptor with its body.
    pub fn new(descriptor: FunctionDescriptor, body: Arc<dyn StratoFunction>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            body,
        }
    }
}

#[derive(Clone, Default)]
struct RegistrySnapshot {
    functions: Vec<RegisteredFunction>,
}

/// In-process function registry.
///
/// Readers always observe a single consistent snapshot; registration and
/// reload install a new snapshot by atomic pointer swap and never mutate one
/// already being read.
pub struct FunctionRegistry {
    snapshot: ArcSwap<RegistrySnapshot>,
    ready: AtomicBool,
}

impl FunctionRegistry {
    /// Create an empty registry with the host marked ready.
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(RegistrySnapshot::default()),
            ready: AtomicBool::new(true),
        }
    }

    /// Register a function, appending it to the current generation.
    ///
    /// Duplicate names (case-insensitive) are tolerated; lookup resolves
    /// them first-registered-wins.
    pub fn register(&self, descriptor: FunctionDescriptor, body: Arc<dyn StratoFunction>) {
        let name = descriptor.name.clone();
        if self
            .snapshot
            .load()
            .functions
            .iter()
            .any(|f| f.descriptor.name.eq_ignore_ascii_case(&name))
        {
            warn!(
                "Function '{}' shadows an earlier registration; lookups keep the first",
                name
            );
        }

        let entry = RegisteredFunction::new(descriptor, body);
        self.snapshot.rcu(|current| {
            let mut functions = current.functions.clone();
            functions.push(entry.clone());
            RegistrySnapshot { functions }
        });
        info!("Registered function: {}", name);
    }

    /// Replace the whole function set with a new host generation.
    pub fn reload(&self, functions: Vec<RegisteredFunction>) {
        let count = functions.len();
        self.snapshot.store(Arc::new(RegistrySnapshot { functions }));
        info!("Reloaded function registry with {} functions", count);
    }

    /// Mark the host ready or not ready to execute functions.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    /// Whether the host is currently ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionDirectory for FunctionRegistry {
    fn descriptors(&self) -> Vec<Arc<FunctionDescriptor>> {
        self.snapshot
            .load()
            .functions
            .iter()
            .map(|f| f.descriptor.clone())
            .collect()
    }

    fn body(&self, name: &str) -> Option<Arc<dyn StratoFunction>> {
        self.snapshot
            .load()
            .functions
            .iter()
            .find(|f| f.descriptor.name.eq_ignore_ascii_case(name))
            .map(|f| f.body.clone())
    }

    fn can_execute(&self, _descriptor: &FunctionDescriptor) -> bool {
        self.is_ready()
    }
}
