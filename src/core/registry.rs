//! Function registry: the callables a sheet header may name.
//!
//! Functions are registered explicitly (builtins, then template functions
//! from configuration). Lookup is case-insensitive and exact.

use crate::error::CallError;
use crate::functions;
use crate::types::{Arguments, Parameter};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Shared handle to a function body
pub type Callable = Arc<dyn Fn(&Arguments) -> Result<String, CallError> + Send + Sync>;

/// A registered function: canonical name, ordered parameters and its body
#[derive(Clone)]
pub struct FunctionDescriptor {
    pub canonical_name: String,
    pub parameters: Vec<Parameter>,
    callable: Callable,
}

impl FunctionDescriptor {
    pub fn new(canonical_name: impl Into<String>, parameters: Vec<Parameter>, callable: Callable) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            parameters,
            callable,
        }
    }

    pub fn invoke(&self, args: &Arguments) -> Result<String, CallError> {
        (self.callable)(args)
    }

    /// `Func2(param1, param2='', status='Okay')`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.parameters.iter().map(Parameter::signature).collect();
        format!("{}({})", self.canonical_name, params.join(", "))
    }
}

impl fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("canonical_name", &self.canonical_name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Two registrations that share a lowercased name. The first one is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryCollision {
    pub kept: String,
    pub ignored: String,
}

/// Immutable name -> function table, built once per run
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: Vec<Arc<FunctionDescriptor>>,
    by_name: HashMap<String, usize>,
    collisions: Vec<RegistryCollision>,
}

impl FunctionRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registry containing only the builtin function table
    pub fn with_builtins() -> Self {
        let mut builder = Self::builder();
        functions::register_builtins(&mut builder);
        builder.build()
    }

    /// Case-insensitive exact lookup
    pub fn get(&self, name: &str) -> Option<&Arc<FunctionDescriptor>> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&idx| &self.functions[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Canonical (original-case) name for a label, if it names a function
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.get(name).map(|f| f.canonical_name.as_str())
    }

    /// Functions in registration order
    pub fn functions(&self) -> impl Iterator<Item = &Arc<FunctionDescriptor>> {
        self.functions.iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn collisions(&self) -> &[RegistryCollision] {
        &self.collisions
    }
}

/// Collects registrations; `build` freezes them into a `FunctionRegistry`
#[derive(Default)]
pub struct RegistryBuilder {
    registry: FunctionRegistry,
}

impl RegistryBuilder {
    /// Register a function body under `name`
    pub fn register<F>(&mut self, name: &str, parameters: Vec<Parameter>, body: F) -> &mut Self
    where
        F: Fn(&Arguments) -> Result<String, CallError> + Send + Sync + 'static,
    {
        self.register_descriptor(FunctionDescriptor::new(name, parameters, Arc::new(body)))
    }

    pub fn register_descriptor(&mut self, descriptor: FunctionDescriptor) -> &mut Self {
        let key = descriptor.canonical_name.to_lowercase();
        let registry = &mut self.registry;

        if let Some(&existing) = registry.by_name.get(&key) {
            let kept = registry.functions[existing].canonical_name.clone();
            warn!(
                kept = %kept,
                ignored = %descriptor.canonical_name,
                "function name collision, keeping first registration"
            );
            registry.collisions.push(RegistryCollision {
                kept,
                ignored: descriptor.canonical_name,
            });
            return self;
        }

        registry.by_name.insert(key, registry.functions.len());
        registry.functions.push(Arc::new(descriptor));
        self
    }

    pub fn build(self) -> FunctionRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: &'static str) -> impl Fn(&Arguments) -> Result<String, CallError> {
        move |_| Ok(value.to_string())
    }

    #[test]
    fn test_lookup_is_case_insensitive_and_exact() {
        let mut builder = FunctionRegistry::builder();
        builder.register("Func1", vec![], constant("one"));
        let registry = builder.build();

        assert_eq!(registry.canonical_name("func1"), Some("Func1"));
        assert_eq!(registry.canonical_name("FUNC1"), Some("Func1"));
        assert!(registry.get("func").is_none());
        assert!(registry.get("func11").is_none());
    }

    #[test]
    fn test_collision_keeps_first_registration() {
        let mut builder = FunctionRegistry::builder();
        builder
            .register("Upper", vec![], constant("first"))
            .register("UPPER", vec![], constant("second"));
        let registry = builder.build();

        assert_eq!(registry.len(), 1);
        let f = registry.get("upper").unwrap();
        assert_eq!(f.canonical_name, "Upper");
        assert_eq!(f.invoke(&Arguments::new()).unwrap(), "first");
        assert_eq!(
            registry.collisions(),
            &[RegistryCollision {
                kept: "Upper".to_string(),
                ignored: "UPPER".to_string(),
            }]
        );
    }

    #[test]
    fn test_signature_rendering() {
        let mut builder = FunctionRegistry::builder();
        builder.register(
            "Func2",
            vec![
                Parameter::required("param1"),
                Parameter::optional("param2", ""),
                Parameter::absent("status"),
            ],
            constant(""),
        );
        let registry = builder.build();
        assert_eq!(
            registry.get("func2").unwrap().signature(),
            "Func2(param1, param2='', status=None)"
        );
    }

    #[test]
    fn test_builtins_are_registered() {
        let registry = FunctionRegistry::with_builtins();
        assert!(registry.contains("Func1"));
        assert!(registry.contains("func2"));
        assert!(registry.collisions().is_empty());
    }
}
