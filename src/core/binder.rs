//! Header binding: turns row 1 into a per-sheet `Session`.

use crate::config::EngineConfig;
use crate::core::registry::{FunctionDescriptor, FunctionRegistry};
use std::sync::Arc;
use tracing::debug;

/// Per-sheet evaluation context built from the header row
#[derive(Debug, Clone)]
pub struct Session {
    headers: Vec<String>,
    bindings: Vec<Option<Arc<FunctionDescriptor>>>,
    placeholder: String,
    sentinel: String,
    error_marker: Option<String>,
}

impl Session {
    /// Lowercased header labels, index-aligned to columns
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Function bound to column `index`, if its header names one
    pub fn function_at(&self, index: usize) -> Option<&Arc<FunctionDescriptor>> {
        self.bindings.get(index).and_then(Option::as_ref)
    }

    /// `(column, function)` pairs in ascending column order
    pub fn function_columns(&self) -> impl Iterator<Item = (usize, &Arc<FunctionDescriptor>)> {
        self.bindings
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.as_ref().map(|f| (i, f)))
    }

    /// Leftmost column whose header equals `name` (case-insensitive)
    pub fn column_named(&self, name: &str) -> Option<usize> {
        let wanted = name.to_lowercase();
        self.headers.iter().position(|h| *h == wanted)
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    pub fn error_marker(&self) -> Option<&str> {
        self.error_marker.as_deref()
    }
}

/// Binds header labels to registered functions
pub struct HeaderBinder;

impl HeaderBinder {
    pub fn bind(registry: &FunctionRegistry, header_row: &[String], config: &EngineConfig) -> Session {
        let headers: Vec<String> = header_row
            .iter()
            .map(|label| label.to_lowercase())
            .collect();

        let bindings: Vec<Option<Arc<FunctionDescriptor>>> = headers
            .iter()
            .map(|label| registry.get(label).cloned())
            .collect();

        for (idx, function) in bindings.iter().enumerate() {
            if let Some(f) = function {
                debug!(column = idx, function = %f.canonical_name, "bound function column");
            }
        }

        Session {
            headers,
            bindings,
            placeholder: config.placeholder.clone(),
            sentinel: config.sentinel.clone(),
            error_marker: config.error_marker.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Parameter;

    fn registry() -> FunctionRegistry {
        let mut builder = FunctionRegistry::builder();
        builder
            .register("Func1", vec![], |_| Ok("one".into()))
            .register("Func2", vec![Parameter::required("param1")], |_| Ok("two".into()));
        builder.build()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_bind_lowercases_headers() {
        let session = HeaderBinder::bind(
            &registry(),
            &row(&["Func1", "FUNC2", "Param1", " Notes "]),
            &EngineConfig::default(),
        );
        assert_eq!(session.headers(), &row(&["func1", "func2", "param1", " notes "])[..]);
    }

    #[test]
    fn test_padded_label_is_a_data_column() {
        let session = HeaderBinder::bind(
            &registry(),
            &row(&[" Func1 ", "Func1 ", "param1"]),
            &EngineConfig::default(),
        );
        assert_eq!(session.function_columns().count(), 0);
        assert_eq!(session.column_named(" func1 "), Some(0));
        assert_eq!(session.column_named("func1"), None);
    }

    #[test]
    fn test_only_function_labels_bind() {
        let session = HeaderBinder::bind(
            &registry(),
            &row(&["func1", "param1", "func2", "func"]),
            &EngineConfig::default(),
        );
        let bound: Vec<(usize, &str)> = session
            .function_columns()
            .map(|(i, f)| (i, f.canonical_name.as_str()))
            .collect();
        assert_eq!(bound, vec![(0, "Func1"), (2, "Func2")]);
        assert!(session.function_at(1).is_none());
        assert!(session.function_at(3).is_none());
        assert!(session.function_at(99).is_none());
    }

    #[test]
    fn test_column_named_picks_leftmost() {
        let session = HeaderBinder::bind(
            &registry(),
            &row(&["x", "Name", "name"]),
            &EngineConfig::default(),
        );
        assert_eq!(session.column_named("NAME"), Some(1));
        assert_eq!(session.column_named("missing"), None);
    }

    #[test]
    fn test_session_carries_config_constants() {
        let config = EngineConfig {
            error_marker: Some("#ERR".into()),
            ..EngineConfig::default()
        };
        let session = HeaderBinder::bind(&registry(), &row(&["func1"]), &config);
        assert_eq!(session.placeholder(), "?");
        assert_eq!(session.sentinel(), "foo");
        assert_eq!(session.error_marker(), Some("#ERR"));
        assert_eq!(session.width(), 1);
    }
}
