//! SheetMacro - spreadsheet macro engine
//!
//! A sheet's first row names functions. In later rows, a `?` under a function
//! column is replaced by that function's result, called with arguments taken
//! from same-row columns named like its parameters (or the parameter's
//! default, or the `foo` sentinel).
//!
//! # Features
//!
//! - Explicit, case-insensitive function registry (builtins + YAML templates)
//! - Single-pass, left-to-right, row-local evaluation
//! - Per-cell failure recovery with a processing report
//! - CSV and YAML snapshot-store sources
//!
//! # Example
//!
//! ```
//! use sheetmacro::config::EngineConfig;
//! use sheetmacro::core::{evaluate_rows, CancelToken, FunctionRegistry};
//!
//! let rows = vec![
//!     vec!["Func1".to_string(), "Func2".to_string(), "param1".to_string(), "param2".to_string()],
//!     vec!["?".to_string(), "?".to_string(), "X".to_string(), "Y".to_string()],
//! ];
//! let registry = FunctionRegistry::with_builtins();
//! let (rows, report) = evaluate_rows(rows, &registry, &EngineConfig::default(), &CancelToken::new())?;
//!
//! assert_eq!(rows[1], vec!["Out from func1", "X Y", "X", "Y"]);
//! assert_eq!(report.cells_computed, 2);
//! # Ok::<(), sheetmacro::error::SheetError>(())
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod functions;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{CallError, SheetError, SheetResult};
pub use types::{ArgValue, Arguments, DefaultValue, Parameter, PLACEHOLDER, SENTINEL_ARGUMENT};
