//! Evaluation core: registry, header binding, argument resolution, row evaluation

pub mod binder;
pub mod evaluator;
pub mod pass;
pub mod registry;
pub mod report;
pub mod resolver;

pub use binder::{HeaderBinder, Session};
pub use evaluator::{RowEvaluator, RowOutcome};
pub use pass::{evaluate_rows, process_sheet, CancelToken};
pub use registry::{FunctionDescriptor, FunctionRegistry, RegistryBuilder, RegistryCollision};
pub use report::{CellFailure, ProcessingReport};
pub use resolver::ArgumentResolver;
