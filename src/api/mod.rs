//! SheetMacro API Server module
//!
//! Provides an HTTP REST API over the evaluation core.
//! Run with `sheetmacro-server`.

pub mod handlers;
pub mod server;

pub use server::{build_router, run_api_server};
