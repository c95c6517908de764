//! A full processing pass over one sheet.

use crate::config::EngineConfig;
use crate::core::binder::HeaderBinder;
use crate::core::evaluator::RowEvaluator;
use crate::core::registry::FunctionRegistry;
use crate::core::report::ProcessingReport;
use crate::error::{SheetError, SheetResult};
use crate::source::{MemorySource, RowSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cooperative cancellation flag, checked before each row
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Run one pass: bind row 1, evaluate rows 2..N in order, write back changed rows.
pub fn process_sheet(
    source: &mut dyn RowSource,
    registry: &FunctionRegistry,
    config: &EngineConfig,
    cancel: &CancelToken,
) -> SheetResult<ProcessingReport> {
    let rows = source.read_rows()?;
    let mut rows = rows.into_iter();

    let header = rows
        .next()
        .ok_or_else(|| SheetError::MissingHeader(source.describe()))?;

    let session = HeaderBinder::bind(registry, &header.cells, config);
    let evaluator = RowEvaluator::new(&session);

    let mut report = ProcessingReport {
        collisions: registry.collisions().to_vec(),
        ..Default::default()
    };

    info!(
        source = %source.describe(),
        function_columns = session.function_columns().count(),
        "processing sheet"
    );

    for mut row in rows {
        if cancel.is_cancelled() {
            warn!(row = %row.id, "pass cancelled");
            report.cancelled = true;
            break;
        }

        let outcome = evaluator.evaluate(&row.id, &mut row.cells);
        report.rows_processed += 1;
        report.cells_computed += outcome.computed.len();
        report.failures.extend(outcome.failures);

        if outcome.changed {
            debug!(row = %row.id, "writing changed row");
            source.write_row(&row.id, &row.cells)?;
            report.rows_changed += 1;
        }
    }

    source.finish()?;
    info!(summary = %report.summary(), "pass complete");
    Ok(report)
}

/// Evaluate in-memory rows (row 0 is the header); returns the evaluated rows
pub fn evaluate_rows(
    rows: Vec<Vec<String>>,
    registry: &FunctionRegistry,
    config: &EngineConfig,
    cancel: &CancelToken,
) -> SheetResult<(Vec<Vec<String>>, ProcessingReport)> {
    let mut source = MemorySource::new(rows);
    let report = process_sheet(&mut source, registry, config, cancel)?;
    Ok((source.into_rows(), report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_end_to_end_func1_func2() {
        let registry = FunctionRegistry::with_builtins();
        let (out, report) = evaluate_rows(
            rows(&[&["Func1", "Func2", "param1", "param2"], &["?", "?", "X", "Y"]]),
            &registry,
            &EngineConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(
            out,
            rows(&[
                &["Func1", "Func2", "param1", "param2"],
                &["Out from func1", "X Y", "X", "Y"],
            ])
        );
        assert_eq!(report.rows_processed, 1);
        assert_eq!(report.cells_computed, 2);
        assert!(report.is_clean());
    }

    #[test]
    fn test_header_row_is_never_evaluated() {
        let registry = FunctionRegistry::with_builtins();
        let (out, report) = evaluate_rows(
            rows(&[&["Func1", "?"], &["", ""]]),
            &registry,
            &EngineConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(out[0], vec!["Func1".to_string(), "?".to_string()]);
        assert_eq!(report.cells_computed, 0);
    }

    #[test]
    fn test_empty_sheet_is_missing_header() {
        let registry = FunctionRegistry::with_builtins();
        let result = evaluate_rows(vec![], &registry, &EngineConfig::default(), &CancelToken::new());
        assert!(matches!(result, Err(SheetError::MissingHeader(_))));
    }

    #[test]
    fn test_cancelled_pass_stops_before_rows() {
        let registry = FunctionRegistry::with_builtins();
        let cancel = CancelToken::new();
        cancel.cancel();
        let (out, report) = evaluate_rows(
            rows(&[&["Func1"], &["?"], &["?"]]),
            &registry,
            &EngineConfig::default(),
            &cancel,
        )
        .unwrap();
        assert!(report.cancelled);
        assert_eq!(report.rows_processed, 0);
        assert_eq!(out[1], vec!["?".to_string()]);
    }

    #[test]
    fn test_failures_do_not_abort_the_pass() {
        let registry = FunctionRegistry::with_builtins();
        let (out, report) = evaluate_rows(
            rows(&[&["double", "n"], &["?", "oops"], &["?", "4"]]),
            &registry,
            &EngineConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(out[1][0], "?");
        assert_eq!(out[2][0], "8");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].row_id, "2");
        assert_eq!(report.rows_changed, 1);
    }

    #[test]
    fn test_collisions_are_reported() {
        let mut builder = FunctionRegistry::builder();
        builder
            .register("f", vec![], |_| Ok("a".into()))
            .register("F", vec![], |_| Ok("b".into()));
        let registry = builder.build();
        let (out, report) = evaluate_rows(
            rows(&[&["F"], &["?"]]),
            &registry,
            &EngineConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(out[1][0], "a");
        assert_eq!(report.collisions.len(), 1);
    }
}
