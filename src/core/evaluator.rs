//! Row evaluation: fills placeholder cells of function columns, left to right.

use crate::core::binder::Session;
use crate::core::report::CellFailure;
use crate::core::resolver::ArgumentResolver;
use tracing::{debug, warn};

/// What happened to one row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowOutcome {
    /// Columns that received a computed value
    pub computed: Vec<usize>,
    pub failures: Vec<CellFailure>,
    /// Any cell now holds a different value, including error markers
    pub changed: bool,
}

pub struct RowEvaluator<'a> {
    session: &'a Session,
}

impl<'a> RowEvaluator<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Evaluate `row` in place.
    ///
    /// Only cells that equal the placeholder exactly are computed; empty cells
    /// and literal values are left alone. Columns run in ascending order and
    /// argument resolution reads the row being mutated, so a column may
    /// consume a value computed to its left.
    pub fn evaluate(&self, row_id: &str, row: &mut [String]) -> RowOutcome {
        let mut outcome = RowOutcome::default();
        let resolver = ArgumentResolver::new(self.session);

        for (col, function) in self.session.function_columns() {
            let Some(cell) = row.get(col) else {
                break;
            };
            if cell != self.session.placeholder() {
                continue;
            }

            match resolver.call(function, row) {
                Ok(value) => {
                    debug!(row = row_id, column = col, function = %function.canonical_name, %value, "computed cell");
                    outcome.changed |= row[col] != value;
                    row[col] = value;
                    outcome.computed.push(col);
                }
                Err(e) => {
                    warn!(row = row_id, column = col, function = %function.canonical_name, error = %e, "cell failed");
                    if let Some(marker) = self.session.error_marker() {
                        outcome.changed |= row[col] != marker;
                        row[col] = marker.to_string();
                    }
                    outcome.failures.push(CellFailure {
                        row_id: row_id.to_string(),
                        column: col,
                        function: function.canonical_name.clone(),
                        cause: e.to_string(),
                    });
                }
            }
        }

        outcome
    }
}
