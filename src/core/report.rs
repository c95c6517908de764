use crate::core::registry::RegistryCollision;
use serde::Serialize;

/// A cell whose function raised during evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellFailure {
    pub row_id: String,
    pub column: usize,
    pub function: String,
    pub cause: String,
}

/// Summary of one processing pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingReport {
    /// Data rows evaluated (the header row is not counted)
    pub rows_processed: usize,
    /// Rows written back because at least one cell changed
    pub rows_changed: usize,
    pub cells_computed: usize,
    pub failures: Vec<CellFailure>,
    pub collisions: Vec<RegistryCollision>,
    pub cancelled: bool,
}

impl ProcessingReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    pub fn summary(&self) -> String {
        format!(
            "{} rows processed, {} cells computed, {} failed",
            self.rows_processed,
            self.cells_computed,
            self.failures.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_and_clean_flag() {
        let mut report = ProcessingReport {
            rows_processed: 3,
            cells_computed: 4,
            ..Default::default()
        };
        assert!(report.is_clean());
        assert_eq!(report.summary(), "3 rows processed, 4 cells computed, 0 failed");

        report.failures.push(CellFailure {
            row_id: "2".into(),
            column: 0,
            function: "double".into(),
            cause: "boom".into(),
        });
        assert!(!report.is_clean());
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = ProcessingReport {
            rows_processed: 1,
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["rows_processed"], 1);
        assert_eq!(json["cancelled"], false);
        assert!(json["failures"].as_array().unwrap().is_empty());
    }
}
