use super::{row_index, take_until_blank, RowSource};
use crate::error::{SheetError, SheetResult};
use crate::types::SourceRow;

/// Vector-backed source; row ids are 1-based positions
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    rows: Vec<Vec<String>>,
    writes: usize,
}

impl MemorySource {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows, writes: 0 }
    }

    /// Number of `write_row` calls received
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }
}

impl RowSource for MemorySource {
    fn describe(&self) -> String {
        format!("memory ({} rows)", self.rows.len())
    }

    fn read_rows(&mut self) -> SheetResult<Vec<SourceRow>> {
        Ok(take_until_blank(
            self.rows
                .iter()
                .enumerate()
                .map(|(i, cells)| SourceRow::new((i + 1).to_string(), cells.clone())),
        ))
    }

    fn write_row(&mut self, row_id: &str, cells: &[String]) -> SheetResult<()> {
        let idx = row_index(row_id)?;
        let row = self
            .rows
            .get_mut(idx)
            .ok_or_else(|| SheetError::Source(format!("row {row_id} out of range")))?;
        *row = cells.to_vec();
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::{process_sheet, CancelToken, FunctionRegistry};

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_only_changed_rows_are_written() {
        let mut source = MemorySource::new(rows(&[
            &["Func1", "note"],
            &["?", "a"],
            &["already", "b"],
            &["", "c"],
        ]));
        let report = process_sheet(
            &mut source,
            &FunctionRegistry::with_builtins(),
            &EngineConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(source.writes(), 1);
        assert_eq!(report.rows_processed, 3);
        assert_eq!(report.rows_changed, 1);
        assert_eq!(source.rows()[1][0], "Out from func1");
    }

    #[test]
    fn test_rows_after_blank_row_are_untouched() {
        let mut source = MemorySource::new(rows(&[&["Func1"], &[""], &["?"]]));
        let report = process_sheet(
            &mut source,
            &FunctionRegistry::with_builtins(),
            &EngineConfig::default(),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(report.rows_processed, 0);
        assert_eq!(source.rows()[2][0], "?");
    }
}
