//! Row sources and sinks.
//!
//! The evaluation core only sees ordered rows of string cells. Sources hand
//! them out, stopping at the first row whose cells are all empty, and take
//! changed rows back.

pub mod csv;
pub mod memory;
pub mod retry;
pub mod store;

pub use self::csv::CsvSource;
pub use memory::MemorySource;
pub use retry::RetryPolicy;
pub use store::{import_csv, YamlStore};

use crate::error::{SheetError, SheetResult};
use crate::types::SourceRow;
use std::path::{Path, PathBuf};

pub trait RowSource {
    /// Human-readable name for logs and errors
    fn describe(&self) -> String;

    /// Rows in ascending order, up to (not including) the first blank row
    fn read_rows(&mut self) -> SheetResult<Vec<SourceRow>>;

    /// Replace the cells of a previously read row
    fn write_row(&mut self, row_id: &str, cells: &[String]) -> SheetResult<()>;

    /// Flush buffered writes
    fn finish(&mut self) -> SheetResult<()> {
        Ok(())
    }
}

/// Wraps a source and keeps writes in memory, so nothing is persisted
pub struct DryRunSource<S> {
    inner: S,
    changes: Vec<SourceRow>,
}

impl<S: RowSource> DryRunSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            changes: Vec::new(),
        }
    }

    /// Rows that would have been written, in write order
    pub fn changes(&self) -> &[SourceRow] {
        &self.changes
    }
}

impl<S: RowSource> RowSource for DryRunSource<S> {
    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn read_rows(&mut self) -> SheetResult<Vec<SourceRow>> {
        self.inner.read_rows()
    }

    fn write_row(&mut self, row_id: &str, cells: &[String]) -> SheetResult<()> {
        self.changes.push(SourceRow::new(row_id, cells.to_vec()));
        Ok(())
    }
}

impl RowSource for Box<dyn RowSource> {
    fn describe(&self) -> String {
        (**self).describe()
    }

    fn read_rows(&mut self) -> SheetResult<Vec<SourceRow>> {
        (**self).read_rows()
    }

    fn write_row(&mut self, row_id: &str, cells: &[String]) -> SheetResult<()> {
        (**self).write_row(row_id, cells)
    }

    fn finish(&mut self) -> SheetResult<()> {
        (**self).finish()
    }
}

/// Keep rows up to the first blank one
pub fn take_until_blank(rows: impl IntoIterator<Item = SourceRow>) -> Vec<SourceRow> {
    rows.into_iter().take_while(|row| !row.is_blank()).collect()
}

/// Kind of file-backed source, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    Store,
}

impl SourceKind {
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                SourceKind::Store
            }
            _ => SourceKind::Csv,
        }
    }
}

/// Open a file-backed source. `output` redirects CSV write-back to another file.
pub fn open_source(
    path: &Path,
    output: Option<PathBuf>,
    retry: RetryPolicy,
) -> SheetResult<Box<dyn RowSource>> {
    match SourceKind::detect(path) {
        SourceKind::Csv => {
            let mut source = CsvSource::new(path).with_retry(retry);
            if let Some(out) = output {
                source = source.with_output(out);
            }
            Ok(Box::new(source))
        }
        SourceKind::Store => {
            if output.is_some() {
                return Err(SheetError::Config(
                    "--output is only supported for CSV sources".to_string(),
                ));
            }
            Ok(Box::new(YamlStore::new(path).with_retry(retry)))
        }
    }
}

/// Replace `target` with `bytes` via a sibling `.tmp` file and a rename,
/// so a failed write never leaves a half-written file behind.
pub(crate) fn write_atomic(
    target: &Path,
    bytes: &[u8],
    retry: &RetryPolicy,
    what: &str,
) -> SheetResult<()> {
    let mut tmp = target.to_path_buf().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    retry.run(what, || {
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, target)
    })?;
    Ok(())
}

/// Parse a numeric row id as produced by the file-backed sources
pub(crate) fn row_index(row_id: &str) -> SheetResult<usize> {
    row_id
        .parse::<usize>()
        .ok()
        .filter(|&n| n >= 1)
        .map(|n| n - 1)
        .ok_or_else(|| SheetError::Source(format!("invalid row id '{row_id}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_until_blank_stops_at_first_blank_row() {
        let rows = vec![
            SourceRow::new("1", vec!["a".into()]),
            SourceRow::new("2", vec![String::new()]),
            SourceRow::new("3", vec!["b".into()]),
        ];
        let kept = take_until_blank(rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "1");
    }

    #[test]
    fn test_source_kind_detection() {
        assert_eq!(SourceKind::detect(Path::new("a.csv")), SourceKind::Csv);
        assert_eq!(SourceKind::detect(Path::new("a.YAML")), SourceKind::Store);
        assert_eq!(SourceKind::detect(Path::new("rows.yml")), SourceKind::Store);
        assert_eq!(SourceKind::detect(Path::new("noext")), SourceKind::Csv);
    }

    #[test]
    fn test_row_index() {
        assert_eq!(row_index("1").unwrap(), 0);
        assert_eq!(row_index("12").unwrap(), 11);
        assert!(row_index("0").is_err());
        assert!(row_index("x").is_err());
    }

    #[test]
    fn test_dry_run_never_writes_through() {
        let rows = vec![
            vec!["Func1".to_string()],
            vec!["?".to_string()],
        ];
        let mut dry = DryRunSource::new(MemorySource::new(rows));
        let report = crate::core::process_sheet(
            &mut dry,
            &crate::core::FunctionRegistry::with_builtins(),
            &crate::config::EngineConfig::default(),
            &crate::core::CancelToken::new(),
        )
        .unwrap();

        assert_eq!(report.rows_changed, 1);
        assert_eq!(dry.changes()[0].cells, vec!["Out from func1".to_string()]);
        assert_eq!(dry.inner.rows()[1], vec!["?".to_string()]);
    }

    #[test]
    fn test_output_rejected_for_store() {
        let result = open_source(
            Path::new("rows.yaml"),
            Some(PathBuf::from("out.yaml")),
            RetryPolicy::default(),
        );
        assert!(matches!(result, Err(SheetError::Config(_))));
    }
}
