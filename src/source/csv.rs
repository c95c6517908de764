use super::{row_index, take_until_blank, write_atomic, RetryPolicy, RowSource};
use crate::error::{SheetError, SheetResult};
use crate::types::SourceRow;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// CSV file source. Row ids are 1-based record numbers.
///
/// The whole file is kept in memory so rows after the stop row survive
/// write-back unchanged. Changes are flushed in `finish`.
#[derive(Debug)]
pub struct CsvSource {
    path: PathBuf,
    output: Option<PathBuf>,
    retry: RetryPolicy,
    records: Vec<Vec<String>>,
    dirty: bool,
}

impl CsvSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            output: None,
            retry: RetryPolicy::default(),
            records: Vec::new(),
            dirty: false,
        }
    }

    /// Write results to `output` instead of rewriting the input
    #[must_use]
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    fn target(&self) -> &Path {
        self.output.as_deref().unwrap_or(&self.path)
    }
}

/// Parse CSV text into records of string cells (ragged rows allowed).
///
/// An empty line yields an empty record so the blank-row stop and the
/// line-to-row-id mapping both hold. The csv reader on its own skips them.
pub fn parse_records(content: &[u8]) -> SheetResult<Vec<Vec<String>>> {
    let mut records = Vec::new();
    for line in split_lines(content) {
        if line.is_empty() {
            records.push(Vec::new());
            continue;
        }

        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(line);
        for result in reader.records() {
            let record = result?;
            records.push(record.iter().map(str::to_string).collect());
        }
    }
    Ok(records)
}

/// Split on record terminators outside quoted fields. A trailing terminator
/// does not start another line; a trailing `\r` is dropped from each line.
fn split_lines(content: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, &byte) in content.iter().enumerate() {
        match byte {
            b'"' => in_quotes = !in_quotes,
            b'\n' if !in_quotes => {
                lines.push(strip_cr(&content[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < content.len() {
        lines.push(strip_cr(&content[start..]));
    }
    lines
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Serialize records as CSV text. Empty records become empty lines.
pub fn write_records(records: &[Vec<String>]) -> SheetResult<Vec<u8>> {
    let mut out = Vec::new();
    for record in records {
        if record.is_empty() {
            out.push(b'\n');
            continue;
        }

        let mut writer = ::csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        writer.write_record(record)?;
        let bytes = writer
            .into_inner()
            .map_err(|e| SheetError::Source(format!("failed to flush CSV: {e}")))?;
        out.extend_from_slice(&bytes);
    }
    Ok(out)
}

impl RowSource for CsvSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read_rows(&mut self) -> SheetResult<Vec<SourceRow>> {
        let content = self.retry.run("read csv", || fs::read(&self.path))?;
        self.records = parse_records(&content)?;
        debug!(path = %self.path.display(), records = self.records.len(), "loaded csv");

        Ok(take_until_blank(
            self.records
                .iter()
                .enumerate()
                .map(|(i, cells)| SourceRow::new((i + 1).to_string(), cells.clone())),
        ))
    }

    fn write_row(&mut self, row_id: &str, cells: &[String]) -> SheetResult<()> {
        let idx = row_index(row_id)?;
        let record = self
            .records
            .get_mut(idx)
            .ok_or_else(|| SheetError::Source(format!("row {row_id} was never read")))?;
        *record = cells.to_vec();
        self.dirty = true;
        Ok(())
    }

    fn finish(&mut self) -> SheetResult<()> {
        if !self.dirty && self.output.is_none() {
            return Ok(());
        }

        let bytes = write_records(&self.records)?;
        let target = self.target();
        write_atomic(target, &bytes, &self.retry, "write csv")?;
        debug!(path = %target.display(), "wrote csv");
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_read_stops_at_blank_row() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sheet.csv");
        fs::write(&path, "Func1,x\n?,1\n,\n?,2\n").unwrap();

        let mut source = CsvSource::new(&path);
        let rows = source.read_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].id, "2");
        assert_eq!(source.records().len(), 4);
    }

    #[test]
    fn test_empty_line_is_an_empty_record() {
        let records = parse_records(b"Func1\n?\n\n?\n").unwrap();
        assert_eq!(records.len(), 4);
        assert!(records[2].is_empty());
        assert_eq!(records[3], vec!["?".to_string()]);
    }

    #[test]
    fn test_quoted_newline_stays_in_one_record() {
        let records = parse_records(b"a,b\r\n\"line one\n\nline two\",x\r\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1][0], "line one\n\nline two");
        assert_eq!(records[1][1], "x");
    }

    #[test]
    fn test_read_stops_at_empty_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sheet.csv");
        fs::write(&path, "Func1\n?\n\n?\n").unwrap();

        let mut source = CsvSource::new(&path);
        let rows = source.read_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].id, "2");

        source.write_row("2", &["done".to_string()]).unwrap();
        source.finish().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Func1\ndone\n\n?\n");
    }

    #[test]
    fn test_ragged_rows_are_accepted() {
        let records = parse_records(b"a,b,c\n1\n1,2,3,4\n").unwrap();
        assert_eq!(records[1], vec!["1".to_string()]);
        assert_eq!(records[2].len(), 4);
    }

    #[test]
    fn test_write_back_preserves_untouched_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sheet.csv");
        fs::write(&path, "Func1,x\n?,1\n,\n?,2\n").unwrap();

        let mut source = CsvSource::new(&path);
        source.read_rows().unwrap();
        source
            .write_row("2", &["done".to_string(), "1".to_string()])
            .unwrap();
        source.finish().unwrap();

        let records = parse_records(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(records[1], vec!["done".to_string(), "1".to_string()]);
        assert_eq!(records[3], vec!["?".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_output_path_leaves_input_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in.csv");
        let out = dir.path().join("out.csv");
        fs::write(&path, "Func1\n?\n").unwrap();

        let mut source = CsvSource::new(&path).with_output(&out);
        source.read_rows().unwrap();
        source.write_row("2", &["x".to_string()]).unwrap();
        source.finish().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "Func1\n?\n");
        assert_eq!(fs::read_to_string(&out).unwrap(), "Func1\nx\n");
    }

    #[test]
    fn test_unchanged_file_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sheet.csv");
        fs::write(&path, "a,b\n1,2\n").unwrap();
        let before = fs::metadata(&path).unwrap().modified().unwrap();

        let mut source = CsvSource::new(&path);
        source.read_rows().unwrap();
        source.finish().unwrap();

        assert_eq!(fs::metadata(&path).unwrap().modified().unwrap(), before);
        assert!(!dir.path().join("sheet.csv.tmp").exists());
    }

    #[test]
    fn test_write_unknown_row_fails() {
        let mut source = CsvSource::new("unused.csv");
        assert!(source.write_row("5", &[]).is_err());
    }
}
