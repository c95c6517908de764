//! YAML snapshot store: a mapping of row id -> cells, persisted on every write.

use super::csv::parse_records;
use super::{take_until_blank, write_atomic, RetryPolicy, RowSource};
use crate::error::{SheetError, SheetResult};
use crate::types::SourceRow;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug)]
pub struct YamlStore {
    path: PathBuf,
    retry: RetryPolicy,
    rows: BTreeMap<String, Vec<String>>,
}

impl YamlStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            retry: RetryPolicy::default(),
            rows: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn load(&mut self) -> SheetResult<()> {
        let content = self.retry.run("read store", || fs::read_to_string(&self.path))?;
        self.rows = if content.trim().is_empty() {
            BTreeMap::new()
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(())
    }

    pub fn save(&self) -> SheetResult<()> {
        let content = serde_yaml::to_string(&self.rows)?;
        write_atomic(&self.path, content.as_bytes(), &self.retry, "write store")
    }

    pub fn insert(&mut self, row_id: impl Into<String>, cells: Vec<String>) {
        self.rows.insert(row_id.into(), cells);
    }

    pub fn get(&self, row_id: &str) -> Option<&Vec<String>> {
        self.rows.get(row_id)
    }

    /// Row ids in processing order: numeric ids ascending, then the rest
    pub fn ordered_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.rows.keys().cloned().collect();
        ids.sort_by(|a, b| match (a.parse::<u64>(), b.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            (Ok(_), Err(_)) => std::cmp::Ordering::Less,
            (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
            (Err(_), Err(_)) => a.cmp(b),
        });
        ids
    }
}

impl RowSource for YamlStore {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read_rows(&mut self) -> SheetResult<Vec<SourceRow>> {
        self.load()?;
        debug!(path = %self.path.display(), rows = self.rows.len(), "loaded store");
        Ok(take_until_blank(self.ordered_ids().into_iter().map(|id| {
            let cells = self.rows.get(&id).cloned().unwrap_or_default();
            SourceRow::new(id, cells)
        })))
    }

    fn write_row(&mut self, row_id: &str, cells: &[String]) -> SheetResult<()> {
        if !self.rows.contains_key(row_id) {
            return Err(SheetError::Source(format!("row {row_id} not in store")));
        }
        self.rows.insert(row_id.to_string(), cells.to_vec());
        self.save()
    }
}

/// Load a CSV file into a fresh store keyed by 1-based record number.
/// Returns the number of rows stored.
pub fn import_csv(csv_path: &Path, store_path: &Path) -> SheetResult<usize> {
    let content = fs::read(csv_path)?;
    let records = parse_records(&content)?;

    let mut store = YamlStore::new(store_path);
    for (i, cells) in records.into_iter().enumerate() {
        store.insert((i + 1).to_string(), cells);
    }
    store.save()?;

    info!(
        csv = %csv_path.display(),
        store = %store_path.display(),
        rows = store.rows.len(),
        "imported csv into store"
    );
    Ok(store.rows.len())
}
