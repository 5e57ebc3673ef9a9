use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::store;

/// One observed (query, destination) pair and how often it has been seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
  pub query: String,
  pub destination: Option<String>,
  pub count: u64,
}

/// Insertion-ordered history of every question users have asked.
///
/// Keyed logically by (query, destination): repeats increment the existing
/// row's count instead of appending. Rows are never deleted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryHistory {
  records: Vec<QueryRecord>,
}

impl QueryHistory {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn records(&self) -> &[QueryRecord] {
    &self.records
  }

  /// Number of distinct (query, destination) rows.
  pub fn distinct(&self) -> usize {
    self.records.len()
  }

  /// Total observations across all rows — equal to the cumulative number
  /// of record calls, since rows are never deleted.
  pub fn observations(&self) -> u64 {
    self.records.iter().map(|r| r.count).sum()
  }

  /// Record one observation of (query, destination). Returns the row's
  /// updated count.
  pub fn observe(&mut self, query: &str, destination: Option<&str>) -> u64 {
    if let Some(record) = self
      .records
      .iter_mut()
      .find(|r| r.query == query && r.destination.as_deref() == destination)
    {
      record.count += 1;
      return record.count;
    }

    self.records.push(QueryRecord {
      query: query.to_string(),
      destination: destination.map(|d| d.to_string()),
      count: 1,
    });
    1
  }

  /// Rows tagged with the given destination, in insertion order.
  pub fn for_destination(&self, destination: &str) -> Vec<&QueryRecord> {
    self
      .records
      .iter()
      .filter(|r| r.destination.as_deref() == Some(destination))
      .collect()
  }

  /// All rows sorted by descending count; ties keep insertion order.
  pub fn by_frequency(&self) -> Vec<&QueryRecord> {
    let mut ranked: Vec<&QueryRecord> = self.records.iter().collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
  }
}

/// Load the history store from disk.
///
/// Missing or corrupt files are the caller's decision to degrade on; this
/// returns the error rather than guessing.
pub fn load(path: &Path) -> Result<QueryHistory, EngineError> {
  let contents = std::fs::read_to_string(path)?;
  let history = serde_json::from_str(&contents).map_err(std::io::Error::from)?;
  Ok(history)
}

/// Persist the full history store (tmp file + rename).
pub fn save(history: &QueryHistory, path: &Path) -> Result<(), EngineError> {
  let contents = serde_json::to_string_pretty(history).map_err(std::io::Error::from)?;
  store::write_atomic(path, &contents)?;
  Ok(())
}
