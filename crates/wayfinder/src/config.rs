use serde::{Deserialize, Serialize};

/// Tunable knobs for the suggestion engine.
///
/// Fields rather than hardcoded constants so a front end can tune the
/// engine per deployment; the defaults are the shipped tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
  /// Retrain after every this many cumulative observations.
  pub retrain_interval: u64,
  /// Minimum distinct records before a training pass fits a model.
  pub min_samples: usize,
  /// Cosine similarity floor for destination-filtered suggestions.
  pub similarity_threshold: f32,
  /// Upper bound on k when clustering the query corpus.
  pub max_clusters: usize,
  /// Suggestions returned to the front end by default.
  pub default_top_n: usize,
  /// Neighbors returned by nearest-query lookup by default.
  pub default_neighbors: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      retrain_interval: 10,
      min_samples: 10,
      similarity_threshold: 0.3,
      max_clusters: 5,
      default_top_n: 3,
      default_neighbors: 5,
    }
  }
}
