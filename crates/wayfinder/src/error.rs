use thiserror::Error;

/// Error taxonomy for the suggestion engine
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("query text is empty")]
  EmptyQuery,

  #[error("destination tag is empty (omit it for destination-agnostic queries)")]
  EmptyDestination,

  #[error("storage error: {0}")]
  Io(#[from] std::io::Error),

  #[error("model training failed: {0}")]
  Training(String),
}

/// Result of a training pass that ran to completion.
///
/// "Not enough data" is an expected outcome, not an error: the engine
/// simply keeps serving suggestions from raw history until the corpus
/// grows past the sample floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainOutcome {
  /// A new model was fitted and swapped in.
  Trained { documents: usize, clusters: usize },
  /// Below the sample floor; any existing model is untouched.
  NotEnoughData { have: usize, need: usize },
}

impl TrainOutcome {
  pub fn is_trained(&self) -> bool {
    matches!(self, TrainOutcome::Trained { .. })
  }
}
