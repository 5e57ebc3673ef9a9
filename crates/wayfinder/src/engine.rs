use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, TrainOutcome};
use crate::history::{self, QueryHistory, QueryRecord};
use crate::model::{Neighbor, TrainedModel};
use crate::similarity;
use crate::store;

/// Questions offered before any history exists.
pub const DEFAULT_SUGGESTIONS: [&str; 3] = [
  "What are popular attractions in this destination?",
  "What's the best time to visit?",
  "What should I pack for my trip?",
];

/// What a single record call did.
#[derive(Debug, Clone)]
pub struct RecordOutcome {
  /// Observation count of the recorded (query, destination) row.
  pub count: u64,
  /// Cumulative observations across the whole history.
  pub observations: u64,
  /// Set when this call hit the periodic retrain trigger and the pass ran
  /// to completion. A failed scheduled pass is logged, never surfaced.
  pub trained: Option<TrainOutcome>,
}

/// The suggestion engine: query history, trained model, ranking policy.
///
/// One engine owns one data root. Mutating calls take `&mut self`, so a
/// shared engine needs the caller to serialize writers; reads only ever
/// see a fully-swapped model.
pub struct SuggestionEngine {
  config: EngineConfig,
  data_root: PathBuf,
  history: QueryHistory,
  model: Option<TrainedModel>,
}

impl SuggestionEngine {
  /// Open the engine against the default data root, loading whatever
  /// persisted state is there.
  ///
  /// Missing or corrupt state is not fatal: the engine degrades to an
  /// empty history and default suggestions.
  pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
    let data_root = store::get_data_root()?;
    Ok(Self::open_at(config, data_root))
  }

  /// Open against an explicit data root.
  pub fn open_at(config: EngineConfig, data_root: PathBuf) -> Self {
    let history_path = data_root.join(store::HISTORY_FILE);
    let history = if history_path.exists() {
      match history::load(&history_path) {
        Ok(history) => {
          debug!(rows = history.distinct(), "loaded search history");
          history
        }
        Err(err) => {
          warn!("could not load search history, starting empty: {err}");
          QueryHistory::new()
        }
      }
    } else {
      QueryHistory::new()
    };

    let model_path = data_root.join(store::MODEL_FILE);
    let model = if model_path.exists() {
      match TrainedModel::load(&model_path) {
        Ok(model) => Some(model),
        Err(err) => {
          warn!("could not load trained model, continuing without: {err}");
          None
        }
      }
    } else {
      None
    };

    Self { config, data_root, history, model }
  }

  pub fn config(&self) -> &EngineConfig {
    &self.config
  }

  pub fn data_root(&self) -> &Path {
    &self.data_root
  }

  pub fn history(&self) -> &QueryHistory {
    &self.history
  }

  pub fn model(&self) -> Option<&TrainedModel> {
    self.model.as_ref()
  }

  /// Record one observation of (query, destination).
  ///
  /// The full history is persisted before returning; a persistence error
  /// is surfaced but the in-memory update is kept. Every
  /// `retrain_interval`-th observation triggers a training pass whose
  /// failure is logged rather than propagated.
  pub fn record(
    &mut self,
    query: &str,
    destination: Option<&str>,
  ) -> Result<RecordOutcome, EngineError> {
    if query.trim().is_empty() {
      return Err(EngineError::EmptyQuery);
    }
    let destination = validate_destination(destination)?;

    let count = self.history.observe(query, destination);
    history::save(&self.history, &self.history_path())?;

    let observations = self.history.observations();
    let trained = if observations % self.config.retrain_interval == 0 {
      match self.train() {
        Ok(outcome) => Some(outcome),
        Err(err) => {
          warn!(observations, "scheduled retrain failed: {err}");
          None
        }
      }
    } else {
      None
    };

    Ok(RecordOutcome { count, observations, trained })
  }

  /// Refit the model from the full history.
  ///
  /// Below `min_samples` distinct rows this is a no-op reported as
  /// `NotEnoughData`. A computation failure leaves both the in-memory
  /// model and the persisted blob exactly as they were.
  pub fn train(&mut self) -> Result<TrainOutcome, EngineError> {
    let have = self.history.distinct();
    if have < self.config.min_samples {
      debug!(have, need = self.config.min_samples, "not enough history to train");
      return Ok(TrainOutcome::NotEnoughData { have, need: self.config.min_samples });
    }

    let model = TrainedModel::fit(&self.history, &self.config)?;
    let outcome = TrainOutcome::Trained {
      documents: self.history.observations() as usize,
      clusters: model.cluster_count(),
    };

    // The in-memory swap happens even when persisting the blob fails.
    let saved = model.save(&self.model_path());
    self.model = Some(model);
    saved?;

    info!(
      documents = self.history.observations(),
      clusters = self.model.as_ref().map(|m| m.cluster_count()).unwrap_or(0),
      "model retrained"
    );
    Ok(outcome)
  }

  /// Ranked follow-up questions for the given destination.
  ///
  /// Ranking falls through four tiers: destination-filtered cluster
  /// representatives, then unfiltered representatives, then raw history
  /// by frequency, then the fixed default questions.
  pub fn suggest(
    &self,
    destination: Option<&str>,
    top_n: usize,
  ) -> Result<Vec<String>, EngineError> {
    let destination = validate_destination(destination)?;

    if let Some(model) = &self.model {
      if !model.common_queries().is_empty() {
        if let Some(destination) = destination {
          let picks = self.destination_filtered(model, destination, top_n);
          if !picks.is_empty() {
            return Ok(picks);
          }
        }
        return Ok(model.common_queries().iter().take(top_n).cloned().collect());
      }
    }

    if self.history.distinct() > 0 {
      return Ok(self.ranked_from_history(destination, top_n));
    }

    Ok(DEFAULT_SUGGESTIONS.iter().map(|s| s.to_string()).collect())
  }

  /// Previously-seen queries most similar to the given text.
  ///
  /// Empty until a model has been trained.
  pub fn nearest(&self, query: &str, limit: usize) -> Result<Vec<Neighbor>, EngineError> {
    if query.trim().is_empty() {
      return Err(EngineError::EmptyQuery);
    }

    Ok(self.model.as_ref().map(|m| m.nearest(query, limit)).unwrap_or_default())
  }

  /// Cluster representatives similar to at least one query already asked
  /// about this destination.
  fn destination_filtered(
    &self,
    model: &TrainedModel,
    destination: &str,
    top_n: usize,
  ) -> Vec<String> {
    let tagged: Vec<Vec<f32>> = self
      .history
      .for_destination(destination)
      .iter()
      .map(|record| model.vector_for(&record.query))
      .collect();

    if tagged.is_empty() {
      return Vec::new();
    }

    let mut picks = Vec::new();
    for common in model.common_queries() {
      let common_vector = model.vector_for(common);
      let relevant = tagged
        .iter()
        .any(|vector| similarity::cosine(&common_vector, vector) > self.config.similarity_threshold);

      if relevant {
        picks.push(common.clone());
        if picks.len() == top_n {
          break;
        }
      }
    }

    picks
  }

  /// Frequency-ranked fallback straight from history.
  fn ranked_from_history(&self, destination: Option<&str>, top_n: usize) -> Vec<String> {
    if let Some(destination) = destination {
      let mut tagged: Vec<&QueryRecord> = self.history.for_destination(destination);
      if !tagged.is_empty() {
        tagged.sort_by(|a, b| b.count.cmp(&a.count));
        return tagged.iter().take(top_n).map(|r| r.query.clone()).collect();
      }
    }

    self.history.by_frequency().iter().take(top_n).map(|r| r.query.clone()).collect()
  }

  fn history_path(&self) -> PathBuf {
    self.data_root.join(store::HISTORY_FILE)
  }

  fn model_path(&self) -> PathBuf {
    self.data_root.join(store::MODEL_FILE)
  }
}

fn validate_destination(destination: Option<&str>) -> Result<Option<&str>, EngineError> {
  match destination {
    Some(d) if d.trim().is_empty() => Err(EngineError::EmptyDestination),
    other => Ok(other),
  }
}
