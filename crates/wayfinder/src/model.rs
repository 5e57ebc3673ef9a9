use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::history::QueryHistory;
use crate::kmeans::{self, KMeansModel};
use crate::similarity;
use crate::store;
use crate::tfidf::TfidfVectorizer;

/// A previously-seen query indexed for nearest-neighbor lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedQuery {
  pub query: String,
  pub vector: Vec<f32>,
  /// Observations of this query text summed across destinations.
  pub frequency: u64,
}

/// A nearest-neighbor hit: a previously-seen query and its similarity.
#[derive(Debug, Clone)]
pub struct Neighbor {
  pub query: String,
  pub similarity: f32,
}

/// The artifact rebuilt wholesale from history on every retrain.
///
/// Everything needed for inference travels together: the fitted
/// vectorizer, the query index, the clustering (when the corpus supports
/// more than one cluster), and the per-cluster representative queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
  pub vectorizer: TfidfVectorizer,
  pub index: Vec<IndexedQuery>,
  pub clustering: Option<KMeansModel>,
  pub common_queries: Vec<String>,
  pub trained_at: DateTime<Utc>,
}

impl TrainedModel {
  /// Fit the full artifact from history.
  ///
  /// The corpus is the frequency-weighted multiset: each row's query text
  /// repeated `count` times, so commonly-asked questions pull the fit
  /// toward themselves.
  pub fn fit(history: &QueryHistory, config: &EngineConfig) -> Result<Self, EngineError> {
    let documents: Vec<String> = history
      .records()
      .iter()
      .flat_map(|r| std::iter::repeat(r.query.clone()).take(r.count as usize))
      .collect();

    let vectorizer = TfidfVectorizer::fit(&documents)?;

    // Aggregate rows into distinct query texts, preserving first-seen order.
    let mut order: Vec<String> = Vec::new();
    let mut frequencies: HashMap<String, u64> = HashMap::new();
    for record in history.records() {
      if !frequencies.contains_key(&record.query) {
        order.push(record.query.clone());
      }
      *frequencies.entry(record.query.clone()).or_insert(0) += record.count;
    }

    let index: Vec<IndexedQuery> = order
      .iter()
      .map(|query| IndexedQuery {
        query: query.clone(),
        vector: vectorizer.transform(query),
        frequency: frequencies[query],
      })
      .collect();

    let k = kmeans::cluster_count(history.distinct(), config.max_clusters);
    let (clustering, common_queries) = if k > 1 {
      let document_vectors: Vec<Vec<f32>> =
        documents.iter().map(|d| vectorizer.transform(d)).collect();
      let model = KMeansModel::fit(&document_vectors, k)?;
      let representatives = pick_representatives(&model, &index);
      (Some(model), representatives)
    } else {
      (None, Vec::new())
    };

    Ok(Self { vectorizer, index, clustering, common_queries, trained_at: Utc::now() })
  }

  pub fn common_queries(&self) -> &[String] {
    &self.common_queries
  }

  pub fn cluster_count(&self) -> usize {
    self.clustering.as_ref().map(|c| c.k()).unwrap_or(0)
  }

  /// Vectorize arbitrary text with the fitted vocabulary.
  pub fn vector_for(&self, text: &str) -> Vec<f32> {
    self.vectorizer.transform(text)
  }

  /// Previously-seen queries nearest to the given text, best first.
  ///
  /// Zero-similarity entries are dropped; fewer than `limit` hits is a
  /// normal outcome for sparse vocabularies.
  pub fn nearest(&self, text: &str, limit: usize) -> Vec<Neighbor> {
    let probe = self.vectorizer.transform(text);

    let mut neighbors: Vec<Neighbor> = self
      .index
      .iter()
      .map(|entry| Neighbor {
        query: entry.query.clone(),
        similarity: similarity::cosine(&probe, &entry.vector),
      })
      .filter(|n| n.similarity > 0.0)
      .collect();

    neighbors.sort_by(|a, b| {
      b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal)
    });
    neighbors.truncate(limit);
    neighbors
  }

  /// Load the persisted model blob.
  pub fn load(path: &Path) -> Result<Self, EngineError> {
    let contents = std::fs::read_to_string(path)?;
    let model = serde_json::from_str(&contents).map_err(std::io::Error::from)?;
    Ok(model)
  }

  /// Persist the model blob (tmp file + rename).
  pub fn save(&self, path: &Path) -> Result<(), EngineError> {
    let contents = serde_json::to_string(self).map_err(std::io::Error::from)?;
    store::write_atomic(path, &contents)?;
    Ok(())
  }
}

/// One representative per cluster: the most frequent distinct query
/// assigned to it, in cluster-index order. Empty clusters contribute
/// nothing.
fn pick_representatives(model: &KMeansModel, index: &[IndexedQuery]) -> Vec<String> {
  let assignments: Vec<usize> = index.iter().map(|entry| model.assign(&entry.vector)).collect();

  let mut representatives = Vec::new();
  for cluster in 0..model.k() {
    let best = index
      .iter()
      .zip(&assignments)
      .filter(|(_, &assigned)| assigned == cluster)
      .map(|(entry, _)| entry)
      .max_by_key(|entry| entry.frequency);

    if let Some(entry) = best {
      representatives.push(entry.query.clone());
    }
  }

  representatives
}
