use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Terms must appear in at least this many documents to enter the vocabulary.
const MIN_DOC_FREQ: usize = 2;

/// Terms appearing in more than this share of the corpus are pruned.
const MAX_DOC_FREQ_RATIO: f32 = 0.7;

/// Fitted TF-IDF vocabulary over the query corpus.
///
/// Terms are unigrams and bigrams of lowercased alphanumeric tokens.
/// Vectors are dense, one slot per vocabulary term, L2-normalized so that
/// a dot product is already a cosine similarity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
  vocabulary: HashMap<String, usize>,
  idf: Vec<f32>,
}

impl TfidfVectorizer {
  /// Fit vocabulary and idf weights over the document corpus.
  ///
  /// Fails when document-frequency pruning leaves nothing to index — the
  /// caller treats that as a failed (and skipped) training pass.
  pub fn fit(documents: &[String]) -> Result<Self, EngineError> {
    if documents.is_empty() {
      return Err(EngineError::Training("no documents to vectorize".to_string()));
    }

    let n_docs = documents.len();
    let tokenized: Vec<Vec<String>> = documents.iter().map(|d| terms(d)).collect();

    // Document frequency: how many documents contain each term.
    let mut df: HashMap<String, usize> = HashMap::new();
    for doc_terms in &tokenized {
      let unique: HashSet<&String> = doc_terms.iter().collect();
      for term in unique {
        *df.entry(term.clone()).or_insert(0) += 1;
      }
    }

    // Prune rare and ubiquitous terms; sort for a deterministic index order.
    let max_df = MAX_DOC_FREQ_RATIO * n_docs as f32;
    let mut kept: Vec<(String, usize)> = df
      .into_iter()
      .filter(|(_, freq)| *freq >= MIN_DOC_FREQ && (*freq as f32) <= max_df)
      .collect();
    kept.sort_by(|a, b| a.0.cmp(&b.0));

    if kept.is_empty() {
      return Err(EngineError::Training(
        "empty vocabulary after document-frequency pruning".to_string(),
      ));
    }

    let mut vocabulary = HashMap::with_capacity(kept.len());
    let mut idf = Vec::with_capacity(kept.len());
    for (index, (term, freq)) in kept.into_iter().enumerate() {
      vocabulary.insert(term, index);
      idf.push((n_docs as f32 / freq as f32).ln() + 1.0);
    }

    Ok(Self { vocabulary, idf })
  }

  /// Vectorize a single text against the fitted vocabulary.
  ///
  /// Texts sharing no vocabulary terms map to the zero vector, which any
  /// cosine comparison scores as 0.
  pub fn transform(&self, text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; self.idf.len()];

    for term in terms(text) {
      if let Some(&index) = self.vocabulary.get(&term) {
        vector[index] += self.idf[index];
      }
    }

    // L2 normalize
    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
      for value in &mut vector {
        *value /= magnitude;
      }
    }

    vector
  }

  pub fn vocabulary_len(&self) -> usize {
    self.idf.len()
  }
}

/// Lowercased alphanumeric tokens of at least two characters.
fn tokenize(text: &str) -> Vec<String> {
  text
    .split_whitespace()
    .map(|word| word.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase())
    .filter(|word| word.len() >= 2)
    .collect()
}

/// Unigrams plus adjacent-pair bigrams.
fn terms(text: &str) -> Vec<String> {
  let tokens = tokenize(text);
  let mut terms = tokens.clone();
  for pair in tokens.windows(2) {
    terms.push(format!("{} {}", pair[0], pair[1]));
  }
  terms
}
