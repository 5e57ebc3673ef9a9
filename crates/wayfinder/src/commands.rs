use anyhow::Result;
use colored::*;

use crate::config::EngineConfig;
use crate::engine::SuggestionEngine;
use crate::error::TrainOutcome;

/// Record one user query, optionally tagged with a destination
pub fn record(query: &str, destination: Option<&str>) -> Result<()> {
  let mut engine = SuggestionEngine::open(EngineConfig::default())?;
  let outcome = engine.record(query, destination)?;

  match destination {
    Some(destination) => println!(
      "{} Recorded {} for {} (seen {} times)",
      "✓".green(),
      query.cyan(),
      destination.yellow(),
      outcome.count
    ),
    None => println!("{} Recorded {} (seen {} times)", "✓".green(), query.cyan(), outcome.count),
  }

  if let Some(trained) = outcome.trained {
    report_training(&trained);
  }

  Ok(())
}

/// Print ranked follow-up suggestions
pub fn suggest(destination: Option<&str>, top_n: Option<usize>) -> Result<()> {
  let engine = SuggestionEngine::open(EngineConfig::default())?;
  let top_n = top_n.unwrap_or(engine.config().default_top_n);
  let suggestions = engine.suggest(destination, top_n)?;

  if let Some(destination) = destination {
    println!("Suggested questions for {}:", destination.yellow());
  } else {
    println!("Suggested questions:");
  }

  for (position, suggestion) in suggestions.iter().enumerate() {
    println!("  {}. {}", position + 1, suggestion.cyan());
  }

  Ok(())
}

/// Refit the model from the recorded history
pub fn train(min_samples: Option<usize>) -> Result<()> {
  let mut config = EngineConfig::default();
  if let Some(min_samples) = min_samples {
    config.min_samples = min_samples;
  }

  let mut engine = SuggestionEngine::open(config)?;
  let outcome = engine.train()?;
  report_training(&outcome);

  Ok(())
}

/// Show previously-seen queries similar to the given text
pub fn similar(query: &str, limit: Option<usize>) -> Result<()> {
  let engine = SuggestionEngine::open(EngineConfig::default())?;
  let limit = limit.unwrap_or(engine.config().default_neighbors);
  let neighbors = engine.nearest(query, limit)?;

  if neighbors.is_empty() {
    if engine.model().is_none() {
      println!("No model trained yet. Record more queries or run {}.", "wayfinder train".cyan());
    } else {
      println!("No similar queries found for: {}", query.yellow());
    }
    return Ok(());
  }

  for neighbor in neighbors {
    println!("{:.3}  {}", neighbor.similarity, neighbor.query.cyan());
  }

  Ok(())
}

/// List recorded queries sorted by how often they were asked
pub fn history(destination: Option<&str>) -> Result<()> {
  let engine = SuggestionEngine::open(EngineConfig::default())?;
  let records = engine.history().by_frequency();

  let filtered: Vec<_> = match destination {
    Some(destination) => {
      records.into_iter().filter(|r| r.destination.as_deref() == Some(destination)).collect()
    }
    None => records,
  };

  if filtered.is_empty() {
    match destination {
      Some(destination) => println!("No queries recorded for {}", destination.yellow()),
      None => println!("No queries recorded yet"),
    }
    return Ok(());
  }

  for record in filtered {
    match &record.destination {
      Some(destination) => {
        println!("{:>4}  {} ({})", record.count, record.query.cyan(), destination.yellow())
      }
      None => println!("{:>4}  {}", record.count, record.query.cyan()),
    }
  }

  Ok(())
}

/// Summarize the stored history and model
pub fn stats() -> Result<()> {
  let engine = SuggestionEngine::open(EngineConfig::default())?;
  let history = engine.history();

  println!("Data root:     {}", engine.data_root().display());
  println!("Distinct rows: {}", history.distinct());
  println!("Observations:  {}", history.observations());

  match engine.model() {
    Some(model) => {
      println!("Model:         trained {}", model.trained_at.format("%Y-%m-%d %H:%M:%S UTC"));
      println!("Vocabulary:    {} terms", model.vectorizer.vocabulary_len());
      println!("Clusters:      {}", model.cluster_count());
      if !model.common_queries().is_empty() {
        println!("Common queries:");
        for common in model.common_queries() {
          println!("  - {}", common.cyan());
        }
      }
    }
    None => println!("Model:         not trained yet"),
  }

  Ok(())
}

fn report_training(outcome: &TrainOutcome) {
  match outcome {
    TrainOutcome::Trained { documents, clusters } => {
      println!(
        "{} Model trained on {} weighted queries ({} clusters)",
        "✓".green(),
        documents,
        clusters
      );
    }
    TrainOutcome::NotEnoughData { have, need } => {
      println!("Not enough data to train yet: have {have} distinct queries, need {need}");
    }
  }
}
