use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod engine;
mod error;
mod history;
mod kmeans;
mod model;
mod similarity;
mod store;
mod tfidf;

#[derive(Parser)]
#[command(name = "wayfinder")]
#[command(
  about = "Wayfinder - Travel Query Suggestions\nLearns from the questions travelers ask and suggests the next ones"
)]
#[command(version)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Record a user query, optionally tagged with a destination
  Record {
    /// The question as the user typed it
    query: String,
    /// Destination the question is about
    #[arg(short, long)]
    destination: Option<String>,
  },
  /// Suggest follow-up questions
  Suggest {
    /// Destination to tailor suggestions to
    #[arg(short, long)]
    destination: Option<String>,
    /// Maximum number of suggestions
    #[arg(short = 'n', long)]
    top_n: Option<usize>,
  },
  /// Refit the suggestion model from the recorded history
  Train {
    /// Minimum distinct queries required before fitting
    #[arg(short, long)]
    min_samples: Option<usize>,
  },
  /// Show previously-seen queries similar to the given text
  Similar {
    /// Text to look up
    query: String,
    /// Maximum number of matches
    #[arg(short, long)]
    limit: Option<usize>,
  },
  /// List recorded queries by frequency
  History {
    /// Only show queries tagged with this destination
    #[arg(short, long)]
    destination: Option<String>,
  },
  /// Summarize the stored history and model
  Stats,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Commands::Record { query, destination } => {
      commands::record(&query, destination.as_deref())?;
    }
    Commands::Suggest { destination, top_n } => {
      commands::suggest(destination.as_deref(), top_n)?;
    }
    Commands::Train { min_samples } => {
      commands::train(min_samples)?;
    }
    Commands::Similar { query, limit } => {
      commands::similar(&query, limit)?;
    }
    Commands::History { destination } => {
      commands::history(destination.as_deref())?;
    }
    Commands::Stats => {
      commands::stats()?;
    }
  }

  Ok(())
}
