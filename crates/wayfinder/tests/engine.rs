use serial_test::serial;
use std::env;
use tempfile::TempDir;
use wayfinder::config::EngineConfig;
use wayfinder::engine::{SuggestionEngine, DEFAULT_SUGGESTIONS};
use wayfinder::error::{EngineError, TrainOutcome};

fn setup_temp_data_root() -> TempDir {
  let temp_dir = TempDir::new().unwrap();
  env::set_var("WAYFINDER_DATA_ROOT", temp_dir.path());
  temp_dir
}

fn open_engine() -> SuggestionEngine {
  SuggestionEngine::open(EngineConfig::default()).unwrap()
}

/// Ten distinct queries with enough shared vocabulary that a TF-IDF fit
/// with a document-frequency floor of 2 has terms left to index.
fn trainable_queries() -> Vec<(&'static str, Option<&'static str>)> {
  vec![
    ("best attractions in rome", Some("Rome")),
    ("best attractions in tokyo", Some("Tokyo")),
    ("cheap flights to rome", Some("Rome")),
    ("cheap flights to tokyo", Some("Tokyo")),
    ("local food in rome", Some("Rome")),
    ("local food in tokyo", Some("Tokyo")),
    ("best hotels in rome", Some("Rome")),
    ("best hotels in tokyo", Some("Tokyo")),
    ("what should i pack", None),
    ("when should i visit", None),
  ]
}

#[test]
#[serial]
fn test_recording_same_pair_increments_one_row() {
  let _temp = setup_temp_data_root();
  let mut engine = open_engine();

  for _ in 0..5 {
    engine.record("best attractions", Some("Rome")).unwrap();
  }

  assert_eq!(engine.history().distinct(), 1);
  assert_eq!(engine.history().observations(), 5);
  assert_eq!(engine.history().records()[0].count, 5);
}

#[test]
#[serial]
fn test_same_query_different_destinations_are_distinct_rows() {
  let _temp = setup_temp_data_root();
  let mut engine = open_engine();

  engine.record("best attractions", Some("Rome")).unwrap();
  engine.record("best attractions", Some("Tokyo")).unwrap();
  engine.record("best attractions", None).unwrap();

  assert_eq!(engine.history().distinct(), 3);
}

#[test]
#[serial]
fn test_history_survives_reopen() {
  let _temp = setup_temp_data_root();

  {
    let mut engine = open_engine();
    engine.record("best attractions", Some("Rome")).unwrap();
    engine.record("best attractions", Some("Rome")).unwrap();
    engine.record("local food", None).unwrap();
  }

  let reopened = open_engine();
  assert_eq!(reopened.history().distinct(), 2);
  assert_eq!(reopened.history().observations(), 3);

  let rome = reopened
    .history()
    .records()
    .iter()
    .find(|r| r.destination.as_deref() == Some("Rome"))
    .unwrap();
  assert_eq!(rome.query, "best attractions");
  assert_eq!(rome.count, 2);
}

#[test]
#[serial]
fn test_retrain_fires_only_on_every_tenth_observation() {
  let _temp = setup_temp_data_root();
  let mut engine = open_engine();

  for (position, (query, destination)) in trainable_queries().into_iter().enumerate() {
    let outcome = engine.record(query, destination).unwrap();

    if position < 9 {
      assert!(outcome.trained.is_none(), "no retrain expected at observation {}", position + 1);
      assert!(engine.model().is_none());
    } else {
      // The tenth observation trains for real.
      assert!(matches!(outcome.trained, Some(TrainOutcome::Trained { .. })));
      assert!(engine.model().is_some());
    }
  }

  // Observations 11 through 19 stay quiet; the twentieth fires again.
  for repeat in 0..9 {
    let outcome = engine.record("best attractions in rome", Some("Rome")).unwrap();
    assert!(outcome.trained.is_none(), "no retrain expected after repeat {}", repeat + 1);
  }
  let outcome = engine.record("best attractions in rome", Some("Rome")).unwrap();
  assert_eq!(engine.history().observations(), 20);
  assert!(matches!(outcome.trained, Some(TrainOutcome::Trained { .. })));
}

#[test]
#[serial]
fn test_train_below_sample_floor_reports_not_enough_data() {
  let _temp = setup_temp_data_root();
  let mut engine = open_engine();

  engine.record("best attractions", Some("Rome")).unwrap();
  engine.record("local food", Some("Rome")).unwrap();

  let outcome = engine.train().unwrap();
  assert_eq!(outcome, TrainOutcome::NotEnoughData { have: 2, need: 10 });
  assert!(engine.model().is_none());
}

#[test]
#[serial]
fn test_fresh_engine_returns_default_suggestions() {
  let _temp = setup_temp_data_root();
  let engine = open_engine();

  let bare = engine.suggest(None, 3).unwrap();
  assert_eq!(bare, DEFAULT_SUGGESTIONS.to_vec());

  let tagged = engine.suggest(Some("Paris"), 3).unwrap();
  assert_eq!(tagged, DEFAULT_SUGGESTIONS.to_vec());
}

#[test]
#[serial]
fn test_untrained_engine_ranks_history_by_count() {
  let _temp = setup_temp_data_root();
  let mut engine = open_engine();

  engine.record("rarely asked", None).unwrap();
  for _ in 0..3 {
    engine.record("asked all the time", None).unwrap();
  }
  for _ in 0..2 {
    engine.record("asked sometimes", None).unwrap();
  }

  let suggestions = engine.suggest(None, 3).unwrap();
  assert_eq!(suggestions, vec!["asked all the time", "asked sometimes", "rarely asked"]);
}

#[test]
#[serial]
fn test_untrained_engine_prefers_destination_rows() {
  let _temp = setup_temp_data_root();
  let mut engine = open_engine();

  for _ in 0..5 {
    engine.record("global favourite", None).unwrap();
  }
  engine.record("colosseum tickets", Some("Rome")).unwrap();
  engine.record("vatican hours", Some("Rome")).unwrap();
  engine.record("vatican hours", Some("Rome")).unwrap();

  let rome = engine.suggest(Some("Rome"), 3).unwrap();
  assert_eq!(rome, vec!["vatican hours", "colosseum tickets"]);

  // Unknown destination falls back to the full history.
  let lima = engine.suggest(Some("Lima"), 3).unwrap();
  assert_eq!(lima[0], "global favourite");
}

#[test]
#[serial]
fn test_trained_engine_serves_common_queries_without_destination() {
  let _temp = setup_temp_data_root();
  let mut engine = open_engine();

  for (query, destination) in trainable_queries() {
    engine.record(query, destination).unwrap();
  }
  assert!(engine.model().is_some());

  let suggestions = engine.suggest(None, 3).unwrap();
  let common = engine.model().unwrap().common_queries();

  assert!(!suggestions.is_empty());
  assert!(suggestions.len() <= 3);
  assert_eq!(suggestions, common.iter().take(3).cloned().collect::<Vec<_>>());
}

#[test]
#[serial]
fn test_destination_filtering_requires_similarity_to_tagged_history() {
  let _temp = setup_temp_data_root();
  let mut engine = open_engine();

  // Rome and Tokyo vocabularies are fully disjoint, so a representative
  // from the Tokyo side can never clear the similarity floor for Rome.
  let rows: Vec<(&str, Option<&str>, u64)> = vec![
    ("colosseum skip line tickets", Some("Rome"), 5),
    ("colosseum guided tours", Some("Rome"), 4),
    ("cheap tickets colosseum", Some("Rome"), 3),
    ("best sushi markets shinjuku", Some("Tokyo"), 5),
    ("sushi breakfast spots shinjuku", Some("Tokyo"), 4),
    ("shinjuku sushi omakase", Some("Tokyo"), 3),
    ("what should travelers pack", None, 1),
    ("what should travelers wear", None, 1),
    ("travel insurance worth buying", None, 1),
    ("travel insurance annual plans", None, 1),
  ];
  for (query, destination, count) in rows {
    for _ in 0..count {
      engine.record(query, destination).unwrap();
    }
  }

  let outcome = engine.train().unwrap();
  assert!(outcome.is_trained());
  let model = engine.model().unwrap();

  // Sanity: at least one representative is recognizably about Rome, so
  // the destination filter has something to return.
  let rome_rows = engine.history().for_destination("Rome");
  let rome_similar = model.common_queries().iter().any(|common| {
    let common_vector = model.vector_for(common);
    rome_rows.iter().any(|row| {
      wayfinder::similarity::cosine(&common_vector, &model.vector_for(&row.query)) > 0.3
    })
  });
  assert!(rome_similar);

  let picks = engine.suggest(Some("Rome"), 3).unwrap();
  assert!(!picks.is_empty());
  for pick in &picks {
    assert!(!pick.contains("sushi"), "Tokyo-only suggestion leaked into Rome: {pick}");
    assert!(!pick.contains("shinjuku"), "Tokyo-only suggestion leaked into Rome: {pick}");

    let pick_vector = model.vector_for(pick);
    let matches_rome = rome_rows.iter().any(|row| {
      wayfinder::similarity::cosine(&pick_vector, &model.vector_for(&row.query)) > 0.3
    });
    assert!(matches_rome, "suggestion {pick} has no similar Rome query");
  }
}

#[test]
#[serial]
fn test_scenario_rome_heavy_history_trains_or_falls_back() {
  let _temp = setup_temp_data_root();
  let mut engine = open_engine();

  for _ in 0..3 {
    engine.record("best attractions", Some("Rome")).unwrap();
  }
  engine.record("best attractions", Some("Tokyo")).unwrap();
  for query in
    ["cheap flights", "local food", "metro passes", "late night bars", "day trips", "museum hours"]
  {
    engine.record(query, Some("Rome")).unwrap();
  }

  // Ten observations total: the trigger fired, but only 8 distinct rows
  // exist, so the pass reported NotEnoughData and no model was fitted.
  assert_eq!(engine.history().observations(), 10);
  assert_eq!(engine.history().distinct(), 8);
  assert!(engine.model().is_none());

  let suggestions = engine.suggest(Some("Rome"), 3).unwrap();
  assert!(!suggestions.is_empty());
  assert!(suggestions.len() <= 3);
  assert_eq!(suggestions[0], "best attractions");
}

#[test]
#[serial]
fn test_training_failure_leaves_persisted_model_untouched() {
  let temp = setup_temp_data_root();

  // A sentinel standing in for a previously-good model blob. It does not
  // parse, so the engine opens without a model, but training must still
  // leave the bytes alone.
  let model_path = temp.path().join("model.json");
  std::fs::write(&model_path, "sentinel model bytes").unwrap();

  let mut engine = open_engine();
  assert!(engine.model().is_none());

  // Ten distinct rows of one identical query text: every term is in every
  // document, frequency pruning empties the vocabulary, and the fit fails.
  for destination in
    ["Rome", "Tokyo", "Paris", "Lima", "Oslo", "Cairo", "Sydney", "Quito", "Seoul", "Minsk"]
  {
    engine.record("same question", Some(destination)).unwrap();
  }

  let result = engine.train();
  assert!(matches!(result, Err(EngineError::Training(_))));
  assert!(engine.model().is_none());
  assert_eq!(std::fs::read_to_string(&model_path).unwrap(), "sentinel model bytes");
}

#[test]
#[serial]
fn test_scheduled_retrain_failure_does_not_fail_record() {
  let _temp = setup_temp_data_root();
  let mut engine = open_engine();

  let destinations =
    ["Rome", "Tokyo", "Paris", "Lima", "Oslo", "Cairo", "Sydney", "Quito", "Seoul", "Minsk"];
  for (position, destination) in destinations.into_iter().enumerate() {
    let outcome = engine.record("same question", Some(destination)).unwrap();
    if position == 9 {
      // Trigger fired, fit failed, record still succeeded.
      assert!(outcome.trained.is_none());
    }
  }

  assert_eq!(engine.history().observations(), 10);
  assert!(engine.model().is_none());
}

#[test]
#[serial]
fn test_model_survives_reopen() {
  let _temp = setup_temp_data_root();

  {
    let mut engine = open_engine();
    for (query, destination) in trainable_queries() {
      engine.record(query, destination).unwrap();
    }
    assert!(engine.model().is_some());
  }

  let reopened = open_engine();
  let model = reopened.model().unwrap();
  assert!(!model.common_queries().is_empty());

  let suggestions = reopened.suggest(None, 3).unwrap();
  assert_eq!(suggestions, model.common_queries().iter().take(3).cloned().collect::<Vec<_>>());
}

#[test]
#[serial]
fn test_nearest_requires_model_and_ranks_hits() {
  let _temp = setup_temp_data_root();
  let mut engine = open_engine();

  assert!(engine.nearest("anything", 5).unwrap().is_empty());

  for (query, destination) in trainable_queries() {
    engine.record(query, destination).unwrap();
  }

  let neighbors = engine.nearest("best attractions in rome", 3).unwrap();
  assert!(!neighbors.is_empty());
  assert_eq!(neighbors[0].query, "best attractions in rome");
  for pair in neighbors.windows(2) {
    assert!(pair[0].similarity >= pair[1].similarity);
  }
}

#[test]
#[serial]
fn test_empty_inputs_are_rejected() {
  let _temp = setup_temp_data_root();
  let mut engine = open_engine();

  assert!(matches!(engine.record("", None), Err(EngineError::EmptyQuery)));
  assert!(matches!(engine.record("   ", None), Err(EngineError::EmptyQuery)));
  assert!(matches!(engine.record("query", Some("")), Err(EngineError::EmptyDestination)));
  assert!(matches!(engine.record("query", Some("  ")), Err(EngineError::EmptyDestination)));

  assert!(matches!(engine.suggest(Some(""), 3), Err(EngineError::EmptyDestination)));
  assert!(matches!(engine.nearest("", 5), Err(EngineError::EmptyQuery)));

  // Nothing was silently accepted.
  assert_eq!(engine.history().distinct(), 0);
}

#[test]
#[serial]
fn test_corrupt_history_degrades_to_empty_state() {
  let temp = setup_temp_data_root();
  std::fs::write(temp.path().join("search_history.json"), "{{{ not json").unwrap();

  let engine = open_engine();
  assert_eq!(engine.history().distinct(), 0);
  assert_eq!(engine.suggest(None, 3).unwrap(), DEFAULT_SUGGESTIONS.to_vec());
}

#[test]
#[serial]
fn test_persistence_failure_keeps_in_memory_update() {
  let temp = setup_temp_data_root();

  // Point the data root below a regular file so directory creation fails.
  let blocker = temp.path().join("blocker");
  std::fs::write(&blocker, "i am a file").unwrap();
  env::set_var("WAYFINDER_DATA_ROOT", blocker.join("nested"));

  let mut engine = open_engine();
  let result = engine.record("best attractions", Some("Rome"));

  assert!(matches!(result, Err(EngineError::Io(_))));
  assert_eq!(engine.history().distinct(), 1);
  assert_eq!(engine.history().observations(), 1);
}
