use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use dirs::home_dir;

/// File holding the query history, one row per (query, destination) pair.
pub const HISTORY_FILE: &str = "search_history.json";

/// File holding the serialized trained model blob.
pub const MODEL_FILE: &str = "model.json";

/// Get the engine's data root directory (~/.wayfinder)
pub fn get_data_root() -> io::Result<PathBuf> {
  // Allow tests or callers to override the root directory via env var
  if let Ok(custom_root) = std::env::var("WAYFINDER_DATA_ROOT") {
    return Ok(PathBuf::from(custom_root));
  }

  let home = home_dir()
    .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "could not find home directory"))?;
  Ok(home.join(".wayfinder"))
}

/// Atomic write: tmp file in the same directory, then rename.
///
/// A crash mid-write leaves the previous file intact; the rename is the
/// commit point.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }

  let tmp = path.with_extension("tmp");
  fs::write(&tmp, contents)?;
  fs::rename(&tmp, path)?;

  Ok(())
}
