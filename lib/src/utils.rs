use serde::Serialize;
use std::{io, path::Path};

#[cfg(not(debug_assertions))]
use human_panic::setup_panic;
use tracing::{
  subscriber::{DefaultGuard, SetGlobalDefaultError},
  Level,
};

#[cfg(debug_assertions)]
extern crate better_panic;

// [NOTE] tracing
//
// Stage functions carry `#[tracing::instrument]`, so every log line emitted while
// a stage runs is tagged with the stage name. Per-epoch progress is logged at
// INFO, per-batch details at TRACE.

pub fn install_logger(level: Level) -> Result<(), SetGlobalDefaultError> {
  let subscriber = tracing_subscriber::fmt()
    .compact()
    .with_max_level(level)
    .finish();
  tracing::subscriber::set_global_default(subscriber)
}

pub fn init_logging(level: Level) -> Result<(), SetGlobalDefaultError> {
  // Human Panic. Only enabled when *not* debugging.
  #[cfg(not(debug_assertions))]
  {
    setup_panic!();
  }

  // Better Panic. Only enabled *when* debugging.
  #[cfg(debug_assertions)]
  {
    better_panic::Settings::debug()
      .most_recent_first(false)
      .lineno_suffix(true)
      .verbosity(better_panic::Verbosity::Full)
      .install();
  }

  install_logger(level)?;

  Ok(())
}

/// Thread-local subscriber for tests; logging stops when the guard is dropped.
pub fn init_logging_tests() -> DefaultGuard {
  let subscriber = tracing_subscriber::fmt()
    .compact()
    .with_test_writer()
    .with_max_level(Level::DEBUG)
    .finish();
  tracing::subscriber::set_default(subscriber)
}

pub fn serialize_to_file<T: Serialize>(path: &Path, obj: &T) -> io::Result<()> {
  let buff = serde_json::to_string_pretty(obj)?;
  std::fs::write(path, buff)
}
