//! Runtime configuration for the `openings` tool.
//!
//! Every value has a default and can be overridden through an environment
//! variable. Per-invocation settings (search depth, contempt) are command
//! line flags instead.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CONFIG_DIR: &str = ".config/openings/data";
const DEV_DATA_DIR: &str = "./data";

/// Default caller-side limit for one engine search (in seconds).
const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 60;

/// Default number of retries on a fresh engine after a failed search.
const DEFAULT_ENGINE_RETRIES: u32 = 1;

/// Default number of plies an exercise starts above its pre-leaf node.
const DEFAULT_TRAINING_SPAN: u32 = 6;

/// Get the data directory holding the tree, trainings, exercises and profile.
///
/// Priority:
/// 1. `OPENINGS_DATA_DIR` env variable if set
/// 2. `$HOME/.config/openings/data` if HOME is set
/// 3. `./data` as fallback
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("OPENINGS_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}

/// Get the engine executable. `None` means common Stockfish locations are
/// searched.
pub fn get_engine_path() -> Option<PathBuf> {
    std::env::var("OPENINGS_ENGINE_PATH").ok().map(PathBuf::from)
}

/// Get the per-search engine timeout.
///
/// Reads `OPENINGS_ENGINE_TIMEOUT_SECS`, falling back to 60 seconds if unset
/// or unparsable.
pub fn get_engine_timeout() -> Duration {
    let secs = std::env::var("OPENINGS_ENGINE_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_ENGINE_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

/// Get the engine retry count from `OPENINGS_ENGINE_RETRIES` (default 1).
pub fn get_engine_retries() -> u32 {
    if let Ok(retries) = std::env::var("OPENINGS_ENGINE_RETRIES") {
        return retries.parse().unwrap_or(DEFAULT_ENGINE_RETRIES);
    }

    DEFAULT_ENGINE_RETRIES
}

/// Get the engine `Threads` option from `OPENINGS_ENGINE_THREADS`. Unset or
/// unparsable leaves the engine default.
pub fn get_engine_threads() -> Option<u32> {
    std::env::var("OPENINGS_ENGINE_THREADS")
        .ok()
        .and_then(|v| v.parse().ok())
}

/// Get the engine `Hash` size in MB from `OPENINGS_ENGINE_HASH_MB`.
pub fn get_engine_hash_mb() -> Option<u32> {
    std::env::var("OPENINGS_ENGINE_HASH_MB")
        .ok()
        .and_then(|v| v.parse().ok())
}

/// Get the exercise span from `OPENINGS_TRAINING_SPAN` (default 6 plies).
pub fn get_training_span() -> u32 {
    if let Ok(span) = std::env::var("OPENINGS_TRAINING_SPAN") {
        return span.parse().unwrap_or(DEFAULT_TRAINING_SPAN);
    }

    DEFAULT_TRAINING_SPAN
}
