//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! To change a default threshold or blocklist, only edit this file.

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "SQL Gate";

/// Scores below this are treated as safe
pub const DEFAULT_LOW_THRESHOLD: f32 = 0.5;

/// Scores at or above this are blocked (untrained fallback; a calibrated
/// model artifact carries its own operating threshold)
pub const DEFAULT_HIGH_THRESHOLD: f32 = 0.8;

/// Target precision for threshold calibration during training
pub const DEFAULT_TARGET_PRECISION: f32 = 0.9;

/// Held-out fraction for the train/test split
pub const DEFAULT_TEST_SIZE: f32 = 0.2;

/// Cross-validation fold count for the grid search
pub const DEFAULT_CV_FOLDS: usize = 5;

/// Regularization-strength candidates (inverse strength C)
pub const DEFAULT_C_GRID: [f32; 4] = [0.01, 0.1, 1.0, 10.0];

/// Seed for reproducible splits and folds
pub const DEFAULT_TRAIN_SEED: u64 = 42;

/// Feedback loop cadence between synthetic statements (milliseconds)
pub const DEFAULT_LOOP_INTERVAL_MS: u64 = 700;

/// Statements whose leading command is in this set are rejected outright
pub const DEFAULT_BLOCKED_COMMANDS: [&str; 8] = [
    "DROP", "DELETE", "TRUNCATE", "ALTER", "UPDATE", "INSERT", "GRANT", "REVOKE",
];

/// Keyword/comment tokens rejected anywhere in a statement
pub const DEFAULT_BLOCKED_TOKENS: [&str; 16] = [
    "UNION",
    "EXEC",
    "EXECUTE",
    "SHUTDOWN",
    "BENCHMARK",
    "SLEEP",
    "PG_SLEEP",
    "XP_CMDSHELL",
    "LOAD_FILE",
    "OUTFILE",
    "--",
    "/*",
    "#",
    "DROP",
    "TRUNCATE",
    "DELETE",
];

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get the data directory from environment or use the platform default
pub fn get_data_dir() -> std::path::PathBuf {
    std::env::var("SQLGATE_DATA_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| std::path::PathBuf::from("."))
                .join("sqlgate")
        })
}

/// Get the feedback loop interval from environment or use default
pub fn get_loop_interval_ms() -> u64 {
    std::env::var("SQLGATE_LOOP_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_LOOP_INTERVAL_MS)
}
