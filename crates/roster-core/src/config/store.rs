//! Store backend configuration.

use serde::{Deserialize, Serialize};

/// Which store backend the kernel runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// The instrumented in-memory engine (tests, embedded use).
    Memory,
    /// PostgreSQL via sqlx.
    Postgres,
}

/// Store backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Selected backend.
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
        }
    }
}

fn default_backend() -> StoreBackend {
    StoreBackend::Postgres
}
