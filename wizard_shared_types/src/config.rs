//! Runtime configuration knobs for the engine.

use serde::{Deserialize, Serialize};

/// Flags informing the prover runtime and the declaration bookkeeping about
/// optional (never protocol-semantic) behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Whether the prover re-checks every declared query against its own
    /// assignment before sealing the proof. Catches definition bugs early at
    /// the cost of one extra pass over the columns.
    pub check_queries_during_proving: bool,

    /// Whether declaration sites capture a backtrace into the object's
    /// metadata. Diagnostics only; has no effect on the protocol.
    pub capture_tracebacks: bool,
}

impl EngineConfig {
    /// Configuration for development: self-checks on, tracebacks on.
    pub fn debug_default() -> Self {
        Self {
            check_queries_during_proving: true,
            capture_tracebacks: true,
        }
    }

    /// Configuration for production proving: self-checks on (they are cheap
    /// relative to commitment work), tracebacks off.
    pub fn release_default() -> Self {
        Self {
            check_queries_during_proving: true,
            capture_tracebacks: false,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::debug_default()
        } else {
            Self::release_default()
        }
    }
}
