//! Application state

use scopegate_core::ScopeEngine;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The ScopeGate engine
    pub engine: Arc<ScopeEngine>,

    /// Server start time
    pub start_time: Instant,

    /// Debug mode flag
    pub debug: bool,
}

impl AppState {
    /// Create new application state
    pub fn new(engine: Arc<ScopeEngine>) -> Self {
        Self::with_debug(engine, false)
    }

    /// Create application state with debug mode
    pub fn with_debug(engine: Arc<ScopeEngine>, debug: bool) -> Self {
        Self {
            engine,
            start_time: Instant::now(),
            debug,
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
