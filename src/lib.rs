// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod params;
pub mod upstream;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::{AppConfig, Upstream};
pub use crate::error::{AggregatorError, ErrorEnvelope};

use tracing::{info, warn};

/// Log which upstreams are routable. Called once at startup, never logs secrets.
pub fn log_readiness(state: &AppState) {
    for upstream in Upstream::ALL {
        match state.gate.check(upstream) {
            config::gate::Readiness::Ready => {
                info!(upstream = upstream.name(), "upstream ready");
            }
            config::gate::Readiness::Unready(missing) => {
                warn!(
                    upstream = upstream.name(),
                    missing = ?missing,
                    "upstream not configured; its routes will answer 500"
                );
            }
        }
    }
}
