//! SaathiCare dialogue orchestration core.
//!
//! Owns the conversational intake flow: identity collection, a randomized
//! sequence of medical-history topics, the optional report-upload detour,
//! and the final diagnosis turn. Rendering, audio capture, and the remote
//! prediction/translation/transcription services live outside this crate;
//! they talk to the core through [`dialogue::machine::DialogueMachine`] and
//! the [`gateway::ServiceGateway`] trait.

pub mod config;
pub mod dialogue;
pub mod gateway;
pub mod models;

use tracing_subscriber::EnvFilter;

/// Initialize tracing for a host shell embedding the core.
///
/// Respects `RUST_LOG` when set, otherwise falls back to the crate default.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("saathi-core starting v{}", config::APP_VERSION);
}
