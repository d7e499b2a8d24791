//! CareHub — client data orchestration for role-based clinical
//! dashboards.
//!
//! The crate sits between a rendering surface and two external
//! collaborators (a REST backend and its AI summarization routes). It
//! owns working copies of the server entities, the client-only task and
//! vitals collections, per-tab fetch policies, and the AI summary
//! lifecycle.

pub mod analytics;
pub mod api;
pub mod calendar;
pub mod config;
pub mod doctor;
pub mod error;
pub mod models;
pub mod notes;
pub mod nurse;
pub mod patients;
pub mod report;
pub mod session;
pub mod shared;
pub mod store;
pub mod summary;
pub mod tabs;
pub mod tasks;
pub mod vitals;

use tracing_subscriber::EnvFilter;

pub use api::{ApiClient, Backend, MockBackend};
pub use error::{ApiError, StoreError};
pub use session::Session;
pub use store::LocalStore;

/// Initialize tracing from `RUST_LOG`, falling back to the built-in
/// filter. Call once at startup.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
