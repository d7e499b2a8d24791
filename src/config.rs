use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "CareHub";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding the backend base URL.
pub const API_BASE_URL_ENV: &str = "CAREHUB_API_BASE_URL";

/// Default backend base URL when no override is set.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Durable storage keys. Tasks and vitals never leave the client.
pub const TOKEN_KEY: &str = "access_token";
pub const NURSE_TASKS_KEY: &str = "nurse_tasks";
pub const NURSE_VITALS_KEY: &str = "nurse_vitals";

/// Auto-dismiss windows for inline notices.
pub const SUCCESS_DISMISS: Duration = Duration::from_secs(3);
pub const ERROR_DISMISS: Duration = Duration::from_secs(5);

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,carehub=debug"
}

/// Backend base URL: `CAREHUB_API_BASE_URL` or the localhost default.
/// Trailing slashes are trimmed so path joining stays uniform.
pub fn api_base_url() -> String {
    std::env::var(API_BASE_URL_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Get the application data directory
/// ~/CareHub/ on all platforms (user-visible, holds the local store)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("CareHub")
}

/// Directory for the keyed local store (tasks, vitals, token).
pub fn local_store_dir() -> PathBuf {
    app_data_dir().join("store")
}

/// Directory where client-generated artifacts (shift reports) land.
pub fn exports_dir() -> PathBuf {
    app_data_dir().join("exports")
}
