use std::env;
use std::path::PathBuf;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Process configuration, read once at startup. A `.env` file in the working
/// directory is honored; real environment variables win over it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace to open before the first request (`SCHOOLD_WORKSPACE`).
    pub workspace: Option<PathBuf>,
    /// Fallback log filter when `RUST_LOG` is unset (`SCHOOLD_LOG_LEVEL`).
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let workspace = env::var("SCHOOLD_WORKSPACE")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let log_level = env::var("SCHOOLD_LOG_LEVEL")
            .map(|v| v.trim().to_lowercase())
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Self {
            workspace,
            log_level,
        }
    }
}
