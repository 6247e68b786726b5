use std::fmt;
use std::path::{Path, PathBuf};

use scout_logging::{scout_error, scout_info};
use thiserror::Error;

/// Session file read when no override is set. It must be a grammers session
/// file; SQLite sessions written by Telethon cannot be loaded.
pub const DEFAULT_SESSION_FILE: &str = "journalist_session.session";
pub const DEFAULT_SYSTEM_VERSION: &str = "4.16.30-CUSTOM";

pub const API_ID_VAR: &str = "TELEGRAM_API_ID";
pub const API_HASH_VAR: &str = "TELEGRAM_API_HASH";
pub const SESSION_FILE_VAR: &str = "SCOUT_SESSION_FILE";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("session file '{}' not found", .0.display())]
    MissingSession(PathBuf),
    #[error("TELEGRAM_API_ID/TELEGRAM_API_HASH are not configured")]
    MissingCredentials,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_id: i32,
    pub api_hash: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_id", &self.api_id)
            .field("api_hash", &"<redacted>")
            .finish()
    }
}

/// Process-wide settings handed to every scrape.
///
/// Missing credentials are not an error here: they surface as a per-scrape
/// failure so the server can still start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoutConfig {
    pub credentials: Option<Credentials>,
    /// Existing grammers session, never written. Telethon `.session` files
    /// use a different format and are rejected at connect time.
    pub session_path: PathBuf,
    pub system_version: String,
}

impl ScoutConfig {
    pub fn new(session_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials: None,
            session_path: session_path.into(),
            system_version: DEFAULT_SYSTEM_VERSION.to_string(),
        }
    }

    pub fn with_credentials(mut self, api_id: i32, api_hash: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            api_id,
            api_hash: api_hash.into(),
        });
        self
    }

    /// Reads the process environment after loading `.env`, if present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let session_path = lookup(SESSION_FILE_VAR)
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE));

        let api_id = lookup(API_ID_VAR).and_then(|raw| match raw.trim().parse::<i32>() {
            Ok(id) => Some(id),
            Err(err) => {
                scout_error!("{API_ID_VAR} is not a number: {err}");
                None
            }
        });
        let api_hash = lookup(API_HASH_VAR).filter(|hash| !hash.trim().is_empty());

        let mut config = Self::new(session_path);
        if let (Some(api_id), Some(api_hash)) = (api_id, api_hash) {
            config = config.with_credentials(api_id, api_hash.trim());
        }
        config
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    /// Checks, in order, that the session file exists and credentials are set.
    pub fn check(&self) -> Result<&Credentials, ConfigError> {
        if !self.session_path.is_file() {
            return Err(ConfigError::MissingSession(self.session_path.clone()));
        }
        self.credentials.as_ref().ok_or(ConfigError::MissingCredentials)
    }

    pub fn log_summary(&self) {
        match &self.credentials {
            Some(credentials) => scout_info!("Using Telegram api_id {}", credentials.api_id),
            None => scout_error!(
                "CRITICAL ERROR: {API_ID_VAR} and {API_HASH_VAR} environment variables are not set. Scrapes will fail."
            ),
        }
        if self.session_path.is_file() {
            scout_info!("Using session file {:?}", self.session_path);
        } else {
            scout_error!("Session file {:?} not found. Scrapes will fail.", self.session_path);
        }
    }
}
