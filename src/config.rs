use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};

use crate::workflow::controller::DEFAULT_REQUEST_TIMEOUT;

pub const DB_PATH_VAR: &str = "CALL_ANALYTICS_DB";
pub const TIMEOUT_VAR: &str = "CALL_ANALYTICS_TIMEOUT_MS";
pub const DEBUG_VAR: &str = "CALL_ANALYTICS_DEBUG";

const DEFAULT_DB_FILE: &str = "call-analytics.sqlite3";
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub database_path: PathBuf,
    pub request_timeout: Duration,
    pub debug: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DB_FILE),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            debug: false,
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from defaults plus whatever `lookup` returns for the
    /// `CALL_ANALYTICS_*` variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(DB_PATH_VAR).filter(|value| !value.trim().is_empty()) {
            config.database_path = PathBuf::from(path);
        }

        if let Some(raw) = lookup(TIMEOUT_VAR) {
            let millis: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{TIMEOUT_VAR} must be a whole number of milliseconds, got '{raw}'"))?;
            config.request_timeout = Duration::from_millis(millis);
        }

        config.debug = lookup(DEBUG_VAR)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(config)
    }

    /// Session state sits next to the database file.
    pub fn session_path(&self) -> PathBuf {
        match self.database_path.parent() {
            Some(parent) => parent.join(SESSION_FILE),
            None => PathBuf::from(SESSION_FILE),
        }
    }
}
