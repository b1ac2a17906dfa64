//! Signed-in state shared across the dashboard.
//!
//! Whoever authenticates the user (outside this crate) calls
//! [`SessionStore::sign_in`]; logging out calls [`SessionStore::sign_out`].
//! The state is persisted as JSON so a restart keeps the user signed in.
//! No credentials are ever stored here.

use std::{
    fs,
    io::ErrorKind,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

const DEFAULT_DISPLAY_NAME: &str = "User";

/// What the dashboard needs to know about the current user.
pub trait SessionProvider: Send + Sync {
    fn is_authenticated(&self) -> bool;
    fn display_name(&self) -> String;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionData {
    is_logged_in: bool,
    username: Option<String>,
}

pub struct SessionStore {
    path: PathBuf,
    data: RwLock<SessionData>,
}

impl SessionStore {
    /// Loads persisted state. A missing or unreadable file means signed out.
    pub fn load(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read session from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!("Ignoring corrupt session file {}: {}", path.display(), err);
                SessionData::default()
            })
        } else {
            SessionData::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn sign_in(&self, display_name: &str) -> Result<()> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            bail!("display name is required");
        }

        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        let next = SessionData {
            is_logged_in: true,
            username: Some(display_name.to_string()),
        };
        self.persist(&next)?;
        *guard = next;
        log_info!("Signed in as {display_name}");
        Ok(())
    }

    /// Clears in-memory state and removes the session file.
    pub fn sign_out(&self) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = SessionData::default();
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to remove {}", self.path.display()))
            }
        }
        log_info!("Signed out");
        Ok(())
    }

    fn persist(&self, data: &SessionData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write session to {}", self.path.display()))
    }
}

impl SessionProvider for SessionStore {
    fn is_authenticated(&self) -> bool {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_logged_in
    }

    fn display_name(&self) -> String {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .username
            .clone()
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string())
    }
}
