use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::view::settings::ViewSettings;
use crate::workspace::manager::{WorkspaceError, WorkspaceManager};
use crate::workspace::state::Workspace;

/// Current session document version
pub const SESSION_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to read session: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse session: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Unsupported session version {0} (expected at most {SESSION_VERSION})")]
    UnsupportedVersion(u32),

    #[error("Session does not match the dataset: {0}")]
    Workspace(#[from] WorkspaceError),
}

/// Complete editing state: every workspace (with undo history) and the view settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub version: u32,
    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub active_reference: Option<String>,

    #[serde(default)]
    pub view_settings: ViewSettings,

    #[serde(default)]
    pub workspaces: BTreeMap<String, Workspace>,
}

impl SessionDocument {
    /// Snapshot the manager and settings
    pub fn capture(manager: &WorkspaceManager, view_settings: &ViewSettings) -> Self {
        Self {
            version: SESSION_VERSION,
            created_at: Utc::now(),
            active_reference: manager.active_reference().map(str::to_string),
            view_settings: view_settings.clone(),
            workspaces: manager.workspaces().clone(),
        }
    }

    /// Replace the manager's workspaces with this document's and return its view settings
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnsupportedVersion` for documents from a newer
    /// version, or `SessionError::Workspace` when a workspace names a reference
    /// the dataset does not have. The manager is unchanged on error.
    pub fn restore(self, manager: &mut WorkspaceManager) -> Result<ViewSettings, SessionError> {
        if self.version > SESSION_VERSION {
            return Err(SessionError::UnsupportedVersion(self.version));
        }
        let count = self.workspaces.len();
        manager.restore(self.workspaces, self.active_reference)?;
        info!("Restored session with {count} workspaces");
        Ok(self.view_settings)
    }

    /// # Errors
    ///
    /// Returns `SessionError::ParseError` for malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// # Errors
    ///
    /// Returns `SessionError::ParseError` if serialization fails.
    pub fn to_json(&self) -> Result<String, SessionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
