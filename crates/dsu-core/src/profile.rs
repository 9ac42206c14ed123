//! Profile: identity, contacts and message history, stored as one `.dsu`
//! JSON file.
//!
//! Saving only ever rewrites an existing file. Creating a new profile file is
//! a separate step ([`create_profile_file`]).
//!
//! CHANGELOG:
//! - 03/04/2026 - Missing fields on load are errors, not empty defaults
//! - 02/26/2026 - Initial implementation

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::Credentials;
use crate::config::PROFILE_EXTENSION;
use crate::contacts::ContactList;
use crate::history::History;

/// Errors raised while reading or writing a profile file.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Invalid DSU file path or type: {0}")]
    InvalidPath(PathBuf),

    #[error("Failed to write profile: {0}")]
    WriteFailure(#[source] io::Error),

    #[error("Failed to read profile: {0}")]
    ReadFailure(#[source] io::Error),

    #[error("Profile file is malformed: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// A user's identity, contacts and message history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub dsuserver: String,
    pub username: String,
    pub password: String,
    #[serde(rename = "_recipients")]
    pub contacts: ContactList,
    #[serde(flatten)]
    pub history: History,
    /// Keys this client does not use (`bio`, `_posts`, ...), written back
    /// untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    pub fn new(
        dsuserver: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            dsuserver: dsuserver.into(),
            username: username.into(),
            password: password.into(),
            contacts: ContactList::new(),
            history: History::new(),
            extra: Map::new(),
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.dsuserver, &self.username, &self.password)
    }

    /// Load a profile from an existing `.dsu` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = check_path(path.as_ref())?;
        let content = fs::read_to_string(path).map_err(PersistenceError::ReadFailure)?;
        let profile: Profile =
            serde_json::from_str(&content).map_err(PersistenceError::Malformed)?;
        info!(
            path = %path.display(),
            user = %profile.username,
            contacts = profile.contacts.len(),
            messages = profile.history.merged().len(),
            "loaded profile"
        );
        Ok(profile)
    }

    /// Overwrite an existing `.dsu` file with this profile.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PersistenceError> {
        let path = check_path(path.as_ref())?;
        // Serialize before opening so a failure cannot truncate the file.
        let json = self.to_json()?;
        fs::write(path, json).map_err(PersistenceError::WriteFailure)?;
        debug!(path = %path.display(), "saved profile");
        Ok(())
    }

    /// Create a new `.dsu` file at `path` holding this profile.
    ///
    /// Refuses to overwrite. If writing fails the new file is removed again,
    /// so no empty profile is left behind.
    pub fn save_new(&self, path: impl AsRef<Path>) -> Result<PathBuf, PersistenceError> {
        let json = self.to_json()?;
        let (path, mut file) = open_new(path.as_ref())?;
        if let Err(e) = file.write_all(json.as_bytes()).and_then(|()| file.sync_all()) {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path) {
                warn!(path = %path.display(), error = %cleanup, "failed to remove partial profile");
            }
            return Err(PersistenceError::WriteFailure(e));
        }
        debug!(path = %path.display(), "created profile file");
        Ok(path)
    }

    fn to_json(&self) -> Result<String, PersistenceError> {
        serde_json::to_string(self).map_err(|e| PersistenceError::WriteFailure(e.into()))
    }
}

/// Create a new, empty profile file. Refuses to overwrite.
pub fn create_profile_file(path: impl AsRef<Path>) -> Result<PathBuf, PersistenceError> {
    open_new(path.as_ref()).map(|(path, _)| path)
}

fn open_new(path: &Path) -> Result<(PathBuf, File), PersistenceError> {
    if !has_profile_extension(path) {
        return Err(PersistenceError::InvalidPath(path.to_path_buf()));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(PersistenceError::WriteFailure)?;
    }
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => PersistenceError::InvalidPath(path.to_path_buf()),
            _ => PersistenceError::WriteFailure(e),
        })?;
    Ok((path.to_path_buf(), file))
}

fn has_profile_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == PROFILE_EXTENSION)
}

fn check_path(path: &Path) -> Result<&Path, PersistenceError> {
    if path.is_file() && has_profile_extension(path) {
        Ok(path)
    } else {
        Err(PersistenceError::InvalidPath(path.to_path_buf()))
    }
}
